//! Capability traits the execution engine calls out to.
//!
//! Token movement, asset conversion and per-protocol health handling all live
//! outside this pallet; runtimes wire concrete implementations in through
//! `Config`.

use frame::prelude::*;
use primitives::HealthFactor;

/// Asset movements and balance queries.
pub trait AssetOps<AccountId, AssetId, Balance> {
  fn transfer(
    from: &AccountId,
    to: &AccountId,
    asset: AssetId,
    amount: Balance,
  ) -> Result<(), DispatchError>;

  fn balance(who: &AccountId, asset: AssetId) -> Balance;
}

/// Conversion of the deposit asset into the asset a protocol expects.
pub trait SwapAdapter<AccountId, AssetId, Balance> {
  /// Expected output for `amount_in`, `None` when no route exists.
  fn quote(asset_in: AssetId, asset_out: AssetId, amount_in: Balance) -> Option<Balance>;

  /// Swap exactly `amount_in` held by `who`; fails when the output would be below `min_out`.
  fn swap(
    who: &AccountId,
    asset_in: AssetId,
    asset_out: AssetId,
    amount_in: Balance,
    min_out: Balance,
  ) -> Result<Balance, DispatchError>;
}

/// Health-factor queries and top-up application, dispatched on the handler
/// variant registered for a protocol.
///
/// `account` is the protocol-side encoding of the monitored account, which may
/// differ from any chain account (sub-accounts, foreign address formats).
pub trait ProtocolHandlers<Kind, AccountId, AssetId, Balance> {
  fn health_factor(kind: &Kind, account: &[u8]) -> Result<HealthFactor, DispatchError>;

  /// Pull up to `amount` of `asset` from `source` into the position.
  /// Returns what was actually taken, protocol fees included. A protocol-level
  /// surcharge must fit inside `amount`: taking more than offered is refused.
  fn apply_top_up(
    kind: &Kind,
    source: &AccountId,
    account: &[u8],
    asset: AssetId,
    amount: Balance,
  ) -> Result<Balance, DispatchError>;
}

impl<AccountId, AssetId, Balance: Default> AssetOps<AccountId, AssetId, Balance> for () {
  fn transfer(_: &AccountId, _: &AccountId, _: AssetId, _: Balance) -> Result<(), DispatchError> {
    Ok(())
  }

  fn balance(_: &AccountId, _: AssetId) -> Balance {
    Balance::default()
  }
}

/// No-op `SwapAdapter` for runtimes where deposit and action assets always match.
impl<AccountId, AssetId, Balance> SwapAdapter<AccountId, AssetId, Balance> for () {
  fn quote(_: AssetId, _: AssetId, _: Balance) -> Option<Balance> {
    None
  }

  fn swap(
    _: &AccountId,
    _: AssetId,
    _: AssetId,
    _: Balance,
    _: Balance,
  ) -> Result<Balance, DispatchError> {
    Err(DispatchError::Other("SwapAdapter not configured"))
  }
}

impl<Kind, AccountId, AssetId, Balance> ProtocolHandlers<Kind, AccountId, AssetId, Balance> for () {
  fn health_factor(_: &Kind, _: &[u8]) -> Result<HealthFactor, DispatchError> {
    Err(DispatchError::Other("ProtocolHandlers not configured"))
  }

  fn apply_top_up(
    _: &Kind,
    _: &AccountId,
    _: &[u8],
    _: AssetId,
    _: Balance,
  ) -> Result<Balance, DispatchError> {
    Err(DispatchError::Other("ProtocolHandlers not configured"))
  }
}
