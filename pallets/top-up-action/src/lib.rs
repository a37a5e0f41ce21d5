//! Top-Up Action Pallet
//!
//! Registrants pledge a deposit and a native gas escrow against a position on an
//! external protocol. Any keeper may then execute the position once its health
//! factor drops below the registered threshold: the pallet converts the deposit if
//! needed, hands it to the protocol handler, and reimburses the keeper from the
//! escrow at `EstimatedGasUsage * effective_gas_price`.
//!
//! Keeper settlement is the one step nobody but the keeper can make fail. Everything
//! flowing back to the registrant during an execution (escrow surplus, unconsumed
//! swap output, leftover deposit) goes through isolated transfers that fall back to
//! pull-credits, so a registrant rejecting receipts cannot unwind the keeper's pay.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod adapters;
pub use adapters::{AssetOps, ProtocolHandlers, SwapAdapter};

pub mod types;
pub use types::{ExecutionOutcome, ExecutionReport, Position, TopUpRecord};

pub mod weights;
pub use weights::WeightInfo;

#[cfg(test)]
mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub const LOG_TARGET: &str = "runtime::top-up-action";

#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper<AccountId, AssetId, Balance, HandlerKind> {
  fn fund_native(who: &AccountId, amount: Balance);
  fn mint_asset(asset: AssetId, who: &AccountId, amount: Balance);
  fn asset() -> AssetId;
  /// Handler whose positions report a health factor below 2.0.
  fn handler() -> HandlerKind;
}

#[frame::pallet]
pub mod pallet {
  use super::{
    AssetOps, ExecutionOutcome, ExecutionReport, LOG_TARGET, Position, ProtocolHandlers,
    SwapAdapter, TopUpRecord, WeightInfo,
  };
  use alloc::vec::Vec;
  use frame::deps::frame_support::storage::with_storage_layer;
  use frame::prelude::*;
  use pallet_gas_bank::{GasEscrow, Settlement};
  use polkadot_sdk::{
    frame_support::{PalletId, traits::EnsureOrigin},
    sp_runtime::{
      ArithmeticError,
      traits::{AccountIdConversion, SaturatedConversion, Zero},
    },
  };
  use primitives::{HealthFactor, PositionId, ProtocolId};

  pub type EncodedAccountOf<T> = BoundedVec<u8, <T as Config>::MaxAccountEncodingLen>;
  pub type TopUpRecordOf<T> = TopUpRecord<<T as Config>::AssetId, <T as Config>::Balance>;
  pub type PositionOf<T> = Position<
    <T as frame_system::Config>::AccountId,
    <T as Config>::AssetId,
    <T as Config>::Balance,
    EncodedAccountOf<T>,
  >;

  #[pallet::config]
  pub trait Config: frame_system::Config<RuntimeEvent: From<Event<Self>>> {
    type AssetId: Parameter + Member + Copy + MaybeSerializeDeserialize + MaxEncodedLen;

    type Balance: Parameter
      + Member
      + AtLeast32BitUnsigned
      + Default
      + Copy
      + MaybeSerializeDeserialize
      + MaxEncodedLen;

    type AssetOps: AssetOps<Self::AccountId, Self::AssetId, Self::Balance>;

    type SwapAdapter: SwapAdapter<Self::AccountId, Self::AssetId, Self::Balance>;

    /// Runtime-defined set of protocol handler variants.
    type HandlerKind: Parameter + Member + MaxEncodedLen;

    type Handlers: ProtocolHandlers<Self::HandlerKind, Self::AccountId, Self::AssetId, Self::Balance>;

    /// Native escrow backing keeper reimbursement.
    type GasBank: GasEscrow<Self::AccountId, Self::Balance>;

    /// Origin allowed to manage handlers and the action fee.
    type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    #[pallet::constant]
    type PalletId: Get<PalletId>;

    /// Receives the action fee, in deposit tokens.
    #[pallet::constant]
    type FeeSink: Get<Self::AccountId>;

    /// Network base fee per gas unit at execution time.
    type BaseFee: Get<Self::Balance>;

    /// Gas charged per execution, both for escrow sizing and keeper reimbursement.
    #[pallet::constant]
    type EstimatedGasUsage: Get<u64>;

    #[pallet::constant]
    type MaxActionFee: Get<Permill>;

    /// Accepted shortfall of a conversion against its quote.
    #[pallet::constant]
    type SwapSlippageTolerance: Get<Permill>;

    #[pallet::constant]
    type MaxAccountEncodingLen: Get<u32>;

    type WeightInfo: WeightInfo;

    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: crate::BenchmarkHelper<
        Self::AccountId,
        Self::AssetId,
        Self::Balance,
        Self::HandlerKind,
      >;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(_);

  #[pallet::storage]
  pub type NextPositionId<T> = StorageValue<_, PositionId, ValueQuery>;

  #[pallet::storage]
  #[pallet::getter(fn positions)]
  pub type Positions<T: Config> = StorageMap<_, Blake2_128Concat, PositionId, PositionOf<T>>;

  /// (registrant, (protocol, encoded account)) -> position.
  #[pallet::storage]
  pub type PositionIndex<T: Config> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    T::AccountId,
    Blake2_128Concat,
    (ProtocolId, EncodedAccountOf<T>),
    PositionId,
  >;

  #[pallet::storage]
  #[pallet::getter(fn handlers)]
  pub type Handlers<T: Config> = StorageMap<_, Blake2_128Concat, ProtocolId, T::HandlerKind>;

  #[pallet::storage]
  pub type ActionFee<T> = StorageValue<_, Permill, ValueQuery>;

  /// Asset refunds whose push was rejected, claimable with `claim_asset`.
  #[pallet::storage]
  pub type PendingAssetRefunds<T: Config> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    T::AccountId,
    Blake2_128Concat,
    T::AssetId,
    T::Balance,
    ValueQuery,
  >;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    HandlerSet {
      protocol: ProtocolId,
      kind: T::HandlerKind,
    },
    HandlerRemoved {
      protocol: ProtocolId,
    },
    ActionFeeSet {
      fee: Permill,
    },
    Registered {
      id: PositionId,
      registrant: T::AccountId,
      protocol: ProtocolId,
      account: EncodedAccountOf<T>,
      deposit_amount: T::Balance,
      gas_deposit: T::Balance,
    },
    Deregistered {
      id: PositionId,
      registrant: T::AccountId,
      deposit_returned: T::Balance,
      gas_returned: T::Balance,
    },
    ExecutionSkipped {
      id: PositionId,
      keeper: T::AccountId,
      health_factor: HealthFactor,
    },
    TopUpExecuted {
      id: PositionId,
      keeper: T::AccountId,
      top_up_amount: T::Balance,
      consumed_deposit_amount: T::Balance,
      keeper_paid: T::Balance,
      beneficiary_credited: T::Balance,
      remaining: T::Balance,
    },
    PositionExhausted {
      id: PositionId,
    },
    AssetRefundCredited {
      who: T::AccountId,
      asset: T::AssetId,
      amount: T::Balance,
    },
    AssetRefundClaimed {
      who: T::AccountId,
      to: T::AccountId,
      asset: T::AssetId,
      amount: T::Balance,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// Zero threshold or amounts, single above total, or max fee below priority fee.
    InvalidRecord,
    /// No handler registered for the protocol.
    UnknownProtocol,
    /// Deposit does not cover the total top-up amount.
    InsufficientDeposit,
    /// Gas deposit below what all executions may cost at the maximum fee.
    InsufficientEscrow,
    /// The registrant already has a position for this protocol and account.
    DuplicateRecord,
    RecordNotFound,
    /// Effective gas price exceeds the position's maximum fee.
    GasPriceTooHigh,
    /// Conversion unavailable or below the slippage bound.
    SwapFailed,
    /// Handler reported taking more than it was offered.
    HandlerOverdraw,
    /// Handler took nothing.
    NothingConsumed,
    FeeTooHigh,
    NoAssetRefund,
  }

  #[pallet::hooks]
  impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
    #[cfg(feature = "try-runtime")]
    fn try_state(_n: BlockNumberFor<T>) -> Result<(), polkadot_sdk::sp_runtime::TryRuntimeError> {
      Self::do_try_state()
    }
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Register a top-up position.
    ///
    /// Moves `deposit_amount` of the record's deposit token into the pallet account
    /// and `gas_deposit` native currency into the gas bank. The gas deposit must
    /// cover `max_fee * ceil(total / single) * EstimatedGasUsage`.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::register())]
    pub fn register(
      origin: OriginFor<T>,
      account: EncodedAccountOf<T>,
      protocol: ProtocolId,
      deposit_amount: T::Balance,
      gas_deposit: T::Balance,
      record: TopUpRecordOf<T>,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      ensure!(record.is_valid(), Error::<T>::InvalidRecord);
      ensure!(
        Handlers::<T>::contains_key(protocol),
        Error::<T>::UnknownProtocol
      );
      let key = (protocol, account.clone());
      ensure!(
        !PositionIndex::<T>::contains_key(&who, &key),
        Error::<T>::DuplicateRecord
      );
      ensure!(
        deposit_amount >= record.total_top_up_amount,
        Error::<T>::InsufficientDeposit
      );
      ensure!(
        gas_deposit >= Self::required_gas_deposit(&record),
        Error::<T>::InsufficientEscrow
      );

      let id = NextPositionId::<T>::get();
      NextPositionId::<T>::put(id.checked_add(1).ok_or(ArithmeticError::Overflow)?);

      T::AssetOps::transfer(
        &who,
        &Self::account_id(),
        record.deposit_token,
        deposit_amount,
      )?;
      T::GasBank::open(&who, &who, id, gas_deposit)?;

      Positions::<T>::insert(
        id,
        Position {
          registrant: who.clone(),
          protocol,
          account: account.clone(),
          record,
          deposit_held: deposit_amount,
        },
      );
      PositionIndex::<T>::insert(&who, &key, id);

      log::debug!(target: LOG_TARGET, "position {} registered by {:?}", id, who);
      Self::deposit_event(Event::Registered {
        id,
        registrant: who,
        protocol,
        account,
        deposit_amount,
        gas_deposit,
      });
      Ok(())
    }

    /// Remove a position and return its deposit and gas escrow directly to the
    /// registrant. A registrant whose account rejects the return cannot deregister.
    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::deregister())]
    pub fn deregister(
      origin: OriginFor<T>,
      account: EncodedAccountOf<T>,
      protocol: ProtocolId,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      let id = PositionIndex::<T>::take(&who, &(protocol, account)).ok_or(Error::<T>::RecordNotFound)?;
      let position = Positions::<T>::take(id).ok_or(Error::<T>::RecordNotFound)?;

      if !position.deposit_held.is_zero() {
        T::AssetOps::transfer(
          &Self::account_id(),
          &who,
          position.record.deposit_token,
          position.deposit_held,
        )?;
      }
      let gas_returned = T::GasBank::close(id)?;

      Self::deposit_event(Event::Deregistered {
        id,
        registrant: who,
        deposit_returned: position.deposit_held,
        gas_returned,
      });
      Ok(())
    }

    /// Execute a position as a keeper. Reimbursement goes to `payee`, or to the
    /// keeper itself when unset.
    #[pallet::call_index(2)]
    #[pallet::weight(T::WeightInfo::execute())]
    pub fn execute(
      origin: OriginFor<T>,
      registrant: T::AccountId,
      account: EncodedAccountOf<T>,
      protocol: ProtocolId,
      priority_fee: T::Balance,
      payee: Option<T::AccountId>,
    ) -> DispatchResult {
      let keeper = ensure_signed(origin)?;
      let payee = payee.unwrap_or_else(|| keeper.clone());
      Self::do_execute(&keeper, &payee, &registrant, protocol, &account, priority_fee)?;
      Ok(())
    }

    #[pallet::call_index(3)]
    #[pallet::weight(T::WeightInfo::set_handler())]
    pub fn set_handler(
      origin: OriginFor<T>,
      protocol: ProtocolId,
      kind: T::HandlerKind,
    ) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      Handlers::<T>::insert(protocol, kind.clone());
      Self::deposit_event(Event::HandlerSet { protocol, kind });
      Ok(())
    }

    /// Positions on a removed protocol stay registered but cannot execute until a
    /// handler is set again. Deregistration keeps working.
    #[pallet::call_index(4)]
    #[pallet::weight(T::WeightInfo::remove_handler())]
    pub fn remove_handler(origin: OriginFor<T>, protocol: ProtocolId) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(
        Handlers::<T>::contains_key(protocol),
        Error::<T>::UnknownProtocol
      );
      Handlers::<T>::remove(protocol);
      Self::deposit_event(Event::HandlerRemoved { protocol });
      Ok(())
    }

    #[pallet::call_index(5)]
    #[pallet::weight(T::WeightInfo::set_action_fee())]
    pub fn set_action_fee(origin: OriginFor<T>, fee: Permill) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(fee <= T::MaxActionFee::get(), Error::<T>::FeeTooHigh);
      ActionFee::<T>::put(fee);
      Self::deposit_event(Event::ActionFeeSet { fee });
      Ok(())
    }

    /// Withdraw a credited asset refund to the caller or to `to`.
    #[pallet::call_index(6)]
    #[pallet::weight(T::WeightInfo::claim_asset())]
    pub fn claim_asset(
      origin: OriginFor<T>,
      asset: T::AssetId,
      to: Option<T::AccountId>,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      let amount = PendingAssetRefunds::<T>::take(&who, asset);
      ensure!(!amount.is_zero(), Error::<T>::NoAssetRefund);
      let dest = to.unwrap_or_else(|| who.clone());
      T::AssetOps::transfer(&Self::account_id(), &dest, asset, amount)?;
      Self::deposit_event(Event::AssetRefundClaimed {
        who,
        to: dest,
        asset,
        amount,
      });
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    pub fn account_id() -> T::AccountId {
      T::PalletId::get().into_account_truncating()
    }

    pub fn position(
      registrant: &T::AccountId,
      protocol: ProtocolId,
      account: &EncodedAccountOf<T>,
    ) -> Option<PositionOf<T>> {
      PositionIndex::<T>::get(registrant, (protocol, account.clone())).and_then(|id| Positions::<T>::get(id))
    }

    pub fn positions_of(registrant: &T::AccountId) -> Vec<(PositionId, PositionOf<T>)> {
      PositionIndex::<T>::iter_prefix_values(registrant)
        .filter_map(|id| Positions::<T>::get(id).map(|position| (id, position)))
        .collect()
    }

    /// Native escrow needed for every remaining execution at the maximum fee.
    pub fn required_gas_deposit(record: &TopUpRecordOf<T>) -> T::Balance {
      record
        .max_fee
        .saturating_mul(record.executions_left())
        .saturating_mul(T::EstimatedGasUsage::get().saturated_into())
    }

    pub fn health_factor(
      protocol: ProtocolId,
      account: &[u8],
    ) -> Result<HealthFactor, DispatchError> {
      let kind = Handlers::<T>::get(protocol).ok_or(Error::<T>::UnknownProtocol)?;
      T::Handlers::health_factor(&kind, account)
    }

    /// Hand `amount` of `asset` held by `source` to the protocol's handler and
    /// return what it consumed.
    pub fn apply_top_up(
      protocol: ProtocolId,
      source: &T::AccountId,
      account: &[u8],
      asset: T::AssetId,
      amount: T::Balance,
    ) -> Result<T::Balance, DispatchError> {
      let kind = Handlers::<T>::get(protocol).ok_or(Error::<T>::UnknownProtocol)?;
      let consumed = T::Handlers::apply_top_up(&kind, source, account, asset, amount)?;
      ensure!(!consumed.is_zero(), Error::<T>::NothingConsumed);
      ensure!(consumed <= amount, Error::<T>::HandlerOverdraw);
      Ok(consumed)
    }

    /// Read-only pre-check for keepers. `Ok(false)` means an execution now would
    /// be skipped; errors are those `execute` would fail validation with.
    pub fn can_execute(
      registrant: &T::AccountId,
      protocol: ProtocolId,
      account: &EncodedAccountOf<T>,
      priority_fee: T::Balance,
    ) -> Result<bool, DispatchError> {
      let (_, position, _) = Self::validate(registrant, protocol, account, priority_fee)?;
      let health = Self::health_factor(protocol, &position.account)?;
      Ok(health < position.record.threshold)
    }

    fn validate(
      registrant: &T::AccountId,
      protocol: ProtocolId,
      account: &EncodedAccountOf<T>,
      priority_fee: T::Balance,
    ) -> Result<(PositionId, PositionOf<T>, T::Balance), DispatchError> {
      let id = PositionIndex::<T>::get(registrant, (protocol, account.clone()))
        .ok_or(Error::<T>::RecordNotFound)?;
      let position = Positions::<T>::get(id).ok_or(Error::<T>::RecordNotFound)?;
      ensure!(
        !position.record.total_top_up_amount.is_zero(),
        Error::<T>::RecordNotFound
      );
      let price = T::BaseFee::get().saturating_add(priority_fee.min(position.record.priority_fee));
      ensure!(
        price <= position.record.max_fee,
        Error::<T>::GasPriceTooHigh
      );
      Ok((id, position, price))
    }

    /// Run one execution attempt.
    ///
    /// Validation, the health check, conversion and the handler call abort with no
    /// effect. From keeper settlement on, only the keeper's own account can make
    /// the attempt fail.
    pub fn do_execute(
      keeper: &T::AccountId,
      payee: &T::AccountId,
      registrant: &T::AccountId,
      protocol: ProtocolId,
      account: &EncodedAccountOf<T>,
      priority_fee: T::Balance,
    ) -> Result<ExecutionOutcome<T::Balance>, DispatchError> {
      let (id, mut position, price) = Self::validate(registrant, protocol, account, priority_fee)?;

      let health_factor = Self::health_factor(protocol, &position.account)?;
      if health_factor >= position.record.threshold {
        log::debug!(
          target: LOG_TARGET,
          "position {} healthy at {:?}, skipping",
          id,
          health_factor,
        );
        Self::deposit_event(Event::ExecutionSkipped {
          id,
          keeper: keeper.clone(),
          health_factor,
        });
        return Ok(ExecutionOutcome::Skipped { health_factor });
      }

      let pallet_account = Self::account_id();
      let record = position.record.clone();
      let gross = record.next_gross();
      let fee = ActionFee::<T>::get().mul_floor(gross);
      let net = gross.saturating_sub(fee);

      let top_up_amount = if record.needs_swap() {
        Self::convert(record.deposit_token, record.action_token, net)?
      } else {
        net
      };
      let consumed = Self::apply_top_up(
        protocol,
        &pallet_account,
        &position.account,
        record.action_token,
        top_up_amount,
      )?;
      if !fee.is_zero() {
        T::AssetOps::transfer(&pallet_account, &T::FeeSink::get(), record.deposit_token, fee)?;
      }
      log::debug!(
        target: LOG_TARGET,
        "position {} topped up with {:?} ({:?} consumed, fee {:?})",
        id,
        top_up_amount,
        consumed,
        fee,
      );

      let consumed_deposit_amount = if record.needs_swap() {
        gross
      } else {
        fee.saturating_add(consumed)
      };
      debug_assert!(
        consumed_deposit_amount <= position.deposit_held,
        "execution spent more deposit than the position holds"
      );
      position.deposit_held = position.deposit_held.saturating_sub(consumed_deposit_amount);
      let exhausted = Self::consume(&mut position, consumed_deposit_amount);

      let owed = price.saturating_mul(T::EstimatedGasUsage::get().saturated_into());
      let keeper_paid = T::GasBank::pay_keeper(id, payee, owed)?;

      let still_needed = if exhausted {
        Zero::zero()
      } else {
        Self::required_gas_deposit(&position.record)
      };
      let beneficiary_credited = T::GasBank::balance_of(id).saturating_sub(still_needed);
      let refund = if beneficiary_credited.is_zero() {
        None
      } else {
        Some(T::GasBank::release(id, beneficiary_credited)?)
      };

      if record.needs_swap() && consumed < top_up_amount {
        Self::push_asset_or_credit(
          registrant,
          record.action_token,
          top_up_amount.saturating_sub(consumed),
        );
      }

      let remaining = position.record.total_top_up_amount;
      if exhausted {
        Positions::<T>::remove(id);
        PositionIndex::<T>::remove(registrant, (protocol, account.clone()));
        if !position.deposit_held.is_zero() {
          Self::push_asset_or_credit(registrant, record.deposit_token, position.deposit_held);
        }
        T::GasBank::close(id)?;
        log::debug!(target: LOG_TARGET, "position {} exhausted", id);
      } else {
        Positions::<T>::insert(id, position);
      }

      Self::deposit_event(Event::TopUpExecuted {
        id,
        keeper: keeper.clone(),
        top_up_amount,
        consumed_deposit_amount,
        keeper_paid,
        beneficiary_credited,
        remaining,
      });
      if exhausted {
        Self::deposit_event(Event::PositionExhausted { id });
      }

      Ok(ExecutionOutcome::Executed(ExecutionReport {
        top_up_amount,
        consumed_deposit_amount,
        keeper_paid,
        beneficiary_credited,
        refund,
      }))
    }

    /// Deduct the deposit actually pulled from the remaining allowance. Returns
    /// whether the position is now exhausted.
    fn consume(position: &mut PositionOf<T>, pulled: T::Balance) -> bool {
      let remaining = &mut position.record.total_top_up_amount;
      debug_assert!(pulled <= *remaining, "top-up allowance underflow");
      *remaining = remaining.saturating_sub(pulled);
      remaining.is_zero()
    }

    fn convert(
      asset_in: T::AssetId,
      asset_out: T::AssetId,
      amount_in: T::Balance,
    ) -> Result<T::Balance, DispatchError> {
      let quote =
        T::SwapAdapter::quote(asset_in, asset_out, amount_in).ok_or(Error::<T>::SwapFailed)?;
      let min_out = quote.saturating_sub(T::SwapSlippageTolerance::get().mul_floor(quote));
      let out = T::SwapAdapter::swap(&Self::account_id(), asset_in, asset_out, amount_in, min_out)
        .map_err(|e| {
          log::debug!(target: LOG_TARGET, "conversion failed: {:?}", e);
          Error::<T>::SwapFailed
        })?;
      ensure!(out >= min_out, Error::<T>::SwapFailed);
      Ok(out)
    }

    /// Push `amount` of `asset` from the pallet to `to` inside its own storage
    /// layer; a rejected push is credited to `PendingAssetRefunds`.
    fn push_asset_or_credit(to: &T::AccountId, asset: T::AssetId, amount: T::Balance) -> Settlement {
      let pallet_account = Self::account_id();
      match with_storage_layer(|| T::AssetOps::transfer(&pallet_account, to, asset, amount)) {
        Ok(()) => Settlement::Delivered,
        Err(e) => {
          log::warn!(
            target: LOG_TARGET,
            "asset refund of {:?} rejected by {:?} ({:?}), credited for pull",
            amount,
            to,
            e,
          );
          PendingAssetRefunds::<T>::mutate(to, asset, |credit| {
            *credit = credit.saturating_add(amount)
          });
          Self::deposit_event(Event::AssetRefundCredited {
            who: to.clone(),
            asset,
            amount,
          });
          Settlement::CreditedForPull
        }
      }
    }

    /// Index and positions agree, and every live position is still backed by its
    /// deposit and an escrow.
    #[cfg(any(feature = "try-runtime", test))]
    pub fn do_try_state() -> Result<(), polkadot_sdk::sp_runtime::TryRuntimeError> {
      for (registrant, (protocol, account), id) in PositionIndex::<T>::iter() {
        let position = Positions::<T>::get(id).ok_or("index points at a missing position")?;
        ensure!(
          position.registrant == registrant
            && position.protocol == protocol
            && position.account == account,
          "index key does not match its position"
        );
      }
      for (id, position) in Positions::<T>::iter() {
        ensure!(
          PositionIndex::<T>::get(
            &position.registrant,
            (position.protocol, position.account.clone())
          ) == Some(id),
          "position missing from index"
        );
        ensure!(
          !position.record.total_top_up_amount.is_zero(),
          "exhausted position left in storage"
        );
        ensure!(
          position.deposit_held >= position.record.total_top_up_amount,
          "deposit no longer covers the remaining allowance"
        );
      }
      Ok(())
    }
  }
}
