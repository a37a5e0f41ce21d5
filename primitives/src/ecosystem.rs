//! Ecosystem constants shared by the top-up pallets and the runtimes that wire them.

/// Balance type alias for consistency across ecosystem
pub type Balance = u128;

/// Pallet identifiers for deriving pallet-owned accounts.
///
/// Used by `PalletId::into_account_truncating()` to deterministically derive the
/// accounts that hold escrowed gas and pledged deposit tokens.
pub mod pallet_ids {
  /// Gas bank pallet ID (native-currency keeper escrow)
  pub const GAS_BANK_PALLET_ID: &[u8; 8] = b"gasbank0";

  /// Top-up action pallet ID (pledged deposit custody)
  pub const TOP_UP_ACTION_PALLET_ID: &[u8; 8] = b"topupact";
}

pub mod params {
  use sp_arithmetic::Permill;

  /// Upper bound governance may set for the per-execution action fee (5%).
  pub const MAX_ACTION_FEE: Permill = Permill::from_percent(5);

  /// Slippage accepted when converting a deposit asset into the action asset (2%).
  pub const SWAP_SLIPPAGE_TOLERANCE: Permill = Permill::from_percent(2);

  /// Longest protocol-side account encoding accepted at registration.
  pub const MAX_ACCOUNT_ENCODING_LEN: u32 = 64;
}
