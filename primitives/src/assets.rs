use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

/// Single source of truth for asset types across the top-up pallets.
///
/// - `Native`: the chain's native token (managed by pallet-balances). Gas escrow is
///   always denominated in it.
/// - `Local(u32)`: local assets, the usual deposit and action tokens.
/// - `Foreign(u32)`: assets bridged in from other consensus systems.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub enum AssetKind {
  /// Native token managed by pallet-balances
  #[default]
  Native,
  /// Local asset managed by pallet-assets
  Local(u32),
  /// Foreign asset managed by pallet-assets via XCM mapping (0xF... namespace)
  Foreign(u32),
}

impl From<u32> for AssetKind {
  fn from(asset_id: u32) -> Self {
    AssetKind::Local(asset_id)
  }
}

impl AssetKind {
  pub fn is_native(&self) -> bool {
    matches!(self, AssetKind::Native)
  }
}
