//! Identifiers shared between the gas bank and the top-up action pallets.

/// Health factor as reported by protocol handlers (1.0 == exactly collateralized).
pub type HealthFactor = sp_arithmetic::FixedU128;

/// Fixed-width opaque protocol tag, registered once per lending protocol.
pub type ProtocolId = [u8; 32];

/// Identifier of a registered top-up position. Gas escrows are keyed by it too.
pub type PositionId = u64;

/// Right-pad a short protocol name into a `ProtocolId`. Names longer than
/// 32 bytes are truncated.
pub const fn protocol_id(name: &[u8]) -> ProtocolId {
  let mut id = [0u8; 32];
  let mut i = 0;
  while i < name.len() && i < 32 {
    id[i] = name[i];
    i += 1;
  }
  id
}
