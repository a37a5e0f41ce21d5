use frame::prelude::*;
use pallet_gas_bank::Settlement;
use polkadot_sdk::sp_runtime::traits::{One, Zero};
use primitives::{HealthFactor, ProtocolId};

/// Standing instruction: top up the monitored position whenever its health
/// factor falls below `threshold`.
#[derive(
  Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo, MaxEncodedLen,
)]
pub struct TopUpRecord<AssetId, Balance> {
  pub threshold: HealthFactor,
  /// Highest priority fee per gas unit the registrant pays a keeper.
  pub priority_fee: Balance,
  /// Ceiling on the effective gas price; executions above it are refused.
  pub max_fee: Balance,
  /// Asset the protocol handler receives.
  pub action_token: AssetId,
  /// Asset pledged by the registrant.
  pub deposit_token: AssetId,
  pub single_top_up_amount: Balance,
  /// Remaining allowance. Decreases with every execution; zero means exhausted.
  pub total_top_up_amount: Balance,
}

impl<AssetId: PartialEq, Balance: AtLeast32BitUnsigned + Copy> TopUpRecord<AssetId, Balance> {
  pub fn is_valid(&self) -> bool {
    !self.threshold.is_zero()
      && !self.single_top_up_amount.is_zero()
      && self.single_top_up_amount <= self.total_top_up_amount
      && self.max_fee >= self.priority_fee
  }

  pub fn needs_swap(&self) -> bool {
    self.deposit_token != self.action_token
  }

  /// Executions still needed to use up the remaining allowance, rounded up.
  pub fn executions_left(&self) -> Balance {
    if self.single_top_up_amount.is_zero() {
      return Zero::zero();
    }
    let full = self.total_top_up_amount / self.single_top_up_amount;
    if (self.total_top_up_amount % self.single_top_up_amount).is_zero() {
      full
    } else {
      full.saturating_add(One::one())
    }
  }

  /// Amount pulled from the deposit by the next execution.
  pub fn next_gross(&self) -> Balance {
    self.single_top_up_amount.min(self.total_top_up_amount)
  }
}

#[derive(
  Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo, MaxEncodedLen,
)]
pub struct Position<AccountId, AssetId, Balance, Account> {
  pub registrant: AccountId,
  pub protocol: ProtocolId,
  /// Protocol-side encoding of the monitored account.
  pub account: Account,
  pub record: TopUpRecord<AssetId, Balance>,
  /// Deposit tokens still held by the pallet for this position.
  pub deposit_held: Balance,
}

/// What a keeper observes after an execution attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecutionOutcome<Balance> {
  /// Health factor at or above the threshold; nothing changed.
  Skipped { health_factor: HealthFactor },
  Executed(ExecutionReport<Balance>),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExecutionReport<Balance> {
  /// Action tokens handed to the protocol handler.
  pub top_up_amount: Balance,
  /// Deposit tokens spent, action fee included.
  pub consumed_deposit_amount: Balance,
  pub keeper_paid: Balance,
  /// Native escrow surplus returned toward the registrant.
  pub beneficiary_credited: Balance,
  /// How that surplus was settled, if there was any.
  pub refund: Option<Settlement>,
}
