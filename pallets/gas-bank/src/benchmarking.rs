#![cfg(feature = "runtime-benchmarks")]

use crate::*;
use frame::prelude::*;
use polkadot_sdk::frame_benchmarking::{account, v2::*};
use polkadot_sdk::frame_system::RawOrigin;
use polkadot_sdk::sp_runtime::traits::{SaturatedConversion, Zero};

#[benchmarks]
mod benches {
  use super::*;

  fn funded<T: Config>(name: &'static str) -> T::AccountId {
    let who: T::AccountId = account(name, 0, 0);
    T::BenchmarkHelper::fund_account(&who, 1_000_000_000_000u128.saturated_into());
    who
  }

  fn open_escrow<T: Config>(owner: &T::AccountId, id: primitives::PositionId) {
    Pallet::<T>::open(owner, owner, id, 1_000_000u128.saturated_into()).unwrap();
  }

  #[benchmark]
  fn fund() {
    let owner = funded::<T>("owner");
    let caller: T::AccountId = whitelisted_caller();
    T::BenchmarkHelper::fund_account(&caller, 1_000_000_000_000u128.saturated_into());
    open_escrow::<T>(&owner, 0);
    let amount: T::Balance = 500_000u128.saturated_into();
    #[extrinsic_call]
    fund(RawOrigin::Signed(caller), 0, amount);
    let escrow = Escrows::<T>::get(0).unwrap();
    assert_eq!(escrow.balance, 1_500_000u128.saturated_into());
  }

  #[benchmark]
  fn claim_credit() {
    let caller: T::AccountId = whitelisted_caller();
    let bank = Pallet::<T>::account_id();
    T::BenchmarkHelper::fund_account(&bank, 1_000_000_000_000u128.saturated_into());
    PullCredits::<T>::insert(&caller, T::Balance::from(1_000_000u32));
    #[extrinsic_call]
    claim_credit(RawOrigin::Signed(caller.clone()), None);
    assert!(PullCredits::<T>::get(&caller).is_zero());
  }

  #[cfg(test)]
  use crate::mock::{Test, new_test_ext};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
