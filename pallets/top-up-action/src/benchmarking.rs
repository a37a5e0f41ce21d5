#![cfg(feature = "runtime-benchmarks")]

use crate::*;
use frame::prelude::*;
use polkadot_sdk::frame_benchmarking::{account, v2::*};
use polkadot_sdk::frame_system::RawOrigin;
use polkadot_sdk::sp_runtime::traits::SaturatedConversion;
use primitives::{HealthFactor, ProtocolId, protocol_id};

const PROTOCOL: ProtocolId = protocol_id(b"benchmark");

#[benchmarks]
mod benches {
  use super::*;

  fn bench_record<T: Config>() -> TopUpRecordOf<T> {
    let asset = T::BenchmarkHelper::asset();
    TopUpRecord {
      threshold: HealthFactor::from_u32(2),
      priority_fee: 1u32.into(),
      max_fee: 1_000u32.into(),
      action_token: asset,
      deposit_token: asset,
      single_top_up_amount: 1_000u32.into(),
      total_top_up_amount: 2_000u32.into(),
    }
  }

  fn bench_account<T: Config>() -> EncodedAccountOf<T> {
    BoundedVec::truncate_from(b"benchmark-account".to_vec())
  }

  fn funded<T: Config>(who: &T::AccountId) {
    T::BenchmarkHelper::fund_native(who, 1_000_000_000_000_000u128.saturated_into());
    T::BenchmarkHelper::mint_asset(
      T::BenchmarkHelper::asset(),
      who,
      1_000_000u128.saturated_into(),
    );
  }

  fn install_handler<T: Config>() {
    Handlers::<T>::insert(PROTOCOL, T::BenchmarkHelper::handler());
  }

  fn bench_register<T: Config>(who: &T::AccountId) {
    funded::<T>(who);
    install_handler::<T>();
    let record = bench_record::<T>();
    let gas = Pallet::<T>::required_gas_deposit(&record);
    Pallet::<T>::register(
      RawOrigin::Signed(who.clone()).into(),
      bench_account::<T>(),
      PROTOCOL,
      record.total_top_up_amount,
      gas,
      record,
    )
    .unwrap();
  }

  #[benchmark]
  fn register() {
    let caller: T::AccountId = whitelisted_caller();
    funded::<T>(&caller);
    install_handler::<T>();
    let record = bench_record::<T>();
    let gas = Pallet::<T>::required_gas_deposit(&record);
    let deposit = record.total_top_up_amount;
    #[extrinsic_call]
    register(
      RawOrigin::Signed(caller.clone()),
      bench_account::<T>(),
      PROTOCOL,
      deposit,
      gas,
      record,
    );
    assert!(Pallet::<T>::position(&caller, PROTOCOL, &bench_account::<T>()).is_some());
  }

  #[benchmark]
  fn deregister() {
    let caller: T::AccountId = whitelisted_caller();
    bench_register::<T>(&caller);
    #[extrinsic_call]
    deregister(RawOrigin::Signed(caller.clone()), bench_account::<T>(), PROTOCOL);
    assert!(Pallet::<T>::positions_of(&caller).is_empty());
  }

  #[benchmark]
  fn execute() {
    let registrant: T::AccountId = account("registrant", 0, 0);
    bench_register::<T>(&registrant);
    let keeper: T::AccountId = whitelisted_caller();
    funded::<T>(&keeper);
    #[extrinsic_call]
    execute(
      RawOrigin::Signed(keeper),
      registrant.clone(),
      bench_account::<T>(),
      PROTOCOL,
      1u32.into(),
      None,
    );
    let position = Pallet::<T>::position(&registrant, PROTOCOL, &bench_account::<T>()).unwrap();
    assert_eq!(position.record.total_top_up_amount, 1_000u32.into());
  }

  #[benchmark]
  fn set_handler() {
    let kind = T::BenchmarkHelper::handler();
    #[extrinsic_call]
    set_handler(RawOrigin::Root, PROTOCOL, kind);
    assert!(Handlers::<T>::contains_key(PROTOCOL));
  }

  #[benchmark]
  fn remove_handler() {
    install_handler::<T>();
    #[extrinsic_call]
    remove_handler(RawOrigin::Root, PROTOCOL);
    assert!(!Handlers::<T>::contains_key(PROTOCOL));
  }

  #[benchmark]
  fn set_action_fee() {
    let fee = T::MaxActionFee::get();
    #[extrinsic_call]
    set_action_fee(RawOrigin::Root, fee);
    assert_eq!(ActionFee::<T>::get(), fee);
  }

  #[benchmark]
  fn claim_asset() {
    let caller: T::AccountId = whitelisted_caller();
    let asset = T::BenchmarkHelper::asset();
    let amount: T::Balance = 1_000u32.into();
    T::BenchmarkHelper::mint_asset(asset, &Pallet::<T>::account_id(), amount);
    PendingAssetRefunds::<T>::insert(&caller, asset, amount);
    #[extrinsic_call]
    claim_asset(RawOrigin::Signed(caller.clone()), asset, None);
    assert_eq!(PendingAssetRefunds::<T>::get(&caller, asset), T::Balance::default());
  }

  #[cfg(test)]
  use crate::mock::{Test, new_test_ext};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
