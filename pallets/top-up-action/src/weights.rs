#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use core::marker::PhantomData;
use polkadot_sdk::frame_support::{
  traits::Get,
  weights::{constants::RocksDbWeight, Weight},
};

pub trait WeightInfo {
  fn register() -> Weight;
  fn deregister() -> Weight;
  fn execute() -> Weight;
  fn set_handler() -> Weight;
  fn remove_handler() -> Weight;
  fn set_action_fee() -> Weight;
  fn claim_asset() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config + crate::Config> WeightInfo for SubstrateWeight<T> {
  fn register() -> Weight {
    Weight::from_parts(48_000_000, 4200)
      .saturating_add(T::DbWeight::get().reads(6))
      .saturating_add(T::DbWeight::get().writes(6))
  }

  fn deregister() -> Weight {
    Weight::from_parts(40_000_000, 3800)
      .saturating_add(T::DbWeight::get().reads(5))
      .saturating_add(T::DbWeight::get().writes(5))
  }

  fn execute() -> Weight {
    Weight::from_parts(95_000_000, 6400)
      .saturating_add(T::DbWeight::get().reads(9))
      .saturating_add(T::DbWeight::get().writes(8))
  }

  fn set_handler() -> Weight {
    Weight::from_parts(9_000_000, 0)
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn remove_handler() -> Weight {
    Weight::from_parts(11_000_000, 1500)
      .saturating_add(T::DbWeight::get().reads(1))
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn set_action_fee() -> Weight {
    Weight::from_parts(8_000_000, 0)
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn claim_asset() -> Weight {
    Weight::from_parts(24_000_000, 2100)
      .saturating_add(T::DbWeight::get().reads(2))
      .saturating_add(T::DbWeight::get().writes(2))
  }
}

impl WeightInfo for () {
  fn register() -> Weight { Weight::from_parts(48_000_000, 4200) }
  fn deregister() -> Weight { Weight::from_parts(40_000_000, 3800) }
  fn execute() -> Weight { Weight::from_parts(95_000_000, 6400) }
  fn set_handler() -> Weight { Weight::from_parts(9_000_000, 0) }
  fn remove_handler() -> Weight { Weight::from_parts(11_000_000, 1500) }
  fn set_action_fee() -> Weight { Weight::from_parts(8_000_000, 0) }
  fn claim_asset() -> Weight { Weight::from_parts(24_000_000, 2100) }
}
