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
  fn fund() -> Weight;
  fn claim_credit() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config + crate::Config> WeightInfo for SubstrateWeight<T> {
  fn fund() -> Weight {
    Weight::from_parts(22_000_000, 1800)
      .saturating_add(T::DbWeight::get().reads(3))
      .saturating_add(T::DbWeight::get().writes(3))
  }

  fn claim_credit() -> Weight {
    Weight::from_parts(20_000_000, 1600)
      .saturating_add(T::DbWeight::get().reads(3))
      .saturating_add(T::DbWeight::get().writes(3))
  }
}

impl WeightInfo for () {
  fn fund() -> Weight { Weight::from_parts(22_000_000, 1800) }
  fn claim_credit() -> Weight { Weight::from_parts(20_000_000, 1600) }
}
