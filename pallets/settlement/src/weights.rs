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
  fn observe_inbound(txs: u32) -> Weight;
  fn observe_outbound(txs: u32) -> Weight;
  fn deposit() -> Weight;
  fn set_mimir() -> Weight;
  fn delete_mimir() -> Weight;
  fn set_node_keys() -> Weight;
  fn set_version() -> Weight;
  fn set_ip_address() -> Weight;
  fn submit_tss_pool() -> Weight;
  fn observe_network_fee() -> Weight;
  fn begin_block() -> Weight;
  fn end_block() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config> WeightInfo for SubstrateWeight<T> {
  fn observe_inbound(txs: u32) -> Weight {
    Weight::from_parts(40_000_000, 4000)
      .saturating_add(Weight::from_parts(60_000_000, 6000).saturating_mul(txs.into()))
      .saturating_add(T::DbWeight::get().reads(2_u64.saturating_add(12_u64.saturating_mul(txs.into()))))
      .saturating_add(T::DbWeight::get().writes(10_u64.saturating_mul(txs.into())))
  }
  fn observe_outbound(txs: u32) -> Weight {
    Weight::from_parts(40_000_000, 4000)
      .saturating_add(Weight::from_parts(45_000_000, 5000).saturating_mul(txs.into()))
      .saturating_add(T::DbWeight::get().reads(2_u64.saturating_add(8_u64.saturating_mul(txs.into()))))
      .saturating_add(T::DbWeight::get().writes(6_u64.saturating_mul(txs.into())))
  }
  fn deposit() -> Weight {
    Weight::from_parts(70_000_000, 6000)
      .saturating_add(T::DbWeight::get().reads(14))
      .saturating_add(T::DbWeight::get().writes(10))
  }
  fn set_mimir() -> Weight {
    Weight::from_parts(10_000_000, 1500)
      .saturating_add(T::DbWeight::get().writes(1))
  }
  fn delete_mimir() -> Weight {
    Weight::from_parts(10_000_000, 1500)
      .saturating_add(T::DbWeight::get().writes(1))
  }
  fn set_node_keys() -> Weight {
    Weight::from_parts(20_000_000, 2500)
      .saturating_add(T::DbWeight::get().reads(2))
      .saturating_add(T::DbWeight::get().writes(1))
  }
  fn set_version() -> Weight {
    Weight::from_parts(15_000_000, 2000)
      .saturating_add(T::DbWeight::get().reads(1))
      .saturating_add(T::DbWeight::get().writes(1))
  }
  fn set_ip_address() -> Weight {
    Weight::from_parts(15_000_000, 2000)
      .saturating_add(T::DbWeight::get().reads(1))
      .saturating_add(T::DbWeight::get().writes(1))
  }
  fn submit_tss_pool() -> Weight {
    Weight::from_parts(60_000_000, 8000)
      .saturating_add(T::DbWeight::get().reads(20))
      .saturating_add(T::DbWeight::get().writes(20))
  }
  fn observe_network_fee() -> Weight {
    Weight::from_parts(20_000_000, 2500)
      .saturating_add(T::DbWeight::get().reads(3))
      .saturating_add(T::DbWeight::get().writes(2))
  }
  fn begin_block() -> Weight {
    Weight::from_parts(80_000_000, 10000)
      .saturating_add(T::DbWeight::get().reads(40))
      .saturating_add(T::DbWeight::get().writes(10))
  }
  fn end_block() -> Weight {
    Weight::from_parts(250_000_000, 30000)
      .saturating_add(T::DbWeight::get().reads(120))
      .saturating_add(T::DbWeight::get().writes(60))
  }
}

impl WeightInfo for () {
  fn observe_inbound(txs: u32) -> Weight {
    Weight::from_parts(40_000_000, 4000)
      .saturating_add(Weight::from_parts(60_000_000, 6000).saturating_mul(txs.into()))
      .saturating_add(RocksDbWeight::get().reads(2_u64.saturating_add(12_u64.saturating_mul(txs.into()))))
      .saturating_add(RocksDbWeight::get().writes(10_u64.saturating_mul(txs.into())))
  }
  fn observe_outbound(txs: u32) -> Weight {
    Weight::from_parts(40_000_000, 4000)
      .saturating_add(Weight::from_parts(45_000_000, 5000).saturating_mul(txs.into()))
      .saturating_add(RocksDbWeight::get().reads(2_u64.saturating_add(8_u64.saturating_mul(txs.into()))))
      .saturating_add(RocksDbWeight::get().writes(6_u64.saturating_mul(txs.into())))
  }
  fn deposit() -> Weight {
    Weight::from_parts(70_000_000, 6000)
      .saturating_add(RocksDbWeight::get().reads(14))
      .saturating_add(RocksDbWeight::get().writes(10))
  }
  fn set_mimir() -> Weight {
    Weight::from_parts(10_000_000, 1500)
      .saturating_add(RocksDbWeight::get().writes(1))
  }
  fn delete_mimir() -> Weight {
    Weight::from_parts(10_000_000, 1500)
      .saturating_add(RocksDbWeight::get().writes(1))
  }
  fn set_node_keys() -> Weight {
    Weight::from_parts(20_000_000, 2500)
      .saturating_add(RocksDbWeight::get().reads(2))
      .saturating_add(RocksDbWeight::get().writes(1))
  }
  fn set_version() -> Weight {
    Weight::from_parts(15_000_000, 2000)
      .saturating_add(RocksDbWeight::get().reads(1))
      .saturating_add(RocksDbWeight::get().writes(1))
  }
  fn set_ip_address() -> Weight {
    Weight::from_parts(15_000_000, 2000)
      .saturating_add(RocksDbWeight::get().reads(1))
      .saturating_add(RocksDbWeight::get().writes(1))
  }
  fn submit_tss_pool() -> Weight {
    Weight::from_parts(60_000_000, 8000)
      .saturating_add(RocksDbWeight::get().reads(20))
      .saturating_add(RocksDbWeight::get().writes(20))
  }
  fn observe_network_fee() -> Weight {
    Weight::from_parts(20_000_000, 2500)
      .saturating_add(RocksDbWeight::get().reads(3))
      .saturating_add(RocksDbWeight::get().writes(2))
  }
  fn begin_block() -> Weight {
    Weight::from_parts(80_000_000, 10000)
      .saturating_add(RocksDbWeight::get().reads(40))
      .saturating_add(RocksDbWeight::get().writes(10))
  }
  fn end_block() -> Weight {
    Weight::from_parts(250_000_000, 30000)
      .saturating_add(RocksDbWeight::get().reads(120))
      .saturating_add(RocksDbWeight::get().writes(60))
  }
}
