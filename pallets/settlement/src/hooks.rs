//! Block lifecycle
//!
//! `begin_block` clears the per-block gas accumulator and decides on a churn.
//! `end_block` runs the settlement steps in a fixed order. Each step runs in
//! its own storage layer: a failing step is rolled back and logged, and the
//! remaining steps still run.

use frame::prelude::*;
use polkadot_sdk::frame_support::storage::with_storage_layer;

use crate::{
  config::ConfigKey,
  pallet::{BlockGas, Config, Event, NetworkState, Pallet, PoolLuvi, RagnarokBlockHeight},
  types::{Asset, ModuleName},
};

const LOG_TARGET: &str = "runtime::settlement";

impl<T: Config> Pallet<T> {
  pub fn begin_block() {
    BlockGas::<T>::kill();
    Self::run_step("churn check", Self::churn_check);
  }

  pub fn end_block() {
    let height = Self::block_height();
    Self::run_step("block rewards", Self::distribute_block_rewards);
    Self::run_step("ragnarok", Self::ragnarok_stage);
    Self::run_step("ready nodes", Self::mark_ready_nodes);
    Self::run_step("vault migration", Self::migrate_retiring_vaults);
    Self::run_step("vault retirement", Self::retire_vaults);
    Self::run_step("pool ragnarok", Self::pool_ragnarok);
    Self::run_step("gas", Self::process_gas);
    Self::run_step("pool cycle", Self::maybe_cycle_pools);
    let released = Self::release_outbounds(height);
    Self::record_luvi();
    Self::deposit_event(Event::BlockSettled { height, released });
  }

  fn run_step(name: &str, step: fn() -> DispatchResult) {
    if let Err(err) = with_storage_layer(step) {
      log::error!(target: LOG_TARGET, "{} failed: {:?}", name, err);
    }
  }

  /// Moves this block's share of the reserve to the bond module.
  pub fn distribute_block_rewards() -> DispatchResult {
    if RagnarokBlockHeight::<T>::get() > 0 {
      return Ok(());
    }
    let emission_curve = Self::config_balance(ConfigKey::EmissionCurve).max(1);
    let blocks_per_year = Self::config_balance(ConfigKey::BlocksPerYear).max(1);
    let reward = Self::rune_balance_of_module(ModuleName::Reserve) / emission_curve / blocks_per_year;
    if reward == 0 {
      return Ok(());
    }
    Self::send_from_module_to_module(
      ModuleName::Reserve,
      ModuleName::Bond,
      &Asset::native_rune(),
      reward,
    )?;
    NetworkState::<T>::mutate(|network| {
      network.bond_reward_rune = network.bond_reward_rune.saturating_add(reward);
    });
    Self::deposit_event(Event::BlockRewards {
      bond_reward: reward,
    });
    Ok(())
  }

  fn maybe_cycle_pools() -> DispatchResult {
    let cycle = Self::config_u64(ConfigKey::PoolCycle);
    if cycle == 0 || RagnarokBlockHeight::<T>::get() > 0 {
      return Ok(());
    }
    if Self::block_height() % cycle != 0 {
      return Ok(());
    }
    Self::cycle_pools()
  }

  fn record_luvi() {
    for pool in Self::pools_sorted().iter().filter(|pool| pool.is_available()) {
      PoolLuvi::<T>::insert(&pool.asset, Self::calc_pool_luvi(pool));
    }
  }
}
