//! Pool cycler
//!
//! Every `PoolCycle` blocks the cycler demotes available pools that are too
//! shallow or earn too little, charges staged pools their holding cost and
//! promotes the deepest staged pool. Once `MaxAvailablePools` is reached a
//! staged pool only gets in by displacing the shallowest available one.

use frame::prelude::*;

use crate::{
  config::ConfigKey,
  pallet::{
    Config, Event, LiquidityProviders, Pallet, PoolLuvi, Pools, RollingPoolLiquidityFees, Vaults,
  },
  types::{Asset, ModuleName, Pool, PoolStatus, Tx},
};
use primitives::params::MAX_BASIS_POINTS;

const LOG_TARGET: &str = "runtime::settlement";

impl<T: Config> Pallet<T> {
  pub(crate) fn set_pool_status(pool: &mut Pool, status: PoolStatus) {
    let from = pool.status;
    if from == status {
      return;
    }
    pool.status = status;
    pool.status_since = Self::block_height();
    Self::deposit_event(Event::PoolStatusChanged {
      pool: pool.asset.clone(),
      from,
      to: status,
    });
  }

  pub fn cycle_pools() -> DispatchResult {
    let min_depth = Self::config_balance(ConfigKey::MinRunePoolDepth);
    let staged_cost = Self::config_balance(ConfigKey::StagedPoolCost);
    let min_fees = Self::config_balance(ConfigKey::MinimumPoolLiquidityFee);
    let max_available = Self::config_u64(ConfigKey::MaxAvailablePools) as usize;

    let pools = Self::pools_sorted();
    let mut available = pools.iter().filter(|pool| pool.is_available()).count();
    let mut on_deck: Option<Pool> = None;
    let mut chopping_block: Option<Pool> = None;

    for mut pool in pools {
      if pool.asset.is_gas_asset() || !pool.asset.is_layer1() {
        continue;
      }
      match pool.status {
        PoolStatus::Available => {
          let fees = Self::get_rolling_pool_liquidity_fee(&pool.asset);
          Self::reset_rolling_pool_liquidity_fee(&pool.asset);
          if pool.balance_rune < min_depth || pool.balance_asset == 0 || fees < min_fees {
            Self::set_pool_status(&mut pool, PoolStatus::Staged);
            Pools::<T>::insert(&pool.asset, &pool);
            available = available.saturating_sub(1);
            continue;
          }
          if chopping_block
            .as_ref()
            .is_none_or(|c| pool.balance_rune < c.balance_rune)
          {
            chopping_block = Some(pool);
          }
        },
        PoolStatus::Staged => {
          let cost = staged_cost.min(pool.balance_rune);
          if cost > 0 {
            pool.balance_rune -= cost;
            Self::send_from_module_to_module(
              ModuleName::Asgard,
              ModuleName::Reserve,
              &Asset::native_rune(),
              cost,
            )?;
            Pools::<T>::insert(&pool.asset, &pool);
            Self::deposit_event(Event::PoolBalanceChanged {
              pool: pool.asset.clone(),
              rune_amount: cost,
              rune_added: false,
              asset_amount: 0,
              asset_added: false,
              reason: b"staged pool cost".to_vec(),
            });
          }
          if pool.balance_rune == 0 && pool.balance_asset > 0 {
            Self::abandon_pool(&pool.asset);
            continue;
          }
          let eligible = pool.balance_rune >= min_depth && pool.balance_asset > 0;
          if eligible && on_deck.as_ref().is_none_or(|d| pool.balance_rune > d.balance_rune) {
            on_deck = Some(pool);
          }
        },
        PoolStatus::Suspended => {},
      }
    }

    let Some(mut promote) = on_deck else {
      return Ok(());
    };
    if available >= max_available {
      let Some(mut demote) = chopping_block else {
        return Ok(());
      };
      if promote.balance_rune <= demote.balance_rune {
        return Ok(());
      }
      Self::set_pool_status(&mut demote, PoolStatus::Staged);
      Pools::<T>::insert(&demote.asset, &demote);
    }
    Self::set_pool_status(&mut promote, PoolStatus::Available);
    Pools::<T>::insert(&promote.asset, &promote);
    Ok(())
  }

  /// Removes a staged pool that ran out of rune. Its asset stays in the vaults
  /// but is no longer accounted to anyone.
  pub fn abandon_pool(asset: &Asset) {
    log::info!(target: LOG_TARGET, "abandoning pool {}", asset);
    for mut vault in Self::vaults_sorted() {
      if vault.coin_amount(asset) > 0 {
        vault.clear_asset(asset);
        Vaults::<T>::insert(&vault.pub_key, &vault);
      }
    }
    for lp in Self::liquidity_providers_sorted(asset) {
      let in_tx = Tx {
        chain: asset.chain,
        from_address: lp.owner().clone(),
        ..Default::default()
      };
      Self::deposit_event(Event::Withdraw {
        pool: asset.clone(),
        liquidity_provider_units: lp.units,
        basis_points: MAX_BASIS_POINTS,
        asymmetry: 0,
        emit_asset: 0,
        emit_rune: 0,
        imp_loss_protection: 0,
        in_tx,
      });
    }
    let _ = LiquidityProviders::<T>::clear_prefix(asset, u32::MAX, None);
    Pools::<T>::remove(asset);
    RollingPoolLiquidityFees::<T>::remove(asset);
    PoolLuvi::<T>::remove(asset);
    Self::deposit_event(Event::PoolSuspended {
      pool: asset.clone(),
    });
  }
}
