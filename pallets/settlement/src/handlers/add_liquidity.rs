use frame::prelude::*;

use crate::{
  messages::MsgAddLiquidity,
  pallet::{Config, Error, Event, LiquidityProviders, Pallet, Pools, RagnarokBlockHeight},
  pool_math::calculate_pool_units,
  types::{LiquidityProvider, Pool, PoolStatus, safe_share},
};

impl<T: Config> Pallet<T> {
  /// Adds liquidity. A deposit naming both addresses is held as pending until
  /// its other side arrives, then both sides are committed together.
  pub fn handle_add_liquidity(m: MsgAddLiquidity) -> DispatchResult {
    ensure!(RagnarokBlockHeight::<T>::get() == 0, Error::<T>::RagnarokInProgress);
    ensure!(!Self::is_lp_paused(m.asset.chain), Error::<T>::LiquidityPaused);
    ensure!(!Self::is_pool_ragnarok(&m.asset), Error::<T>::PoolNotAvailable);

    let height = Self::block_height();
    let mut pool = Pools::<T>::get(&m.asset).unwrap_or_else(|| Pool::new(m.asset.clone(), height));
    ensure!(pool.status != PoolStatus::Suspended, Error::<T>::PoolNotAvailable);

    let key = if m.rune_address.is_empty() {
      m.asset_address.clone()
    } else {
      m.rune_address.clone()
    };
    let mut lp = LiquidityProviders::<T>::get(&m.asset, &key).unwrap_or_else(|| LiquidityProvider {
      asset: m.asset.clone(),
      ..Default::default()
    });
    if !lp.asset_address.is_empty() && !m.asset_address.is_empty() {
      ensure!(lp.asset_address == m.asset_address, Error::<T>::MismatchedAddress);
    }
    if lp.rune_address.is_empty() {
      lp.rune_address = m.rune_address.clone();
    }
    if lp.asset_address.is_empty() {
      lp.asset_address = m.asset_address.clone();
    }

    lp.pending_rune = lp.pending_rune.saturating_add(m.rune_amount);
    lp.pending_asset = lp.pending_asset.saturating_add(m.asset_amount);
    pool.pending_inbound_rune = pool.pending_inbound_rune.saturating_add(m.rune_amount);
    pool.pending_inbound_asset = pool.pending_inbound_asset.saturating_add(m.asset_amount);

    let wants_both_sides = !m.rune_address.is_empty() && !m.asset_address.is_empty();
    if wants_both_sides && (lp.pending_rune == 0 || lp.pending_asset == 0) {
      lp.pending_tx_id = Some(m.tx.id);
      LiquidityProviders::<T>::insert(&m.asset, &key, &lp);
      Pools::<T>::insert(&m.asset, &pool);
      Self::deposit_event(Event::PendingLiquidity {
        pool: m.asset,
        rune_address: m.rune_address,
        rune_amount: m.rune_amount,
        asset_address: m.asset_address,
        asset_amount: m.asset_amount,
        tx_id: m.tx.id,
      });
      return Ok(());
    }

    let (rune, asset) = (lp.pending_rune, lp.pending_asset);
    pool.pending_inbound_rune = pool.pending_inbound_rune.saturating_sub(rune);
    pool.pending_inbound_asset = pool.pending_inbound_asset.saturating_sub(asset);
    lp.pending_rune = 0;
    lp.pending_asset = 0;
    lp.pending_tx_id = None;

    Self::refresh_synth_units(&mut pool);
    let (_, added) = calculate_pool_units(
      pool.pool_units(),
      pool.balance_rune,
      pool.balance_asset,
      rune,
      asset,
    )
    .map_err(Error::<T>::from)?;
    ensure!(added > 0, Error::<T>::NoLiquidityUnits);

    pool.balance_rune = pool.balance_rune.saturating_add(rune);
    pool.balance_asset = pool.balance_asset.saturating_add(asset);
    pool.lp_units = pool.lp_units.saturating_add(added);
    let units_now = pool.pool_units();

    lp.units = lp.units.saturating_add(added);
    lp.rune_deposit_value = lp
      .rune_deposit_value
      .saturating_add(safe_share(added, units_now, pool.balance_rune));
    lp.asset_deposit_value = lp
      .asset_deposit_value
      .saturating_add(safe_share(added, units_now, pool.balance_asset));
    lp.last_add_height = height;

    LiquidityProviders::<T>::insert(&m.asset, &key, &lp);
    Pools::<T>::insert(&m.asset, &pool);
    Self::deposit_event(Event::AddLiquidity {
      pool: m.asset,
      provider_units: added,
      rune_address: lp.rune_address,
      rune_amount: rune,
      asset_address: lp.asset_address,
      asset_amount: asset,
      tx_id: m.tx.id,
    });
    Ok(())
  }
}
