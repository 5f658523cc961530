use alloc::vec::Vec;

use frame::prelude::*;

use crate::{
  config::ConfigKey,
  memo::{outbound_memo, ragnarok_memo},
  messages::MsgWithdrawLiquidity,
  pallet::{
    Config, Error, Event, LiquidityProviders, Pallet, Pools, RagnarokBlockHeight, RagnarokPending,
  },
  pool_math::{
    ImpLossInput, WithdrawInput, WithdrawSide, calc_imp_loss_protection, calculate_pool_units,
    calculate_withdraw, mul_div,
  },
  types::{
    Address, Asset, Balance, Chain, Coin, LiquidityProvider, ModuleName, TxOutItem, blank_tx_id,
  },
};
use primitives::params::MAX_BASIS_POINTS;

const LOG_TARGET: &str = "runtime::settlement";

impl<T: Config> Pallet<T> {
  pub fn handle_withdraw(m: MsgWithdrawLiquidity) -> DispatchResult {
    Self::do_withdraw(&m, false)?;

    // coins sent to carry the withdraw memo stay with their pools
    for coin in m.tx.coins.iter().filter(|c| !c.is_empty()) {
      let pool_asset = if coin.asset.is_native_rune() {
        m.asset.clone()
      } else {
        coin.asset.layer1()
      };
      if let Some(mut pool) = Pools::<T>::get(&pool_asset) {
        if coin.asset.is_native_rune() {
          pool.balance_rune = pool.balance_rune.saturating_add(coin.amount);
        } else if coin.asset.is_layer1() {
          pool.balance_asset = pool.balance_asset.saturating_add(coin.amount);
        } else {
          continue;
        }
        Pools::<T>::insert(&pool_asset, &pool);
      }
    }
    Ok(())
  }

  fn find_liquidity_provider(
    asset: &Asset,
    address: &Address,
  ) -> Result<(Address, LiquidityProvider), DispatchError> {
    if let Some(lp) = LiquidityProviders::<T>::get(asset, address) {
      return Ok((address.clone(), lp));
    }
    Self::liquidity_providers_sorted(asset)
      .into_iter()
      .find(|lp| lp.asset_address == *address)
      .map(|lp| (lp.owner().clone(), lp))
      .ok_or_else(|| Error::<T>::NoLiquidityProvider.into())
  }

  /// Withdraws `basis_points` of a provider's position and schedules the payouts.
  /// Ragnarok withdrawals skip lockups, pauses and impermanent-loss protection.
  pub fn do_withdraw(m: &MsgWithdrawLiquidity, ragnarok: bool) -> DispatchResult {
    let height = Self::block_height();
    let mut pool = Self::get_pool(&m.asset)?;
    let (key, mut lp) = Self::find_liquidity_provider(&m.asset, &m.withdraw_address)?;
    ensure!(lp.units > 0, Error::<T>::NoLiquidityUnits);
    if !ragnarok {
      let unlocked_at = lp
        .last_add_height
        .saturating_add(Self::config_u64(ConfigKey::LiquidityLockUpBlocks));
      ensure!(height >= unlocked_at, Error::<T>::WithdrawLocked);
    }

    let side = match &m.withdrawal_asset {
      None if lp.is_symmetric() => WithdrawSide::Symmetric,
      None if lp.rune_address.is_empty() => WithdrawSide::Asset,
      None => WithdrawSide::Rune,
      Some(asset) if asset.is_native_rune() => WithdrawSide::Rune,
      Some(_) => WithdrawSide::Asset,
    };
    if !ragnarok && side != WithdrawSide::Symmetric && lp.is_symmetric() {
      ensure!(
        !Self::is_asym_withdrawal_paused(m.asset.chain),
        Error::<T>::AsymWithdrawalPaused
      );
    }
    if side != WithdrawSide::Asset {
      ensure!(!lp.rune_address.is_empty(), Error::<T>::EmptyAddress);
    }
    if side != WithdrawSide::Rune {
      ensure!(!lp.asset_address.is_empty(), Error::<T>::EmptyAddress);
    }

    Self::refresh_synth_units(&mut pool);
    let mut protection: Balance = 0;
    let mut extra_units: Balance = 0;
    if !ragnarok
      && pool.is_available()
      && !Self::is_ilp_disabled(&pool.asset)
      && lp.last_add_height >= Self::config_u64(ConfigKey::IlpCutoff)
    {
      let owed = calc_imp_loss_protection(ImpLossInput {
        rune_deposit_value: lp.rune_deposit_value,
        asset_deposit_value: lp.asset_deposit_value,
        lp_units: lp.units,
        pool_units: pool.pool_units(),
        pool_rune: pool.balance_rune,
        pool_asset: pool.balance_asset,
        basis_points: m.basis_points,
        age: height.saturating_sub(lp.last_add_height.max(pool.status_since)),
        full_protection_blocks: Self::config_u64(ConfigKey::FullImpLossProtectionBlocks),
        minimum_blocks: Self::config_u64(ConfigKey::IlpMinimumBlocks),
      });
      if owed > 0 && Self::rune_balance_of_module(ModuleName::Reserve) >= owed {
        let (_, extra) = calculate_pool_units(
          pool.pool_units(),
          pool.balance_rune,
          pool.balance_asset,
          owed,
          0,
        )
        .map_err(Error::<T>::from)?;
        Self::send_from_module_to_module(
          ModuleName::Reserve,
          ModuleName::Asgard,
          &Asset::native_rune(),
          owed,
        )?;
        pool.balance_rune = pool.balance_rune.saturating_add(owed);
        pool.lp_units = pool.lp_units.saturating_add(extra);
        extra_units = extra;
        protection = owed;
      } else if owed > 0 {
        log::warn!(
          target: LOG_TARGET,
          "reserve cannot cover {} rune of impermanent loss on {}",
          owed,
          pool.asset
        );
      }
    }

    let out = calculate_withdraw(WithdrawInput {
      pool_units: pool.pool_units(),
      pool_rune: pool.balance_rune,
      pool_asset: pool.balance_asset,
      lp_units: lp.units,
      basis_points: m.basis_points,
      side,
      extra_units,
      decimals: pool.decimals(),
      max_gas: pool
        .asset
        .is_gas_asset()
        .then(|| Self::get_max_gas(pool.asset.chain)),
    })
    .map_err(Error::<T>::from)?;

    pool.balance_rune = pool.balance_rune.saturating_sub(out.rune);
    pool.balance_asset = pool
      .balance_asset
      .saturating_sub(out.asset.saturating_add(out.gas_asset));
    pool.lp_units = pool.lp_units.saturating_sub(out.units_to_claim);
    Self::refresh_synth_units(&mut pool);

    let bps = m.basis_points as Balance;
    let full = MAX_BASIS_POINTS as Balance;
    lp.rune_deposit_value = lp
      .rune_deposit_value
      .saturating_sub(mul_div(lp.rune_deposit_value, bps, full));
    lp.asset_deposit_value = lp
      .asset_deposit_value
      .saturating_sub(mul_div(lp.asset_deposit_value, bps, full));
    lp.units = out.units_after;
    lp.last_withdraw_height = height;

    Pools::<T>::insert(&m.asset, &pool);
    if lp.is_empty() && !ragnarok {
      LiquidityProviders::<T>::remove(&m.asset, &key);
    } else {
      LiquidityProviders::<T>::insert(&m.asset, &key, &lp);
    }

    let (memo, in_hash) = if ragnarok {
      (ragnarok_memo(RagnarokBlockHeight::<T>::get()), blank_tx_id())
    } else {
      (outbound_memo(&m.tx.id), m.tx.id)
    };
    let mut scheduled: Vec<TxOutItem> = Vec::new();
    if out.rune > 0 {
      scheduled.extend(Self::try_add_tx_out_item(TxOutItem::new(
        Chain::Thor,
        lp.rune_address.clone(),
        Coin::new(Asset::native_rune(), out.rune),
        memo.clone(),
        in_hash,
      ))?);
    }
    if out.asset > 0 {
      scheduled.extend(Self::try_add_tx_out_item(TxOutItem::new(
        m.asset.chain,
        lp.asset_address.clone(),
        Coin::new(m.asset.clone(), out.asset),
        memo,
        in_hash,
      ))?);
    }
    // only ragnarok payouts carry the memo that settles them against the pending count
    if ragnarok {
      let external = scheduled.iter().filter(|item| !item.coin.asset.is_native()).count();
      RagnarokPending::<T>::mutate(|pending| *pending = pending.saturating_add(external as u64));
    }

    Self::deposit_event(Event::Withdraw {
      pool: m.asset.clone(),
      liquidity_provider_units: out.units_to_claim,
      basis_points: m.basis_points,
      asymmetry: if side == WithdrawSide::Symmetric {
        0
      } else {
        MAX_BASIS_POINTS
      },
      emit_asset: out.asset,
      emit_rune: out.rune,
      imp_loss_protection: protection,
      in_tx: m.tx.clone(),
    });
    Ok(())
  }
}
