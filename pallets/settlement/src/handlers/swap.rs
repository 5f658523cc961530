use frame::prelude::*;

use crate::{
  adapters::BankOps,
  config::ConfigKey,
  memo::outbound_memo,
  messages::MsgSwap,
  pallet::{Config, Error, Event, Pallet, Pools},
  pool_math::{calc_swap, mul_div},
  types::{Asset, Coin, ModuleName, Tx, TxOutItem},
};
use primitives::params::MAX_BASIS_POINTS;

impl<T: Config> Pallet<T> {
  /// Swaps the inbound coin into `target_asset`, through rune when neither
  /// side is rune, and pays the result to the destination.
  pub fn handle_swap(m: MsgSwap) -> DispatchResult {
    let coin = m
      .tx
      .coins
      .iter()
      .find(|c| !c.is_empty())
      .cloned()
      .ok_or(Error::<T>::EmptyCoins)?;
    ensure!(coin.asset != m.target_asset, Error::<T>::InvalidAsset);
    ensure!(!m.target_asset.is_derived(), Error::<T>::InvalidAsset);
    for chain in [m.tx.chain, coin.asset.chain, m.target_asset.outbound_chain()] {
      ensure!(!Self::is_trading_halted(chain), Error::<T>::TradingHalted);
    }

    let emitted = if coin.asset.is_native_rune() || m.target_asset.is_native_rune() {
      Self::swap_one(&coin, &m.target_asset, m.trade_target, &m.tx)?
    } else {
      let rune = Self::swap_one(&coin, &Asset::native_rune(), 0, &m.tx)?;
      Self::swap_one(&rune, &m.target_asset, m.trade_target, &m.tx)?
    };
    ensure!(emitted.amount >= m.trade_target, Error::<T>::TradeTargetNotMet);

    Self::try_add_tx_out_item(TxOutItem::new(
      m.target_asset.outbound_chain(),
      m.destination,
      emitted,
      outbound_memo(&m.tx.id),
      m.tx.id,
    ))?;
    Ok(())
  }

  /// One leg through a single pool. Exactly one of `coin.asset` and `target`
  /// is native rune.
  fn swap_one(coin: &Coin, target: &Asset, trade_target: u128, tx: &Tx) -> Result<Coin, DispatchError> {
    let rune_in = coin.asset.is_native_rune();
    let pool_asset = if rune_in {
      target.layer1()
    } else {
      coin.asset.layer1()
    };
    let mut pool = Self::get_pool(&pool_asset)?;
    ensure!(pool.is_available(), Error::<T>::PoolNotAvailable);
    ensure!(pool.balance_rune > 0, Error::<T>::ZeroRuneDepth);
    ensure!(pool.balance_asset > 0, Error::<T>::ZeroAssetDepth);

    let out = if rune_in {
      calc_swap(coin.amount, pool.balance_rune, pool.balance_asset)
    } else {
      calc_swap(coin.amount, pool.balance_asset, pool.balance_rune)
    };
    ensure!(out.emit > 0, Error::<T>::InsufficientSwapOutput);
    let fee_in_rune = if rune_in {
      pool.asset_value_in_rune(out.liquidity_fee)
    } else {
      out.liquidity_fee
    };
    let asgard = Self::module_account(ModuleName::Asgard);

    if rune_in {
      pool.balance_rune = pool.balance_rune.saturating_add(coin.amount);
      if target.is_synth() {
        ensure!(
          Self::get_config_int64(ConfigKey::MintSynths) > 0,
          Error::<T>::SynthsDisabled
        );
        let supply = T::Bank::total_supply(target).saturating_add(out.emit);
        let cap = Self::config_balance(ConfigKey::MaxSynthPerPoolDepth);
        let share = mul_div(
          supply,
          MAX_BASIS_POINTS as u128,
          pool.balance_asset.saturating_mul(2),
        );
        ensure!(share <= cap, Error::<T>::SynthSupplyExceeded);
        T::Bank::mint(&asgard, target, out.emit)?;
        Self::deposit_event(Event::MintBurn {
          asset: target.clone(),
          amount: out.emit,
          minted: true,
          reason: b"swap".to_vec(),
        });
      } else {
        pool.balance_asset = pool.balance_asset.saturating_sub(out.emit);
      }
    } else {
      pool.balance_rune = pool.balance_rune.saturating_sub(out.emit);
      if coin.asset.is_synth() {
        T::Bank::burn(&asgard, &coin.asset, coin.amount)?;
        Self::deposit_event(Event::MintBurn {
          asset: coin.asset.clone(),
          amount: coin.amount,
          minted: false,
          reason: b"swap".to_vec(),
        });
      } else {
        pool.balance_asset = pool.balance_asset.saturating_add(coin.amount);
      }
    }
    Self::refresh_synth_units(&mut pool);
    Pools::<T>::insert(&pool_asset, &pool);
    Self::add_to_liquidity_fees(&pool_asset, fee_in_rune);

    let emit = Coin::new(target.clone(), out.emit);
    Self::deposit_event(Event::Swap {
      pool: pool_asset,
      swap_target: trade_target,
      swap_slip: out.slip_basis_points,
      liquidity_fee: out.liquidity_fee,
      liquidity_fee_in_rune: fee_in_rune,
      in_tx: tx.clone(),
      emit: emit.clone(),
    });
    Ok(emit)
  }
}
