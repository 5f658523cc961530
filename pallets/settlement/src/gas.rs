//! Gas manager
//!
//! Gas spent by observed outbounds is collected per block and settled at end
//! block: the reserve buys the spent gas asset from its pool so liquidity
//! providers are not charged for it. Outbound fees and max gas are priced here too.

use frame::prelude::*;

use crate::{
  config::ConfigKey,
  pallet::{BlockGas, Config, Event, NetworkFees, NetworkState, Pallet, Pools},
  pool_math::{calc_outbound_fee_multiplier, mul_div},
  types::{Asset, Balance, Chain, Coin, GasEntry, ModuleName},
};
use primitives::{params::MAX_BASIS_POINTS, round_to_decimals};

const LOG_TARGET: &str = "runtime::settlement";

/// `base * multiplier / 10000`, rounded down to the chain's precision.
pub fn apply_fee_multiplier(base_fee: Balance, multiplier_bps: u64, decimals: u8) -> Balance {
  let fee = mul_div(base_fee, multiplier_bps as Balance, MAX_BASIS_POINTS as Balance);
  round_to_decimals(fee, decimals)
}

/// Gas an outbound on `chain` may spend, given its network fee.
pub fn max_gas_for(chain: Chain, transaction_size: u64, fee_rate: u64) -> Balance {
  let base = (transaction_size as Balance).saturating_mul(fee_rate as Balance);
  let padded = if chain.is_binance_family() {
    base
  } else {
    base.saturating_mul(3) / 2
  };
  round_to_decimals(padded, chain.gas_asset_decimals())
}

impl<T: Config> Pallet<T> {
  /// Adds spent gas to the block's accumulator, optionally counting the outbound.
  pub fn add_gas_asset(gas: &[Coin], increase_tx_count: bool) {
    if gas.iter().all(|coin| coin.is_empty()) {
      return;
    }
    BlockGas::<T>::mutate(|entries| {
      for coin in gas.iter().filter(|c| !c.is_empty()) {
        match entries.iter_mut().find(|e| e.asset == coin.asset) {
          Some(entry) => {
            entry.amount = entry.amount.saturating_add(coin.amount);
            if increase_tx_count {
              entry.tx_count = entry.tx_count.saturating_add(1);
            }
          },
          None => entries.push(GasEntry {
            asset: coin.asset.clone(),
            amount: coin.amount,
            tx_count: u64::from(increase_tx_count),
          }),
        }
      }
    });
  }

  /// Settles the block's gas against the gas-asset pools.
  pub fn process_gas() -> DispatchResult {
    let mut network = Self::network();
    for entry in BlockGas::<T>::take() {
      let Some(mut pool) = Pools::<T>::get(entry.asset.layer1()) else {
        log::debug!(target: LOG_TARGET, "no pool for gas asset {}", entry.asset);
        continue;
      };
      if pool.is_empty() {
        continue;
      }
      let rune_gas = pool.asset_value_in_rune(entry.amount);
      if rune_gas == 0 {
        continue;
      }
      let reimbursed = Self::rune_balance_of_module(ModuleName::Reserve) >= rune_gas;
      if reimbursed {
        Self::send_from_module_to_module(
          ModuleName::Reserve,
          ModuleName::Asgard,
          &Asset::native_rune(),
          rune_gas,
        )?;
        pool.balance_rune = pool.balance_rune.saturating_add(rune_gas);
        network.outbound_gas_spent_rune = network.outbound_gas_spent_rune.saturating_add(rune_gas);
      } else {
        log::warn!(
          target: LOG_TARGET,
          "reserve cannot cover {} rune of gas for {}, charging the pool",
          rune_gas,
          entry.asset
        );
      }
      pool.balance_asset = pool.balance_asset.saturating_sub(entry.amount);
      Pools::<T>::insert(&pool.asset, &pool);
      Self::deposit_event(Event::GasPaid {
        asset: entry.asset,
        asset_amount: entry.amount,
        rune_amount: if reimbursed { rune_gas } else { 0 },
        tx_count: entry.tx_count,
        reimbursed,
      });
    }
    NetworkState::<T>::put(network);
    Ok(())
  }

  /// Current fee multiplier from the gas withheld versus spent so far.
  pub fn outbound_fee_multiplier() -> u64 {
    let network = Self::network();
    calc_outbound_fee_multiplier(
      Self::config_balance(ConfigKey::TargetOutboundFeeSurplusRune),
      network.outbound_gas_spent_rune,
      network.outbound_gas_withheld_rune,
      Self::config_u64(ConfigKey::MaxOutboundFeeMultiplierBasisPoints),
      Self::config_u64(ConfigKey::MinOutboundFeeMultiplierBasisPoints),
    )
  }

  /// Fee charged on an outbound of `asset` on `chain`, in units of `asset`.
  pub fn get_fee(chain: Chain, asset: &Asset) -> Balance {
    let native_fee = Self::config_balance(ConfigKey::OutboundTransactionFee);
    if asset.is_native_rune() {
      return native_fee;
    }
    if asset.is_native() {
      return Pools::<T>::get(asset.layer1())
        .map(|pool| pool.rune_value_in_asset(native_fee))
        .unwrap_or(0);
    }

    let gas_asset = chain.gas_asset();
    let gas_pool = Pools::<T>::get(&gas_asset);
    let base = NetworkFees::<T>::get(chain)
      .map(|nf| (nf.transaction_size as Balance).saturating_mul(nf.transaction_fee_rate as Balance))
      .unwrap_or(0);
    let mut fee = apply_fee_multiplier(
      base,
      Self::outbound_fee_multiplier(),
      chain.gas_asset_decimals(),
    );

    if let Some(pool) = gas_pool.as_ref().filter(|p| !p.is_empty()) {
      let minimum_rune =
        Self::usd_to_rune(Self::config_balance(ConfigKey::MinimumL1OutboundFeeUsd));
      if minimum_rune > 0 && pool.asset_value_in_rune(fee) < minimum_rune {
        fee = round_to_decimals(
          pool.rune_value_in_asset(minimum_rune),
          chain.gas_asset_decimals(),
        );
      }
    }

    if *asset == gas_asset {
      return fee;
    }
    let fee_in_rune = gas_pool
      .map(|pool| pool.asset_value_in_rune(fee))
      .unwrap_or(0);
    Pools::<T>::get(asset)
      .map(|pool| round_to_decimals(pool.rune_value_in_asset(fee_in_rune), pool.decimals()))
      .unwrap_or(0)
  }

  pub fn get_max_gas(chain: Chain) -> Balance {
    NetworkFees::<T>::get(chain)
      .map(|nf| max_gas_for(chain, nf.transaction_size, nf.transaction_fee_rate))
      .unwrap_or(0)
  }

  pub fn get_gas_rate(chain: Chain) -> i64 {
    NetworkFees::<T>::get(chain)
      .map(|nf| nf.transaction_fee_rate.min(i64::MAX as u64) as i64)
      .unwrap_or(0)
  }
}
