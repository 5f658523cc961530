//! Store access helpers
//!
//! Sorted views over the pallet's maps and the module-account plumbing used by
//! every other part of the core. Storage maps iterate in hash order, so every
//! read that feeds a state transition goes through one of the `*_sorted` helpers.

use alloc::vec::Vec;

use frame::prelude::*;
use polkadot_sdk::{sp_core::U256, sp_runtime::traits::SaturatedConversion};

use crate::{
  adapters::BankOps,
  pallet::{
    Config, Error, LiquidityProviders, NetworkState, NodeAccounts, Pallet, PoolLiquidityFees,
    Pools, RollingPoolLiquidityFees, TotalLiquidityFees, Vaults,
  },
  types::{
    Asset, Balance, LiquidityProvider, ModuleName, Network, NodeAccount, NodeStatus, Pool, PubKey,
    Vault, VaultStatus, Version,
  },
};

impl<T: Config> Pallet<T> {
  pub fn block_height() -> u64 {
    frame_system::Pallet::<T>::block_number().saturated_into::<u64>()
  }

  pub fn module_account(module: ModuleName) -> T::AccountId {
    match module {
      ModuleName::Asgard => T::AsgardAccount::get(),
      ModuleName::Bond => T::BondAccount::get(),
      ModuleName::Reserve => T::ReserveAccount::get(),
      ModuleName::Protocol => T::ModuleAccount::get(),
    }
  }

  pub fn module_balance(module: ModuleName, asset: &Asset) -> Balance {
    T::Bank::balance(&Self::module_account(module), asset)
  }

  pub fn rune_balance_of_module(module: ModuleName) -> Balance {
    Self::module_balance(module, &Asset::native_rune())
  }

  pub fn send_from_module_to_module(
    from: ModuleName,
    to: ModuleName,
    asset: &Asset,
    amount: Balance,
  ) -> DispatchResult {
    if amount == 0 || from == to {
      return Ok(());
    }
    T::Bank::transfer(
      &Self::module_account(from),
      &Self::module_account(to),
      asset,
      amount,
    )
  }

  pub fn send_from_module_to_account(
    from: ModuleName,
    to: &T::AccountId,
    asset: &Asset,
    amount: Balance,
  ) -> DispatchResult {
    if amount == 0 {
      return Ok(());
    }
    T::Bank::transfer(&Self::module_account(from), to, asset, amount)
  }

  pub fn network() -> Network {
    NetworkState::<T>::get()
  }

  pub fn get_pool(asset: &Asset) -> Result<Pool, DispatchError> {
    Pools::<T>::get(asset).ok_or_else(|| Error::<T>::PoolNotFound.into())
  }

  pub fn pools_sorted() -> Vec<Pool> {
    let mut pools: Vec<Pool> = Pools::<T>::iter_values().collect();
    pools.sort_by(|a, b| a.asset.cmp(&b.asset));
    pools
  }

  pub fn liquidity_providers_sorted(asset: &Asset) -> Vec<LiquidityProvider> {
    let mut lps: Vec<(Vec<u8>, LiquidityProvider)> =
      LiquidityProviders::<T>::iter_prefix(asset).collect();
    lps.sort_by(|a, b| a.0.cmp(&b.0));
    lps.into_iter().map(|(_, lp)| lp).collect()
  }

  pub fn vaults_sorted() -> Vec<Vault> {
    let mut vaults: Vec<Vault> = Vaults::<T>::iter_values().collect();
    vaults.sort_by(|a, b| a.pub_key.cmp(&b.pub_key));
    vaults
  }

  pub fn asgard_vaults_by_status(status: VaultStatus) -> Vec<Vault> {
    Self::vaults_sorted()
      .into_iter()
      .filter(|v| v.is_asgard() && v.status == status)
      .collect()
  }

  pub fn yggdrasil_vaults() -> Vec<Vault> {
    Self::vaults_sorted()
      .into_iter()
      .filter(|v| v.is_yggdrasil())
      .collect()
  }

  pub fn nodes_sorted() -> Vec<NodeAccount<T::AccountId>> {
    let mut nodes: Vec<NodeAccount<T::AccountId>> = NodeAccounts::<T>::iter_values().collect();
    nodes.sort_by(|a, b| a.node_address.cmp(&b.node_address));
    nodes
  }

  pub fn list_active_validators() -> Vec<NodeAccount<T::AccountId>> {
    Self::list_validators_by_status(NodeStatus::Active)
  }

  pub fn list_validators_by_status(status: NodeStatus) -> Vec<NodeAccount<T::AccountId>> {
    Self::nodes_sorted()
      .into_iter()
      .filter(|n| n.status == status)
      .collect()
  }

  pub fn list_validators_with_bond() -> Vec<NodeAccount<T::AccountId>> {
    Self::nodes_sorted()
      .into_iter()
      .filter(|n| n.bond > 0)
      .collect()
  }

  pub fn active_addresses() -> Vec<T::AccountId> {
    Self::list_active_validators()
      .into_iter()
      .map(|n| n.node_address)
      .collect()
  }

  pub fn node_by_pub_key(pub_key: &[u8]) -> Option<NodeAccount<T::AccountId>> {
    Self::nodes_sorted()
      .into_iter()
      .find(|n| !pub_key.is_empty() && n.pub_key_set.secp256k1.as_slice() == pub_key)
  }

  /// Yggdrasil vault owned by a node.
  pub fn node_yggdrasil(node: &NodeAccount<T::AccountId>) -> Option<Vault> {
    Vaults::<T>::get(&node.pub_key_set.secp256k1).filter(|v| v.is_yggdrasil())
  }

  /// Highest version that a super-majority of the active set already runs.
  pub fn min_join_version() -> Version {
    let active = Self::list_active_validators();
    let mut versions: Vec<Version> = active.iter().map(|n| n.version).collect();
    versions.sort_by(|a, b| b.cmp(a));
    versions.dedup();
    versions
      .into_iter()
      .find(|candidate| {
        let at_least = active.iter().filter(|n| n.version >= *candidate).count();
        primitives::is_super_majority(at_least, active.len())
      })
      .unwrap_or_default()
  }

  /// Rune value of everything a vault holds except gas assets.
  pub fn vault_security(vault: &Vault) -> Balance {
    vault
      .coins
      .iter()
      .filter(|coin| !coin.asset.is_gas_asset())
      .map(|coin| {
        if coin.asset.is_rune() {
          coin.amount
        } else {
          Pools::<T>::get(coin.asset.layer1())
            .map(|pool| pool.asset_value_in_rune(coin.amount))
            .unwrap_or(0)
        }
      })
      .fold(0, |acc: Balance, value| acc.saturating_add(value))
  }

  /// Orders vaults from least to most secure; ties keep key order.
  pub fn sort_by_security(vaults: &mut [Vault]) {
    vaults.sort_by_cached_key(|vault| Self::vault_security(vault));
  }

  pub fn get_most_secure(vaults: &[Vault]) -> Option<Vault> {
    let mut sorted = vaults.to_vec();
    Self::sort_by_security(&mut sorted);
    sorted.pop()
  }

  /// Recomputes a pool's synth units from the current synth supply.
  pub fn refresh_synth_units(pool: &mut Pool) {
    let supply = T::Bank::total_supply(&pool.asset.synth());
    pool.calc_synth_units(supply);
  }

  pub fn add_to_liquidity_fees(asset: &Asset, fee_rune: Balance) {
    let height = Self::block_height();
    PoolLiquidityFees::<T>::mutate(height, asset, |fees| *fees = fees.saturating_add(fee_rune));
    TotalLiquidityFees::<T>::mutate(height, |fees| *fees = fees.saturating_add(fee_rune));
    RollingPoolLiquidityFees::<T>::mutate(asset, |fees| *fees = fees.saturating_add(fee_rune));
  }

  pub fn get_rolling_pool_liquidity_fee(asset: &Asset) -> Balance {
    RollingPoolLiquidityFees::<T>::get(asset)
  }

  pub fn reset_rolling_pool_liquidity_fee(asset: &Asset) {
    RollingPoolLiquidityFees::<T>::remove(asset);
  }

  /// Liquidity unit value index: `sqrt(R * A) * 1e8 / units`.
  pub fn calc_pool_luvi(pool: &Pool) -> Balance {
    let units = pool.pool_units();
    if units == 0 {
      return 0;
    }
    let depth = (U256::from(pool.balance_rune) * U256::from(pool.balance_asset)).integer_sqrt();
    let luvi = depth * U256::from(primitives::params::ONE as u128) / U256::from(units);
    if luvi > U256::from(u128::MAX) {
      u128::MAX
    } else {
      luvi.as_u128()
    }
  }

  pub fn pub_keys_of(nodes: &[NodeAccount<T::AccountId>]) -> Vec<PubKey> {
    nodes
      .iter()
      .map(|n| n.pub_key_set.secp256k1.clone())
      .collect()
  }
}
