//! Outbound store & scheduler
//!
//! Handlers hand over payouts as `TxOutItem`s. Native assets settle at once by
//! module transfer. External payouts are charged their outbound fee, assigned a
//! signing vault (split across vaults when no single one can pay), and spread
//! over future blocks so that no block releases more than the configured volume.

use alloc::{vec, vec::Vec};

use frame::prelude::*;
use polkadot_sdk::sp_core::hashing::blake2_256;

use crate::{
  adapters::{AddressCodec, BankOps},
  config::ConfigKey,
  pallet::{
    Config, Error, Event, NetworkState, ObservedTxInVoters, Pallet, Pools, TxOutValues, TxOuts,
    VaultPendingOutbound, VaultPendingOutboundCount,
  },
  types::{
    Asset, Balance, Coin, ModuleName, PubKey, TxId, TxOutItem, Vault, VaultStatus,
  },
};

const LOG_TARGET: &str = "runtime::settlement";

/// `ceil(value / rate)`, at least one block.
pub fn delay_step(value: Balance, rate: Balance, max_offset: u64) -> u64 {
  if rate == 0 {
    return max_offset.max(1);
  }
  let blocks = value.div_ceil(rate).max(1);
  blocks.min(u64::MAX as Balance) as u64
}

/// Splits `needed` over `balances` in the given order, taking as much as each
/// holds. Returns `None` when the total falls short.
pub fn split_amount(balances: &[Balance], needed: Balance) -> Option<Vec<(usize, Balance)>> {
  let mut remaining = needed;
  let mut parts = Vec::new();
  for (index, balance) in balances.iter().enumerate() {
    if remaining == 0 {
      break;
    }
    let take = (*balance).min(remaining);
    if take > 0 {
      parts.push((index, take));
      remaining -= take;
    }
  }
  (remaining == 0).then_some(parts)
}

fn status_rank(vault: &Vault) -> u8 {
  match vault.status {
    VaultStatus::Active => 0,
    _ => 1,
  }
}

/// Order in which vaults fill a split outbound: active before retiring, then
/// the largest spendable balance first so the payout touches as few vaults as
/// it can.
fn fill_order(a: &(Vault, Balance), b: &(Vault, Balance)) -> core::cmp::Ordering {
  status_rank(&a.0).cmp(&status_rank(&b.0)).then(b.1.cmp(&a.1))
}

impl<T: Config> Pallet<T> {
  /// Rune value of a coin at current pool prices.
  pub fn rune_value_of(coin: &Coin) -> Balance {
    if coin.asset.is_rune() {
      return coin.amount;
    }
    Pools::<T>::get(coin.asset.layer1())
      .map(|pool| pool.asset_value_in_rune(coin.amount))
      .unwrap_or(0)
  }

  /// Release height for an outbound worth `value` rune.
  pub fn calc_tx_out_height(value: Balance) -> u64 {
    let now = Self::block_height();
    let first = now.saturating_add(1);
    let threshold = Self::config_balance(ConfigKey::MinTxOutVolumeThreshold);
    if threshold == 0 || TxOutValues::<T>::get(first).saturating_add(value) <= threshold {
      return first;
    }
    let max_offset = Self::config_u64(ConfigKey::MaxTxOutOffset)
      .min(Self::config_u64(ConfigKey::TxOutDelayMax))
      .max(1);
    let cap = now.saturating_add(max_offset);
    let step = delay_step(
      value,
      Self::config_balance(ConfigKey::TxOutDelayRate),
      max_offset,
    );
    let mut height = now.saturating_add(step).min(cap);
    while height < cap && TxOutValues::<T>::get(height) >= threshold {
      height = height.saturating_add(step).min(cap);
    }
    height
  }

  /// Amount of `asset` already promised by undone items signed by `pub_key`,
  /// gas reservations included.
  pub fn pending_outbound(pub_key: &[u8], asset: &Asset) -> Balance {
    let owed = VaultPendingOutbound::<T>::get(pub_key, asset);
    if *asset != asset.chain.gas_asset() {
      return owed;
    }
    let items = VaultPendingOutboundCount::<T>::get(pub_key, asset.chain) as Balance;
    owed.saturating_add(items.saturating_mul(Self::get_max_gas(asset.chain)))
  }

  pub fn has_pending_outbounds(pub_key: &[u8]) -> bool {
    VaultPendingOutboundCount::<T>::iter_prefix_values(pub_key).any(|items| items > 0)
  }

  /// Books a scheduled item against its vault, or releases it once paid.
  pub fn track_pending_outbound(item: &TxOutItem, scheduled: bool) {
    let key = item.vault_pub_key.as_slice();
    VaultPendingOutbound::<T>::mutate_exists(key, &item.coin.asset, |owed| {
      let left = if scheduled {
        owed.unwrap_or(0).saturating_add(item.coin.amount)
      } else {
        owed.unwrap_or(0).saturating_sub(item.coin.amount)
      };
      *owed = (left > 0).then_some(left);
    });
    VaultPendingOutboundCount::<T>::mutate_exists(key, item.chain, |items| {
      let left = if scheduled {
        items.unwrap_or(0).saturating_add(1)
      } else {
        items.unwrap_or(0).saturating_sub(1)
      };
      *items = (left > 0).then_some(left);
    });
  }

  /// What a vault can still pay out of `asset`, keeping back one max gas for
  /// the outbound itself when `asset` pays the chain's gas.
  pub fn available_balance(vault: &Vault, asset: &Asset) -> Balance {
    let mut held = vault
      .coin_amount(asset)
      .saturating_sub(Self::pending_outbound(&vault.pub_key, asset));
    if asset.is_gas_asset() {
      held = held.saturating_sub(Self::get_max_gas(asset.chain));
    }
    held
  }

  /// Picks the vault(s) that pay an external outbound.
  pub fn select_vaults(
    item: &TxOutItem,
    signers: &[T::AccountId],
  ) -> Result<Vec<(PubKey, Balance)>, DispatchError> {
    let asset = &item.coin.asset;
    let signer_nodes: Vec<_> = Self::nodes_sorted()
      .into_iter()
      .filter(|n| signers.contains(&n.node_address))
      .collect();
    let signer_keys = Self::pub_keys_of(&signer_nodes);

    let mut candidates: Vec<Vault> = Self::vaults_sorted()
      .into_iter()
      .filter(|v| {
        v.is_asgard() && matches!(v.status, VaultStatus::Active | VaultStatus::Retiring)
      })
      .collect();
    candidates.extend(Self::yggdrasil_vaults().into_iter().filter(|v| {
      v.status == VaultStatus::Active
        && signer_keys.contains(&v.pub_key)
        && Self::node_by_pub_key(&v.pub_key).is_some_and(|n| n.is_active())
    }));

    let ranked: Vec<(Vault, Balance, Balance)> = candidates
      .into_iter()
      .map(|v| {
        let available = Self::available_balance(&v, asset);
        let security = Self::vault_security(&v);
        (v, available, security)
      })
      .filter(|(_, available, _)| *available > 0)
      .collect();

    let mut single: Vec<&(Vault, Balance, Balance)> = ranked
      .iter()
      .filter(|(_, available, _)| *available >= item.coin.amount)
      .collect();
    if !signer_keys.is_empty() && single.iter().any(|(v, ..)| v.membership.iter().all(|m| signer_keys.contains(m))) {
      single.retain(|(v, ..)| v.membership.iter().all(|m| signer_keys.contains(m)));
    }
    single.sort_by(|a, b| status_rank(&a.0).cmp(&status_rank(&b.0)).then(b.2.cmp(&a.2)));
    if let Some((vault, ..)) = single.first() {
      return Ok(vec![(vault.pub_key.clone(), item.coin.amount)]);
    }

    let mut fillable: Vec<(Vault, Balance)> =
      ranked.into_iter().map(|(vault, available, _)| (vault, available)).collect();
    fillable.sort_by(fill_order);
    let balances: Vec<Balance> = fillable.iter().map(|(_, available)| *available).collect();
    let parts = split_amount(&balances, item.coin.amount).ok_or(Error::<T>::InsufficientFunds)?;
    Ok(
      parts
        .into_iter()
        .map(|(index, amount)| (fillable[index].0.pub_key.clone(), amount))
        .collect(),
    )
  }

  /// Moves the outbound fee out of the paying pool into the reserve.
  fn book_outbound_fee(item: &TxOutItem, fee: Balance) -> DispatchResult {
    let asset = &item.coin.asset;
    let mut pool_deduct = 0;
    if asset.is_native_rune() {
      Self::send_from_module_to_module(item.module_name, ModuleName::Reserve, asset, fee)?;
      pool_deduct = fee;
    } else if let Some(mut pool) = Pools::<T>::get(asset.layer1()) {
      pool_deduct = pool.asset_value_in_rune(fee).min(pool.balance_rune);
      if asset.is_native() {
        T::Bank::burn(&Self::module_account(item.module_name), asset, fee)?;
        Self::deposit_event(Event::MintBurn {
          asset: asset.clone(),
          amount: fee,
          minted: false,
          reason: b"outbound_fee".to_vec(),
        });
      } else {
        pool.balance_asset = pool.balance_asset.saturating_add(fee);
        NetworkState::<T>::mutate(|network| {
          network.outbound_gas_withheld_rune =
            network.outbound_gas_withheld_rune.saturating_add(pool_deduct)
        });
      }
      pool.balance_rune = pool.balance_rune.saturating_sub(pool_deduct);
      Pools::<T>::insert(&pool.asset, &pool);
      Self::send_from_module_to_module(
        ModuleName::Asgard,
        ModuleName::Reserve,
        &Asset::native_rune(),
        pool_deduct,
      )?;
    } else {
      log::debug!(target: LOG_TARGET, "no pool prices the fee of {}", asset);
    }
    Self::deposit_event(Event::Fee {
      tx_id: item.in_hash,
      coin: Coin::new(asset.clone(), fee),
      pool_deduct,
    });
    Ok(())
  }

  fn record_action(in_hash: &TxId, item: &TxOutItem, height: u64) {
    if item.is_internal() {
      return;
    }
    ObservedTxInVoters::<T>::mutate(in_hash, |maybe| {
      if let Some(voter) = maybe {
        voter.set_outbound_height(height);
        voter.actions.push(item.clone());
      }
    });
  }

  /// Pays a native asset straight from its module account.
  fn settle_native(mut item: TxOutItem) -> Result<TxOutItem, DispatchError> {
    let to = T::Addresses::decode(&item.to_address).ok_or(Error::<T>::InvalidAddress)?;
    Self::send_from_module_to_account(item.module_name, &to, &item.coin.asset, item.coin.amount)?;
    item.out_hash = if item.is_internal() {
      TxId::from(blake2_256(&item.encode()))
    } else {
      item.in_hash
    };
    let height = Self::block_height();
    Self::record_action(&item.in_hash.clone(), &item, height);
    Self::deposit_event(Event::OutboundSettled {
      in_hash: item.in_hash,
      out_hash: item.out_hash,
      coin: item.coin.clone(),
    });
    Ok(item)
  }

  /// Charges, routes and schedules one outbound. Returns the items created,
  /// several when the payout had to be split across vaults.
  pub fn try_add_tx_out_item(mut item: TxOutItem) -> Result<Vec<TxOutItem>, DispatchError> {
    ensure!(!item.to_address.is_empty(), Error::<T>::EmptyAddress);
    ensure!(!item.coin.asset.is_empty(), Error::<T>::InvalidAsset);

    if !item.is_internal() {
      let fee = Self::get_fee(item.chain, &item.coin.asset);
      ensure!(item.coin.amount > fee, Error::<T>::NotEnoughToPayFee);
      item.coin.amount -= fee;
      if fee > 0 {
        Self::book_outbound_fee(&item, fee)?;
      }
    }

    if item.coin.asset.is_native() {
      return Ok(vec![Self::settle_native(item)?]);
    }

    item.to_address = item.chain.canonical_address(&item.to_address);
    let parts = if item.vault_pub_key.is_empty() {
      let signers = ObservedTxInVoters::<T>::get(item.in_hash)
        .map(|voter| voter.signers())
        .unwrap_or_default();
      Self::select_vaults(&item, &signers)?
    } else {
      vec![(item.vault_pub_key.clone(), item.coin.amount)]
    };

    let mut scheduled = Vec::with_capacity(parts.len());
    for (vault_pub_key, amount) in parts {
      let mut part = item.clone();
      part.vault_pub_key = vault_pub_key;
      part.coin.amount = amount;
      let value = Self::rune_value_of(&part.coin);
      let height = if part.is_internal() {
        Self::block_height().saturating_add(1)
      } else {
        Self::calc_tx_out_height(value)
      };
      TxOutValues::<T>::mutate(height, |total| *total = total.saturating_add(value));
      TxOuts::<T>::append(height, part.clone());
      Self::track_pending_outbound(&part, true);
      Self::record_action(&part.in_hash.clone(), &part, height);
      Self::deposit_event(Event::ScheduledOutbound {
        height,
        item: part.clone(),
      });
      scheduled.push(part);
    }
    Ok(scheduled)
  }

  /// Hands this block's items to signers with the current gas attached.
  pub fn release_outbounds(height: u64) -> u32 {
    let mut items = TxOuts::<T>::get(height);
    if items.is_empty() {
      return 0;
    }
    let mut released = 0u32;
    for item in items.iter_mut().filter(|item| !item.is_done()) {
      item.max_gas = vec![Coin::new(
        item.chain.gas_asset(),
        Self::get_max_gas(item.chain),
      )];
      item.gas_rate = Self::get_gas_rate(item.chain);
      released = released.saturating_add(1);
      Self::deposit_event(Event::OutboundReleased {
        height,
        item: item.clone(),
      });
    }
    TxOuts::<T>::insert(height, items);
    TxOutValues::<T>::remove(height);
    released
  }
}
