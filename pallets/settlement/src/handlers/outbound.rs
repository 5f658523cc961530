//! Outbound completion
//!
//! Observed outbounds settle the scheduled item they pay. Funds leaving a vault
//! without a matching item, or overpaying one, are made good from the bonds of
//! the vault's signers.

use alloc::vec::Vec;

use frame::prelude::*;

use crate::{
  adapters::AddressCodec,
  config::ConfigKey,
  memo::Memo,
  pallet::{
    BondProviderSets, Config, Event, NodeAccounts, ObservedTxInVoters, Pallet, Pools,
    RagnarokPending, TxOuts, Vaults,
  },
  pool_math::mul_div,
  types::{
    Asset, Balance, BondKind, Coin, ModuleName, NodeAccount, ObservedTx, TxId, TxOutItem,
    blank_tx_id, coin_amount,
  },
};
use primitives::params::MAX_BASIS_POINTS;

const LOG_TARGET: &str = "runtime::settlement";

impl<T: Config> Pallet<T> {
  /// Marks the scheduled item `tx` pays as done, or slashes the vault it left
  /// from when nothing was scheduled.
  pub fn complete_outbound(tx: &ObservedTx, in_hash: TxId, memo: Option<&Memo>) -> DispatchResult {
    let mut heights: Vec<u64> = TxOuts::<T>::iter_keys().collect();
    heights.sort_unstable();
    for height in heights {
      let mut items = TxOuts::<T>::get(height);
      let Some(item) = items
        .iter_mut()
        .find(|item| item.in_hash == in_hash && item.matches(tx))
      else {
        continue;
      };
      item.out_hash = tx.tx.id;
      let matched = item.clone();
      Self::track_pending_outbound(&matched, false);
      if items.iter().all(TxOutItem::is_done) {
        TxOuts::<T>::remove(height);
      } else {
        TxOuts::<T>::insert(height, items);
      }
      return Self::settle_matched(tx, matched, memo);
    }

    let destination = tx.tx.chain.canonical_address(&tx.tx.to_address);
    let to_own_vault = Self::vaults_sorted().iter().any(|vault| {
      tx.tx
        .chain
        .canonical_address(&T::Addresses::vault_address(&vault.pub_key, tx.tx.chain))
        == destination
    });
    if to_own_vault {
      log::debug!(target: LOG_TARGET, "unscheduled transfer {:?} between vaults", tx.tx.id);
      return Ok(());
    }
    log::warn!(
      target: LOG_TARGET,
      "outbound {:?} from vault matches no scheduled item, slashing",
      tx.tx.id
    );
    Self::slash_vault(&tx.observed_pub_key, &tx.tx.coins)
  }

  fn settle_matched(tx: &ObservedTx, matched: TxOutItem, memo: Option<&Memo>) -> DispatchResult {
    if matches!(memo, Some(Memo::Ragnarok { .. })) {
      RagnarokPending::<T>::mutate(|pending| *pending = pending.saturating_sub(1));
    }
    if matched.in_hash != blank_tx_id() {
      ObservedTxInVoters::<T>::mutate(matched.in_hash, |maybe| {
        if let Some(voter) = maybe {
          voter.out_txs.push(tx.tx.clone());
          if let Some(action) = voter.actions.iter_mut().find(|action| {
            !action.is_done()
              && action.vault_pub_key == matched.vault_pub_key
              && action.coin.asset == matched.coin.asset
          }) {
            action.out_hash = tx.tx.id;
          }
        }
      });
    }
    Self::deposit_event(Event::OutboundSettled {
      in_hash: matched.in_hash,
      out_hash: tx.tx.id,
      coin: matched.coin.clone(),
    });

    let paid = coin_amount(&tx.tx.coins, &matched.coin.asset);
    if matched.coin.amount > 0 && paid > matched.coin.amount {
      let excess = Coin::new(matched.coin.asset.clone(), paid - matched.coin.amount);
      log::warn!(
        target: LOG_TARGET,
        "outbound {:?} overpaid {} {}",
        tx.tx.id,
        excess.amount,
        excess.asset
      );
      Self::slash_vault(&tx.observed_pub_key, &[excess])?;
    }
    Ok(())
  }

  /// Signers answerable for a vault: the owner of a yggdrasil, the members of
  /// an asgard.
  fn vault_signers(pub_key: &[u8]) -> Vec<NodeAccount<T::AccountId>> {
    let Some(vault) = Vaults::<T>::get(pub_key) else {
      return Vec::new();
    };
    if vault.is_yggdrasil() {
      return Self::node_by_pub_key(&vault.pub_key).into_iter().collect();
    }
    vault
      .membership
      .iter()
      .filter_map(|member| Self::node_by_pub_key(member))
      .collect()
  }

  /// Slashes the signers of `pub_key` for `coins` that left it. The pool is
  /// made whole in rune out of the slashed bond and the remainder goes to the
  /// reserve.
  pub fn slash_vault(pub_key: &[u8], coins: &[Coin]) -> DispatchResult {
    let mut nodes = Self::vault_signers(pub_key);
    if nodes.is_empty() {
      log::warn!(target: LOG_TARGET, "no signers to slash for vault {:?}", pub_key);
      return Ok(());
    }
    let penalty_bps = Self::config_balance(ConfigKey::SlashPenalty);

    for coin in coins.iter().filter(|c| !c.is_empty()) {
      let Some(mut pool) = Pools::<T>::get(coin.asset.layer1()) else {
        continue;
      };
      let value = pool.asset_value_in_rune(coin.amount);
      if value == 0 {
        continue;
      }
      let penalty = mul_div(value, penalty_bps, MAX_BASIS_POINTS as Balance);
      let total_bond = nodes
        .iter()
        .fold(0, |acc: Balance, n| acc.saturating_add(n.bond));

      let mut slashed: Balance = 0;
      for node in nodes.iter_mut() {
        let share = mul_div(penalty, node.bond, total_bond).min(node.bond);
        if share == 0 {
          continue;
        }
        node.bond -= share;
        slashed = slashed.saturating_add(share);
        Self::deposit_event(Event::Bond {
          node_address: node.node_address.clone(),
          amount: share,
          kind: BondKind::Slashed,
          tx_id: blank_tx_id(),
        });
      }

      let to_pool = value.min(slashed);
      Self::send_from_module_to_module(
        ModuleName::Bond,
        ModuleName::Asgard,
        &Asset::native_rune(),
        to_pool,
      )?;
      Self::send_from_module_to_module(
        ModuleName::Bond,
        ModuleName::Reserve,
        &Asset::native_rune(),
        slashed - to_pool,
      )?;
      pool.balance_rune = pool.balance_rune.saturating_add(to_pool);
      pool.balance_asset = pool.balance_asset.saturating_sub(coin.amount);
      Pools::<T>::insert(&pool.asset, &pool);
      Self::deposit_event(Event::SlashVault {
        vault: pub_key.to_vec(),
        pool: pool.asset.clone(),
        asset_amount: coin.amount,
        bond_slashed: slashed,
      });
    }

    for node in nodes {
      let mut providers = Self::bond_providers_of(&node);
      providers.adjust(node.bond);
      BondProviderSets::<T>::insert(&node.node_address, providers);
      NodeAccounts::<T>::insert(node.node_address.clone(), node);
    }
    Ok(())
  }
}
