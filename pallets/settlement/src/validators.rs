//! Validator / churn controller
//!
//! Decides when the validator set rotates, which nodes leave, and which ready
//! nodes join. A churn asks the signers for one new asgard key per group; once
//! every group has reported its key the vault set rotates, bond rewards are
//! paid and node statuses follow the new membership.
//!
//! Between churns the end-block steps keep the set healthy: standby nodes that
//! meet the requirements are marked ready, retiring vaults migrate their funds
//! to the active asgards and are retired once drained.

use alloc::{vec, vec::Vec};

use frame::prelude::*;
use polkadot_sdk::frame_support::storage::with_storage_layer;

use crate::{
  adapters::AddressCodec,
  config::ConfigKey,
  memo::{migrate_memo, yggdrasil_return_memo},
  pallet::{
    BondProviderSets, Config, Error, Event, KeygenBlocks, LastMigrateHeight, NetworkState,
    NodeAccounts, Pallet, RagnarokBlockHeight, SlashPoints, TssVoters, Vaults,
  },
  pool_math::mul_div,
  types::{
    Asset, Balance, BondKind, Chain, Coin, Keygen, ModuleName, NodeAccount, NodeStatus, PubKey,
    PubKeySet, TssVoter, TxOutItem, Vault, VaultStatus, VaultType, Version, blank_tx_id,
  },
};
use primitives::{basis_points_of, params::ONE};

const LOG_TARGET: &str = "runtime::settlement";

/// How many of `active` validators may leave in one churn while a
/// super-majority stays and the set keeps at least `min_bft` nodes.
pub fn find_max_able_to_leave(active: usize, min_bft: usize) -> usize {
  let majority = active * 2 / 3 + 1;
  let max = active.saturating_sub(majority);
  if active.saturating_sub(max) < min_bft {
    return active.saturating_sub(min_bft);
  }
  max
}

/// Splits `count` bond-sorted validators into asgard groups of at most `size`
/// members, dealing them round robin so group bonds stay close. `None` when a
/// group would end up with fewer than two members.
pub fn asgard_groups(count: usize, size: usize) -> Option<Vec<Vec<usize>>> {
  if count == 0 || size == 0 {
    return None;
  }
  let groups = count.div_ceil(size);
  let mut out = vec![Vec::new(); groups];
  for index in 0..count {
    out[index % groups].push(index);
  }
  if out.iter().any(|g| g.len() < 2 || g.len() > size) {
    return None;
  }
  Some(out)
}

impl<T: Config> Pallet<T> {
  pub(crate) fn set_vault_status(vault: &mut Vault, status: VaultStatus) {
    let from = vault.status;
    if from == status {
      return;
    }
    vault.status = status;
    Self::deposit_event(Event::VaultStatusChanged {
      pub_key: vault.pub_key.clone(),
      from,
      to: status,
    });
  }

  /// Height of the most recent churn: creation height of the newest active asgard.
  pub fn last_churn_height() -> u64 {
    Self::asgard_vaults_by_status(VaultStatus::Active)
      .iter()
      .map(|v| v.block_height)
      .max()
      .unwrap_or(0)
  }

  pub fn churn_check() -> DispatchResult {
    if RagnarokBlockHeight::<T>::get() > 0 {
      return Ok(());
    }
    let height = Self::block_height();
    let artificial = Self::config_u64(ConfigKey::ArtificialRagnarokBlockHeight);
    if artificial > 0 && height >= artificial {
      log::info!(target: LOG_TARGET, "artificial ragnarok height {} reached", artificial);
      Self::start_ragnarok();
      return Ok(());
    }

    let active_vaults = Self::asgard_vaults_by_status(VaultStatus::Active);
    if active_vaults.is_empty() {
      return Ok(());
    }
    if Self::asgard_vaults_by_status(VaultStatus::Retiring)
      .iter()
      .any(|vault| !Self::is_vault_drained(vault))
    {
      return Ok(());
    }

    let last_churn = Self::last_churn_height();
    let due = last_churn.saturating_add(Self::config_u64(ConfigKey::ChurnInterval));
    let retry = Self::config_u64(ConfigKey::ChurnRetryInterval).max(1);
    let fresh = height == due;
    let retry_due = height > due && (height - due) % retry == 0;

    let active = Self::list_active_validators();
    let asgard_size = Self::config_u64(ConfigKey::AsgardSize).max(1) as usize;
    let keygen_pending = KeygenBlocks::<T>::iter_keys().next().is_some();
    let mismatch = !keygen_pending && active.len().div_ceil(asgard_size) != active_vaults.len();
    if !(fresh || retry_due || mismatch) {
      return Ok(());
    }

    Self::mark_for_churn(fresh, last_churn, &active);
    let next = Self::next_validator_set();
    if next.len() < Self::config_u64(ConfigKey::MinimumNodesForBft) as usize {
      log::warn!(
        target: LOG_TARGET,
        "next validator set of {} is below the BFT minimum, starting ragnarok",
        next.len()
      );
      Self::start_ragnarok();
      return Ok(());
    }
    Self::request_keygen(next);
    Ok(())
  }

  fn mark_node(node_address: &T::AccountId, score: u64) {
    NodeAccounts::<T>::mutate(node_address, |maybe| {
      if let Some(node) = maybe {
        node.leave_score = score.max(1);
        Self::deposit_event(Event::NodeMarkedToLeave {
          node_address: node_address.clone(),
          leave_score: node.leave_score,
        });
      }
    });
  }

  /// Picks the nodes rotating out on this churn: bad actors first, then the
  /// oldest node (fresh churns only), the lowest bond and outdated versions,
  /// never more than the set can lose.
  pub fn mark_for_churn(fresh: bool, last_churn: u64, active: &[NodeAccount<T::AccountId>]) {
    let count = active.len();
    let min_bft = Self::config_u64(ConfigKey::MinimumNodesForBft) as usize;
    if count <= min_bft.saturating_add(2) {
      return;
    }
    let already = active.iter().filter(|n| n.is_leaving()).count();
    let mut budget = find_max_able_to_leave(count, min_bft).saturating_sub(already);
    let mut marked: Vec<T::AccountId> = active
      .iter()
      .filter(|n| n.is_leaving())
      .map(|n| n.node_address.clone())
      .collect();

    let blocks = Self::block_height().saturating_sub(last_churn) as u128;
    let scored: Vec<(T::AccountId, u128, u64)> = active
      .iter()
      .map(|n| {
        let slash = SlashPoints::<T>::get(&n.node_address);
        let score = blocks.saturating_mul(ONE as u128) / u128::from(slash.max(1));
        (n.node_address.clone(), score, slash)
      })
      .collect();
    let average = scored.iter().fold(0u128, |acc, s| acc.saturating_add(s.1)) / count as u128;
    let redline = average / u128::from(Self::config_u64(ConfigKey::BadValidatorRedline).max(1));
    let min_slash = Self::config_u64(ConfigKey::MinSlashPointsForBadValidator);
    let mut candidates: Vec<&(T::AccountId, u128, u64)> = scored
      .iter()
      .filter(|s| s.2 > min_slash && !marked.contains(&s.0))
      .collect();
    candidates.sort_by_key(|s| s.1);
    let below: Vec<_> = candidates.iter().filter(|s| s.1 <= redline).copied().collect();
    let bad = if below.is_empty() {
      candidates.into_iter().take(1).collect::<Vec<_>>()
    } else {
      below
    };
    for (who, score, _) in bad {
      if budget == 0 {
        return;
      }
      Self::mark_node(who, u64::try_from(*score).unwrap_or(u64::MAX));
      marked.push(who.clone());
      budget -= 1;
    }

    if fresh && budget > 0 {
      if let Some(oldest) = active
        .iter()
        .filter(|n| !marked.contains(&n.node_address))
        .min_by_key(|n| n.active_block_height)
      {
        Self::mark_node(&oldest.node_address, oldest.active_block_height);
        marked.push(oldest.node_address.clone());
        budget -= 1;
      }
    }

    if budget > 0 && count >= Self::config_u64(ConfigKey::DesiredValidatorSet) as usize {
      if let Some(lowest) = active
        .iter()
        .filter(|n| !marked.contains(&n.node_address))
        .min_by_key(|n| n.bond)
      {
        Self::mark_node(&lowest.node_address, 1);
        marked.push(lowest.node_address.clone());
        budget -= 1;
      }
    }

    let min_version = Self::min_join_version();
    let mut outdated: Vec<&NodeAccount<T::AccountId>> = active
      .iter()
      .filter(|n| n.version < min_version && !marked.contains(&n.node_address))
      .collect();
    outdated.sort_by_key(|n| n.version);
    let limit = Self::config_u64(ConfigKey::MaxNodeToChurnOutForLowVersion) as usize;
    for node in outdated.into_iter().take(limit.min(budget)) {
      Self::mark_node(&node.node_address, 1);
    }
  }

  /// Active nodes staying on plus the best-bonded ready nodes.
  pub fn next_validator_set() -> Vec<NodeAccount<T::AccountId>> {
    let desired = Self::config_u64(ConfigKey::DesiredValidatorSet) as usize;
    let new_per_churn = Self::config_u64(ConfigKey::NumberOfNewNodesPerChurn) as usize;
    let min_bft = Self::config_u64(ConfigKey::MinimumNodesForBft) as usize;

    let mut next: Vec<NodeAccount<T::AccountId>> = Self::list_active_validators()
      .into_iter()
      .filter(|n| !n.is_leaving())
      .collect();
    let mut ready = Self::list_validators_by_status(NodeStatus::Ready);
    ready.sort_by(|a, b| b.bond.cmp(&a.bond));

    let mut added = 0;
    for node in ready {
      if next.len() >= desired || (added >= new_per_churn && next.len() >= min_bft) {
        break;
      }
      next.push(node);
      added += 1;
    }
    next
  }

  pub fn request_keygen(mut next: Vec<NodeAccount<T::AccountId>>) {
    next.sort_by(|a, b| b.bond.cmp(&a.bond));
    let size = Self::config_u64(ConfigKey::AsgardSize) as usize;
    let Some(groups) = asgard_groups(next.len(), size) else {
      log::warn!(
        target: LOG_TARGET,
        "cannot split {} validators into asgards of at most {}",
        next.len(),
        size
      );
      return;
    };

    let height = Self::block_height();
    let _ = KeygenBlocks::<T>::clear(u32::MAX, None);
    let _ = TssVoters::<T>::clear(u32::MAX, None);
    let keygens: Vec<Keygen> = groups
      .iter()
      .map(|group| {
        let mut members: Vec<PubKey> = group
          .iter()
          .map(|i| next[*i].pub_key_set.secp256k1.clone())
          .collect();
        members.sort();
        Keygen {
          members,
          pool_pub_key: None,
        }
      })
      .collect();
    for (index, keygen) in keygens.iter().enumerate() {
      Self::deposit_event(Event::KeygenRequested {
        height,
        index: index as u32,
        members: keygen.members.clone(),
      });
    }
    KeygenBlocks::<T>::insert(height, keygens);
  }

  /// Records a member's vote for the key its group generated. The group's
  /// vault is created once every member agrees; the vault set rotates once
  /// every group of the churn is done.
  pub fn do_submit_tss_pool(
    who: T::AccountId,
    height: u64,
    index: u32,
    pool_pub_key: PubKey,
  ) -> DispatchResult {
    ensure!(!pool_pub_key.is_empty(), Error::<T>::InvalidKeygen);
    let node = NodeAccounts::<T>::get(&who).ok_or(Error::<T>::NodeNotFound)?;
    let mut keygens = KeygenBlocks::<T>::get(height);
    let keygen = keygens
      .get_mut(index as usize)
      .ok_or(Error::<T>::InvalidKeygen)?;
    ensure!(
      keygen.members.contains(&node.pub_key_set.secp256k1),
      Error::<T>::Unauthorized
    );

    let mut voter = TssVoters::<T>::get(height, index).unwrap_or_else(|| TssVoter {
      pool_pub_key: pool_pub_key.clone(),
      signers: Vec::new(),
    });
    ensure!(voter.pool_pub_key == pool_pub_key, Error::<T>::InvalidKeygen);
    if voter.signers.contains(&who) {
      return Ok(());
    }
    voter.signers.push(who);
    let complete = voter.signers.len() >= keygen.members.len();
    TssVoters::<T>::insert(height, index, voter);
    if !complete || keygen.pool_pub_key.is_some() {
      return Ok(());
    }

    keygen.pool_pub_key = Some(pool_pub_key.clone());
    let vault = Vault::new(
      pool_pub_key.clone(),
      VaultType::Asgard,
      VaultStatus::Init,
      keygen.members.clone(),
      Self::block_height(),
    );
    Vaults::<T>::insert(&pool_pub_key, vault);
    KeygenBlocks::<T>::insert(height, &keygens);

    if keygens.iter().all(|k| k.pool_pub_key.is_some()) {
      Self::rotate_vaults(height, &keygens)?;
    }
    Ok(())
  }

  /// Switches to the vaults of a finished churn and moves node statuses along.
  pub fn rotate_vaults(height: u64, keygens: &[Keygen]) -> DispatchResult {
    Self::pay_bond_rewards()?;
    let now = Self::block_height();

    for mut vault in Self::asgard_vaults_by_status(VaultStatus::Active) {
      Self::set_vault_status(&mut vault, VaultStatus::Retiring);
      Vaults::<T>::insert(&vault.pub_key, &vault);
    }
    for pub_key in keygens.iter().filter_map(|k| k.pool_pub_key.as_ref()) {
      if let Some(mut vault) = Vaults::<T>::get(pub_key) {
        Self::set_vault_status(&mut vault, VaultStatus::Active);
        Vaults::<T>::insert(pub_key, &vault);
      }
    }

    let members: Vec<&PubKey> = keygens.iter().flat_map(|k| k.members.iter()).collect();
    for mut node in Self::nodes_sorted() {
      let key = &node.pub_key_set.secp256k1;
      let in_set = !key.is_empty() && members.contains(&key);
      if in_set {
        if !node.is_active() {
          Self::set_node_status(&mut node, NodeStatus::Active);
          node.active_block_height = now;
        }
      } else if node.is_active() {
        let status = if node.forced_to_leave {
          NodeStatus::Disabled
        } else {
          NodeStatus::Standby
        };
        Self::set_node_status(&mut node, status);
        node.leave_score = 0;
        Self::request_ygg_return(&node)?;
      } else {
        continue;
      }
      NodeAccounts::<T>::insert(node.node_address.clone(), node);
    }

    let _ = SlashPoints::<T>::clear(u32::MAX, None);
    KeygenBlocks::<T>::remove(height);
    let _ = TssVoters::<T>::clear_prefix(height, u32::MAX, None);
    Ok(())
  }

  /// Splits the accrued bond reward over the active set. Bonds above the
  /// two-thirds hard cap earn nothing extra, and slash points cost their
  /// blocks of reward.
  pub fn pay_bond_rewards() -> DispatchResult {
    let active = Self::list_active_validators();
    if active.is_empty() {
      return Ok(());
    }
    let mut network = Self::network();
    let total_reward = network.bond_reward_rune;
    let total_blocks = Self::block_height().saturating_sub(Self::last_churn_height());
    if total_reward == 0 || total_blocks == 0 {
      return Ok(());
    }

    let mut bonds: Vec<Balance> = active.iter().map(|n| n.bond).collect();
    bonds.sort_unstable();
    let count = bonds.len();
    let mut cap_index = count * 2 / 3;
    if count % 3 == 0 {
      cap_index = cap_index.saturating_sub(1);
    }
    let hard_cap = bonds[cap_index.min(count - 1)];
    let total_effective = active
      .iter()
      .fold(0, |acc: Balance, n| acc.saturating_add(n.bond.min(hard_cap)));
    if total_effective == 0 {
      return Ok(());
    }

    let mut paid: Balance = 0;
    for mut node in active {
      let earned = total_blocks.saturating_sub(SlashPoints::<T>::get(&node.node_address));
      let share = mul_div(total_reward, node.bond.min(hard_cap), total_effective);
      let reward = mul_div(share, earned as Balance, total_blocks as Balance);
      if reward == 0 {
        continue;
      }
      let mut providers = Self::bond_providers_of(&node);
      let operator_fee = basis_points_of(reward, providers.node_operator_fee);
      Self::send_from_module_to_account(
        ModuleName::Bond,
        &node.bond_address,
        &Asset::native_rune(),
        operator_fee,
      )?;
      node.bond = node.bond.saturating_add(reward - operator_fee);
      providers.adjust(node.bond);
      paid = paid.saturating_add(reward);
      Self::deposit_event(Event::Bond {
        node_address: node.node_address.clone(),
        amount: reward,
        kind: BondKind::Reward,
        tx_id: blank_tx_id(),
      });
      BondProviderSets::<T>::insert(&node.node_address, providers);
      NodeAccounts::<T>::insert(node.node_address.clone(), node);
    }
    network.bond_reward_rune = network.bond_reward_rune.saturating_sub(paid);
    NetworkState::<T>::put(network);
    Ok(())
  }

  /// Asks a node's yggdrasil to send everything it holds back to the most
  /// secure active asgard, one zero-amount sweep per chain.
  pub fn request_ygg_return(node: &NodeAccount<T::AccountId>) -> DispatchResult {
    let Some(ygg) = Self::node_yggdrasil(node) else {
      return Ok(());
    };
    if !ygg.has_funds() {
      return Ok(());
    }
    let Some(target) = Self::get_most_secure(&Self::asgard_vaults_by_status(VaultStatus::Active))
    else {
      log::warn!(target: LOG_TARGET, "no active asgard to return yggdrasil funds to");
      return Ok(());
    };
    let height = Self::block_height();
    for chain in Chain::ALL {
      if chain.is_native() || !ygg.has_funds_for_chain(chain) {
        continue;
      }
      let mut item = TxOutItem::new(
        chain,
        T::Addresses::vault_address(&target.pub_key, chain),
        Coin::new(chain.gas_asset(), 0),
        yggdrasil_return_memo(height),
        blank_tx_id(),
      );
      item.vault_pub_key = ygg.pub_key.clone();
      Self::try_add_tx_out_item(item)?;
    }
    Ok(())
  }

  pub fn mark_ready_nodes() -> DispatchResult {
    let min_bond = Self::config_balance(ConfigKey::MinimumBondInRune);
    let min_version = Self::min_join_version();
    for mut node in Self::nodes_sorted() {
      if !matches!(node.status, NodeStatus::Standby | NodeStatus::Ready) {
        continue;
      }
      let ready = !node.pub_key_set.is_empty()
        && !node.ip_address.is_empty()
        && node.bond >= min_bond
        && node.version >= min_version
        && !node.requested_to_leave
        && !node.forced_to_leave
        && Self::node_yggdrasil(&node).is_none_or(|ygg| !ygg.has_funds());
      let status = if ready {
        NodeStatus::Ready
      } else {
        NodeStatus::Standby
      };
      if node.status != status {
        Self::set_node_status(&mut node, status);
        NodeAccounts::<T>::insert(node.node_address.clone(), node);
      }
    }
    Ok(())
  }

  /// A vault is drained once it holds no more than the gas needed to send
  /// its last coins.
  pub fn is_vault_drained(vault: &Vault) -> bool {
    vault.coins.iter().all(|coin| {
      if coin.asset.is_gas_asset() {
        coin.amount <= Self::get_max_gas(coin.asset.chain)
      } else {
        coin.amount == 0
      }
    })
  }

  /// Moves the coins of retiring asgards to the most secure active one, once
  /// every signing period. A chain's gas asset goes last.
  pub fn migrate_retiring_vaults() -> DispatchResult {
    let retiring = Self::asgard_vaults_by_status(VaultStatus::Retiring);
    if retiring.is_empty() {
      return Ok(());
    }
    let height = Self::block_height();
    let period = Self::config_u64(ConfigKey::SigningTransactionPeriod).max(1);
    let last = LastMigrateHeight::<T>::get();
    if last > 0 && height < last.saturating_add(period) {
      return Ok(());
    }
    let Some(target) = Self::get_most_secure(&Self::asgard_vaults_by_status(VaultStatus::Active))
    else {
      return Ok(());
    };
    LastMigrateHeight::<T>::put(height);

    for vault in retiring {
      for coin in vault.coins.iter().filter(|c| !c.is_empty()) {
        let chain = coin.asset.chain;
        if chain.is_native() || Self::pending_outbound(&vault.pub_key, &coin.asset) > 0 {
          continue;
        }
        let amount = if coin.asset.is_gas_asset() {
          let tokens_left = vault
            .coins
            .iter()
            .any(|c| c.asset.chain == chain && !c.asset.is_gas_asset() && c.amount > 0);
          if tokens_left {
            continue;
          }
          coin.amount.saturating_sub(Self::get_max_gas(chain))
        } else {
          coin.amount
        };
        if amount == 0 {
          continue;
        }
        let mut item = TxOutItem::new(
          chain,
          T::Addresses::vault_address(&target.pub_key, chain),
          Coin::new(coin.asset.clone(), amount),
          migrate_memo(height),
          blank_tx_id(),
        );
        item.vault_pub_key = vault.pub_key.clone();
        if let Err(err) = with_storage_layer(|| Self::try_add_tx_out_item(item)) {
          log::warn!(
            target: LOG_TARGET,
            "migration of {} {} not scheduled: {:?}",
            amount,
            coin.asset,
            err
          );
        }
      }
    }
    Ok(())
  }

  pub fn retire_vaults() -> DispatchResult {
    for mut vault in Self::asgard_vaults_by_status(VaultStatus::Retiring) {
      if !Self::is_vault_drained(&vault) || Self::has_pending_outbounds(&vault.pub_key) {
        continue;
      }
      Self::set_vault_status(&mut vault, VaultStatus::Inactive);
      Vaults::<T>::insert(&vault.pub_key, &vault);
    }
    Ok(())
  }

  pub fn do_set_node_keys(who: T::AccountId, pub_key_set: PubKeySet) -> DispatchResult {
    ensure!(!pub_key_set.is_empty(), Error::<T>::InvalidMessage);
    let mut node = NodeAccounts::<T>::get(&who).ok_or(Error::<T>::NodeNotFound)?;
    ensure!(node.pub_key_set.is_empty(), Error::<T>::Unauthorized);
    ensure!(
      Self::node_by_pub_key(&pub_key_set.secp256k1).is_none(),
      Error::<T>::InvalidMessage
    );
    node.pub_key_set = pub_key_set.clone();
    NodeAccounts::<T>::insert(&who, node);
    Self::deposit_event(Event::NodeKeysSet {
      node_address: who,
      pub_key_set,
    });
    Ok(())
  }

  pub fn do_set_version(who: T::AccountId, version: Version) -> DispatchResult {
    let mut node = NodeAccounts::<T>::get(&who).ok_or(Error::<T>::NodeNotFound)?;
    ensure!(
      version != Version::default() && version >= node.version,
      Error::<T>::BadVersion
    );
    node.version = version;
    NodeAccounts::<T>::insert(&who, node);
    Self::deposit_event(Event::VersionSet {
      node_address: who,
      version,
    });
    Ok(())
  }

  pub fn do_set_ip_address(who: T::AccountId, ip_address: Vec<u8>) -> DispatchResult {
    ensure!(!ip_address.is_empty(), Error::<T>::InvalidMessage);
    let mut node = NodeAccounts::<T>::get(&who).ok_or(Error::<T>::NodeNotFound)?;
    node.ip_address = ip_address.clone();
    NodeAccounts::<T>::insert(&who, node);
    Self::deposit_event(Event::IpAddressSet {
      node_address: who,
      ip_address,
    });
    Ok(())
  }
}
