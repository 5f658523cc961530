//! Bond, unbond and leave
//!
//! A node's bond is pooled from whitelisted bond providers. The node operator
//! (the account that first bonded the node) manages the whitelist and the
//! operator fee; providers may only move their own bond.

use frame::prelude::*;

use crate::{
  config::ConfigKey,
  messages::{MsgBond, MsgLeave, MsgUnbond},
  pallet::{BondProviderSets, Config, Error, Event, NodeAccounts, Pallet, RagnarokBlockHeight},
  types::{Asset, BondKind, BondProviders, ModuleName, NodeAccount, NodeStatus, TxId},
};
use primitives::params::MAX_BASIS_POINTS;

impl<T: Config> Pallet<T> {
  pub(crate) fn set_node_status(node: &mut NodeAccount<T::AccountId>, status: NodeStatus) {
    let from = node.status;
    if from == status {
      return;
    }
    node.update_status(status, Self::block_height());
    Self::deposit_event(Event::NodeStatusChanged {
      node_address: node.node_address.clone(),
      from,
      to: status,
    });
  }

  pub(crate) fn bond_providers_of(node: &NodeAccount<T::AccountId>) -> BondProviders<T::AccountId> {
    BondProviderSets::<T>::get(&node.node_address).unwrap_or_else(|| {
      let mut providers = BondProviders::new(node.node_address.clone(), 0);
      providers.whitelist(node.bond_address.clone());
      providers
    })
  }

  pub fn handle_bond(m: MsgBond<T::AccountId>) -> DispatchResult {
    ensure!(RagnarokBlockHeight::<T>::get() == 0, Error::<T>::RagnarokInProgress);
    let height = Self::block_height();
    let (mut node, mut providers) = match NodeAccounts::<T>::get(&m.node_address) {
      Some(node) => {
        let providers = Self::bond_providers_of(&node);
        (node, providers)
      },
      None => {
        let node = NodeAccount::new(m.node_address.clone(), m.signer.clone(), height);
        let mut providers = BondProviders::new(
          m.node_address.clone(),
          Self::config_u64(ConfigKey::NodeOperatorFee),
        );
        providers.whitelist(m.signer.clone());
        (node, providers)
      },
    };

    let is_operator = m.signer == node.bond_address;
    ensure!(is_operator || providers.has(&m.signer), Error::<T>::Unauthorized);
    if let Some(provider) = &m.provider {
      ensure!(is_operator, Error::<T>::Unauthorized);
      providers.whitelist(provider.clone());
    }
    if let Some(fee) = m.operator_fee {
      ensure!(is_operator, Error::<T>::Unauthorized);
      ensure!(fee <= MAX_BASIS_POINTS, Error::<T>::InvalidBasisPoints);
      providers.node_operator_fee = fee;
    }

    if m.bond > 0 {
      Self::send_from_module_to_module(
        ModuleName::Asgard,
        ModuleName::Bond,
        &Asset::native_rune(),
        m.bond,
      )?;
      providers.bond(&m.signer, m.bond);
      node.bond = node.bond.saturating_add(m.bond);
      Self::deposit_event(Event::Bond {
        node_address: m.node_address.clone(),
        amount: m.bond,
        kind: BondKind::Paid,
        tx_id: m.tx.id,
      });
    }
    if node.status == NodeStatus::WhiteListed {
      Self::set_node_status(&mut node, NodeStatus::Standby);
    }

    NodeAccounts::<T>::insert(&m.node_address, node);
    BondProviderSets::<T>::insert(&m.node_address, providers);
    Ok(())
  }

  pub fn handle_unbond(m: MsgUnbond<T::AccountId>) -> DispatchResult {
    let height = Self::block_height();
    let mut node = NodeAccounts::<T>::get(&m.node_address).ok_or(Error::<T>::NodeNotFound)?;
    let mut providers = Self::bond_providers_of(&node);

    let is_operator = m.signer == node.bond_address;
    ensure!(is_operator || providers.has(&m.signer), Error::<T>::Unauthorized);
    let who = match &m.provider {
      Some(provider) => {
        ensure!(is_operator || *provider == m.signer, Error::<T>::Unauthorized);
        provider.clone()
      },
      None => m.signer.clone(),
    };
    ensure!(!node.is_active(), Error::<T>::CannotUnbondActive);
    let unlocked_at = node
      .status_since
      .saturating_add(Self::config_u64(ConfigKey::BondLockupPeriod));
    ensure!(height >= unlocked_at, Error::<T>::BondLocked);
    if let Some(ygg) = Self::node_yggdrasil(&node) {
      ensure!(!ygg.has_funds(), Error::<T>::YggdrasilHasFunds);
    }

    let held = providers.get(&who).map(|p| p.bond).unwrap_or(0);
    let amount = if m.amount == 0 {
      held
    } else {
      m.amount.min(held)
    };
    ensure!(amount > 0, Error::<T>::InsufficientFunds);

    Self::send_from_module_to_account(ModuleName::Bond, &who, &Asset::native_rune(), amount)?;
    providers.unbond(&who, amount);
    if m.provider.is_some() && who != node.bond_address {
      providers.unwhitelist(&who);
    }
    node.bond = node.bond.saturating_sub(amount);
    Self::deposit_event(Event::Bond {
      node_address: m.node_address.clone(),
      amount,
      kind: BondKind::Returned,
      tx_id: m.tx.id,
    });

    NodeAccounts::<T>::insert(&m.node_address, node);
    BondProviderSets::<T>::insert(&m.node_address, providers);
    Self::collect_dust(&m.tx)
  }

  /// An active node is marked to leave on the next churn; any other node has
  /// its whole bond returned and is disabled at once.
  pub fn handle_leave(m: MsgLeave<T::AccountId>) -> DispatchResult {
    let mut node = NodeAccounts::<T>::get(&m.node_address).ok_or(Error::<T>::NodeNotFound)?;
    ensure!(m.signer == node.bond_address, Error::<T>::Unauthorized);

    node.requested_to_leave = true;
    if node.is_active() {
      Self::deposit_event(Event::NodeMarkedToLeave {
        node_address: m.node_address.clone(),
        leave_score: node.leave_score,
      });
    } else {
      if let Some(ygg) = Self::node_yggdrasil(&node) {
        ensure!(!ygg.has_funds(), Error::<T>::YggdrasilHasFunds);
      }
      let mut providers = Self::bond_providers_of(&node);
      Self::return_all_bond(&m.node_address, &mut providers, m.tx.id)?;
      node.bond = 0;
      Self::set_node_status(&mut node, NodeStatus::Disabled);
      BondProviderSets::<T>::insert(&m.node_address, providers);
    }
    NodeAccounts::<T>::insert(&m.node_address, node);
    Self::collect_dust(&m.tx)
  }

  pub(crate) fn return_all_bond(
    node_address: &T::AccountId,
    providers: &mut BondProviders<T::AccountId>,
    tx_id: TxId,
  ) -> DispatchResult {
    for provider in providers.providers.iter_mut().filter(|p| p.bond > 0) {
      Self::send_from_module_to_account(
        ModuleName::Bond,
        &provider.bond_address,
        &Asset::native_rune(),
        provider.bond,
      )?;
      Self::deposit_event(Event::Bond {
        node_address: node_address.clone(),
        amount: provider.bond,
        kind: BondKind::Returned,
        tx_id,
      });
      provider.bond = 0;
    }
    Ok(())
  }
}
