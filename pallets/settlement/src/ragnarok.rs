//! Ragnarok
//!
//! Winds the protocol down. Once started, every stage that finds no ragnarok
//! outbound still in flight withdraws a growing share of the remaining
//! liquidity: stages 1 to 10 empty the non-gas pools, later stages refund
//! bonds and then empty the gas pools. Each block handles at most
//! `MaxRagnarokWithdrawsPerBlock` providers and resumes where it stopped.
//!
//! A single pool can be retired the same way through its `RAGNAROK-<asset>`
//! Mimir key.

use alloc::vec::Vec;

use frame::prelude::*;
use polkadot_sdk::frame_support::storage::with_storage_layer;

use crate::{
  messages::MsgWithdrawLiquidity,
  pallet::{
    BondProviderSets, Config, Event, LiquidityProviders, NodeAccounts, Pallet, Pools,
    RagnarokBlockHeight, RagnarokNth, RagnarokPending, RagnarokPosition,
  },
  types::{
    Address, Asset, BondKind, ModuleName, NodeStatus, PoolStatus, RagnarokWithdrawPosition, Tx,
    blank_tx_id,
  },
};
use primitives::{basis_points_of, params::MAX_BASIS_POINTS};

const LOG_TARGET: &str = "runtime::settlement";

/// Last ragnarok stage; it withdraws everything that is left.
pub const FINAL_STAGE: u64 = 20;

/// Share of the remaining position a stage withdraws.
pub fn stage_basis_points(nth: u64) -> u64 {
  let step = if nth > 10 { nth - 10 } else { nth };
  step.saturating_mul(1_000).min(MAX_BASIS_POINTS)
}

impl<T: Config> Pallet<T> {
  pub fn start_ragnarok() {
    let height = Self::block_height();
    log::warn!(target: LOG_TARGET, "ragnarok started at height {}", height);
    RagnarokBlockHeight::<T>::put(height);
    RagnarokNth::<T>::put(0);
    RagnarokPosition::<T>::kill();
    Self::deposit_event(Event::RagnarokStarted { height });
    for mut pool in Self::pools_sorted() {
      Self::set_pool_status(&mut pool, PoolStatus::Staged);
      Pools::<T>::insert(&pool.asset, &pool);
    }
  }

  fn sorted_providers(asset: &Asset) -> Vec<Address> {
    let mut keys: Vec<Address> = LiquidityProviders::<T>::iter_prefix(asset)
      .filter(|(_, lp)| lp.units > 0)
      .map(|(key, _)| key)
      .collect();
    keys.sort();
    keys
  }

  fn ragnarok_withdraw(asset: &Asset, owner: &Address, basis_points: u64) {
    let m = MsgWithdrawLiquidity {
      asset: asset.clone(),
      basis_points,
      withdrawal_asset: None,
      withdraw_address: owner.clone(),
      tx: Tx::default(),
    };
    if let Err(err) = with_storage_layer(|| Self::do_withdraw(&m, true)) {
      log::warn!(
        target: LOG_TARGET,
        "ragnarok withdraw of {:?} from {} failed: {:?}",
        owner,
        asset,
        err
      );
    }
  }

  pub fn ragnarok_stage() -> DispatchResult {
    if RagnarokBlockHeight::<T>::get() == 0 {
      return Ok(());
    }
    let pending = RagnarokPending::<T>::get();
    if pending > 0 {
      log::debug!(target: LOG_TARGET, "waiting on {} ragnarok outbounds", pending);
      return Ok(());
    }

    let mut position = RagnarokPosition::<T>::get();
    let fresh = position.nth == 0;
    if fresh {
      let current = RagnarokNth::<T>::get();
      if current >= FINAL_STAGE {
        return Ok(());
      }
      let nth = current + 1;
      RagnarokNth::<T>::put(nth);
      Self::deposit_event(Event::RagnarokStage { nth });
      position = RagnarokWithdrawPosition {
        nth,
        pool: None,
        last_owner: None,
      };
    }
    let nth = position.nth;
    let basis_points = stage_basis_points(nth);

    if fresh && nth == 1 {
      for node in Self::list_active_validators() {
        if let Err(err) = with_storage_layer(|| Self::request_ygg_return(&node)) {
          log::warn!(target: LOG_TARGET, "yggdrasil recall failed: {:?}", err);
        }
      }
    }
    if fresh && nth > 10 {
      Self::ragnarok_bonds(basis_points)?;
    }

    let gas_stage = nth > 10;
    let pools: Vec<Asset> = Self::pools_sorted()
      .into_iter()
      .map(|pool| pool.asset)
      .filter(|asset| asset.is_gas_asset() == gas_stage)
      .filter(|asset| position.pool.as_ref().is_none_or(|from| asset >= from))
      .collect();

    let mut budget = T::MaxRagnarokWithdrawsPerBlock::get();
    for asset in pools {
      let resume_after = match &position.pool {
        Some(from) if *from == asset => position.last_owner.clone(),
        _ => None,
      };
      for owner in Self::sorted_providers(&asset) {
        if resume_after.as_ref().is_some_and(|after| owner <= *after) {
          continue;
        }
        if budget == 0 {
          RagnarokPosition::<T>::put(position);
          return Ok(());
        }
        Self::ragnarok_withdraw(&asset, &owner, basis_points);
        position.pool = Some(asset.clone());
        position.last_owner = Some(owner);
        budget -= 1;
      }
    }
    RagnarokPosition::<T>::kill();
    Ok(())
  }

  /// Returns `basis_points` of every provider's bond. Nodes left without bond
  /// are disabled.
  pub fn ragnarok_bonds(basis_points: u64) -> DispatchResult {
    for mut node in Self::list_validators_with_bond() {
      let mut providers = Self::bond_providers_of(&node);
      for provider in providers.providers.iter_mut().filter(|p| p.bond > 0) {
        let amount = basis_points_of(provider.bond, basis_points);
        if amount == 0 {
          continue;
        }
        Self::send_from_module_to_account(
          ModuleName::Bond,
          &provider.bond_address,
          &Asset::native_rune(),
          amount,
        )?;
        provider.bond -= amount;
        node.bond = node.bond.saturating_sub(amount);
        Self::deposit_event(Event::Bond {
          node_address: node.node_address.clone(),
          amount,
          kind: BondKind::Returned,
          tx_id: blank_tx_id(),
        });
      }
      if node.bond == 0 {
        Self::set_node_status(&mut node, NodeStatus::Disabled);
      }
      BondProviderSets::<T>::insert(&node.node_address, providers);
      NodeAccounts::<T>::insert(node.node_address.clone(), node);
    }
    Ok(())
  }

  /// Suspends pools flagged for ragnarok and pays their providers out in full.
  pub fn pool_ragnarok() -> DispatchResult {
    let mut budget = T::MaxRagnarokWithdrawsPerBlock::get();
    for mut pool in Self::pools_sorted() {
      if !Self::is_pool_ragnarok(&pool.asset) {
        continue;
      }
      if pool.status != PoolStatus::Suspended {
        Self::set_pool_status(&mut pool, PoolStatus::Suspended);
        Pools::<T>::insert(&pool.asset, &pool);
        Self::deposit_event(Event::PoolSuspended {
          pool: pool.asset.clone(),
        });
      }
      for owner in Self::sorted_providers(&pool.asset) {
        if budget == 0 {
          return Ok(());
        }
        Self::ragnarok_withdraw(&pool.asset, &owner, MAX_BASIS_POINTS);
        budget -= 1;
      }
    }
    Ok(())
  }
}
