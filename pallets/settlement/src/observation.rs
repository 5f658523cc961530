//! Observation voting
//!
//! Active validators report what they see on external chains. A transaction is
//! acted on exactly once: the first time its voter reaches a super-majority of
//! the current active set.

use alloc::vec::Vec;

use frame::prelude::*;

use crate::{
  pallet::{
    Config, Error, Event, NetworkFeeVotes, NetworkFees, ObservedTxInVoters, ObservedTxOutVoters,
    Pallet, Vaults,
  },
  types::{Chain, Coin, ModuleName, NetworkFee, ObservedTx, ObservedTxVoter},
};

const LOG_TARGET: &str = "runtime::settlement";

impl<T: Config> Pallet<T> {
  pub fn do_observe_inbound(signer: &T::AccountId, tx: ObservedTx) -> DispatchResult {
    ensure!(!tx.tx.coins.is_empty(), Error::<T>::EmptyCoins);
    let id = tx.tx.id;
    let mut voter = ObservedTxInVoters::<T>::get(id).unwrap_or_else(|| ObservedTxVoter::new(id));
    if !voter.add(tx, signer.clone()) || voter.height > 0 {
      ObservedTxInVoters::<T>::insert(id, voter);
      return Ok(());
    }
    let active = Self::active_addresses();
    let Some(agreed) = voter.consensus(&active).map(|vote| vote.tx.clone()) else {
      ObservedTxInVoters::<T>::insert(id, voter);
      return Ok(());
    };

    let height = Self::block_height();
    voter.tx = Some(agreed.clone());
    voter.height = height;
    voter.finalised_height = height;
    ObservedTxInVoters::<T>::insert(id, voter);
    Self::deposit_event(Event::ObservationFinalised {
      tx_id: id,
      chain: agreed.tx.chain,
      inbound: true,
    });

    let Some(mut vault) = Vaults::<T>::get(&agreed.observed_pub_key) else {
      log::warn!(
        target: LOG_TARGET,
        "inbound {:?} arrived at unknown vault, ignoring",
        id
      );
      return Ok(());
    };
    vault.add_funds(&agreed.tx.coins);
    vault.inbound_tx_count = vault.inbound_tx_count.saturating_add(1);
    Vaults::<T>::insert(vault.pub_key.clone(), vault);

    Self::process_inbound(&agreed, ModuleName::Asgard);
    Ok(())
  }

  pub fn do_observe_outbound(signer: &T::AccountId, tx: ObservedTx) -> DispatchResult {
    let id = tx.tx.id;
    let mut voter = ObservedTxOutVoters::<T>::get(id).unwrap_or_else(|| ObservedTxVoter::new(id));
    if !voter.add(tx, signer.clone()) || voter.height > 0 {
      ObservedTxOutVoters::<T>::insert(id, voter);
      return Ok(());
    }
    let active = Self::active_addresses();
    let Some(agreed) = voter.consensus(&active).map(|vote| vote.tx.clone()) else {
      ObservedTxOutVoters::<T>::insert(id, voter);
      return Ok(());
    };

    let height = Self::block_height();
    voter.tx = Some(agreed.clone());
    voter.height = height;
    voter.finalised_height = height;
    ObservedTxOutVoters::<T>::insert(id, voter);
    Self::deposit_event(Event::ObservationFinalised {
      tx_id: id,
      chain: agreed.tx.chain,
      inbound: false,
    });

    if let Some(mut vault) = Vaults::<T>::get(&agreed.observed_pub_key) {
      let spent: Vec<Coin> = agreed
        .tx
        .coins
        .iter()
        .chain(agreed.tx.gas.iter())
        .cloned()
        .collect();
      vault.sub_funds(&spent);
      vault.outbound_tx_count = vault.outbound_tx_count.saturating_add(1);
      Vaults::<T>::insert(vault.pub_key.clone(), vault);
    }
    Self::add_gas_asset(&agreed.tx.gas, true);

    Self::process_outbound(&agreed);
    Ok(())
  }

  /// Saves a chain's fee once a super-majority proposes the same values.
  pub fn do_observe_network_fee(
    signer: T::AccountId,
    chain: Chain,
    transaction_size: u64,
    transaction_fee_rate: u64,
  ) -> DispatchResult {
    ensure!(!chain.is_native(), Error::<T>::InvalidMessage);
    ensure!(
      transaction_size > 0 && transaction_fee_rate > 0,
      Error::<T>::InvalidMessage
    );
    let proposal = (transaction_size, transaction_fee_rate);
    let mut backers = NetworkFeeVotes::<T>::get(chain, proposal);
    if backers.contains(&signer) {
      return Ok(());
    }
    backers.push(signer);

    let active = Self::active_addresses();
    let count = backers.iter().filter(|b| active.contains(b)).count();
    if !primitives::is_super_majority(count, active.len()) {
      NetworkFeeVotes::<T>::insert(chain, proposal, backers);
      return Ok(());
    }

    let _ = NetworkFeeVotes::<T>::clear_prefix(chain, u32::MAX, None);
    let fee = NetworkFee {
      chain,
      transaction_size,
      transaction_fee_rate,
    };
    if NetworkFees::<T>::get(chain).as_ref() != Some(&fee) {
      NetworkFees::<T>::insert(chain, fee);
      Self::deposit_event(Event::NetworkFeeSet {
        chain,
        transaction_size,
        transaction_fee_rate,
      });
    }
    Ok(())
  }
}
