use alloc::vec::Vec;

use frame::prelude::*;

use crate::{
  adapters::BankOps,
  config::ConfigKey,
  messages::{MsgManageThorName, MsgNoOp, MsgReserve, MsgSwitch},
  pallet::{Config, Error, Event, NetworkState, Pallet, ThorNames, Vaults},
  types::{Asset, Chain, ModuleName, ThorName},
};

impl<T: Config> Pallet<T> {
  pub fn handle_reserve(m: MsgReserve) -> DispatchResult {
    Self::send_from_module_to_module(
      ModuleName::Asgard,
      ModuleName::Reserve,
      &Asset::native_rune(),
      m.amount,
    )?;
    Self::deposit_event(Event::Reserve {
      contributor: m.contributor,
      amount: m.amount,
      tx_id: m.tx.id,
    });
    Ok(())
  }

  /// Foreign rune tokens are kept in the vault and the same amount of native
  /// rune is minted to the destination.
  pub fn handle_switch(m: MsgSwitch<T::AccountId>) -> DispatchResult {
    let coin = m
      .tx
      .coins
      .iter()
      .find(|c| c.asset.is_switchable_rune() && !c.is_empty())
      .cloned()
      .ok_or(Error::<T>::InvalidAsset)?;
    let native = Asset::native_rune();
    T::Bank::mint(&m.destination, &native, coin.amount)?;
    NetworkState::<T>::mutate(|network| {
      if coin.asset.chain == Chain::Bnb {
        network.burned_bep2_rune = network.burned_bep2_rune.saturating_add(coin.amount);
      } else {
        network.burned_erc20_rune = network.burned_erc20_rune.saturating_add(coin.amount);
      }
    });
    Self::deposit_event(Event::MintBurn {
      asset: native,
      amount: coin.amount,
      minted: true,
      reason: b"switch".to_vec(),
    });
    Self::deposit_event(Event::Switch {
      from: m.tx.from_address,
      to: m.destination,
      coin,
      tx_id: m.tx.id,
    });
    Ok(())
  }

  /// `NOOP:NOVAULT` takes the coins back out of the vault they were credited to.
  pub fn handle_noop(m: MsgNoOp) -> DispatchResult {
    if m.action.eq_ignore_ascii_case(b"novault") {
      Vaults::<T>::mutate(&m.tx.observed_pub_key, |maybe| {
        if let Some(vault) = maybe {
          vault.sub_funds(&m.tx.tx.coins);
        }
      });
    }
    Ok(())
  }

  /// Registers or renews a THORName. The register fee buys a new name; whatever
  /// is paid beyond it extends the expiry at the per-block fee.
  pub fn handle_manage_thor_name(m: MsgManageThorName<T::AccountId>) -> DispatchResult {
    let height = Self::block_height();
    let name: Vec<u8> = m.name.to_ascii_lowercase();
    let paid = m.coin.amount;
    let per_block = Self::config_balance(ConfigKey::TnsFeePerBlock);

    let current = ThorNames::<T>::get(&name).filter(|tn| tn.expire_block_height > height);
    let (mut tn, extra) = match current {
      Some(tn) => {
        ensure!(tn.owner == m.signer, Error::<T>::Unauthorized);
        (tn, paid)
      },
      None => {
        let register_fee = Self::config_balance(ConfigKey::TnsRegisterFee);
        ensure!(paid >= register_fee, Error::<T>::InsufficientThorNameFee);
        let tn = ThorName {
          name: name.clone(),
          expire_block_height: height,
          owner: m.signer.clone(),
          preferred_asset: None,
          aliases: Vec::new(),
        };
        (tn, paid - register_fee)
      },
    };
    tn.expire_block_height = if per_block == 0 {
      u64::MAX
    } else {
      let blocks = u64::try_from(extra / per_block).unwrap_or(u64::MAX);
      tn.expire_block_height.saturating_add(blocks)
    };
    ensure!(tn.expire_block_height > height, Error::<T>::InsufficientThorNameFee);

    if let Some(owner) = m.owner {
      tn.owner = owner;
    }
    if let Some(asset) = m.preferred_asset {
      tn.preferred_asset = Some(asset);
    }
    let address = m.chain.canonical_address(&m.address);
    tn.set_alias(m.chain, address.clone());

    Self::send_from_module_to_module(
      ModuleName::Asgard,
      ModuleName::Reserve,
      &Asset::native_rune(),
      paid,
    )?;
    Self::deposit_event(Event::ThorNameSet {
      name: name.clone(),
      chain: m.chain,
      address,
      owner: tn.owner.clone(),
      expire: tn.expire_block_height,
      fee: paid,
    });
    ThorNames::<T>::insert(&name, tn);
    Ok(())
  }
}
