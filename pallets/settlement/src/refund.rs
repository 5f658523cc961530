//! Refunds of rejected inbounds
//!
//! Every coin of a rejected inbound is sent back to its sender when it can be.
//! When the refund cannot be scheduled the coin is salvaged instead, so nothing
//! received ever stays unaccounted for.

use alloc::vec::Vec;

use frame::prelude::*;
use polkadot_sdk::{
  frame_support::{storage::with_storage_layer, traits::PalletInfoAccess},
  sp_runtime::ModuleError,
};

use crate::{
  adapters::BankOps,
  memo::refund_memo,
  pallet::{Config, Event, Pallet, Pools},
  types::{Asset, Balance, Chain, Coin, ModuleName, ObservedTx, Pool, TxOutItem},
};

const LOG_TARGET: &str = "runtime::settlement";

impl<T: Config> Pallet<T> {
  /// Refund code and reason reported for a rejected inbound: this pallet's
  /// errors map to their index plus 100, anything else to 1.
  pub fn refund_code(err: &DispatchError) -> (u32, Vec<u8>) {
    match err {
      DispatchError::Module(ModuleError {
        index,
        error,
        message,
      }) if *index as usize == <Self as PalletInfoAccess>::index() => (
        u32::from(error[0]).saturating_add(100),
        message.unwrap_or_default().as_bytes().to_vec(),
      ),
      other => (1, <&'static str>::from(*other).as_bytes().to_vec()),
    }
  }

  /// Sends the coins of `tx` back to its sender, salvaging what cannot be sent.
  pub fn refund_tx(tx: &ObservedTx, err: DispatchError, source: ModuleName) {
    let (code, reason) = Self::refund_code(&err);
    let mut fee = Vec::new();
    let mut refunded = Vec::new();

    for coin in tx.tx.coins.iter().filter(|c| !c.is_empty()) {
      if !Self::is_refundable_on(&coin.asset, tx.tx.chain) {
        log::warn!(target: LOG_TARGET, "dropping native rune observed on {}", tx.tx.chain);
        continue;
      }
      let refundable = coin.asset.is_native_rune()
        || Pools::<T>::get(coin.asset.layer1()).is_some_and(|pool| pool.balance_rune > 0);
      if refundable {
        let chain = if coin.asset.is_native() {
          Chain::Thor
        } else {
          tx.tx.chain
        };
        let mut item = TxOutItem::new(
          chain,
          tx.tx.from_address.clone(),
          coin.clone(),
          refund_memo(&tx.tx.id),
          tx.tx.id,
        );
        item.vault_pub_key = tx.observed_pub_key.clone();
        item.module_name = source;
        match with_storage_layer(|| Self::try_add_tx_out_item(item)) {
          Ok(items) => {
            let paid = items
              .iter()
              .fold(0, |acc: Balance, item| acc.saturating_add(item.coin.amount));
            fee.push(Coin::new(coin.asset.clone(), coin.amount.saturating_sub(paid)));
            refunded.push(Coin::new(coin.asset.clone(), paid));
            continue;
          },
          Err(e) => log::info!(
            target: LOG_TARGET,
            "refund of {} {} not scheduled: {:?}",
            coin.amount,
            coin.asset,
            e
          ),
        }
      }
      if let Err(e) = with_storage_layer(|| Self::salvage_coin(tx, coin, source)) {
        log::warn!(
          target: LOG_TARGET,
          "salvage of {} {} failed: {:?}",
          coin.amount,
          coin.asset,
          e
        );
      }
    }

    Self::deposit_event(Event::Refund {
      code,
      reason,
      in_tx: tx.tx.clone(),
      fee,
      refunded,
    });
  }

  /// Keeps an unrefundable coin inside the protocol.
  fn salvage_coin(tx: &ObservedTx, coin: &Coin, source: ModuleName) -> DispatchResult {
    let asset = &coin.asset;
    if !asset.is_native() {
      let layer1 = asset.layer1();
      let mut pool = Pools::<T>::get(&layer1)
        .unwrap_or_else(|| Pool::new(layer1.clone(), Self::block_height()));
      pool.balance_asset = pool.balance_asset.saturating_add(coin.amount);
      Pools::<T>::insert(&layer1, &pool);
      Self::deposit_event(Event::Donate {
        pool: layer1,
        in_tx: tx.tx.clone(),
      });
    } else if asset.is_native_rune() {
      Self::send_from_module_to_module(source, ModuleName::Reserve, asset, coin.amount)?;
      Self::deposit_event(Event::Reserve {
        contributor: tx.tx.from_address.clone(),
        amount: coin.amount,
        tx_id: tx.tx.id,
      });
    } else {
      Self::send_from_module_to_module(source, ModuleName::Protocol, asset, coin.amount)?;
      T::Bank::burn(
        &Self::module_account(ModuleName::Protocol),
        asset,
        coin.amount,
      )?;
      Self::deposit_event(Event::MintBurn {
        asset: asset.clone(),
        amount: coin.amount,
        minted: false,
        reason: b"refund".to_vec(),
      });
    }
    Ok(())
  }

  /// Native rune reported on a foreign chain is a foreign token under the
  /// wrong name and is never sent back.
  pub fn is_refundable_on(asset: &Asset, chain: Chain) -> bool {
    !(asset.is_native_rune() && !chain.is_native())
  }
}
