//! Inbound dispatcher
//!
//! Turns a finalised observation into a typed message and applies it. Each
//! inbound runs in its own storage layer: a failing handler leaves no trace
//! except the refund issued for it.

use frame::prelude::*;
use polkadot_sdk::frame_support::storage::with_storage_layer;

use crate::{
  adapters::AddressCodec,
  memo::Memo,
  messages::{
    Msg, MsgAddLiquidity, MsgBond, MsgDonate, MsgLeave, MsgManageThorName, MsgNoOp, MsgOutbound,
    MsgReserve, MsgSwap, MsgSwitch, MsgUnbond, MsgVaultTransfer, MsgWithdrawLiquidity,
  },
  pallet::{Config, Error, Pallet, ThorNames},
  types::{Address, Asset, Chain, Coin, ModuleName, ObservedTx, Pool, blank_tx_id, coin_amount},
};

const LOG_TARGET: &str = "runtime::settlement";

fn symbol_suffix(symbol: &[u8]) -> &[u8] {
  match symbol.iter().position(|b| *b == b'-') {
    Some(index) => &symbol[index + 1..],
    None => &[],
  }
}

fn ends_with(have: &[u8], wanted: &[u8]) -> bool {
  have.len() >= wanted.len() && have[have.len() - wanted.len()..].eq_ignore_ascii_case(wanted)
}

fn starts_with(have: &[u8], wanted: &[u8]) -> bool {
  have.len() >= wanted.len() && have[..wanted.len()].eq_ignore_ascii_case(wanted)
}

fn deepest<'a>(candidates: impl Iterator<Item = &'a Pool>) -> Option<&'a Pool> {
  let mut best: Option<&Pool> = None;
  for pool in candidates {
    if best.is_none_or(|current| pool.balance_rune > current.balance_rune) {
      best = Some(pool);
    }
  }
  best
}

/// Resolves a loosely written asset against the pool set, which must be in key
/// order. An exact pool wins; otherwise the deepest pool with the same chain,
/// ticker and a symbol ending in the requested contract. A truncated contract
/// (`USDT-BD` for `USDT-BD1`) is only tried when nothing ends with it. The
/// asset's class is kept.
pub fn fuzzy_match_in(pools: &[Pool], asset: &Asset) -> Asset {
  let layer1 = asset.layer1();
  if pools.iter().any(|pool| pool.asset == layer1) {
    return asset.clone();
  }
  let wanted = symbol_suffix(&layer1.symbol);
  let same_ticker = || {
    pools.iter().filter(|pool| {
      pool.asset.chain == layer1.chain && pool.asset.ticker.eq_ignore_ascii_case(&layer1.ticker)
    })
  };
  let matched = if wanted.is_empty() {
    deepest(same_ticker())
  } else {
    deepest(same_ticker().filter(|pool| ends_with(&pool.asset.symbol, wanted))).or_else(|| {
      deepest(same_ticker().filter(|pool| starts_with(symbol_suffix(&pool.asset.symbol), wanted)))
    })
  };
  matched
    .map(|pool| pool.asset.with_class(asset.class))
    .unwrap_or_else(|| asset.clone())
}

impl<T: Config> Pallet<T> {
  pub fn fuzzy_asset_match(asset: &Asset) -> Asset {
    fuzzy_match_in(&Self::pools_sorted(), asset)
  }

  /// Address a THORName resolves to on `chain`, if the name is registered and
  /// unexpired.
  pub fn resolve_thor_name(name: &[u8], chain: Chain) -> Option<Address> {
    ThorNames::<T>::get(name.to_ascii_lowercase())
      .filter(|tn| tn.expire_block_height > Self::block_height())
      .and_then(|tn| tn.alias(chain).cloned())
  }

  fn decode_account(address: &[u8], err: Error<T>) -> Result<T::AccountId, DispatchError> {
    T::Addresses::decode(address).ok_or_else(|| err.into())
  }

  /// Builds the typed message an observed inbound asks for.
  pub fn build_msg(tx: &ObservedTx) -> Result<Msg<T::AccountId>, DispatchError> {
    let mut memo = Memo::parse(&tx.tx.memo).map_err(Error::<T>::from)?;
    if let Some(asset) = memo.asset().cloned() {
      memo.set_asset(Self::fuzzy_asset_match(&asset));
    }
    let itx = &tx.tx;
    let rune_amount = coin_amount(&itx.coins, &Asset::native_rune());

    let msg = match memo {
      Memo::AddLiquidity { asset, address } => {
        let (rune_address, asset_address) = if itx.chain.is_native() {
          (
            itx.from_address.clone(),
            asset.chain.canonical_address(&address),
          )
        } else {
          (
            Chain::Thor.canonical_address(&address),
            itx.from_address.clone(),
          )
        };
        Msg::AddLiquidity(MsgAddLiquidity {
          asset_amount: coin_amount(&itx.coins, &asset),
          asset,
          rune_amount,
          rune_address,
          asset_address,
          tx: itx.clone(),
        })
      },
      Memo::WithdrawLiquidity {
        asset,
        basis_points,
        withdrawal_asset,
      } => Msg::WithdrawLiquidity(MsgWithdrawLiquidity {
        asset,
        basis_points,
        withdrawal_asset,
        withdraw_address: itx.from_address.clone(),
        tx: itx.clone(),
      }),
      Memo::Swap {
        asset,
        destination,
        limit,
      } => {
        let out_chain = asset.outbound_chain();
        let destination = if destination.is_empty() {
          ensure!(out_chain == itx.chain, Error::<T>::EmptyAddress);
          itx.from_address.clone()
        } else {
          Self::resolve_thor_name(&destination, out_chain).unwrap_or(destination)
        };
        Msg::Swap(MsgSwap {
          tx: itx.clone(),
          target_asset: asset,
          destination: out_chain.canonical_address(&destination),
          trade_target: limit,
        })
      },
      Memo::Donate { asset } => Msg::Donate(MsgDonate {
        asset_amount: coin_amount(&itx.coins, &asset),
        asset,
        rune_amount,
        tx: itx.clone(),
      }),
      Memo::Refund { tx_id } => Msg::Refund(MsgOutbound {
        in_tx_id: tx_id,
        tx: tx.clone(),
      }),
      Memo::Outbound { tx_id } => Msg::Outbound(MsgOutbound {
        in_tx_id: tx_id,
        tx: tx.clone(),
      }),
      Memo::Ragnarok { .. } => Msg::Ragnarok(MsgOutbound {
        in_tx_id: blank_tx_id(),
        tx: tx.clone(),
      }),
      Memo::Migrate { height } => Msg::Migrate(MsgVaultTransfer {
        tx: tx.clone(),
        block_height: height,
      }),
      Memo::YggdrasilFund { height } => Msg::YggdrasilFund(MsgVaultTransfer {
        tx: tx.clone(),
        block_height: height,
      }),
      Memo::YggdrasilReturn { height } => Msg::YggdrasilReturn(MsgVaultTransfer {
        tx: tx.clone(),
        block_height: height,
      }),
      Memo::Consolidate => Msg::Consolidate(MsgVaultTransfer {
        tx: tx.clone(),
        block_height: 0,
      }),
      Memo::Bond {
        node_address,
        provider,
        operator_fee,
      } => Msg::Bond(MsgBond {
        tx: itx.clone(),
        node_address: Self::decode_account(&node_address, Error::<T>::InvalidAddress)?,
        bond: rune_amount,
        signer: Self::decode_account(&itx.from_address, Error::<T>::MismatchedAddress)?,
        provider: provider
          .map(|p| Self::decode_account(&p, Error::<T>::InvalidAddress))
          .transpose()?,
        operator_fee,
      }),
      Memo::Unbond {
        node_address,
        amount,
        provider,
      } => Msg::Unbond(MsgUnbond {
        tx: itx.clone(),
        node_address: Self::decode_account(&node_address, Error::<T>::InvalidAddress)?,
        amount,
        signer: Self::decode_account(&itx.from_address, Error::<T>::MismatchedAddress)?,
        provider: provider
          .map(|p| Self::decode_account(&p, Error::<T>::InvalidAddress))
          .transpose()?,
      }),
      Memo::Leave { node_address } => Msg::Leave(MsgLeave {
        tx: itx.clone(),
        node_address: Self::decode_account(&node_address, Error::<T>::InvalidAddress)?,
        signer: Self::decode_account(&itx.from_address, Error::<T>::MismatchedAddress)?,
      }),
      Memo::Reserve => Msg::Reserve(MsgReserve {
        tx: itx.clone(),
        contributor: itx.from_address.clone(),
        amount: rune_amount,
      }),
      Memo::Switch { destination } => Msg::Switch(MsgSwitch {
        tx: itx.clone(),
        destination: Self::decode_account(&destination, Error::<T>::InvalidAddress)?,
      }),
      Memo::NoOp { action } => Msg::NoOp(MsgNoOp {
        tx: tx.clone(),
        action,
      }),
      Memo::ManageThorName {
        name,
        chain,
        address,
        owner,
        preferred_asset,
      } => Msg::ManageThorName(MsgManageThorName {
        name,
        chain,
        address,
        coin: Coin::new(Asset::native_rune(), rune_amount),
        owner: owner
          .map(|o| Self::decode_account(&o, Error::<T>::InvalidAddress))
          .transpose()?,
        preferred_asset,
        signer: Self::decode_account(&itx.from_address, Error::<T>::MismatchedAddress)?,
        tx: itx.clone(),
      }),
    };
    Ok(msg)
  }

  /// Routes a message to its handler.
  pub fn handle_msg(msg: Msg<T::AccountId>) -> DispatchResult {
    match msg {
      Msg::AddLiquidity(m) => Self::handle_add_liquidity(m),
      Msg::WithdrawLiquidity(m) => Self::handle_withdraw(m),
      Msg::Swap(m) => Self::handle_swap(m),
      Msg::Donate(m) => Self::handle_donate(m),
      // outbound memos are only valid on funds leaving a vault
      Msg::Refund(_) | Msg::Outbound(_) | Msg::Ragnarok(_) => {
        Err(Error::<T>::InvalidMessage.into())
      },
      // vault to vault movements: the receiving vault was already credited
      Msg::Migrate(_) | Msg::YggdrasilFund(_) | Msg::YggdrasilReturn(_) | Msg::Consolidate(_) => {
        Ok(())
      },
      Msg::Bond(m) => Self::handle_bond(m),
      Msg::Unbond(m) => Self::handle_unbond(m),
      Msg::Leave(m) => Self::handle_leave(m),
      Msg::Reserve(m) => Self::handle_reserve(m),
      Msg::Switch(m) => Self::handle_switch(m),
      Msg::NoOp(m) => Self::handle_noop(m),
      Msg::ManageThorName(m) => Self::handle_manage_thor_name(m),
    }
  }

  /// Applies an inbound, refunding it from `source` when it is rejected.
  pub fn process_inbound(tx: &ObservedTx, source: ModuleName) {
    let result = with_storage_layer(|| -> DispatchResult {
      let msg = Self::build_msg(tx)?;
      msg.validate_basic().map_err(Error::<T>::from)?;
      Self::handle_msg(msg)
    });
    if let Err(err) = result {
      log::info!(
        target: LOG_TARGET,
        "inbound {:?} on {} rejected: {:?}",
        tx.tx.id,
        tx.tx.chain,
        err
      );
      Self::refund_tx(tx, err, source);
    }
  }

  /// Settles an observed outbound against the scheduled items.
  pub fn process_outbound(tx: &ObservedTx) {
    let memo = Memo::parse(&tx.tx.memo).ok();
    let in_hash = memo
      .as_ref()
      .and_then(|m| m.in_hash())
      .unwrap_or_else(blank_tx_id);
    let result = with_storage_layer(|| Self::complete_outbound(tx, in_hash, memo.as_ref()));
    if let Err(err) = result {
      log::warn!(
        target: LOG_TARGET,
        "outbound {:?} on {} not settled: {:?}",
        tx.tx.id,
        tx.tx.chain,
        err
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use alloc::{vec, vec::Vec};

  fn pool(symbol: &str, rune: u128) -> Pool {
    Pool {
      asset: Asset::new(Chain::Bnb, symbol),
      balance_rune: rune,
      ..Default::default()
    }
  }

  fn sorted(mut pools: Vec<Pool>) -> Vec<Pool> {
    pools.sort_by(|a, b| a.asset.cmp(&b.asset));
    pools
  }

  #[test]
  fn fuzzy_match_picks_the_deepest_candidate() {
    let pools = sorted(vec![pool("USDT-A1", 50), pool("USDT-BD1", 150)]);
    let by_suffix = Asset::new(Chain::Bnb, "USDT-BD");
    assert_eq!(fuzzy_match_in(&pools, &by_suffix).symbol, b"USDT-BD1".to_vec());
    let by_ticker = Asset::new(Chain::Bnb, "USDT");
    assert_eq!(fuzzy_match_in(&pools, &by_ticker).symbol, b"USDT-BD1".to_vec());
  }

  #[test]
  fn fuzzy_match_prefers_a_real_suffix_over_a_truncated_contract() {
    let pools = sorted(vec![pool("USDT-BDA", 150), pool("USDT-XBD", 50)]);
    let requested = Asset::new(Chain::Bnb, "USDT-BD");
    assert_eq!(fuzzy_match_in(&pools, &requested).symbol, b"USDT-XBD".to_vec());
  }

  #[test]
  fn fuzzy_match_rejects_contracts_that_neither_end_nor_start_with_the_request() {
    let pools = sorted(vec![pool("USDT-A1", 50), pool("USDT-BD1", 150)]);
    let inner = Asset::new(Chain::Bnb, "USDT-D");
    assert_eq!(fuzzy_match_in(&pools, &inner), inner);
    let other_ticker = Asset::new(Chain::Bnb, "BUSD-BD1");
    assert_eq!(fuzzy_match_in(&pools, &other_ticker), other_ticker);
  }

  #[test]
  fn fuzzy_match_keeps_class_and_is_a_fixpoint() {
    let pools = sorted(vec![pool("USDT-A1", 50), pool("USDT-BD1", 150)]);
    let synth = Asset::new(Chain::Bnb, "usdt").synth();
    let matched = fuzzy_match_in(&pools, &synth);
    assert!(matched.is_synth());
    assert_eq!(fuzzy_match_in(&pools, &matched), matched);
  }

  #[test]
  fn fuzzy_match_ties_go_to_key_order_and_misses_are_unchanged() {
    let pools = sorted(vec![pool("USDT-B2", 10), pool("USDT-A1", 10)]);
    let matched = fuzzy_match_in(&pools, &Asset::new(Chain::Bnb, "USDT"));
    assert_eq!(matched.symbol, b"USDT-A1".to_vec());
    let miss = Asset::new(Chain::Bnb, "BUSD");
    assert_eq!(fuzzy_match_in(&pools, &miss), miss);
  }
}
