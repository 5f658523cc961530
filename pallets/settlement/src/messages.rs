//! Typed internal messages
//!
//! The dispatcher turns a parsed memo plus the observed transaction into one of
//! these. `validate_basic` checks only what can be checked without the store.

use alloc::vec::Vec;

use crate::types::{Address, Asset, Balance, Chain, Coin, ObservedTx, Tx, TxId};
use primitives::params::MAX_BASIS_POINTS;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MsgError {
  EmptyAddress,
  EmptyCoins,
  InvalidAsset,
  InvalidBasisPoints,
  InvalidThorName,
  InvalidMessage,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsgAddLiquidity {
  pub asset: Asset,
  pub rune_amount: Balance,
  pub asset_amount: Balance,
  pub rune_address: Address,
  pub asset_address: Address,
  pub tx: Tx,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsgWithdrawLiquidity {
  pub asset: Asset,
  pub basis_points: u64,
  pub withdrawal_asset: Option<Asset>,
  pub withdraw_address: Address,
  pub tx: Tx,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsgSwap {
  pub tx: Tx,
  pub target_asset: Asset,
  pub destination: Address,
  pub trade_target: Balance,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsgDonate {
  pub asset: Asset,
  pub rune_amount: Balance,
  pub asset_amount: Balance,
  pub tx: Tx,
}

/// An observed outbound answering a scheduled item.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsgOutbound {
  pub in_tx_id: TxId,
  pub tx: ObservedTx,
}

/// Vault-to-vault movements: migrations, yggdrasil funding and returns, consolidation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsgVaultTransfer {
  pub tx: ObservedTx,
  pub block_height: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsgBond<AccountId> {
  pub tx: Tx,
  pub node_address: AccountId,
  pub bond: Balance,
  pub signer: AccountId,
  pub provider: Option<AccountId>,
  pub operator_fee: Option<u64>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsgUnbond<AccountId> {
  pub tx: Tx,
  pub node_address: AccountId,
  pub amount: Balance,
  pub signer: AccountId,
  pub provider: Option<AccountId>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsgLeave<AccountId> {
  pub tx: Tx,
  pub node_address: AccountId,
  pub signer: AccountId,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsgReserve {
  pub tx: Tx,
  pub contributor: Address,
  pub amount: Balance,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsgSwitch<AccountId> {
  pub tx: Tx,
  pub destination: AccountId,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsgNoOp {
  pub tx: ObservedTx,
  pub action: Vec<u8>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsgManageThorName<AccountId> {
  pub name: Vec<u8>,
  pub chain: Chain,
  pub address: Address,
  pub coin: Coin,
  pub owner: Option<AccountId>,
  pub preferred_asset: Option<Asset>,
  pub signer: AccountId,
  pub tx: Tx,
}

/// Every intent the core acts on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Msg<AccountId> {
  AddLiquidity(MsgAddLiquidity),
  WithdrawLiquidity(MsgWithdrawLiquidity),
  Swap(MsgSwap),
  Donate(MsgDonate),
  Refund(MsgOutbound),
  Outbound(MsgOutbound),
  Migrate(MsgVaultTransfer),
  Bond(MsgBond<AccountId>),
  Unbond(MsgUnbond<AccountId>),
  Ragnarok(MsgOutbound),
  Leave(MsgLeave<AccountId>),
  YggdrasilFund(MsgVaultTransfer),
  YggdrasilReturn(MsgVaultTransfer),
  Reserve(MsgReserve),
  Switch(MsgSwitch<AccountId>),
  NoOp(MsgNoOp),
  Consolidate(MsgVaultTransfer),
  ManageThorName(MsgManageThorName<AccountId>),
}

fn ensure(cond: bool, err: MsgError) -> Result<(), MsgError> {
  if cond { Ok(()) } else { Err(err) }
}

fn validate_tx(tx: &Tx) -> Result<(), MsgError> {
  ensure(!tx.from_address.is_empty(), MsgError::EmptyAddress)?;
  ensure(
    !tx.coins.is_empty() && tx.coins.iter().all(|c| !c.asset.is_empty()),
    MsgError::EmptyCoins,
  )
}

pub fn is_valid_thor_name(name: &[u8]) -> bool {
  !name.is_empty()
    && name.len() <= 30
    && name
      .iter()
      .all(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_' || *b == b'+')
}

impl<AccountId> Msg<AccountId> {
  pub fn validate_basic(&self) -> Result<(), MsgError> {
    match self {
      Msg::AddLiquidity(m) => {
        ensure(!m.asset.is_empty() && !m.asset.is_rune(), MsgError::InvalidAsset)?;
        ensure(!m.asset.is_synth() && !m.asset.is_derived(), MsgError::InvalidAsset)?;
        ensure(
          !m.rune_address.is_empty() || !m.asset_address.is_empty(),
          MsgError::EmptyAddress,
        )?;
        ensure(m.rune_amount > 0 || m.asset_amount > 0, MsgError::EmptyCoins)
      },
      Msg::WithdrawLiquidity(m) => {
        ensure(!m.asset.is_empty() && !m.asset.is_rune(), MsgError::InvalidAsset)?;
        ensure(!m.withdraw_address.is_empty(), MsgError::EmptyAddress)?;
        ensure(
          m.basis_points > 0 && m.basis_points <= MAX_BASIS_POINTS,
          MsgError::InvalidBasisPoints,
        )?;
        if let Some(side) = &m.withdrawal_asset {
          ensure(
            side.is_native_rune() || *side == m.asset,
            MsgError::InvalidAsset,
          )?;
        }
        Ok(())
      },
      Msg::Swap(m) => {
        validate_tx(&m.tx)?;
        ensure(m.tx.coins.len() == 1, MsgError::InvalidMessage)?;
        ensure(!m.target_asset.is_empty(), MsgError::InvalidAsset)?;
        ensure(m.tx.coins[0].asset != m.target_asset, MsgError::InvalidAsset)?;
        ensure(!m.destination.is_empty(), MsgError::EmptyAddress)
      },
      Msg::Donate(m) => {
        ensure(!m.asset.is_empty() && !m.asset.is_rune(), MsgError::InvalidAsset)?;
        ensure(m.rune_amount > 0 || m.asset_amount > 0, MsgError::EmptyCoins)
      },
      Msg::Refund(m) | Msg::Outbound(m) | Msg::Ragnarok(m) => {
        ensure(!m.tx.observed_pub_key.is_empty(), MsgError::EmptyAddress)?;
        ensure(!m.tx.tx.to_address.is_empty(), MsgError::EmptyAddress)
      },
      Msg::Migrate(m)
      | Msg::YggdrasilFund(m)
      | Msg::YggdrasilReturn(m)
      | Msg::Consolidate(m) => ensure(!m.tx.observed_pub_key.is_empty(), MsgError::EmptyAddress),
      Msg::Bond(m) => {
        validate_tx(&m.tx)?;
        ensure(
          m.tx.coins.iter().all(|c| c.asset.is_native_rune()),
          MsgError::InvalidAsset,
        )
      },
      Msg::Unbond(m) => validate_tx(&m.tx),
      Msg::Leave(m) => validate_tx(&m.tx),
      Msg::Reserve(m) => {
        ensure(!m.contributor.is_empty(), MsgError::EmptyAddress)?;
        ensure(m.amount > 0, MsgError::EmptyCoins)
      },
      Msg::Switch(m) => {
        validate_tx(&m.tx)?;
        ensure(
          m.tx.coins.iter().all(|c| c.asset.is_switchable_rune()),
          MsgError::InvalidAsset,
        )
      },
      Msg::NoOp(m) => ensure(!m.tx.tx.from_address.is_empty(), MsgError::EmptyAddress),
      Msg::ManageThorName(m) => {
        ensure(is_valid_thor_name(&m.name), MsgError::InvalidThorName)?;
        ensure(!m.address.is_empty(), MsgError::EmptyAddress)?;
        ensure(m.coin.asset.is_native_rune(), MsgError::InvalidAsset)
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use alloc::vec;

  fn tx_with(coins: Vec<Coin>) -> Tx {
    Tx {
      from_address: b"bc1qsender".to_vec(),
      coins,
      ..Default::default()
    }
  }

  #[test]
  fn add_liquidity_needs_an_address_and_a_pool_asset() {
    let btc = Chain::Btc.gas_asset();
    let mut msg = MsgAddLiquidity {
      asset: btc.clone(),
      rune_amount: 0,
      asset_amount: 10,
      rune_address: Vec::new(),
      asset_address: b"bc1q".to_vec(),
      tx: tx_with(vec![Coin::new(btc.clone(), 10)]),
    };
    assert_eq!(Msg::<u64>::AddLiquidity(msg.clone()).validate_basic(), Ok(()));
    msg.asset_address.clear();
    assert_eq!(
      Msg::<u64>::AddLiquidity(msg.clone()).validate_basic(),
      Err(MsgError::EmptyAddress)
    );
    msg.asset = btc.synth();
    assert_eq!(
      Msg::<u64>::AddLiquidity(msg).validate_basic(),
      Err(MsgError::InvalidAsset)
    );
  }

  #[test]
  fn swap_rejects_same_asset_and_multiple_coins() {
    let btc = Chain::Btc.gas_asset();
    let swap = |coins: Vec<Coin>, target: Asset| {
      Msg::<u64>::Swap(MsgSwap {
        tx: tx_with(coins),
        target_asset: target,
        destination: b"thor1dest".to_vec(),
        trade_target: 0,
      })
      .validate_basic()
    };
    assert_eq!(swap(vec![Coin::new(btc.clone(), 1)], Asset::native_rune()), Ok(()));
    assert_eq!(
      swap(vec![Coin::new(btc.clone(), 1)], btc.clone()),
      Err(MsgError::InvalidAsset)
    );
    assert_eq!(
      swap(
        vec![Coin::new(btc.clone(), 1), Coin::new(btc.clone(), 2)],
        Asset::native_rune()
      ),
      Err(MsgError::InvalidMessage)
    );
  }

  #[test]
  fn thor_names() {
    assert!(is_valid_thor_name(b"alice-01"));
    assert!(!is_valid_thor_name(b""));
    assert!(!is_valid_thor_name(b"bad name"));
    assert!(!is_valid_thor_name(&[b'a'; 31]));
  }
}
