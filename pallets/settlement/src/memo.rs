//! Memo grammar
//!
//! `OP:PARAM:PARAM...` strings carried by inbound transactions. Parsing is pure;
//! resolving assets against pools and addresses against accounts happens in the
//! dispatcher.

use alloc::{format, vec::Vec};

use crate::types::{Address, Asset, Balance, Chain, TxId, parse_tx_id, tx_id_hex};
use primitives::params::MAX_BASIS_POINTS;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MemoError {
  Empty,
  UnknownOperation,
  MissingParameter,
  InvalidAsset,
  InvalidAmount,
  InvalidBasisPoints,
  InvalidTxId,
  InvalidChain,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MemoKind {
  AddLiquidity,
  WithdrawLiquidity,
  Swap,
  Donate,
  Refund,
  Outbound,
  Migrate,
  Bond,
  Unbond,
  Ragnarok,
  Leave,
  YggdrasilFund,
  YggdrasilReturn,
  Reserve,
  Switch,
  NoOp,
  Consolidate,
  ManageThorName,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Memo {
  AddLiquidity {
    asset: Asset,
    address: Address,
  },
  WithdrawLiquidity {
    asset: Asset,
    basis_points: u64,
    withdrawal_asset: Option<Asset>,
  },
  Swap {
    asset: Asset,
    destination: Address,
    limit: Balance,
  },
  Donate {
    asset: Asset,
  },
  Refund {
    tx_id: TxId,
  },
  Outbound {
    tx_id: TxId,
  },
  Migrate {
    height: u64,
  },
  Bond {
    node_address: Address,
    provider: Option<Address>,
    operator_fee: Option<u64>,
  },
  Unbond {
    node_address: Address,
    amount: Balance,
    provider: Option<Address>,
  },
  Ragnarok {
    height: u64,
  },
  Leave {
    node_address: Address,
  },
  YggdrasilFund {
    height: u64,
  },
  YggdrasilReturn {
    height: u64,
  },
  Reserve,
  Switch {
    destination: Address,
  },
  NoOp {
    action: Vec<u8>,
  },
  Consolidate,
  ManageThorName {
    name: Vec<u8>,
    chain: Chain,
    address: Address,
    owner: Option<Address>,
    preferred_asset: Option<Asset>,
  },
}

fn kind_of(op: &[u8]) -> Option<MemoKind> {
  let op = op.to_ascii_uppercase();
  let kind = match op.as_slice() {
    b"ADD" | b"+" | b"A" => MemoKind::AddLiquidity,
    b"WITHDRAW" | b"-" | b"WD" => MemoKind::WithdrawLiquidity,
    b"SWAP" | b"=" | b"S" => MemoKind::Swap,
    b"DONATE" | b"D" => MemoKind::Donate,
    b"REFUND" => MemoKind::Refund,
    b"OUT" => MemoKind::Outbound,
    b"MIGRATE" => MemoKind::Migrate,
    b"BOND" => MemoKind::Bond,
    b"UNBOND" => MemoKind::Unbond,
    b"RAGNAROK" => MemoKind::Ragnarok,
    b"LEAVE" => MemoKind::Leave,
    b"YGGDRASIL+" => MemoKind::YggdrasilFund,
    b"YGGDRASIL-" => MemoKind::YggdrasilReturn,
    b"RESERVE" => MemoKind::Reserve,
    b"SWITCH" => MemoKind::Switch,
    b"NOOP" => MemoKind::NoOp,
    b"CONSOLIDATE" => MemoKind::Consolidate,
    b"NAME" | b"N" | b"~" => MemoKind::ManageThorName,
    _ => return None,
  };
  Some(kind)
}

fn parse_u64(raw: &[u8]) -> Option<u64> {
  if raw.is_empty() || !raw.iter().all(u8::is_ascii_digit) {
    return None;
  }
  core::str::from_utf8(raw).ok()?.parse().ok()
}

fn parse_u128(raw: &[u8]) -> Option<u128> {
  if raw.is_empty() || !raw.iter().all(u8::is_ascii_digit) {
    return None;
  }
  core::str::from_utf8(raw).ok()?.parse().ok()
}

fn parse_asset(raw: &[u8]) -> Result<Asset, MemoError> {
  Asset::parse(raw).map_err(|_| MemoError::InvalidAsset)
}

fn optional(raw: Option<&&[u8]>) -> Option<Vec<u8>> {
  raw.filter(|part| !part.is_empty()).map(|part| part.to_vec())
}

impl Memo {
  pub fn kind(&self) -> MemoKind {
    match self {
      Memo::AddLiquidity { .. } => MemoKind::AddLiquidity,
      Memo::WithdrawLiquidity { .. } => MemoKind::WithdrawLiquidity,
      Memo::Swap { .. } => MemoKind::Swap,
      Memo::Donate { .. } => MemoKind::Donate,
      Memo::Refund { .. } => MemoKind::Refund,
      Memo::Outbound { .. } => MemoKind::Outbound,
      Memo::Migrate { .. } => MemoKind::Migrate,
      Memo::Bond { .. } => MemoKind::Bond,
      Memo::Unbond { .. } => MemoKind::Unbond,
      Memo::Ragnarok { .. } => MemoKind::Ragnarok,
      Memo::Leave { .. } => MemoKind::Leave,
      Memo::YggdrasilFund { .. } => MemoKind::YggdrasilFund,
      Memo::YggdrasilReturn { .. } => MemoKind::YggdrasilReturn,
      Memo::Reserve => MemoKind::Reserve,
      Memo::Switch { .. } => MemoKind::Switch,
      Memo::NoOp { .. } => MemoKind::NoOp,
      Memo::Consolidate => MemoKind::Consolidate,
      Memo::ManageThorName { .. } => MemoKind::ManageThorName,
    }
  }

  /// Memos written by the core itself on outbounds it schedules.
  pub fn is_outbound(&self) -> bool {
    matches!(
      self.kind(),
      MemoKind::Outbound
        | MemoKind::Refund
        | MemoKind::Migrate
        | MemoKind::Ragnarok
        | MemoKind::YggdrasilFund
        | MemoKind::YggdrasilReturn
        | MemoKind::Consolidate
    )
  }

  /// Memos carrying the in-hash of the inbound an outbound answers.
  pub fn in_hash(&self) -> Option<TxId> {
    match self {
      Memo::Outbound { tx_id } | Memo::Refund { tx_id } => Some(*tx_id),
      _ => None,
    }
  }

  /// The pool asset an intent names, where asset fuzzy matching applies.
  pub fn asset(&self) -> Option<&Asset> {
    match self {
      Memo::AddLiquidity { asset, .. }
      | Memo::WithdrawLiquidity { asset, .. }
      | Memo::Swap { asset, .. }
      | Memo::Donate { asset } => Some(asset),
      _ => None,
    }
  }

  pub fn set_asset(&mut self, new_asset: Asset) {
    match self {
      Memo::AddLiquidity { asset, .. }
      | Memo::WithdrawLiquidity { asset, .. }
      | Memo::Swap { asset, .. }
      | Memo::Donate { asset } => *asset = new_asset,
      _ => {},
    }
  }

  pub fn parse(raw: &[u8]) -> Result<Self, MemoError> {
    let raw = raw.trim_ascii();
    if raw.is_empty() {
      return Err(MemoError::Empty);
    }
    let parts: Vec<&[u8]> = raw.split(|b| *b == b':').collect();
    let kind = kind_of(parts[0]).ok_or(MemoError::UnknownOperation)?;
    let param = |i: usize| -> Result<&[u8], MemoError> {
      parts
        .get(i)
        .copied()
        .filter(|p| !p.is_empty())
        .ok_or(MemoError::MissingParameter)
    };
    let height = |i: usize| -> Result<u64, MemoError> {
      parse_u64(param(i)?).ok_or(MemoError::InvalidAmount)
    };
    let tx_id = |i: usize| -> Result<TxId, MemoError> {
      parse_tx_id(param(i)?).ok_or(MemoError::InvalidTxId)
    };

    let memo = match kind {
      MemoKind::AddLiquidity => Memo::AddLiquidity {
        asset: parse_asset(param(1)?)?,
        address: optional(parts.get(2)).unwrap_or_default(),
      },
      MemoKind::WithdrawLiquidity => {
        let basis_points = match optional(parts.get(2)) {
          Some(bps) => parse_u64(&bps).ok_or(MemoError::InvalidBasisPoints)?,
          None => MAX_BASIS_POINTS,
        };
        if basis_points == 0 || basis_points > MAX_BASIS_POINTS {
          return Err(MemoError::InvalidBasisPoints);
        }
        let withdrawal_asset = match optional(parts.get(3)) {
          Some(raw) => Some(parse_asset(&raw)?),
          None => None,
        };
        Memo::WithdrawLiquidity {
          asset: parse_asset(param(1)?)?,
          basis_points,
          withdrawal_asset,
        }
      },
      MemoKind::Swap => {
        let limit = match optional(parts.get(3)) {
          Some(raw) => {
            // streaming parameters after a slash are not supported; keep the limit
            let limit = raw.split(|b| *b == b'/').next().unwrap_or_default();
            parse_u128(limit).ok_or(MemoError::InvalidAmount)?
          },
          None => 0,
        };
        Memo::Swap {
          asset: parse_asset(param(1)?)?,
          destination: optional(parts.get(2)).unwrap_or_default(),
          limit,
        }
      },
      MemoKind::Donate => Memo::Donate {
        asset: parse_asset(param(1)?)?,
      },
      MemoKind::Refund => Memo::Refund { tx_id: tx_id(1)? },
      MemoKind::Outbound => Memo::Outbound { tx_id: tx_id(1)? },
      MemoKind::Migrate => Memo::Migrate { height: height(1)? },
      MemoKind::Ragnarok => Memo::Ragnarok { height: height(1)? },
      MemoKind::YggdrasilFund => Memo::YggdrasilFund { height: height(1)? },
      MemoKind::YggdrasilReturn => Memo::YggdrasilReturn { height: height(1)? },
      MemoKind::Bond => {
        let operator_fee = match optional(parts.get(3)) {
          Some(raw) => {
            let fee = parse_u64(&raw).ok_or(MemoError::InvalidBasisPoints)?;
            if fee > MAX_BASIS_POINTS {
              return Err(MemoError::InvalidBasisPoints);
            }
            Some(fee)
          },
          None => None,
        };
        Memo::Bond {
          node_address: param(1)?.to_vec(),
          provider: optional(parts.get(2)),
          operator_fee,
        }
      },
      MemoKind::Unbond => Memo::Unbond {
        node_address: param(1)?.to_vec(),
        amount: match optional(parts.get(2)) {
          Some(raw) => parse_u128(&raw).ok_or(MemoError::InvalidAmount)?,
          None => 0,
        },
        provider: optional(parts.get(3)),
      },
      MemoKind::Leave => Memo::Leave {
        node_address: param(1)?.to_vec(),
      },
      MemoKind::Reserve => Memo::Reserve,
      MemoKind::Switch => Memo::Switch {
        destination: param(1)?.to_vec(),
      },
      MemoKind::NoOp => Memo::NoOp {
        action: optional(parts.get(1)).unwrap_or_default(),
      },
      MemoKind::Consolidate => Memo::Consolidate,
      MemoKind::ManageThorName => {
        let preferred_asset = match optional(parts.get(5)) {
          Some(raw) => Some(parse_asset(&raw)?),
          None => None,
        };
        Memo::ManageThorName {
          name: param(1)?.to_ascii_lowercase(),
          chain: Chain::from_ticker(param(2)?).ok_or(MemoError::InvalidChain)?,
          address: param(3)?.to_vec(),
          owner: optional(parts.get(4)),
          preferred_asset,
        }
      },
    };
    Ok(memo)
  }
}

pub fn outbound_memo(in_hash: &TxId) -> Vec<u8> {
  let mut memo = b"OUT:".to_vec();
  memo.extend(tx_id_hex(in_hash));
  memo
}

pub fn refund_memo(in_hash: &TxId) -> Vec<u8> {
  let mut memo = b"REFUND:".to_vec();
  memo.extend(tx_id_hex(in_hash));
  memo
}

pub fn migrate_memo(height: u64) -> Vec<u8> {
  format!("MIGRATE:{}", height).into_bytes()
}

pub fn ragnarok_memo(height: u64) -> Vec<u8> {
  format!("RAGNAROK:{}", height).into_bytes()
}

pub fn yggdrasil_return_memo(height: u64) -> Vec<u8> {
  format!("YGGDRASIL-:{}", height).into_bytes()
}

#[cfg(test)]
mod tests {
  use super::*;
  use polkadot_sdk::sp_core::H256;

  #[test]
  fn parses_liquidity_memos() {
    assert_eq!(
      Memo::parse(b"+:BTC.BTC:thor1abc").unwrap(),
      Memo::AddLiquidity {
        asset: Chain::Btc.gas_asset(),
        address: b"thor1abc".to_vec(),
      }
    );
    assert_eq!(
      Memo::parse(b"WITHDRAW:ETH.ETH").unwrap(),
      Memo::WithdrawLiquidity {
        asset: Chain::Eth.gas_asset(),
        basis_points: 10_000,
        withdrawal_asset: None,
      }
    );
    assert_eq!(
      Memo::parse(b"-:ETH.ETH:2500:THOR.RUNE").unwrap(),
      Memo::WithdrawLiquidity {
        asset: Chain::Eth.gas_asset(),
        basis_points: 2_500,
        withdrawal_asset: Some(Asset::native_rune()),
      }
    );
    assert_eq!(Memo::parse(b"-:ETH.ETH:0"), Err(MemoError::InvalidBasisPoints));
    assert_eq!(Memo::parse(b"-:ETH.ETH:10001"), Err(MemoError::InvalidBasisPoints));
  }

  #[test]
  fn parses_swap_memos() {
    let memo = Memo::parse(b"=:btc/btc:thor1dest:12345").unwrap();
    assert_eq!(
      memo,
      Memo::Swap {
        asset: Chain::Btc.gas_asset().synth(),
        destination: b"thor1dest".to_vec(),
        limit: 12_345,
      }
    );
    assert_eq!(memo.kind(), MemoKind::Swap);
    assert!(matches!(
      Memo::parse(b"SWAP:BNB.BNB"),
      Ok(Memo::Swap { limit: 0, .. })
    ));
    assert_eq!(Memo::parse(b"SWAP:BNB.BNB::abc"), Err(MemoError::InvalidAmount));
  }

  #[test]
  fn outbound_memos_round_trip_their_hash() {
    let id = H256::repeat_byte(0x1f);
    let memo = Memo::parse(&outbound_memo(&id)).unwrap();
    assert_eq!(memo.in_hash(), Some(id));
    assert!(memo.is_outbound());
    assert_eq!(Memo::parse(&refund_memo(&id)).unwrap(), Memo::Refund { tx_id: id });
    assert_eq!(
      Memo::parse(&yggdrasil_return_memo(7)).unwrap(),
      Memo::YggdrasilReturn { height: 7 }
    );
    assert_eq!(Memo::parse(b"OUT:1234"), Err(MemoError::InvalidTxId));
  }

  #[test]
  fn parses_node_memos() {
    assert_eq!(
      Memo::parse(b"BOND:tthor1node:tthor1provider:2000").unwrap(),
      Memo::Bond {
        node_address: b"tthor1node".to_vec(),
        provider: Some(b"tthor1provider".to_vec()),
        operator_fee: Some(2_000),
      }
    );
    assert_eq!(
      Memo::parse(b"UNBOND:tthor1node:500").unwrap(),
      Memo::Unbond {
        node_address: b"tthor1node".to_vec(),
        amount: 500,
        provider: None,
      }
    );
    assert_eq!(Memo::parse(b"LEAVE"), Err(MemoError::MissingParameter));
  }

  #[test]
  fn parses_names_and_misc() {
    assert_eq!(
      Memo::parse(b"~:Alice:BTC:bc1qxyz").unwrap(),
      Memo::ManageThorName {
        name: b"alice".to_vec(),
        chain: Chain::Btc,
        address: b"bc1qxyz".to_vec(),
        owner: None,
        preferred_asset: None,
      }
    );
    assert_eq!(Memo::parse(b"reserve").unwrap(), Memo::Reserve);
    assert_eq!(Memo::parse(b"NOOP:NOVAULT").unwrap(), Memo::NoOp { action: b"NOVAULT".to_vec() });
    assert_eq!(Memo::parse(b""), Err(MemoError::Empty));
    assert_eq!(Memo::parse(b"HELLO:WORLD"), Err(MemoError::UnknownOperation));
    assert_eq!(Memo::parse(b"+:FOO.BAR"), Err(MemoError::InvalidAsset));
  }
}
