use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use alloc::{string::String, vec::Vec};
use core::fmt;

use crate::ecosystem::Balance;

/// External chains the settlement core can hold funds on.
///
/// `Thor` is the chain the core itself runs on: its assets (native rune, synths and
/// derived assets) move by module transfers instead of signed outbounds.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub enum Chain {
  #[default]
  Thor,
  Btc,
  Eth,
  Bnb,
  Bsc,
  Bch,
  Ltc,
  Doge,
  Gaia,
  Avax,
}

impl Chain {
  pub const ALL: [Chain; 10] = [
    Chain::Thor,
    Chain::Btc,
    Chain::Eth,
    Chain::Bnb,
    Chain::Bsc,
    Chain::Bch,
    Chain::Ltc,
    Chain::Doge,
    Chain::Gaia,
    Chain::Avax,
  ];

  pub fn ticker(&self) -> &'static str {
    match self {
      Chain::Thor => "THOR",
      Chain::Btc => "BTC",
      Chain::Eth => "ETH",
      Chain::Bnb => "BNB",
      Chain::Bsc => "BSC",
      Chain::Bch => "BCH",
      Chain::Ltc => "LTC",
      Chain::Doge => "DOGE",
      Chain::Gaia => "GAIA",
      Chain::Avax => "AVAX",
    }
  }

  /// Case-insensitive lookup by chain ticker.
  pub fn from_ticker(raw: &[u8]) -> Option<Self> {
    Self::ALL
      .into_iter()
      .find(|chain| chain.ticker().as_bytes().eq_ignore_ascii_case(raw))
  }

  pub fn is_native(&self) -> bool {
    matches!(self, Chain::Thor)
  }

  pub fn is_evm(&self) -> bool {
    matches!(self, Chain::Eth | Chain::Bsc | Chain::Avax)
  }

  /// Binance Chain pays a flat fee per transaction, so max gas is not padded.
  pub fn is_binance_family(&self) -> bool {
    matches!(self, Chain::Bnb)
  }

  /// The asset a chain pays its transaction fees in.
  pub fn gas_asset(&self) -> Asset {
    let symbol = match self {
      Chain::Thor => "RUNE",
      Chain::Btc => "BTC",
      Chain::Eth => "ETH",
      Chain::Bnb | Chain::Bsc => "BNB",
      Chain::Bch => "BCH",
      Chain::Ltc => "LTC",
      Chain::Doge => "DOGE",
      Chain::Gaia => "ATOM",
      Chain::Avax => "AVAX",
    };
    Asset::new(*self, symbol)
  }

  /// Precision of the gas asset on the chain itself. Amounts are always tracked in
  /// 1e8 units and rounded down to this precision before leaving the chain.
  pub fn gas_asset_decimals(&self) -> u8 {
    match self {
      Chain::Gaia => 6,
      _ => 8,
    }
  }

  fn bech32_prefixes(&self) -> &'static [&'static str] {
    match self {
      Chain::Thor => &["thor1", "tthor1", "sthor1"],
      Chain::Btc => &["bc1", "tb1", "bcrt1"],
      Chain::Ltc => &["ltc1", "tltc1", "rltc1"],
      Chain::Bch => &["bitcoincash:", "bchtest:", "bchreg:"],
      Chain::Bnb => &["bnb1", "tbnb1"],
      Chain::Gaia => &["cosmos1"],
      _ => &[],
    }
  }

  /// Normalizes an address so that equal destinations compare equal.
  ///
  /// Hex (EVM) and bech32 addresses are case-insensitive and are lowercased; base58
  /// addresses are case-sensitive and only trimmed.
  pub fn canonical_address(&self, address: &[u8]) -> Vec<u8> {
    let trimmed = address.trim_ascii();
    let case_insensitive = self.is_evm()
      || self.bech32_prefixes().iter().any(|prefix| {
        trimmed.len() > prefix.len() && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
      });
    if case_insensitive {
      trimmed.to_ascii_lowercase()
    } else {
      trimmed.to_vec()
    }
  }
}

impl fmt::Display for Chain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.ticker())
  }
}

/// Where an asset lives and what it represents.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub enum AssetClass {
  /// Held on its own chain by the vaults.
  #[default]
  Layer1,
  /// Minted claim on a layer-1 pool, lives only on this chain.
  Synth,
  /// Internal accounting asset with no external counterpart.
  Derived,
}

impl AssetClass {
  fn separator(&self) -> char {
    match self {
      AssetClass::Layer1 => '.',
      AssetClass::Synth => '/',
      AssetClass::Derived => '~',
    }
  }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssetParseError {
  Empty,
  MissingSeparator,
  UnknownChain,
  InvalidSymbol,
}

/// A chain asset, synth or derived asset.
///
/// Field order gives the key order used by every sorted iteration in the core:
/// chain first, then symbol.
#[derive(
  Clone,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub struct Asset {
  pub chain: Chain,
  pub symbol: Vec<u8>,
  pub ticker: Vec<u8>,
  pub class: AssetClass,
}

impl Asset {
  /// Builds a layer-1 asset; the ticker is the symbol up to the first `-`.
  pub fn new(chain: Chain, symbol: &str) -> Self {
    let symbol = symbol.as_bytes().to_ascii_uppercase();
    let ticker = symbol.split(|b| *b == b'-').next().unwrap_or_default().to_vec();
    Self {
      chain,
      symbol,
      ticker,
      class: AssetClass::Layer1,
    }
  }

  pub fn native_rune() -> Self {
    Chain::Thor.gas_asset()
  }

  pub fn is_empty(&self) -> bool {
    self.symbol.is_empty()
  }

  pub fn is_native_rune(&self) -> bool {
    self.chain == Chain::Thor && self.class == AssetClass::Layer1 && self.symbol == b"RUNE"
  }

  /// Native rune or one of its foreign token representations.
  pub fn is_rune(&self) -> bool {
    self.class == AssetClass::Layer1 && self.ticker == b"RUNE"
  }

  /// Foreign rune tokens that can be switched into native rune.
  pub fn is_switchable_rune(&self) -> bool {
    self.is_rune() && matches!(self.chain, Chain::Bnb | Chain::Eth)
  }

  pub fn is_synth(&self) -> bool {
    self.class == AssetClass::Synth
  }

  pub fn is_derived(&self) -> bool {
    self.class == AssetClass::Derived
  }

  pub fn is_layer1(&self) -> bool {
    self.class == AssetClass::Layer1
  }

  /// Lives on this chain and moves by module transfers.
  pub fn is_native(&self) -> bool {
    self.chain.is_native() || !self.is_layer1()
  }

  pub fn is_gas_asset(&self) -> bool {
    self.is_layer1() && *self == self.chain.gas_asset()
  }

  /// The chain an asset of this kind is paid out on.
  pub fn outbound_chain(&self) -> Chain {
    if self.is_native() {
      Chain::Thor
    } else {
      self.chain
    }
  }

  pub fn layer1(&self) -> Self {
    self.with_class(AssetClass::Layer1)
  }

  pub fn synth(&self) -> Self {
    self.with_class(AssetClass::Synth)
  }

  pub fn derived(&self) -> Self {
    self.with_class(AssetClass::Derived)
  }

  pub fn with_class(&self, class: AssetClass) -> Self {
    Self {
      class,
      ..self.clone()
    }
  }

  /// Parses `CHAIN.SYMBOL`, `CHAIN/SYMBOL` or `CHAIN~SYMBOL`; `RUNE` and `R` are
  /// shorthands for native rune.
  pub fn parse(raw: &[u8]) -> Result<Self, AssetParseError> {
    let raw = raw.trim_ascii();
    if raw.is_empty() {
      return Err(AssetParseError::Empty);
    }
    if raw.eq_ignore_ascii_case(b"RUNE") || raw.eq_ignore_ascii_case(b"R") {
      return Ok(Self::native_rune());
    }
    let (index, class) = raw
      .iter()
      .enumerate()
      .find_map(|(i, b)| match b {
        b'.' => Some((i, AssetClass::Layer1)),
        b'/' => Some((i, AssetClass::Synth)),
        b'~' => Some((i, AssetClass::Derived)),
        _ => None,
      })
      .ok_or(AssetParseError::MissingSeparator)?;
    let chain = Chain::from_ticker(&raw[..index]).ok_or(AssetParseError::UnknownChain)?;
    let symbol = &raw[index + 1..];
    if symbol.is_empty()
      || !symbol
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_')
    {
      return Err(AssetParseError::InvalidSymbol);
    }
    let symbol = core::str::from_utf8(symbol).map_err(|_| AssetParseError::InvalidSymbol)?;
    Ok(Self::new(chain, symbol).with_class(class))
  }

  /// Canonical string form, used in memos and configuration keys.
  pub fn key(&self) -> String {
    alloc::format!("{}", self)
  }
}

impl fmt::Display for Asset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}{}{}",
      self.chain,
      self.class.separator(),
      String::from_utf8_lossy(&self.symbol)
    )
  }
}

#[derive(
  Clone,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  PartialEq,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub struct Coin {
  pub asset: Asset,
  pub amount: Balance,
}

impl Coin {
  pub fn new(asset: Asset, amount: Balance) -> Self {
    Self { asset, amount }
  }

  pub fn is_empty(&self) -> bool {
    self.asset.is_empty() || self.amount == 0
  }
}

/// Amount of `asset` in a coin list, zero when absent.
pub fn coin_amount(coins: &[Coin], asset: &Asset) -> Balance {
  coins
    .iter()
    .filter(|coin| coin.asset == *asset)
    .fold(0, |acc: Balance, coin| acc.saturating_add(coin.amount))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_every_asset_class() {
    let l1 = Asset::parse(b"bnb.usdt-bd1").unwrap();
    assert_eq!(l1.chain, Chain::Bnb);
    assert_eq!(l1.symbol, b"USDT-BD1".to_vec());
    assert_eq!(l1.ticker, b"USDT".to_vec());
    assert!(l1.is_layer1());

    let synth = Asset::parse(b"BTC/BTC").unwrap();
    assert!(synth.is_synth());
    assert!(synth.is_native());
    assert_eq!(synth.layer1(), Chain::Btc.gas_asset());

    let derived = Asset::parse(b"ETH~ETH").unwrap();
    assert!(derived.is_derived());
    assert_eq!(derived.outbound_chain(), Chain::Thor);
  }

  #[test]
  fn display_round_trips_through_parse() {
    for raw in ["BNB.USDT-BD1", "BTC/BTC", "ETH~ETH", "THOR.RUNE"] {
      let asset = Asset::parse(raw.as_bytes()).unwrap();
      assert_eq!(asset.key(), raw);
    }
  }

  #[test]
  fn rune_shorthands_and_flavours() {
    assert!(Asset::parse(b"rune").unwrap().is_native_rune());
    assert!(Asset::parse(b"R").unwrap().is_native_rune());
    let bep2 = Asset::parse(b"BNB.RUNE-B1A").unwrap();
    assert!(bep2.is_rune());
    assert!(!bep2.is_native_rune());
    assert!(bep2.is_switchable_rune());
    assert!(!Asset::native_rune().is_switchable_rune());
  }

  #[test]
  fn rejects_malformed_assets() {
    assert_eq!(Asset::parse(b""), Err(AssetParseError::Empty));
    assert_eq!(Asset::parse(b"BTCBTC"), Err(AssetParseError::MissingSeparator));
    assert_eq!(Asset::parse(b"XYZ.BTC"), Err(AssetParseError::UnknownChain));
    assert_eq!(Asset::parse(b"BTC."), Err(AssetParseError::InvalidSymbol));
    assert_eq!(Asset::parse(b"BTC.B:C"), Err(AssetParseError::InvalidSymbol));
  }

  #[test]
  fn gas_assets_per_chain() {
    assert!(Asset::parse(b"BTC.BTC").unwrap().is_gas_asset());
    assert!(Asset::parse(b"BSC.BNB").unwrap().is_gas_asset());
    assert!(!Asset::parse(b"BNB.USDT-BD1").unwrap().is_gas_asset());
    assert!(!Asset::parse(b"BTC/BTC").unwrap().is_gas_asset());
    assert_eq!(Chain::Gaia.gas_asset_decimals(), 6);
  }

  #[test]
  fn canonical_addresses() {
    assert_eq!(
      Chain::Eth.canonical_address(b" 0xAbCd "),
      b"0xabcd".to_vec()
    );
    assert_eq!(
      Chain::Btc.canonical_address(b"BC1QXYZ"),
      b"bc1qxyz".to_vec()
    );
    assert_eq!(
      Chain::Btc.canonical_address(b"1BoatSLRHtKNngkdXEeobR76b53LETtpyT"),
      b"1BoatSLRHtKNngkdXEeobR76b53LETtpyT".to_vec()
    );
  }

  #[test]
  fn coin_amounts_sum_by_asset() {
    let btc = Chain::Btc.gas_asset();
    let coins = [
      Coin::new(btc.clone(), 5),
      Coin::new(Asset::native_rune(), 7),
      Coin::new(btc.clone(), 3),
    ];
    assert_eq!(coin_amount(&coins, &btc), 8);
    assert_eq!(coin_amount(&coins, &Chain::Eth.gas_asset()), 0);
    assert!(Coin::new(btc, 0).is_empty());
  }
}
