//! Runtime configuration
//!
//! Every protocol constant can be overridden on chain through Mimir. A missing or
//! negative Mimir value means "use the default" from `primitives::params`.

use alloc::{format, vec::Vec};

use primitives::params;

use crate::{
  pallet::{Config, Mimir, Pallet},
  types::{Asset, Balance, Chain},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigKey {
  ChurnInterval,
  ChurnRetryInterval,
  DesiredValidatorSet,
  AsgardSize,
  MinimumNodesForBft,
  NumberOfNewNodesPerChurn,
  BadValidatorRedline,
  MinSlashPointsForBadValidator,
  MaxNodeToChurnOutForLowVersion,
  ArtificialRagnarokBlockHeight,
  MinimumBondInRune,
  BondLockupPeriod,
  NodeOperatorFee,
  SlashPenalty,
  PoolCycle,
  MaxAvailablePools,
  MinRunePoolDepth,
  StagedPoolCost,
  MinimumPoolLiquidityFee,
  LiquidityLockUpBlocks,
  FullImpLossProtectionBlocks,
  IlpCutoff,
  IlpMinimumBlocks,
  MaxSynthPerPoolDepth,
  MintSynths,
  MinTxOutVolumeThreshold,
  TxOutDelayRate,
  TxOutDelayMax,
  MaxTxOutOffset,
  SigningTransactionPeriod,
  OutboundTransactionFee,
  MinimumL1OutboundFeeUsd,
  TargetOutboundFeeSurplusRune,
  MaxOutboundFeeMultiplierBasisPoints,
  MinOutboundFeeMultiplierBasisPoints,
  EmissionCurve,
  BlocksPerYear,
  TnsRegisterFee,
  TnsFeePerBlock,
  HaltTrading,
  PauseLp,
}

impl ConfigKey {
  pub fn name(&self) -> &'static str {
    match self {
      ConfigKey::ChurnInterval => "ChurnInterval",
      ConfigKey::ChurnRetryInterval => "ChurnRetryInterval",
      ConfigKey::DesiredValidatorSet => "DesiredValidatorSet",
      ConfigKey::AsgardSize => "AsgardSize",
      ConfigKey::MinimumNodesForBft => "MinimumNodesForBFT",
      ConfigKey::NumberOfNewNodesPerChurn => "NumberOfNewNodesPerChurn",
      ConfigKey::BadValidatorRedline => "BadValidatorRedline",
      ConfigKey::MinSlashPointsForBadValidator => "MinSlashPointsForBadValidator",
      ConfigKey::MaxNodeToChurnOutForLowVersion => "MaxNodeToChurnOutForLowVersion",
      ConfigKey::ArtificialRagnarokBlockHeight => "ArtificialRagnarokBlockHeight",
      ConfigKey::MinimumBondInRune => "MinimumBondInRune",
      ConfigKey::BondLockupPeriod => "BondLockupPeriod",
      ConfigKey::NodeOperatorFee => "NodeOperatorFee",
      ConfigKey::SlashPenalty => "SlashPenalty",
      ConfigKey::PoolCycle => "PoolCycle",
      ConfigKey::MaxAvailablePools => "MaxAvailablePools",
      ConfigKey::MinRunePoolDepth => "MinRunePoolDepth",
      ConfigKey::StagedPoolCost => "StagedPoolCost",
      ConfigKey::MinimumPoolLiquidityFee => "MinimumPoolLiquidityFee",
      ConfigKey::LiquidityLockUpBlocks => "LiquidityLockUpBlocks",
      ConfigKey::FullImpLossProtectionBlocks => "FullImpLossProtectionBlocks",
      ConfigKey::IlpCutoff => "ILPCutoff",
      ConfigKey::IlpMinimumBlocks => "ILPMinimumBlocks",
      ConfigKey::MaxSynthPerPoolDepth => "MaxSynthPerPoolDepth",
      ConfigKey::MintSynths => "MintSynths",
      ConfigKey::MinTxOutVolumeThreshold => "MinTxOutVolumeThreshold",
      ConfigKey::TxOutDelayRate => "TxOutDelayRate",
      ConfigKey::TxOutDelayMax => "TxOutDelayMax",
      ConfigKey::MaxTxOutOffset => "MaxTxOutOffset",
      ConfigKey::SigningTransactionPeriod => "SigningTransactionPeriod",
      ConfigKey::OutboundTransactionFee => "OutboundTransactionFee",
      ConfigKey::MinimumL1OutboundFeeUsd => "MinimumL1OutboundFeeUSD",
      ConfigKey::TargetOutboundFeeSurplusRune => "TargetOutboundFeeSurplusRune",
      ConfigKey::MaxOutboundFeeMultiplierBasisPoints => "MaxOutboundFeeMultiplierBasisPoints",
      ConfigKey::MinOutboundFeeMultiplierBasisPoints => "MinOutboundFeeMultiplierBasisPoints",
      ConfigKey::EmissionCurve => "EmissionCurve",
      ConfigKey::BlocksPerYear => "BlocksPerYear",
      ConfigKey::TnsRegisterFee => "TNSRegisterFee",
      ConfigKey::TnsFeePerBlock => "TNSFeePerBlock",
      ConfigKey::HaltTrading => "HaltTrading",
      ConfigKey::PauseLp => "PauseLP",
    }
  }

  pub fn default_value(&self) -> i64 {
    match self {
      ConfigKey::ChurnInterval => params::CHURN_INTERVAL,
      ConfigKey::ChurnRetryInterval => params::CHURN_RETRY_INTERVAL,
      ConfigKey::DesiredValidatorSet => params::DESIRED_VALIDATOR_SET,
      ConfigKey::AsgardSize => params::ASGARD_SIZE,
      ConfigKey::MinimumNodesForBft => params::MINIMUM_NODES_FOR_BFT,
      ConfigKey::NumberOfNewNodesPerChurn => params::NUMBER_OF_NEW_NODES_PER_CHURN,
      ConfigKey::BadValidatorRedline => params::BAD_VALIDATOR_REDLINE,
      ConfigKey::MinSlashPointsForBadValidator => params::MIN_SLASH_POINTS_FOR_BAD_VALIDATOR,
      ConfigKey::MaxNodeToChurnOutForLowVersion => params::MAX_NODE_TO_CHURN_OUT_FOR_LOW_VERSION,
      ConfigKey::ArtificialRagnarokBlockHeight => params::ARTIFICIAL_RAGNAROK_BLOCK_HEIGHT,
      ConfigKey::MinimumBondInRune => params::MINIMUM_BOND_IN_RUNE,
      ConfigKey::BondLockupPeriod => params::BOND_LOCKUP_PERIOD,
      ConfigKey::NodeOperatorFee => params::NODE_OPERATOR_FEE,
      ConfigKey::SlashPenalty => params::SLASH_PENALTY,
      ConfigKey::PoolCycle => params::POOL_CYCLE,
      ConfigKey::MaxAvailablePools => params::MAX_AVAILABLE_POOLS,
      ConfigKey::MinRunePoolDepth => params::MIN_RUNE_POOL_DEPTH,
      ConfigKey::StagedPoolCost => params::STAGED_POOL_COST,
      ConfigKey::MinimumPoolLiquidityFee => params::MINIMUM_POOL_LIQUIDITY_FEE,
      ConfigKey::LiquidityLockUpBlocks => params::LIQUIDITY_LOCK_UP_BLOCKS,
      ConfigKey::FullImpLossProtectionBlocks => params::FULL_IMP_LOSS_PROTECTION_BLOCKS,
      ConfigKey::IlpCutoff => params::ILP_CUTOFF,
      ConfigKey::IlpMinimumBlocks => params::ILP_MINIMUM_BLOCKS,
      ConfigKey::MaxSynthPerPoolDepth => params::MAX_SYNTH_PER_POOL_DEPTH,
      ConfigKey::MintSynths => params::MINT_SYNTHS,
      ConfigKey::MinTxOutVolumeThreshold => params::MIN_TX_OUT_VOLUME_THRESHOLD,
      ConfigKey::TxOutDelayRate => params::TX_OUT_DELAY_RATE,
      ConfigKey::TxOutDelayMax => params::TX_OUT_DELAY_MAX,
      ConfigKey::MaxTxOutOffset => params::MAX_TX_OUT_OFFSET,
      ConfigKey::SigningTransactionPeriod => params::SIGNING_TRANSACTION_PERIOD,
      ConfigKey::OutboundTransactionFee => params::OUTBOUND_TRANSACTION_FEE,
      ConfigKey::MinimumL1OutboundFeeUsd => params::MINIMUM_L1_OUTBOUND_FEE_USD,
      ConfigKey::TargetOutboundFeeSurplusRune => params::TARGET_OUTBOUND_FEE_SURPLUS_RUNE,
      ConfigKey::MaxOutboundFeeMultiplierBasisPoints => {
        params::MAX_OUTBOUND_FEE_MULTIPLIER_BASIS_POINTS
      },
      ConfigKey::MinOutboundFeeMultiplierBasisPoints => {
        params::MIN_OUTBOUND_FEE_MULTIPLIER_BASIS_POINTS
      },
      ConfigKey::EmissionCurve => params::EMISSION_CURVE,
      ConfigKey::BlocksPerYear => params::BLOCKS_PER_YEAR,
      ConfigKey::TnsRegisterFee => params::TNS_REGISTER_FEE,
      ConfigKey::TnsFeePerBlock => params::TNS_FEE_PER_BLOCK,
      ConfigKey::HaltTrading | ConfigKey::PauseLp => 0,
    }
  }

  pub fn key(&self) -> Vec<u8> {
    self.name().as_bytes().to_vec()
  }
}

/// `Halt<chain>Trading`
pub fn halt_chain_trading_key(chain: Chain) -> Vec<u8> {
  format!("Halt{}Trading", chain).into_bytes()
}

/// `SolvencyHalt<chain>Chain`
pub fn solvency_halt_key(chain: Chain) -> Vec<u8> {
  format!("SolvencyHalt{}Chain", chain).into_bytes()
}

/// `PauseLP<chain>`
pub fn pause_lp_chain_key(chain: Chain) -> Vec<u8> {
  format!("PauseLP{}", chain).into_bytes()
}

/// `PauseAsymWithdrawal-<chain>`
pub fn pause_asym_withdrawal_key(chain: Chain) -> Vec<u8> {
  format!("PauseAsymWithdrawal-{}", chain).into_bytes()
}

/// `ILP-DISABLED-<asset>`
pub fn ilp_disabled_key(asset: &Asset) -> Vec<u8> {
  format!("ILP-DISABLED-{}", asset).into_bytes()
}

/// `RAGNAROK-<chain>-<ticker>`
pub fn pool_ragnarok_key(asset: &Asset) -> Vec<u8> {
  format!(
    "RAGNAROK-{}-{}",
    asset.chain,
    alloc::string::String::from_utf8_lossy(&asset.ticker)
  )
  .into_bytes()
}

/// `TorAnchor-<asset>`, with the asset's separator replaced by a dash.
pub fn tor_anchor_key(asset: &Asset) -> Vec<u8> {
  format!(
    "TorAnchor-{}-{}",
    asset.chain,
    alloc::string::String::from_utf8_lossy(&asset.symbol)
  )
  .into_bytes()
}

impl<T: Config> Pallet<T> {
  /// Raw Mimir value; `None` when unset or negative.
  pub fn get_mimir(key: &[u8]) -> Option<i64> {
    Mimir::<T>::get(key).filter(|value| *value >= 0)
  }

  pub fn get_config_int64(key: ConfigKey) -> i64 {
    Self::get_mimir(&key.key()).unwrap_or_else(|| key.default_value())
  }

  pub fn config_u64(key: ConfigKey) -> u64 {
    Self::get_config_int64(key).max(0) as u64
  }

  pub fn config_balance(key: ConfigKey) -> Balance {
    Self::get_config_int64(key).max(0) as Balance
  }

  /// Mimir flags are "on" from the height they carry; `1` switches them on
  /// immediately.
  fn flag_active(key: &[u8]) -> bool {
    match Self::get_mimir(key) {
      Some(value) if value > 0 => (value as u64) <= Self::block_height().max(1),
      _ => false,
    }
  }

  pub fn is_trading_halted(chain: Chain) -> bool {
    Self::flag_active(&ConfigKey::HaltTrading.key())
      || Self::flag_active(&halt_chain_trading_key(chain))
      || Self::flag_active(&solvency_halt_key(chain))
  }

  pub fn is_lp_paused(chain: Chain) -> bool {
    Self::flag_active(&ConfigKey::PauseLp.key()) || Self::flag_active(&pause_lp_chain_key(chain))
  }

  pub fn is_asym_withdrawal_paused(chain: Chain) -> bool {
    Self::flag_active(&pause_asym_withdrawal_key(chain))
  }

  pub fn is_ilp_disabled(asset: &Asset) -> bool {
    Self::flag_active(&ilp_disabled_key(asset))
  }

  pub fn is_pool_ragnarok(asset: &Asset) -> bool {
    Self::flag_active(&pool_ragnarok_key(asset))
  }

  /// Median USD price of one rune across the anchor pools, in 1e8 units.
  pub fn dollars_per_rune() -> Balance {
    let mut prices: Vec<Balance> = Self::pools_sorted()
      .into_iter()
      .filter(|pool| pool.is_available() && pool.balance_rune > 0)
      .filter(|pool| Self::get_mimir(&tor_anchor_key(&pool.asset)).unwrap_or(0) > 0)
      .map(|pool| pool.rune_value_in_asset(params::ONE as Balance))
      .collect();
    if prices.is_empty() {
      return 0;
    }
    prices.sort();
    let mid = prices.len() / 2;
    if prices.len() % 2 == 0 {
      prices[mid - 1].saturating_add(prices[mid]) / 2
    } else {
      prices[mid]
    }
  }

  /// Rune equivalent of a USD amount; zero without anchor pools.
  pub fn usd_to_rune(usd: Balance) -> Balance {
    let price = Self::dollars_per_rune();
    primitives::safe_share(params::ONE as Balance, price, usd)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dynamic_keys() {
    let btc = Chain::Btc.gas_asset();
    assert_eq!(halt_chain_trading_key(Chain::Btc), b"HaltBTCTrading".to_vec());
    assert_eq!(ilp_disabled_key(&btc), b"ILP-DISABLED-BTC.BTC".to_vec());
    assert_eq!(pool_ragnarok_key(&btc), b"RAGNAROK-BTC-BTC".to_vec());
    assert_eq!(pause_asym_withdrawal_key(Chain::Eth), b"PauseAsymWithdrawal-ETH".to_vec());
    assert_eq!(solvency_halt_key(Chain::Eth), b"SolvencyHaltETHChain".to_vec());
  }

  #[test]
  fn defaults_come_from_params() {
    assert_eq!(ConfigKey::ChurnInterval.default_value(), 43_200);
    assert_eq!(ConfigKey::MinimumNodesForBft.name(), "MinimumNodesForBFT");
    assert_eq!(ConfigKey::HaltTrading.default_value(), 0);
  }
}
