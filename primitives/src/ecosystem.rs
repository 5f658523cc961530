//! Protocol Constants for the Settlement Core
//!
//! Module account identifiers and the constant defaults behind every runtime
//! configuration (Mimir) key. A Mimir override replaces a default at runtime;
//! a missing or negative override falls back to the value here.

/// Balance type alias, base-1e8 fixed point.
pub type Balance = u128;

/// Identifiers of the module accounts that hold protocol balances.
///
/// Runtimes derive the account with `PalletId::into_account_truncating()`.
pub mod module_ids {
  /// Pooled funds and inbound deposits
  pub const ASGARD_MODULE_ID: &[u8; 8] = b"asgard00";

  /// Validator bonds and accrued bond rewards
  pub const BOND_MODULE_ID: &[u8; 8] = b"bond0000";

  /// Protocol reserve: fees, subsidies and impermanent-loss protection
  pub const RESERVE_MODULE_ID: &[u8; 8] = b"reserve0";

  /// Transit account used for mints and burns
  pub const PROTOCOL_MODULE_ID: &[u8; 8] = b"thorchn0";
}

/// Constant defaults of runtime configuration keys.
///
/// Values are `i64` because Mimir overrides are signed; negative means "unset".
pub mod params {
  /// One whole unit in base-1e8 fixed point
  pub const ONE: i64 = 100_000_000;

  /// 100% in basis points
  pub const MAX_BASIS_POINTS: u64 = 10_000;

  // Churn
  pub const CHURN_INTERVAL: i64 = 43_200;
  pub const CHURN_RETRY_INTERVAL: i64 = 720;
  pub const DESIRED_VALIDATOR_SET: i64 = 100;
  pub const ASGARD_SIZE: i64 = 40;
  pub const MINIMUM_NODES_FOR_BFT: i64 = 4;
  pub const NUMBER_OF_NEW_NODES_PER_CHURN: i64 = 4;
  pub const BAD_VALIDATOR_REDLINE: i64 = 3;
  pub const MIN_SLASH_POINTS_FOR_BAD_VALIDATOR: i64 = 100;
  pub const MAX_NODE_TO_CHURN_OUT_FOR_LOW_VERSION: i64 = 3;
  pub const ARTIFICIAL_RAGNAROK_BLOCK_HEIGHT: i64 = 0;

  // Bonds
  pub const MINIMUM_BOND_IN_RUNE: i64 = 1_000_000 * ONE;
  pub const BOND_LOCKUP_PERIOD: i64 = 0;
  pub const NODE_OPERATOR_FEE: i64 = 0;
  pub const SLASH_PENALTY: i64 = 15_000;

  // Pools
  pub const POOL_CYCLE: i64 = 43_200;
  pub const MAX_AVAILABLE_POOLS: i64 = 100;
  pub const MIN_RUNE_POOL_DEPTH: i64 = 10_000 * ONE;
  pub const STAGED_POOL_COST: i64 = 10 * ONE;
  pub const MINIMUM_POOL_LIQUIDITY_FEE: i64 = 0;
  pub const LIQUIDITY_LOCK_UP_BLOCKS: i64 = 0;
  pub const FULL_IMP_LOSS_PROTECTION_BLOCKS: i64 = 1_440_000;
  pub const ILP_CUTOFF: i64 = 0;
  pub const ILP_MINIMUM_BLOCKS: i64 = 0;
  pub const MAX_SYNTH_PER_POOL_DEPTH: i64 = 5_000;
  pub const MINT_SYNTHS: i64 = 1;

  // Outbounds
  pub const MIN_TX_OUT_VOLUME_THRESHOLD: i64 = 1_000 * ONE;
  pub const TX_OUT_DELAY_RATE: i64 = 25 * ONE;
  pub const TX_OUT_DELAY_MAX: i64 = 17_280;
  pub const MAX_TX_OUT_OFFSET: i64 = 720;
  pub const SIGNING_TRANSACTION_PERIOD: i64 = 300;

  // Fees
  pub const OUTBOUND_TRANSACTION_FEE: i64 = 2_000_000;
  pub const MINIMUM_L1_OUTBOUND_FEE_USD: i64 = 1_000_000;
  pub const TARGET_OUTBOUND_FEE_SURPLUS_RUNE: i64 = 100_000 * ONE;
  pub const MAX_OUTBOUND_FEE_MULTIPLIER_BASIS_POINTS: i64 = 30_000;
  pub const MIN_OUTBOUND_FEE_MULTIPLIER_BASIS_POINTS: i64 = 15_000;
  /// Returned by the fee multiplier when min and max are crossed
  pub const LEGACY_OUTBOUND_FEE_MULTIPLIER_BASIS_POINTS: u64 = 30_000;

  // Rewards
  pub const EMISSION_CURVE: i64 = 6;
  pub const BLOCKS_PER_YEAR: i64 = 5_256_000;

  // Names
  pub const TNS_REGISTER_FEE: i64 = 10 * ONE;
  pub const TNS_FEE_PER_BLOCK: i64 = 20;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn module_ids_are_distinct() {
    let ids = [
      module_ids::ASGARD_MODULE_ID,
      module_ids::BOND_MODULE_ID,
      module_ids::RESERVE_MODULE_ID,
      module_ids::PROTOCOL_MODULE_ID,
    ];
    for (i, a) in ids.iter().enumerate() {
      for b in ids.iter().skip(i + 1) {
        assert_ne!(a, b);
      }
    }
  }

  #[test]
  fn fee_multiplier_bounds_are_ordered() {
    assert!(
      params::MIN_OUTBOUND_FEE_MULTIPLIER_BASIS_POINTS
        <= params::MAX_OUTBOUND_FEE_MULTIPLIER_BASIS_POINTS
    );
    assert!(params::MIN_OUTBOUND_FEE_MULTIPLIER_BASIS_POINTS >= params::MAX_BASIS_POINTS as i64);
  }

  #[test]
  fn bft_floor_fits_the_asgard_size() {
    assert!(params::MINIMUM_NODES_FOR_BFT <= params::ASGARD_SIZE);
    assert!(params::NUMBER_OF_NEW_NODES_PER_CHURN <= params::DESIRED_VALIDATOR_SET);
  }
}
