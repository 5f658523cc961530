//! State invariants checked by `try_state` and the tests.

use frame::prelude::*;

use crate::{
  pallet::{Config, Pallet},
  types::{Balance, ModuleName},
};

const LOG_TARGET: &str = "runtime::settlement";

impl<T: Config> Pallet<T> {
  pub fn do_try_state() -> Result<(), DispatchError> {
    let mut pooled_rune: Balance = 0;
    for pool in Self::pools_sorted() {
      let lps = Self::liquidity_providers_sorted(&pool.asset);
      let units = lps.iter().fold(0, |acc: Balance, lp| acc.saturating_add(lp.units));
      if units != pool.lp_units {
        log::error!(
          target: LOG_TARGET,
          "{}: pool units {} but providers hold {}",
          pool.asset,
          pool.lp_units,
          units
        );
        return Err(DispatchError::Other("pool units differ from provider units"));
      }
      let pending = lps
        .iter()
        .fold(0, |acc: Balance, lp| acc.saturating_add(lp.pending_rune));
      if pending != pool.pending_inbound_rune {
        return Err(DispatchError::Other("pending rune differs from provider pending rune"));
      }
      pooled_rune = pooled_rune
        .saturating_add(pool.balance_rune)
        .saturating_add(pool.pending_inbound_rune);
    }

    let held = Self::rune_balance_of_module(ModuleName::Asgard);
    ensure!(
      pooled_rune <= held,
      DispatchError::Other("pooled rune exceeds the asgard balance")
    );
    Ok(())
  }
}
