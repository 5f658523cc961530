//! Integer helpers shared by the pool and fee math.

use sp_arithmetic::{Rounding, helpers_128bit::multiply_by_rational_with_rounding};

use crate::ecosystem::{Balance, params::MAX_BASIS_POINTS};

/// `amount * part / total`, rounded down. Zero when `total` is zero; saturates when
/// the result does not fit.
pub fn safe_share(part: Balance, total: Balance, amount: Balance) -> Balance {
  if total == 0 || part == 0 || amount == 0 {
    return 0;
  }
  multiply_by_rational_with_rounding(amount, part, total, Rounding::Down).unwrap_or(Balance::MAX)
}

/// `amount * bps / 10000`.
pub fn basis_points_of(amount: Balance, bps: u64) -> Balance {
  safe_share(bps as Balance, MAX_BASIS_POINTS as Balance, amount)
}

/// Drops the digits a chain with `decimals` precision cannot represent.
pub fn round_to_decimals(amount: Balance, decimals: u8) -> Balance {
  if decimals == 0 || decimals >= 8 {
    return amount;
  }
  let unit = 10u128.pow(u32::from(8 - decimals));
  amount - amount % unit
}

/// Two thirds or more of `total`, never more than `total`.
pub fn is_super_majority(signers: usize, total: usize) -> bool {
  if signers == 0 || signers > total {
    return false;
  }
  signers.saturating_mul(3) >= total.saturating_mul(2)
}
