//! Pool Math
//!
//! Pure AMM arithmetic over `u128` balances. Every multiply-then-divide runs in
//! 512-bit intermediates and saturates back into `u128`; a zero divisor yields
//! zero instead of a fault.

use polkadot_sdk::sp_core::U512;

use crate::types::Balance;
use primitives::{params::MAX_BASIS_POINTS, round_to_decimals};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PoolMathError {
  /// Neither the pool nor the deposit carries rune.
  ZeroRuneDepth,
  /// Neither the pool nor the deposit carries the asset.
  ZeroAssetDepth,
  InvalidBasisPoints,
  /// A symmetric withdrawal would empty one side of the pool but not the other.
  DrainsOneSide,
  /// The withdrawal would not reduce the provider's units.
  WithdrawFail,
}

fn wide(value: Balance) -> U512 {
  U512::from(value)
}

fn narrow(value: U512) -> Balance {
  if value > U512::from(u128::MAX) {
    u128::MAX
  } else {
    value.as_u128()
  }
}

/// `a * b / c` in wide arithmetic; zero when `c` is zero.
pub fn mul_div(a: Balance, b: Balance, c: Balance) -> Balance {
  if c == 0 {
    return 0;
  }
  narrow(wide(a) * wide(b) / wide(c))
}

/// Liquidity units for depositing `(r, a)` into a pool with depths `(R, A)` and
/// `P` existing units:
///
/// `units = P (rA + Ra) / (2RA) * (1 - |Ra - rA| / ((2r + R)(a + A)))`
///
/// The whole expression is one rational truncated once. Returns
/// `(new_pool_units, added_units)`; a pool without units or with an empty side
/// prices the deposit one unit per rune.
pub fn calculate_pool_units(
  old_pool_units: Balance,
  pool_rune: Balance,
  pool_asset: Balance,
  add_rune: Balance,
  add_asset: Balance,
) -> Result<(Balance, Balance), PoolMathError> {
  if pool_rune.saturating_add(add_rune) == 0 {
    return Err(PoolMathError::ZeroRuneDepth);
  }
  if pool_asset.saturating_add(add_asset) == 0 {
    return Err(PoolMathError::ZeroAssetDepth);
  }
  if old_pool_units == 0 || pool_rune == 0 || pool_asset == 0 {
    return Ok((add_rune, add_rune));
  }
  let (p, big_r, big_a, r, a) = (
    wide(old_pool_units),
    wide(pool_rune),
    wide(pool_asset),
    wide(add_rune),
    wide(add_asset),
  );
  let r_a = big_r * a;
  let a_r = r * big_a;
  let diff = if r_a > a_r { r_a - a_r } else { a_r - r_a };
  let slip_denominator: U512 = (r * 2u32 + big_r) * (a + big_a);
  let slip_numerator = slip_denominator.saturating_sub(diff);
  let numerator = p * (a_r + r_a);
  let denominator = big_r * big_a * 2u32;
  let units = match (
    numerator.checked_mul(slip_numerator),
    denominator.checked_mul(slip_denominator),
  ) {
    (Some(num), Some(den)) => num / den,
    _ => numerator / denominator * slip_numerator / slip_denominator,
  };
  let added = narrow(units);
  Ok((old_pool_units.saturating_add(added), added))
}

/// Share of side `X` owed for `s` of `T` units when withdrawing one side only:
/// `s X (2T^2 - 2Ts + s^2) / T^3`.
pub fn asym_share(units: Balance, total_units: Balance, depth: Balance) -> Balance {
  if total_units == 0 || units == 0 {
    return 0;
  }
  let s = wide(units.min(total_units));
  let t = wide(total_units);
  let x = wide(depth);
  let t2 = t * t;
  let poly: U512 = (t2 * 2u32 + s * s).saturating_sub(t * s * 2u32);
  let denominator = t2 * t;
  let share = match (s * x).checked_mul(poly) {
    Some(numerator) => numerator / denominator,
    None => s * x / t * poly / t2,
  };
  narrow(share)
}

/// Which side(s) a withdrawal pays out.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum WithdrawSide {
  #[default]
  Symmetric,
  Rune,
  Asset,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WithdrawInput {
  /// Total pool units, including units minted for impermanent-loss protection.
  pub pool_units: Balance,
  pub pool_rune: Balance,
  pub pool_asset: Balance,
  pub lp_units: Balance,
  pub basis_points: u64,
  pub side: WithdrawSide,
  pub extra_units: Balance,
  pub decimals: u8,
  /// Set when the pool asset is its chain's gas asset.
  pub max_gas: Option<Balance>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WithdrawOutput {
  pub rune: Balance,
  pub asset: Balance,
  /// Units removed from the pool, extra units included.
  pub units_to_claim: Balance,
  pub units_after: Balance,
  /// Asset kept back in the pool to pay the final outbound's gas.
  pub gas_asset: Balance,
}

pub fn calculate_withdraw(input: WithdrawInput) -> Result<WithdrawOutput, PoolMathError> {
  if input.basis_points == 0 || input.basis_points > MAX_BASIS_POINTS {
    return Err(PoolMathError::InvalidBasisPoints);
  }
  let claimed = mul_div(
    input.lp_units,
    input.basis_points as Balance,
    MAX_BASIS_POINTS as Balance,
  );
  let units_after = input.lp_units.saturating_sub(claimed);
  if units_after >= input.lp_units {
    return Err(PoolMathError::WithdrawFail);
  }
  let units_to_claim = claimed.saturating_add(input.extra_units);

  let (rune, mut asset) = match input.side {
    WithdrawSide::Symmetric => {
      let rune = mul_div(units_to_claim, input.pool_rune, input.pool_units);
      let asset = mul_div(units_to_claim, input.pool_asset, input.pool_units);
      if (rune == input.pool_rune) != (asset == input.pool_asset) {
        return Err(PoolMathError::DrainsOneSide);
      }
      (rune, asset)
    },
    WithdrawSide::Rune => (asym_share(units_to_claim, input.pool_units, input.pool_rune), 0),
    WithdrawSide::Asset => (0, asym_share(units_to_claim, input.pool_units, input.pool_asset)),
  };
  asset = round_to_decimals(asset, input.decimals);

  let mut gas_asset = 0;
  if input.pool_units.saturating_sub(units_to_claim) == 0 {
    if let Some(max_gas) = input.max_gas {
      gas_asset = max_gas.min(asset);
      asset -= gas_asset;
    }
  }

  Ok(WithdrawOutput {
    rune,
    asset,
    units_to_claim,
    units_after,
    gas_asset,
  })
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ImpLossInput {
  pub rune_deposit_value: Balance,
  pub asset_deposit_value: Balance,
  pub lp_units: Balance,
  pub pool_units: Balance,
  pub pool_rune: Balance,
  pub pool_asset: Balance,
  pub basis_points: u64,
  /// Blocks since the later of the provider's last add and the pool's last status change.
  pub age: u64,
  pub full_protection_blocks: u64,
  pub minimum_blocks: u64,
}

/// Protection earned after `age` blocks, in basis points.
pub fn protection_basis_points(age: u64, full_protection_blocks: u64, minimum_blocks: u64) -> u64 {
  if age < minimum_blocks {
    return 0;
  }
  if full_protection_blocks == 0 {
    return MAX_BASIS_POINTS;
  }
  (MAX_BASIS_POINTS.saturating_mul(age) / full_protection_blocks).min(MAX_BASIS_POINTS)
}

/// Rune owed to a withdrawing provider for impermanent loss.
pub fn calc_imp_loss_protection(input: ImpLossInput) -> Balance {
  let protection =
    protection_basis_points(input.age, input.full_protection_blocks, input.minimum_blocks);
  if protection == 0 {
    return 0;
  }
  let a1 = mul_div(input.lp_units, input.pool_asset, input.pool_units);
  let r1 = mul_div(input.lp_units, input.pool_rune, input.pool_units);
  if a1 == 0 {
    return 0;
  }
  let deposit_value = mul_div(input.asset_deposit_value, r1, a1).saturating_add(input.rune_deposit_value);
  let redeem_value = r1.saturating_mul(2);
  let coverage = mul_div(
    deposit_value.saturating_sub(redeem_value),
    input.basis_points as Balance,
    MAX_BASIS_POINTS as Balance,
  );
  mul_div(coverage, protection as Balance, MAX_BASIS_POINTS as Balance)
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SwapOutput {
  pub emit: Balance,
  pub liquidity_fee: Balance,
  pub slip_basis_points: u64,
}

/// Continuous-liquidity swap of `x` into a pool with input depth `X` and output
/// depth `Y`: `emit = xXY / (x + X)^2`, `fee = x^2 Y / (x + X)^2`.
pub fn calc_swap(x: Balance, input_depth: Balance, output_depth: Balance) -> SwapOutput {
  let (x, big_x, big_y) = (wide(x), wide(input_depth), wide(output_depth));
  let sum = x + big_x;
  if sum.is_zero() {
    return SwapOutput::default();
  }
  let denominator = sum * sum;
  SwapOutput {
    emit: narrow(x * big_x * big_y / denominator),
    liquidity_fee: narrow(x * x * big_y / denominator),
    slip_basis_points: narrow(x * wide(MAX_BASIS_POINTS as Balance) / sum) as u64,
  }
}

/// Outbound fee multiplier in basis points, falling from `max` towards `min` as the
/// withheld-minus-spent gas surplus approaches `target_surplus`.
pub fn calc_outbound_fee_multiplier(
  target_surplus: Balance,
  gas_spent: Balance,
  gas_withheld: Balance,
  max_multiplier: u64,
  min_multiplier: u64,
) -> u64 {
  if min_multiplier > max_multiplier {
    return primitives::params::LEGACY_OUTBOUND_FEE_MULTIPLIER_BASIS_POINTS;
  }
  let surplus = gas_withheld.saturating_sub(gas_spent);
  let range = (max_multiplier - min_multiplier) as Balance;
  let reduced = if target_surplus == 0 {
    if surplus > 0 { range } else { 0 }
  } else {
    mul_div(surplus, range, target_surplus).min(range)
  };
  (max_multiplier.saturating_sub(reduced as u64)).max(min_multiplier)
}
