use alloc::{vec, vec::Vec};

use crate::{
  Event,
  mock::*,
  pallet::{LiquidityProviders, Pools, Vaults},
  types::{Asset, Chain, LiquidityProvider, PoolStatus},
};
use polkadot_sdk::frame_support::assert_ok;

fn usdc() -> Asset {
  asset("ETH.USDC-0XA0B8")
}

fn dai() -> Asset {
  asset("ETH.DAI-0X6B")
}

fn status_of(asset: &Asset) -> PoolStatus {
  Pools::<Test>::get(asset).unwrap().status
}

/// Cycles every five blocks with a 50 rune depth requirement.
fn fast_cycle() {
  for (key, value) in [("PoolCycle", 5), ("MinRunePoolDepth", 50 * ONE as i64)] {
    assert_ok!(Settlement::set_mimir(
      RuntimeOrigin::root(),
      key.as_bytes().to_vec(),
      value
    ));
  }
}

#[test]
fn shallow_pool_is_demoted_and_deepest_staged_promoted() {
  new_test_ext().execute_with(|| {
    fast_cycle();
    seed_pool(&usdc(), 10 * ONE, 10 * ONE, PoolStatus::Available);
    seed_pool(&dai(), 60 * ONE, 60 * ONE, PoolStatus::Staged);
    seed_pool(&eth(), 10 * ONE, ONE, PoolStatus::Available);

    run_to_block(5);
    assert_eq!(status_of(&usdc()), PoolStatus::Available);

    run_to_block(6);
    assert_eq!(status_of(&usdc()), PoolStatus::Staged);
    assert_eq!(status_of(&dai()), PoolStatus::Available);
    // gas pools are never cycled
    assert_eq!(status_of(&eth()), PoolStatus::Available);

    // the staged pool paid its holding cost before being promoted
    assert_eq!(Pools::<Test>::get(dai()).unwrap().balance_rune, 50 * ONE);
    assert_eq!(rune_balance(ASGARD), 70 * ONE);
    assert!(settlement_events().iter().any(|event| matches!(
      event,
      Event::PoolBalanceChanged { pool, rune_amount, rune_added: false, .. }
        if *pool == dai() && *rune_amount == 10 * ONE
    )));
    System::assert_has_event(
      Event::PoolStatusChanged {
        pool: dai(),
        from: PoolStatus::Staged,
        to: PoolStatus::Available,
      }
      .into(),
    );
    assert_ok!(Settlement::do_try_state());
  });
}

#[test]
fn staged_pool_without_rune_is_abandoned() {
  new_test_ext().execute_with(|| {
    fast_cycle();
    seed_pool(&dai(), 5 * ONE, 10 * ONE, PoolStatus::Staged);

    run_to_block(6);

    assert!(Pools::<Test>::get(dai()).is_none());
    assert_eq!(LiquidityProviders::<Test>::iter_prefix(dai()).count(), 0);
    assert_eq!(Vaults::<Test>::get(ASGARD_PUB_KEY).unwrap().coin_amount(&dai()), 0);
    System::assert_has_event(Event::PoolSuspended { pool: dai() }.into());
    assert_ok!(Settlement::do_try_state());
  });
}

#[test]
fn abandoned_pool_reports_each_provider() {
  new_test_ext().execute_with(|| {
    fast_cycle();
    seed_pool(&dai(), 5 * ONE, 10 * ONE, PoolStatus::Staged);
    let asym_owner = external_address(Chain::Eth, 7);
    LiquidityProviders::<Test>::insert(
      dai(),
      asym_owner.clone(),
      LiquidityProvider {
        asset: dai(),
        asset_address: asym_owner.clone(),
        units: 2 * ONE,
        ..Default::default()
      },
    );
    Pools::<Test>::mutate(dai(), |pool| {
      if let Some(pool) = pool {
        pool.lp_units += 2 * ONE;
      }
    });

    run_to_block(6);

    let mut withdrawn: Vec<(Vec<u8>, Balance)> = settlement_events()
      .into_iter()
      .filter_map(|event| match event {
        Event::Withdraw {
          pool,
          liquidity_provider_units,
          in_tx,
          ..
        } if pool == dai() => Some((in_tx.from_address, liquidity_provider_units)),
        _ => None,
      })
      .collect();
    withdrawn.sort();
    let mut expected = vec![(asym_owner, 2 * ONE), (b"tthor900".to_vec(), 5 * ONE)];
    expected.sort();
    assert_eq!(withdrawn, expected);
    assert!(Pools::<Test>::get(dai()).is_none());
  });
}

#[test]
fn full_pool_list_swaps_out_the_shallowest() {
  new_test_ext().execute_with(|| {
    fast_cycle();
    assert_ok!(Settlement::set_mimir(
      RuntimeOrigin::root(),
      b"MaxAvailablePools".to_vec(),
      1
    ));
    seed_pool(&usdc(), 60 * ONE, 60 * ONE, PoolStatus::Available);
    seed_pool(&dai(), 100 * ONE, 100 * ONE, PoolStatus::Staged);

    run_to_block(6);

    assert_eq!(status_of(&usdc()), PoolStatus::Staged);
    assert_eq!(status_of(&dai()), PoolStatus::Available);
  });
}

#[test]
fn no_swap_when_the_staged_pool_is_not_deeper() {
  new_test_ext().execute_with(|| {
    fast_cycle();
    assert_ok!(Settlement::set_mimir(
      RuntimeOrigin::root(),
      b"MaxAvailablePools".to_vec(),
      1
    ));
    seed_pool(&usdc(), 100 * ONE, 100 * ONE, PoolStatus::Available);
    seed_pool(&dai(), 80 * ONE, 80 * ONE, PoolStatus::Staged);

    run_to_block(6);

    assert_eq!(status_of(&usdc()), PoolStatus::Available);
    assert_eq!(status_of(&dai()), PoolStatus::Staged);
    assert_eq!(Pools::<Test>::get(dai()).unwrap().balance_rune, 70 * ONE);
  });
}
