use super::{last_refund_reason, refund_code_of};
use alloc::vec;

use crate::{
  Error, Event,
  memo::refund_memo,
  mock::*,
  pallet::{LiquidityProviders, Pools, TxOuts},
  types::{Asset, Chain, Coin, PoolStatus},
};
use polkadot_sdk::{
  frame_support::{assert_noop, assert_ok},
  sp_runtime::DispatchError,
};

fn usdc() -> Asset {
  asset("ETH.USDC-0XA0B8")
}

fn pool_depths(asset: &Asset) -> (u128, u128, u128) {
  let pool = Pools::<Test>::get(asset).unwrap();
  (pool.balance_rune, pool.balance_asset, pool.lp_units)
}

#[test]
fn symmetric_add_then_full_withdraw_restores_the_pool() {
  new_test_ext().execute_with(|| {
    let pool_asset = usdc();
    seed_pool(&pool_asset, 100 * ONE, 100 * ONE, PoolStatus::Available);
    let rune = Asset::native_rune();
    MockBank::mint(&ALICE, &rune, 10 * ONE).unwrap();
    let eth_address = external_address(Chain::Eth, ALICE);

    // the rune side arrives first and waits for the asset side
    assert_ok!(Settlement::deposit(
      RuntimeOrigin::signed(ALICE),
      vec![Coin::new(rune.clone(), 10 * ONE)],
      b"ADD:ETH.USDC-0XA0B8:eth-user1".to_vec(),
    ));
    let lp = LiquidityProviders::<Test>::get(&pool_asset, user_address(ALICE)).unwrap();
    assert_eq!(lp.pending_rune, 10 * ONE);
    assert_eq!(lp.units, 0);
    assert_eq!(Pools::<Test>::get(&pool_asset).unwrap().pending_inbound_rune, 10 * ONE);
    assert_ok!(Settlement::do_try_state());

    observe_inbound(inbound(
      tx_id(1),
      Chain::Eth,
      eth_address.clone(),
      vec![Coin::new(pool_asset.clone(), 10 * ONE)],
      "ADD:ETH.USDC-0XA0B8:tthor1",
    ));
    let lp = LiquidityProviders::<Test>::get(&pool_asset, user_address(ALICE)).unwrap();
    assert_eq!(lp.units, 10 * ONE);
    assert_eq!(lp.pending_rune, 0);
    assert_eq!(lp.pending_asset, 0);
    assert_eq!(pool_depths(&pool_asset), (110 * ONE, 110 * ONE, 110 * ONE));
    assert!(settlement_events().iter().any(|event| matches!(
      event,
      Event::AddLiquidity { provider_units, .. } if *provider_units == 10 * ONE
    )));

    observe_inbound(inbound(
      tx_id(2),
      Chain::Eth,
      eth_address.clone(),
      vec![Coin::new(eth(), 1_000)],
      "WITHDRAW:ETH.USDC-0XA0B8:10000",
    ));
    assert_eq!(pool_depths(&pool_asset), (100 * ONE, 100 * ONE, 100 * ONE));
    assert!(LiquidityProviders::<Test>::get(&pool_asset, user_address(ALICE)).is_none());
    assert_eq!(rune_balance(ALICE), 10 * ONE - 2_000_000);
    assert!(TxOuts::<Test>::get(2).iter().any(|item| item.coin
      == Coin::new(pool_asset.clone(), 10 * ONE)
      && item.to_address == eth_address
      && item.in_hash == tx_id(2)));
    assert_ok!(Settlement::do_try_state());
  });
}

#[test]
fn single_sided_asset_add_is_keyed_by_the_asset_address() {
  new_test_ext().execute_with(|| {
    let pool_asset = usdc();
    seed_pool(&pool_asset, 100 * ONE, 100 * ONE, PoolStatus::Available);
    let sender = external_address(Chain::Eth, 3);

    observe_inbound(inbound(
      tx_id(1),
      Chain::Eth,
      sender.clone(),
      vec![Coin::new(pool_asset.clone(), 10 * ONE)],
      "+:ETH.USDC-0XA0B8",
    ));

    let lp = LiquidityProviders::<Test>::get(&pool_asset, &sender).unwrap();
    assert!(lp.rune_address.is_empty());
    assert!(lp.units > 0 && lp.units < 5 * ONE);
    let (rune, amount, units) = pool_depths(&pool_asset);
    assert_eq!((rune, amount), (100 * ONE, 110 * ONE));
    assert_eq!(units, 100 * ONE + lp.units);
    assert_ok!(Settlement::do_try_state());
  });
}

#[test]
fn paused_liquidity_is_refunded() {
  new_test_ext().execute_with(|| {
    let pool_asset = usdc();
    seed_pool(&pool_asset, 100 * ONE, 100 * ONE, PoolStatus::Available);
    assert_ok!(Settlement::set_mimir(RuntimeOrigin::root(), b"PauseLP".to_vec(), 1));
    let sender = external_address(Chain::Eth, 3);

    observe_inbound(inbound(
      tx_id(1),
      Chain::Eth,
      sender.clone(),
      vec![Coin::new(pool_asset.clone(), 5 * ONE)],
      "ADD:ETH.USDC-0XA0B8",
    ));

    assert_eq!(pool_depths(&pool_asset), (100 * ONE, 100 * ONE, 100 * ONE));
    assert!(LiquidityProviders::<Test>::get(&pool_asset, &sender).is_none());
    let code = refund_code_of(Error::<Test>::LiquidityPaused);
    assert!(settlement_events().iter().any(|event| matches!(
      event,
      Event::Refund { code: c, refunded, .. }
        if *c == code && *refunded == vec![Coin::new(pool_asset.clone(), 5 * ONE)]
    )));
    let refund = TxOuts::<Test>::get(2);
    assert_eq!(refund.len(), 1);
    assert_eq!(refund[0].to_address, sender);
    assert_eq!(refund[0].memo, refund_memo(&tx_id(1)));
    assert_eq!(refund[0].vault_pub_key, ASGARD_PUB_KEY.to_vec());
  });
}

#[test]
fn unreadable_memo_is_refunded() {
  new_test_ext().execute_with(|| {
    seed_pool(&usdc(), 100 * ONE, 100 * ONE, PoolStatus::Available);

    observe_inbound(inbound(
      tx_id(1),
      Chain::Eth,
      external_address(Chain::Eth, 3),
      vec![Coin::new(usdc(), ONE)],
      "HELLO:WORLD",
    ));

    assert_eq!(last_refund_reason(), Some(b"InvalidMemo".to_vec()));
    assert_eq!(TxOuts::<Test>::get(2).len(), 1);
  });
}

#[test]
fn withdraw_without_a_position_is_refunded() {
  new_test_ext().execute_with(|| {
    seed_pool(&usdc(), 100 * ONE, 100 * ONE, PoolStatus::Available);

    observe_inbound(inbound(
      tx_id(1),
      Chain::Eth,
      external_address(Chain::Eth, 5),
      vec![Coin::new(usdc(), ONE)],
      "WITHDRAW:ETH.USDC-0XA0B8",
    ));

    assert_eq!(last_refund_reason(), Some(b"NoLiquidityProvider".to_vec()));
    assert_eq!(pool_depths(&usdc()), (100 * ONE, 100 * ONE, 100 * ONE));
  });
}

#[test]
fn donation_deepens_the_pool_without_minting_units() {
  new_test_ext().execute_with(|| {
    seed_pool(&usdc(), 100 * ONE, 100 * ONE, PoolStatus::Available);

    observe_inbound(inbound(
      tx_id(1),
      Chain::Eth,
      external_address(Chain::Eth, 5),
      vec![Coin::new(usdc(), 7 * ONE)],
      "DONATE:ETH.USDC-0XA0B8",
    ));

    assert_eq!(pool_depths(&usdc()), (100 * ONE, 107 * ONE, 100 * ONE));
    assert_ok!(Settlement::do_try_state());
  });
}

#[test]
fn mimir_is_admin_only() {
  new_test_ext().execute_with(|| {
    assert_noop!(
      Settlement::set_mimir(RuntimeOrigin::signed(ALICE), b"PauseLP".to_vec(), 1),
      DispatchError::BadOrigin
    );
    assert_noop!(
      Settlement::delete_mimir(RuntimeOrigin::root(), b"PauseLP".to_vec()),
      Error::<Test>::InvalidMimirKey
    );

    assert_ok!(Settlement::set_mimir(RuntimeOrigin::root(), b"PauseLP".to_vec(), 1));
    assert!(Settlement::is_lp_paused(Chain::Btc));
    assert_ok!(Settlement::delete_mimir(RuntimeOrigin::root(), b"PauseLP".to_vec()));
    assert!(!Settlement::is_lp_paused(Chain::Btc));
    System::assert_last_event(
      Event::MimirDeleted {
        key: b"PauseLP".to_vec(),
      }
      .into(),
    );
  });
}
