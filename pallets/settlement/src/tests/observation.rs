use alloc::vec;

use crate::{
  Error,
  mock::*,
  pallet::{ObservedTxInVoters, Pools, Vaults},
  types::{Asset, Chain, Coin, PoolStatus},
};
use polkadot_sdk::frame_support::{assert_noop, assert_ok};

fn usdc() -> Asset {
  asset("ETH.USDC-0XA0B8")
}

fn donation() -> crate::types::ObservedTx {
  inbound(
    tx_id(9),
    Chain::Eth,
    external_address(Chain::Eth, 5),
    vec![Coin::new(usdc(), 4 * ONE)],
    "DONATE:ETH.USDC-0XA0B8",
  )
}

#[test]
fn inbound_acts_once_a_super_majority_agrees() {
  new_test_ext().execute_with(|| {
    seed_pool(&usdc(), 100 * ONE, 100 * ONE, PoolStatus::Available);
    let tx = donation();

    for node in [NODE_A, NODE_B] {
      assert_ok!(Settlement::observe_inbound(
        RuntimeOrigin::signed(node),
        vec![tx.clone()]
      ));
    }
    assert_eq!(Pools::<Test>::get(usdc()).unwrap().balance_asset, 100 * ONE);
    assert_eq!(ObservedTxInVoters::<Test>::get(tx_id(9)).unwrap().height, 0);

    assert_ok!(Settlement::observe_inbound(
      RuntimeOrigin::signed(NODE_C),
      vec![tx.clone()]
    ));
    assert_eq!(Pools::<Test>::get(usdc()).unwrap().balance_asset, 104 * ONE);
    assert_eq!(ObservedTxInVoters::<Test>::get(tx_id(9)).unwrap().height, 1);

    // a late vote is recorded but not applied again
    assert_ok!(Settlement::observe_inbound(
      RuntimeOrigin::signed(NODE_D),
      vec![tx]
    ));
    assert_eq!(Pools::<Test>::get(usdc()).unwrap().balance_asset, 104 * ONE);
    assert_eq!(
      Vaults::<Test>::get(ASGARD_PUB_KEY).unwrap().coin_amount(&usdc()),
      104 * ONE
    );
  });
}

#[test]
fn only_active_validators_observe() {
  new_test_ext().execute_with(|| {
    assert_noop!(
      Settlement::observe_inbound(RuntimeOrigin::signed(ALICE), vec![donation()]),
      Error::<Test>::Unauthorized
    );
    assert_noop!(
      Settlement::observe_network_fee(RuntimeOrigin::signed(ALICE), Chain::Btc, 250, 10),
      Error::<Test>::Unauthorized
    );
  });
}

#[test]
fn diverging_observations_do_not_finalise() {
  new_test_ext().execute_with(|| {
    seed_pool(&usdc(), 100 * ONE, 100 * ONE, PoolStatus::Available);
    let honest = donation();
    let mut skewed = donation();
    skewed.tx.coins = vec![Coin::new(usdc(), 40 * ONE)];

    for node in [NODE_A, NODE_B] {
      assert_ok!(Settlement::observe_inbound(
        RuntimeOrigin::signed(node),
        vec![honest.clone()]
      ));
    }
    for node in [NODE_C, NODE_D] {
      assert_ok!(Settlement::observe_inbound(
        RuntimeOrigin::signed(node),
        vec![skewed.clone()]
      ));
    }

    assert_eq!(ObservedTxInVoters::<Test>::get(tx_id(9)).unwrap().height, 0);
    assert_eq!(Pools::<Test>::get(usdc()).unwrap().balance_asset, 100 * ONE);
  });
}
