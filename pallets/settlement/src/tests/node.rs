use super::last_refund_reason;
use alloc::vec;

use crate::{
  Error, Event,
  mock::*,
  pallet::{BondProviderSets, NetworkState, NodeAccounts},
  types::{Asset, Coin, NodeStatus, PubKeySet, Version},
};
use polkadot_sdk::frame_support::{assert_noop, assert_ok};

const NODE_E: AccountId = 20;
const NODE_E_BOND: Balance = 1_500_000 * ONE;

fn deposit_rune(who: AccountId, amount: Balance, memo: &str) {
  let rune = Asset::native_rune();
  MockBank::mint(&who, &rune, amount).unwrap();
  assert_ok!(Settlement::deposit(
    RuntimeOrigin::signed(who),
    vec![Coin::new(rune, amount)],
    memo.as_bytes().to_vec(),
  ));
}

fn keys_of(node: AccountId) -> PubKeySet {
  PubKeySet {
    secp256k1: pub_key_of(node),
    ed25519: pub_key_of(node),
  }
}

/// Bonds a fresh node from ALICE and completes its registration.
fn register_node() {
  deposit_rune(ALICE, NODE_E_BOND, "BOND:tthor20");
  assert_ok!(Settlement::set_node_keys(RuntimeOrigin::signed(NODE_E), keys_of(NODE_E)));
  assert_ok!(Settlement::set_version(
    RuntimeOrigin::signed(NODE_E),
    Version::new(1, 0, 0)
  ));
  assert_ok!(Settlement::set_ip_address(
    RuntimeOrigin::signed(NODE_E),
    b"10.0.0.20".to_vec()
  ));
}

#[test]
fn bonded_node_becomes_ready_once_registered() {
  new_test_ext().execute_with(|| {
    let bond_module = rune_balance(BOND);
    deposit_rune(ALICE, NODE_E_BOND, "BOND:tthor20");

    let node = NodeAccounts::<Test>::get(NODE_E).unwrap();
    assert_eq!(node.status, NodeStatus::Standby);
    assert_eq!(node.bond, NODE_E_BOND);
    assert_eq!(node.bond_address, ALICE);
    assert_eq!(rune_balance(BOND), bond_module + NODE_E_BOND);
    let providers = BondProviderSets::<Test>::get(NODE_E).unwrap();
    assert_eq!(providers.get(&ALICE).map(|p| p.bond), Some(NODE_E_BOND));

    // standby until keys, version and address are in
    run_to_block(2);
    assert_eq!(NodeAccounts::<Test>::get(NODE_E).unwrap().status, NodeStatus::Standby);

    assert_ok!(Settlement::set_node_keys(RuntimeOrigin::signed(NODE_E), keys_of(NODE_E)));
    assert_ok!(Settlement::set_version(
      RuntimeOrigin::signed(NODE_E),
      Version::new(1, 0, 0)
    ));
    assert_ok!(Settlement::set_ip_address(
      RuntimeOrigin::signed(NODE_E),
      b"10.0.0.20".to_vec()
    ));
    run_to_block(3);
    assert_eq!(NodeAccounts::<Test>::get(NODE_E).unwrap().status, NodeStatus::Ready);
    System::assert_has_event(
      Event::NodeStatusChanged {
        node_address: NODE_E,
        from: NodeStatus::Standby,
        to: NodeStatus::Ready,
      }
      .into(),
    );
  });
}

#[test]
fn node_registration_is_checked() {
  new_test_ext().execute_with(|| {
    assert_noop!(
      Settlement::set_version(RuntimeOrigin::signed(ALICE), Version::new(1, 0, 0)),
      Error::<Test>::NodeNotFound
    );
    register_node();

    assert_noop!(
      Settlement::set_node_keys(RuntimeOrigin::signed(NODE_E), keys_of(ALICE)),
      Error::<Test>::Unauthorized
    );
    assert_noop!(
      Settlement::set_version(RuntimeOrigin::signed(NODE_E), Version::new(0, 9, 0)),
      Error::<Test>::BadVersion
    );
    assert_noop!(
      Settlement::set_version(RuntimeOrigin::signed(NODE_E), Version::default()),
      Error::<Test>::BadVersion
    );
    assert_noop!(
      Settlement::set_ip_address(RuntimeOrigin::signed(NODE_E), vec![]),
      Error::<Test>::InvalidMessage
    );
    assert_ok!(Settlement::set_version(
      RuntimeOrigin::signed(NODE_E),
      Version::new(1, 1, 0)
    ));
  });
}

#[test]
fn keys_cannot_be_shared_between_nodes() {
  new_test_ext().execute_with(|| {
    deposit_rune(ALICE, ONE, "BOND:tthor20");
    assert_noop!(
      Settlement::set_node_keys(RuntimeOrigin::signed(NODE_E), keys_of(NODE_A)),
      Error::<Test>::InvalidMessage
    );
  });
}

#[test]
fn strangers_cannot_bond_to_a_node() {
  new_test_ext().execute_with(|| {
    register_node();

    deposit_rune(BOB, 10 * ONE, "BOND:tthor20");

    assert_eq!(last_refund_reason(), Some(b"Unauthorized".to_vec()));
    assert_eq!(NodeAccounts::<Test>::get(NODE_E).unwrap().bond, NODE_E_BOND);
    // the refund pays the native outbound fee
    assert_eq!(rune_balance(BOB), 10 * ONE - 2_000_000);
  });
}

#[test]
fn operator_can_whitelist_a_provider() {
  new_test_ext().execute_with(|| {
    register_node();
    deposit_rune(ALICE, ONE, "BOND:tthor20:tthor2");

    deposit_rune(BOB, 10 * ONE, "BOND:tthor20");

    let providers = BondProviderSets::<Test>::get(NODE_E).unwrap();
    assert_eq!(providers.get(&BOB).map(|p| p.bond), Some(10 * ONE));
    assert_eq!(
      NodeAccounts::<Test>::get(NODE_E).unwrap().bond,
      NODE_E_BOND + ONE + 10 * ONE
    );

    // a provider takes back its own bond
    deposit_rune(BOB, ONE, "UNBOND:tthor20:500000000");
    let providers = BondProviderSets::<Test>::get(NODE_E).unwrap();
    assert_eq!(providers.get(&BOB).map(|p| p.bond), Some(5 * ONE));
    assert_eq!(rune_balance(BOB), 5 * ONE);
  });
}

#[test]
fn active_nodes_cannot_unbond() {
  new_test_ext().execute_with(|| {
    deposit_rune(NODE_A, ONE, "UNBOND:tthor11");

    assert_eq!(last_refund_reason(), Some(b"CannotUnbondActive".to_vec()));
    assert_eq!(NodeAccounts::<Test>::get(NODE_A).unwrap().bond, VALIDATOR_BOND);
  });
}

#[test]
fn leave_returns_the_bond_of_a_standby_node() {
  new_test_ext().execute_with(|| {
    register_node();
    let reserve_before = rune_balance(RESERVE);

    deposit_rune(ALICE, ONE, "LEAVE:tthor20");

    let node = NodeAccounts::<Test>::get(NODE_E).unwrap();
    assert_eq!(node.status, NodeStatus::Disabled);
    assert_eq!(node.bond, 0);
    assert!(node.requested_to_leave);
    assert_eq!(rune_balance(ALICE), NODE_E_BOND);
    // the rune that carried the memo is kept
    assert_eq!(rune_balance(RESERVE), reserve_before + ONE);
  });
}

#[test]
fn leave_marks_an_active_node() {
  new_test_ext().execute_with(|| {
    deposit_rune(NODE_A, ONE, "LEAVE:tthor11");

    let node = NodeAccounts::<Test>::get(NODE_A).unwrap();
    assert!(node.requested_to_leave);
    assert!(node.is_leaving());
    assert_eq!(node.status, NodeStatus::Active);
    assert_eq!(node.bond, VALIDATOR_BOND);
  });
}

#[test]
fn reserve_emits_block_rewards_into_the_bond_module() {
  new_test_ext().execute_with(|| {
    let bond_module = rune_balance(BOND);

    run_to_block(2);

    let reward = RESERVE_FUNDS / 6 / 5_256_000;
    assert_eq!(rune_balance(RESERVE), RESERVE_FUNDS - reward);
    assert_eq!(rune_balance(BOND), bond_module + reward);
    assert_eq!(NetworkState::<Test>::get().bond_reward_rune, reward);
    System::assert_has_event(Event::BlockRewards { bond_reward: reward }.into());
  });
}
