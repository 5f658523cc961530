use alloc::vec;

use crate::{
  AddressCodec, Event,
  memo::{outbound_memo, refund_memo},
  mock::*,
  pallet::{
    NodeAccounts, ObservedTxInVoters, Pools, TxOutValues, TxOuts, VaultPendingOutbound, Vaults,
  },
  types::{Asset, Chain, Coin, ObservedTx, PoolStatus, Tx, TxId},
};
use polkadot_sdk::frame_support::{assert_ok, traits::Hooks};

fn usdc() -> Asset {
  asset("ETH.USDC-0XA0B8")
}

fn vault_usdc() -> u128 {
  Vaults::<Test>::get(ASGARD_PUB_KEY).unwrap().coin_amount(&usdc())
}

/// An observed payment out of the genesis asgard on ethereum.
fn outbound(id: TxId, to: &[u8], coins: vec::Vec<Coin>, memo: vec::Vec<u8>) -> ObservedTx {
  ObservedTx {
    tx: Tx {
      id,
      chain: Chain::Eth,
      from_address: MockAddressCodec::vault_address(ASGARD_PUB_KEY, Chain::Eth),
      to_address: to.to_vec(),
      coins,
      gas: vec![Coin::new(eth(), 1)],
      memo,
    },
    block_height: 1,
    observed_pub_key: ASGARD_PUB_KEY.to_vec(),
  }
}

/// Rejects an inbound of 5 USDC so that a refund is scheduled for block 2.
fn schedule_refund(sender: &[u8]) {
  observe_inbound(inbound(
    tx_id(1),
    Chain::Eth,
    sender.to_vec(),
    vec![Coin::new(usdc(), 5 * ONE)],
    "WITHDRAW:ETH.USDC-0XA0B8",
  ));
  assert_eq!(TxOuts::<Test>::get(2).len(), 1);
}

#[test]
fn observed_outbound_settles_the_scheduled_item() {
  new_test_ext().execute_with(|| {
    seed_pool(&usdc(), 100 * ONE, 100 * ONE, PoolStatus::Available);
    let sender = external_address(Chain::Eth, 7);
    schedule_refund(&sender);
    assert_eq!(vault_usdc(), 105 * ONE);

    observe_outbound(outbound(
      tx_id(50),
      &sender,
      vec![Coin::new(usdc(), 5 * ONE)],
      refund_memo(&tx_id(1)),
    ));

    assert!(TxOuts::<Test>::get(2).is_empty());
    assert_eq!(vault_usdc(), 100 * ONE);
    let voter = ObservedTxInVoters::<Test>::get(tx_id(1)).unwrap();
    assert_eq!(voter.out_txs.len(), 1);
    assert!(voter.actions.iter().all(|action| action.out_hash == tx_id(50)));
    assert!(settlement_events().iter().any(|event| matches!(
      event,
      Event::OutboundSettled { in_hash, out_hash, .. }
        if *in_hash == tx_id(1) && *out_hash == tx_id(50)
    )));
    // no bond was touched
    for node in VALIDATORS {
      assert_eq!(NodeAccounts::<Test>::get(node).unwrap().bond, VALIDATOR_BOND);
    }
  });
}

#[test]
fn vault_owes_its_scheduled_items_until_they_are_paid() {
  new_test_ext().execute_with(|| {
    seed_pool(&usdc(), 100 * ONE, 100 * ONE, PoolStatus::Available);
    let sender = external_address(Chain::Eth, 7);
    schedule_refund(&sender);

    assert_eq!(Settlement::pending_outbound(ASGARD_PUB_KEY, &usdc()), 5 * ONE);
    assert!(Settlement::has_pending_outbounds(ASGARD_PUB_KEY));
    let vault = Vaults::<Test>::get(ASGARD_PUB_KEY).unwrap();
    assert_eq!(Settlement::available_balance(&vault, &usdc()), 100 * ONE);

    observe_outbound(outbound(
      tx_id(50),
      &sender,
      vec![Coin::new(usdc(), 5 * ONE)],
      refund_memo(&tx_id(1)),
    ));

    assert_eq!(Settlement::pending_outbound(ASGARD_PUB_KEY, &usdc()), 0);
    assert!(!Settlement::has_pending_outbounds(ASGARD_PUB_KEY));
    assert_eq!(VaultPendingOutbound::<Test>::iter().count(), 0);
  });
}

#[test]
fn unscheduled_outbound_slashes_the_vault_signers() {
  new_test_ext().execute_with(|| {
    seed_pool(&usdc(), 100 * ONE, 100 * ONE, PoolStatus::Available);
    let reserve_before = rune_balance(RESERVE);

    observe_outbound(outbound(
      tx_id(60),
      b"eth-thief",
      vec![Coin::new(usdc(), 5 * ONE)],
      outbound_memo(&tx_id(7)),
    ));

    // 5 USDC is worth 5 rune; the penalty is 150% of that, split over four bonds
    for node in VALIDATORS {
      assert_eq!(
        NodeAccounts::<Test>::get(node).unwrap().bond,
        VALIDATOR_BOND - 187_500_000
      );
    }
    let pool = Pools::<Test>::get(usdc()).unwrap();
    assert_eq!((pool.balance_rune, pool.balance_asset), (105 * ONE, 95 * ONE));
    assert_eq!(rune_balance(RESERVE), reserve_before + 250_000_000);
    assert_eq!(vault_usdc(), 95 * ONE);
    assert_ok!(Settlement::do_try_state());
  });
}

#[test]
fn transfer_between_own_vaults_is_not_slashed() {
  new_test_ext().execute_with(|| {
    seed_pool(&usdc(), 100 * ONE, 100 * ONE, PoolStatus::Available);
    let own = MockAddressCodec::vault_address(ASGARD_PUB_KEY, Chain::Eth);

    observe_outbound(outbound(
      tx_id(61),
      &own,
      vec![Coin::new(usdc(), ONE)],
      b"CONSOLIDATE".to_vec(),
    ));

    for node in VALIDATORS {
      assert_eq!(NodeAccounts::<Test>::get(node).unwrap().bond, VALIDATOR_BOND);
    }
    assert_eq!(Pools::<Test>::get(usdc()).unwrap().balance_asset, 100 * ONE);
  });
}

#[test]
fn release_attaches_current_gas() {
  new_test_ext().execute_with(|| {
    seed_pool(&usdc(), 100 * ONE, 100 * ONE, PoolStatus::Available);
    set_network_fee(Chain::Eth, 80_000, 30);
    schedule_refund(&external_address(Chain::Eth, 7));

    run_to_block(3);

    let released = TxOuts::<Test>::get(2);
    assert_eq!(released[0].max_gas, vec![Coin::new(eth(), 3_600_000)]);
    assert_eq!(released[0].gas_rate, 30);
    assert!(!TxOutValues::<Test>::contains_key(2));
    System::assert_has_event(
      Event::BlockSettled {
        height: 2,
        released: 1,
      }
      .into(),
    );
  });
}

#[test]
fn heavy_blocks_push_outbounds_later() {
  new_test_ext().execute_with(|| {
    assert_eq!(Settlement::calc_tx_out_height(10 * ONE), 2);

    TxOutValues::<Test>::insert(2, 1_000 * ONE);
    // 50 rune at 25 rune per block of delay
    assert_eq!(Settlement::calc_tx_out_height(50 * ONE), 3);

    TxOutValues::<Test>::insert(3, 1_000 * ONE);
    assert_eq!(Settlement::calc_tx_out_height(50 * ONE), 5);
  });
}

#[test]
fn network_fee_needs_a_super_majority() {
  new_test_ext().execute_with(|| {
    for node in &VALIDATORS[..2] {
      assert_ok!(Settlement::observe_network_fee(
        RuntimeOrigin::signed(*node),
        Chain::Btc,
        250,
        10
      ));
    }
    assert_eq!(Settlement::get_max_gas(Chain::Btc), 0);

    assert_ok!(Settlement::observe_network_fee(
      RuntimeOrigin::signed(NODE_C),
      Chain::Btc,
      250,
      10
    ));
    assert_eq!(Settlement::get_max_gas(Chain::Btc), 3_750);
    assert_eq!(Settlement::get_gas_rate(Chain::Btc), 10);
  });
}

#[test]
fn spent_gas_is_reimbursed_from_the_reserve() {
  new_test_ext().execute_with(|| {
    seed_pool(&eth(), 1_000 * ONE, 100 * ONE, PoolStatus::Available);
    let own = MockAddressCodec::vault_address(ASGARD_PUB_KEY, Chain::Eth);
    let mut tx = outbound(tx_id(62), &own, vec![Coin::new(eth(), ONE)], b"CONSOLIDATE".to_vec());
    tx.tx.gas = vec![Coin::new(eth(), ONE / 10)];
    observe_outbound(tx);

    let reserve_before = rune_balance(RESERVE);
    Settlement::on_finalize(1);

    // 0.1 ETH is worth one rune at pool price
    let pool = Pools::<Test>::get(eth()).unwrap();
    assert_eq!(pool.balance_asset, 100 * ONE - ONE / 10);
    assert_eq!(pool.balance_rune, 1_000 * ONE + ONE);
    let rewards = settlement_events()
      .into_iter()
      .find_map(|event| match event {
        Event::BlockRewards { bond_reward } => Some(bond_reward),
        _ => None,
      })
      .unwrap_or(0);
    assert_eq!(rune_balance(RESERVE), reserve_before - ONE - rewards);
    assert_ok!(Settlement::do_try_state());
  });
}
