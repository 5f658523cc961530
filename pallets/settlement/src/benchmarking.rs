#![cfg(feature = "runtime-benchmarks")]

use super::*;
use crate::types::{
  Asset, Chain, Coin, Keygen, NodeAccount, NodeStatus, ObservedTx, PubKeySet, Tx, TxId, Vault,
  VaultStatus, VaultType, Version,
};
use alloc::{vec, vec::Vec};
use polkadot_sdk::frame_benchmarking::v2::*;
use polkadot_sdk::frame_system::RawOrigin;

const BENCH_VAULT: &[u8] = b"bench-asgard";
const BENCH_KEY: &[u8] = b"bench-node";

#[benchmarks]
mod benches {
  use super::*;

  fn key_set(key: &[u8]) -> PubKeySet {
    PubKeySet {
      secp256k1: key.to_vec(),
      ed25519: key.to_vec(),
    }
  }

  /// Makes `who` the only active validator and signer of a fresh asgard, so
  /// that a single vote reaches consensus.
  fn sole_validator<T: Config>(who: &T::AccountId) {
    let _ = NodeAccounts::<T>::clear(u32::MAX, None);
    let mut node = NodeAccount::new(who.clone(), who.clone(), 0);
    node.pub_key_set = key_set(BENCH_KEY);
    node.status = NodeStatus::Active;
    node.bond = 1_000_000;
    NodeAccounts::<T>::insert(who, node);
    let vault = Vault::new(
      BENCH_VAULT.to_vec(),
      VaultType::Asgard,
      VaultStatus::Active,
      vec![BENCH_KEY.to_vec()],
      0,
    );
    Vaults::<T>::insert(BENCH_VAULT, vault);
  }

  fn observed(seed: u32, to_address: Vec<u8>, memo: &[u8]) -> ObservedTx {
    ObservedTx {
      tx: Tx {
        id: TxId::from_low_u64_be(u64::from(seed) + 1),
        chain: Chain::Eth,
        from_address: b"eth-sender".to_vec(),
        to_address,
        coins: vec![Coin::new(Chain::Eth.gas_asset(), 100_000_000)],
        gas: vec![Coin::new(Chain::Eth.gas_asset(), 1)],
        memo: memo.to_vec(),
      },
      block_height: 1,
      observed_pub_key: BENCH_VAULT.to_vec(),
    }
  }

  #[benchmark]
  fn observe_inbound(txs: Linear<1, 32>) {
    let caller: T::AccountId = whitelisted_caller();
    sole_validator::<T>(&caller);
    let vault_address = T::Addresses::vault_address(BENCH_VAULT, Chain::Eth);
    let batch: Vec<ObservedTx> = (0..txs)
      .map(|i| observed(i, vault_address.clone(), b"NOOP"))
      .collect();

    #[extrinsic_call]
    observe_inbound(RawOrigin::Signed(caller), batch);

    assert!(ObservedTxInVoters::<T>::get(TxId::from_low_u64_be(1)).is_some_and(|v| v.height > 0));
  }

  #[benchmark]
  fn observe_outbound(txs: Linear<1, 32>) {
    let caller: T::AccountId = whitelisted_caller();
    sole_validator::<T>(&caller);
    let own = T::Addresses::vault_address(BENCH_VAULT, Chain::Eth);
    let batch: Vec<ObservedTx> = (0..txs)
      .map(|i| observed(i, own.clone(), b"CONSOLIDATE"))
      .collect();

    #[extrinsic_call]
    observe_outbound(RawOrigin::Signed(caller), batch);
  }

  #[benchmark]
  fn deposit() -> Result<(), BenchmarkError> {
    let caller: T::AccountId = whitelisted_caller();
    let rune = Asset::native_rune();
    T::Bank::mint(&caller, &rune, 100_000_000).map_err(|_| BenchmarkError::Weightless)?;

    #[extrinsic_call]
    deposit(
      RawOrigin::Signed(caller),
      vec![Coin::new(rune, 100_000_000)],
      b"RESERVE".to_vec(),
    );

    Ok(())
  }

  #[benchmark]
  fn set_mimir() -> Result<(), BenchmarkError> {
    let origin = T::AdminOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;

    #[extrinsic_call]
    set_mimir(origin as T::RuntimeOrigin, b"HaltTrading".to_vec(), 1);

    assert_eq!(Mimir::<T>::get(b"HaltTrading".to_vec()), Some(1));
    Ok(())
  }

  #[benchmark]
  fn delete_mimir() -> Result<(), BenchmarkError> {
    let origin = T::AdminOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;
    Mimir::<T>::insert(b"HaltTrading".to_vec(), 1);

    #[extrinsic_call]
    delete_mimir(origin as T::RuntimeOrigin, b"HaltTrading".to_vec());

    assert!(!Mimir::<T>::contains_key(b"HaltTrading".to_vec()));
    Ok(())
  }

  #[benchmark]
  fn set_node_keys() {
    let caller: T::AccountId = whitelisted_caller();
    NodeAccounts::<T>::insert(&caller, NodeAccount::new(caller.clone(), caller.clone(), 0));

    #[extrinsic_call]
    set_node_keys(RawOrigin::Signed(caller.clone()), key_set(b"bench-fresh-key"));

    assert!(NodeAccounts::<T>::get(&caller).is_some_and(|n| !n.pub_key_set.is_empty()));
  }

  #[benchmark]
  fn set_version() {
    let caller: T::AccountId = whitelisted_caller();
    NodeAccounts::<T>::insert(&caller, NodeAccount::new(caller.clone(), caller.clone(), 0));

    #[extrinsic_call]
    set_version(RawOrigin::Signed(caller), Version::new(1, 0, 0));
  }

  #[benchmark]
  fn set_ip_address() {
    let caller: T::AccountId = whitelisted_caller();
    NodeAccounts::<T>::insert(&caller, NodeAccount::new(caller.clone(), caller.clone(), 0));

    #[extrinsic_call]
    set_ip_address(RawOrigin::Signed(caller), b"10.0.0.1".to_vec());
  }

  #[benchmark]
  fn submit_tss_pool() {
    let caller: T::AccountId = whitelisted_caller();
    sole_validator::<T>(&caller);
    let height = Pallet::<T>::block_height();
    KeygenBlocks::<T>::insert(
      height,
      vec![Keygen {
        members: vec![BENCH_KEY.to_vec()],
        pool_pub_key: None,
      }],
    );

    // the last missing vote creates the vault and rotates the set
    #[extrinsic_call]
    submit_tss_pool(RawOrigin::Signed(caller), height, 0, b"bench-next".to_vec());

    assert!(Vaults::<T>::get(b"bench-next".to_vec()).is_some_and(|v| v.status == VaultStatus::Active));
  }

  #[benchmark]
  fn observe_network_fee() {
    let caller: T::AccountId = whitelisted_caller();
    sole_validator::<T>(&caller);

    #[extrinsic_call]
    observe_network_fee(RawOrigin::Signed(caller), Chain::Eth, 80_000, 30);

    assert!(NetworkFees::<T>::contains_key(Chain::Eth));
  }

  #[benchmark]
  fn begin_block() {
    let caller: T::AccountId = whitelisted_caller();
    sole_validator::<T>(&caller);

    #[block]
    {
      Pallet::<T>::begin_block();
    }
  }

  #[benchmark]
  fn end_block() {
    let caller: T::AccountId = whitelisted_caller();
    sole_validator::<T>(&caller);

    #[block]
    {
      Pallet::<T>::end_block();
    }
  }

  impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Test);
}
