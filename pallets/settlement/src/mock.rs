use crate as pallet_settlement;
use frame::prelude::*;
use polkadot_sdk::{
  frame_support::{
    construct_runtime,
    storage::unhashed,
    traits::{ConstU32, ConstU64, Hooks},
  },
  frame_system::EnsureRoot,
  sp_runtime::{
    BuildStorage,
    traits::{BlakeTwo256, IdentityLookup},
  },
};

use alloc::{format, string::String, vec, vec::Vec};

pub use crate::{AddressCodec, BankOps};

use crate::{
  pallet::{LiquidityProviders, NetworkFees, Pools, Vaults},
  types::{
    Address, Asset, Chain, Coin, LiquidityProvider, NetworkFee, ObservedTx, Pool, PoolStatus,
    PubKey, Tx, TxId,
  },
};

type Block = polkadot_sdk::frame_system::mocking::MockBlock<Test>;
pub type AccountId = u64;
pub type Balance = u128;

pub const ONE: Balance = 100_000_000;

pub const ALICE: AccountId = 1;
pub const BOB: AccountId = 2;

pub const NODE_A: AccountId = 11;
pub const NODE_B: AccountId = 12;
pub const NODE_C: AccountId = 13;
pub const NODE_D: AccountId = 14;
pub const VALIDATORS: [AccountId; 4] = [NODE_A, NODE_B, NODE_C, NODE_D];
pub const VALIDATOR_BOND: Balance = 2_000_000 * ONE;

pub const ASGARD: AccountId = 1000;
pub const BOND: AccountId = 1001;
pub const RESERVE: AccountId = 1002;
pub const PROTOCOL: AccountId = 1003;

pub const ASGARD_PUB_KEY: &[u8] = b"asgard-genesis";
pub const RESERVE_FUNDS: Balance = 1_000_000 * ONE;

construct_runtime!(
  pub enum Test {
    System: polkadot_sdk::frame_system,
    Settlement: pallet_settlement,
  }
);

impl polkadot_sdk::frame_system::Config for Test {
  type BaseCallFilter = polkadot_sdk::frame_support::traits::Everything;
  type BlockWeights = ();
  type BlockLength = ();
  type DbWeight = ();
  type RuntimeOrigin = RuntimeOrigin;
  type RuntimeCall = RuntimeCall;
  type Nonce = u64;
  type Hash = polkadot_sdk::sp_core::H256;
  type Hashing = BlakeTwo256;
  type AccountId = AccountId;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Block = Block;
  type RuntimeEvent = RuntimeEvent;
  type BlockHashCount = ConstU64<250>;
  type Version = ();
  type PalletInfo = PalletInfo;
  type AccountData = ();
  type OnNewAccount = ();
  type OnKilledAccount = ();
  type SystemWeightInfo = ();
  type SS58Prefix = ();
  type OnSetCode = ();
  type MaxConsumers = ConstU32<16>;
  type RuntimeTask = ();
  type ExtensionsWeightInfo = ();
  type SingleBlockMigrations = ();
  type MultiBlockMigrator = ();
  type PreInherents = ();
  type PostInherents = ();
  type PostTransactions = ();
}

/// Balances live in plain storage so that storage-layer rollbacks undo them
/// together with the pallet's own writes.
pub struct MockBank;

fn balance_key(who: &AccountId, asset: &Asset) -> Vec<u8> {
  let mut key = b":mock:bank:".to_vec();
  key.extend((who, asset).encode());
  key
}

fn supply_key(asset: &Asset) -> Vec<u8> {
  let mut key = b":mock:supply:".to_vec();
  key.extend(asset.encode());
  key
}

impl BankOps<AccountId> for MockBank {
  fn transfer(
    from: &AccountId,
    to: &AccountId,
    asset: &Asset,
    amount: Balance,
  ) -> Result<(), DispatchError> {
    let src: Balance = unhashed::get_or_default(&balance_key(from, asset));
    if src < amount {
      return Err(DispatchError::Token(
        polkadot_sdk::sp_runtime::TokenError::FundsUnavailable,
      ));
    }
    unhashed::put(&balance_key(from, asset), &(src - amount));
    let dst: Balance = unhashed::get_or_default(&balance_key(to, asset));
    unhashed::put(&balance_key(to, asset), &(dst + amount));
    Ok(())
  }

  fn mint(to: &AccountId, asset: &Asset, amount: Balance) -> Result<(), DispatchError> {
    let bal: Balance = unhashed::get_or_default(&balance_key(to, asset));
    unhashed::put(&balance_key(to, asset), &(bal + amount));
    let supply: Balance = unhashed::get_or_default(&supply_key(asset));
    unhashed::put(&supply_key(asset), &(supply + amount));
    Ok(())
  }

  fn burn(from: &AccountId, asset: &Asset, amount: Balance) -> Result<(), DispatchError> {
    let bal: Balance = unhashed::get_or_default(&balance_key(from, asset));
    if bal < amount {
      return Err(DispatchError::Token(
        polkadot_sdk::sp_runtime::TokenError::FundsUnavailable,
      ));
    }
    unhashed::put(&balance_key(from, asset), &(bal - amount));
    let supply: Balance = unhashed::get_or_default(&supply_key(asset));
    unhashed::put(&supply_key(asset), &supply.saturating_sub(amount));
    Ok(())
  }

  fn balance(who: &AccountId, asset: &Asset) -> Balance {
    unhashed::get_or_default(&balance_key(who, asset))
  }

  fn total_supply(asset: &Asset) -> Balance {
    unhashed::get_or_default(&supply_key(asset))
  }
}

/// Native accounts are `tthor<id>`; vault addresses are `<chain>-<hex key>`.
pub struct MockAddressCodec;

impl AddressCodec<AccountId> for MockAddressCodec {
  fn encode(who: &AccountId) -> Address {
    format!("tthor{}", who).into_bytes()
  }

  fn decode(address: &[u8]) -> Option<AccountId> {
    let digits = address.strip_prefix(b"tthor")?;
    core::str::from_utf8(digits).ok()?.parse().ok()
  }

  fn vault_address(pub_key: &[u8], chain: Chain) -> Address {
    let hex: String = pub_key.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}-{}", chain.ticker().to_ascii_lowercase(), hex).into_bytes()
  }
}

impl pallet_settlement::Config for Test {
  type Bank = MockBank;
  type Addresses = MockAddressCodec;
  type AdminOrigin = EnsureRoot<AccountId>;
  type AsgardAccount = ConstU64<ASGARD>;
  type BondAccount = ConstU64<BOND>;
  type ReserveAccount = ConstU64<RESERVE>;
  type ModuleAccount = ConstU64<PROTOCOL>;
  type MaxRagnarokWithdrawsPerBlock = ConstU32<8>;
  type WeightInfo = ();
}

pub fn pub_key_of(node: AccountId) -> PubKey {
  format!("pk-{}", node).into_bytes()
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let mut t = polkadot_sdk::frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();

  pallet_settlement::GenesisConfig::<Test> {
    validators: VALIDATORS
      .iter()
      .map(|node| (*node, pub_key_of(*node), VALIDATOR_BOND))
      .collect(),
    asgard_pub_key: ASGARD_PUB_KEY.to_vec(),
    mimir: vec![],
  }
  .assimilate_storage(&mut t)
  .unwrap();

  let mut ext = polkadot_sdk::sp_io::TestExternalities::new(t);
  ext.execute_with(|| {
    System::set_block_number(1);
    let rune = Asset::native_rune();
    MockBank::mint(&BOND, &rune, VALIDATOR_BOND * VALIDATORS.len() as Balance).unwrap();
    MockBank::mint(&RESERVE, &rune, RESERVE_FUNDS).unwrap();
  });
  ext
}

pub fn rune_balance(who: AccountId) -> Balance {
  MockBank::balance(&who, &Asset::native_rune())
}

pub fn btc() -> Asset {
  Chain::Btc.gas_asset()
}

pub fn eth() -> Asset {
  Chain::Eth.gas_asset()
}

pub fn asset(raw: &str) -> Asset {
  Asset::parse(raw.as_bytes()).unwrap()
}

pub fn user_address(who: AccountId) -> Address {
  MockAddressCodec::encode(&who)
}

pub fn external_address(chain: Chain, who: AccountId) -> Address {
  format!("{}-user{}", chain.ticker().to_ascii_lowercase(), who).into_bytes()
}

/// Creates a pool backed by real balances: rune in the asgard module, the
/// asset in the genesis asgard vault, all units held by one seed provider.
pub fn seed_pool(asset: &Asset, rune: Balance, amount: Balance, status: PoolStatus) {
  let mut pool = Pool::new(asset.clone(), 0);
  pool.balance_rune = rune;
  pool.balance_asset = amount;
  pool.lp_units = rune;
  pool.status = status;
  Pools::<Test>::insert(asset, &pool);
  MockBank::mint(&ASGARD, &Asset::native_rune(), rune).unwrap();
  Vaults::<Test>::mutate(ASGARD_PUB_KEY, |vault| {
    if let Some(vault) = vault {
      vault.add_funds(&[Coin::new(asset.clone(), amount)]);
    }
  });
  let seed = LiquidityProvider {
    asset: asset.clone(),
    rune_address: b"tthor900".to_vec(),
    asset_address: external_address(asset.chain, 900),
    units: rune,
    ..Default::default()
  };
  LiquidityProviders::<Test>::insert(asset, seed.owner().clone(), seed);
}

pub fn set_network_fee(chain: Chain, transaction_size: u64, transaction_fee_rate: u64) {
  NetworkFees::<Test>::insert(
    chain,
    NetworkFee {
      chain,
      transaction_size,
      transaction_fee_rate,
    },
  );
}

pub fn tx_id(seed: u8) -> TxId {
  TxId::repeat_byte(seed)
}

/// An inbound to the genesis asgard on `chain`.
pub fn inbound(
  id: TxId,
  chain: Chain,
  from_address: Address,
  coins: Vec<Coin>,
  memo: &str,
) -> ObservedTx {
  ObservedTx {
    tx: Tx {
      id,
      chain,
      from_address,
      to_address: MockAddressCodec::vault_address(ASGARD_PUB_KEY, chain),
      coins,
      gas: vec![Coin::new(chain.gas_asset(), 1)],
      memo: memo.as_bytes().to_vec(),
    },
    block_height: 1,
    observed_pub_key: ASGARD_PUB_KEY.to_vec(),
  }
}

/// Votes `tx` in with three of the four genesis validators.
pub fn observe_inbound(tx: ObservedTx) {
  for node in &VALIDATORS[..3] {
    Settlement::observe_inbound(RuntimeOrigin::signed(*node), vec![tx.clone()]).unwrap();
  }
}

pub fn observe_outbound(tx: ObservedTx) {
  for node in &VALIDATORS[..3] {
    Settlement::observe_outbound(RuntimeOrigin::signed(*node), vec![tx.clone()]).unwrap();
  }
}

pub fn run_to_block(n: u64) {
  while System::block_number() < n {
    Settlement::on_finalize(System::block_number());
    System::set_block_number(System::block_number() + 1);
    Settlement::on_initialize(System::block_number());
  }
}

pub fn settlement_events() -> Vec<pallet_settlement::Event<Test>> {
  System::events()
    .into_iter()
    .filter_map(|record| match record.event {
      RuntimeEvent::Settlement(event) => Some(event),
      _ => None,
    })
    .collect()
}
