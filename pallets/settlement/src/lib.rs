//! Settlement Pallet
//!
//! Consensus-level settlement core of a cross-chain liquidity protocol. Active
//! validators report transactions they observe on external chains; once a
//! super-majority agrees, the transaction's memo is parsed into a typed message and
//! applied to pools, liquidity providers, bonds and vaults. Payouts are scheduled as
//! outbound items that signers pick up at their release height.
//!
//! Block hooks drive the rest of the lifecycle: churn of the validator set, gas
//! reimbursement, the pool cycle, ragnarok and outbound release.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod adapters;
pub use adapters::{AddressCodec, BankOps};

pub mod config;
pub mod cycler;
pub mod dispatcher;
pub mod gas;
pub mod handlers;
pub mod hooks;
pub mod invariants;
pub mod keeper;
pub mod memo;
pub mod messages;
pub mod observation;
pub mod pool_math;
pub mod ragnarok;
pub mod refund;
pub mod tx_out;
pub mod types;
pub mod validators;

#[cfg(test)]
pub mod mock;
#[cfg(test)]
pub mod tests;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub mod weights;
pub use weights::WeightInfo;

use frame::prelude::*;

use crate::{memo::MemoError, messages::MsgError, pool_math::PoolMathError};

#[frame::pallet]
pub mod pallet {
  use super::*;
  use crate::types::*;
  use alloc::vec::Vec;
  use polkadot_sdk::sp_core::hashing::blake2_256;

  #[pallet::config]
  pub trait Config: frame_system::Config {
    /// Native balances of accounts and module accounts
    type Bank: BankOps<Self::AccountId>;

    /// Native and per-chain address translation
    type Addresses: AddressCodec<Self::AccountId>;

    /// Origin allowed to set and delete Mimir overrides
    type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    /// Holds pooled rune, inbound native deposits and minted synths
    #[pallet::constant]
    type AsgardAccount: Get<Self::AccountId>;

    /// Holds validator bonds and undistributed bond rewards
    #[pallet::constant]
    type BondAccount: Get<Self::AccountId>;

    /// Protocol reserve: fees, gas subsidies and impermanent-loss protection
    #[pallet::constant]
    type ReserveAccount: Get<Self::AccountId>;

    /// Transit account for mints and burns
    #[pallet::constant]
    type ModuleAccount: Get<Self::AccountId>;

    /// Liquidity positions withdrawn per block while ragnarok runs
    #[pallet::constant]
    type MaxRagnarokWithdrawsPerBlock: Get<u32>;

    type WeightInfo: WeightInfo;
  }

  #[pallet::pallet]
  #[pallet::without_storage_info]
  pub struct Pallet<T>(_);

  #[pallet::storage]
  pub type Pools<T: Config> = StorageMap<_, Blake2_128Concat, Asset, Pool, OptionQuery>;

  /// Liquidity positions keyed by pool and owner address.
  #[pallet::storage]
  pub type LiquidityProviders<T: Config> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    Asset,
    Blake2_128Concat,
    Address,
    LiquidityProvider,
    OptionQuery,
  >;

  #[pallet::storage]
  pub type Vaults<T: Config> = StorageMap<_, Blake2_128Concat, PubKey, Vault, OptionQuery>;

  #[pallet::storage]
  pub type NodeAccounts<T: Config> =
    StorageMap<_, Blake2_128Concat, T::AccountId, NodeAccount<T::AccountId>, OptionQuery>;

  #[pallet::storage]
  pub type BondProviderSets<T: Config> =
    StorageMap<_, Blake2_128Concat, T::AccountId, BondProviders<T::AccountId>, OptionQuery>;

  /// Penalty points accumulated since the last churn.
  #[pallet::storage]
  pub type SlashPoints<T: Config> = StorageMap<_, Blake2_128Concat, T::AccountId, u64, ValueQuery>;

  #[pallet::storage]
  pub type ObservedTxInVoters<T: Config> =
    StorageMap<_, Blake2_128Concat, TxId, ObservedTxVoter<T::AccountId>, OptionQuery>;

  #[pallet::storage]
  pub type ObservedTxOutVoters<T: Config> =
    StorageMap<_, Blake2_128Concat, TxId, ObservedTxVoter<T::AccountId>, OptionQuery>;

  /// Outbound items by release height.
  #[pallet::storage]
  pub type TxOuts<T: Config> = StorageMap<_, Blake2_128Concat, u64, Vec<TxOutItem>, ValueQuery>;

  /// Rune value already scheduled per release height.
  #[pallet::storage]
  pub type TxOutValues<T: Config> = StorageMap<_, Blake2_128Concat, u64, Balance, ValueQuery>;

  /// Amount of each asset a vault still owes to undone outbound items.
  #[pallet::storage]
  pub type VaultPendingOutbound<T: Config> =
    StorageDoubleMap<_, Blake2_128Concat, PubKey, Blake2_128Concat, Asset, Balance, ValueQuery>;

  /// Undone outbound items per signing vault and chain; each holds back one max gas.
  #[pallet::storage]
  pub type VaultPendingOutboundCount<T: Config> =
    StorageDoubleMap<_, Blake2_128Concat, PubKey, Blake2_128Concat, Chain, u32, ValueQuery>;

  #[pallet::storage]
  pub type NetworkState<T: Config> = StorageValue<_, Network, ValueQuery>;

  #[pallet::storage]
  pub type NetworkFees<T: Config> = StorageMap<_, Blake2_128Concat, Chain, NetworkFee, OptionQuery>;

  /// Validators backing each `(transaction_size, fee_rate)` proposal per chain.
  #[pallet::storage]
  pub type NetworkFeeVotes<T: Config> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    Chain,
    Blake2_128Concat,
    (u64, u64),
    Vec<T::AccountId>,
    ValueQuery,
  >;

  #[pallet::storage]
  pub type Mimir<T: Config> = StorageMap<_, Blake2_128Concat, Vec<u8>, i64, OptionQuery>;

  /// Liquidity fees per pool since the last pool cycle.
  #[pallet::storage]
  pub type RollingPoolLiquidityFees<T: Config> =
    StorageMap<_, Blake2_128Concat, Asset, Balance, ValueQuery>;

  #[pallet::storage]
  pub type PoolLiquidityFees<T: Config> =
    StorageDoubleMap<_, Blake2_128Concat, u64, Blake2_128Concat, Asset, Balance, ValueQuery>;

  #[pallet::storage]
  pub type TotalLiquidityFees<T: Config> = StorageMap<_, Blake2_128Concat, u64, Balance, ValueQuery>;

  #[pallet::storage]
  pub type PoolLuvi<T: Config> = StorageMap<_, Blake2_128Concat, Asset, Balance, ValueQuery>;

  /// Height ragnarok started at; zero while it has not.
  #[pallet::storage]
  pub type RagnarokBlockHeight<T: Config> = StorageValue<_, u64, ValueQuery>;

  #[pallet::storage]
  pub type RagnarokNth<T: Config> = StorageValue<_, u64, ValueQuery>;

  /// Ragnarok outbounds scheduled but not yet observed.
  #[pallet::storage]
  pub type RagnarokPending<T: Config> = StorageValue<_, u64, ValueQuery>;

  #[pallet::storage]
  pub type RagnarokPosition<T: Config> = StorageValue<_, RagnarokWithdrawPosition, ValueQuery>;

  /// Gas spent by outbounds observed in the current block.
  #[pallet::storage]
  pub type BlockGas<T: Config> = StorageValue<_, Vec<GasEntry>, ValueQuery>;

  /// Signing groups a churn requested keys for, by request height.
  #[pallet::storage]
  pub type KeygenBlocks<T: Config> = StorageMap<_, Blake2_128Concat, u64, Vec<Keygen>, ValueQuery>;

  #[pallet::storage]
  pub type TssVoters<T: Config> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    u64,
    Blake2_128Concat,
    u32,
    TssVoter<T::AccountId>,
    OptionQuery,
  >;

  #[pallet::storage]
  pub type ThorNames<T: Config> =
    StorageMap<_, Blake2_128Concat, Vec<u8>, ThorName<T::AccountId>, OptionQuery>;

  #[pallet::storage]
  pub type LastMigrateHeight<T: Config> = StorageValue<_, u64, ValueQuery>;

  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    /// Initial active set: `(node, secp256k1 public key, bond)`.
    pub validators: Vec<(T::AccountId, Vec<u8>, Balance)>,
    /// Public key of the asgard vault shared by the initial set.
    pub asgard_pub_key: Vec<u8>,
    pub mimir: Vec<(Vec<u8>, i64)>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      let mut membership = Vec::new();
      for (who, pub_key, bond) in &self.validators {
        let mut node = NodeAccount::new(who.clone(), who.clone(), 0);
        node.pub_key_set = PubKeySet {
          secp256k1: pub_key.clone(),
          ed25519: pub_key.clone(),
        };
        node.bond = *bond;
        node.status = NodeStatus::Active;
        NodeAccounts::<T>::insert(who, node);

        let mut providers = BondProviders::new(who.clone(), 0);
        providers.whitelist(who.clone());
        providers.bond(who, *bond);
        BondProviderSets::<T>::insert(who, providers);
        membership.push(pub_key.clone());
      }
      if !self.asgard_pub_key.is_empty() {
        let vault = Vault::new(
          self.asgard_pub_key.clone(),
          VaultType::Asgard,
          VaultStatus::Active,
          membership,
          0,
        );
        Vaults::<T>::insert(&self.asgard_pub_key, vault);
      }
      for (key, value) in &self.mimir {
        Mimir::<T>::insert(key, value);
      }
    }
  }

  #[pallet::hooks]
  impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
    fn on_initialize(_now: BlockNumberFor<T>) -> Weight {
      Self::begin_block();
      T::WeightInfo::begin_block().saturating_add(T::WeightInfo::end_block())
    }

    fn on_finalize(_now: BlockNumberFor<T>) {
      Self::end_block();
    }

    #[cfg(feature = "try-runtime")]
    fn try_state(_n: BlockNumberFor<T>) -> Result<(), polkadot_sdk::sp_runtime::TryRuntimeError> {
      Self::do_try_state()
    }
  }

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    MimirSet {
      key: Vec<u8>,
      value: i64,
    },
    MimirDeleted {
      key: Vec<u8>,
    },
    /// An observation reached consensus.
    ObservationFinalised {
      tx_id: TxId,
      chain: Chain,
      inbound: bool,
    },
    AddLiquidity {
      pool: Asset,
      provider_units: Balance,
      rune_address: Address,
      rune_amount: Balance,
      asset_address: Address,
      asset_amount: Balance,
      tx_id: TxId,
    },
    /// One side of a symmetric deposit arrived; the other is still missing.
    PendingLiquidity {
      pool: Asset,
      rune_address: Address,
      rune_amount: Balance,
      asset_address: Address,
      asset_amount: Balance,
      tx_id: TxId,
    },
    Withdraw {
      pool: Asset,
      liquidity_provider_units: Balance,
      basis_points: u64,
      asymmetry: u64,
      emit_asset: Balance,
      emit_rune: Balance,
      imp_loss_protection: Balance,
      in_tx: Tx,
    },
    Swap {
      pool: Asset,
      swap_target: Balance,
      swap_slip: u64,
      liquidity_fee: Balance,
      liquidity_fee_in_rune: Balance,
      in_tx: Tx,
      emit: Coin,
    },
    Donate {
      pool: Asset,
      in_tx: Tx,
    },
    Refund {
      code: u32,
      reason: Vec<u8>,
      in_tx: Tx,
      fee: Vec<Coin>,
      refunded: Vec<Coin>,
    },
    Fee {
      tx_id: TxId,
      coin: Coin,
      pool_deduct: Balance,
    },
    ScheduledOutbound {
      height: u64,
      item: TxOutItem,
    },
    /// Handed to signers with gas attached.
    OutboundReleased {
      height: u64,
      item: TxOutItem,
    },
    OutboundSettled {
      in_hash: TxId,
      out_hash: TxId,
      coin: Coin,
    },
    GasPaid {
      asset: Asset,
      asset_amount: Balance,
      rune_amount: Balance,
      tx_count: u64,
      reimbursed: bool,
    },
    Reserve {
      contributor: Address,
      amount: Balance,
      tx_id: TxId,
    },
    Bond {
      node_address: T::AccountId,
      amount: Balance,
      kind: BondKind,
      tx_id: TxId,
    },
    SlashVault {
      vault: PubKey,
      pool: Asset,
      asset_amount: Balance,
      bond_slashed: Balance,
    },
    PoolStatusChanged {
      pool: Asset,
      from: PoolStatus,
      to: PoolStatus,
    },
    PoolBalanceChanged {
      pool: Asset,
      rune_amount: Balance,
      rune_added: bool,
      asset_amount: Balance,
      asset_added: bool,
      reason: Vec<u8>,
    },
    PoolSuspended {
      pool: Asset,
    },
    MintBurn {
      asset: Asset,
      amount: Balance,
      minted: bool,
      reason: Vec<u8>,
    },
    Switch {
      from: Address,
      to: T::AccountId,
      coin: Coin,
      tx_id: TxId,
    },
    ThorNameSet {
      name: Vec<u8>,
      chain: Chain,
      address: Address,
      owner: T::AccountId,
      expire: u64,
      fee: Balance,
    },
    NodeStatusChanged {
      node_address: T::AccountId,
      from: NodeStatus,
      to: NodeStatus,
    },
    NodeMarkedToLeave {
      node_address: T::AccountId,
      leave_score: u64,
    },
    KeygenRequested {
      height: u64,
      index: u32,
      members: Vec<PubKey>,
    },
    VaultStatusChanged {
      pub_key: PubKey,
      from: VaultStatus,
      to: VaultStatus,
    },
    RagnarokStarted {
      height: u64,
    },
    RagnarokStage {
      nth: u64,
    },
    NetworkFeeSet {
      chain: Chain,
      transaction_size: u64,
      transaction_fee_rate: u64,
    },
    NodeKeysSet {
      node_address: T::AccountId,
      pub_key_set: PubKeySet,
    },
    VersionSet {
      node_address: T::AccountId,
      version: Version,
    },
    IpAddressSet {
      node_address: T::AccountId,
      ip_address: Vec<u8>,
    },
    BlockRewards {
      bond_reward: Balance,
    },
    BlockSettled {
      height: u64,
      released: u32,
    },
  }

  /// Errors a rejected inbound is refunded with carry their index plus 100 as
  /// refund code, so the order below is part of the event schema.
  #[pallet::error]
  pub enum Error<T> {
    InvalidMessage,
    InvalidMemo,
    EmptyAddress,
    InvalidBasisPoints,
    InvalidAsset,
    EmptyCoins,
    PoolNotFound,
    PoolNotAvailable,
    TradingHalted,
    LiquidityPaused,
    AsymWithdrawalPaused,
    Unauthorized,
    NodeNotFound,
    NotEnoughToPayFee,
    InsufficientFunds,
    BondLocked,
    CannotUnbondActive,
    YggdrasilHasFunds,
    NoLiquidityProvider,
    WithdrawFail,
    WithdrawLocked,
    DrainsOneSide,
    ZeroRuneDepth,
    ZeroAssetDepth,
    NoLiquidityUnits,
    TradeTargetNotMet,
    InsufficientSwapOutput,
    SynthSupplyExceeded,
    SynthsDisabled,
    MismatchedAddress,
    InvalidAddress,
    VaultNotFound,
    BadVersion,
    Internal,
    InvalidThorName,
    InsufficientThorNameFee,
    RagnarokInProgress,
    InvalidKeygen,
    InvalidMimirKey,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Votes for transactions arriving at a vault.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::observe_inbound(txs.len() as u32))]
    pub fn observe_inbound(origin: OriginFor<T>, txs: Vec<ObservedTx>) -> DispatchResult {
      let signer = Self::ensure_active_validator(origin)?;
      for tx in txs {
        Self::do_observe_inbound(&signer, tx)?;
      }
      Ok(())
    }

    /// Votes for transactions leaving a vault.
    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::observe_outbound(txs.len() as u32))]
    pub fn observe_outbound(origin: OriginFor<T>, txs: Vec<ObservedTx>) -> DispatchResult {
      let signer = Self::ensure_active_validator(origin)?;
      for tx in txs {
        Self::do_observe_outbound(&signer, tx)?;
      }
      Ok(())
    }

    /// Moves native coins into the asgard module and dispatches `memo` as an
    /// inbound on this chain.
    #[pallet::call_index(2)]
    #[pallet::weight(T::WeightInfo::deposit())]
    pub fn deposit(origin: OriginFor<T>, coins: Vec<Coin>, memo: Vec<u8>) -> DispatchResult {
      let who = ensure_signed(origin)?;
      ensure!(
        !coins.is_empty() && coins.iter().all(|c| !c.is_empty()),
        Error::<T>::EmptyCoins
      );
      ensure!(
        coins.iter().all(|c| c.asset.is_native()),
        Error::<T>::InvalidAsset
      );
      let asgard = T::AsgardAccount::get();
      for coin in &coins {
        T::Bank::transfer(&who, &asgard, &coin.asset, coin.amount)?;
      }

      let height = Self::block_height();
      let nonce = frame_system::Pallet::<T>::account_nonce(&who);
      let id = TxId::from(blake2_256(&(&who, height, nonce, &coins, &memo).encode()));
      let tx = ObservedTx {
        tx: Tx {
          id,
          chain: Chain::Thor,
          from_address: T::Addresses::encode(&who),
          to_address: T::Addresses::encode(&asgard),
          coins,
          gas: Vec::new(),
          memo,
        },
        block_height: height,
        observed_pub_key: Vec::new(),
      };
      let mut voter = ObservedTxVoter::new(id);
      voter.tx = Some(tx.clone());
      voter.height = height;
      voter.finalised_height = height;
      ObservedTxInVoters::<T>::insert(id, voter);
      Self::process_inbound(&tx, ModuleName::Asgard);
      Ok(())
    }

    #[pallet::call_index(3)]
    #[pallet::weight(T::WeightInfo::set_mimir())]
    pub fn set_mimir(origin: OriginFor<T>, key: Vec<u8>, value: i64) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(!key.is_empty(), Error::<T>::InvalidMimirKey);
      Mimir::<T>::insert(&key, value);
      Self::deposit_event(Event::MimirSet { key, value });
      Ok(())
    }

    #[pallet::call_index(4)]
    #[pallet::weight(T::WeightInfo::delete_mimir())]
    pub fn delete_mimir(origin: OriginFor<T>, key: Vec<u8>) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(Mimir::<T>::contains_key(&key), Error::<T>::InvalidMimirKey);
      Mimir::<T>::remove(&key);
      Self::deposit_event(Event::MimirDeleted { key });
      Ok(())
    }

    #[pallet::call_index(5)]
    #[pallet::weight(T::WeightInfo::set_node_keys())]
    pub fn set_node_keys(origin: OriginFor<T>, pub_key_set: PubKeySet) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::do_set_node_keys(who, pub_key_set)
    }

    #[pallet::call_index(6)]
    #[pallet::weight(T::WeightInfo::set_version())]
    pub fn set_version(origin: OriginFor<T>, version: Version) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::do_set_version(who, version)
    }

    #[pallet::call_index(7)]
    #[pallet::weight(T::WeightInfo::set_ip_address())]
    pub fn set_ip_address(origin: OriginFor<T>, ip_address: Vec<u8>) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::do_set_ip_address(who, ip_address)
    }

    /// Reports the public key a signing group generated for a churn.
    #[pallet::call_index(8)]
    #[pallet::weight(T::WeightInfo::submit_tss_pool())]
    pub fn submit_tss_pool(
      origin: OriginFor<T>,
      height: u64,
      index: u32,
      pool_pub_key: PubKey,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::do_submit_tss_pool(who, height, index, pool_pub_key)
    }

    #[pallet::call_index(9)]
    #[pallet::weight(T::WeightInfo::observe_network_fee())]
    pub fn observe_network_fee(
      origin: OriginFor<T>,
      chain: Chain,
      transaction_size: u64,
      transaction_fee_rate: u64,
    ) -> DispatchResult {
      let signer = Self::ensure_active_validator(origin)?;
      Self::do_observe_network_fee(signer, chain, transaction_size, transaction_fee_rate)
    }
  }

  impl<T: Config> Pallet<T> {
    pub(crate) fn ensure_active_validator(
      origin: OriginFor<T>,
    ) -> Result<T::AccountId, DispatchError> {
      let who = ensure_signed(origin)?;
      let node = NodeAccounts::<T>::get(&who).ok_or(Error::<T>::Unauthorized)?;
      ensure!(node.is_active(), Error::<T>::Unauthorized);
      Ok(who)
    }
  }
}

impl<T: Config> From<MemoError> for Error<T> {
  fn from(_: MemoError) -> Self {
    Error::<T>::InvalidMemo
  }
}

impl<T: Config> From<MsgError> for Error<T> {
  fn from(err: MsgError) -> Self {
    match err {
      MsgError::EmptyAddress => Error::<T>::EmptyAddress,
      MsgError::EmptyCoins => Error::<T>::EmptyCoins,
      MsgError::InvalidAsset => Error::<T>::InvalidAsset,
      MsgError::InvalidBasisPoints => Error::<T>::InvalidBasisPoints,
      MsgError::InvalidThorName => Error::<T>::InvalidThorName,
      MsgError::InvalidMessage => Error::<T>::InvalidMessage,
    }
  }
}

impl<T: Config> From<PoolMathError> for Error<T> {
  fn from(err: PoolMathError) -> Self {
    match err {
      PoolMathError::ZeroRuneDepth => Error::<T>::ZeroRuneDepth,
      PoolMathError::ZeroAssetDepth => Error::<T>::ZeroAssetDepth,
      PoolMathError::InvalidBasisPoints => Error::<T>::InvalidBasisPoints,
      PoolMathError::DrainsOneSide => Error::<T>::DrainsOneSide,
      PoolMathError::WithdrawFail => Error::<T>::WithdrawFail,
    }
  }
}
