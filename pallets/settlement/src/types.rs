use codec::{Decode, DecodeWithMemTracking, Encode};
use polkadot_sdk::sp_core::H256;
use scale_info::TypeInfo;

use alloc::{vec, vec::Vec};

pub use primitives::{Asset, AssetClass, Balance, Chain, Coin, coin_amount, safe_share};

/// Hash of an observed external transaction.
pub type TxId = H256;
/// External or native address in its chain's string form.
pub type Address = Vec<u8>;
/// Serialized public key of a node or vault.
pub type PubKey = Vec<u8>;

/// The placeholder in-hash of internally originated outbounds.
pub fn blank_tx_id() -> TxId {
  H256::zero()
}

/// Uppercase hex form of a tx id, as written into memos.
pub fn tx_id_hex(id: &TxId) -> Vec<u8> {
  const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
  id.as_bytes()
    .iter()
    .flat_map(|b| [DIGITS[(b >> 4) as usize], DIGITS[(b & 0x0f) as usize]])
    .collect()
}

/// Parses a 64 digit hex tx id, with or without a `0x` prefix.
pub fn parse_tx_id(raw: &[u8]) -> Option<TxId> {
  let raw = raw.strip_prefix(b"0x").unwrap_or(raw);
  if raw.len() != 64 {
    return None;
  }
  let mut out = [0u8; 32];
  for (i, pair) in raw.chunks(2).enumerate() {
    let hi = (pair[0] as char).to_digit(16)?;
    let lo = (pair[1] as char).to_digit(16)?;
    out[i] = (hi * 16 + lo) as u8;
  }
  Some(H256::from(out))
}

#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo,
)]
pub enum PoolStatus {
  #[default]
  Staged,
  Available,
  Suspended,
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct Pool {
  pub asset: Asset,
  pub balance_rune: Balance,
  pub balance_asset: Balance,
  pub lp_units: Balance,
  pub synth_units: Balance,
  pub pending_inbound_rune: Balance,
  pub pending_inbound_asset: Balance,
  /// Asset precision; zero means the default of 8.
  pub decimals: u8,
  pub status: PoolStatus,
  pub status_since: u64,
}

impl Pool {
  pub fn new(asset: Asset, height: u64) -> Self {
    let status = if asset.is_gas_asset() {
      PoolStatus::Available
    } else {
      PoolStatus::Staged
    };
    Self {
      asset,
      status,
      status_since: height,
      ..Default::default()
    }
  }

  pub fn is_available(&self) -> bool {
    self.status == PoolStatus::Available
  }

  pub fn is_empty(&self) -> bool {
    self.balance_rune == 0 && self.balance_asset == 0
  }

  pub fn pool_units(&self) -> Balance {
    self.lp_units.saturating_add(self.synth_units)
  }

  pub fn decimals(&self) -> u8 {
    if self.decimals == 0 { 8 } else { self.decimals }
  }

  /// Recomputes the virtual units backing `synth_supply` minted synths:
  /// `L * s / (2A - s)`, the denominator floored at one.
  pub fn calc_synth_units(&mut self, synth_supply: Balance) -> Balance {
    self.synth_units = if synth_supply == 0 {
      0
    } else {
      let denominator = self
        .balance_asset
        .saturating_mul(2)
        .saturating_sub(synth_supply)
        .max(1);
      safe_share(synth_supply, denominator, self.lp_units)
    };
    self.pool_units()
  }

  pub fn asset_value_in_rune(&self, amount: Balance) -> Balance {
    safe_share(self.balance_rune, self.balance_asset, amount)
  }

  pub fn rune_value_in_asset(&self, amount: Balance) -> Balance {
    safe_share(self.balance_asset, self.balance_rune, amount)
  }
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct LiquidityProvider {
  pub asset: Asset,
  pub rune_address: Address,
  pub asset_address: Address,
  pub units: Balance,
  pub pending_rune: Balance,
  pub pending_asset: Balance,
  pub pending_tx_id: Option<TxId>,
  pub last_add_height: u64,
  pub last_withdraw_height: u64,
  pub rune_deposit_value: Balance,
  pub asset_deposit_value: Balance,
}

impl LiquidityProvider {
  /// Storage key: the rune address when present, else the asset address.
  pub fn owner(&self) -> &Address {
    if self.rune_address.is_empty() {
      &self.asset_address
    } else {
      &self.rune_address
    }
  }

  pub fn is_symmetric(&self) -> bool {
    !self.rune_address.is_empty() && !self.asset_address.is_empty()
  }

  pub fn is_empty(&self) -> bool {
    self.units == 0 && self.pending_rune == 0 && self.pending_asset == 0
  }
}

#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo,
)]
pub enum VaultType {
  #[default]
  Asgard,
  Yggdrasil,
}

#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo,
)]
pub enum VaultStatus {
  #[default]
  Init,
  Active,
  Retiring,
  Inactive,
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct ChainContract {
  pub chain: Chain,
  pub router: Address,
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct Vault {
  pub pub_key: PubKey,
  pub vault_type: VaultType,
  pub status: VaultStatus,
  pub coins: Vec<Coin>,
  pub membership: Vec<PubKey>,
  pub routers: Vec<ChainContract>,
  pub block_height: u64,
  pub inbound_tx_count: u64,
  pub outbound_tx_count: u64,
}

impl Vault {
  pub fn new(
    pub_key: PubKey,
    vault_type: VaultType,
    status: VaultStatus,
    membership: Vec<PubKey>,
    height: u64,
  ) -> Self {
    Self {
      pub_key,
      vault_type,
      status,
      membership,
      block_height: height,
      ..Default::default()
    }
  }

  pub fn is_asgard(&self) -> bool {
    self.vault_type == VaultType::Asgard
  }

  pub fn is_yggdrasil(&self) -> bool {
    self.vault_type == VaultType::Yggdrasil
  }

  pub fn coin_amount(&self, asset: &Asset) -> Balance {
    coin_amount(&self.coins, asset)
  }

  pub fn has_funds(&self) -> bool {
    self.coins.iter().any(|coin| coin.amount > 0)
  }

  pub fn has_funds_for_chain(&self, chain: Chain) -> bool {
    self
      .coins
      .iter()
      .any(|coin| coin.amount > 0 && coin.asset.chain == chain)
  }

  pub fn add_funds(&mut self, coins: &[Coin]) {
    for coin in coins.iter().filter(|c| !c.is_empty()) {
      match self.coins.iter_mut().find(|c| c.asset == coin.asset) {
        Some(held) => held.amount = held.amount.saturating_add(coin.amount),
        None => self.coins.push(coin.clone()),
      }
    }
  }

  pub fn sub_funds(&mut self, coins: &[Coin]) {
    for coin in coins {
      if let Some(held) = self.coins.iter_mut().find(|c| c.asset == coin.asset) {
        held.amount = held.amount.saturating_sub(coin.amount);
      }
    }
  }

  /// Zeroes the holding of one asset, returning what was held.
  pub fn clear_asset(&mut self, asset: &Asset) -> Balance {
    let held = self.coin_amount(asset);
    self.coins.retain(|c| c.asset != *asset);
    held
  }

  pub fn contains(&self, pub_key: &[u8]) -> bool {
    self.membership.iter().any(|member| member.as_slice() == pub_key)
  }
}

#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo,
)]
pub enum NodeStatus {
  #[default]
  WhiteListed,
  Standby,
  Ready,
  Active,
  Disabled,
}

/// Semantic software version reported by a node.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
)]
pub struct Version {
  pub major: u16,
  pub minor: u16,
  pub patch: u16,
}

impl Version {
  pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
    Self {
      major,
      minor,
      patch,
    }
  }
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct PubKeySet {
  pub secp256k1: PubKey,
  pub ed25519: PubKey,
}

impl PubKeySet {
  pub fn is_empty(&self) -> bool {
    self.secp256k1.is_empty() || self.ed25519.is_empty()
  }
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo)]
pub struct NodeAccount<AccountId> {
  pub node_address: AccountId,
  pub pub_key_set: PubKeySet,
  pub bond: Balance,
  pub status: NodeStatus,
  pub status_since: u64,
  pub active_block_height: u64,
  pub leave_score: u64,
  pub requested_to_leave: bool,
  pub forced_to_leave: bool,
  /// Operator account that whitelists bond providers and may unbond or leave.
  pub bond_address: AccountId,
  pub version: Version,
  pub ip_address: Vec<u8>,
}

impl<AccountId> NodeAccount<AccountId> {
  pub fn new(node_address: AccountId, bond_address: AccountId, height: u64) -> Self {
    Self {
      node_address,
      pub_key_set: PubKeySet::default(),
      bond: 0,
      status: NodeStatus::WhiteListed,
      status_since: height,
      active_block_height: 0,
      leave_score: 0,
      requested_to_leave: false,
      forced_to_leave: false,
      bond_address,
      version: Version::default(),
      ip_address: Vec::new(),
    }
  }

  pub fn is_active(&self) -> bool {
    self.status == NodeStatus::Active
  }

  /// Marked to rotate out on the next churn.
  pub fn is_leaving(&self) -> bool {
    self.forced_to_leave || self.requested_to_leave || self.leave_score > 0
  }

  pub fn update_status(&mut self, status: NodeStatus, height: u64) {
    if self.status != status {
      self.status = status;
      self.status_since = height;
    }
  }
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo)]
pub struct BondProvider<AccountId> {
  pub bond_address: AccountId,
  pub bond: Balance,
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo)]
pub struct BondProviders<AccountId> {
  pub node_address: AccountId,
  /// Share of each reward kept by the node operator, in basis points.
  pub node_operator_fee: u64,
  pub providers: Vec<BondProvider<AccountId>>,
}

impl<AccountId: Clone + PartialEq> BondProviders<AccountId> {
  pub fn new(node_address: AccountId, node_operator_fee: u64) -> Self {
    Self {
      node_address,
      node_operator_fee,
      providers: Vec::new(),
    }
  }

  pub fn has(&self, who: &AccountId) -> bool {
    self.providers.iter().any(|p| p.bond_address == *who)
  }

  pub fn get(&self, who: &AccountId) -> Option<&BondProvider<AccountId>> {
    self.providers.iter().find(|p| p.bond_address == *who)
  }

  pub fn whitelist(&mut self, who: AccountId) {
    if !self.has(&who) {
      self.providers.push(BondProvider {
        bond_address: who,
        bond: 0,
      });
    }
  }

  pub fn unwhitelist(&mut self, who: &AccountId) {
    self.providers.retain(|p| p.bond_address != *who || p.bond > 0);
  }

  pub fn bond(&mut self, who: &AccountId, amount: Balance) {
    if let Some(p) = self.providers.iter_mut().find(|p| p.bond_address == *who) {
      p.bond = p.bond.saturating_add(amount);
    }
  }

  pub fn unbond(&mut self, who: &AccountId, amount: Balance) {
    if let Some(p) = self.providers.iter_mut().find(|p| p.bond_address == *who) {
      p.bond = p.bond.saturating_sub(amount);
    }
  }

  pub fn total(&self) -> Balance {
    self
      .providers
      .iter()
      .fold(0, |acc: Balance, p| acc.saturating_add(p.bond))
  }

  /// Rescales provider bonds so they sum to `node_bond`. The last bonded provider
  /// absorbs the rounding remainder.
  pub fn adjust(&mut self, node_bond: Balance) {
    let total = self.total();
    if total == 0 {
      if let Some(first) = self.providers.first_mut() {
        first.bond = node_bond;
      }
      return;
    }
    let mut assigned: Balance = 0;
    let last = self.providers.iter().rposition(|p| p.bond > 0);
    for (i, p) in self.providers.iter_mut().enumerate() {
      if Some(i) == last {
        continue;
      }
      p.bond = safe_share(p.bond, total, node_bond);
      assigned = assigned.saturating_add(p.bond);
    }
    if let Some(i) = last {
      self.providers[i].bond = node_bond.saturating_sub(assigned);
    }
  }
}

/// A transaction as seen on its chain.
#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct Tx {
  pub id: TxId,
  pub chain: Chain,
  pub from_address: Address,
  pub to_address: Address,
  pub coins: Vec<Coin>,
  pub gas: Vec<Coin>,
  pub memo: Vec<u8>,
}

/// One observer's report of a transaction into or out of a vault.
#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct ObservedTx {
  pub tx: Tx,
  /// External block height the transaction was included at.
  pub block_height: u64,
  /// Vault the funds arrived at (inbound) or left from (outbound).
  pub observed_pub_key: PubKey,
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo)]
pub struct ObservedTxVote<AccountId> {
  pub tx: ObservedTx,
  pub signers: Vec<AccountId>,
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo)]
pub struct ObservedTxVoter<AccountId> {
  pub tx_id: TxId,
  /// The observation that reached consensus, once it has.
  pub tx: Option<ObservedTx>,
  /// Block the observation reached consensus at; zero before that.
  pub height: u64,
  pub votes: Vec<ObservedTxVote<AccountId>>,
  pub finalised_height: u64,
  pub actions: Vec<TxOutItem>,
  pub out_txs: Vec<Tx>,
  pub outbound_height: u64,
}

impl<AccountId: Clone + PartialEq> ObservedTxVoter<AccountId> {
  pub fn new(tx_id: TxId) -> Self {
    Self {
      tx_id,
      tx: None,
      height: 0,
      votes: Vec::new(),
      finalised_height: 0,
      actions: Vec::new(),
      out_txs: Vec::new(),
      outbound_height: 0,
    }
  }

  /// Records a vote. Returns false when the signer already voted for this exact
  /// observation.
  pub fn add(&mut self, tx: ObservedTx, signer: AccountId) -> bool {
    if let Some(vote) = self.votes.iter_mut().find(|v| v.tx == tx) {
      if vote.signers.contains(&signer) {
        return false;
      }
      vote.signers.push(signer);
      return true;
    }
    self.votes.push(ObservedTxVote {
      tx,
      signers: vec![signer],
    });
    true
  }

  /// The observation backed by a super-majority of `active`, if any.
  pub fn consensus(&self, active: &[AccountId]) -> Option<&ObservedTxVote<AccountId>> {
    self.votes.iter().find(|vote| {
      let count = vote.signers.iter().filter(|s| active.contains(s)).count();
      primitives::is_super_majority(count, active.len())
    })
  }

  pub fn signers(&self) -> Vec<AccountId> {
    let mut all: Vec<AccountId> = Vec::new();
    for signer in self.votes.iter().flat_map(|v| v.signers.iter()) {
      if !all.contains(signer) {
        all.push(signer.clone());
      }
    }
    all
  }

  pub fn set_outbound_height(&mut self, height: u64) {
    self.outbound_height = self.outbound_height.max(height);
  }
}

/// Which module account an outbound is paid from.
#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo,
)]
pub enum ModuleName {
  #[default]
  Asgard,
  Bond,
  Reserve,
  Protocol,
}

/// An instruction to signers: pay `coin` to `to_address` from `vault_pub_key`.
#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct TxOutItem {
  pub chain: Chain,
  pub to_address: Address,
  pub vault_pub_key: PubKey,
  pub coin: Coin,
  pub memo: Vec<u8>,
  pub in_hash: TxId,
  pub out_hash: TxId,
  pub max_gas: Vec<Coin>,
  pub gas_rate: i64,
  pub module_name: ModuleName,
}

impl TxOutItem {
  pub fn new(chain: Chain, to_address: Address, coin: Coin, memo: Vec<u8>, in_hash: TxId) -> Self {
    Self {
      chain,
      to_address,
      coin,
      memo,
      in_hash,
      ..Default::default()
    }
  }

  pub fn is_internal(&self) -> bool {
    self.in_hash == blank_tx_id()
  }

  pub fn is_done(&self) -> bool {
    self.out_hash != blank_tx_id()
  }

  /// Whether an observed outbound settles this item.
  pub fn matches(&self, tx: &ObservedTx) -> bool {
    !self.is_done()
      && self.chain == tx.tx.chain
      && self.vault_pub_key == tx.observed_pub_key
      && self.chain.canonical_address(&self.to_address)
        == tx.tx.chain.canonical_address(&tx.tx.to_address)
      && self.memo.eq_ignore_ascii_case(&tx.tx.memo)
      && (tx.tx.coins.iter().any(|c| c.asset == self.coin.asset) || self.coin.amount == 0)
  }
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct Network {
  pub bond_reward_rune: Balance,
  pub total_bond_units: Balance,
  pub outbound_gas_spent_rune: Balance,
  pub outbound_gas_withheld_rune: Balance,
  pub burned_bep2_rune: Balance,
  pub burned_erc20_rune: Balance,
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct NetworkFee {
  pub chain: Chain,
  pub transaction_size: u64,
  pub transaction_fee_rate: u64,
}

/// Gas spent in the current block for one asset.
#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct GasEntry {
  pub asset: Asset,
  pub amount: Balance,
  pub tx_count: u64,
}

/// A signing group the TSS pool is asked to generate a key for.
#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct Keygen {
  pub members: Vec<PubKey>,
  pub pool_pub_key: Option<PubKey>,
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo)]
pub struct TssVoter<AccountId> {
  pub pool_pub_key: PubKey,
  pub signers: Vec<AccountId>,
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct ThorNameAlias {
  pub chain: Chain,
  pub address: Address,
}

#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo)]
pub struct ThorName<AccountId> {
  pub name: Vec<u8>,
  pub expire_block_height: u64,
  pub owner: AccountId,
  pub preferred_asset: Option<Asset>,
  pub aliases: Vec<ThorNameAlias>,
}

impl<AccountId> ThorName<AccountId> {
  pub fn alias(&self, chain: Chain) -> Option<&Address> {
    self
      .aliases
      .iter()
      .find(|alias| alias.chain == chain)
      .map(|alias| &alias.address)
  }

  pub fn set_alias(&mut self, chain: Chain, address: Address) {
    match self.aliases.iter_mut().find(|alias| alias.chain == chain) {
      Some(alias) => alias.address = address,
      None => self.aliases.push(ThorNameAlias { chain, address }),
    }
  }
}

/// What a bond movement was for.
#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo,
)]
pub enum BondKind {
  #[default]
  Paid,
  Returned,
  Reward,
  Slashed,
}

/// Resume point of ragnarok liquidity withdrawals within a stage.
#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct RagnarokWithdrawPosition {
  pub nth: u64,
  pub pool: Option<Asset>,
  pub last_owner: Option<Address>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tx_id_hex_round_trip() {
    let id = H256::repeat_byte(0xab);
    let hex = tx_id_hex(&id);
    assert_eq!(hex.len(), 64);
    assert!(hex.starts_with(b"ABAB"));
    assert_eq!(parse_tx_id(&hex), Some(id));
    assert_eq!(parse_tx_id(b"0xabcd"), None);
    assert_eq!(parse_tx_id(&[b'z'; 64]), None);
  }

  #[test]
  fn gas_asset_pools_start_available() {
    assert_eq!(Pool::new(Chain::Btc.gas_asset(), 1).status, PoolStatus::Available);
    let token = primitives::Asset::new(Chain::Eth, "USDC-0XA0B8");
    assert_eq!(Pool::new(token, 1).status, PoolStatus::Staged);
  }

  #[test]
  fn synth_units_follow_supply() {
    let mut pool = Pool {
      balance_asset: 100,
      lp_units: 100,
      ..Default::default()
    };
    assert_eq!(pool.calc_synth_units(0), 100);
    // 100 * 50 / (200 - 50)
    assert_eq!(pool.calc_synth_units(50), 133);
    assert_eq!(pool.synth_units, 33);
  }

  #[test]
  fn vault_funds_bookkeeping() {
    let btc = Chain::Btc.gas_asset();
    let mut vault = Vault::default();
    vault.add_funds(&[Coin::new(btc.clone(), 10), Coin::new(btc.clone(), 5)]);
    assert_eq!(vault.coin_amount(&btc), 15);
    vault.sub_funds(&[Coin::new(btc.clone(), 20)]);
    assert_eq!(vault.coin_amount(&btc), 0);
    assert!(!vault.has_funds());
  }

  #[test]
  fn bond_providers_adjust_to_node_bond() {
    let mut bp = BondProviders::new(1u64, 0);
    bp.whitelist(1);
    bp.whitelist(2);
    bp.bond(&1, 300);
    bp.bond(&2, 100);
    bp.adjust(800);
    assert_eq!(bp.get(&1).map(|p| p.bond), Some(600));
    assert_eq!(bp.get(&2).map(|p| p.bond), Some(200));
    bp.adjust(801);
    assert_eq!(bp.total(), 801);
  }

  #[test]
  fn voter_outbound_height_never_decreases() {
    let mut voter = ObservedTxVoter::<u64>::new(H256::repeat_byte(1));
    voter.set_outbound_height(10);
    voter.set_outbound_height(4);
    assert_eq!(voter.outbound_height, 10);
  }

  #[test]
  fn voter_consensus_needs_two_thirds() {
    let tx = ObservedTx::default();
    let mut voter = ObservedTxVoter::<u64>::new(H256::zero());
    let active = [1u64, 2, 3];
    assert!(voter.add(tx.clone(), 1));
    assert!(!voter.add(tx.clone(), 1));
    assert!(voter.consensus(&active).is_none());
    voter.add(tx, 2);
    assert!(voter.consensus(&active).is_some());
  }
}
