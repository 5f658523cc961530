//! Adapter traits for the settlement pallet
//!
//! The pallet never touches balances or address formats directly. Module balances
//! (native rune, synths and derived assets) go through [`BankOps`]; translating
//! between native accounts, their string addresses and per-chain vault addresses
//! goes through [`AddressCodec`].

use frame::prelude::*;

use crate::types::{Address, Asset, Balance, Chain};

/// Balances of native assets held by accounts and module accounts.
pub trait BankOps<AccountId> {
  fn transfer(
    from: &AccountId,
    to: &AccountId,
    asset: &Asset,
    amount: Balance,
  ) -> Result<(), DispatchError>;

  fn mint(to: &AccountId, asset: &Asset, amount: Balance) -> Result<(), DispatchError>;

  fn burn(from: &AccountId, asset: &Asset, amount: Balance) -> Result<(), DispatchError>;

  fn balance(who: &AccountId, asset: &Asset) -> Balance;

  fn total_supply(asset: &Asset) -> Balance;
}

/// Native and external address translation.
pub trait AddressCodec<AccountId> {
  /// String address of a native account.
  fn encode(who: &AccountId) -> Address;

  /// Native account behind a string address, if it is one.
  fn decode(address: &[u8]) -> Option<AccountId>;

  /// Address a vault public key controls on `chain`.
  fn vault_address(pub_key: &[u8], chain: Chain) -> Address;
}

/// No-op `BankOps`: every transfer succeeds and nothing is held.
impl<AccountId> BankOps<AccountId> for () {
  fn transfer(_: &AccountId, _: &AccountId, _: &Asset, _: Balance) -> Result<(), DispatchError> {
    Ok(())
  }

  fn mint(_: &AccountId, _: &Asset, _: Balance) -> Result<(), DispatchError> {
    Ok(())
  }

  fn burn(_: &AccountId, _: &Asset, _: Balance) -> Result<(), DispatchError> {
    Ok(())
  }

  fn balance(_: &AccountId, _: &Asset) -> Balance {
    0
  }

  fn total_supply(_: &Asset) -> Balance {
    0
  }
}
