//! Message handlers
//!
//! One handler per message kind. Handlers run inside the dispatcher's storage
//! layer, so returning an error discards every write they made and the inbound
//! is refunded instead.

pub mod add_liquidity;
pub mod bond;
pub mod donate;
pub mod misc;
pub mod outbound;
pub mod swap;
pub mod withdraw;

use frame::prelude::*;

use crate::{
  pallet::{Config, Pallet},
  types::{Asset, ModuleName, Tx, coin_amount},
};

impl<T: Config> Pallet<T> {
  /// Native rune sent along with a bond-side message that moves no rune
  /// itself ends up in the reserve.
  pub(crate) fn collect_dust(tx: &Tx) -> DispatchResult {
    let dust = coin_amount(&tx.coins, &Asset::native_rune());
    Self::send_from_module_to_module(
      ModuleName::Asgard,
      ModuleName::Reserve,
      &Asset::native_rune(),
      dust,
    )
  }
}
