use frame::prelude::*;

use crate::{
  messages::MsgDonate,
  pallet::{Config, Error, Event, Pallet, Pools},
  types::PoolStatus,
};

impl<T: Config> Pallet<T> {
  pub fn handle_donate(m: MsgDonate) -> DispatchResult {
    let mut pool = Self::get_pool(&m.asset)?;
    ensure!(pool.status != PoolStatus::Suspended, Error::<T>::PoolNotAvailable);
    pool.balance_rune = pool.balance_rune.saturating_add(m.rune_amount);
    pool.balance_asset = pool.balance_asset.saturating_add(m.asset_amount);
    Pools::<T>::insert(&m.asset, &pool);
    Self::deposit_event(Event::Donate {
      pool: m.asset,
      in_tx: m.tx,
    });
    Ok(())
  }
}
