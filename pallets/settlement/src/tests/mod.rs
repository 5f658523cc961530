mod liquidity;
mod node;
mod observation;
mod outbound;
mod pools;

use alloc::vec::Vec;

use crate::{Error, Event, mock::*};
use polkadot_sdk::sp_runtime::DispatchError;

/// Reason of the last refund issued, if any.
pub fn last_refund_reason() -> Option<Vec<u8>> {
  settlement_events().into_iter().rev().find_map(|event| match event {
    Event::Refund { reason, .. } => Some(reason),
    _ => None,
  })
}

/// Refund code an inbound rejected with `err` is reported with.
pub fn refund_code_of(err: Error<Test>) -> u32 {
  match DispatchError::from(err) {
    DispatchError::Module(module) => u32::from(module.error[0]) + 100,
    _ => unreachable!(),
  }
}
