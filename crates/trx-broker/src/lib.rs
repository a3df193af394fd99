//! trx-broker
//!
//! The broker-adapter abstraction (spec §4.1): a venue-agnostic trait plus
//! the wire contract (spec §6) every implementation exchanges. `PAPER` is
//! implemented in `trx-broker-paper`; `MT5`/`REST` are reserved slots that
//! satisfy this same trait.

mod adapter;
mod error;
mod sink;
mod types;

pub use adapter::BrokerAdapter;
pub use error::BrokerError;
pub use sink::{ExecutionSink, FnSink};
pub use types::{AccountSnapshot, BrokerPosition, ExecutionReport, OrderRequest, OrderResponse};
