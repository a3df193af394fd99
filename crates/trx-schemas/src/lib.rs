//! trx-schemas
//!
//! Shared data model for the execution engine (spec §3). Every type here is a
//! plain record: no IO, no persistence, no broker wiring. Other crates
//! (`trx-db`, `trx-risk`, `trx-execution`, ...) build behavior around these
//! shapes; this crate only owns invariant checks cheap enough to run
//! in-process (range checks, side/price agreement) — anything requiring a
//! balance lookup or a broker round-trip lives in `trx-risk` / `trx-execution`.

mod common;
mod event;
mod execution;
mod order;
mod position;
mod signal;
mod trade;

pub use common::Side;
pub use event::{EventType, TradeEvent};
pub use execution::Execution;
pub use order::{ExecutionOrder, OrderStatus, OrderType};
pub use position::Position;
pub use signal::Signal;
pub use trade::{CloseReason, ExecutionMode, ExecutionTrade, TradeStatus};
