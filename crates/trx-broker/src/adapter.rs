use std::sync::Arc;

use async_trait::async_trait;
use trx_schemas::OrderStatus;

use crate::error::BrokerError;
use crate::sink::ExecutionSink;
use crate::types::{AccountSnapshot, BrokerPosition, OrderRequest, OrderResponse};

/// A polymorphic capability set for a trading venue (spec §4.1). `PAPER` is
/// implemented by `trx-broker-paper`; `MT5` and `REST` are reserved slots —
/// this trait is the contract any future adapter must satisfy.
///
/// Every method is async: all of them cross a suspension point (network IO,
/// or a simulated sleep in the paper adapter — spec §5 "suspension points").
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// Establishes the venue session. Idempotent: calling `connect` on an
    /// already-connected adapter is a no-op success.
    async fn connect(&self) -> Result<(), BrokerError>;

    /// Releases session resources on every path (scoped acquisition) —
    /// callers should invoke this from a `Drop` guard or an explicit
    /// `finally`-style block, never only on the happy path.
    async fn disconnect(&self) -> Result<(), BrokerError>;

    /// Fetches account state; also usable as a connectivity heartbeat.
    async fn validate_account(&self) -> Result<AccountSnapshot, BrokerError>;

    async fn place_order(&self, request: OrderRequest) -> Result<OrderResponse, BrokerError>;

    /// Fails with [`BrokerError::AlreadyTerminal`] if the order is already
    /// in a terminal status.
    async fn cancel_order(&self, broker_order_id: &str) -> Result<(), BrokerError>;

    async fn get_order_status(&self, broker_order_id: &str) -> Result<OrderStatus, BrokerError>;

    async fn get_open_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError>;

    async fn close_position(&self, broker_position_id: &str) -> Result<(), BrokerError>;

    /// Registers a sink that receives execution reports asynchronously as
    /// they arrive. Adapters that deliver fills inline via `place_order`
    /// (rather than only through this sink) must still honor per-order
    /// delivery ordering.
    async fn subscribe_executions(&self, sink: Arc<dyn ExecutionSink>);
}
