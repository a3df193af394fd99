//! Execution Orchestrator (spec §4.8): the only entry point that drives a
//! signal through validation, order placement, and — asynchronously, as
//! fills arrive — through fill tracking, position open, bracket placement,
//! and closure. Per-trade ordering is preserved by routing every
//! `ExecutionReport` through a bounded, trade-owned queue (spec §9) rather
//! than processing it inline on whatever task the adapter delivered it on.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex as SyncMutex;
use serde_json::json;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::{error, warn};
use trx_audit::{AuditWriter, StageAuditRecord};
use trx_broker::{BrokerAdapter, ExecutionReport, ExecutionSink};
use trx_config::{ErrorCategory, RetryConfig};
use trx_retry::{execute_with_retry, CircuitBreaker, CircuitBreakerRegistry, RetryError};
use trx_schemas::{CloseReason, ExecutionMode, ExecutionTrade, Position, TradeEvent, TradeStatus};
use uuid::Uuid;

use crate::closure::ClosureService;
use crate::error::ExecutionError;
use crate::fsm;
use crate::idmap::OrderRole;
use crate::order_manager::OrderManager;
use crate::position_manager::PositionManager;
use crate::risk_ledger::RiskLedgerSink;
use crate::sltp_manager::SlTpManager;

const BROKER_ENDPOINT: &str = "broker";

/// Converts the YAML-loadable config shape to `trx-risk`'s plain-Copy
/// validator input. Two types instead of one `impl From` because the
/// orphan rule forbids implementing a foreign trait for two foreign types —
/// this free function is the seam (documented in DESIGN.md).
fn to_risk_limits(cfg: &trx_config::RiskLimitsConfig) -> trx_risk::RiskLimitsConfig {
    trx_risk::RiskLimitsConfig {
        max_risk_per_trade: cfg.max_risk_per_trade,
        max_leverage: cfg.max_leverage,
        max_margin_usage: cfg.max_margin_usage,
        min_position_size: cfg.min_position_size,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionErrorInfo {
    pub kind: String,
    pub message: String,
    /// Admin-surface exit code (spec §6): 1 risk-rejected, 2 broker-rejected,
    /// 3 invariant-violation, 4 connectivity-fatal.
    pub exit_code: i32,
}

/// Discriminated result of `process_signal` (spec §7: explicit result
/// records instead of exceptions crossing the API boundary).
#[derive(Debug, Clone)]
pub struct ProcessSignalOutcome {
    pub success: bool,
    pub trade_id: Option<Uuid>,
    pub status: Option<TradeStatus>,
    pub error: Option<ExecutionErrorInfo>,
}

impl ProcessSignalOutcome {
    fn ok(trade_id: Uuid, status: TradeStatus) -> Self {
        Self { success: true, trade_id: Some(trade_id), status: Some(status), error: None }
    }

    fn err(trade_id: Option<Uuid>, kind: &str, exit_code: i32, message: impl Into<String>) -> Self {
        Self {
            success: false,
            trade_id,
            status: None,
            error: Some(ExecutionErrorInfo { kind: kind.to_string(), message: message.into(), exit_code }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionStats {
    pub open_trade_count: usize,
    pub open_position_count: usize,
}

pub struct ExecutionOrchestrator {
    pool: PgPool,
    broker: Arc<dyn BrokerAdapter>,
    order_manager: Arc<OrderManager>,
    position_manager: PositionManager,
    sltp_manager: SlTpManager,
    closure_service: ClosureService,
    risk_limits: trx_risk::RiskLimitsConfig,
    retry_cfg: RetryConfig,
    breaker: Arc<CircuitBreaker>,
    audit: SyncMutex<AuditWriter>,
    engine_id: Uuid,
    instrument: String,
    timeframe: String,
    execution_mode: ExecutionMode,
    queue_capacity: usize,
    reducers: SyncMutex<HashMap<Uuid, mpsc::Sender<ExecutionReport>>>,
}

impl ExecutionOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        broker: Arc<dyn BrokerAdapter>,
        risk_limits: trx_config::RiskLimitsConfig,
        retry_cfg: RetryConfig,
        audit: AuditWriter,
        engine_id: Uuid,
        instrument: String,
        timeframe: String,
        execution_mode: ExecutionMode,
        queue_capacity: usize,
        ledger: Arc<dyn RiskLedgerSink>,
    ) -> Arc<Self> {
        let order_manager = Arc::new(OrderManager::new(pool.clone(), Arc::clone(&broker)));
        let registry = CircuitBreakerRegistry::new();
        let breaker = registry.get_or_create(BROKER_ENDPOINT, &retry_cfg.circuit_breaker);
        Arc::new(Self {
            position_manager: PositionManager::new(pool.clone()),
            sltp_manager: SlTpManager::new(Arc::clone(&order_manager)),
            closure_service: ClosureService::new(pool.clone(), Arc::clone(&broker), ledger),
            risk_limits: to_risk_limits(&risk_limits),
            retry_cfg,
            breaker,
            audit: SyncMutex::new(audit),
            engine_id,
            instrument,
            timeframe,
            execution_mode,
            queue_capacity,
            reducers: SyncMutex::new(HashMap::new()),
            pool,
            broker,
            order_manager,
        })
    }

    /// Subscribes this orchestrator to the adapter's execution feed. Must be
    /// called once before `process_signal` (spec §4.8 step "subscribe to
    /// executions").
    pub async fn start(self: &Arc<Self>) {
        self.broker.subscribe_executions(Arc::new(OrchestratorSink(Arc::clone(self)))).await;
    }

    fn record_stage(&self, record: StageAuditRecord) {
        if let Err(e) = self.audit.lock().record_stage(self.engine_id, record) {
            error!(error = %e, "failed to append stage audit record");
        }
    }

    async fn ensure_connected(&self) -> Result<(), ExecutionError> {
        let broker = Arc::clone(&self.broker);
        execute_with_retry(ErrorCategory::Network, &self.retry_cfg, Some(&self.breaker), || {
            let broker = Arc::clone(&broker);
            async move { broker.connect().await }
        })
        .await
        .map_err(Self::retry_err_to_execution_err)
    }

    fn retry_err_to_execution_err(e: RetryError<trx_broker::BrokerError>) -> ExecutionError {
        match e {
            RetryError::CircuitOpen => ExecutionError::Broker(trx_broker::BrokerError::Connection(
                "circuit breaker open for broker endpoint".into(),
            )),
            RetryError::Exhausted { last, .. } => ExecutionError::Broker(last),
        }
    }

    /// Drives a signal through risk validation and order placement (spec
    /// §4.8). Fill tracking, position open, bracket placement and closure
    /// happen asynchronously afterward as `ExecutionReport`s arrive.
    pub async fn process_signal(&self, signal_id: Uuid) -> ProcessSignalOutcome {
        match self.process_signal_inner(signal_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.record_stage(StageAuditRecord::failed(signal_id, None, "PROCESS_SIGNAL", json!({}), e.to_string()));
                ProcessSignalOutcome::err(None, "PROCESS_SIGNAL_FAILED", e.exit_code(), e.to_string())
            }
        }
    }

    async fn process_signal_inner(&self, signal_id: Uuid) -> Result<ProcessSignalOutcome, ExecutionError> {
        let signal = trx_db::signals::fetch_signal(&self.pool, signal_id)
            .await?
            .ok_or(ExecutionError::SignalNotFound(signal_id))?;

        if let Some(existing) = trx_db::trades::fetch_trade_by_signal(&self.pool, signal_id).await? {
            return Ok(ProcessSignalOutcome::ok(existing.trade_id, existing.status));
        }

        self.ensure_connected().await?;
        let account = self.broker.validate_account().await?;

        let decision = trx_risk::validate(&signal, account.balance, &self.risk_limits);
        let (position_size, margin_required) = match decision {
            trx_risk::RiskDecision::Approved { position_size, margin_required } => (position_size, margin_required),
            trx_risk::RiskDecision::Rejected { violations, .. } => {
                let reason = violations.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(",");
                self.record_stage(StageAuditRecord::rejected(signal_id, "RISK_VALIDATION", json!({}), reason.clone()));
                return Ok(ProcessSignalOutcome::err(None, "RISK_REJECTED", 1, reason));
            }
        };

        let now = Utc::now();
        let trade_id = Uuid::new_v4();
        let risk_percent = signal.risk_fraction;
        let new_trade = ExecutionTrade {
            trade_id,
            signal_id,
            instrument: self.instrument.clone(),
            timeframe: self.timeframe.clone(),
            side: signal.direction,
            status: TradeStatus::New,
            entry_price: signal.entry_price,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            position_size,
            risk_percent,
            leverage: signal.leverage,
            rr_ratio: signal.rr_ratio,
            execution_mode: self.execution_mode,
            opened_at: None,
            closed_at: None,
            close_reason: None,
            created_at: now,
            updated_at: now,
        };
        let (trade, inserted) = trx_db::trades::create_trade(&self.pool, &new_trade).await?;
        if !inserted {
            // Lost the race to another concurrent `process_signal(signal_id)`
            // call (spec §8 scenario 8): the winner already owns this trade's
            // setup, so report its current state instead of appending a
            // second CREATED event and placing a duplicate entry order.
            return Ok(ProcessSignalOutcome::ok(trade.trade_id, trade.status));
        }
        self.append_event(trade.trade_id, trx_schemas::EventType::Created, None, TradeStatus::New, json!({"margin_required": margin_required.to_string()})).await?;
        self.record_stage(StageAuditRecord::succeeded(
            signal_id,
            trade.trade_id,
            "RISK_VALIDATION",
            json!({}),
            json!({"position_size": position_size.to_string(), "margin_required": margin_required.to_string()}),
        ));
        self.record_stage(StageAuditRecord::succeeded(signal_id, trade.trade_id, "CREATE_TRADE", json!({}), json!({"status": "NEW"})));

        self.transition(&trade, TradeStatus::Validated).await?;
        self.record_stage(StageAuditRecord::succeeded(signal_id, trade.trade_id, "VALIDATE", json!({}), json!({"status": "VALIDATED"})));
        let trade = ExecutionTrade { status: TradeStatus::Validated, ..trade };

        // A broker reject here — whether the placement call itself errors or
        // the order comes back REJECTED — leaves the trade in VALIDATED (spec
        // §4.4, §4.9 scenario 6): the REJECTED order row is already recorded
        // by `place_order_for`, and no later event arrives for it, so there is
        // nothing to close.
        let order = match self.order_manager.place_order_for(&trade).await {
            Ok(order) => order,
            Err(e) => {
                self.record_stage(StageAuditRecord::failed(signal_id, Some(trade.trade_id), "PLACE_ORDER", json!({}), e.to_string()));
                return Ok(ProcessSignalOutcome::err(Some(trade.trade_id), "BROKER_REJECTED", 2, e.to_string()));
            }
        };

        if order.status == trx_schemas::OrderStatus::Rejected {
            self.record_stage(StageAuditRecord::rejected(signal_id, "PLACE_ORDER", json!({}), "broker rejected the order at placement"));
            return Ok(ProcessSignalOutcome::err(Some(trade.trade_id), "BROKER_REJECTED", 2, "order rejected at placement"));
        }

        self.transition(&trade, TradeStatus::OrderPlaced).await?;
        self.record_stage(StageAuditRecord::succeeded(signal_id, trade.trade_id, "PLACE_ORDER", json!({}), json!({"status": "ORDER_PLACED", "order_id": order.order_id})));

        Ok(ProcessSignalOutcome::ok(trade.trade_id, TradeStatus::OrderPlaced))
    }

    async fn transition(&self, trade: &ExecutionTrade, to: TradeStatus) -> Result<(), ExecutionError> {
        let event_type = fsm::transition(trade.status, to)?;
        trx_db::trades::update_status(&self.pool, trade.trade_id, to, Utc::now()).await?;
        self.append_event(trade.trade_id, event_type, Some(trade.status), to, json!({})).await
    }

    async fn append_event(
        &self,
        trade_id: Uuid,
        event_type: trx_schemas::EventType,
        previous_status: Option<TradeStatus>,
        new_status: TradeStatus,
        metadata: serde_json::Value,
    ) -> Result<(), ExecutionError> {
        let event = TradeEvent { event_id: Uuid::new_v4(), trade_id, event_type, previous_status, new_status, metadata, created_at: Utc::now() };
        trx_db::events::append_event(&self.pool, &event).await?;
        Ok(())
    }

    fn get_or_spawn_reducer(self: &Arc<Self>, trade_id: Uuid) -> mpsc::Sender<ExecutionReport> {
        let mut reducers = self.reducers.lock();
        if let Some(tx) = reducers.get(&trade_id) {
            return tx.clone();
        }
        let (tx, mut rx) = mpsc::channel(self.queue_capacity);
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(report) = rx.recv().await {
                orchestrator.handle_fill(trade_id, report).await;
            }
        });
        reducers.insert(trade_id, tx.clone());
        tx
    }

    /// Entry point for fills delivered asynchronously through the adapter's
    /// execution sink (spec §9: bounded per-trade queue, drop-newest with
    /// alert on overflow).
    fn dispatch_async_fill(self: &Arc<Self>, report: ExecutionReport) {
        let Some(trade_id) = self.order_manager.peek_trade_id(&report.broker_order_id) else {
            warn!(broker_order_id = %report.broker_order_id, "execution report for unknown order, dropping");
            return;
        };
        let tx = self.get_or_spawn_reducer(trade_id);
        if let Err(e) = tx.try_send(report) {
            warn!(trade_id = %trade_id, error = %e, "trade execution queue full or closed, dropping newest report");
        }
    }

    async fn handle_fill(self: Arc<Self>, trade_id: Uuid, report: ExecutionReport) {
        let outcome = match self.order_manager.handle_execution(report).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(trade_id = %trade_id, error = %e, "failed to ingest execution report");
                return;
            }
        };
        let Some(outcome) = outcome else { return };

        let result = match outcome.role {
            OrderRole::Entry => self.on_entry_fill(trade_id, &outcome).await,
            OrderRole::StopLoss | OrderRole::TakeProfit => self.on_bracket_fill(trade_id, &outcome).await,
        };
        if let Err(e) = result {
            error!(trade_id = %trade_id, error = %e, "failed to process fill");
        }
    }

    async fn on_entry_fill(&self, trade_id: Uuid, outcome: &crate::order_manager::FillOutcome) -> Result<(), ExecutionError> {
        let trade = trx_db::trades::fetch_trade(&self.pool, trade_id)
            .await?
            .ok_or(ExecutionError::TradeNotFound(trade_id))?;

        if self.position_manager.has_position(trade_id).await? {
            self.position_manager.apply_fill(&trade, outcome.filled_price, outcome.filled_size).await?;
        } else {
            self.position_manager.open_position(&trade, outcome.filled_price, outcome.filled_size).await?;
        }

        let next_status = if outcome.fully_filled { TradeStatus::Filled } else { TradeStatus::PartiallyFilled };
        self.transition(&trade, next_status).await?;
        self.record_stage(StageAuditRecord::succeeded(
            trade.signal_id,
            trade.trade_id,
            "ORDER_FILL",
            json!({}),
            json!({"status": next_status.as_str(), "filled_size": outcome.filled_size.to_string()}),
        ));

        if !outcome.fully_filled {
            return Ok(());
        }

        let trade = ExecutionTrade { status: TradeStatus::Filled, ..trade };
        let position = self
            .position_manager
            .fetch(trade_id)
            .await?
            .ok_or_else(|| ExecutionError::DataIntegrity(format!("trade {trade_id} filled with no position")))?;

        trx_db::trades::mark_opened(&self.pool, trade_id, Utc::now()).await?;
        self.append_event(trade_id, trx_schemas::EventType::Opened, Some(TradeStatus::Filled), TradeStatus::Open, json!({})).await?;
        let trade = ExecutionTrade { status: TradeStatus::Open, opened_at: Some(Utc::now()), ..trade };

        self.sltp_manager.place(&trade, &position).await?;
        self.record_stage(StageAuditRecord::succeeded(trade.signal_id, trade.trade_id, "OPEN_POSITION", json!({}), json!({"status": "OPEN"})));
        Ok(())
    }

    async fn on_bracket_fill(&self, trade_id: Uuid, outcome: &crate::order_manager::FillOutcome) -> Result<(), ExecutionError> {
        let Some(trigger) = self.sltp_manager.trigger_for(trade_id, outcome.role) else {
            warn!(trade_id = %trade_id, "bracket fill with no registered sibling, ignoring");
            return Ok(());
        };

        if let Err(e) = self.order_manager.cancel_order(trigger.sibling_order_id).await {
            warn!(trade_id = %trade_id, error = %e, "failed to cancel sibling bracket order, flagging for reconciliation");
        }

        let trade = trx_db::trades::fetch_trade(&self.pool, trade_id)
            .await?
            .ok_or(ExecutionError::TradeNotFound(trade_id))?;
        let position = self.position_manager.fetch(trade_id).await?;

        self.closure_service
            .close(&trade, position.as_ref(), trigger.reason, outcome.filled_price, None)
            .await?;
        self.sltp_manager.forget(trade_id);
        self.record_stage(StageAuditRecord::succeeded(
            trade.signal_id,
            trade.trade_id,
            "CLOSE_TRADE",
            json!({}),
            json!({"reason": trigger.reason.as_str()}),
        ));
        Ok(())
    }

    /// User-initiated cancellation (spec §4.3, §4.9). A no-op on an
    /// already-terminal trade; if a broker cancel fails, the trade still
    /// closes but with reason ERROR and the caller is told to reconcile.
    pub async fn cancel_trade(&self, trade_id: Uuid) -> Result<(), ExecutionError> {
        let trade = trx_db::trades::fetch_trade(&self.pool, trade_id)
            .await?
            .ok_or(ExecutionError::TradeNotFound(trade_id))?;
        if trade.status.is_terminal() {
            return Ok(());
        }
        if !trade.status.is_cancellable() {
            return Err(ExecutionError::StateMachine { from: trade.status, to: TradeStatus::Closed });
        }

        let mut any_cancel_failed = false;
        for order in trx_db::orders::list_orders_for_trade(&self.pool, trade_id).await? {
            if order.can_transition() {
                if let Err(e) = self.order_manager.cancel_order(order.order_id).await {
                    warn!(order_id = %order.order_id, error = %e, "order cancel failed at venue");
                    any_cancel_failed = true;
                }
            }
        }

        let reason = if any_cancel_failed { CloseReason::Error } else { CloseReason::Manual };
        self.closure_service.close_without_position(&trade, reason).await?;

        if any_cancel_failed {
            return Err(ExecutionError::ReconciliationRequired(format!("cancel_trade: order cancel failed for trade {trade_id}")));
        }
        Ok(())
    }

    pub async fn get_execution_status(&self, trade_id: Uuid) -> Result<Option<ExecutionTrade>, ExecutionError> {
        Ok(trx_db::trades::fetch_trade(&self.pool, trade_id).await?)
    }

    pub async fn get_active_positions(&self) -> Result<Vec<Position>, ExecutionError> {
        self.position_manager.list_open().await
    }

    pub async fn get_execution_stats(&self) -> Result<ExecutionStats, ExecutionError> {
        let open_trades = trx_db::trades::list_open_trades(&self.pool).await?;
        let open_positions = self.position_manager.list_open().await?;
        Ok(ExecutionStats { open_trade_count: open_trades.len(), open_position_count: open_positions.len() })
    }
}

struct OrchestratorSink(Arc<ExecutionOrchestrator>);

#[async_trait]
impl ExecutionSink for OrchestratorSink {
    async fn on_execution(&self, report: ExecutionReport) {
        self.0.dispatch_async_fill(report);
    }
}
