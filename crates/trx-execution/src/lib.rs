//! trx-execution
//!
//! Deterministic trade execution engine for a single-instrument forex/metals
//! pipeline (spec §1): turns a risk-validated `Signal` into a monitored trade,
//! places entry and bracket orders through a `BrokerAdapter`, tracks fills,
//! and drives closure. Every externally visible state change is append-only
//! audited (`trx-audit`) and persisted (`trx-db`) before it is reported back.

pub mod closure;
pub mod error;
pub mod fsm;
pub mod idmap;
pub mod order_manager;
pub mod orchestrator;
pub mod position_manager;
pub mod risk_ledger;
pub mod sltp_manager;

pub use closure::ClosureService;
pub use error::ExecutionError;
pub use idmap::{OrderIndex, OrderIndexEntry, OrderRole};
pub use order_manager::{FillOutcome, OrderManager};
pub use orchestrator::{ExecutionErrorInfo, ExecutionOrchestrator, ExecutionStats, ProcessSignalOutcome};
pub use position_manager::PositionManager;
pub use risk_ledger::{NoopRiskLedgerSink, RiskLedgerSink};
pub use sltp_manager::{BracketTrigger, SlTpManager};
