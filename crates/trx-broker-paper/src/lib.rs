//! trx-broker-paper
//!
//! The reference `BrokerAdapter` implementation (spec §4.1 "Paper adapter
//! semantics"): an in-process simulator other adapters must behave like
//! under test. No live venue, no network IO — every suspension point is a
//! `tokio::time::sleep` standing in for one.

mod types;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};
use trx_broker::{
    AccountSnapshot, BrokerAdapter, BrokerError, BrokerPosition, ExecutionReport, ExecutionSink,
    OrderRequest, OrderResponse,
};
use trx_config::{FillRule, PaperBrokerConfig};
use trx_schemas::{OrderStatus, Side};
use uuid::Uuid;

use types::{OrderRecord, PositionRecord};

fn round5(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(5, RoundingStrategy::MidpointAwayFromZero)
}

fn round2(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn bps(value: Decimal, price: Decimal) -> Decimal {
    value * price / Decimal::from(10_000)
}

struct AccountState {
    account_id: String,
    balance: Decimal,
}

/// In-memory paper-trading adapter. `mock_mid_price` stands in for a real
/// market-data feed: callers seed it (`set_mock_mid_price`) and the adapter
/// derives every fill from it plus the configured spread/slippage model.
pub struct PaperBroker {
    config: PaperBrokerConfig,
    connected: AtomicBool,
    account: Mutex<AccountState>,
    mock_mid_price: Mutex<Decimal>,
    orders: Mutex<HashMap<String, OrderRecord>>,
    positions: Mutex<HashMap<String, PositionRecord>>,
    sink: Mutex<Option<Arc<dyn ExecutionSink>>>,
    next_position_seq: AtomicU64,
    /// Market orders awaiting the next `advance_candle` call — only
    /// populated under `FillRule::NextCandleOpen` (spec §4.1).
    pending_candle_orders: Mutex<Vec<(String, OrderRequest)>>,
}

impl PaperBroker {
    pub fn new(config: PaperBrokerConfig, account_id: impl Into<String>, initial_balance: Decimal) -> Self {
        Self {
            config,
            connected: AtomicBool::new(false),
            account: Mutex::new(AccountState { account_id: account_id.into(), balance: initial_balance }),
            mock_mid_price: Mutex::new(Decimal::ZERO),
            orders: Mutex::new(HashMap::new()),
            positions: Mutex::new(HashMap::new()),
            sink: Mutex::new(None),
            next_position_seq: AtomicU64::new(0),
            pending_candle_orders: Mutex::new(Vec::new()),
        }
    }

    /// Seeds the reference price `place_order` derives fills from. Stands in
    /// for a live quote feed.
    pub fn set_mock_mid_price(&self, price: Decimal) {
        *self.mock_mid_price.lock() = price;
    }

    fn require_connected(&self) -> Result<(), BrokerError> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(BrokerError::Connection("not connected".into()))
        }
    }

    fn reference_price(&self, request: &OrderRequest) -> Decimal {
        request.price.unwrap_or_else(|| *self.mock_mid_price.lock())
    }

    /// Applies the configured spread adversely to the trader: BUY pays ask,
    /// SELL receives bid (spec §4.1).
    fn quote_for_side(&self, base: Decimal, side: Side) -> Decimal {
        if !self.config.spread_simulation {
            return base;
        }
        let half_spread = bps(self.config.spread_bps, base) / Decimal::TWO;
        match side {
            Side::Buy => base + half_spread,
            Side::Sell => base - half_spread,
        }
    }

    /// Uniform slippage in `[0, max_slippage_bps * price / 10_000]`, applied
    /// adversely (spec §4.1).
    fn apply_slippage(&self, quoted: Decimal, side: Side) -> Decimal {
        if !self.config.slippage_enabled {
            return quoted;
        }
        let cap = bps(self.config.max_slippage_bps, quoted).to_f64().unwrap_or(0.0).max(0.0);
        let drawn = rand::thread_rng().gen_range(0.0..=cap);
        let slippage = Decimal::try_from(drawn).unwrap_or(Decimal::ZERO);
        match side {
            Side::Buy => quoted + slippage,
            Side::Sell => quoted - slippage,
        }
    }

    fn roll_bernoulli(&self, probability: Decimal) -> bool {
        let p = probability.to_f64().unwrap_or(0.0).clamp(0.0, 1.0);
        rand::thread_rng().gen_bool(p)
    }

    fn fill_size(&self, requested: Decimal) -> Decimal {
        if self.config.partial_fills_enabled && self.roll_bernoulli(self.config.partial_fill_probability) {
            let requested_f64 = requested.to_f64().unwrap_or(0.0);
            let fraction = rand::thread_rng().gen_range(0.5..=1.0);
            round2(Decimal::try_from(requested_f64 * fraction).unwrap_or(requested))
        } else {
            round2(requested)
        }
    }

    fn upsert_position(&self, symbol: &str, side: Side, size: Decimal, price: Decimal) {
        let mut positions = self.positions.lock();
        match positions.get_mut(symbol) {
            Some(existing) if existing.side == side => {
                let total = existing.size + size;
                existing.avg_entry_price = (existing.avg_entry_price * existing.size + price * size) / total;
                existing.size = total;
            }
            _ => {
                let seq = self.next_position_seq.fetch_add(1, Ordering::Relaxed);
                positions.insert(
                    symbol.to_string(),
                    PositionRecord {
                        broker_position_id: format!("paper-pos-{seq}"),
                        symbol: symbol.to_string(),
                        side,
                        size,
                        avg_entry_price: price,
                    },
                );
            }
        }
    }

    fn dispatch_fill(&self, report: ExecutionReport) {
        let sink = self.sink.lock().clone();
        let Some(sink) = sink else { return };
        let delay = self.dispatch_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.on_execution(report).await;
        });
    }

    /// Inline wait before an order is considered placed. Under
    /// `REALISTIC_DELAY` this is drawn from `[latency_ms, latency_ms * 3]`
    /// rather than fixed, so tests can't rely on a constant round-trip time
    /// (spec §3).
    fn dispatch_delay(&self) -> Duration {
        match self.config.fill_rule {
            FillRule::RealisticDelay => {
                let lo = self.config.latency_ms;
                let hi = lo.saturating_mul(3).max(lo);
                Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
            }
            FillRule::Immediate | FillRule::NextCandleOpen => Duration::from_millis(self.config.latency_ms),
        }
    }

    /// Resolves one order against `base_price`, records it, and returns the
    /// response plus the execution report to dispatch. Shared by the
    /// immediate path and `advance_candle` (spec §4.1).
    fn resolve_fill(&self, broker_order_id: String, request: &OrderRequest, base_price: Decimal) -> (OrderResponse, ExecutionReport) {
        let quoted = self.quote_for_side(base_price, request.side);
        let fill_price = round5(self.apply_slippage(quoted, request.side));
        let filled_size = self.fill_size(request.size);
        let status = if filled_size < request.size { OrderStatus::PartiallyFilled } else { OrderStatus::Filled };

        self.orders.lock().insert(
            broker_order_id.clone(),
            OrderRecord {
                broker_order_id: broker_order_id.clone(),
                symbol: request.symbol.clone(),
                side: request.side,
                requested_size: request.size,
                filled_size,
                status,
                created_at: Utc::now(),
            },
        );
        self.upsert_position(&request.symbol, request.side, filled_size, fill_price);

        let slippage = (fill_price - base_price).abs();
        let report = ExecutionReport {
            broker_order_id: broker_order_id.clone(),
            execution_id: Uuid::new_v4().to_string(),
            filled_price: fill_price,
            filled_size,
            slippage,
            timestamp: Utc::now(),
        };
        let response = OrderResponse {
            broker_order_id,
            status,
            filled_price: Some(fill_price),
            filled_size: Some(filled_size),
            timestamp: Utc::now(),
        };
        (response, report)
    }

    /// Resolves every market order queued since the last call against
    /// `open_price` — the `NEXT_CANDLE_OPEN` fill rule (spec §3, §4.1).
    /// Orders placed under any other `fill_rule` never reach this queue.
    pub async fn advance_candle(&self, open_price: Decimal) {
        let queued = std::mem::take(&mut *self.pending_candle_orders.lock());
        for (broker_order_id, request) in queued {
            let (_, report) = self.resolve_fill(broker_order_id, &request, open_price);
            self.dispatch_fill(report);
        }
    }
}

#[async_trait]
impl BrokerAdapter for PaperBroker {
    async fn connect(&self) -> Result<(), BrokerError> {
        tokio::time::sleep(Duration::from_millis(rand::thread_rng().gen_range(5..=25))).await;
        self.connected.store(true, Ordering::Release);
        debug!("paper broker connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.connected.store(false, Ordering::Release);
        *self.sink.lock() = None;
        Ok(())
    }

    async fn validate_account(&self) -> Result<AccountSnapshot, BrokerError> {
        self.require_connected()?;
        let account = self.account.lock();
        let margin_used: Decimal = self
            .positions
            .lock()
            .values()
            .map(|p| p.size * p.avg_entry_price)
            .sum();
        Ok(AccountSnapshot {
            account_id: account.account_id.clone(),
            balance: account.balance,
            equity: account.balance,
            margin: margin_used,
            free_margin: account.balance - margin_used,
            margin_level: if margin_used.is_zero() { Decimal::ZERO } else { account.balance / margin_used },
        })
    }

    async fn place_order(&self, request: OrderRequest) -> Result<OrderResponse, BrokerError> {
        self.require_connected()?;
        let broker_order_id = Uuid::new_v4().to_string();

        if self.roll_bernoulli(self.config.rejection_rate) {
            self.orders.lock().insert(
                broker_order_id.clone(),
                OrderRecord {
                    broker_order_id: broker_order_id.clone(),
                    symbol: request.symbol.clone(),
                    side: request.side,
                    requested_size: request.size,
                    filled_size: Decimal::ZERO,
                    status: OrderStatus::Rejected,
                    created_at: Utc::now(),
                },
            );
            warn!(symbol = %request.symbol, "paper broker rejected order");
            return Ok(OrderResponse {
                broker_order_id,
                status: OrderStatus::Rejected,
                filled_price: None,
                filled_size: None,
                timestamp: Utc::now(),
            });
        }

        tokio::time::sleep(self.dispatch_delay()).await;

        if self.config.fill_rule == FillRule::NextCandleOpen && request.order_type == trx_schemas::OrderType::Market {
            self.orders.lock().insert(
                broker_order_id.clone(),
                OrderRecord {
                    broker_order_id: broker_order_id.clone(),
                    symbol: request.symbol.clone(),
                    side: request.side,
                    requested_size: request.size,
                    filled_size: Decimal::ZERO,
                    status: OrderStatus::Pending,
                    created_at: Utc::now(),
                },
            );
            self.pending_candle_orders.lock().push((broker_order_id.clone(), request));
            return Ok(OrderResponse {
                broker_order_id,
                status: OrderStatus::Pending,
                filled_price: None,
                filled_size: None,
                timestamp: Utc::now(),
            });
        }

        let base = self.reference_price(&request);
        let (response, report) = self.resolve_fill(broker_order_id, &request, base);
        self.dispatch_fill(report);
        Ok(response)
    }

    async fn cancel_order(&self, broker_order_id: &str) -> Result<(), BrokerError> {
        let mut orders = self.orders.lock();
        let order = orders
            .get_mut(broker_order_id)
            .ok_or_else(|| BrokerError::NotFound(broker_order_id.to_string()))?;
        if order.is_terminal() {
            return Err(BrokerError::AlreadyTerminal(broker_order_id.to_string()));
        }
        order.status = OrderStatus::Cancelled;
        Ok(())
    }

    async fn get_order_status(&self, broker_order_id: &str) -> Result<OrderStatus, BrokerError> {
        self.orders
            .lock()
            .get(broker_order_id)
            .map(|o| o.status)
            .ok_or_else(|| BrokerError::NotFound(broker_order_id.to_string()))
    }

    async fn get_open_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
        Ok(self
            .positions
            .lock()
            .values()
            .map(|p| BrokerPosition {
                broker_position_id: p.broker_position_id.clone(),
                symbol: p.symbol.clone(),
                side: p.side,
                size: p.size,
                avg_entry_price: p.avg_entry_price,
            })
            .collect())
    }

    async fn close_position(&self, broker_position_id: &str) -> Result<(), BrokerError> {
        let mut positions = self.positions.lock();
        let symbol = positions
            .iter()
            .find(|(_, p)| p.broker_position_id == broker_position_id)
            .map(|(symbol, _)| symbol.clone())
            .ok_or_else(|| BrokerError::NotFound(broker_position_id.to_string()))?;
        positions.remove(&symbol);
        Ok(())
    }

    async fn subscribe_executions(&self, sink: Arc<dyn ExecutionSink>) {
        *self.sink.lock() = Some(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;
    use trx_broker::FnSink;
    use trx_schemas::OrderType;

    fn broker() -> PaperBroker {
        let mut cfg = PaperBrokerConfig::default();
        cfg.rejection_rate = Decimal::ZERO;
        cfg.latency_ms = 1;
        cfg.partial_fills_enabled = false;
        let b = PaperBroker::new(cfg, "paper-1", dec!(10_000));
        b.set_mock_mid_price(dec!(2000.00));
        b
    }

    fn market_buy() -> OrderRequest {
        OrderRequest {
            symbol: "XAUUSD".into(),
            side: Side::Buy,
            size: dec!(0.10),
            order_type: OrderType::Market,
            price: None,
            stop_loss: Some(dec!(1990.00)),
            take_profit: Some(dec!(2020.00)),
        }
    }

    #[tokio::test]
    async fn connect_then_validate_account_succeeds() {
        let b = broker();
        b.connect().await.unwrap();
        let snap = b.validate_account().await.unwrap();
        assert_eq!(snap.balance, dec!(10_000));
    }

    #[tokio::test]
    async fn validate_account_before_connect_fails() {
        let b = broker();
        assert!(matches!(b.validate_account().await, Err(BrokerError::Connection(_))));
    }

    #[tokio::test]
    async fn place_order_fills_and_pays_the_ask_on_buy() {
        let b = broker();
        b.connect().await.unwrap();
        let response = b.place_order(market_buy()).await.unwrap();
        assert_eq!(response.status, OrderStatus::Filled);
        // spread/slippage only ever move the BUY price up from the mid.
        assert!(response.filled_price.unwrap() >= dec!(2000.00));
        assert_eq!(response.filled_size, Some(dec!(0.10)));
    }

    #[tokio::test]
    async fn rejection_rate_one_always_rejects_without_a_fill() {
        let mut cfg = PaperBrokerConfig::default();
        cfg.rejection_rate = Decimal::ONE;
        let b = PaperBroker::new(cfg, "paper-1", dec!(10_000));
        b.set_mock_mid_price(dec!(2000.00));
        b.connect().await.unwrap();
        let response = b.place_order(market_buy()).await.unwrap();
        assert_eq!(response.status, OrderStatus::Rejected);
        assert!(response.filled_price.is_none());
    }

    #[tokio::test]
    async fn fill_is_dispatched_to_the_subscribed_sink() {
        let b = broker();
        b.connect().await.unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        b.subscribe_executions(Arc::new(FnSink(move |_report: ExecutionReport| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        })))
        .await;
        b.place_order(market_buy()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_on_a_filled_order_fails_as_already_terminal() {
        let b = broker();
        b.connect().await.unwrap();
        let response = b.place_order(market_buy()).await.unwrap();
        let result = b.cancel_order(&response.broker_order_id).await;
        assert!(matches!(result, Err(BrokerError::AlreadyTerminal(_))));
    }

    #[tokio::test]
    async fn cancel_on_unknown_order_id_fails_as_not_found() {
        let b = broker();
        b.connect().await.unwrap();
        assert!(matches!(b.cancel_order("does-not-exist").await, Err(BrokerError::NotFound(_))));
    }

    #[tokio::test]
    async fn open_positions_reflects_fills() {
        let b = broker();
        b.connect().await.unwrap();
        b.place_order(market_buy()).await.unwrap();
        let positions = b.get_open_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].symbol, "XAUUSD");
    }

    #[tokio::test]
    async fn next_candle_open_defers_the_fill_until_advance_candle() {
        let mut cfg = PaperBrokerConfig::default();
        cfg.rejection_rate = Decimal::ZERO;
        cfg.latency_ms = 1;
        cfg.partial_fills_enabled = false;
        cfg.spread_simulation = false;
        cfg.slippage_enabled = false;
        cfg.fill_rule = FillRule::NextCandleOpen;
        let b = PaperBroker::new(cfg, "paper-1", dec!(10_000));
        b.set_mock_mid_price(dec!(2000.00));

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        b.connect().await.unwrap();
        b.subscribe_executions(Arc::new(FnSink(move |_report: ExecutionReport| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        })))
        .await;

        let response = b.place_order(market_buy()).await.unwrap();
        assert_eq!(response.status, OrderStatus::Pending);
        assert!(response.filled_price.is_none());
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        b.advance_candle(dec!(2010.00)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_position_removes_it() {
        let b = broker();
        b.connect().await.unwrap();
        b.place_order(market_buy()).await.unwrap();
        let id = b.get_open_positions().await.unwrap()[0].broker_position_id.clone();
        b.close_position(&id).await.unwrap();
        assert!(b.get_open_positions().await.unwrap().is_empty());
    }
}
