//! The orchestrator holds brokers as `Arc<dyn BrokerAdapter>`; this exercises
//! that the trait is object-safe and that a trivial mock satisfies it end to
//! end, including sink delivery.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;
use trx_broker::{
    AccountSnapshot, BrokerAdapter, BrokerError, BrokerPosition, ExecutionReport, ExecutionSink,
    OrderRequest, OrderResponse,
};
use trx_schemas::{OrderStatus, OrderType, Side};

struct MockBroker;

#[async_trait]
impl BrokerAdapter for MockBroker {
    async fn connect(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn validate_account(&self) -> Result<AccountSnapshot, BrokerError> {
        Ok(AccountSnapshot {
            account_id: "acct-1".into(),
            balance: dec!(10_000),
            equity: dec!(10_000),
            margin: dec!(0),
            free_margin: dec!(10_000),
            margin_level: dec!(0),
        })
    }

    async fn place_order(&self, request: OrderRequest) -> Result<OrderResponse, BrokerError> {
        Ok(OrderResponse {
            broker_order_id: format!("mock-{}", request.symbol),
            status: OrderStatus::Filled,
            filled_price: request.price,
            filled_size: Some(request.size),
            timestamp: Utc::now(),
        })
    }

    async fn cancel_order(&self, _broker_order_id: &str) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn get_order_status(&self, _broker_order_id: &str) -> Result<OrderStatus, BrokerError> {
        Ok(OrderStatus::Filled)
    }

    async fn get_open_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
        Ok(vec![])
    }

    async fn close_position(&self, _broker_position_id: &str) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn subscribe_executions(&self, sink: Arc<dyn ExecutionSink>) {
        sink.on_execution(ExecutionReport {
            broker_order_id: "mock-order".into(),
            execution_id: "exec-1".into(),
            filled_price: dec!(2000.00),
            filled_size: dec!(0.10),
            slippage: dec!(0.00),
            timestamp: Utc::now(),
        })
        .await;
    }
}

#[tokio::test]
async fn mock_broker_satisfies_the_trait_as_a_trait_object() {
    let broker: Arc<dyn BrokerAdapter> = Arc::new(MockBroker);
    broker.connect().await.unwrap();

    let snapshot = broker.validate_account().await.unwrap();
    assert_eq!(snapshot.balance, dec!(10_000));

    let response = broker
        .place_order(OrderRequest {
            symbol: "XAUUSD".into(),
            side: Side::Buy,
            size: dec!(0.10),
            order_type: OrderType::Market,
            price: None,
            stop_loss: Some(dec!(1990.00)),
            take_profit: Some(dec!(2020.00)),
        })
        .await
        .unwrap();
    assert_eq!(response.status, OrderStatus::Filled);

    let seen = Arc::new(AtomicUsize::new(0));
    let seen_clone = Arc::clone(&seen);
    let sink = Arc::new(trx_broker::FnSink(move |_report: ExecutionReport| {
        seen_clone.fetch_add(1, Ordering::SeqCst);
    }));
    broker.subscribe_executions(sink).await;
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
