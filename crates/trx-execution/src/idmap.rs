//! Broker-order-id index (spec §4.4).
//!
//! `ExecutionReport` carries only a `broker_order_id` and an opaque
//! `execution_id` — no `trade_id`. Something has to remember which trade and
//! which leg (entry/SL/TP) a given broker order belongs to before a fill can
//! be routed anywhere. Grounded on the same idea as a broker-order map: a
//! plain in-memory table with an explicit register/lookup/deregister
//! lifecycle, synchronization left to the caller — except here the owner is
//! `Mutex`-wrapped up front since fills arrive concurrently across trades.

use std::collections::HashMap;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Which leg of a trade a broker order represents. Bracket legs are placed
/// together and need to know about each other to support sibling-cancel on
/// trigger (spec §4.6).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OrderRole {
    Entry,
    StopLoss,
    TakeProfit,
}

#[derive(Clone, Debug)]
pub struct OrderIndexEntry {
    pub order_id: Uuid,
    pub trade_id: Uuid,
    pub requested_size: Decimal,
    pub role: OrderRole,
}

/// Maps `broker_order_id -> (order_id, trade_id, role)`. Never fabricates a
/// missing entry: a lookup miss means "unknown order," which callers must
/// treat as a log-and-drop, not a guess (spec §4.9).
#[derive(Default)]
pub struct OrderIndex {
    entries: Mutex<HashMap<String, OrderIndexEntry>>,
}

impl OrderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, broker_order_id: String, entry: OrderIndexEntry) {
        self.entries.lock().insert(broker_order_id, entry);
    }

    pub fn lookup(&self, broker_order_id: &str) -> Option<OrderIndexEntry> {
        self.entries.lock().get(broker_order_id).cloned()
    }

    pub fn deregister(&self, broker_order_id: &str) {
        self.entries.lock().remove(broker_order_id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(trade_id: Uuid) -> OrderIndexEntry {
        OrderIndexEntry { order_id: Uuid::new_v4(), trade_id, requested_size: Decimal::ONE, role: OrderRole::Entry }
    }

    #[test]
    fn register_then_lookup_round_trips() {
        let idx = OrderIndex::new();
        let trade_id = Uuid::new_v4();
        idx.register("bo-1".into(), entry(trade_id));
        assert_eq!(idx.lookup("bo-1").unwrap().trade_id, trade_id);
    }

    #[test]
    fn unknown_broker_order_id_is_none_not_a_guess() {
        let idx = OrderIndex::new();
        assert!(idx.lookup("does-not-exist").is_none());
    }

    #[test]
    fn deregister_removes_the_entry() {
        let idx = OrderIndex::new();
        idx.register("bo-1".into(), entry(Uuid::new_v4()));
        idx.deregister("bo-1");
        assert!(idx.is_empty());
    }
}
