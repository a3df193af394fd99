//! SL/TP Manager (spec §4.6): places the two bracket legs once a trade
//! opens, and on whichever leg fills first, cancels its sibling and hands
//! off to the Closure Service. If the sibling cancel fails at the venue,
//! the order is flagged for reconciliation rather than assumed cancelled.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use trx_schemas::{CloseReason, ExecutionTrade, Position};
use uuid::Uuid;

use crate::error::ExecutionError;
use crate::idmap::OrderRole;
use crate::order_manager::OrderManager;

#[derive(Clone, Copy)]
struct BracketPair {
    stop_loss_order_id: Uuid,
    take_profit_order_id: Uuid,
}

/// Outcome of a bracket leg filling: which reason the trade should close
/// with, and the sibling order still needing cancellation.
pub struct BracketTrigger {
    pub reason: CloseReason,
    pub sibling_order_id: Uuid,
}

pub struct SlTpManager {
    order_manager: Arc<OrderManager>,
    pairs: Mutex<HashMap<Uuid, BracketPair>>,
}

impl SlTpManager {
    pub fn new(order_manager: Arc<OrderManager>) -> Self {
        Self { order_manager, pairs: Mutex::new(HashMap::new()) }
    }

    /// Places both bracket legs for a just-opened position (spec §4.6).
    pub async fn place(&self, trade: &ExecutionTrade, position: &Position) -> Result<(), ExecutionError> {
        let sl_order = self
            .order_manager
            .place_bracket_leg(trade, OrderRole::StopLoss, position.size, position.stop_loss)
            .await?;
        let tp_order = self
            .order_manager
            .place_bracket_leg(trade, OrderRole::TakeProfit, position.size, position.take_profit)
            .await?;

        self.pairs.lock().insert(
            trade.trade_id,
            BracketPair { stop_loss_order_id: sl_order.order_id, take_profit_order_id: tp_order.order_id },
        );
        Ok(())
    }

    /// Resolves which sibling needs cancelling and which `CloseReason`
    /// applies, given that `filled_role` just filled for `trade_id`.
    pub fn trigger_for(&self, trade_id: Uuid, filled_role: OrderRole) -> Option<BracketTrigger> {
        let pairs = self.pairs.lock();
        let pair = pairs.get(&trade_id)?;
        match filled_role {
            OrderRole::StopLoss => Some(BracketTrigger { reason: CloseReason::Sl, sibling_order_id: pair.take_profit_order_id }),
            OrderRole::TakeProfit => Some(BracketTrigger { reason: CloseReason::Tp, sibling_order_id: pair.stop_loss_order_id }),
            OrderRole::Entry => None,
        }
    }

    pub fn forget(&self, trade_id: Uuid) {
        self.pairs.lock().remove(&trade_id);
    }
}
