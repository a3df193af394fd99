use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Outcome of one stage-transition attempt. Every attempt is recorded
/// regardless of outcome so the log can reconstruct rejections, not just
/// successful transitions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageOutcome {
    Succeeded,
    Rejected,
    Failed,
}

impl StageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageOutcome::Succeeded => "SUCCEEDED",
            StageOutcome::Rejected => "REJECTED",
            StageOutcome::Failed => "FAILED",
        }
    }
}

/// One stage-audit record: a single attempt at driving a signal or trade
/// through a lifecycle stage (validation, order placement, fill tracking,
/// position management, closure), with enough of the inputs and outputs to
/// reconstruct why the attempt ended the way it did.
///
/// `trade_id` is `None` for attempts that never produce a trade — a risk
/// rejection leaves no persisted trade side-effects beyond this record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageAuditRecord {
    pub signal_id: Uuid,
    pub trade_id: Option<Uuid>,
    pub stage: String,
    pub outcome: StageOutcome,
    pub inputs: Value,
    pub outputs: Value,
    pub error: Option<String>,
}

impl StageAuditRecord {
    pub fn succeeded(signal_id: Uuid, trade_id: Uuid, stage: impl Into<String>, inputs: Value, outputs: Value) -> Self {
        Self {
            signal_id,
            trade_id: Some(trade_id),
            stage: stage.into(),
            outcome: StageOutcome::Succeeded,
            inputs,
            outputs,
            error: None,
        }
    }

    /// A rejection before a trade exists (e.g. risk validation failure) —
    /// `trade_id` stays `None`.
    pub fn rejected(signal_id: Uuid, stage: impl Into<String>, inputs: Value, reason: impl Into<String>) -> Self {
        Self {
            signal_id,
            trade_id: None,
            stage: stage.into(),
            outcome: StageOutcome::Rejected,
            inputs,
            outputs: Value::Null,
            error: Some(reason.into()),
        }
    }

    pub fn failed(
        signal_id: Uuid,
        trade_id: Option<Uuid>,
        stage: impl Into<String>,
        inputs: Value,
        error: impl Into<String>,
    ) -> Self {
        Self {
            signal_id,
            trade_id,
            stage: stage.into(),
            outcome: StageOutcome::Failed,
            inputs,
            outputs: Value::Null,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_record_carries_no_trade_id() {
        let rec = StageAuditRecord::rejected(
            Uuid::new_v4(),
            "RISK_VALIDATION",
            serde_json::json!({"risk_fraction": 0.05}),
            "risk_fraction 0.05 exceeds the 0.01 cap",
        );
        assert!(rec.trade_id.is_none());
        assert_eq!(rec.outcome, StageOutcome::Rejected);
        assert!(rec.error.is_some());
    }

    #[test]
    fn succeeded_record_carries_trade_id() {
        let rec = StageAuditRecord::succeeded(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "VALIDATE",
            serde_json::json!({}),
            serde_json::json!({"status": "VALIDATED"}),
        );
        assert!(rec.trade_id.is_some());
        assert!(rec.error.is_none());
    }
}
