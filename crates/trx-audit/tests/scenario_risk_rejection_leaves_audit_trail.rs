//! A risk rejection must still produce an audit record even though no trade
//! is ever persisted for it.

use trx_audit::{verify_hash_chain, AuditWriter, StageAuditRecord, VerifyResult};
use uuid::Uuid;

#[test]
fn rejected_signal_is_recorded_with_no_trade_id_and_chain_stays_valid() {
    let path = std::env::temp_dir().join(format!(
        "trx_audit_test_risk_rejection_{}_{}",
        std::process::id(),
        Uuid::new_v4().as_simple()
    ));
    let engine_id = Uuid::new_v4();
    let signal_id = Uuid::new_v4();

    {
        let mut writer = AuditWriter::new(&path, true).unwrap();
        writer
            .append(
                engine_id,
                "STAGE",
                "ATTEMPTED",
                serde_json::json!({"signal_id": signal_id, "stage": "RISK_VALIDATION"}),
            )
            .unwrap();
        writer
            .record_stage(
                engine_id,
                StageAuditRecord::rejected(
                    signal_id,
                    "RISK_VALIDATION",
                    serde_json::json!({"risk_fraction": 0.05, "leverage": 100}),
                    "risk_fraction 0.05 exceeds the 0.01 cap",
                ),
            )
            .unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);

    let rejected: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(rejected["event_type"], "REJECTED");
    assert!(rejected["payload"]["trade_id"].is_null(), "a rejected signal never gets a trade_id");
    assert_eq!(rejected["payload"]["signal_id"], signal_id.to_string());

    let result = verify_hash_chain(&path).unwrap();
    assert_eq!(result, VerifyResult::Valid { lines: 2 });

    let _ = std::fs::remove_file(&path);
}
