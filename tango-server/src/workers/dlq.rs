//! Dead-letter queue
//!
//! Jobs that exhaust their retry budget land here for manual inspection,
//! one Redis list per source queue (`dlq:{queue}`). Entries are the durable
//! record of "we gave up retrying" and are never auto-expired.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::infra::broker::Broker;

pub const DLQ_PREFIX: &str = "dlq:";

/// Failed job plus the metadata needed to debug it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    pub original_queue: String,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub reason: String,
    /// ISO 8601
    pub failed_at: String,
    pub attempts: i32,
}

/// Push a failed job to the dead-letter queue. Best-effort: a DLQ push
/// failure is logged, never propagated.
pub async fn send_to_dlq(
    broker: &Broker,
    queue: &str,
    job_type: &str,
    payload: serde_json::Value,
    reason: &str,
    attempts: i32,
) {
    let entry = DlqEntry {
        original_queue: queue.to_string(),
        job_type: job_type.to_string(),
        payload,
        reason: reason.to_string(),
        failed_at: Utc::now().to_rfc3339(),
        attempts,
    };

    let data = match serde_json::to_string(&entry) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(queue, error = %e, "dlq: failed to serialize entry");
            return;
        }
    };

    let dlq_key = format!("{DLQ_PREFIX}{queue}");
    if let Err(e) = broker.push(&dlq_key, &data).await {
        tracing::error!(dlq_key, error = %e, "dlq: failed to push entry");
        return;
    }

    tracing::warn!(queue, job_type, reason, attempts, "dlq: job moved to dead letter queue");
}

/// Number of entries in a DLQ, for monitoring
pub async fn dlq_length(broker: &Broker, queue: &str) -> redis::RedisResult<i64> {
    broker.len(&format!("{DLQ_PREFIX}{queue}")).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_wire_shape() {
        let entry = DlqEntry {
            original_queue: "jobs:facturacion".into(),
            job_type: "facturacion".into(),
            payload: serde_json::json!({"venta_id": "v-9"}),
            reason: "max retries (10) exceeded".into(),
            failed_at: "2026-08-02T12:00:00Z".into(),
            attempts: 10,
        };
        let raw = serde_json::to_string(&entry).unwrap();
        assert!(raw.contains("\"original_queue\":\"jobs:facturacion\""));
        assert!(raw.contains("\"attempts\":10"));
        let back: DlqEntry = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.payload["venta_id"], "v-9");
    }
}
