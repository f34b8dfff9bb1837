//! Async job pipeline
//!
//! Durable FIFO queues on the Redis broker, one fixed-size worker pool per
//! queue so a slow authority call never blocks email delivery. Jobs travel
//! as `{"type": ..., "payload": ...}` envelopes.

use serde::{Deserialize, Serialize};

pub mod dispatcher;
pub mod dlq;
pub mod email;
pub mod facturacion;
pub mod pool;
pub mod retry_cron;

pub const QUEUE_FACTURACION: &str = "jobs:facturacion";
pub const QUEUE_EMAIL: &str = "jobs:email";

/// Generic envelope for all async tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "type")]
    pub job_type: String,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wire_shape() {
        let job = Job {
            job_type: "facturacion".into(),
            payload: serde_json::json!({"venta_id": "abc"}),
        };
        let raw = serde_json::to_string(&job).unwrap();
        assert!(raw.contains("\"type\":\"facturacion\""));
        let back: Job = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.payload["venta_id"], "abc");
    }
}
