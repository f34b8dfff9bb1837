//! Job dispatcher - enqueues async work onto the broker

use serde::{Deserialize, Serialize};
use shared::{AppError, AppResult};

use super::{Job, QUEUE_EMAIL, QUEUE_FACTURACION};
use crate::infra::broker::Broker;

/// Payload for a receipt-authorization job, pushed after the sale commits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacturacionJobPayload {
    pub venta_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cliente_email: Option<String>,
}

/// Payload for an email-delivery job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailJobPayload {
    pub to_email: String,
    pub subject: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
}

#[derive(Clone)]
pub struct Dispatcher {
    broker: Broker,
}

impl Dispatcher {
    pub fn new(broker: Broker) -> Self {
        Self { broker }
    }

    pub async fn enqueue_facturacion(&self, payload: &FacturacionJobPayload) -> AppResult<()> {
        self.enqueue(QUEUE_FACTURACION, "facturacion", payload).await
    }

    pub async fn enqueue_email(&self, payload: &EmailJobPayload) -> AppResult<()> {
        self.enqueue(QUEUE_EMAIL, "email", payload).await
    }

    async fn enqueue<T: Serialize>(
        &self,
        queue: &str,
        job_type: &str,
        payload: &T,
    ) -> AppResult<()> {
        let job = Job {
            job_type: job_type.to_string(),
            payload: serde_json::to_value(payload)
                .map_err(|e| AppError::internal(e.to_string()))?,
        };
        let encoded =
            serde_json::to_string(&job).map_err(|e| AppError::internal(e.to_string()))?;
        self.broker
            .push(queue, &encoded)
            .await
            .map_err(|e| AppError::broker(e.to_string()))
    }
}
