//! Email worker - delivers queued receipt notifications

use super::dispatcher::EmailJobPayload;
use crate::state::AppState;

/// Entry point for one email job. Delivery is best-effort: failures are
/// logged and the job is dropped, never retried.
pub async fn handle(state: AppState, raw_payload: serde_json::Value) {
    let payload: EmailJobPayload = match serde_json::from_value(raw_payload) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "email: invalid payload");
            return;
        }
    };

    if !state.mailer.is_configured() {
        tracing::debug!(to = %payload.to_email, "email: SMTP not configured, dropping job");
        return;
    }

    match state
        .mailer
        .send(&payload.to_email, &payload.subject, &payload.body)
        .await
    {
        Ok(()) => tracing::info!(to = %payload.to_email, "email: delivered"),
        Err(e) => tracing::warn!(to = %payload.to_email, error = %e, "email: delivery failed"),
    }
}
