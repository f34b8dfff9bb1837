//! Retry scheduler
//!
//! Periodic task that re-drives comprobantes stuck in `pendiente` with a due
//! `next_retry_at`. Skips the whole tick while the breaker is open and
//! aborts mid-batch if it trips, so a downed sidecar is never hammered.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::facturacion::{aplicar_resultado, build_afip_payload};
use crate::infra::circuit_breaker::CircuitState;
use crate::db::repository::comprobante;
use crate::state::AppState;

const TICK_INTERVAL: Duration = Duration::from_secs(30);
const BATCH_SIZE: i64 = 10;

pub async fn run(state: AppState, shutdown: CancellationToken) {
    tracing::info!("retry scheduler started");
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("retry scheduler shutting down");
                return;
            }
            _ = interval.tick() => process_retries(&state).await,
        }
    }
}

async fn process_retries(state: &AppState) {
    if state.breaker.state() == CircuitState::Open {
        tracing::debug!("retry scheduler: circuit breaker open, skipping tick");
        return;
    }

    let pendientes =
        match comprobante::list_pending_retries(&state.pool, Utc::now(), BATCH_SIZE).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(error = %e, "retry scheduler: failed to query pending retries");
                return;
            }
        };

    if pendientes.is_empty() {
        return;
    }

    tracing::info!(count = pendientes.len(), "retry scheduler: processing pending comprobantes");

    for comp in &pendientes {
        // The breaker may have tripped mid-batch
        if state.breaker.state() == CircuitState::Open {
            tracing::debug!("retry scheduler: circuit breaker opened mid-batch, stopping");
            return;
        }

        let payload = build_afip_payload(state, comp);
        let resultado = state
            .breaker
            .execute(|| async { state.afip.facturar(&payload).await })
            .await;

        aplicar_resultado(state, comp, resultado).await;
    }
}
