//! Worker pools
//!
//! One fixed-size pool per queue. Each worker loops on a blocking pop with a
//! 5-second timeout, decodes the envelope and dispatches by job type. A
//! panicking handler is isolated by running it in its own task; the worker
//! logs the panic and keeps consuming. Shutdown is cooperative through the
//! pool-wide cancellation token.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Job, QUEUE_EMAIL, QUEUE_FACTURACION};
use crate::state::AppState;

const POP_TIMEOUT_SECS: f64 = 5.0;

/// Spawn the configured pools for both queues plus the retry scheduler.
/// Returns the handles so shutdown can wait for in-flight jobs.
pub fn start(state: AppState, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    for i in 0..state.config.workers_facturacion {
        handles.push(tokio::spawn(run_worker(
            state.clone(),
            QUEUE_FACTURACION,
            i,
            shutdown.clone(),
        )));
    }
    for i in 0..state.config.workers_email {
        handles.push(tokio::spawn(run_worker(
            state.clone(),
            QUEUE_EMAIL,
            i,
            shutdown.clone(),
        )));
    }

    handles.push(tokio::spawn(super::retry_cron::run(
        state.clone(),
        shutdown.clone(),
    )));

    tracing::info!(
        facturacion = state.config.workers_facturacion,
        email = state.config.workers_email,
        "worker pools started"
    );
    handles
}

async fn run_worker(
    state: AppState,
    queue: &'static str,
    worker_id: usize,
    shutdown: CancellationToken,
) {
    tracing::info!(queue, worker_id, "worker started");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(queue, worker_id, "worker shutting down");
                return;
            }
            popped = state.broker.pop(queue, POP_TIMEOUT_SECS) => {
                match popped {
                    Ok(Some((_, raw))) => process(&state, queue, raw).await,
                    Ok(None) => {} // timeout, loop to re-check shutdown
                    Err(e) => {
                        tracing::error!(queue, worker_id, error = %e, "broker pop failed");
                        // Back off briefly so a dead broker does not spin the loop
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}

async fn process(state: &AppState, queue: &str, raw: String) {
    let job: Job = match serde_json::from_str(&raw) {
        Ok(j) => j,
        Err(e) => {
            tracing::error!(queue, error = %e, "failed to decode job envelope");
            return;
        }
    };

    tracing::debug!(queue, job_type = %job.job_type, "processing job");

    // Each job runs in its own task so a panic only kills the job
    let state = state.clone();
    let job_type = job.job_type.clone();
    let handle = tokio::spawn(async move {
        match job.job_type.as_str() {
            "facturacion" => super::facturacion::handle(state, job.payload).await,
            "email" => super::email::handle(state, job.payload).await,
            other => tracing::warn!(job_type = %other, "unknown job type, dropping"),
        }
    });

    if let Err(e) = handle.await {
        if e.is_panic() {
            tracing::error!(queue, job_type = %job_type, "job handler panicked");
        }
    }
}
