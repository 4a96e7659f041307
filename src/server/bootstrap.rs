use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::reconcile::{ReconcileOperator, Reconciler};

use super::routes::HandHistoryServer;

const LOG_TARGET: &str = "server::bootstrap";

pub struct ServerConfig {
    pub bind: SocketAddr,
    pub reconciler: Reconciler,
}

/// Serves until ctrl-c, then stops the worker after its current fragment.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let interpreter = config.reconciler.interpreter_name().to_owned();
    let (operator, worker) = ReconcileOperator::new(config.reconciler);
    let operator = Arc::new(operator);
    let worker_handle = operator.start(worker);

    let server = HandHistoryServer::new(Arc::clone(&operator));
    let make_service = server.into_router().into_make_service();

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = listener.local_addr()?;
    info!(
        target: LOG_TARGET,
        %local_addr,
        %interpreter,
        "hand history server listening"
    );

    let served = axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error");

    operator.shutdown();
    let reconciler = worker_handle
        .await
        .context("reconcile worker panicked")?;
    info!(
        target: LOG_TARGET,
        fragments = reconciler.log().len(),
        hash = %reconciler.hash().short(),
        "final hand state"
    );
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target: LOG_TARGET,
            error = %err,
            "failed to install ctrl-c handler"
        );
    }
    info!(target: LOG_TARGET, "shutdown signal received");
}
