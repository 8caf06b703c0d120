//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGTERM or SIGINT (Ctrl+C elsewhere)
//! - Translate the first one into a shutdown broadcast

use std::future::Future;

use crate::lifecycle::Shutdown;

/// Resolve once the process is asked to terminate.
#[cfg(unix)]
pub async fn wait_for_termination() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

#[cfg(not(unix))]
pub async fn wait_for_termination() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl+C")
}

/// Spawn a task that triggers `shutdown` on the first termination signal.
pub fn spawn_signal_listener(shutdown: Shutdown) {
    tokio::spawn(forward_signal(wait_for_termination(), shutdown));
}

/// Trigger `shutdown` once `signal` fires. A failed handler install is
/// logged and leaves the server running.
async fn forward_signal<F>(signal: F, shutdown: Shutdown)
where
    F: Future<Output = std::io::Result<&'static str>>,
{
    match signal.await {
        Ok(name) => {
            tracing::info!(signal = name, "Termination signal received");
            shutdown.trigger();
        }
        Err(e) => tracing::error!(error = %e, "Failed to install signal handlers"),
    }
}
