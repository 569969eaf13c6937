//! Foreground polling mode
//!
//! Keeps a coordinator running, prints every refresh, and exits on
//! SIGTERM/SIGINT or when the token is rejected.

use crate::{OutputFormat, location_rows, print_rows};
use anyhow::{Result, bail};
use luxer_core::{
    Coordinator, CoordinatorConfig, CoordinatorState, Location, LuxerClient, PollError,
    PollSnapshot,
};

/// Run the poller until interrupted.
pub async fn run_watch(
    client: LuxerClient,
    config: CoordinatorConfig,
    format: OutputFormat,
) -> Result<()> {
    let handle = match Coordinator::start(client, config).await {
        Ok(handle) => handle,
        Err(PollError::AuthRequired) => {
            bail!("Token rejected by Luxer One. Run 'luxer login' to authenticate again.");
        }
        Err(e) => {
            // Setup is not retried on its own; the caller restarts us.
            tracing::error!("Setup failed: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!(
        "Watching {} locker locations, press Ctrl+C to stop",
        handle.locations().len()
    );

    let mut updates = handle.subscribe();
    let mut auth_required = false;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    // Poller stopped on its own.
                    auth_required = handle.state() == CoordinatorState::AuthRequired;
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                report(handle.locations(), &snapshot, format);
                if snapshot.state == CoordinatorState::AuthRequired {
                    auth_required = true;
                    break;
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested, stopping poller");
                break;
            }
        }
    }

    handle.shutdown().await;

    if auth_required {
        bail!("Authentication expired. Run 'luxer login' to reconnect.");
    }

    tracing::info!("Watch stopped");
    Ok(())
}

fn report(locations: &[Location], snapshot: &PollSnapshot, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            if !snapshot.last_update_success {
                eprintln!(
                    "Update failed: {}",
                    snapshot.last_error.as_deref().unwrap_or("unknown error")
                );
                return;
            }
            if let Some(view) = &snapshot.view {
                let when = snapshot
                    .last_success_at
                    .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
                    .unwrap_or_default();
                println!("[{}] {} pending packages", when, view.total_pending());
                print_rows(&location_rows(locations, view));
            }
        }
        OutputFormat::Json => {
            let rows = snapshot.view.as_deref().map(|view| location_rows(locations, view));
            println!("{}", serde_json::json!({
                "success": snapshot.last_update_success,
                "error": snapshot.last_error,
                "attempts": snapshot.attempts,
                "last_success_at": snapshot.last_success_at.map(|t| t.to_rfc3339()),
                "locations": rows,
            }));
        }
    }
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                    _ = tokio::signal::ctrl_c() => tracing::info!("Received Ctrl+C"),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to register SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received Ctrl+C");
    }
}
