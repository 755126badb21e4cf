//! Worker thread that owns the tokio runtime and the orchestrator.

use std::{sync::Arc, thread};

use client_core::{
    config::DashboardSettings, Alert, HttpPredictionClient, Orchestrator, StateUpdate,
};
use crossbeam_channel::{Receiver, Sender};
use shared::error::ErrorKind;

use crate::backend_bridge::commands::BackendCommand;

pub fn launch(
    cmd_rx: Receiver<BackendCommand>,
    update_tx: Sender<StateUpdate>,
    settings: DashboardSettings,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::error!("failed to build backend runtime: {err}");
                startup_failure(&update_tx, format!("failed to build runtime: {err}"));
                return;
            }
        };

        let client = match HttpPredictionClient::with_timeout(
            settings.service_url.clone(),
            settings.request_timeout(),
        ) {
            Ok(client) => client,
            Err(err) => {
                tracing::error!("failed to build http client: {err}");
                startup_failure(&update_tx, format!("failed to build http client: {err}"));
                return;
            }
        };
        tracing::info!(
            service_url = client.service_url(),
            download_dir = %settings.download_dir.display(),
            "backend worker ready"
        );

        let orchestrator = Orchestrator::new(
            Arc::new(client),
            Arc::new(update_tx),
            settings.download_dir,
        );

        runtime.block_on(async move {
            while let Ok(cmd) = cmd_rx.recv() {
                let orchestrator = Arc::clone(&orchestrator);
                match cmd {
                    BackendCommand::Upload { dataset, top_n } => {
                        tokio::spawn(async move {
                            // Dependent fetches run detached and publish on their own.
                            orchestrator.submit_upload(dataset, top_n).await;
                        });
                    }
                    BackendCommand::RefreshTopCustomers { generation, top_n } => {
                        tokio::spawn(async move {
                            orchestrator.refresh_top_customers(generation, top_n).await;
                        });
                    }
                    BackendCommand::Export { target } => {
                        tokio::spawn(async move {
                            orchestrator.export(target).await;
                        });
                    }
                }
            }
            tracing::debug!("ui command channel closed; backend worker exiting");
        });
    });
}

fn startup_failure(update_tx: &Sender<StateUpdate>, detail: String) {
    let _ = update_tx.send(StateUpdate::Alert(Alert {
        kind: ErrorKind::ServiceUnavailable,
        message: "Backend worker failed to start".to_string(),
        detail: Some(detail),
    }));
}
