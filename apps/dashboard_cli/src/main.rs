//! Headless dashboard: upload a dataset, wait for every pane, print the result.

mod report;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use client_core::{
    config::{load_settings, normalize_service_url},
    DatasetHandle, HttpPredictionClient, Orchestrator, StateUpdate, ViewStateStore,
};
use crossbeam_channel::{unbounded, Receiver};
use shared::{domain::ValueTier, protocol::ExportTarget};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportArg {
    All,
    High,
    Medium,
    Low,
}

impl From<ExportArg> for ExportTarget {
    fn from(arg: ExportArg) -> Self {
        match arg {
            ExportArg::All => ExportTarget::All,
            ExportArg::High => ExportTarget::Tier(ValueTier::High),
            ExportArg::Medium => ExportTarget::Tier(ValueTier::Medium),
            ExportArg::Low => ExportTarget::Tier(ValueTier::Low),
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Customer value predictions from the command line")]
struct Args {
    /// Transaction CSV to submit.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Overrides the configured prediction service URL.
    #[arg(long)]
    service_url: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    top_n: Option<i64>,
    /// Re-fetch the top customers list with this size after the upload settles.
    #[arg(long, allow_negative_numbers = true)]
    refresh_top_n: Option<i64>,
    #[arg(long, value_enum)]
    export: Vec<ExportArg>,
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Print the full view state as JSON instead of the text report.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(raw) = &args.service_url {
        settings.service_url =
            normalize_service_url(raw).ok_or_else(|| anyhow!("invalid --service-url {raw:?}"))?;
    }
    if let Some(dir) = args.out_dir.clone() {
        settings.download_dir = dir;
    }

    tracing::info!(
        service_url = %settings.service_url,
        download_dir = %settings.download_dir.display(),
        "starting headless run"
    );

    let mut store = ViewStateStore::new(args.top_n.unwrap_or(settings.default_top_n));
    if let Some(path) = &args.file {
        let dataset = DatasetHandle::from_path(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        store.set_dataset(dataset);
    }

    let client = HttpPredictionClient::with_timeout(
        settings.service_url.clone(),
        settings.request_timeout(),
    )
    .context("failed to build http client")?;
    let (update_tx, update_rx) = unbounded::<StateUpdate>();
    let orchestrator = Orchestrator::new(
        Arc::new(client),
        Arc::new(update_tx),
        settings.download_dir.clone(),
    );

    if let Some(fetches) = orchestrator
        .submit_upload(store.dataset().cloned(), store.top_n())
        .await
    {
        fetches.settled().await;
    }
    drain(&update_rx, &mut store);

    if let Some(raw) = args.refresh_top_n {
        store.set_top_n(raw);
        if let Some(generation) = store.generation() {
            orchestrator.refresh_top_customers(generation, raw).await;
            drain(&update_rx, &mut store);
        }
    }

    for target in &args.export {
        let target = ExportTarget::from(*target);
        tracing::debug!(export = target.name(), "requesting export");
        orchestrator.export(target).await;
        drain(&update_rx, &mut store);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&store)?);
    } else {
        print!("{}", report::render(&mut store));
    }

    let mut failures = 0;
    while let Some(alert) = store.dismiss_alert() {
        failures += 1;
        match alert.detail {
            Some(detail) => eprintln!("error: {} ({detail})", alert.message),
            None => eprintln!("error: {}", alert.message),
        }
    }
    if failures > 0 {
        return Err(anyhow!("{failures} operation(s) failed"));
    }
    Ok(())
}

fn drain(updates: &Receiver<StateUpdate>, store: &mut ViewStateStore) {
    while let Ok(update) = updates.try_recv() {
        store.apply(update);
    }
}
