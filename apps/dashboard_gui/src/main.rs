mod backend_bridge;
mod controller;
mod ui;

use client_core::{config::load_settings, StateUpdate};
use crossbeam_channel::{bounded, unbounded};
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::{backend_bridge::commands::BackendCommand, ui::DashboardApp};

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    tracing::info!(
        service_url = %settings.service_url,
        default_top_n = settings.default_top_n,
        "starting dashboard"
    );
    let default_top_n = settings.default_top_n;

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (update_tx, update_rx) = unbounded::<StateUpdate>();
    backend_bridge::runtime::launch(cmd_rx, update_tx, settings);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Customer Value Prediction Dashboard")
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([760.0, 520.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Customer Value Prediction Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(cmd_tx, update_rx, default_top_n)))),
    )
}
