//! Plain-text rendering of every pane that has data.

use std::fmt::Write;

use client_core::{
    projector::{project, PaneView, ResultsView, SegmentationView, UploadView},
    ActivePane, ViewStateStore,
};
use shared::domain::MetricsSummary;

/// Renders each selectable pane in tab order, then restores the active pane.
pub fn render(store: &mut ViewStateStore) -> String {
    let active = store.active_pane();
    let mut out = String::new();

    for pane in ActivePane::ALL {
        if !store.select_pane(pane) {
            continue;
        }
        let _ = writeln!(out, "== {} ==", pane.label());
        match project(store).body {
            PaneView::Upload(view) => upload(&mut out, &view),
            PaneView::Results(view) => results(&mut out, &view, store.metrics()),
            PaneView::Segmentation(view) => segmentation(&mut out, &view),
        }
        out.push('\n');
    }
    store.select_pane(active);

    if let Some(status) = store.status() {
        let _ = writeln!(out, "{status}");
    }
    out
}

fn upload(out: &mut String, view: &UploadView) {
    let _ = writeln!(out, "file: {}", view.file_label);
}

fn results(out: &mut String, view: &ResultsView, metrics: Option<&MetricsSummary>) {
    let _ = writeln!(out, "predictions: {}", view.prediction_count);

    if let Some(cards) = &view.metric_cards {
        for card in cards {
            let _ = writeln!(out, "{:<18}{}", card.title, card.value);
        }
    }
    // Extra distribution figures the service may include.
    if let Some(metrics) = metrics {
        for (title, value) in [
            ("Std Deviation", metrics.std),
            ("Median", metrics.p50),
            ("75th Percentile", metrics.p75),
        ] {
            if let Some(value) = value {
                let _ = writeln!(out, "{title:<18}{value:.2}");
            }
        }
    }

    if let Some(top) = &view.top_customers {
        let _ = writeln!(out, "\ntop customers (requested {}):", top.top_n_input);
        let _ = writeln!(out, "{:>4}  {:<12}{}", "rank", "customer", "value");
        for row in &top.rows {
            let _ = writeln!(out, "{:>4}  {:<12}{}", row.rank, row.customer_id, row.value);
        }
    }
}

fn segmentation(out: &mut String, view: &SegmentationView) {
    let _ = writeln!(out, "p75: {}  p90: {}", view.p75, view.p90);
    for tier in &view.tiers {
        let _ = write!(out, "{:<14}{:>7}  {}", tier.label, tier.count, tier.threshold);
        match &tier.share {
            Some(share) => {
                let _ = writeln!(out, "  ({share})");
            }
            None => out.push('\n'),
        }
    }
}
