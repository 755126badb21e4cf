//! Pure projection from [`ViewStateStore`] to what the dashboard shows.

use shared::{
    domain::{MetricsSummary, SegmentationReport, TopCustomersList, ValueTier},
    protocol::ExportTarget,
};

use crate::store::{ActivePane, Alert, ViewStateStore};

const SUBMIT_LABEL: &str = "Generate Predictions";
const SUBMIT_BUSY_LABEL: &str = "Processing...";
const NO_FILE_LABEL: &str = "Click to select a CSV file";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub tabs: Vec<TabView>,
    pub body: PaneView,
    pub alert: Option<Alert>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabView {
    pub pane: ActivePane,
    pub label: &'static str,
    pub enabled: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaneView {
    Upload(UploadView),
    Results(ResultsView),
    Segmentation(SegmentationView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadView {
    pub file_label: String,
    pub submit_enabled: bool,
    pub submit_label: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub prediction_count: usize,
    pub metric_cards: Option<Vec<MetricCard>>,
    pub top_customers: Option<TopCustomersView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricCard {
    pub title: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopCustomersView {
    pub top_n_input: i64,
    pub rows: Vec<RankedRow>,
    pub export: ExportTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRow {
    pub rank: usize,
    pub customer_id: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationView {
    pub tiers: Vec<TierView>,
    pub p75: String,
    pub p90: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierView {
    pub tier: ValueTier,
    pub label: &'static str,
    pub count: u64,
    pub threshold: String,
    /// `None` when the total is unknown or zero.
    pub share: Option<String>,
    pub export: ExportTarget,
}

pub fn project(store: &ViewStateStore) -> DashboardView {
    let tabs = ActivePane::ALL
        .iter()
        .map(|&pane| TabView {
            pane,
            label: pane.label(),
            enabled: store.can_select(pane),
            selected: store.active_pane() == pane,
        })
        .collect();

    DashboardView {
        tabs,
        body: project_body(store),
        alert: store.pending_alert().cloned(),
        status: store.status().map(str::to_string),
    }
}

fn project_body(store: &ViewStateStore) -> PaneView {
    match store.active_pane() {
        ActivePane::Results => {
            if let Some(predictions) = store.predictions() {
                return PaneView::Results(ResultsView {
                    prediction_count: predictions.len(),
                    metric_cards: store.metrics().map(metric_cards),
                    top_customers: store
                        .top_customers()
                        .map(|list| top_customers_view(list, store.top_n())),
                });
            }
        }
        ActivePane::Segmentation => {
            if let Some(report) = store.segmentation() {
                return PaneView::Segmentation(segmentation_view(report, store.metrics()));
            }
        }
        ActivePane::Upload => {}
    }
    PaneView::Upload(upload_view(store))
}

fn upload_view(store: &ViewStateStore) -> UploadView {
    let loading = store.is_loading();
    UploadView {
        file_label: store
            .dataset()
            .map(|dataset| dataset.name().to_string())
            .unwrap_or_else(|| NO_FILE_LABEL.to_string()),
        submit_enabled: store.dataset().is_some() && !loading,
        submit_label: if loading {
            SUBMIT_BUSY_LABEL
        } else {
            SUBMIT_LABEL
        },
    }
}

fn metric_cards(metrics: &MetricsSummary) -> Vec<MetricCard> {
    vec![
        MetricCard {
            title: "Total Customers",
            value: metrics.count.to_string(),
        },
        MetricCard {
            title: "Average Value",
            value: format!("{:.2}", metrics.mean),
        },
        MetricCard {
            title: "90th Percentile",
            value: format!("{:.2}", metrics.p90),
        },
        MetricCard {
            title: "Max Value",
            value: format!("{:.2}", metrics.max),
        },
    ]
}

fn top_customers_view(list: &TopCustomersList, top_n_input: i64) -> TopCustomersView {
    TopCustomersView {
        top_n_input,
        rows: list
            .ranked()
            .map(|(rank, record)| RankedRow {
                rank,
                customer_id: record.customer_id.to_string(),
                value: currency(record.prediction),
            })
            .collect(),
        export: ExportTarget::All,
    }
}

fn segmentation_view(report: &SegmentationReport, metrics: Option<&MetricsSummary>) -> SegmentationView {
    let total = metrics.map(|metrics| metrics.count).filter(|count| *count > 0);
    SegmentationView {
        tiers: ValueTier::ALL
            .iter()
            .map(|&tier| {
                let summary = report.segmentation.tier(tier);
                TierView {
                    tier,
                    label: tier.label(),
                    count: summary.count,
                    threshold: summary.threshold.clone(),
                    share: total.map(|total| share_of_total(summary.count, total)),
                    export: ExportTarget::Tier(tier),
                }
            })
            .collect(),
        p75: currency(report.thresholds.p75),
        p90: currency(report.thresholds.p90),
    }
}

fn share_of_total(count: u64, total: u64) -> String {
    format!("{:.1}% of total", count as f64 / total as f64 * 100.0)
}

fn currency(value: f64) -> String {
    format!("{value:.1} £")
}

#[cfg(test)]
#[path = "tests/projector_tests.rs"]
mod tests;
