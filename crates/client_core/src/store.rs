//! View state: the single owner of everything the dashboard displays.
//!
//! The store is mutated only through its named entry points. Asynchronous
//! work never touches it directly; it publishes [`StateUpdate`] messages that
//! the owning thread applies in arrival order.

use std::{collections::VecDeque, path::PathBuf};

use serde::{Deserialize, Serialize};
use shared::{
    domain::{
        Generation, MetricsSummary, PredictionSet, SegmentationReport, TopCustomersList, TopN,
    },
    error::ErrorKind,
    protocol::ExportTarget,
};
use tracing::debug;

use crate::{ClientError, DatasetHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivePane {
    #[default]
    Upload,
    Results,
    Segmentation,
}

impl ActivePane {
    pub const ALL: [ActivePane; 3] = [
        ActivePane::Upload,
        ActivePane::Results,
        ActivePane::Segmentation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ActivePane::Upload => "Upload Data",
            ActivePane::Results => "Results",
            ActivePane::Segmentation => "Segmentation",
        }
    }
}

/// Blocking notification the operator has to acknowledge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl Alert {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn for_error(err: &ClientError, message: impl Into<String>) -> Self {
        Self {
            kind: err.kind(),
            message: message.into(),
            detail: Some(err.to_string()),
        }
    }
}

/// One write into the store, produced by the orchestration side.
#[derive(Debug, Clone)]
pub enum StateUpdate {
    LoadingStarted(Generation),
    LoadingFinished(Generation),
    Predictions {
        generation: Generation,
        predictions: PredictionSet,
    },
    Metrics {
        generation: Generation,
        metrics: MetricsSummary,
    },
    Segmentation {
        generation: Generation,
        report: SegmentationReport,
    },
    TopCustomers {
        generation: Generation,
        customers: TopCustomersList,
    },
    Alert(Alert),
    ExportSaved {
        target: ExportTarget,
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewStateStore {
    dataset: Option<DatasetHandle>,
    generation: Option<Generation>,
    predictions: Option<PredictionSet>,
    metrics: Option<MetricsSummary>,
    segmentation: Option<SegmentationReport>,
    top_customers: Option<TopCustomersList>,
    active_pane: ActivePane,
    loading: Option<Generation>,
    top_n: i64,
    alerts: VecDeque<Alert>,
    status: Option<String>,
}

impl Default for ViewStateStore {
    fn default() -> Self {
        Self::new(i64::from(TopN::DEFAULT.get()))
    }
}

impl ViewStateStore {
    pub fn new(top_n: i64) -> Self {
        Self {
            dataset: None,
            generation: None,
            predictions: None,
            metrics: None,
            segmentation: None,
            top_customers: None,
            active_pane: ActivePane::Upload,
            loading: None,
            top_n,
            alerts: VecDeque::new(),
            status: None,
        }
    }

    pub fn dataset(&self) -> Option<&DatasetHandle> {
        self.dataset.as_ref()
    }

    /// Generation of the predictions currently held, if any.
    pub fn generation(&self) -> Option<Generation> {
        self.generation
    }

    pub fn predictions(&self) -> Option<&PredictionSet> {
        self.predictions.as_ref()
    }

    pub fn metrics(&self) -> Option<&MetricsSummary> {
        self.metrics.as_ref()
    }

    pub fn segmentation(&self) -> Option<&SegmentationReport> {
        self.segmentation.as_ref()
    }

    pub fn top_customers(&self) -> Option<&TopCustomersList> {
        self.top_customers.as_ref()
    }

    pub fn active_pane(&self) -> ActivePane {
        self.active_pane
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn top_n(&self) -> i64 {
        self.top_n
    }

    pub fn pending_alert(&self) -> Option<&Alert> {
        self.alerts.front()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn can_select(&self, pane: ActivePane) -> bool {
        match pane {
            ActivePane::Upload => true,
            ActivePane::Results => self.predictions.is_some(),
            ActivePane::Segmentation => self.segmentation.is_some(),
        }
    }

    /// Switches panes when the target's data is present; otherwise leaves state untouched.
    pub fn select_pane(&mut self, pane: ActivePane) -> bool {
        if !self.can_select(pane) {
            debug!(?pane, "ignored selection of gated pane");
            return false;
        }
        self.active_pane = pane;
        true
    }

    pub fn set_dataset(&mut self, dataset: DatasetHandle) {
        self.dataset = Some(dataset);
    }

    /// Stores raw operator input; range handling happens when a request is built.
    pub fn set_top_n(&mut self, raw: i64) {
        self.top_n = raw;
    }

    /// Accepts predictions unless a newer generation is already held.
    pub fn set_predictions(&mut self, generation: Generation, predictions: PredictionSet) -> bool {
        if self.generation.is_some_and(|current| current > generation) {
            debug!(%generation, "discarded superseded predictions");
            return false;
        }
        self.generation = Some(generation);
        self.predictions = Some(predictions);
        true
    }

    pub fn set_metrics(&mut self, generation: Generation, metrics: MetricsSummary) -> bool {
        if !self.is_current(generation, "metrics") {
            return false;
        }
        self.metrics = Some(metrics);
        true
    }

    pub fn set_segmentation(&mut self, generation: Generation, report: SegmentationReport) -> bool {
        if !self.is_current(generation, "segmentation") {
            return false;
        }
        self.segmentation = Some(report);
        true
    }

    pub fn set_top_customers(
        &mut self,
        generation: Generation,
        customers: TopCustomersList,
    ) -> bool {
        if !self.is_current(generation, "top customers") {
            return false;
        }
        self.top_customers = Some(customers);
        true
    }

    pub fn push_alert(&mut self, alert: Alert) {
        self.alerts.push_back(alert);
    }

    pub fn dismiss_alert(&mut self) -> Option<Alert> {
        self.alerts.pop_front()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Applies one update. Returns `false` when the update was stale and dropped.
    pub fn apply(&mut self, update: StateUpdate) -> bool {
        match update {
            StateUpdate::LoadingStarted(generation) => {
                self.loading = Some(generation);
                true
            }
            StateUpdate::LoadingFinished(generation) => {
                // A late settle from a superseded upload must not clear a newer one.
                if self.loading.is_some_and(|active| active > generation) {
                    return false;
                }
                self.loading = None;
                true
            }
            StateUpdate::Predictions {
                generation,
                predictions,
            } => {
                let accepted = self.set_predictions(generation, predictions);
                if accepted {
                    self.select_pane(ActivePane::Results);
                }
                accepted
            }
            StateUpdate::Metrics {
                generation,
                metrics,
            } => self.set_metrics(generation, metrics),
            StateUpdate::Segmentation { generation, report } => {
                self.set_segmentation(generation, report)
            }
            StateUpdate::TopCustomers {
                generation,
                customers,
            } => self.set_top_customers(generation, customers),
            StateUpdate::Alert(alert) => {
                self.push_alert(alert);
                true
            }
            StateUpdate::ExportSaved { target, path } => {
                self.set_status(format!(
                    "Saved {} to {}",
                    target.filename(),
                    path.display()
                ));
                true
            }
        }
    }

    fn is_current(&self, generation: Generation, slot: &'static str) -> bool {
        if self.generation == Some(generation) {
            return true;
        }
        debug!(%generation, current = ?self.generation, slot, "discarded stale result");
        false
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
