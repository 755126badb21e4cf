//! Upload orchestration: predict, then fan out the dependent fetches.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use crossbeam_channel::{Sender, TrySendError};
use futures::future::join_all;
use shared::{
    domain::{Generation, TopN},
    error::ErrorKind,
    protocol::ExportTarget,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    export::save_export,
    store::{Alert, StateUpdate},
    ClientError, DatasetHandle, PredictionService,
};

const PREDICT_FAILED_MESSAGE: &str = "Error uploading file. Make sure the API is running.";
const EXPORT_FAILED_MESSAGE: &str = "Error exporting file";

/// Destination for store writes produced by background work.
pub trait UpdateSink: Send + Sync + 'static {
    fn publish(&self, update: StateUpdate);
}

// Never blocks a runtime worker; a full queue drops the update.
impl UpdateSink for Sender<StateUpdate> {
    fn publish(&self, update: StateUpdate) {
        match self.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(update)) => {
                warn!(?update, "state update dropped; store owner not draining");
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("state update dropped; store owner disconnected");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    Submitting,
    Fetching,
}

#[derive(Default)]
struct PhaseCounters {
    submitting: AtomicUsize,
    fetching: AtomicUsize,
}

#[derive(Clone, Copy)]
enum Stage {
    Submitting,
    Fetching,
}

impl PhaseCounters {
    fn counter(&self, stage: Stage) -> &AtomicUsize {
        match stage {
            Stage::Submitting => &self.submitting,
            Stage::Fetching => &self.fetching,
        }
    }
}

/// Counts one in-flight request for [`Orchestrator::phase`] until dropped.
struct InFlight {
    counters: Arc<PhaseCounters>,
    stage: Stage,
}

impl InFlight {
    fn enter(counters: &Arc<PhaseCounters>, stage: Stage) -> Self {
        counters.counter(stage).fetch_add(1, Ordering::SeqCst);
        Self {
            counters: Arc::clone(counters),
            stage,
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counters.counter(self.stage).fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handles to the three fetches spawned after a successful predict.
///
/// Dropping this detaches the tasks; each still writes its own slot.
pub struct DependentFetches {
    generation: Generation,
    handles: Vec<JoinHandle<()>>,
}

impl DependentFetches {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Waits until every dependent fetch has either published or logged its failure.
    pub async fn settled(self) {
        for joined in join_all(self.handles).await {
            if let Err(err) = joined {
                warn!(generation = %self.generation, "dependent fetch task aborted: {err}");
            }
        }
    }
}

pub struct Orchestrator {
    service: Arc<dyn PredictionService>,
    sink: Arc<dyn UpdateSink>,
    download_dir: PathBuf,
    last_generation: AtomicU64,
    phase: Arc<PhaseCounters>,
}

impl Orchestrator {
    pub fn new(
        service: Arc<dyn PredictionService>,
        sink: Arc<dyn UpdateSink>,
        download_dir: impl Into<PathBuf>,
    ) -> Arc<Self> {
        Arc::new(Self {
            service,
            sink,
            download_dir: download_dir.into(),
            last_generation: AtomicU64::new(0),
            phase: Arc::new(PhaseCounters::default()),
        })
    }

    pub fn phase(&self) -> ControllerPhase {
        if self.phase.submitting.load(Ordering::SeqCst) > 0 {
            ControllerPhase::Submitting
        } else if self.phase.fetching.load(Ordering::SeqCst) > 0 {
            ControllerPhase::Fetching
        } else {
            ControllerPhase::Idle
        }
    }

    pub fn download_dir(&self) -> &std::path::Path {
        &self.download_dir
    }

    /// Runs the upload sequence.
    ///
    /// The loading flag is cleared as soon as the predict call settles. On
    /// success, metrics, segmentation and top customers are fetched as
    /// independent tasks stamped with the new generation; their handles are
    /// returned for callers that want to wait on them.
    pub async fn submit_upload(
        &self,
        dataset: Option<DatasetHandle>,
        raw_top_n: i64,
    ) -> Option<DependentFetches> {
        let Some(dataset) = dataset else {
            warn!("upload requested without a dataset");
            self.sink.publish(StateUpdate::Alert(Alert::for_error(
                &ClientError::NoFileSelected,
                ErrorKind::NoFileSelected.user_message(),
            )));
            return None;
        };

        let generation = Generation(self.last_generation.fetch_add(1, Ordering::SeqCst) + 1);
        let top_n = request_top_n(raw_top_n);

        self.sink.publish(StateUpdate::LoadingStarted(generation));
        info!(
            %generation,
            dataset = dataset.name(),
            size_bytes = dataset.len(),
            "submitting dataset for prediction"
        );

        let outcome = {
            let _submitting = InFlight::enter(&self.phase, Stage::Submitting);
            self.service.submit_for_prediction(&dataset).await
        };

        let predictions = match outcome {
            Ok(predictions) => predictions,
            Err(err) => {
                error!(%generation, "prediction request failed: {err}");
                self.sink.publish(StateUpdate::LoadingFinished(generation));
                self.sink
                    .publish(StateUpdate::Alert(Alert::for_error(&err, PREDICT_FAILED_MESSAGE)));
                return None;
            }
        };

        info!(%generation, count = predictions.len(), "predictions received");
        self.sink.publish(StateUpdate::Predictions {
            generation,
            predictions,
        });
        self.sink.publish(StateUpdate::LoadingFinished(generation));

        let handles = vec![
            self.spawn_metrics(generation),
            self.spawn_segmentation(generation),
            self.spawn_top_customers(generation, top_n),
        ];
        Some(DependentFetches {
            generation,
            handles,
        })
    }

    /// Re-fetches the top-N list for the predictions of `generation`.
    ///
    /// Failures are logged only; the operator is not alerted.
    pub async fn refresh_top_customers(&self, generation: Generation, raw_top_n: i64) -> bool {
        let top_n = request_top_n(raw_top_n);
        let _fetching = InFlight::enter(&self.phase, Stage::Fetching);
        match self.service.fetch_top_customers(top_n).await {
            Ok(customers) => {
                debug!(%generation, %top_n, received = customers.len(), "top customers refreshed");
                self.sink.publish(StateUpdate::TopCustomers {
                    generation,
                    customers,
                });
                true
            }
            Err(err) => {
                warn!(%generation, %top_n, "failed to refresh top customers: {err}");
                false
            }
        }
    }

    pub async fn export(&self, target: ExportTarget) -> Option<PathBuf> {
        match save_export(self.service.as_ref(), target, &self.download_dir).await {
            Ok(path) => {
                self.sink.publish(StateUpdate::ExportSaved {
                    target,
                    path: path.clone(),
                });
                Some(path)
            }
            Err(err) => {
                error!(export = target.name(), "export failed: {err}");
                self.sink
                    .publish(StateUpdate::Alert(Alert::for_error(&err, EXPORT_FAILED_MESSAGE)));
                None
            }
        }
    }

    fn spawn_metrics(&self, generation: Generation) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let sink = Arc::clone(&self.sink);
        let in_flight = InFlight::enter(&self.phase, Stage::Fetching);
        tokio::spawn(async move {
            let _fetching = in_flight;
            match service.fetch_metrics().await {
                Ok(metrics) => sink.publish(StateUpdate::Metrics {
                    generation,
                    metrics,
                }),
                Err(err) => warn!(%generation, "failed to fetch metrics: {err}"),
            }
        })
    }

    fn spawn_segmentation(&self, generation: Generation) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let sink = Arc::clone(&self.sink);
        let in_flight = InFlight::enter(&self.phase, Stage::Fetching);
        tokio::spawn(async move {
            let _fetching = in_flight;
            match service.fetch_segmentation().await {
                Ok(report) => sink.publish(StateUpdate::Segmentation { generation, report }),
                Err(err) => warn!(%generation, "failed to fetch segmentation: {err}"),
            }
        })
    }

    fn spawn_top_customers(&self, generation: Generation, top_n: TopN) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let sink = Arc::clone(&self.sink);
        let in_flight = InFlight::enter(&self.phase, Stage::Fetching);
        tokio::spawn(async move {
            let _fetching = in_flight;
            match service.fetch_top_customers(top_n).await {
                Ok(customers) => sink.publish(StateUpdate::TopCustomers {
                    generation,
                    customers,
                }),
                Err(err) => warn!(%generation, %top_n, "failed to fetch top customers: {err}"),
            }
        })
    }
}

fn request_top_n(raw: i64) -> TopN {
    let (top_n, clamped) = TopN::clamped(raw);
    if clamped {
        warn!(raw, %top_n, "top-N outside [{}, {}]; clamped", TopN::MIN, TopN::MAX);
    }
    top_n
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
