use super::*;
use std::{
    io::Write,
    sync::{atomic::AtomicU32, Mutex},
};

use async_trait::async_trait;
use crossbeam_channel::{unbounded, Receiver};
use shared::domain::{
    CustomerId, MetricsSummary, PredictionRecord, PredictionSet, SegmentationReport, Thresholds,
    TierBreakdown, TierSummary, TopCustomersList,
};
use tokio::sync::Semaphore;

use crate::{
    projector::{project, PaneView},
    store::{ActivePane, ViewStateStore},
    Operation, ServiceFailure,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Metrics,
    Segmentation,
    TopCustomers,
}

/// In-memory service with scripted failures and an optional gate on dependent fetches.
struct ScriptedService {
    rows: usize,
    offline: bool,
    failing: Vec<Slot>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    last_top_n: AtomicU32,
    exported: Mutex<Vec<ExportTarget>>,
}

impl ScriptedService {
    fn healthy(rows: usize) -> Self {
        Self {
            rows,
            offline: false,
            failing: Vec::new(),
            gate: None,
            calls: AtomicUsize::new(0),
            last_top_n: AtomicU32::new(0),
            exported: Mutex::new(Vec::new()),
        }
    }

    fn failing(mut self, slot: Slot) -> Self {
        self.failing.push(slot);
        self
    }

    fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn records(&self) -> Vec<PredictionRecord> {
        (0..self.rows)
            .map(|index| PredictionRecord {
                customer_id: CustomerId((12346 + index).to_string()),
                prediction: 1000.0 - index as f64,
            })
            .collect()
    }

    async fn enter(&self, slot: Slot, operation: Operation) -> Result<(), ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate open");
        }
        if self.failing.contains(&slot) {
            return Err(ClientError::unavailable(
                operation,
                ServiceFailure::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PredictionService for ScriptedService {
    async fn submit_for_prediction(
        &self,
        _dataset: &DatasetHandle,
    ) -> Result<PredictionSet, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(ClientError::unavailable(
                Operation::Predict,
                ServiceFailure::Status(reqwest::StatusCode::BAD_GATEWAY),
            ));
        }
        PredictionSet::new(self.records()).ok_or_else(|| {
            ClientError::unavailable(Operation::Predict, ServiceFailure::EmptyPredictions)
        })
    }

    async fn fetch_metrics(&self) -> Result<MetricsSummary, ClientError> {
        self.enter(Slot::Metrics, Operation::Metrics).await?;
        Ok(MetricsSummary {
            count: self.rows as u64,
            mean: 500.0,
            p90: 900.0,
            max: 1000.0,
            std: None,
            p50: None,
            p75: None,
        })
    }

    async fn fetch_segmentation(&self) -> Result<SegmentationReport, ClientError> {
        self.enter(Slot::Segmentation, Operation::Segmentation)
            .await?;
        let tier = |count: usize, threshold: &str| TierSummary {
            count: count as u64,
            threshold: threshold.to_string(),
        };
        let high = self.rows / 10;
        let medium = self.rows * 15 / 100;
        Ok(SegmentationReport {
            segmentation: TierBreakdown {
                high_value: tier(high, ">= 900.0000 £"),
                medium_value: tier(medium, "750.0000 £ - 900.0000 £"),
                low_value: tier(self.rows - high - medium, "< 750.0000 £"),
            },
            thresholds: Thresholds { p75: 750.0, p90: 900.0 },
        })
    }

    async fn fetch_top_customers(&self, top_n: TopN) -> Result<TopCustomersList, ClientError> {
        self.last_top_n.store(top_n.get(), Ordering::SeqCst);
        self.enter(Slot::TopCustomers, Operation::TopCustomers)
            .await?;
        let mut records = self.records();
        records.truncate(top_n.get() as usize);
        Ok(TopCustomersList(records))
    }

    async fn download_export(
        &self,
        target: ExportTarget,
        out: &mut (dyn Write + Send),
    ) -> Result<u64, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(ClientError::unavailable(
                Operation::Export(target),
                ServiceFailure::Status(reqwest::StatusCode::BAD_GATEWAY),
            ));
        }
        self.exported.lock().expect("exported").push(target);
        let body = b"CustomerID,Prediction\n";
        out.write_all(body)
            .map_err(|source| ClientError::ExportWrite { target, source })?;
        Ok(body.len() as u64)
    }
}

struct Harness {
    service: Arc<ScriptedService>,
    orchestrator: Arc<Orchestrator>,
    updates: Receiver<StateUpdate>,
    store: ViewStateStore,
    _downloads: tempfile::TempDir,
}

impl Harness {
    fn new(service: ScriptedService) -> Self {
        let downloads = tempfile::tempdir().expect("tempdir");
        let service = Arc::new(service);
        let (tx, rx) = unbounded();
        let orchestrator = Orchestrator::new(service.clone(), Arc::new(tx), downloads.path());
        Self {
            service,
            orchestrator,
            updates: rx,
            store: ViewStateStore::default(),
            _downloads: downloads,
        }
    }

    fn with_dataset(mut self, rows: usize) -> Self {
        self.store
            .set_dataset(DatasetHandle::new("customers.csv", vec![b'x'; rows]));
        self
    }

    /// Applies every queued update in arrival order and returns them.
    fn drain(&mut self) -> Vec<StateUpdate> {
        let mut applied = Vec::new();
        while let Ok(update) = self.updates.try_recv() {
            self.store.apply(update.clone());
            applied.push(update);
        }
        applied
    }

    async fn upload(&mut self) -> Option<DependentFetches> {
        self.orchestrator
            .submit_upload(self.store.dataset().cloned(), self.store.top_n())
            .await
    }

    async fn upload_and_settle(&mut self) {
        let fetches = self.upload().await.expect("predict succeeds");
        fetches.settled().await;
        self.drain();
    }
}

#[test]
fn channel_sink_never_blocks_on_a_full_queue() {
    let (tx, rx) = crossbeam_channel::bounded(1);

    tx.publish(StateUpdate::LoadingStarted(Generation(1)));
    tx.publish(StateUpdate::LoadingFinished(Generation(1)));

    assert_eq!(rx.len(), 1);
    assert!(matches!(
        rx.try_recv(),
        Ok(StateUpdate::LoadingStarted(Generation(1)))
    ));
    drop(rx);
    tx.publish(StateUpdate::LoadingStarted(Generation(2)));
}

#[tokio::test]
async fn upload_without_dataset_sends_nothing() {
    let mut harness = Harness::new(ScriptedService::healthy(200));

    assert!(harness.upload().await.is_none());
    harness.drain();

    assert_eq!(harness.service.calls(), 0);
    assert_eq!(harness.store.active_pane(), ActivePane::Upload);
    assert!(!harness.store.is_loading());
    assert_eq!(
        harness.store.pending_alert().map(|alert| alert.kind),
        Some(ErrorKind::NoFileSelected)
    );
    assert_eq!(harness.orchestrator.phase(), ControllerPhase::Idle);
}

#[tokio::test]
async fn predict_success_selects_results_before_dependent_fetches_finish() {
    let gate = Arc::new(Semaphore::new(0));
    let mut harness =
        Harness::new(ScriptedService::healthy(200).gated(gate.clone())).with_dataset(200);

    let fetches = harness.upload().await.expect("predict succeeds");
    let early = harness.drain();

    assert!(matches!(early.first(), Some(StateUpdate::LoadingStarted(_))));
    assert!(matches!(early.last(), Some(StateUpdate::LoadingFinished(_))));
    assert_eq!(harness.store.active_pane(), ActivePane::Results);
    assert!(!harness.store.is_loading());
    assert!(harness.store.metrics().is_none());
    assert!(harness.store.segmentation().is_none());
    assert!(harness.store.top_customers().is_none());
    assert_eq!(harness.orchestrator.phase(), ControllerPhase::Fetching);

    gate.add_permits(3);
    fetches.settled().await;
    harness.drain();

    assert_eq!(harness.store.metrics().map(|m| m.count), Some(200));
    assert!(harness.store.can_select(ActivePane::Segmentation));
    assert_eq!(harness.store.top_customers().map(TopCustomersList::len), Some(10));
    assert_eq!(harness.orchestrator.phase(), ControllerPhase::Idle);
    assert!(harness.store.pending_alert().is_none());
}

#[tokio::test]
async fn each_dependent_fetch_failure_is_isolated() {
    for failing in [Slot::Metrics, Slot::Segmentation, Slot::TopCustomers] {
        let mut harness =
            Harness::new(ScriptedService::healthy(50).failing(failing)).with_dataset(50);
        harness.upload_and_settle().await;

        let store = &harness.store;
        assert_eq!(store.metrics().is_some(), failing != Slot::Metrics);
        assert_eq!(store.segmentation().is_some(), failing != Slot::Segmentation);
        assert_eq!(store.top_customers().is_some(), failing != Slot::TopCustomers);
        assert_eq!(store.active_pane(), ActivePane::Results);
        assert!(store.pending_alert().is_none(), "{failing:?} failure must not alert");
    }
}

#[tokio::test]
async fn metrics_failure_renders_results_without_cards() {
    let mut harness =
        Harness::new(ScriptedService::healthy(200).failing(Slot::Metrics)).with_dataset(200);
    harness.upload_and_settle().await;

    assert!(harness.store.select_pane(ActivePane::Segmentation));
    assert!(harness.store.select_pane(ActivePane::Results));
    match project(&harness.store).body {
        PaneView::Results(results) => {
            assert!(results.metric_cards.is_none());
            assert!(results.top_customers.is_some());
        }
        other => panic!("expected results pane, got {other:?}"),
    }
}

#[tokio::test]
async fn predict_failure_keeps_upload_pane_and_alerts() {
    let mut harness = Harness::new(ScriptedService::healthy(10).offline()).with_dataset(10);

    assert!(harness.upload().await.is_none());
    harness.drain();

    assert_eq!(harness.service.calls(), 1);
    assert_eq!(harness.store.active_pane(), ActivePane::Upload);
    assert!(!harness.store.is_loading());
    assert!(harness.store.predictions().is_none());
    let alert = harness.store.pending_alert().expect("alert");
    assert_eq!(alert.kind, ErrorKind::ServiceUnavailable);
    assert_eq!(alert.message, PREDICT_FAILED_MESSAGE);
}

#[tokio::test]
async fn top_n_refresh_replaces_only_top_customers() {
    let mut harness = Harness::new(ScriptedService::healthy(200)).with_dataset(200);
    harness.upload_and_settle().await;
    let before = harness.store.clone();

    harness.store.set_top_n(25);
    let generation = harness.store.generation().expect("generation");
    assert!(
        harness
            .orchestrator
            .refresh_top_customers(generation, harness.store.top_n())
            .await
    );
    harness.drain();

    let after = &harness.store;
    assert_eq!(after.top_customers().map(TopCustomersList::len), Some(25));
    assert_eq!(after.active_pane(), before.active_pane());
    assert_eq!(after.predictions(), before.predictions());
    assert_eq!(after.metrics(), before.metrics());
    assert_eq!(after.segmentation(), before.segmentation());
    assert_eq!(after.generation(), before.generation());
}

#[tokio::test]
async fn top_n_refresh_failure_is_silent() {
    let mut harness =
        Harness::new(ScriptedService::healthy(20).failing(Slot::TopCustomers)).with_dataset(20);
    harness.upload_and_settle().await;
    let generation = harness.store.generation().expect("generation");

    assert!(
        !harness
            .orchestrator
            .refresh_top_customers(generation, 5)
            .await
    );
    assert!(harness.drain().is_empty());
    assert!(harness.store.pending_alert().is_none());
    assert!(harness.store.top_customers().is_none());
}

#[tokio::test]
async fn out_of_range_top_n_is_clamped_on_request() {
    let mut harness = Harness::new(ScriptedService::healthy(300)).with_dataset(300);
    harness.store.set_top_n(500);
    harness.upload_and_settle().await;

    assert_eq!(harness.service.last_top_n.load(Ordering::SeqCst), 100);
    assert_eq!(harness.store.top_n(), 500);
    assert_eq!(harness.store.top_customers().map(TopCustomersList::len), Some(100));

    let generation = harness.store.generation().expect("generation");
    harness.orchestrator.refresh_top_customers(generation, 0).await;
    assert_eq!(harness.service.last_top_n.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn results_of_superseded_upload_are_discarded() {
    let gate = Arc::new(Semaphore::new(0));
    let mut harness =
        Harness::new(ScriptedService::healthy(40).gated(gate.clone())).with_dataset(40);

    let first = harness.upload().await.expect("first predict");
    let second = harness.upload().await.expect("second predict");
    assert!(first.generation() < second.generation());
    harness.drain();
    assert_eq!(harness.store.generation(), Some(second.generation()));

    gate.add_permits(6);
    first.settled().await;
    second.settled().await;

    let mut accepted = 0;
    let mut discarded = 0;
    while let Ok(update) = harness.updates.try_recv() {
        if harness.store.apply(update) {
            accepted += 1;
        } else {
            discarded += 1;
        }
    }
    assert_eq!(accepted, 3);
    assert_eq!(discarded, 3);
    assert_eq!(harness.store.metrics().map(|m| m.count), Some(40));
}

#[tokio::test]
async fn export_publishes_saved_path() {
    let mut harness = Harness::new(ScriptedService::healthy(5));

    let target = ExportTarget::Tier(shared::domain::ValueTier::High);
    let path = harness.orchestrator.export(target).await.expect("saved");
    harness.drain();

    assert_eq!(
        path,
        harness.orchestrator.download_dir().join("HighValueCustomers.csv")
    );
    assert!(path.exists());
    assert_eq!(*harness.service.exported.lock().expect("exported"), vec![target]);
    assert!(harness
        .store
        .status()
        .is_some_and(|status| status.contains("HighValueCustomers.csv")));
}

#[tokio::test]
async fn export_failure_alerts() {
    let mut harness = Harness::new(ScriptedService::healthy(5).offline());

    assert!(harness.orchestrator.export(ExportTarget::All).await.is_none());
    harness.drain();

    let alert = harness.store.pending_alert().expect("alert");
    assert_eq!(alert.kind, ErrorKind::ServiceUnavailable);
    assert_eq!(alert.message, EXPORT_FAILED_MESSAGE);
    assert!(!harness.orchestrator.download_dir().join("predictions.csv").exists());
}
