use std::{io::Write, time::Duration};

use async_trait::async_trait;
use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{MetricsSummary, PredictionSet, SegmentationReport, TopCustomersList, TopN},
    error::ServiceErrorBody,
    protocol::{
        ExportTarget, PredictResponse, ServiceReply, TopCustomersQuery, METRICS_PATH,
        PREDICT_FILE_FIELD, PREDICT_PATH, SEGMENT_PATH, TOP_CUSTOMERS_PATH,
    },
};
use tracing::{debug, info};

pub mod config;
pub mod controller;
mod dataset;
pub mod error;
pub mod export;
pub mod projector;
pub mod store;

pub use controller::{ControllerPhase, DependentFetches, Orchestrator, UpdateSink};
pub use dataset::DatasetHandle;
pub use error::{ClientError, Operation, ServiceFailure};
pub use store::{ActivePane, Alert, StateUpdate, ViewStateStore};

const CSV_MIME: &str = "text/csv";

/// Remote prediction service as seen by the dashboard.
///
/// Every method is a single request with no retry. Failures are reported as
/// [`ClientError::ServiceUnavailable`] and never affect other calls.
#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn submit_for_prediction(
        &self,
        dataset: &DatasetHandle,
    ) -> Result<PredictionSet, ClientError>;
    async fn fetch_metrics(&self) -> Result<MetricsSummary, ClientError>;
    async fn fetch_segmentation(&self) -> Result<SegmentationReport, ClientError>;
    async fn fetch_top_customers(&self, top_n: TopN) -> Result<TopCustomersList, ClientError>;
    /// Streams the CSV for `target` into `out`, returning the number of bytes written.
    async fn download_export(
        &self,
        target: ExportTarget,
        out: &mut (dyn Write + Send),
    ) -> Result<u64, ClientError>;
}

pub struct HttpPredictionClient {
    http: Client,
    service_url: String,
}

impl HttpPredictionClient {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            service_url: service_url.into(),
        }
    }

    pub fn with_timeout(service_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            service_url: service_url.into(),
        })
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.service_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        path: &str,
        query: Option<&TopCustomersQuery>,
    ) -> Result<T, ClientError> {
        let mut request = self.http.get(self.endpoint(path));
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request
            .send()
            .await
            .map_err(|err| ClientError::unavailable(operation, ServiceFailure::Transport(err)))?;
        read_reply(operation, response).await
    }
}

async fn read_reply<T: DeserializeOwned>(
    operation: Operation,
    response: Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::unavailable(
            operation,
            ServiceFailure::Status(status),
        ));
    }

    let body = response
        .bytes()
        .await
        .map_err(|err| ClientError::unavailable(operation, ServiceFailure::Transport(err)))?;

    match serde_json::from_slice::<ServiceReply<T>>(&body) {
        Ok(ServiceReply::Ok(value)) => Ok(value),
        Ok(ServiceReply::Rejected(rejection)) => Err(ClientError::unavailable(
            operation,
            ServiceFailure::Rejected(rejection),
        )),
        Err(err) => Err(ClientError::unavailable(
            operation,
            ServiceFailure::Decode(err),
        )),
    }
}

fn is_json_response(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

#[async_trait]
impl PredictionService for HttpPredictionClient {
    async fn submit_for_prediction(
        &self,
        dataset: &DatasetHandle,
    ) -> Result<PredictionSet, ClientError> {
        let operation = Operation::Predict;
        let part = Part::bytes(dataset.content().to_vec())
            .file_name(dataset.name().to_string())
            .mime_str(CSV_MIME)
            .map_err(|err| ClientError::unavailable(operation, ServiceFailure::Transport(err)))?;
        let form = Form::new().part(PREDICT_FILE_FIELD, part);

        let response = self
            .http
            .post(self.endpoint(PREDICT_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|err| ClientError::unavailable(operation, ServiceFailure::Transport(err)))?;
        let body: PredictResponse = read_reply(operation, response).await?;

        let received = body.predictions.len();
        let predictions = PredictionSet::new(body.predictions)
            .ok_or_else(|| ClientError::unavailable(operation, ServiceFailure::EmptyPredictions))?;
        info!(dataset = dataset.name(), received, "prediction completed");
        Ok(predictions)
    }

    async fn fetch_metrics(&self) -> Result<MetricsSummary, ClientError> {
        self.get_json(Operation::Metrics, METRICS_PATH, None).await
    }

    async fn fetch_segmentation(&self) -> Result<SegmentationReport, ClientError> {
        self.get_json(Operation::Segmentation, SEGMENT_PATH, None)
            .await
    }

    async fn fetch_top_customers(&self, top_n: TopN) -> Result<TopCustomersList, ClientError> {
        let query = TopCustomersQuery { top_n: top_n.get() };
        self.get_json(Operation::TopCustomers, TOP_CUSTOMERS_PATH, Some(&query))
            .await
    }

    async fn download_export(
        &self,
        target: ExportTarget,
        out: &mut (dyn Write + Send),
    ) -> Result<u64, ClientError> {
        let operation = Operation::Export(target);
        let transport =
            |err: reqwest::Error| ClientError::unavailable(operation, ServiceFailure::Transport(err));
        let write_failed = |source: std::io::Error| ClientError::ExportWrite { target, source };

        let mut response = self
            .http
            .get(self.endpoint(target.path()))
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::unavailable(
                operation,
                ServiceFailure::Status(status),
            ));
        }

        let mut written = 0u64;
        // The service answers with a JSON error envelope when nothing has been predicted yet.
        if is_json_response(&response) {
            let body = response.bytes().await.map_err(transport)?;
            if let Ok(rejection) = serde_json::from_slice::<ServiceErrorBody>(&body) {
                return Err(ClientError::unavailable(
                    operation,
                    ServiceFailure::Rejected(rejection),
                ));
            }
            out.write_all(&body).map_err(write_failed)?;
            written = body.len() as u64;
        } else {
            while let Some(chunk) = response.chunk().await.map_err(transport)? {
                out.write_all(&chunk).map_err(write_failed)?;
                written += chunk.len() as u64;
            }
        }
        out.flush().map_err(write_failed)?;
        debug!(export = target.name(), written, "export downloaded");
        Ok(written)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
