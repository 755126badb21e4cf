use serde::{Deserialize, Serialize};

use crate::{domain::PredictionRecord, domain::ValueTier, error::ServiceErrorBody};

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000";

pub const PREDICT_PATH: &str = "/predict";
pub const METRICS_PATH: &str = "/metrics";
pub const SEGMENT_PATH: &str = "/segment";
pub const TOP_CUSTOMERS_PATH: &str = "/topCustomers";

/// Multipart field carrying the uploaded CSV.
pub const PREDICT_FILE_FIELD: &str = "file";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<PredictionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopCustomersQuery {
    #[serde(rename = "topN")]
    pub top_n: u32,
}

/// Any JSON reply from the service: the expected payload or its error envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServiceReply<T> {
    Ok(T),
    Rejected(ServiceErrorBody),
}

/// CSV download endpoints and the filename each download is saved under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportTarget {
    All,
    Tier(ValueTier),
}

impl ExportTarget {
    pub const EVERY: [ExportTarget; 4] = [
        ExportTarget::All,
        ExportTarget::Tier(ValueTier::High),
        ExportTarget::Tier(ValueTier::Medium),
        ExportTarget::Tier(ValueTier::Low),
    ];

    pub fn path(self) -> &'static str {
        match self {
            ExportTarget::All => "/export",
            ExportTarget::Tier(ValueTier::High) => "/exportHigh",
            ExportTarget::Tier(ValueTier::Medium) => "/exportMedium",
            ExportTarget::Tier(ValueTier::Low) => "/exportLow",
        }
    }

    pub fn filename(self) -> &'static str {
        match self {
            ExportTarget::All => "predictions.csv",
            ExportTarget::Tier(ValueTier::High) => "HighValueCustomers.csv",
            ExportTarget::Tier(ValueTier::Medium) => "MediumValueCustomers.csv",
            ExportTarget::Tier(ValueTier::Low) => "LowValueCustomers.csv",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ExportTarget::All => "all",
            ExportTarget::Tier(ValueTier::High) => "high",
            ExportTarget::Tier(ValueTier::Medium) => "medium",
            ExportTarget::Tier(ValueTier::Low) => "low",
        }
    }
}
