use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag attached to one predict call and every fetch derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCustomerId {
    Text(String),
    Integer(i64),
}

/// Customer identifier as reported by the prediction service.
///
/// The service emits integer ids; string ids are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawCustomerId", into = "String")]
pub struct CustomerId(pub String);

impl From<RawCustomerId> for CustomerId {
    fn from(value: RawCustomerId) -> Self {
        match value {
            RawCustomerId::Text(text) => Self(text),
            RawCustomerId::Integer(id) => Self(id.to_string()),
        }
    }
}

impl From<CustomerId> for String {
    fn from(value: CustomerId) -> Self {
        value.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(rename = "CustomerID")]
    pub customer_id: CustomerId,
    #[serde(rename = "Prediction")]
    pub prediction: f64,
}

/// Non-empty, ordered predictions from one upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionSet(Vec<PredictionRecord>);

impl PredictionSet {
    pub fn new(records: Vec<PredictionRecord>) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Self(records))
        }
    }

    pub fn records(&self) -> &[PredictionRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub count: u64,
    pub mean: f64,
    pub p90: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p50: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p75: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTier {
    High,
    Medium,
    Low,
}

impl ValueTier {
    pub const ALL: [ValueTier; 3] = [ValueTier::High, ValueTier::Medium, ValueTier::Low];

    pub fn label(self) -> &'static str {
        match self {
            ValueTier::High => "High Value",
            ValueTier::Medium => "Medium Value",
            ValueTier::Low => "Low Value",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSummary {
    pub count: u64,
    pub threshold: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBreakdown {
    pub high_value: TierSummary,
    pub medium_value: TierSummary,
    pub low_value: TierSummary,
}

impl TierBreakdown {
    pub fn tier(&self, tier: ValueTier) -> &TierSummary {
        match tier {
            ValueTier::High => &self.high_value,
            ValueTier::Medium => &self.medium_value,
            ValueTier::Low => &self.low_value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub p75: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationReport {
    pub segmentation: TierBreakdown,
    pub thresholds: Thresholds,
}

/// Rank-ordered customers; index 0 is rank 1.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopCustomersList(pub Vec<PredictionRecord>);

impl TopCustomersList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ranked(&self) -> impl Iterator<Item = (usize, &PredictionRecord)> {
        self.0.iter().enumerate().map(|(index, record)| (index + 1, record))
    }
}

/// Validated top-N request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopN(u32);

impl TopN {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;
    pub const DEFAULT: TopN = TopN(10);

    /// Clamps raw user input into `[MIN, MAX]`. The flag reports whether clamping happened.
    pub fn clamped(raw: i64) -> (Self, bool) {
        let bounded = raw.clamp(i64::from(Self::MIN), i64::from(Self::MAX));
        (Self(bounded as u32), bounded != raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for TopN {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for TopN {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
