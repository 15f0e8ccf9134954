// Time series domain models - raw point samples and renderable series
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One raw measurement batch as produced by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSample {
    pub parent_key: String,
    /// Numeric-as-string bucket key, e.g. an epoch-ms timestamp.
    pub sample_key: String,
    /// Rows of `[timestamp-or-index, value]`; cells are loosely typed.
    pub values: Vec<Vec<Value>>,
}

impl PointSample {
    pub fn new(parent_key: impl Into<String>, sample_key: impl Into<String>, values: Vec<Vec<Value>>) -> Self {
        Self {
            parent_key: parent_key.into(),
            sample_key: sample_key.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XY {
    pub x: f64,
    pub y: f64,
}

/// One renderable line. Rebuilt from samples on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesGroup {
    pub key: String,
    pub color: String,
    pub values: Vec<XY>,
}
