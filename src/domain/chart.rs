// Chart configuration domain model
use super::panel::{ItemPath, PanelItem};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reference from a chart to the point node it plots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRef {
    pub path: ItemPath,
    pub name: String,
    pub topic: String,
    pub platform_uuid: Option<String>,
}

impl PointRef {
    pub fn from_item(item: &PanelItem) -> Self {
        Self {
            path: item.path.clone(),
            name: item.name.clone(),
            topic: item.topic.clone().unwrap_or_else(|| item.name.clone()),
            platform_uuid: item.path.platform_uuid().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub series: Vec<PointRef>,
    pub pinned: bool,
    /// Zero or absent means refresh once.
    pub refresh_interval_ms: Option<u64>,
}

impl ChartConfig {
    pub fn new(refresh_interval_ms: Option<u64>) -> Self {
        Self {
            series: Vec::new(),
            pinned: false,
            refresh_interval_ms,
        }
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Chart title: the first series' name, once there is one.
    pub fn title(&self) -> Option<&str> {
        self.series.first().map(|s| s.name.as_str())
    }
}
