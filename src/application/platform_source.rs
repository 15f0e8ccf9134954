// Data source trait for lazy-loaded tree children and historian samples
use crate::domain::chart::PointRef;
use crate::domain::panel::PanelItem;
use crate::domain::series::PointSample;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("node {0} cannot be loaded: it is not under a platform")]
    NoPlatform(String),
    #[error("failed to load children of {path}: {reason}")]
    Fetch { path: String, reason: String },
}

#[async_trait]
pub trait PlatformSource: Send + Sync {
    /// Fetch every item below `item` that becomes known by expanding it.
    ///
    /// Items come back flat, with full paths; direct children are the ones
    /// one level below `item.path`.
    async fn load_children(&self, item: &PanelItem) -> Result<Vec<PanelItem>, LoadError>;

    /// Latest historian rows for one point, one sample per row.
    async fn query_point(&self, point: &PointRef, count: usize) -> anyhow::Result<Vec<PointSample>>;
}
