// Store read interface and intents - the only ways the core touches console state
use crate::domain::chart::{ChartConfig, PointRef};
use crate::domain::panel::{ItemPath, PanelItem, PanelItemKind};
use crate::domain::series::PointSample;

/// Read side of the system of record. Nodes and charts re-derive everything
/// they display from here; they never keep their own copy.
pub trait PanelStore: Send + Sync {
    fn get_item(&self, path: &ItemPath) -> Option<PanelItem>;

    /// Children of `parent` in the order the parent lists them.
    fn get_children(&self, parent: &PanelItem) -> Vec<PanelItem>;

    fn get_chart(&self, chart_key: &str) -> Option<ChartConfig>;

    fn chart_keys(&self) -> Vec<String>;

    fn get_chart_series_data(&self, chart_key: &str) -> Vec<PointSample>;
}

/// User intents. Fire-and-forget: the dispatcher applies them in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    ExpandAll(ItemPath),
    ToggleItem(ItemPath),
    LoadChildren { kind: PanelItemKind, item: PanelItem },
    CheckItem { path: ItemPath, checked: bool },
    AddToChart(PanelItem),
    RemoveFromChart(PanelItem),
    RefreshChart { chart_key: String, series: Vec<PointRef> },
    PinChart(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("intent dispatcher has shut down")]
pub struct DispatchError;

pub trait IntentSink: Send + Sync {
    fn dispatch(&self, intent: Intent) -> Result<(), DispatchError>;
}
