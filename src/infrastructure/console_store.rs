// Console store - system of record for panel items, charts and chart data
use crate::application::panel_store::PanelStore;
use crate::application::platform_source::LoadError;
use crate::domain::chart::{ChartConfig, PointRef};
use crate::domain::panel::{ItemPath, PanelItem};
use crate::domain::series::PointSample;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Outcome of an expand-all pass.
#[derive(Debug, Default)]
pub struct ExpandAll {
    /// Unloaded nodes now marked loading; the caller fetches them.
    pub to_load: Vec<PanelItem>,
    /// Nodes whose load was already running.
    pub in_flight: Vec<ItemPath>,
}

/// Panel and chart state. Mutated only by the intent dispatcher.
#[derive(Debug)]
pub struct ConsoleState {
    items: HashMap<ItemPath, PanelItem>,
    charts: BTreeMap<String, ChartConfig>,
    chart_data: HashMap<String, Vec<PointSample>>,
    default_refresh_interval_ms: u64,
}

impl ConsoleState {
    pub fn new(default_refresh_interval_ms: u64) -> Self {
        let root = PanelItem::root();
        let mut items = HashMap::new();
        items.insert(root.path.clone(), root);
        Self {
            items,
            charts: BTreeMap::new(),
            chart_data: HashMap::new(),
            default_refresh_interval_ms,
        }
    }

    /// Mark `path` as loading. Returns the item to load, or `None` when the
    /// node is unknown, already loaded or already loading.
    pub fn begin_load(&mut self, path: &ItemPath) -> Option<PanelItem> {
        let item = self.items.get_mut(path)?;
        if item.children_loaded() || item.loading {
            return None;
        }
        item.loading = true;
        item.load_error = None;
        Some(item.clone())
    }

    /// Install loaded descendants and expand the node.
    pub fn finish_load(&mut self, path: &ItemPath, loaded: Vec<PanelItem>) {
        let mut children = Vec::new();
        for mut item in loaded {
            if item.path.parent().as_ref() == Some(path) {
                if let Some(key) = item.path.key() {
                    children.push(key.to_string());
                }
            }
            if let Some(existing) = self.items.get(&item.path) {
                item.checked = existing.checked;
            }
            self.items.insert(item.path.clone(), item);
        }

        if let Some(parent) = self.items.get_mut(path) {
            parent.children = children;
            parent.expanded = Some(true);
            parent.loading = false;
            parent.load_error = None;
        }
    }

    /// Put a failed node back to unloaded so another toggle retries.
    pub fn fail_load(&mut self, path: &ItemPath, error: &LoadError) {
        if let Some(item) = self.items.get_mut(path) {
            item.expanded = None;
            item.loading = false;
            item.load_error = Some(error.to_string());
        }
    }

    /// Flip a loaded node between expanded and collapsed.
    pub fn toggle(&mut self, path: &ItemPath) -> bool {
        match self.items.get_mut(path) {
            Some(PanelItem {
                expanded: Some(expanded),
                loading: false,
                ..
            }) => {
                *expanded = !*expanded;
                true
            }
            _ => false,
        }
    }

    /// Expand `path` and every loaded descendant. Unloaded nodes on the way
    /// are marked loading and returned for the caller to fetch; nodes whose
    /// load is already in flight are returned so the caller can resume the
    /// expansion once they land.
    pub fn expand_all(&mut self, path: &ItemPath) -> ExpandAll {
        let mut expansion = ExpandAll::default();
        self.expand_subtree(path, &mut expansion);
        expansion
    }

    fn expand_subtree(&mut self, path: &ItemPath, expansion: &mut ExpandAll) {
        let Some(item) = self.items.get_mut(path) else {
            return;
        };
        if item.loading {
            expansion.in_flight.push(path.clone());
            return;
        }
        if !item.children_loaded() {
            if let Some(item) = self.begin_load(path) {
                expansion.to_load.push(item);
            }
            return;
        }

        item.expanded = Some(true);
        let children: Vec<ItemPath> = item
            .children
            .iter()
            .map(|key| path.child(key.as_str()))
            .collect();
        for child in children {
            self.expand_subtree(&child, expansion);
        }
    }

    pub fn check(&mut self, path: &ItemPath, checked: bool) {
        if let Some(item) = self.items.get_mut(path) {
            item.checked = checked;
        }
    }

    /// Charts are keyed by point name; a series appears at most once.
    ///
    /// Returns true when the series joined a chart that already existed.
    pub fn add_to_chart(&mut self, item: &PanelItem) -> bool {
        let refresh_interval_ms = self.default_refresh_interval_ms;
        let existed = self.charts.contains_key(&item.name);
        let chart = self
            .charts
            .entry(item.name.clone())
            .or_insert_with(|| ChartConfig::new(Some(refresh_interval_ms)));
        if chart.series.iter().any(|s| s.path == item.path) {
            return false;
        }
        chart.series.push(PointRef::from_item(item));
        existed
    }

    /// Drop the series and its samples; a chart left with no series is removed.
    pub fn remove_from_chart(&mut self, item: &PanelItem) {
        let Some(chart) = self.charts.get_mut(&item.name) else {
            return;
        };
        chart.series.retain(|s| s.path != item.path);
        let remaining: HashSet<String> = chart.series.iter().map(|s| s.topic.clone()).collect();

        if remaining.is_empty() {
            self.charts.remove(&item.name);
            self.chart_data.remove(&item.name);
        } else if let Some(samples) = self.chart_data.get_mut(&item.name) {
            samples.retain(|sample| remaining.contains(&sample.parent_key));
        }
    }

    /// Replace a chart's samples, keeping only those of its current series.
    pub fn set_chart_data(&mut self, chart_key: &str, mut samples: Vec<PointSample>) {
        let Some(chart) = self.charts.get(chart_key) else {
            return;
        };
        let topics: HashSet<&str> = chart.series.iter().map(|s| s.topic.as_str()).collect();
        samples.retain(|sample| topics.contains(sample.parent_key.as_str()));
        self.chart_data.insert(chart_key.to_string(), samples);
    }

    pub fn toggle_pin(&mut self, chart_key: &str) {
        if let Some(chart) = self.charts.get_mut(chart_key) {
            chart.pinned = !chart.pinned;
        }
    }
}

impl PanelStore for ConsoleState {
    fn get_item(&self, path: &ItemPath) -> Option<PanelItem> {
        self.items.get(path).cloned()
    }

    fn get_children(&self, parent: &PanelItem) -> Vec<PanelItem> {
        parent
            .children
            .iter()
            .filter_map(|key| self.items.get(&parent.path.child(key.as_str())).cloned())
            .collect()
    }

    fn get_chart(&self, chart_key: &str) -> Option<ChartConfig> {
        self.charts.get(chart_key).cloned()
    }

    fn chart_keys(&self) -> Vec<String> {
        self.charts.keys().cloned().collect()
    }

    fn get_chart_series_data(&self, chart_key: &str) -> Vec<PointSample> {
        self.chart_data.get(chart_key).cloned().unwrap_or_default()
    }
}

/// Shared handle to the console state.
#[derive(Debug, Clone)]
pub struct SharedStore(Arc<RwLock<ConsoleState>>);

impl SharedStore {
    pub fn new(state: ConsoleState) -> Self {
        Self(Arc::new(RwLock::new(state)))
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut ConsoleState) -> R) -> R {
        f(&mut self.0.write())
    }
}

impl PanelStore for SharedStore {
    fn get_item(&self, path: &ItemPath) -> Option<PanelItem> {
        self.0.read().get_item(path)
    }

    fn get_children(&self, parent: &PanelItem) -> Vec<PanelItem> {
        self.0.read().get_children(parent)
    }

    fn get_chart(&self, chart_key: &str) -> Option<ChartConfig> {
        self.0.read().get_chart(chart_key)
    }

    fn chart_keys(&self) -> Vec<String> {
        self.0.read().chart_keys()
    }

    fn get_chart_series_data(&self, chart_key: &str) -> Vec<PointSample> {
        self.0.read().get_chart_series_data(chart_key)
    }
}
