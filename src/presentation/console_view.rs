// Console view loop - re-derives the panel tree and charts on every store change
use crate::application::chart_assembly::{ChartAssembly, ChartFrame, ChartRenderer};
use crate::application::panel_store::{IntentSink, PanelStore};
use crate::application::panel_tree::{render_tree, PanelNodeView};
use crate::domain::panel::ItemPath;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;

/// What the console currently shows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsoleSnapshot {
    pub tree: Option<PanelNodeView>,
    /// Pinned charts first.
    pub charts: Vec<ChartFrame>,
}

pub struct ConsoleView<R: ChartRenderer> {
    store: Arc<dyn PanelStore>,
    intents: Arc<dyn IntentSink>,
    renderer: R,
    assemblies: BTreeMap<String, ChartAssembly>,
    snapshot: Arc<RwLock<ConsoleSnapshot>>,
}

impl<R: ChartRenderer> ConsoleView<R> {
    pub fn new(store: Arc<dyn PanelStore>, intents: Arc<dyn IntentSink>, renderer: R) -> Self {
        Self {
            store,
            intents,
            renderer,
            assemblies: BTreeMap::new(),
            snapshot: Arc::new(RwLock::new(ConsoleSnapshot::default())),
        }
    }

    pub fn snapshot(&self) -> Arc<RwLock<ConsoleSnapshot>> {
        self.snapshot.clone()
    }

    /// Mount charts that appeared, unmount charts that went away, then
    /// redraw everything from the store.
    pub fn refresh(&mut self) {
        let keys: HashSet<String> = self.store.chart_keys().into_iter().collect();

        let gone: Vec<String> = self
            .assemblies
            .keys()
            .filter(|key| !keys.contains(*key))
            .cloned()
            .collect();
        for key in gone {
            if let Some(assembly) = self.assemblies.remove(&key) {
                assembly.unmount(&mut self.renderer);
            }
        }

        for key in keys {
            if !self.assemblies.contains_key(&key) {
                let assembly = ChartAssembly::mount(key.clone(), self.store.clone(), self.intents.clone());
                self.assemblies.insert(key, assembly);
            }
        }

        let mut charts: Vec<ChartFrame> = Vec::with_capacity(self.assemblies.len());
        for assembly in self.assemblies.values_mut() {
            if let Some(frame) = assembly.redraw(self.store.as_ref(), &mut self.renderer) {
                charts.push(frame);
            }
        }
        charts.sort_by_key(|frame| !frame.pinned);

        let tree = render_tree(self.store.as_ref(), &ItemPath::root());
        *self.snapshot.write() = ConsoleSnapshot { tree, charts };
    }

    /// Refresh on every change until the dispatcher goes away.
    pub async fn run(mut self, mut changes: watch::Receiver<u64>) {
        self.refresh();
        while changes.changed().await.is_ok() {
            self.refresh();
        }

        for (_, assembly) in std::mem::take(&mut self.assemblies) {
            assembly.unmount(&mut self.renderer);
        }
        tracing::info!("Console view stopped");
    }
}
