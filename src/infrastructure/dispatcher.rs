// Intent dispatcher - the single path through which console state changes
use crate::application::panel_store::{DispatchError, Intent, IntentSink, PanelStore};
use crate::application::platform_source::{LoadError, PlatformSource};
use crate::domain::chart::PointRef;
use crate::domain::panel::{ItemPath, PanelItem};
use crate::domain::series::PointSample;
use crate::infrastructure::console_store::SharedStore;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Sending half handed to views and handlers.
#[derive(Debug, Clone)]
pub struct IntentSender(mpsc::UnboundedSender<Intent>);

impl IntentSink for IntentSender {
    fn dispatch(&self, intent: Intent) -> Result<(), DispatchError> {
        self.0.send(intent).map_err(|_| DispatchError)
    }
}

pub fn intent_channel() -> (IntentSender, mpsc::UnboundedReceiver<Intent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (IntentSender(tx), rx)
}

/// Results of fetches started by intents, fed back into the same loop.
enum Completion {
    ChildrenLoaded {
        path: ItemPath,
        result: Result<Vec<PanelItem>, LoadError>,
    },
    ChartData {
        chart_key: String,
        samples: Vec<PointSample>,
    },
}

pub struct IntentDispatcher {
    store: SharedStore,
    source: Arc<dyn PlatformSource>,
    sample_count: usize,
    intents: mpsc::UnboundedReceiver<Intent>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    changes: watch::Sender<u64>,
    /// Nodes whose in-flight load was started by expand-all.
    expand_all_pending: HashSet<ItemPath>,
}

impl IntentDispatcher {
    /// Returns the dispatcher and a receiver that ticks after every change.
    pub fn new(
        store: SharedStore,
        source: Arc<dyn PlatformSource>,
        sample_count: usize,
        intents: mpsc::UnboundedReceiver<Intent>,
    ) -> (Self, watch::Receiver<u64>) {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (changes, changes_rx) = watch::channel(0);
        let dispatcher = Self {
            store,
            source,
            sample_count,
            intents,
            completions_tx,
            completions,
            changes,
            expand_all_pending: HashSet::new(),
        };
        (dispatcher, changes_rx)
    }

    /// Apply intents and completions one at a time until every sender is gone.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                intent = self.intents.recv() => match intent {
                    Some(intent) => self.apply(intent),
                    None => break,
                },
                Some(completion) = self.completions.recv() => self.complete(completion),
            }
            self.changes.send_modify(|revision| *revision += 1);
        }
        tracing::info!("Intent channel closed, dispatcher stopping");
    }

    fn apply(&mut self, intent: Intent) {
        match intent {
            Intent::ExpandAll(path) => self.expand_all(&path),
            Intent::ToggleItem(path) => {
                if !self.store.write(|s| s.toggle(&path)) {
                    tracing::debug!("Toggle of {} ignored: not loaded", path);
                }
            }
            Intent::LoadChildren { kind, item } => {
                match self.store.write(|s| s.begin_load(&item.path)) {
                    Some(item) => self.spawn_load(item),
                    None => tracing::debug!("Load of {:?} {} skipped", kind, item.path),
                }
            }
            Intent::CheckItem { path, checked } => self.store.write(|s| s.check(&path, checked)),
            Intent::AddToChart(item) => {
                tracing::info!("Adding {} to chart {}", item.path, item.name);
                let joined = self.store.write(|s| {
                    s.add_to_chart(&item)
                        .then(|| s.get_chart(&item.name))
                        .flatten()
                });
                // The chart's own schedule may never tick again; fetch the new series now.
                if let Some(chart) = joined {
                    self.spawn_refresh(item.name.clone(), chart.series);
                }
            }
            Intent::RemoveFromChart(item) => {
                tracing::info!("Removing {} from chart {}", item.path, item.name);
                self.store.write(|s| s.remove_from_chart(&item));
            }
            Intent::RefreshChart { chart_key, series } => self.spawn_refresh(chart_key, series),
            Intent::PinChart(chart_key) => self.store.write(|s| s.toggle_pin(&chart_key)),
        }
    }

    fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::ChildrenLoaded {
                path,
                result: Ok(items),
            } => {
                tracing::debug!("Loaded {} items under {}", items.len(), path);
                self.store.write(|s| s.finish_load(&path, items));
                if self.expand_all_pending.remove(&path) {
                    self.expand_all(&path);
                }
            }
            Completion::ChildrenLoaded {
                path,
                result: Err(e),
            } => {
                tracing::warn!("{}", e);
                self.expand_all_pending.remove(&path);
                self.store.write(|s| s.fail_load(&path, &e));
            }
            Completion::ChartData { chart_key, samples } => {
                self.store.write(|s| s.set_chart_data(&chart_key, samples));
            }
        }
    }

    fn expand_all(&mut self, path: &ItemPath) {
        let expansion = self.store.write(|s| s.expand_all(path));
        self.expand_all_pending.extend(expansion.in_flight);
        for item in expansion.to_load {
            self.expand_all_pending.insert(item.path.clone());
            self.spawn_load(item);
        }
    }

    fn spawn_load(&self, item: PanelItem) {
        let source = self.source.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = source.load_children(&item).await;
            let _ = tx.send(Completion::ChildrenLoaded {
                path: item.path,
                result,
            });
        });
    }

    fn spawn_refresh(&self, chart_key: String, series: Vec<PointRef>) {
        let source = self.source.clone();
        let tx = self.completions_tx.clone();
        let count = self.sample_count;
        tokio::spawn(async move {
            let results = join_all(series.iter().map(|point| source.query_point(point, count))).await;

            let mut samples = Vec::new();
            let mut failures = 0;
            for (point, result) in series.iter().zip(results) {
                match result {
                    Ok(mut rows) => samples.append(&mut rows),
                    Err(e) => {
                        failures += 1;
                        tracing::warn!("Error fetching series {}: {:#}", point.topic, e);
                    }
                }
            }

            if !series.is_empty() && failures == series.len() {
                tracing::warn!("Every series of chart {} failed, keeping previous data", chart_key);
                return;
            }
            let _ = tx.send(Completion::ChartData { chart_key, samples });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::panel_tree::PanelTreeController;
    use crate::domain::panel::PanelItemKind;
    use crate::infrastructure::console_store::ConsoleState;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeSource {
        history_down: AtomicBool,
    }

    fn platform_path(uuid: &str) -> ItemPath {
        ItemPath::root().child(uuid)
    }

    fn temp_path() -> ItemPath {
        platform_path("p1").child("devices").child("ahu").child("Temp")
    }

    #[async_trait]
    impl PlatformSource for FakeSource {
        async fn load_children(&self, item: &PanelItem) -> Result<Vec<PanelItem>, LoadError> {
            match (item.kind, item.path.platform_uuid()) {
                (PanelItemKind::Root, _) => Ok(vec![
                    PanelItem::new(PanelItemKind::Platform, "One", platform_path("p1")).with_uuid("p1"),
                    PanelItem::new(PanelItemKind::Platform, "Broken", platform_path("bad"))
                        .with_uuid("bad"),
                ]),
                (PanelItemKind::Platform, Some("p1")) => {
                    let devices = platform_path("p1").child("devices");
                    let device = devices.child("ahu");
                    Ok(vec![
                        PanelItem::new(PanelItemKind::Type, "Devices", devices)
                            .loaded(vec!["ahu".to_string()]),
                        PanelItem::new(PanelItemKind::Device, "ahu", device.clone())
                            .loaded(vec!["Temp".to_string()]),
                        PanelItem::new(PanelItemKind::Point, "Temp", device.child("Temp"))
                            .with_topic("ahu/Temp")
                            .loaded(Vec::new()),
                    ])
                }
                _ => Err(LoadError::Fetch {
                    path: item.path.to_string(),
                    reason: "platform unreachable".to_string(),
                }),
            }
        }

        async fn query_point(&self, point: &PointRef, count: usize) -> anyhow::Result<Vec<PointSample>> {
            if self.history_down.load(Ordering::SeqCst) {
                anyhow::bail!("historian offline");
            }
            Ok((0..count)
                .map(|i| {
                    PointSample::new(point.topic.clone(), i.to_string(), vec![vec![json!(i), json!(i * 10)]])
                })
                .collect())
        }
    }

    struct Harness {
        store: SharedStore,
        intents: IntentSender,
        changes: watch::Receiver<u64>,
        source: Arc<FakeSource>,
    }

    impl Harness {
        fn start() -> Self {
            let store = SharedStore::new(ConsoleState::new(0));
            let source = Arc::new(FakeSource::default());
            let (intents, rx) = intent_channel();
            let (dispatcher, changes) = IntentDispatcher::new(store.clone(), source.clone(), 3, rx);
            tokio::spawn(dispatcher.run());
            Self {
                store,
                intents,
                changes,
                source,
            }
        }

        async fn wait_for(&mut self, done: impl Fn(&SharedStore) -> bool) {
            let store = self.store.clone();
            let changes = &mut self.changes;
            tokio::time::timeout(Duration::from_secs(5), async move {
                while !done(&store) {
                    changes.changed().await.unwrap();
                }
            })
            .await
            .expect("store never reached the expected state");
        }

        fn item(&self, path: &ItemPath) -> PanelItem {
            self.store.get_item(path).unwrap()
        }
    }

    #[tokio::test]
    async fn test_expand_all_cascades_through_lazy_loads() {
        let mut h = Harness::start();

        h.intents.dispatch(Intent::ExpandAll(ItemPath::root())).unwrap();
        h.wait_for(|s| {
            s.get_item(&temp_path())
                .is_some_and(|item| item.expanded == Some(true))
        })
        .await;

        assert_eq!(h.item(&platform_path("p1")).expanded, Some(true));
        assert_eq!(h.item(&platform_path("p1").child("devices")).expanded, Some(true));
    }

    #[tokio::test]
    async fn test_expand_all_while_loading_cascades_after_load() {
        let mut h = Harness::start();
        let root = PanelItem::root();

        // Both land before the root load completes.
        h.intents
            .dispatch(Intent::LoadChildren {
                kind: root.kind,
                item: root,
            })
            .unwrap();
        h.intents.dispatch(Intent::ExpandAll(ItemPath::root())).unwrap();
        h.wait_for(|s| {
            s.get_item(&temp_path())
                .is_some_and(|item| item.expanded == Some(true))
        })
        .await;

        assert_eq!(h.item(&platform_path("p1")).expanded, Some(true));
    }

    #[tokio::test]
    async fn test_series_joining_a_chart_is_fetched_at_once() {
        let mut h = Harness::start();
        let temp_on = |device: &str| {
            PanelItem::new(
                PanelItemKind::Point,
                "Temp",
                platform_path("p1").child("devices").child(device).child("Temp"),
            )
            .with_topic(format!("{}/Temp", device))
            .loaded(Vec::new())
        };

        h.intents.dispatch(Intent::AddToChart(temp_on("ahu1"))).unwrap();
        h.intents.dispatch(Intent::AddToChart(temp_on("ahu2"))).unwrap();
        h.wait_for(|s| s.get_chart_series_data("Temp").len() == 6).await;

        h.intents.dispatch(Intent::RemoveFromChart(temp_on("ahu2"))).unwrap();
        h.wait_for(|s| s.get_chart_series_data("Temp").len() == 3).await;
        assert!(h
            .store
            .get_chart_series_data("Temp")
            .iter()
            .all(|sample| sample.parent_key == "ahu1/Temp"));
    }

    #[tokio::test]
    async fn test_failed_load_returns_node_to_unloaded() {
        let mut h = Harness::start();
        let root = PanelItem::root();
        h.intents
            .dispatch(Intent::LoadChildren {
                kind: root.kind,
                item: root,
            })
            .unwrap();
        h.wait_for(|s| s.get_item(&platform_path("bad")).is_some()).await;

        let broken = h.item(&platform_path("bad"));
        h.intents
            .dispatch(Intent::LoadChildren {
                kind: broken.kind,
                item: broken,
            })
            .unwrap();
        h.wait_for(|s| {
            s.get_item(&platform_path("bad"))
                .is_some_and(|item| item.load_error.is_some())
        })
        .await;

        let broken = h.item(&platform_path("bad"));
        assert_eq!(broken.expanded, None);
        assert!(!broken.loading);
        assert!(broken.load_error.unwrap().contains("platform unreachable"));
    }

    #[tokio::test]
    async fn test_check_and_refresh_populate_chart() {
        let mut h = Harness::start();
        h.intents.dispatch(Intent::ExpandAll(ItemPath::root())).unwrap();
        h.wait_for(|s| s.get_item(&temp_path()).is_some()).await;

        PanelTreeController::new(&h.store, &h.intents)
            .check(&temp_path(), true)
            .unwrap();
        h.wait_for(|s| s.get_chart("Temp").is_some()).await;
        assert!(h.item(&temp_path()).checked);

        let series = h.store.get_chart("Temp").unwrap().series;
        h.intents
            .dispatch(Intent::RefreshChart {
                chart_key: "Temp".to_string(),
                series: series.clone(),
            })
            .unwrap();
        h.wait_for(|s| s.get_chart_series_data("Temp").len() == 3).await;

        h.source.history_down.store(true, Ordering::SeqCst);
        h.intents
            .dispatch(Intent::RefreshChart {
                chart_key: "Temp".to_string(),
                series,
            })
            .unwrap();
        h.intents.dispatch(Intent::PinChart("Temp".to_string())).unwrap();
        h.wait_for(|s| s.get_chart("Temp").is_some_and(|c| c.pinned)).await;
        assert_eq!(h.store.get_chart_series_data("Temp").len(), 3);

        PanelTreeController::new(&h.store, &h.intents)
            .check(&temp_path(), false)
            .unwrap();
        h.wait_for(|s| s.get_chart("Temp").is_none()).await;
        assert!(!h.item(&temp_path()).checked);
    }
}
