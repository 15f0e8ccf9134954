// Chart assembly - ties one chart's config, refresh schedule, reshaped data
// and render handle together
use crate::application::panel_store::{DispatchError, Intent, IntentSink, PanelStore};
use crate::application::refresh_scheduler::ChartRefreshScheduler;
use crate::application::reshaper::reshape;
use crate::domain::series::SeriesGroup;
use serde::Serialize;
use std::sync::Arc;

/// Opaque handle to one drawn chart, owned by the chart that drew it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RenderHandle(pub u64);

/// Drawing boundary. `draw` is called once per chart; later redraws go
/// through `update` with the handle it returned.
pub trait ChartRenderer {
    fn draw(&mut self, anchor: &str, data: &[SeriesGroup]) -> anyhow::Result<RenderHandle>;
    fn update(&mut self, handle: RenderHandle, data: &[SeriesGroup]) -> anyhow::Result<()>;
    fn release(&mut self, handle: RenderHandle);
}

/// The chart frame: title and pin control, plus the line chart when there
/// is data to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFrame {
    pub chart_key: String,
    pub title: String,
    pub anchor: String,
    pub pinned: bool,
    pub line_chart: Option<Vec<SeriesGroup>>,
    pub handle: Option<RenderHandle>,
}

/// Pin control: asks the chart list to pin or unpin. Reshaped data is
/// untouched.
pub fn toggle_pin(intents: &dyn IntentSink, chart_key: &str) -> Result<(), DispatchError> {
    intents.dispatch(Intent::PinChart(chart_key.to_string()))
}

/// DOM anchor for a chart title: `"A / B"` becomes `"A_B_chart"`.
pub fn chart_anchor(title: &str) -> String {
    format!("{}_chart", title.replacen(" / ", "_", 1))
}

pub struct ChartAssembly {
    chart_key: String,
    scheduler: ChartRefreshScheduler,
    handle: Option<RenderHandle>,
    last_good: Vec<SeriesGroup>,
}

impl ChartAssembly {
    /// Mount a chart: starts its refresh schedule, first tick immediately.
    pub fn mount(
        chart_key: impl Into<String>,
        store: Arc<dyn PanelStore>,
        intents: Arc<dyn IntentSink>,
    ) -> Self {
        let chart_key = chart_key.into();
        let mut scheduler = ChartRefreshScheduler::new();

        let reader_key = chart_key.clone();
        let tick_key = chart_key.clone();
        scheduler.start(
            move || store.get_chart(&reader_key),
            move |chart| {
                intents.dispatch(Intent::RefreshChart {
                    chart_key: tick_key.clone(),
                    series: chart.series.clone(),
                })?;
                Ok(())
            },
        );

        tracing::debug!("Mounted chart {}", chart_key);
        Self {
            chart_key,
            scheduler,
            handle: None,
            last_good: Vec::new(),
        }
    }

    pub fn chart_key(&self) -> &str {
        &self.chart_key
    }

    /// Re-derive the frame from the store and push it through the renderer.
    ///
    /// Returns `None` while the chart has no series to name it. A reshape
    /// failure keeps the last good series set on screen.
    pub fn redraw(
        &mut self,
        store: &dyn PanelStore,
        renderer: &mut dyn ChartRenderer,
    ) -> Option<ChartFrame> {
        let chart = store.get_chart(&self.chart_key)?;
        let title = chart.title()?.to_string();
        let anchor = chart_anchor(&title);

        match reshape(&store.get_chart_series_data(&self.chart_key)) {
            Ok(series) => self.last_good = series,
            Err(e) => {
                tracing::warn!(
                    "Keeping last good data for chart {}: {}",
                    self.chart_key,
                    e
                );
            }
        }

        if !self.last_good.is_empty() {
            self.paint(&anchor, renderer);
        } else if let Some(handle) = self.handle.take() {
            // Nothing left to show; the next data redraws from scratch.
            renderer.release(handle);
        }

        Some(ChartFrame {
            chart_key: self.chart_key.clone(),
            title,
            anchor,
            pinned: chart.pinned,
            line_chart: (!self.last_good.is_empty()).then(|| self.last_good.clone()),
            handle: self.handle,
        })
    }

    fn paint(&mut self, anchor: &str, renderer: &mut dyn ChartRenderer) {
        let result = match self.handle {
            Some(handle) => renderer.update(handle, &self.last_good),
            None => renderer.draw(anchor, &self.last_good).map(|handle| {
                self.handle = Some(handle);
            }),
        };
        if let Err(e) = result {
            tracing::error!("Failed to render chart {}: {:#}", self.chart_key, e);
        }
    }

    /// Tear down: stop the schedule and drop the render handle.
    pub fn unmount(mut self, renderer: &mut dyn ChartRenderer) {
        self.scheduler.stop();
        if let Some(handle) = self.handle.take() {
            renderer.release(handle);
        }
        tracing::debug!("Unmounted chart {}", self.chart_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::{ChartConfig, PointRef};
    use crate::domain::panel::{ItemPath, PanelItem};
    use crate::domain::series::PointSample;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct ChartOnlyStore {
        charts: Mutex<HashMap<String, ChartConfig>>,
        data: Mutex<HashMap<String, Vec<PointSample>>>,
    }

    impl PanelStore for ChartOnlyStore {
        fn get_item(&self, _path: &ItemPath) -> Option<PanelItem> {
            None
        }

        fn get_children(&self, _parent: &PanelItem) -> Vec<PanelItem> {
            Vec::new()
        }

        fn get_chart(&self, chart_key: &str) -> Option<ChartConfig> {
            self.charts.lock().get(chart_key).cloned()
        }

        fn chart_keys(&self) -> Vec<String> {
            self.charts.lock().keys().cloned().collect()
        }

        fn get_chart_series_data(&self, chart_key: &str) -> Vec<PointSample> {
            self.data.lock().get(chart_key).cloned().unwrap_or_default()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        intents: Mutex<Vec<Intent>>,
    }

    impl IntentSink for RecordingSink {
        fn dispatch(&self, intent: Intent) -> Result<(), DispatchError> {
            self.intents.lock().push(intent);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        draws: Vec<String>,
        updates: Vec<RenderHandle>,
        released: Vec<RenderHandle>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn draw(&mut self, anchor: &str, _data: &[SeriesGroup]) -> anyhow::Result<RenderHandle> {
            self.draws.push(anchor.to_string());
            Ok(RenderHandle(self.draws.len() as u64))
        }

        fn update(&mut self, handle: RenderHandle, _data: &[SeriesGroup]) -> anyhow::Result<()> {
            self.updates.push(handle);
            Ok(())
        }

        fn release(&mut self, handle: RenderHandle) {
            self.released.push(handle);
        }
    }

    fn series(name: &str) -> PointRef {
        PointRef {
            path: ItemPath::root().child("p1").child(name),
            name: name.to_string(),
            topic: format!("campus/ahu/{}", name),
            platform_uuid: Some("p1".to_string()),
        }
    }

    fn store_with_chart(key: &str, interval_ms: Option<u64>) -> Arc<ChartOnlyStore> {
        let store = Arc::new(ChartOnlyStore::default());
        let mut chart = ChartConfig::new(interval_ms);
        chart.series.push(series(key));
        store.charts.lock().insert(key.to_string(), chart);
        store
    }

    fn set_data(store: &ChartOnlyStore, key: &str, y: serde_json::Value) {
        store.data.lock().insert(
            key.to_string(),
            vec![PointSample::new(format!("campus/ahu/{}", key), "1", vec![vec![json!(1), y]])],
        );
    }

    #[test]
    fn test_chart_anchor() {
        assert_eq!(chart_anchor("Building / Zone"), "Building_Zone_chart");
        assert_eq!(chart_anchor("Temp"), "Temp_chart");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_refreshes_immediately_and_unmount_stops() {
        let store = store_with_chart("Temp", Some(1_000));
        let sink = Arc::new(RecordingSink::default());

        let assembly = ChartAssembly::mount("Temp", store.clone(), sink.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            *sink.intents.lock(),
            vec![Intent::RefreshChart {
                chart_key: "Temp".to_string(),
                series: vec![series("Temp")],
            }]
        );

        let mut renderer = RecordingRenderer::default();
        assembly.unmount(&mut renderer);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sink.intents.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_redraw_draws_then_updates() {
        let store = store_with_chart("Temp", None);
        let sink = Arc::new(RecordingSink::default());
        let mut renderer = RecordingRenderer::default();
        let mut assembly = ChartAssembly::mount("Temp", store.clone(), sink);

        let empty = assembly.redraw(store.as_ref(), &mut renderer).unwrap();
        assert_eq!(empty.title, "Temp");
        assert_eq!(empty.line_chart, None);
        assert!(renderer.draws.is_empty());

        set_data(&store, "Temp", json!(21.5));
        let first = assembly.redraw(store.as_ref(), &mut renderer).unwrap();
        let second = assembly.redraw(store.as_ref(), &mut renderer).unwrap();

        assert_eq!(renderer.draws, vec!["Temp_chart".to_string()]);
        assert_eq!(renderer.updates, vec![RenderHandle(1)]);
        assert_eq!(first.handle, Some(RenderHandle(1)));
        assert_eq!(second.line_chart.unwrap()[0].values[0].y, 21.5);

        assembly.unmount(&mut renderer);
        assert_eq!(renderer.released, vec![RenderHandle(1)]);
    }

    #[tokio::test]
    async fn test_emptied_chart_releases_its_drawing() {
        let store = store_with_chart("Temp", None);
        let mut renderer = RecordingRenderer::default();
        let mut assembly =
            ChartAssembly::mount("Temp", store.clone(), Arc::new(RecordingSink::default()));

        set_data(&store, "Temp", json!(20));
        assembly.redraw(store.as_ref(), &mut renderer).unwrap();
        store.data.lock().remove("Temp");
        let emptied = assembly.redraw(store.as_ref(), &mut renderer).unwrap();

        assert_eq!(emptied.line_chart, None);
        assert_eq!(emptied.handle, None);
        assert_eq!(renderer.released, vec![RenderHandle(1)]);

        set_data(&store, "Temp", json!(21));
        let redrawn = assembly.redraw(store.as_ref(), &mut renderer).unwrap();
        assert_eq!(redrawn.handle, Some(RenderHandle(2)));
        assert_eq!(renderer.draws.len(), 2);
    }

    #[tokio::test]
    async fn test_reshape_failure_keeps_last_good_series() {
        let store = store_with_chart("Temp", None);
        let mut renderer = RecordingRenderer::default();
        let mut assembly =
            ChartAssembly::mount("Temp", store.clone(), Arc::new(RecordingSink::default()));

        set_data(&store, "Temp", json!(20));
        let good = assembly.redraw(store.as_ref(), &mut renderer).unwrap();
        set_data(&store, "Temp", json!("sensor fault"));
        let after = assembly.redraw(store.as_ref(), &mut renderer).unwrap();

        assert_eq!(after.line_chart, good.line_chart);
    }

    #[tokio::test]
    async fn test_no_frame_without_chart_or_series() {
        let store = Arc::new(ChartOnlyStore::default());
        let mut renderer = RecordingRenderer::default();
        let mut assembly =
            ChartAssembly::mount("Gone", store.clone(), Arc::new(RecordingSink::default()));

        assert_eq!(assembly.redraw(store.as_ref(), &mut renderer), None);

        store
            .charts
            .lock()
            .insert("Gone".to_string(), ChartConfig::new(None));
        assert_eq!(assembly.redraw(store.as_ref(), &mut renderer), None);
    }

    #[tokio::test]
    async fn test_pin_dispatches_intent_without_touching_data() {
        let store = store_with_chart("Temp", None);
        let sink = RecordingSink::default();
        let mut renderer = RecordingRenderer::default();
        let mut assembly =
            ChartAssembly::mount("Temp", store.clone(), Arc::new(RecordingSink::default()));
        set_data(&store, "Temp", json!(1));
        let before = assembly.redraw(store.as_ref(), &mut renderer).unwrap();

        toggle_pin(&sink, assembly.chart_key()).unwrap();

        assert_eq!(*sink.intents.lock(), vec![Intent::PinChart("Temp".to_string())]);
        let after = assembly.redraw(store.as_ref(), &mut renderer).unwrap();
        assert_eq!(after.line_chart, before.line_chart);
    }
}
