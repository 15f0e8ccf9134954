// Line-chart document renderer - the drawing boundary for browser clients
use crate::application::chart_assembly::{ChartRenderer, RenderHandle};
use crate::domain::series::SeriesGroup;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

const X_TICK_FORMAT: &str = "f";
const Y_TICK_FORMAT: &str = ".1f";

/// Everything a client-side line chart needs to paint one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChartDocument {
    pub anchor: String,
    pub x_tick_format: &'static str,
    pub y_tick_format: &'static str,
    pub interactive_guideline: bool,
    /// Bumped by every update after the initial draw.
    pub revision: u64,
    pub data: Vec<SeriesGroup>,
}

/// Documents by handle, readable from request handlers.
#[derive(Debug, Clone, Default)]
pub struct FrameRegistry(Arc<RwLock<HashMap<RenderHandle, LineChartDocument>>>);

impl FrameRegistry {
    pub fn by_anchor(&self, anchor: &str) -> Option<LineChartDocument> {
        self.0.read().values().find(|doc| doc.anchor == anchor).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }
}

#[derive(Debug, Default)]
pub struct FrameRenderer {
    frames: FrameRegistry,
    next_handle: u64,
}

impl FrameRenderer {
    pub fn new(frames: FrameRegistry) -> Self {
        Self {
            frames,
            next_handle: 0,
        }
    }
}

impl ChartRenderer for FrameRenderer {
    fn draw(&mut self, anchor: &str, data: &[SeriesGroup]) -> anyhow::Result<RenderHandle> {
        self.next_handle += 1;
        let handle = RenderHandle(self.next_handle);
        self.frames.0.write().insert(
            handle,
            LineChartDocument {
                anchor: anchor.to_string(),
                x_tick_format: X_TICK_FORMAT,
                y_tick_format: Y_TICK_FORMAT,
                interactive_guideline: true,
                revision: 0,
                data: data.to_vec(),
            },
        );
        tracing::debug!("Drew chart {} as {:?}", anchor, handle);
        Ok(handle)
    }

    fn update(&mut self, handle: RenderHandle, data: &[SeriesGroup]) -> anyhow::Result<()> {
        let mut frames = self.frames.0.write();
        let doc = frames
            .get_mut(&handle)
            .ok_or_else(|| anyhow::anyhow!("No drawn chart for {:?}", handle))?;
        doc.data = data.to_vec();
        doc.revision += 1;
        Ok(())
    }

    fn release(&mut self, handle: RenderHandle) {
        self.frames.0.write().remove(&handle);
    }
}
