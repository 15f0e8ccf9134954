// Chart refresh scheduler - one re-arming timer per chart
use crate::domain::chart::ChartConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Drives periodic refreshes of a single chart.
///
/// The first tick fires immediately. The next one is armed only after the
/// previous tick has returned, so ticks for one chart never overlap. Every
/// tick re-reads the chart through `chart`, so series added or removed
/// between ticks are seen without restarting.
#[derive(Default)]
pub struct ChartRefreshScheduler {
    task: Option<JoinHandle<()>>,
    stopped: Arc<AtomicBool>,
}

impl ChartRefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking. A previous schedule on this instance is cancelled first.
    ///
    /// `chart` returning `None` means the chart is gone and ends the
    /// schedule. Errors from `on_tick` are logged and do not stop it.
    pub fn start<C, F>(&mut self, chart: C, mut on_tick: F)
    where
        C: Fn() -> Option<ChartConfig> + Send + 'static,
        F: FnMut(&ChartConfig) -> anyhow::Result<()> + Send + 'static,
    {
        self.stop();

        let stopped = Arc::new(AtomicBool::new(false));
        self.stopped = stopped.clone();

        self.task = Some(tokio::spawn(async move {
            let mut delay = Duration::ZERO;
            loop {
                tokio::time::sleep(delay).await;
                if stopped.load(Ordering::Acquire) {
                    break;
                }

                let Some(config) = chart() else {
                    tracing::debug!("Chart no longer exists, ending refresh schedule");
                    break;
                };

                if !config.series.is_empty() {
                    if let Err(e) = on_tick(&config) {
                        tracing::warn!("Chart refresh failed: {:#}", e);
                    }
                }

                match config.refresh_interval() {
                    Some(interval) => delay = interval,
                    None => break,
                }
            }
        }));
    }

    /// Cancel any pending tick. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ChartRefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
