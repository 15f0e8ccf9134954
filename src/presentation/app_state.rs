// Application state for HTTP handlers
use crate::infrastructure::console_store::SharedStore;
use crate::infrastructure::dispatcher::IntentSender;
use crate::infrastructure::frame_renderer::FrameRegistry;
use crate::presentation::console_view::ConsoleSnapshot;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub intents: IntentSender,
    pub snapshot: Arc<RwLock<ConsoleSnapshot>>,
    pub frames: FrameRegistry,
}
