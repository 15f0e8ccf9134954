// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};
use axum::{routing::{get, post}, Router};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use platform_console::application::panel_store::{Intent, IntentSink};
use platform_console::domain::panel::PanelItem;
use platform_console::infrastructure::central_client::CentralClient;
use platform_console::infrastructure::config::load_console_config;
use platform_console::infrastructure::console_store::{ConsoleState, SharedStore};
use platform_console::infrastructure::dispatcher::{intent_channel, IntentDispatcher};
use platform_console::infrastructure::frame_renderer::{FrameRegistry, FrameRenderer};
use platform_console::presentation::app_state::AppState;
use platform_console::presentation::console_view::ConsoleView;
use platform_console::presentation::handlers::{
    check_item, expand_all, get_panel, health_check, list_charts, pin_chart, render_chart,
    toggle_item,
};

// All view and store updates run on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_console_config()?;

    // Data source and system of record (infrastructure layer)
    let source = Arc::new(CentralClient::new(config.central.url, config.central.auth_token));
    let store = SharedStore::new(ConsoleState::new(config.charts.refresh_interval_ms));

    // Single mutation path
    let (intents, intent_rx) = intent_channel();
    let (dispatcher, changes) =
        IntentDispatcher::new(store.clone(), source, config.charts.sample_count, intent_rx);
    tokio::spawn(dispatcher.run());

    // View loop (application layer drives it)
    let frames = FrameRegistry::default();
    let view = ConsoleView::new(
        Arc::new(store.clone()),
        Arc::new(intents.clone()),
        FrameRenderer::new(frames.clone()),
    );
    let snapshot = view.snapshot();
    tokio::spawn(view.run(changes));

    // Platforms are the root's lazily loaded children
    let root = PanelItem::root();
    intents.dispatch(Intent::LoadChildren { kind: root.kind, item: root })?;

    let state = Arc::new(AppState {
        store,
        intents,
        snapshot,
        frames,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/panel", get(get_panel))
        .route("/panel/toggle", post(toggle_item))
        .route("/panel/expand-all", post(expand_all))
        .route("/panel/check", post(check_item))
        .route("/charts", get(list_charts))
        .route("/render/:anchor", get(render_chart))
        .route("/charts/:key/pin", post(pin_chart))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!("Starting platform-console on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
