// HTTP request handlers
use crate::application::chart_assembly::{toggle_pin, ChartFrame};
use crate::application::panel_store::PanelStore;
use crate::application::panel_tree::{NodeState, PanelNodeView, PanelTreeController, TreeError};
use crate::domain::panel::ItemPath;
use crate::infrastructure::frame_renderer::LineChartDocument;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct PathBody {
    pub path: ItemPath,
}

#[derive(Deserialize)]
pub struct CheckBody {
    pub path: ItemPath,
    pub checked: bool,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    pub previous: NodeState,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for TreeError {
    fn into_response(self) -> Response {
        let status = match self {
            TreeError::UnknownItem(_) => StatusCode::NOT_FOUND,
            TreeError::NotCheckable(_) => StatusCode::BAD_REQUEST,
            TreeError::Dispatch(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        tracing::debug!("Rejecting panel request: {}", self);
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current panel tree
pub async fn get_panel(State(state): State<Arc<AppState>>) -> Json<Option<PanelNodeView>> {
    Json(state.snapshot.read().tree.clone())
}

/// Single activation of a node's expand arrow
pub async fn toggle_item(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PathBody>,
) -> Result<Json<ToggleResponse>, TreeError> {
    let previous = PanelTreeController::new(&state.store, &state.intents).toggle(&body.path)?;
    Ok(Json(ToggleResponse { previous }))
}

/// Double activation: expand the whole subtree
pub async fn expand_all(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PathBody>,
) -> Result<StatusCode, TreeError> {
    PanelTreeController::new(&state.store, &state.intents).expand_all(&body.path)?;
    Ok(StatusCode::ACCEPTED)
}

/// Checkbox change on a point
pub async fn check_item(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CheckBody>,
) -> Result<StatusCode, TreeError> {
    PanelTreeController::new(&state.store, &state.intents).check(&body.path, body.checked)?;
    Ok(StatusCode::ACCEPTED)
}

/// Current chart frames, pinned first
pub async fn list_charts(State(state): State<Arc<AppState>>) -> Json<Vec<ChartFrame>> {
    Json(state.snapshot.read().charts.clone())
}

/// Line-chart document for one drawn chart
pub async fn render_chart(
    Path(anchor): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<LineChartDocument>, StatusCode> {
    state
        .frames
        .by_anchor(&anchor)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Pin or unpin a chart
pub async fn pin_chart(
    Path(chart_key): Path<String>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    if state.store.get_chart(&chart_key).is_none() {
        return StatusCode::NOT_FOUND;
    }
    match toggle_pin(&state.intents, &chart_key) {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            tracing::error!("Error pinning chart {}: {}", chart_key, e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
