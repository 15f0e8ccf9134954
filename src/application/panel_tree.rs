// Panel tree reconciliation - derives node views from the store and turns
// user gestures into intents
use crate::application::panel_store::{DispatchError, Intent, IntentSink, PanelStore};
use crate::domain::panel::{ItemPath, PanelItem, PanelItemKind, Status};
use serde::Serialize;

/// Pointer offset applied to tooltip placement.
const TOOLTIP_OFFSET: (i32, i32) = (-60, -70);

/// Per-node expansion state, derived from `expanded` and the load flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Unloaded,
    LoadingChildren,
    Collapsed,
    Expanded,
}

impl NodeState {
    pub fn of(item: &PanelItem) -> Self {
        match (item.expanded, item.loading) {
            (_, true) => NodeState::LoadingChildren,
            (None, false) => NodeState::Unloaded,
            (Some(false), false) => NodeState::Collapsed,
            (Some(true), false) => NodeState::Expanded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusIcon {
    Play,
    MinusCircle,
    Bar,
}

impl From<Status> for StatusIcon {
    fn from(status: Status) -> Self {
        match status {
            Status::Good => StatusIcon::Play,
            Status::Bad => StatusIcon::MinusCircle,
            Status::Unknown => StatusIcon::Bar,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Arrow {
    pub status: Status,
    pub icon: StatusIcon,
    /// Pointing down: expanded with at least one child.
    pub rotated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelStyle {
    /// Grouping nodes without identity.
    Type,
    Item,
}

/// Everything needed to paint one node, fully derived from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelNodeView {
    pub path: ItemPath,
    pub name: String,
    pub kind: PanelItemKind,
    pub state: NodeState,
    pub visible: bool,
    pub arrow: Arrow,
    pub label: LabelStyle,
    /// `Some` only for points.
    pub checkbox: Option<bool>,
    /// Uuid shown on hover; never for grouping nodes.
    pub tooltip: Option<String>,
    pub has_children: bool,
    pub error: Option<String>,
    pub children: Vec<PanelNodeView>,
}

/// Render the subtree at `path`, or nothing if the store does not know it.
pub fn render_tree(store: &dyn PanelStore, path: &ItemPath) -> Option<PanelNodeView> {
    store.get_item(path).map(|item| render_item(store, item))
}

fn render_item(store: &dyn PanelStore, item: PanelItem) -> PanelNodeView {
    let children: Vec<PanelNodeView> = if item.expanded == Some(true) {
        sort_children(store.get_children(&item))
            .into_iter()
            .map(|child| render_item(store, child))
            .collect()
    } else {
        Vec::new()
    };
    let has_children = !children.is_empty();

    PanelNodeView {
        state: NodeState::of(&item),
        visible: item.visible,
        arrow: Arrow {
            status: item.status,
            icon: item.status.into(),
            rotated: has_children,
        },
        label: if item.uuid.is_none() {
            LabelStyle::Type
        } else {
            LabelStyle::Item
        },
        checkbox: item.kind.is_checkable().then_some(item.checked),
        tooltip: match item.kind {
            PanelItemKind::Type => None,
            _ => item.uuid.clone(),
        },
        has_children,
        error: item.load_error,
        children,
        path: item.path,
        name: item.name,
        kind: item.kind,
    }
}

/// Two stable passes: case-insensitive name, then `sort_order`. The second
/// pass dominates; names only break `sort_order` ties.
pub fn sort_children(mut children: Vec<PanelItem>) -> Vec<PanelItem> {
    children.sort_by(|a, b| a.name.to_uppercase().cmp(&b.name.to_uppercase()));
    children.sort_by_key(|c| c.sort_order);
    children
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("no panel item at {0}")]
    UnknownItem(ItemPath),
    #[error("{0} is not a point and has no checkbox")]
    NotCheckable(ItemPath),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Turns gestures on a node into intents. Reads the node fresh from the
/// store on every gesture.
pub struct PanelTreeController<'a> {
    store: &'a dyn PanelStore,
    intents: &'a dyn IntentSink,
}

impl<'a> PanelTreeController<'a> {
    pub fn new(store: &'a dyn PanelStore, intents: &'a dyn IntentSink) -> Self {
        Self { store, intents }
    }

    /// Single activation of the expand arrow.
    ///
    /// Unloaded nodes request their children instead of toggling; a node
    /// already loading ignores the gesture. Returns the state the node was in.
    pub fn toggle(&self, path: &ItemPath) -> Result<NodeState, TreeError> {
        let item = self.item(path)?;
        let state = NodeState::of(&item);
        match state {
            NodeState::Unloaded => self.intents.dispatch(Intent::LoadChildren {
                kind: item.kind,
                item,
            })?,
            NodeState::LoadingChildren => {
                tracing::debug!("Ignoring toggle of {} while its children load", path);
            }
            NodeState::Collapsed | NodeState::Expanded => {
                self.intents.dispatch(Intent::ToggleItem(path.clone()))?
            }
        }
        Ok(state)
    }

    /// Double activation: expand the whole subtree, loading where needed.
    pub fn expand_all(&self, path: &ItemPath) -> Result<(), TreeError> {
        self.item(path)?;
        self.intents.dispatch(Intent::ExpandAll(path.clone()))?;
        Ok(())
    }

    /// Checkbox change on a point. Always issues the check update followed
    /// by exactly one of add-to-chart or remove-from-chart.
    pub fn check(&self, path: &ItemPath, checked: bool) -> Result<(), TreeError> {
        let item = self.item(path)?;
        if !item.kind.is_checkable() {
            return Err(TreeError::NotCheckable(path.clone()));
        }

        self.intents.dispatch(Intent::CheckItem {
            path: path.clone(),
            checked,
        })?;
        let chart_intent = if checked {
            Intent::AddToChart(item)
        } else {
            Intent::RemoveFromChart(item)
        };
        self.intents.dispatch(chart_intent)?;
        Ok(())
    }

    fn item(&self, path: &ItemPath) -> Result<PanelItem, TreeError> {
        self.store
            .get_item(path)
            .ok_or_else(|| TreeError::UnknownItem(path.clone()))
    }
}

/// Hover tooltip placement, offset from the pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tooltip {
    pub shown: bool,
    pub x: i32,
    pub y: i32,
}

impl Tooltip {
    pub fn show(&mut self, pointer_x: i32, pointer_y: i32) {
        self.shown = true;
        self.move_to(pointer_x, pointer_y);
    }

    pub fn move_to(&mut self, pointer_x: i32, pointer_y: i32) {
        self.x = pointer_x + TOOLTIP_OFFSET.0;
        self.y = pointer_y + TOOLTIP_OFFSET.1;
    }

    pub fn hide(&mut self) {
        self.shown = false;
    }
}
