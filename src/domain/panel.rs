// Panel tree domain model - monitored platforms, agents, devices and points
use serde::{Deserialize, Serialize};
use std::fmt;

const ROOT_SEGMENT: &str = "platforms";

/// Unique, stable address of a node in the panel tree.
///
/// Segments rather than a joined string, since device topics contain `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemPath(Vec<String>);

impl ItemPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn root() -> Self {
        Self(vec![ROOT_SEGMENT.to_string()])
    }

    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.into());
        Self(segments)
    }

    pub fn parent(&self) -> Option<Self> {
        match self.0.len() {
            0 | 1 => None,
            n => Some(Self(self.0[..n - 1].to_vec())),
        }
    }

    /// Last segment, which is the key the parent lists in its `children`.
    pub fn key(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Platform uuid for any node under `platforms/<uuid>/...`.
    pub fn platform_uuid(&self) -> Option<&str> {
        match self.0.as_slice() {
            [root, uuid, ..] if root == ROOT_SEGMENT => Some(uuid.as_str()),
            _ => None,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelItemKind {
    Root,
    Platform,
    Type,
    Agent,
    Device,
    Point,
}

impl PanelItemKind {
    pub fn is_checkable(self) -> bool {
        self == PanelItemKind::Point
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Good,
    Bad,
    #[default]
    Unknown,
}

impl Status {
    /// Health strings other than GOOD/BAD map to unknown.
    pub fn from_health(status: Option<&str>) -> Self {
        match status {
            Some("GOOD") => Status::Good,
            Some("BAD") => Status::Bad,
            _ => Status::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelItem {
    pub uuid: Option<String>,
    pub name: String,
    pub kind: PanelItemKind,
    pub path: ItemPath,
    pub status: Status,
    /// `None` until the children have been fetched once.
    pub expanded: Option<bool>,
    pub visible: bool,
    pub checked: bool,
    pub sort_order: i64,
    pub children: Vec<String>,
    /// Historian topic, set on points only.
    pub topic: Option<String>,
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub load_error: Option<String>,
}

impl PanelItem {
    pub fn new(kind: PanelItemKind, name: impl Into<String>, path: ItemPath) -> Self {
        Self {
            uuid: None,
            name: name.into(),
            kind,
            path,
            status: Status::Unknown,
            expanded: None,
            visible: true,
            checked: false,
            sort_order: 0,
            children: Vec::new(),
            topic: None,
            loading: false,
            load_error: None,
        }
    }

    pub fn root() -> Self {
        Self::new(PanelItemKind::Root, "Platforms", ItemPath::root())
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Marks the node as having known children (possibly none).
    pub fn loaded(mut self, children: Vec<String>) -> Self {
        self.children = children;
        self.expanded = Some(false);
        self
    }

    pub fn children_loaded(&self) -> bool {
        self.expanded.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_path_navigation() {
        let point = ItemPath::root()
            .child("abc-123")
            .child("devices")
            .child("campus/building/ahu1")
            .child("OutsideAirTemperature");

        assert_eq!(point.platform_uuid(), Some("abc-123"));
        assert_eq!(point.key(), Some("OutsideAirTemperature"));
        assert_eq!(point.depth(), 5);
        assert_eq!(
            point.parent().and_then(|p| p.key().map(str::to_string)),
            Some("campus/building/ahu1".to_string())
        );
        assert_eq!(ItemPath::root().parent(), None);
        assert_eq!(ItemPath::root().platform_uuid(), None);
    }

    #[test]
    fn test_status_from_health() {
        assert_eq!(Status::from_health(Some("GOOD")), Status::Good);
        assert_eq!(Status::from_health(Some("BAD")), Status::Bad);
        assert_eq!(Status::from_health(Some("UNKNOWN")), Status::Unknown);
        assert_eq!(Status::from_health(None), Status::Unknown);
    }

    #[test]
    fn test_only_points_are_checkable() {
        assert!(PanelItemKind::Point.is_checkable());
        assert!(!PanelItemKind::Platform.is_checkable());
        assert!(!PanelItemKind::Type.is_checkable());
        assert!(!PanelItemKind::Agent.is_checkable());
    }
}
