// Platform-management JSON-RPC client - tree children and historian samples
use crate::application::platform_source::{LoadError, PlatformSource};
use crate::domain::chart::PointRef;
use crate::domain::panel::{ItemPath, PanelItem, PanelItemKind, Status};
use crate::domain::series::PointSample;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

const DEVICES_KEY: &str = "devices";
const AGENTS_KEY: &str = "agents";

#[derive(Debug)]
pub struct CentralClient {
    url: String,
    auth_token: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcError>,
}

impl<T> RpcResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if let Some(error) = self.error {
            anyhow::bail!("{} returned error {}: {}", method, error.code, error.message);
        }
        self.result
            .with_context(|| format!("{} returned neither result nor error", method))
    }
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Health {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlatformRecord {
    uuid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    health: Option<Health>,
}

#[derive(Debug, Deserialize)]
struct AgentRecord {
    uuid: String,
    name: String,
    #[serde(default)]
    health: Option<Health>,
}

#[derive(Debug, Deserialize)]
struct DeviceRecord {
    #[serde(default)]
    points: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HistorianResult {
    #[serde(default)]
    values: Vec<(Value, Value)>,
}

impl CentralClient {
    pub fn new(url: String, auth_token: String) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            auth_token,
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn execute_rpc<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
            "authorization": self.auth_token,
        });

        tracing::debug!("Calling {} (id {})", method, id);
        let response = self
            .client
            .post(format!("{}/jsonrpc", self.url))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send {} to the management server", method))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} failed with status {}: {}", method, status, body);
        }

        let data = response
            .json::<RpcResponse<T>>()
            .await
            .with_context(|| format!("Failed to parse {} response", method))?;

        data.into_result(method)
    }

    async fn load_platforms(&self) -> Result<Vec<PanelItem>> {
        let platforms: Vec<PlatformRecord> = self.execute_rpc("list_platforms", Value::Null).await?;
        Ok(platforms
            .into_iter()
            .map(|p| {
                let name = p.name.unwrap_or_else(|| p.uuid.clone());
                PanelItem::new(PanelItemKind::Platform, name, ItemPath::root().child(p.uuid.as_str()))
                    .with_status(health_status(p.health.as_ref()))
                    .with_uuid(p.uuid)
            })
            .collect())
    }

    async fn load_platform(&self, platform: &PanelItem, uuid: &str) -> Result<Vec<PanelItem>> {
        let agents_method = format!("platforms.uuid.{}.list_agents", uuid);
        let devices_method = format!("platforms.uuid.{}.get_devices", uuid);
        let agents_call = self.execute_rpc::<Vec<AgentRecord>>(&agents_method, Value::Null);
        let devices_call =
            self.execute_rpc::<BTreeMap<String, DeviceRecord>>(&devices_method, Value::Null);
        let (agents, devices) = futures::try_join!(agents_call, devices_call)?;

        Ok(platform_subtree(&platform.path, agents, devices))
    }
}

fn health_status(health: Option<&Health>) -> Status {
    Status::from_health(health.and_then(|h| h.status.as_deref()))
}

/// Grouping nodes, agents, devices and their points for one platform.
/// Everything but the platform itself arrives already loaded.
fn platform_subtree(
    platform: &ItemPath,
    agents: Vec<AgentRecord>,
    devices: BTreeMap<String, DeviceRecord>,
) -> Vec<PanelItem> {
    let mut items = Vec::new();

    let agents_path = platform.child(AGENTS_KEY);
    items.push(
        PanelItem::new(PanelItemKind::Type, "Agents", agents_path.clone())
            .with_sort_order(2)
            .loaded(agents.iter().map(|a| a.uuid.clone()).collect()),
    );
    for agent in agents {
        items.push(
            PanelItem::new(PanelItemKind::Agent, agent.name, agents_path.child(agent.uuid.as_str()))
                .with_status(health_status(agent.health.as_ref()))
                .with_uuid(agent.uuid)
                .loaded(Vec::new()),
        );
    }

    let devices_path = platform.child(DEVICES_KEY);
    items.push(
        PanelItem::new(PanelItemKind::Type, "Devices", devices_path.clone())
            .with_sort_order(1)
            .loaded(devices.keys().cloned().collect()),
    );
    for (topic, device) in devices {
        let device_path = devices_path.child(topic.as_str());
        for point in &device.points {
            items.push(
                PanelItem::new(PanelItemKind::Point, point.as_str(), device_path.child(point.as_str()))
                    .with_topic(format!("{}/{}", topic, point))
                    .loaded(Vec::new()),
            );
        }
        items.push(PanelItem::new(PanelItemKind::Device, topic, device_path).loaded(device.points));
    }

    items
}

/// Historian timestamps are RFC 3339, sometimes without an offset (UTC).
fn timestamp_ms(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|t| t.timestamp_millis())
            .or_else(|_| {
                chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .map(|t| t.and_utc().timestamp_millis())
            })
            .ok(),
        _ => None,
    }
}

fn historian_samples(topic: &str, result: HistorianResult) -> Vec<PointSample> {
    result
        .values
        .into_iter()
        .filter_map(|(time, value)| match timestamp_ms(&time) {
            Some(ms) => Some(PointSample::new(topic, ms.to_string(), vec![vec![json!(ms), value]])),
            None => {
                tracing::debug!("Skipping {} row with unreadable time {}", topic, time);
                None
            }
        })
        .collect()
}

#[async_trait]
impl PlatformSource for CentralClient {
    async fn load_children(&self, item: &PanelItem) -> Result<Vec<PanelItem>, LoadError> {
        let result = match item.kind {
            PanelItemKind::Root => self.load_platforms().await,
            PanelItemKind::Platform => {
                let uuid = item
                    .path
                    .platform_uuid()
                    .ok_or_else(|| LoadError::NoPlatform(item.path.to_string()))?;
                self.load_platform(item, uuid).await
            }
            // Everything below a platform arrives with the platform.
            _ => Ok(Vec::new()),
        };

        result.map_err(|e| LoadError::Fetch {
            path: item.path.to_string(),
            reason: format!("{:#}", e),
        })
    }

    async fn query_point(&self, point: &PointRef, count: usize) -> Result<Vec<PointSample>> {
        let uuid = point
            .platform_uuid
            .as_deref()
            .with_context(|| format!("Point {} is not under a platform", point.path))?;

        let result: HistorianResult = self
            .execute_rpc(
                &format!("platforms.uuid.{}.historian.query", uuid),
                json!({
                    "topic": point.topic,
                    "count": count,
                    "order": "LAST_TO_FIRST",
                }),
            )
            .await?;

        Ok(historian_samples(&point.topic, result))
    }
}
