use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub central: CentralSettings,
    #[serde(default)]
    pub charts: ChartSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CentralSettings {
    pub url: String,
    pub auth_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartSettings {
    /// Applied to newly created charts; 0 refreshes once.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Historian rows fetched per series on each refresh.
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            sample_count: default_sample_count(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_refresh_interval_ms() -> u64 {
    15_000
}

fn default_sample_count() -> usize {
    20
}

pub fn load_console_config() -> anyhow::Result<ConsoleConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/console"))
        .add_source(config::Environment::with_prefix("CONSOLE").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
