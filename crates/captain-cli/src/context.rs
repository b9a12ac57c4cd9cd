use anyhow::Context as _;
use captain_core::client::ApiClient;
use captain_core::config::Config;
use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by every command: the loaded config plus global flags.
pub struct Context {
    pub config_path: PathBuf,
    pub config: Config,
    api_override: Option<String>,
    pub json: bool,
}

impl Context {
    /// Resolve the config file.
    ///
    /// Priority:
    /// 1. `--config` flag / `CAPTAIN_CONFIG` env var
    /// 2. `~/.captain/config.yaml`
    ///
    /// A missing file means all defaults.
    pub fn load(config: Option<PathBuf>, api: Option<String>, json: bool) -> anyhow::Result<Self> {
        let config_path = match config {
            Some(p) => p,
            None => Config::default_path()?,
        };
        let config = Config::load(&config_path)
            .with_context(|| format!("failed to load config {}", config_path.display()))?;
        Ok(Self {
            config_path,
            config,
            api_override: api.filter(|a| !a.trim().is_empty()),
            json,
        })
    }

    pub fn api_url(&self) -> &str {
        self.api_override
            .as_deref()
            .unwrap_or(&self.config.client.api_url)
    }

    pub fn client(&self) -> anyhow::Result<ApiClient> {
        let timeout = Duration::from_secs(self.config.client.timeout_secs);
        ApiClient::new(self.api_url(), timeout).context("failed to build HTTP client")
    }
}
