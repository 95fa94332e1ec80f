use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub docker: DockerConfig,
    pub worker: WorkerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerConfig {
    /// Unix socket path; bollard's default socket when omitted.
    #[serde(default)]
    pub socket: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    pub refresh_interval_ms: u64,
    /// Max number of stack snapshots kept in the broadcast channel for /ws/stacks (slow clients may lag).
    pub broadcast_capacity: usize,
    /// How often to log app stats (ws_stacks clients, refreshes) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        if let Some(socket) = &self.docker.socket {
            anyhow::ensure!(!socket.is_empty(), "docker.socket must be non-empty when set");
        }
        anyhow::ensure!(
            self.worker.refresh_interval_ms > 0,
            "worker.refresh_interval_ms must be > 0, got {}",
            self.worker.refresh_interval_ms
        );
        anyhow::ensure!(
            self.worker.broadcast_capacity > 0,
            "worker.broadcast_capacity must be > 0, got {}",
            self.worker.broadcast_capacity
        );
        anyhow::ensure!(
            self.worker.stats_log_interval_secs > 0,
            "worker.stats_log_interval_secs must be > 0, got {}",
            self.worker.stats_log_interval_secs
        );
        Ok(())
    }
}
