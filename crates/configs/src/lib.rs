use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: default_port(), worker_threads: None }
    }
}

/// Per-client request quota enforced by the server middleware.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_requests: default_max_requests(), window_secs: default_window_secs() }
    }
}

fn default_port() -> u16 { 3000 }
fn default_max_requests() -> u32 { 100 }
fn default_window_secs() -> u64 { 300 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize();
        self.server.validate()?;
        self.rate_limit.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    /// Fill gaps from environment variables. `PORT` matches the original
    /// deployment convention.
    pub fn normalize(&mut self) {
        if self.host.trim().is_empty() {
            self.host = "0.0.0.0".into();
        }
        if self.port == 0 {
            if let Some(p) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
                self.port = p;
            } else {
                self.port = default_port();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow!("server.host must not be empty"));
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be a valid TCP port"));
        }
        Ok(())
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(anyhow!("rate_limit.max_requests must be >= 1"));
        }
        if self.window_secs == 0 {
            return Err(anyhow!("rate_limit.window_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}
