use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
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
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

/// Named downstream targets. Every outbound call resolves its base URL and
/// access key through one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceTarget {
    AccountService,
    TokenService,
}

impl ServiceTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceTarget::AccountService => "account_service",
            ServiceTarget::TokenService => "token_service",
        }
    }
}

impl fmt::Display for ServiceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceEndpoint {
    /// Base URL including any path prefix, e.g. `https://accounts.internal/api`.
    #[serde(default)]
    pub base_url: String,
    /// Sent as the `x-functions-key` header when present.
    #[serde(default)]
    pub access_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub account_service: ServiceEndpoint,
    #[serde(default)]
    pub token_service: ServiceEndpoint,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_request_timeout() -> u64 { 15 }
fn default_connect_timeout() -> u64 { 5 }

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            account_service: ServiceEndpoint::default(),
            token_service: ServiceEndpoint::default(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` when present, otherwise start from defaults; then
    /// apply environment overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_missing_file(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize_from_env();
        self.server.normalize()?;
        self.providers.normalize_from_env();
        self.providers.validate()?;
        Ok(())
    }
}

fn is_missing_file(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl ServerConfig {
    fn normalize_from_env(&mut self) {
        if let Some(host) = env_non_empty("SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = env_non_empty("SERVER_PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }
        if let Some(w) = env_non_empty("TOKIO_WORKER_THREADS").and_then(|v| v.parse::<usize>().ok()) {
            self.worker_threads = Some(w);
        }
    }

    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ProvidersConfig {
    /// Named-target lookup used by the clients and the reverse proxy.
    pub fn endpoint(&self, target: ServiceTarget) -> &ServiceEndpoint {
        match target {
            ServiceTarget::AccountService => &self.account_service,
            ServiceTarget::TokenService => &self.token_service,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn normalize_from_env(&mut self) {
        if let Some(url) = env_non_empty("ACCOUNT_SERVICE_URL") {
            self.account_service.base_url = url;
        }
        if let Some(key) = env_non_empty("ACCOUNT_SERVICE_KEY") {
            self.account_service.access_key = Some(key);
        }
        if let Some(url) = env_non_empty("TOKEN_SERVICE_URL") {
            self.token_service.base_url = url;
        }
        if let Some(key) = env_non_empty("TOKEN_SERVICE_KEY") {
            self.token_service.access_key = Some(key);
        }
        if let Some(t) = env_non_empty("DOWNSTREAM_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            self.request_timeout_secs = t;
        }
        for endpoint in [&mut self.account_service, &mut self.token_service] {
            let trimmed = endpoint.base_url.trim().trim_end_matches('/').to_string();
            endpoint.base_url = trimmed;
            if endpoint.access_key.as_deref().map(str::trim) == Some("") {
                endpoint.access_key = None;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        for target in [ServiceTarget::AccountService, ServiceTarget::TokenService] {
            let url = &self.endpoint(target).base_url;
            if url.is_empty() {
                return Err(anyhow!("providers.{target}.base_url is empty; set it in config.toml or the environment"));
            }
            let lower = url.to_lowercase();
            if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                return Err(anyhow!("providers.{target}.base_url must start with http:// or https://"));
            }
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(anyhow!("providers timeouts must be positive seconds"));
        }
        Ok(())
    }
}
