//! Gateway configuration
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. `config.yaml` (or the file named by `DPC_CONFIG`)
//! 3. Environment variables prefixed `DPC_`, nested with `__`
//!    (for example `DPC_ATTRIBUTION__URL`, `DPC_AUTH__MODE=header`)

use config::{Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub public_server: ServerConfig,
    pub admin_server: ServerConfig,
    pub attribution: AttributionConfig,
    pub ssas: SsasConfig,
    pub auth: AuthConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            public_server: ServerConfig::default(),
            admin_server: ServerConfig {
                port: 3011,
                ..ServerConfig::default()
            },
            attribution: AttributionConfig::default(),
            ssas: SsasConfig::default(),
            auth: AuthConfig::default(),
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_body_size: usize,
    /// Allowed CORS origins. Empty disables CORS headers.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_request_body_size: 10 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    pub url: String,
    /// Attempts after the first one for connection failures and 5xx answers.
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3001".to_string(),
            retries: 3,
            retry_delay_ms: 250,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SsasConfig {
    /// Public token endpoint base (`/v2/token`).
    pub public_url: String,
    /// Admin base used for token introspection.
    pub admin_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for SsasConfig {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:3003".to_string(),
            admin_url: "http://localhost:3004".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            retries: 3,
            retry_delay_ms: 250,
            timeout_seconds: 30,
        }
    }
}

/// How the public API learns which organization a caller acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Bearer token introspected by the token service.
    Ssas,
    /// Trusted `X-ORG` header, for deployments behind an authenticating proxy.
    Header,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::Ssas,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory the export workers write ndjson files into.
    pub directory: String,
    /// Public base of the API, used for `output[].url` in job status reports.
    pub api_path: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: "/tmp/dpc-export".to_string(),
            api_path: "http://localhost:3000/v2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// daily, hourly, minutely or never
    pub file_rotation: String,
    pub opentelemetry_enabled: bool,
    pub otlp_endpoint: String,
    pub otlp_timeout_seconds: u64,
    pub trace_sample_ratio: f64,
    pub service_name: String,
    pub service_version: Option<String>,
    pub deployment_environment: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_enabled: false,
            file_directory: "logs".to_string(),
            file_prefix: "dpc-api".to_string(),
            file_rotation: "daily".to_string(),
            opentelemetry_enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            otlp_timeout_seconds: 10,
            trace_sample_ratio: 1.0,
            service_name: "dpc-api".to_string(),
            service_version: None,
            deployment_environment: "local".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("DPC_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut builder = config::Config::builder();
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("DPC")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("public_server.cors_origins")
                .with_list_parse_key("admin_server.cors_origins")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, server) in [("public_server", &self.public_server), ("admin_server", &self.admin_server)] {
            if server.port == 0 {
                return Err(format!("{name}.port must be > 0"));
            }
        }
        if self.public_server.port == self.admin_server.port
            && self.public_server.host == self.admin_server.host
        {
            return Err("public_server and admin_server must listen on different addresses".into());
        }
        url::Url::parse(&self.attribution.url)
            .map_err(|e| format!("attribution.url is not a valid URL: {e}"))?;
        if self.auth.mode == AuthMode::Ssas {
            url::Url::parse(&self.ssas.admin_url)
                .map_err(|e| format!("ssas.admin_url is not a valid URL: {e}"))?;
        }
        url::Url::parse(&self.ssas.public_url)
            .map_err(|e| format!("ssas.public_url is not a valid URL: {e}"))?;
        if !(0.0..=1.0).contains(&self.logging.trace_sample_ratio) {
            return Err("logging.trace_sample_ratio must be between 0.0 and 1.0".into());
        }
        Ok(())
    }
}
