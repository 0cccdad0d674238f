use std::path::Path;

use serde::Deserialize;

use crate::browser::sandbox::PathMode;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: bool,
    /// Directory with the static web client, served as router fallback.
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    pub root: String,
    pub mode: PathMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    pub max_text_bytes: u64,
    pub max_body_bytes: usize,
    pub slow_request_secs: u64,
    pub long_request_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub debug: bool,
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sandbox: SandboxConfig,
    pub media: MediaConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
    pub security: Option<SecurityConfig>,
}

const DEFAULTS: &str = include_str!("../config/default.toml");

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        match ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

impl AppConfig {
    /// Non-fatal configuration concerns, logged once the subscriber is installed.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if cfg!(unix) && self.server.port < 1024 {
            out.push(format!("Using privileged port {} - may require elevated permissions", self.server.port));
        }
        out
    }

    /// Default filter directive for the tracing subscriber when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> String {
        let level = if self.logging.debug { "debug" } else { self.logging.level.as_str() };
        format!("{level},tower_http={level}")
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        // Optional local file: dirwarden.toml (in CWD)
        .add_source(::config::File::with_name("dirwarden").required(false));

    if let Ok(custom_path) = std::env::var("DIRWARDEN_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(
        ::config::Environment::with_prefix("DIRWARDEN")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("media.image_extensions")
            .with_list_parse_key("media.video_extensions"),
    );

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }

    // Sandbox
    let root = cfg.sandbox.root.trim();
    if root.is_empty() {
        return Err(anyhow::anyhow!("sandbox.root must not be empty"));
    }
    if !Path::new(root).is_dir() {
        return Err(anyhow::anyhow!("sandbox.root is not an existing directory: {}", root));
    }

    // Media allow-lists
    if cfg.media.image_extensions.is_empty() {
        return Err(anyhow::anyhow!("media.image_extensions must not be empty"));
    }
    if cfg.media.video_extensions.is_empty() {
        return Err(anyhow::anyhow!("media.video_extensions must not be empty"));
    }

    // Limits
    if cfg.limits.max_text_bytes == 0 {
        return Err(anyhow::anyhow!("limits.max_text_bytes must be > 0"));
    }
    if cfg.limits.max_body_bytes == 0 {
        return Err(anyhow::anyhow!("limits.max_body_bytes must be > 0"));
    }
    if cfg.limits.slow_request_secs == 0 || cfg.limits.long_request_secs == 0 {
        return Err(anyhow::anyhow!("limits.slow_request_secs and limits.long_request_secs must be > 0"));
    }

    Ok(())
}
