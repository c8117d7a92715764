//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings
//! - Fail-fast validation of secrets and payment provider keys

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub plans: PlansConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    /// Payment provider configuration. When absent, billing actions report
    /// that payments are not configured and the webhook endpoint refuses events.
    #[serde(default)]
    pub billing: Option<BillingConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL used to build invite links and payment return URLs
    #[serde(default = "default_app_url")]
    pub app_url: String,
    /// Mark the session cookie `Secure` (enable behind HTTPS)
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens
    pub session_secret: String,
    #[serde(default = "default_session_expiry")]
    pub session_expiry_hours: u64,
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
}

fn default_session_expiry() -> u64 {
    24 * 7
}

fn default_password_min_length() -> usize {
    8
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Log output target (console, file or both)
    #[serde(default)]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file" or "both")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    Console,
    File,
    Both,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/corppad")
}

fn default_log_prefix() -> String {
    "corppad".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

/// Plan limits and invite lifetime
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlansConfig {
    /// Maximum number of projects a Free organization may hold
    #[serde(default = "default_free_project_limit")]
    pub free_project_limit: i64,
    #[serde(default = "default_invite_expiry_days")]
    pub invite_expiry_days: i64,
}

fn default_free_project_limit() -> i64 {
    3
}

fn default_invite_expiry_days() -> i64 {
    7
}

impl Default for PlansConfig {
    fn default() -> Self {
        Self {
            free_project_limit: default_free_project_limit(),
            invite_expiry_days: default_invite_expiry_days(),
        }
    }
}

/// Per-IP quota applied to the credential endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_burst_size() -> u32 {
    10
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            requests_per_minute: default_requests_per_minute(),
            burst_size: default_burst_size(),
        }
    }
}

/// Payment provider (Stripe) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingConfig {
    pub secret_key: String,
    #[serde(default)]
    pub publishable_key: Option<String>,
    /// Price identifier of the Pro subscription
    pub pro_price_id: String,
    /// Shared secret used to verify webhook signatures
    pub webhook_secret: String,
    #[serde(default = "default_stripe_api_base")]
    pub api_base: String,
    /// Maximum age of a signed webhook timestamp
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,
    #[serde(default = "default_stripe_timeout")]
    pub timeout_secs: u64,
}

fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_webhook_tolerance() -> i64 {
    300
}

fn default_stripe_timeout() -> u64 {
    20
}

impl BillingConfig {
    fn empty() -> Self {
        Self {
            secret_key: String::new(),
            publishable_key: None,
            pro_price_id: String::new(),
            webhook_secret: String::new(),
            api_base: default_stripe_api_base(),
            webhook_tolerance_secs: default_webhook_tolerance(),
            timeout_secs: default_stripe_timeout(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                app_url: default_app_url(),
                secure_cookies: false,
            },
            auth: AuthConfig {
                session_secret: "change-me-in-production-minimum-32-characters-long".to_string(),
                session_expiry_hours: default_session_expiry(),
                password_min_length: default_password_min_length(),
            },
            database: DatabaseConfig {
                url: "sqlite://./data/corppad.db".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            logging: LoggingConfig::default(),
            plans: PlansConfig::default(),
            rate_limit: RateLimitSettings::default(),
            billing: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("CORPPAD_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                eprintln!("[CONFIG] Loading configuration from: {:?}", path);
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                serde_norway::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {:?}", path))?
            }
            Some(ref path) => {
                eprintln!("[CONFIG] Config file not found: {:?}, using defaults", path);
                AppConfig::default()
            }
            None => {
                eprintln!("[CONFIG] No config file found, using defaults");
                AppConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            PathBuf::from("/etc/corppad/config.yaml"),
            dirs::config_dir()
                .map(|p| p.join("corppad/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("CORPPAD_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CORPPAD_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(url) = std::env::var("CORPPAD_APP_URL") {
            self.server.app_url = url;
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(secret) = std::env::var("SESSION_SECRET") {
            self.auth.session_secret = secret;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("CORPPAD_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }
        if let Ok(target) = std::env::var("CORPPAD_LOG_TARGET") {
            self.logging.target = match target.to_lowercase().as_str() {
                "file" => LogTarget::File,
                "both" => LogTarget::Both,
                _ => LogTarget::Console,
            };
        }
        if let Ok(dir) = std::env::var("CORPPAD_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(dir);
        }

        if let Ok(limit) = std::env::var("CORPPAD_FREE_PROJECT_LIMIT") {
            if let Ok(l) = limit.parse() {
                self.plans.free_project_limit = l;
            }
        }

        // Any Stripe variable switches billing on; validate() rejects a partial set.
        let stripe_vars = [
            "STRIPE_SECRET_KEY",
            "STRIPE_PRICE_ID_PRO",
            "STRIPE_WEBHOOK_SECRET",
            "STRIPE_PUBLISHABLE_KEY",
            "STRIPE_API_BASE",
        ];
        if stripe_vars.iter().any(|v| std::env::var(v).is_ok()) {
            let billing = self.billing.get_or_insert_with(BillingConfig::empty);
            if let Ok(key) = std::env::var("STRIPE_SECRET_KEY") {
                billing.secret_key = key;
            }
            if let Ok(price) = std::env::var("STRIPE_PRICE_ID_PRO") {
                billing.pro_price_id = price;
            }
            if let Ok(secret) = std::env::var("STRIPE_WEBHOOK_SECRET") {
                billing.webhook_secret = secret;
            }
            if let Ok(key) = std::env::var("STRIPE_PUBLISHABLE_KEY") {
                billing.publishable_key = Some(key);
            }
            if let Ok(base) = std::env::var("STRIPE_API_BASE") {
                billing.api_base = base;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.auth.session_secret.len() < 32 {
            anyhow::bail!("Session secret must be at least 32 characters long");
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.plans.free_project_limit < 1 {
            anyhow::bail!("Free project limit must be at least 1");
        }
        if self.plans.invite_expiry_days < 1 {
            anyhow::bail!("Invite expiry must be at least 1 day");
        }

        if self.rate_limit.enabled
            && (self.rate_limit.requests_per_minute == 0 || self.rate_limit.burst_size == 0)
        {
            anyhow::bail!("Rate limit quota and burst size must be non-zero when enabled");
        }

        if let Some(ref billing) = self.billing {
            if billing.secret_key.trim().is_empty() {
                anyhow::bail!("Billing is configured but STRIPE_SECRET_KEY is missing");
            }
            if billing.pro_price_id.trim().is_empty() {
                anyhow::bail!("Billing is configured but STRIPE_PRICE_ID_PRO is missing");
            }
            if billing.webhook_secret.trim().is_empty() {
                anyhow::bail!("Billing is configured but STRIPE_WEBHOOK_SECRET is missing");
            }
            if billing.webhook_tolerance_secs <= 0 {
                anyhow::bail!("Webhook tolerance must be positive");
            }
        }

        Ok(())
    }

    /// Public URL of a path under the application root
    pub fn app_link(&self, path: &str) -> String {
        format!("{}{}", self.server.app_url.trim_end_matches('/'), path)
    }
}
