use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// Allocation strategy for sequence and record-id minting.
///
/// The stored counters are read and advanced in two round trips, and record
/// ids are minted by scanning for gaps, so concurrent submissions can observe
/// the same value. Which guard (if any) closes that window is a deployment
/// choice, not something the pipeline decides silently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationMode {
    /// Unguarded peek/advance and gap scans. Reproduces the historical
    /// behavior, races included, for compatibility testing.
    Legacy,
    /// A process-wide mutex held across each item's allocate+insert cycle.
    /// Concurrent submissions served by other processes still race.
    Serialized,
    /// Sequence advance folded into a single UPDATE .. RETURNING statement.
    /// Record-id gap scans remain unguarded in this mode.
    DbAtomic,
}

impl Default for AllocationMode {
    fn default() -> Self {
        AllocationMode::Legacy
    }
}

/// Intake pipeline tuning.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct IntakeConfig {
    #[serde(default)]
    pub allocation_mode: AllocationMode,

    /// Suppress the per-item report and return only the fixed message plus
    /// the generated order codes, matching the historical response contract.
    #[serde(default)]
    pub compat_plain_response: bool,

    /// Prefix prepended to allocated sales-order numbers.
    #[serde(default = "default_order_code_prefix")]
    pub order_code_prefix: String,

    /// Counter that mints sales-order numbers.
    #[serde(default = "default_order_sequence")]
    pub order_sequence: String,

    /// Counter that mints inventory-transaction ids.
    #[serde(default = "default_invent_trans_sequence")]
    pub invent_trans_sequence: String,

    /// Zero-pad width for the numeric part of an inventory-transaction id.
    #[serde(default = "default_invent_trans_width")]
    pub invent_trans_width: usize,

    /// Fixed tag appended to every inventory-transaction id.
    #[serde(default = "default_invent_trans_suffix")]
    pub invent_trans_suffix: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            allocation_mode: AllocationMode::default(),
            compat_plain_response: false,
            order_code_prefix: default_order_code_prefix(),
            order_sequence: default_order_sequence(),
            invent_trans_sequence: default_invent_trans_sequence(),
            invent_trans_width: default_invent_trans_width(),
            invent_trans_suffix: default_invent_trans_suffix(),
        }
    }
}

fn default_order_code_prefix() -> String {
    "SO-".to_string()
}
fn default_order_sequence() -> String {
    "SalesOrderId".to_string()
}
fn default_invent_trans_sequence() -> String {
    "InventTransId".to_string()
}
fn default_invent_trans_width() -> usize {
    8
}
fn default_invent_trans_suffix() -> String {
    "_078".to_string()
}

/// Contextual constants stamped onto every write. These were literals at the
/// original call sites; here they are named configuration.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct WriteDefaults {
    /// Owning data area; every read and write is scoped to it.
    #[serde(default = "default_data_area")]
    pub data_area_id: String,

    #[serde(default = "default_currency")]
    pub currency_code: String,

    #[serde(default = "default_delivery_mode")]
    pub delivery_mode: String,

    #[serde(default = "default_language")]
    pub language_id: String,

    /// Responsible-party code stamped on order headers.
    #[serde(default)]
    pub sales_responsible: String,

    /// Item classification filter used by the catalog item listing.
    #[serde(default = "default_item_dimension_code")]
    pub item_dimension_code: String,

    /// Selectable sites offered by the catalog endpoint.
    #[serde(default = "default_sites")]
    pub sites: Vec<String>,
}

impl Default for WriteDefaults {
    fn default() -> Self {
        Self {
            data_area_id: default_data_area(),
            currency_code: default_currency(),
            delivery_mode: default_delivery_mode(),
            language_id: default_language(),
            sales_responsible: String::new(),
            item_dimension_code: default_item_dimension_code(),
            sites: default_sites(),
        }
    }
}

fn default_data_area() -> String {
    "mrp".to_string()
}
fn default_currency() -> String {
    "USD".to_string()
}
fn default_delivery_mode() -> String {
    "TRUCK".to_string()
}
fn default_language() -> String {
    "en-us".to_string()
}
fn default_item_dimension_code() -> String {
    "0600005".to_string()
}
fn default_sites() -> Vec<String> {
    vec![
        "MATCO01".to_string(),
        "MATCO02".to_string(),
        "MATCO13".to_string(),
        "RIVIANA".to_string(),
        "GODOWNS".to_string(),
    ]
}

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    #[serde(default)]
    #[validate]
    pub intake: IntakeConfig,

    #[serde(default)]
    #[validate]
    pub write_defaults: WriteDefaults,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

impl AppConfig {
    /// Minimal constructor used by tests and tooling.
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            intake: IntakeConfig::default(),
            write_defaults: WriteDefaults::default(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
            || self.environment.eq_ignore_ascii_case("dev")
            || self.environment.eq_ignore_ascii_case("test")
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("salesdesk_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://salesdesk.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
