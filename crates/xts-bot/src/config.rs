//! Application configuration.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use xts_client::InstrumentUniverse;
use xts_core::{Credentials, ExchangeSegment, Granularity, InstrumentRef};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{AppError, AppResult};

/// Environment variable overriding `credentials.app_key`.
pub const APP_KEY_ENV: &str = "XTS_APP_KEY";

/// Environment variable overriding `credentials.secret_key`.
pub const SECRET_KEY_ENV: &str = "XTS_SECRET_KEY";

/// Config file used when neither `--config` nor `XTS_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// One named instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Display name, also used in batch file names.
    pub name: String,
    #[serde(default = "default_segment")]
    pub segment: ExchangeSegment,
    pub instrument_id: u64,
}

impl InstrumentConfig {
    fn new(name: &str, instrument_id: u64) -> Self {
        Self {
            name: name.to_string(),
            segment: ExchangeSegment::NseCm,
            instrument_id,
        }
    }

    pub fn instrument(&self) -> AppResult<InstrumentRef> {
        InstrumentRef::new(self.segment, self.instrument_id).map_err(|e| {
            AppError::Config(format!("instrument {}: {e}", self.name))
        })
    }
}

fn default_segment() -> ExchangeSegment {
    ExchangeSegment::NseCm
}

/// Top five NIFTY 50 constituents on NSE cash.
fn default_instruments() -> Vec<InstrumentConfig> {
    vec![
        InstrumentConfig::new("RELIANCE", 2885),
        InstrumentConfig::new("HDFCBANK", 1333),
        InstrumentConfig::new("INFY", 1594),
        InstrumentConfig::new("TCS", 11536),
        InstrumentConfig::new("ICICIBANK", 4963),
    ]
}

/// Login credentials. Zeroized on drop; never printed.
#[derive(Clone, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub app_key: String,
    #[serde(default, skip_serializing)]
    pub secret_key: String,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("app_key", &self.app_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Sandbox stream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_stream_enabled")]
    pub enabled: bool,
    /// How long to stream before disconnecting.
    #[serde(default = "default_stream_duration_secs")]
    pub duration_secs: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u32,
    #[serde(default = "default_stream_instruments")]
    pub instruments: Vec<InstrumentConfig>,
}

fn default_stream_enabled() -> bool {
    true
}

fn default_stream_duration_secs() -> u64 {
    30
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_max_ticks() -> u32 {
    10
}

fn default_stream_instruments() -> Vec<InstrumentConfig> {
    vec![
        InstrumentConfig::new("RELIANCE", 2885),
        InstrumentConfig::new("HDFCBANK", 1333),
    ]
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: default_stream_enabled(),
            duration_secs: default_stream_duration_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: default_max_ticks(),
            instruments: default_stream_instruments(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// REST API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Market data socket URL.
    #[serde(default = "default_socket_url")]
    pub socket_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Login source tag.
    #[serde(default = "default_source")]
    pub source: String,
    /// Output directory for CSV logs.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// OHLC window ends now and starts this many minutes earlier.
    #[serde(default = "default_lookback_minutes")]
    pub lookback_minutes: i64,
    /// Bar width in seconds.
    #[serde(default = "default_granularity_secs")]
    pub granularity_secs: u32,
    #[serde(default = "default_instruments")]
    pub instruments: Vec<InstrumentConfig>,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

fn default_base_url() -> String {
    "https://xts.rmoneyindia.co.in:3000".to_string()
}

fn default_socket_url() -> String {
    "https://xts.rmoneyindia.co.in:3000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_source() -> String {
    "WEBAPI".to_string()
}

fn default_data_dir() -> String {
    "DATA".to_string()
}

fn default_lookback_minutes() -> i64 {
    30
}

fn default_granularity_secs() -> u32 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            socket_url: default_socket_url(),
            request_timeout_secs: default_request_timeout_secs(),
            source: default_source(),
            data_dir: default_data_dir(),
            lookback_minutes: default_lookback_minutes(),
            granularity_secs: default_granularity_secs(),
            instruments: default_instruments(),
            credentials: CredentialsConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Path order: `cli_path`, then `XTS_CONFIG`, then
    /// `config/default.toml`. A missing default file yields defaults; a
    /// missing explicit file is an error.
    pub fn load(cli_path: Option<String>) -> AppResult<Self> {
        match cli_path.or_else(|| std::env::var("XTS_CONFIG").ok()) {
            Some(path) => Self::from_file(&path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => {
                tracing::warn!(path = DEFAULT_CONFIG_PATH, "Config file not found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Check values that serde cannot.
    /// Start of the retrieval window ending at `end`.
    pub fn lookback_start(&self, end: DateTime<Local>) -> AppResult<DateTime<Local>> {
        chrono::Duration::try_minutes(self.lookback_minutes)
            .and_then(|lookback| end.checked_sub_signed(lookback))
            .ok_or_else(|| {
                AppError::Config(format!(
                    "lookback_minutes {} is out of range",
                    self.lookback_minutes
                ))
            })
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::Config("base_url is empty".to_string()));
        }
        if self.lookback_minutes < 0 {
            return Err(AppError::Config(format!(
                "lookback_minutes must not be negative, got {}",
                self.lookback_minutes
            )));
        }
        self.lookback_start(Local::now())?;
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config("request_timeout_secs must be positive".to_string()));
        }
        if self.stream.tick_interval_ms == 0 {
            return Err(AppError::Config("stream.tick_interval_ms must be positive".to_string()));
        }
        self.granularity()?;
        self.universe()?;
        self.stream_instruments()?;
        Ok(())
    }

    pub fn granularity(&self) -> AppResult<Granularity> {
        Ok(Granularity::from_secs(self.granularity_secs)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Batch universe in configured order. Duplicate names are rejected.
    pub fn universe(&self) -> AppResult<InstrumentUniverse> {
        let mut universe = InstrumentUniverse::with_capacity(self.instruments.len());
        for entry in &self.instruments {
            if universe.insert(entry.name.clone(), entry.instrument()?).is_some() {
                return Err(AppError::Config(format!(
                    "duplicate instrument name: {}",
                    entry.name
                )));
            }
        }
        Ok(universe)
    }

    pub fn stream_instruments(&self) -> AppResult<Vec<InstrumentRef>> {
        self.stream
            .instruments
            .iter()
            .map(InstrumentConfig::instrument)
            .collect()
    }

    /// Credentials from config, overridden by `XTS_APP_KEY` / `XTS_SECRET_KEY`.
    pub fn credentials(&self) -> AppResult<Credentials> {
        self.credentials_with(
            std::env::var(APP_KEY_ENV).ok(),
            std::env::var(SECRET_KEY_ENV).ok(),
        )
    }

    fn credentials_with(
        &self,
        app_key: Option<String>,
        secret_key: Option<String>,
    ) -> AppResult<Credentials> {
        let app_key = app_key.unwrap_or_else(|| self.credentials.app_key.clone());
        let secret_key = secret_key.unwrap_or_else(|| self.credentials.secret_key.clone());

        if app_key.is_empty() {
            return Err(AppError::Config(format!(
                "app key not set (credentials.app_key or {APP_KEY_ENV})"
            )));
        }
        if secret_key.is_empty() {
            return Err(AppError::Config(format!(
                "secret key not set (credentials.secret_key or {SECRET_KEY_ENV})"
            )));
        }
        Ok(Credentials::new(app_key, secret_key, self.source.clone()))
    }
}
