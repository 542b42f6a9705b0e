//! User-facing debugger settings (`java.debug.settings.*`) and logging setup.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt, TestWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{ConsoleKind, StepFilters};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml settings: {0}")]
    Toml(String),
    #[error("failed to parse json settings: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` embeds a source snippet; keep just the message.
        ConfigError::Toml(err.message().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSettings {
    /// Build the workspace before every launch.
    #[serde(default = "DebugSettings::default_true")]
    pub force_build_before_launch: bool,
    /// Continue launching when the build reports errors, without asking.
    #[serde(default)]
    pub on_build_failure_proceed: bool,
    #[serde(default)]
    pub step_filters: StepFilters,
    /// Debugger backend log level (`java.util.logging` names).
    #[serde(default = "DebugSettings::default_log_level")]
    pub log_level: String,
    #[serde(default = "DebugSettings::default_max_string_length")]
    pub max_string_length: u32,
    #[serde(default)]
    pub numeric_precision: u32,
    #[serde(default)]
    pub show_hex: bool,
    #[serde(default)]
    pub show_static_variables: bool,
    #[serde(default)]
    pub show_qualified_names: bool,
    #[serde(default = "DebugSettings::default_true")]
    pub show_logical_structure: bool,
    #[serde(default = "DebugSettings::default_true")]
    pub show_to_string: bool,
    #[serde(default = "DebugSettings::default_hot_code_replace")]
    pub hot_code_replace: String,
    /// Default console for launch configurations that don't pick one.
    #[serde(default)]
    pub console: Option<ConsoleKind>,

    /// Logging for this process (not pushed to the language server).
    #[serde(default, skip_serializing)]
    pub logging: LoggingConfig,
}

impl DebugSettings {
    fn default_true() -> bool {
        true
    }

    fn default_log_level() -> String {
        "warn".to_string()
    }

    fn default_max_string_length() -> u32 {
        0
    }

    fn default_hot_code_replace() -> String {
        "manual".to_string()
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads the editor's `java.debug.settings` JSON section.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// The JSON document pushed with `updateDebugSettings`.
    pub fn to_language_server_payload(&self) -> String {
        json!({
            "logLevel": java_log_level(&self.log_level),
            "maxStringLength": self.max_string_length,
            "numericPrecision": self.numeric_precision,
            "showHex": self.show_hex,
            "showStaticVariables": self.show_static_variables,
            "showQualifiedNames": self.show_qualified_names,
            "showLogicalStructure": self.show_logical_structure,
            "showToString": self.show_to_string,
            "hotCodeReplace": self.hot_code_replace,
            "stepFilters": self.step_filters,
        })
        .to_string()
    }
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            force_build_before_launch: true,
            on_build_failure_proceed: false,
            step_filters: StepFilters::default(),
            log_level: Self::default_log_level(),
            max_string_length: Self::default_max_string_length(),
            numeric_precision: 0,
            show_hex: false,
            show_static_variables: false,
            show_qualified_names: false,
            show_logical_structure: true,
            show_to_string: true,
            hot_code_replace: Self::default_hot_code_replace(),
            console: None,
            logging: LoggingConfig::default(),
        }
    }
}

fn java_log_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "error" => "SEVERE",
        "warn" | "warning" => "WARNING",
        "info" => "INFO",
        "debug" => "FINE",
        "trace" | "verbose" => "FINEST",
        _ => "WARNING",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Simple level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,
    /// Append logs to this file as well.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    /// Effective filter; `RUST_LOG` directives are appended when set.
    pub fn env_filter(&self) -> EnvFilter {
        self.filter_with_overrides(std::env::var("RUST_LOG").ok().as_deref())
    }

    /// `overrides` come after the configured directives so they win for the
    /// targets they name. Unparsable overrides are dropped; an unparsable
    /// configured level degrades to `info`.
    pub(crate) fn filter_with_overrides(&self, overrides: Option<&str>) -> EnvFilter {
        let configured = Self::normalize_level_directives(&self.level);
        let mut candidates = Vec::with_capacity(2);
        if let Some(overrides) = overrides.map(str::trim).filter(|o| !o.is_empty()) {
            candidates.push(format!("{configured},{overrides}"));
        }
        candidates.push(configured);

        candidates
            .into_iter()
            .find_map(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::default().add_directive(LevelFilter::INFO.into()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

/// Stderr (captured by the test harness in debug builds) plus the optional
/// append-only log file.
fn log_writer(config: &LoggingConfig) -> (BoxMakeWriter, Option<std::io::Error>) {
    let mut writer = BoxMakeWriter::new(std::io::sink);
    if config.stderr {
        writer = if cfg!(debug_assertions) {
            BoxMakeWriter::new(writer.and(TestWriter::with_stderr))
        } else {
            BoxMakeWriter::new(writer.and(std::io::stderr))
        };
    }

    let Some(path) = config.file.as_ref() else {
        return (writer, None);
    };
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => (BoxMakeWriter::new(writer.and(Mutex::new(file))), None),
        Err(err) => (writer, Some(err)),
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber. Only the first call has an effect.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let (writer, file_error) = log_writer(config);
        let layer: Box<dyn Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry()
            .with(config.env_filter())
            .with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            return;
        }
        if let (Some(err), Some(path)) = (file_error, config.file.as_ref()) {
            tracing::warn!(
                target: "nova.debug_config",
                path = %path.display(),
                error = %err,
                "failed to open log file; file logging disabled"
            );
        }
    });
}
