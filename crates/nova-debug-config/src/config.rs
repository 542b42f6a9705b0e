//! Typed view over a Java debug configuration.
//!
//! Editors hand us a loosely-shaped JSON object (usually one entry of
//! `launch.json`). Platform override blocks are folded into the top level on the
//! raw JSON via [`merge_platform_overrides`] before the typed fields are read;
//! every key we don't model is kept in [`DebugConfiguration::extra`] so the
//! configuration round-trips unchanged to the debug adapter.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{anchor, UserError};

/// `type` tag of configurations managed by this crate.
pub const JAVA_DEBUG_TYPE: &str = "java";

/// Placeholder the editor substitutes with its process picker.
pub const PICK_PROCESS_SENTINEL: &str = "${command:PickJavaProcess}";

/// Key correlating a configuration with an in-flight progress reporter.
pub const PROGRESS_ID_KEY: &str = "__progressId";

/// A workspace folder a configuration is resolved in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFolder {
    pub name: String,
    pub path: PathBuf,
}

impl WorkspaceFolder {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Platform::Windows,
            "macos" => Platform::MacOs,
            "linux" => Platform::Linux,
            _ => Platform::Other,
        }
    }

    /// Key of the platform-specific property block in a launch configuration.
    pub fn override_key(self) -> Option<&'static str> {
        match self {
            Platform::Windows => Some("windows"),
            Platform::MacOs => Some("osx"),
            Platform::Linux => Some("linux"),
            Platform::Other => None,
        }
    }

    pub fn path_delimiter(self) -> char {
        match self {
            Platform::Windows => ';',
            _ => ':',
        }
    }

    pub fn has_case_insensitive_paths(self) -> bool {
        matches!(self, Platform::Windows | Platform::MacOs)
    }
}

const PLATFORM_OVERRIDE_KEYS: [&str; 3] = ["windows", "osx", "linux"];

/// Folds the current platform's override block into the top level and drops
/// every platform block afterwards.
pub fn merge_platform_overrides(raw: &mut Map<String, Value>, platform: Platform) {
    let overrides = platform
        .override_key()
        .and_then(|key| raw.get(key))
        .and_then(Value::as_object)
        .cloned();

    for key in PLATFORM_OVERRIDE_KEYS {
        raw.remove(key);
    }

    if let Some(overrides) = overrides {
        for (key, value) in overrides {
            raw.insert(key, value);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Launch,
    Attach,
}

impl RequestKind {
    pub fn parse(request: Option<&str>) -> Result<Self, UserError> {
        match request {
            Some("launch") => Ok(RequestKind::Launch),
            Some("attach") => Ok(RequestKind::Attach),
            other => Err(UserError::usage(format!(
                "Request type \"{}\" is not supported. Only \"launch\" and \"attach\" are supported.",
                other.unwrap_or_default()
            ))
            .with_anchor(anchor::REQUEST_TYPE_NOT_SUPPORTED)),
        }
    }
}

/// `args`/`vmArgs` may be a preformatted string or a list of tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgsValue {
    Text(String),
    Tokens(Vec<Value>),
}

impl ArgsValue {
    /// Collapses the value into a single command-line string.
    pub fn into_text(self) -> String {
        match self {
            ArgsValue::Text(text) => text,
            ArgsValue::Tokens(tokens) => crate::args::concat_args(&tokens),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArgsValue::Text(text) => Some(text),
            ArgsValue::Tokens(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessIdValue {
    Number(i64),
    Text(String),
}

impl ProcessIdValue {
    pub fn is_pick_sentinel(&self) -> bool {
        matches!(self, ProcessIdValue::Text(text) if text == PICK_PROCESS_SENTINEL)
    }

    pub fn to_pid(&self) -> Option<u32> {
        match self {
            ProcessIdValue::Number(n) => u32::try_from(*n).ok(),
            ProcessIdValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for ProcessIdValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessIdValue::Number(n) => write!(f, "{n}"),
            ProcessIdValue::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsoleKind {
    InternalConsole,
    IntegratedTerminal,
    ExternalTerminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortenCommandLine {
    None,
    #[serde(rename = "jarmanifest")]
    JarManifest,
    #[serde(rename = "argfile")]
    ArgFile,
    Auto,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFilters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_classes: Vec<String>,
    #[serde(default)]
    pub skip_synthetics: bool,
    #[serde(default)]
    pub skip_static_initializers: bool,
    #[serde(default)]
    pub skip_constructors: bool,
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(u64),
        Text(String),
    }

    let raw = Option::<RawPort>::deserialize(deserializer)?;
    let port = match raw {
        None => return Ok(None),
        Some(RawPort::Number(n)) => u16::try_from(n).ok(),
        Some(RawPort::Text(text)) if text.trim().is_empty() => return Ok(None),
        Some(RawPort::Text(text)) => text.trim().parse::<u16>().ok(),
    };
    port.map(Some)
        .ok_or_else(|| serde::de::Error::custom("`port` must be an integer between 0 and 65535"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugConfiguration {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub module_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_exec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_args: Option<ArgsValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<ArgsValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console: Option<ConsoleKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shorten_command_line: Option<ShortenCommandLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_filters: Option<StepFilters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher_script: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_port",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<ProcessIdValue>,

    #[serde(
        rename = "__progressId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub progress_id: Option<String>,

    /// Keys this crate does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DebugConfiguration {
    pub fn from_raw(raw: Map<String, Value>) -> Result<Self, UserError> {
        serde_json::from_value(Value::Object(raw)).map_err(|err| {
            UserError::usage(format!("The debug configuration is malformed: {err}"))
        })
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    pub fn main_class(&self) -> Option<&str> {
        self.main_class.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn has_external_paths(&self) -> bool {
        !self.class_paths.is_empty() || !self.module_paths.is_empty()
    }

    pub fn vm_args_text(&self) -> Option<&str> {
        self.vm_args.as_ref().and_then(ArgsValue::as_text)
    }

    /// `request == launch`, runnable paths present, a concrete main class and a
    /// runtime executable.
    pub fn is_launch_ready(&self) -> bool {
        self.request.as_deref() == Some("launch")
            && self.has_external_paths()
            && self
                .main_class()
                .is_some_and(|main| !std::path::Path::new(main).is_file())
            && self.java_exec.as_deref().is_some_and(|exec| !exec.is_empty())
    }

    pub fn is_attach_ready(&self) -> bool {
        self.request.as_deref() == Some("attach")
            && self.host_name.as_deref().is_some_and(|host| !host.is_empty())
            && self.port.is_some()
            && self.process_id.is_none()
    }
}
