//! `nova-debug-config` resolves Java launch/attach requests into complete
//! debug configurations.
//!
//! An editor hands [`DebugConfigurationProvider::resolve`] a partially filled
//! configuration (often a `launch.json` entry). The provider fills in the main
//! class, module/class paths, runtime and attach endpoint by asking the Java
//! language server, prompts the user when there is more than one sensible
//! answer, and writes accepted fixes back to the stored launch configurations.
//!
//! The language server, editor UI, progress UI, process inspection and
//! launch-configuration storage are collaborators behind traits; this crate
//! only sequences them.

pub mod args;
pub mod attach;
pub mod classpath;
pub mod compile;
pub mod config;
pub mod error;
pub mod gateway;
pub mod host;
pub mod main_class;
pub mod persist;
pub mod progress;
pub mod provider;
pub mod runtime;
pub mod settings;

pub use tokio_util::sync::CancellationToken;

pub use attach::{JavaProcess, ProcessInspector};
pub use config::{DebugConfiguration, Platform, WorkspaceFolder};
pub use error::{GatewayError, ResolveError, Resolution, StageResult, UserError, UserErrorKind};
pub use gateway::{CommandGateway, EditorCommands, LanguageServer, MainClassOption};
pub use host::{ChoiceItem, Host, Severity};
pub use persist::{LaunchConfigStore, LaunchJsonFile, PersistError};
pub use progress::{ProgressRegistry, ProgressReporter, ProgressSink};
pub use provider::{Collaborators, DebugConfigurationProvider, ProviderOptions};
pub use runtime::{ReleaseFileInspector, RuntimeInspector};
pub use settings::{init_tracing, ConfigError, DebugSettings, LoggingConfig};
