//! The resolution state machine driving one debug configuration from what the
//! editor handed us to something a debug adapter can launch or attach with.
//!
//! ```text
//! merge platform overrides -> synthesize if empty -> refresh settings
//!   -> launch: build -> main class -> paths/runtime -> fields -> launcher
//!   -> attach: host/port or process id
//!   -> finalize
//! ```
//!
//! Every stage returns a [`StageResult`]. Abandonment short-circuits silently;
//! errors are reported to the user here and never escape [`DebugConfigurationProvider::resolve`].

use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::args::load_env_file;
use crate::attach::{AttachResolver, ProcessInspector};
use crate::classpath::ClasspathResolver;
use crate::compile::BuildStep;
use crate::config::{
    merge_platform_overrides, ArgsValue, ConsoleKind, DebugConfiguration, Platform, RequestKind,
    WorkspaceFolder, JAVA_DEBUG_TYPE, PROGRESS_ID_KEY,
};
use crate::error::{resolved, ResolveError, Resolution, StageResult, UserError, UserErrorKind};
use crate::gateway::{CommandGateway, EditorCommands, LanguageServer};
use crate::host::{guide_to_install_java_extension, show_user_error, Host};
use crate::main_class::{
    dedupe_and_sort, LaunchTargetInput, LaunchTargetResolver, RecentChoices,
    DEFAULT_RECENT_CAPACITY,
};
use crate::persist::LaunchConfigStore;
use crate::progress::{ProgressGuard, ProgressRegistry, ProgressReporter, ProgressSink};
use crate::runtime::RuntimeInspector;
use crate::settings::DebugSettings;

const PROGRESS_TITLE: &str = "Resolving Java debug configuration";
const DEFAULT_CONFIG_NAME: &str = "Java Debug";
const CURRENT_FILE_CONFIG_NAME: &str = "Current File";

/// External services the provider talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub language_server: Arc<dyn LanguageServer>,
    pub editor: Arc<dyn EditorCommands>,
    pub host: Arc<dyn Host>,
    pub store: Arc<dyn LaunchConfigStore>,
    pub processes: Arc<dyn ProcessInspector>,
    pub runtime: Arc<dyn RuntimeInspector>,
    pub progress: Arc<dyn ProgressSink>,
}

#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub platform: Platform,
    /// Wrapper script used for terminal launches on Windows.
    pub launcher_script: Option<PathBuf>,
    pub recent_capacity: usize,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            launcher_script: None,
            recent_capacity: DEFAULT_RECENT_CAPACITY,
        }
    }
}

pub struct DebugConfigurationProvider {
    gateway: CommandGateway,
    host: Arc<dyn Host>,
    store: Arc<dyn LaunchConfigStore>,
    processes: Arc<dyn ProcessInspector>,
    runtime: Arc<dyn RuntimeInspector>,
    progress: ProgressRegistry,
    settings: RwLock<DebugSettings>,
    /// Set when settings changed without an active session; consumed by the
    /// next resolution.
    settings_dirty: AtomicBool,
    recent: RecentChoices,
    options: ProviderOptions,
}

impl DebugConfigurationProvider {
    pub fn new(
        collaborators: Collaborators,
        settings: DebugSettings,
        options: ProviderOptions,
    ) -> Self {
        Self {
            gateway: CommandGateway::new(collaborators.language_server, collaborators.editor),
            host: collaborators.host,
            store: collaborators.store,
            processes: collaborators.processes,
            runtime: collaborators.runtime,
            progress: ProgressRegistry::new(collaborators.progress),
            settings: RwLock::new(settings),
            settings_dirty: AtomicBool::new(true),
            recent: RecentChoices::new(options.recent_capacity),
            options,
        }
    }

    pub fn gateway(&self) -> &CommandGateway {
        &self.gateway
    }

    /// Reporters created here are picked up by a resolution whose
    /// configuration carries their id in `__progressId`.
    pub fn progress_registry(&self) -> &ProgressRegistry {
        &self.progress
    }

    pub fn recent_choices(&self) -> &RecentChoices {
        &self.recent
    }

    pub fn settings(&self) -> DebugSettings {
        self.settings.read().clone()
    }

    pub fn is_settings_dirty(&self) -> bool {
        self.settings_dirty.load(Ordering::Acquire)
    }

    /// Replaces the current settings and forwards them like
    /// [`Self::on_settings_changed`].
    pub async fn update_settings(&self, settings: DebugSettings, session_active: bool) {
        *self.settings.write() = settings;
        self.on_settings_changed(session_active).await;
    }

    /// Pushes settings right away while a debug session runs; otherwise defers
    /// the push to the next resolution.
    pub async fn on_settings_changed(&self, session_active: bool) {
        if session_active {
            self.push_settings().await;
        } else {
            self.settings_dirty.store(true, Ordering::Release);
        }
    }

    async fn refresh_settings_if_dirty(&self) {
        if self.settings_dirty.swap(false, Ordering::AcqRel) {
            self.push_settings().await;
        }
    }

    async fn push_settings(&self) {
        let payload = self.settings.read().to_language_server_payload();
        match self.gateway.update_debug_settings(&payload).await {
            Ok(_) => tracing::debug!(target: "nova.debug_config", "pushed debug settings"),
            Err(err) => tracing::warn!(
                target: "nova.debug_config",
                error = %err,
                "failed to push debug settings to the language server"
            ),
        }
    }

    /// Initial entries for a new `launch.json`.
    pub async fn provide_configurations(
        &self,
        folder: Option<&WorkspaceFolder>,
    ) -> Vec<DebugConfiguration> {
        let mut configurations = vec![launch_entry(CURRENT_FILE_CONFIG_NAME, "${file}", None)];

        let options = match self
            .gateway
            .resolve_main_class(folder.map(|folder| folder.path.as_path()))
            .await
        {
            Ok(options) => dedupe_and_sort(options),
            Err(err) => {
                self.report_failure(err.into()).await;
                return configurations;
            }
        };

        let mut simple_name_counts: HashMap<&str, usize> = HashMap::new();
        for option in &options {
            *simple_name_counts.entry(simple_name(&option.main_class)).or_default() += 1;
        }
        let mut used: HashSet<String> = HashSet::new();
        for option in &options {
            let simple = simple_name(&option.main_class);
            let base = match option.project_name.as_deref() {
                Some(project) if simple_name_counts[simple] > 1 => {
                    format!("Launch {simple}({project})")
                }
                _ => format!("Launch {simple}"),
            };
            // Same simple name in the same (or no) project: number the repeats.
            let mut name = base.clone();
            let mut counter = 1;
            while !used.insert(name.clone()) {
                counter += 1;
                name = format!("{base} ({counter})");
            }
            configurations.push(launch_entry(
                &name,
                &option.main_class,
                option.project_name.as_deref(),
            ));
        }
        configurations
    }

    /// Resolves `raw` into a launchable configuration. `None` means the
    /// resolution was abandoned; any error has already been shown to the user.
    pub async fn resolve(
        &self,
        folder: Option<&WorkspaceFolder>,
        raw: Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Option<DebugConfiguration> {
        let stored = Value::Object(raw.clone());
        let progress = ProgressGuard::new(self.progress_for(&raw));
        progress.observe(cancel);

        let outcome = self.run(folder, raw, &stored, &progress).await;
        drop(progress);

        match outcome {
            Ok(Resolution::Resolved(config)) => Some(config),
            Ok(Resolution::Abandoned) => {
                tracing::debug!(target: "nova.debug_config", "debug configuration resolution abandoned");
                None
            }
            Err(err) => {
                self.report_failure(err).await;
                None
            }
        }
    }

    fn progress_for(&self, raw: &Map<String, Value>) -> Arc<ProgressReporter> {
        raw.get(PROGRESS_ID_KEY)
            .and_then(Value::as_str)
            .and_then(|id| self.progress.take(id))
            .unwrap_or_else(|| self.progress.create_detached(PROGRESS_TITLE))
    }

    async fn run(
        &self,
        folder: Option<&WorkspaceFolder>,
        mut raw: Map<String, Value>,
        stored: &Value,
        progress: &ProgressReporter,
    ) -> StageResult<DebugConfiguration> {
        merge_platform_overrides(&mut raw, self.options.platform);
        if is_empty_configuration(&raw) {
            raw.insert("type".to_string(), json!(JAVA_DEBUG_TYPE));
            raw.insert("name".to_string(), json!(DEFAULT_CONFIG_NAME));
            raw.insert("request".to_string(), json!("launch"));
        }
        let mut config = DebugConfiguration::from_raw(raw)?;

        self.refresh_settings_if_dirty().await;
        if progress.is_cancelled() {
            return Ok(Resolution::Abandoned);
        }

        match RequestKind::parse(config.request.as_deref())? {
            RequestKind::Launch => {
                resolved!(self.launch(folder, &mut config, stored, progress).await)
            }
            RequestKind::Attach => {
                let attach = AttachResolver {
                    processes: self.processes.as_ref(),
                };
                resolved!(attach.resolve(&mut config, progress).await)
            }
        }

        config.progress_id = None;
        Ok(Resolution::Resolved(config))
    }

    async fn launch(
        &self,
        folder: Option<&WorkspaceFolder>,
        config: &mut DebugConfiguration,
        stored: &Value,
        progress: &ProgressReporter,
    ) -> StageResult<()> {
        let settings = self.settings();

        if settings.force_build_before_launch {
            let build = BuildStep {
                gateway: &self.gateway,
                host: self.host.as_ref(),
                proceed_on_failure: settings.on_build_failure_proceed,
            };
            resolved!(build.run(progress).await);
        }

        let targets = LaunchTargetResolver {
            gateway: &self.gateway,
            host: self.host.as_ref(),
            store: self.store.as_ref(),
            recent: &self.recent,
            platform: self.options.platform,
        };
        let input = LaunchTargetInput {
            folder,
            config: &*config,
            stored,
        };
        let target = resolved!(targets.resolve(input, progress).await);
        config.main_class = Some(target.main_class);
        config.project_name = target.project_name;

        if config.console.is_none() {
            config.console = Some(settings.console.unwrap_or(ConsoleKind::IntegratedTerminal));
        }

        let paths = ClasspathResolver {
            gateway: &self.gateway,
            runtime: self.runtime.as_ref(),
            platform: self.options.platform,
        };
        resolved!(paths.resolve(config, progress).await);

        populate_launch_fields(config, folder, &settings)?;
        self.apply_launcher_script(config);
        Ok(Resolution::Resolved(()))
    }

    fn apply_launcher_script(&self, config: &mut DebugConfiguration) {
        if self.options.platform != Platform::Windows
            || config.console == Some(ConsoleKind::InternalConsole)
            || config.launcher_script.is_some()
        {
            return;
        }
        if let Some(script) = &self.options.launcher_script {
            config.launcher_script = Some(script.display().to_string());
        }
    }

    async fn report_failure(&self, err: ResolveError) {
        let host = self.host.as_ref();
        match err {
            ResolveError::NotActivated => {
                tracing::info!(target: "nova.debug_config", "Java language support is not active");
                guide_to_install_java_extension(host, &self.gateway).await;
            }
            ResolveError::User(err) => {
                tracing::info!(
                    target: "nova.debug_config",
                    anchor = err.anchor.as_deref().unwrap_or_default(),
                    "{}",
                    err.message
                );
                show_user_error(host, &self.gateway, &err, &[]).await;
            }
            ResolveError::Internal(err) => {
                tracing::error!(target: "nova.debug_config", error = ?err, "debug configuration resolution failed");
                let err = UserError {
                    message: err.to_string(),
                    kind: UserErrorKind::Internal,
                    anchor: None,
                };
                show_user_error(host, &self.gateway, &err, &[]).await;
            }
        }
    }
}

fn is_empty_configuration(raw: &Map<String, Value>) -> bool {
    ["type", "request", "name"]
        .iter()
        .all(|key| raw.get(*key).map_or(true, Value::is_null))
}

fn simple_name(main_class: &str) -> &str {
    main_class.rsplit('.').next().unwrap_or(main_class)
}

fn launch_entry(name: &str, main_class: &str, project_name: Option<&str>) -> DebugConfiguration {
    DebugConfiguration {
        type_: JAVA_DEBUG_TYPE.to_string(),
        name: name.to_string(),
        request: Some("launch".to_string()),
        main_class: Some(main_class.to_string()),
        project_name: project_name.map(str::to_string),
        ..DebugConfiguration::default()
    }
}

/// Argument strings, environment, working directory and step filters.
fn populate_launch_fields(
    config: &mut DebugConfiguration,
    folder: Option<&WorkspaceFolder>,
    settings: &DebugSettings,
) -> Result<(), UserError> {
    if config.cwd.as_deref().map_or(true, str::is_empty) {
        config.cwd = folder.map(|folder| folder.path.display().to_string());
    }

    config.args = config.args.take().map(|args| ArgsValue::Text(args.into_text()));
    config.vm_args = config
        .vm_args
        .take()
        .map(|vm_args| ArgsValue::Text(vm_args.into_text()));

    if let Some(env_file) = config.env_file.take().filter(|file| !file.trim().is_empty()) {
        let path = resolve_relative(Path::new(&env_file), folder);
        let mut env = load_env_file(&path)?;
        env.extend(config.env.take().unwrap_or_default());
        config.env = Some(env);
    }

    if config.step_filters.is_none() {
        config.step_filters = Some(settings.step_filters.clone());
    }
    Ok(())
}

fn resolve_relative(path: &Path, folder: Option<&WorkspaceFolder>) -> PathBuf {
    match folder {
        Some(folder) if path.is_relative() => folder.path.join(path),
        _ => path.to_path_buf(),
    }
}
