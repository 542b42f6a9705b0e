//! Runtime paths, executable and command-line strategy for a resolved entry point.

use std::path::Path;

use crate::config::{ArgsValue, ConsoleKind, DebugConfiguration, Platform, ShortenCommandLine};
use crate::error::{anchor, Resolution, StageResult, UserError};
use crate::gateway::{CommandGateway, ResolvedClasspath};
use crate::progress::ProgressReporter;
use crate::runtime::RuntimeInspector;

/// Expands to the language server's resolved paths.
pub const AUTO_PATHS: &str = "$Auto";
pub const ENABLE_PREVIEW_FLAG: &str = "--enable-preview";
/// First runtime with preview language features.
pub const MIN_PREVIEW_RUNTIME: u32 = 12;

const ARG_MAX_WINDOWS: usize = 32_768;
const ARG_MAX_MACOS: usize = 262_144;
const ARG_MAX_LINUX: usize = 2_097_152;
const MAX_ARG_STRLEN_LINUX: usize = 131_072;

fn is_placeholder(entry: &str) -> bool {
    entry == AUTO_PATHS || entry.starts_with('!')
}

/// Whether the configured paths need the language server's resolution.
pub fn needs_path_resolution(config: &DebugConfiguration) -> bool {
    !config.has_external_paths()
        || config
            .class_paths
            .iter()
            .chain(&config.module_paths)
            .any(|entry| is_placeholder(entry))
}

/// Applies `$Auto` and `!excluded` entries of `configured` against `resolved`.
///
/// A list made only of exclusions behaves as if it also contained `$Auto`.
/// Lists without placeholders are returned unchanged.
pub fn merge_paths(configured: &[String], resolved: &[String]) -> Vec<String> {
    if !configured.iter().any(|entry| is_placeholder(entry)) {
        return configured.to_vec();
    }

    let excluded: Vec<&str> = configured
        .iter()
        .filter_map(|entry| entry.strip_prefix('!'))
        .collect();
    let has_auto = configured.iter().any(|entry| entry == AUTO_PATHS);
    let only_exclusions = configured.iter().all(|entry| entry.starts_with('!'));

    let mut merged: Vec<String> = Vec::new();
    let mut push = |entry: &String| {
        if !excluded.contains(&entry.as_str()) && !merged.contains(entry) {
            merged.push(entry.clone());
        }
    };
    if only_exclusions && !has_auto {
        resolved.iter().for_each(&mut push);
    }
    for entry in configured {
        if entry == AUTO_PATHS {
            resolved.iter().for_each(&mut push);
        } else if !entry.starts_with('!') {
            push(entry);
        }
    }
    merged
}

fn env_length(config: &DebugConfiguration) -> usize {
    config
        .env
        .iter()
        .flatten()
        .map(|(key, value)| key.len() + value.len() + 1)
        .sum()
}

fn max_command_line_length(platform: Platform, env_length: usize) -> usize {
    match platform {
        Platform::Windows => ARG_MAX_WINDOWS,
        Platform::MacOs => ARG_MAX_MACOS.saturating_sub(env_length),
        Platform::Linux => ARG_MAX_LINUX.saturating_sub(env_length),
        Platform::Other => usize::MAX,
    }
}

fn max_arg_length(platform: Platform) -> usize {
    match platform {
        Platform::Linux => MAX_ARG_STRLEN_LINUX,
        _ => usize::MAX,
    }
}

fn args_text(value: &Option<ArgsValue>) -> String {
    value.clone().map(ArgsValue::into_text).unwrap_or_default()
}

/// Estimated length of `java [vmArgs] [--module-path ..] [-cp ..] mainClass [args]`.
pub fn launch_command_length(config: &DebugConfiguration, platform: Platform) -> usize {
    let delimiter = platform.path_delimiter().to_string();
    let mut length = config.java_exec.as_deref().unwrap_or("java").len();
    let vm_args = args_text(&config.vm_args);
    if !vm_args.is_empty() {
        length += 1 + vm_args.len();
    }
    if !config.module_paths.is_empty() {
        length += " --module-path ".len() + config.module_paths.join(&delimiter).len();
    }
    if !config.class_paths.is_empty() {
        length += " -cp ".len() + config.class_paths.join(&delimiter).len();
    }
    length += 1 + config.main_class().unwrap_or_default().len();
    let args = args_text(&config.args);
    if !args.is_empty() {
        length += 1 + args.len();
    }
    length
}

pub fn needs_shortening(config: &DebugConfiguration, platform: Platform) -> bool {
    let delimiter = platform.path_delimiter().to_string();
    match config.console.unwrap_or(ConsoleKind::IntegratedTerminal) {
        ConsoleKind::InternalConsole => {
            let max_arg = max_arg_length(platform);
            launch_command_length(config, platform)
                >= max_command_line_length(platform, env_length(config))
                || config.class_paths.join(&delimiter).len() >= max_arg
                || config.module_paths.join(&delimiter).len() >= max_arg
        }
        ConsoleKind::IntegratedTerminal | ConsoleKind::ExternalTerminal => {
            config.class_paths.len() > 1 || config.module_paths.len() > 1
        }
    }
}

/// `jarmanifest` for Java 8 and older, `argfile` otherwise.
pub fn shorten_strategy(
    config: &DebugConfiguration,
    platform: Platform,
    runtime_version: Option<u32>,
) -> ShortenCommandLine {
    if !needs_shortening(config, platform) {
        return ShortenCommandLine::None;
    }
    match runtime_version {
        Some(version) if version <= 8 => ShortenCommandLine::JarManifest,
        _ => ShortenCommandLine::ArgFile,
    }
}

pub struct ClasspathResolver<'a> {
    pub gateway: &'a CommandGateway,
    pub runtime: &'a dyn RuntimeInspector,
    pub platform: Platform,
}

impl ClasspathResolver<'_> {
    /// Fills `modulePaths`/`classPaths`, `javaExec`, the preview flag and the
    /// command-line shortening strategy. `mainClass` must already be concrete.
    pub async fn resolve(
        &self,
        config: &mut DebugConfiguration,
        progress: &ProgressReporter,
    ) -> StageResult<()> {
        let main_class = config.main_class().unwrap_or_default().to_string();
        let project_name = config.project_name.clone();

        if needs_path_resolution(config) {
            if progress.is_cancelled() {
                return Ok(Resolution::Abandoned);
            }
            progress.report("classpath", "Resolving modulepaths/classpaths...");
            let resolved = self
                .gateway
                .resolve_classpath(&main_class, project_name.as_deref())
                .await?;
            if progress.is_cancelled() {
                return Ok(Resolution::Abandoned);
            }
            apply_resolved_paths(config, resolved);
        }

        if !config.has_external_paths() {
            return Err(UserError::usage(
                "Cannot resolve the modulepaths/classpaths automatically, please specify the value in the launch.json.",
            )
            .with_anchor(anchor::CLASSPATH_MISSING)
            .into());
        }

        if config.java_exec.as_deref().map_or(true, str::is_empty) {
            progress.report("javaExec", "Resolving Java runtime...");
            let java_exec = self
                .gateway
                .resolve_java_executable(&main_class, project_name.as_deref())
                .await?;
            if progress.is_cancelled() {
                return Ok(Resolution::Abandoned);
            }
            config.java_exec = Some(java_exec);
        }
        let runtime_version = config
            .java_exec
            .as_deref()
            .and_then(|exec| self.runtime.java_version(Path::new(exec)));

        let preview = self
            .gateway
            .detect_preview_flag(&main_class, project_name.as_deref())
            .await?;
        if progress.is_cancelled() {
            return Ok(Resolution::Abandoned);
        }
        if preview {
            enable_preview(config, runtime_version)?;
        }

        if matches!(
            config.shorten_command_line,
            None | Some(ShortenCommandLine::Auto)
        ) {
            let strategy = shorten_strategy(config, self.platform, runtime_version);
            tracing::debug!(
                target: "nova.debug_config",
                ?strategy,
                ?runtime_version,
                "selected command line shortening strategy"
            );
            config.shorten_command_line = Some(strategy);
        }

        Ok(Resolution::Resolved(()))
    }
}

fn apply_resolved_paths(config: &mut DebugConfiguration, resolved: ResolvedClasspath) {
    if !config.has_external_paths() {
        config.module_paths = resolved.module_paths;
        config.class_paths = resolved.class_paths;
        return;
    }
    config.module_paths = merge_paths(&config.module_paths, &resolved.module_paths);
    config.class_paths = merge_paths(&config.class_paths, &resolved.class_paths);
}

fn enable_preview(
    config: &mut DebugConfiguration,
    runtime_version: Option<u32>,
) -> Result<(), UserError> {
    if let Some(version) = runtime_version.filter(|version| *version < MIN_PREVIEW_RUNTIME) {
        return Err(UserError::usage(format!(
            "The project enables Java preview features, which need Java {MIN_PREVIEW_RUNTIME} or newer, but the selected runtime '{}' is Java {version}.",
            config.java_exec.as_deref().unwrap_or("java")
        ))
        .with_anchor(anchor::PREVIEW_RUNTIME));
    }

    let vm_args = args_text(&config.vm_args);
    if vm_args.split_whitespace().any(|arg| arg == ENABLE_PREVIEW_FLAG) {
        config.vm_args = Some(ArgsValue::Text(vm_args));
        return Ok(());
    }
    let vm_args = if vm_args.trim().is_empty() {
        ENABLE_PREVIEW_FLAG.to_string()
    } else {
        format!("{vm_args} {ENABLE_PREVIEW_FLAG}")
    };
    config.vm_args = Some(ArgsValue::Text(vm_args));
    Ok(())
}
