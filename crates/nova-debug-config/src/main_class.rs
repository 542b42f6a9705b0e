//! Launch-target resolution: turning an empty, file-path or qualified
//! `mainClass` into a concrete entry point.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::config::{DebugConfiguration, Platform, WorkspaceFolder};
use crate::error::{anchor, Resolution, StageResult, UserError};
use crate::gateway::{CommandGateway, LaunchValidation, MainClassOption};
use crate::host::{show_user_error, ChoiceItem, Host};
use crate::persist::{persist_configuration, LaunchConfigStore};
use crate::progress::ProgressReporter;

pub const DEFAULT_RECENT_CAPACITY: usize = 16;

const FIX: &str = "Fix";

type ChoiceKey = (String, Option<String>);

fn owned_key(option: &MainClassOption) -> ChoiceKey {
    (option.main_class.clone(), option.project_name.clone())
}

/// Most-recently-selected main classes, newest first.
#[derive(Debug)]
pub struct RecentChoices {
    capacity: usize,
    entries: Mutex<VecDeque<ChoiceKey>>,
}

impl Default for RecentChoices {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_CAPACITY)
    }
}

impl RecentChoices {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(&self, option: &MainClassOption) {
        let key = owned_key(option);
        let mut entries = self.entries.lock();
        entries.retain(|existing| existing != &key);
        entries.push_front(key);
        entries.truncate(self.capacity);
    }

    /// Recency rank of `option` (0 = most recent).
    pub fn rank(&self, option: &MainClassOption) -> Option<usize> {
        let key = owned_key(option);
        self.entries.lock().iter().position(|existing| existing == &key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes duplicate `(mainClass, projectName)` entries and orders the rest by
/// main class name, keeping the incoming order for ties.
pub fn dedupe_and_sort(options: Vec<MainClassOption>) -> Vec<MainClassOption> {
    let mut seen = HashSet::new();
    let mut unique: Vec<MainClassOption> = options
        .into_iter()
        .filter(|option| seen.insert(owned_key(option)))
        .collect();
    unique.sort_by(|a, b| a.main_class.cmp(&b.main_class));
    unique
}

/// Moves recently chosen options to the front, newest first.
pub fn order_by_recent(
    options: Vec<MainClassOption>,
    recent: &RecentChoices,
) -> Vec<MainClassOption> {
    let mut ranked: Vec<(usize, MainClassOption)> = Vec::new();
    let mut rest = Vec::new();
    for option in options {
        match recent.rank(&option) {
            Some(rank) => ranked.push((rank, option)),
            None => rest.push(option),
        }
    }
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, option)| option).chain(rest).collect()
}

pub fn same_file(a: &Path, b: &Path, platform: Platform) -> bool {
    if platform.has_case_insensitive_paths() {
        a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
    } else {
        a == b
    }
}

fn choice_item(option: &MainClassOption, recently_used: bool) -> ChoiceItem {
    ChoiceItem {
        label: option.main_class.clone(),
        description: option
            .project_name
            .as_ref()
            .map(|project| format!("<{project}>")),
        detail: if recently_used {
            Some("recently used".to_string())
        } else {
            option.file_path.clone()
        },
    }
}

pub struct MainClassPicker<'a> {
    host: &'a dyn Host,
    recent: &'a RecentChoices,
    platform: Platform,
}

impl<'a> MainClassPicker<'a> {
    pub fn new(host: &'a dyn Host, recent: &'a RecentChoices, platform: Platform) -> Self {
        Self {
            host,
            recent,
            platform,
        }
    }

    /// Lets the user pick one option. A single option is returned without
    /// prompting when `auto_pick` is set.
    pub async fn pick(
        &self,
        options: Vec<MainClassOption>,
        placeholder: &str,
        auto_pick: bool,
    ) -> Option<MainClassOption> {
        let options = dedupe_and_sort(options);
        if auto_pick && options.len() == 1 {
            return options.into_iter().next();
        }
        let items: Vec<ChoiceItem> = options.iter().map(|o| choice_item(o, false)).collect();
        let picked = self.prompt(options, &items, placeholder).await;
        if let Some(option) = &picked {
            self.recent.record(option);
        }
        picked
    }

    /// Like [`Self::pick`], but recently chosen options come first and an
    /// option declared in `active_file` is chosen without prompting when it is
    /// the only one.
    pub async fn pick_with_recent(
        &self,
        options: Vec<MainClassOption>,
        placeholder: &str,
        active_file: Option<&Path>,
    ) -> Option<MainClassOption> {
        let options = dedupe_and_sort(options);
        if options.len() == 1 {
            self.recent.record(&options[0]);
            return options.into_iter().next();
        }

        if let Some(active_file) = active_file {
            let mut in_active_file = options.iter().filter(|option| {
                option
                    .file_path
                    .as_deref()
                    .is_some_and(|file| same_file(Path::new(file), active_file, self.platform))
            });
            if let (Some(only), None) = (in_active_file.next(), in_active_file.next()) {
                let only = only.clone();
                self.recent.record(&only);
                return Some(only);
            }
        }

        let options = order_by_recent(options, self.recent);
        let items: Vec<ChoiceItem> = options
            .iter()
            .map(|option| choice_item(option, self.recent.rank(option).is_some()))
            .collect();
        let picked = self.prompt(options, &items, placeholder).await;
        if let Some(option) = &picked {
            self.recent.record(option);
        }
        picked
    }

    async fn prompt(
        &self,
        options: Vec<MainClassOption>,
        items: &[ChoiceItem],
        placeholder: &str,
    ) -> Option<MainClassOption> {
        let index = self.host.show_choice(items, placeholder).await?;
        options.into_iter().nth(index)
    }
}

fn no_main_class_message(folder: Option<&WorkspaceFolder>) -> String {
    match folder {
        Some(folder) => format!(
            "Cannot find a class with the main method in the folder '{}'.",
            folder.name
        ),
        None => "Cannot find a class with the main method.".to_string(),
    }
}

/// Everything the launch-target stage needs from its caller.
pub struct LaunchTargetInput<'a> {
    pub folder: Option<&'a WorkspaceFolder>,
    pub config: &'a DebugConfiguration,
    /// The configuration as the editor stored it, used to find it again when
    /// persisting a fix.
    pub stored: &'a Value,
}

pub struct LaunchTargetResolver<'a> {
    pub gateway: &'a CommandGateway,
    pub host: &'a dyn Host,
    pub store: &'a dyn LaunchConfigStore,
    pub recent: &'a RecentChoices,
    pub platform: Platform,
}

impl LaunchTargetResolver<'_> {
    fn picker(&self) -> MainClassPicker<'_> {
        MainClassPicker::new(self.host, self.recent, self.platform)
    }

    pub async fn resolve(
        &self,
        input: LaunchTargetInput<'_>,
        progress: &ProgressReporter,
    ) -> StageResult<MainClassOption> {
        let config = input.config;
        let file_target = config
            .main_class()
            .map(PathBuf::from)
            .filter(|path| path.is_file());

        match config.main_class() {
            Some(_) if file_target.is_none() => self.validate(input, progress).await,
            _ => {
                let current_file = file_target.or_else(|| self.host.active_file());
                self.resolve_ambiguous(input.folder, current_file.as_deref(), progress)
                    .await
            }
        }
    }

    async fn resolve_ambiguous(
        &self,
        folder: Option<&WorkspaceFolder>,
        current_file: Option<&Path>,
        progress: &ProgressReporter,
    ) -> StageResult<MainClassOption> {
        if let Some(file) = current_file {
            progress.report("mainClass", "Searching main class in the current file...");
            let entries = self.gateway.resolve_main_method(file).await?;
            if progress.is_cancelled() {
                return Ok(Resolution::Abandoned);
            }
            if !entries.is_empty() {
                let picked = self
                    .picker()
                    .pick(entries, "Please select a main class you want to run.", true)
                    .await;
                return Ok(self.finish_prompt(picked, progress));
            }
        }

        let hint = match current_file.and_then(Path::file_name) {
            Some(name) => format!(
                "The file '{}' is not executable, please select a main class you want to run.",
                name.to_string_lossy()
            ),
            None => "Please select a main class you want to run.".to_string(),
        };
        self.prompt_main_class(folder, &hint, progress).await
    }

    async fn prompt_main_class(
        &self,
        folder: Option<&WorkspaceFolder>,
        hint: &str,
        progress: &ProgressReporter,
    ) -> StageResult<MainClassOption> {
        progress.report("mainClass", "Searching main classes...");
        let options = self
            .gateway
            .resolve_main_class(folder.map(|folder| folder.path.as_path()))
            .await?;
        if progress.is_cancelled() {
            return Ok(Resolution::Abandoned);
        }

        if options.is_empty() {
            return Err(UserError::usage(no_main_class_message(folder))
                .with_anchor(anchor::CANNOT_FIND_MAIN_CLASS)
                .into());
        }

        let active_file = self.host.active_file();
        let picked = self
            .picker()
            .pick_with_recent(options, hint, active_file.as_deref())
            .await;
        Ok(self.finish_prompt(picked, progress))
    }

    fn finish_prompt(
        &self,
        picked: Option<MainClassOption>,
        progress: &ProgressReporter,
    ) -> Resolution<MainClassOption> {
        match picked {
            Some(option) if !progress.is_cancelled() => Resolution::Resolved(option),
            _ => Resolution::Abandoned,
        }
    }

    async fn validate(
        &self,
        input: LaunchTargetInput<'_>,
        progress: &ProgressReporter,
    ) -> StageResult<MainClassOption> {
        let config = input.config;
        let main_class = config.main_class().unwrap_or_default();
        progress.report("mainClass", "Validating main class...");
        let validation = self
            .gateway
            .validate_launch_config(
                main_class,
                config.project_name.as_deref(),
                config.has_external_paths(),
                input.folder.map(|folder| folder.path.as_path()),
            )
            .await?;
        if progress.is_cancelled() {
            return Ok(Resolution::Abandoned);
        }

        if validation.is_valid() {
            return Ok(Resolution::Resolved(MainClassOption::new(
                main_class,
                config.project_name.as_deref(),
            )));
        }

        self.fix_main_class(input, validation, progress).await
    }

    async fn fix_main_class(
        &self,
        input: LaunchTargetInput<'_>,
        validation: LaunchValidation,
        progress: &ProgressReporter,
    ) -> StageResult<MainClassOption> {
        let error = UserError::usage(validation.messages().join("\n"))
            .with_anchor(anchor::FAILED_TO_RESOLVE_CLASSPATH);
        if validation.proposals.is_empty() {
            return Err(error.into());
        }

        let answer = show_user_error(self.host, self.gateway, &error, &[FIX]).await;
        if answer.as_deref() != Some(FIX) || progress.is_cancelled() {
            return Ok(Resolution::Abandoned);
        }

        let picked = self
            .picker()
            .pick(
                validation.proposals,
                "Please select main class<project name>.",
                false,
            )
            .await;
        let Resolution::Resolved(fix) = self.finish_prompt(picked, progress) else {
            return Ok(Resolution::Abandoned);
        };

        let updated = corrected_copy(input.stored, &fix);
        persist_configuration(self.store, input.folder, input.stored, updated).await?;
        if progress.is_cancelled() {
            return Ok(Resolution::Abandoned);
        }
        tracing::info!(
            target: "nova.debug_config",
            main_class = %fix.main_class,
            "applied main class fix"
        );
        Ok(Resolution::Resolved(fix))
    }
}

fn corrected_copy(stored: &Value, fix: &MainClassOption) -> Value {
    let mut updated = stored.clone();
    if let Value::Object(map) = &mut updated {
        map.insert("mainClass".to_string(), Value::String(fix.main_class.clone()));
        match &fix.project_name {
            Some(project) => {
                map.insert("projectName".to_string(), Value::String(project.clone()));
            }
            None => {
                map.remove("projectName");
            }
        }
    }
    updated
}
