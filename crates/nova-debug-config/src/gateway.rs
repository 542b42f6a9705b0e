//! Typed access to the Java language server's workspace commands and the
//! editor's command bus.
//!
//! Every language-server call goes through [`CommandGateway::invoke`], which
//! refuses to dispatch while the Java tooling is inactive. That lets callers
//! tell "tooling unavailable" ([`GatewayError::NotActivated`]) apart from
//! "tooling returned an error" ([`GatewayError::Remote`]).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use url::Url;

use crate::error::GatewayError;

pub const RESOLVE_MAIN_CLASS: &str = "vscode.java.resolveMainClass";
pub const RESOLVE_MAIN_METHOD: &str = "vscode.java.resolveMainMethod";
pub const VALIDATE_LAUNCH_CONFIG: &str = "vscode.java.validateLaunchConfig";
pub const RESOLVE_CLASSPATH: &str = "vscode.java.resolveClasspath";
pub const RESOLVE_JAVA_EXECUTABLE: &str = "vscode.java.resolveJavaExecutable";
pub const CHECK_PROJECT_SETTINGS: &str = "vscode.java.checkProjectSettings";
pub const UPDATE_DEBUG_SETTINGS: &str = "vscode.java.updateDebugSettings";
pub const RESOLVE_INLINE_VARIABLES: &str = "vscode.java.resolveInlineVariables";

/// Editor command that forwards a workspace command to the language server.
pub const EXECUTE_WORKSPACE_COMMAND: &str = "java.execute.workspaceCommand";
pub const COMPILE_WORKSPACE: &str = "java.workspace.compile";

const ENABLE_PREVIEW_OPTION: &str = "org.eclipse.jdt.core.compiler.problem.enablePreviewFeatures";

/// The Java language server's command channel.
#[async_trait]
pub trait LanguageServer: Send + Sync {
    /// Whether the Java tooling is installed, enabled and serving requests.
    fn is_active(&self) -> bool;

    async fn execute_command(&self, command: &str, args: Vec<Value>) -> anyhow::Result<Value>;
}

/// The editor's own command bus.
#[async_trait]
pub trait EditorCommands: Send + Sync {
    async fn execute_command(&self, command: &str, args: Vec<Value>) -> anyhow::Result<Value>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainClassOption {
    pub main_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl MainClassOption {
    pub fn new(main_class: impl Into<String>, project_name: Option<&str>) -> Self {
        Self {
            main_class: main_class.into(),
            project_name: project_name.map(str::to_string),
            file_path: None,
        }
    }

    /// Identity used for deduplication and recent-choice memory.
    pub fn key(&self) -> (&str, Option<&str>) {
        (self.main_class.as_str(), self.project_name.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    pub is_valid: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchValidation {
    pub main_class: FieldValidation,
    pub project_name: FieldValidation,
    #[serde(default)]
    pub proposals: Vec<MainClassOption>,
}

impl LaunchValidation {
    pub fn is_valid(&self) -> bool {
        self.main_class.is_valid && self.project_name.is_valid
    }

    pub fn messages(&self) -> Vec<String> {
        [&self.main_class, &self.project_name]
            .into_iter()
            .filter(|field| !field.is_valid)
            .map(|field| field.message.clone().unwrap_or_default())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedClasspath {
    pub module_paths: Vec<String>,
    pub class_paths: Vec<String>,
}

impl ResolvedClasspath {
    pub fn is_empty(&self) -> bool {
        self.module_paths.is_empty() && self.class_paths.is_empty()
    }
}

/// Result of `java.workspace.compile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStatus {
    Failed,
    Succeeded,
    WithError,
    Cancelled,
}

impl CompileStatus {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(CompileStatus::Failed),
            1 => Some(CompileStatus::Succeeded),
            2 => Some(CompileStatus::WithError),
            3 => Some(CompileStatus::Cancelled),
            _ => None,
        }
    }
}

pub fn file_uri(path: &Path) -> String {
    Url::from_file_path(path)
        .map(String::from)
        .unwrap_or_else(|_| path.display().to_string())
}

#[derive(Clone)]
pub struct CommandGateway {
    server: Arc<dyn LanguageServer>,
    editor: Arc<dyn EditorCommands>,
}

impl CommandGateway {
    pub fn new(server: Arc<dyn LanguageServer>, editor: Arc<dyn EditorCommands>) -> Self {
        Self { server, editor }
    }

    pub fn is_active(&self) -> bool {
        self.server.is_active()
    }

    /// Dispatches a language-server workspace command.
    pub async fn invoke(&self, command: &str, args: Vec<Value>) -> Result<Value, GatewayError> {
        if !self.server.is_active() {
            return Err(GatewayError::NotActivated);
        }
        tracing::trace!(target: "nova.debug_config.gateway", command, "invoking language server command");
        Ok(self.server.execute_command(command, args).await?)
    }

    async fn invoke_typed<T: DeserializeOwned>(
        &self,
        command: &str,
        args: Vec<Value>,
    ) -> Result<T, GatewayError> {
        let value = self.invoke(command, args).await?;
        serde_json::from_value(value).map_err(|source| GatewayError::Decode {
            command: command.to_string(),
            source,
        })
    }

    /// Runs an editor command. Failures propagate unchanged.
    pub async fn execute_editor_command(
        &self,
        command: &str,
        args: Vec<Value>,
    ) -> Result<Value, GatewayError> {
        Ok(self.editor.execute_command(command, args).await?)
    }

    pub async fn resolve_main_class(
        &self,
        scope: Option<&Path>,
    ) -> Result<Vec<MainClassOption>, GatewayError> {
        let args = scope.map(|scope| vec![json!(file_uri(scope))]).unwrap_or_default();
        let options: Option<Vec<MainClassOption>> = self.invoke_typed(RESOLVE_MAIN_CLASS, args).await?;
        Ok(options.unwrap_or_default())
    }

    pub async fn resolve_main_method(
        &self,
        file: &Path,
    ) -> Result<Vec<MainClassOption>, GatewayError> {
        let options: Option<Vec<MainClassOption>> = self
            .invoke_typed(RESOLVE_MAIN_METHOD, vec![json!(file_uri(file))])
            .await?;
        Ok(options.unwrap_or_default())
    }

    pub async fn validate_launch_config(
        &self,
        main_class: &str,
        project_name: Option<&str>,
        has_external_paths: bool,
        scope: Option<&Path>,
    ) -> Result<LaunchValidation, GatewayError> {
        let mut args = vec![json!(main_class), json!(project_name), json!(has_external_paths)];
        if let Some(scope) = scope {
            args.push(json!(file_uri(scope)));
        }
        self.invoke_typed(VALIDATE_LAUNCH_CONFIG, args).await
    }

    pub async fn resolve_classpath(
        &self,
        main_class: &str,
        project_name: Option<&str>,
    ) -> Result<ResolvedClasspath, GatewayError> {
        let (module_paths, class_paths): (Option<Vec<String>>, Option<Vec<String>>) = self
            .invoke_typed(RESOLVE_CLASSPATH, vec![json!(main_class), json!(project_name)])
            .await?;
        Ok(ResolvedClasspath {
            module_paths: module_paths.unwrap_or_default(),
            class_paths: class_paths.unwrap_or_default(),
        })
    }

    pub async fn resolve_java_executable(
        &self,
        main_class: &str,
        project_name: Option<&str>,
    ) -> Result<String, GatewayError> {
        self.invoke_typed(
            RESOLVE_JAVA_EXECUTABLE,
            vec![json!(main_class), json!(project_name)],
        )
        .await
    }

    /// Whether the project owning `main_class` compiles with preview features.
    pub async fn detect_preview_flag(
        &self,
        main_class: &str,
        project_name: Option<&str>,
    ) -> Result<bool, GatewayError> {
        let expected = json!({ ENABLE_PREVIEW_OPTION: "enabled" });
        let args = vec![
            json!(json!({
                "className": main_class,
                "projectName": project_name,
                "inheritedOptions": true,
                "expectedOptions": expected,
            })
            .to_string()),
        ];
        self.invoke_typed(CHECK_PROJECT_SETTINGS, args).await
    }

    pub async fn update_debug_settings(&self, settings: &str) -> Result<Value, GatewayError> {
        self.invoke(UPDATE_DEBUG_SETTINGS, vec![json!(settings)]).await
    }

    pub async fn resolve_inline_variables(&self, request: Value) -> Result<Vec<Value>, GatewayError> {
        let variables: Option<Vec<Value>> = self
            .invoke_typed(RESOLVE_INLINE_VARIABLES, vec![json!(request.to_string())])
            .await?;
        Ok(variables.unwrap_or_default())
    }

    /// Builds the workspace through the Java tooling's editor command.
    pub async fn compile_workspace(&self, force: bool) -> Result<CompileStatus, GatewayError> {
        if !self.server.is_active() {
            return Err(GatewayError::NotActivated);
        }
        let value = self
            .execute_editor_command(COMPILE_WORKSPACE, vec![json!(force)])
            .await?;
        let status = value
            .as_i64()
            .and_then(CompileStatus::from_code)
            .unwrap_or(CompileStatus::Succeeded);
        Ok(status)
    }
}
