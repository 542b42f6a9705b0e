use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;

use crate::error::UserError;
use crate::gateway::CommandGateway;

pub const TROUBLESHOOTING_URL: &str =
    "https://github.com/microsoft/vscode-java-debug/blob/main/Troubleshooting.md";
pub const JAVA_EXTENSION_ID: &str = "redhat.java";

pub const LEARN_MORE: &str = "Learn More";
pub const INSTALL: &str = "Install";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceItem {
    pub label: String,
    pub description: Option<String>,
    pub detail: Option<String>,
}

/// Editor UI primitives used while resolving a configuration.
#[async_trait]
pub trait Host: Send + Sync {
    /// Returns the index of the picked item, or `None` when dismissed.
    async fn show_choice(&self, items: &[ChoiceItem], placeholder: &str) -> Option<usize>;

    /// Returns the clicked button, or `None` when dismissed.
    async fn show_message(
        &self,
        severity: Severity,
        text: &str,
        buttons: &[&str],
    ) -> Option<String>;

    /// Path of the file open in the active editor.
    fn active_file(&self) -> Option<PathBuf>;
}

pub fn troubleshooting_link(anchor: Option<&str>) -> String {
    match anchor {
        Some(anchor) => format!("{TROUBLESHOOTING_URL}#{anchor}"),
        None => TROUBLESHOOTING_URL.to_string(),
    }
}

/// Shows a user error with a `Learn More` button (plus `extra` buttons) and
/// returns the button that was clicked.
pub async fn show_user_error(
    host: &dyn Host,
    gateway: &CommandGateway,
    error: &UserError,
    extra: &[&str],
) -> Option<String> {
    let mut buttons: Vec<&str> = extra.to_vec();
    buttons.push(LEARN_MORE);
    let answer = host.show_message(Severity::Error, &error.message, &buttons).await;
    if answer.as_deref() == Some(LEARN_MORE) {
        open_link(gateway, &troubleshooting_link(error.anchor.as_deref())).await;
    }
    answer
}

async fn open_link(gateway: &CommandGateway, link: &str) {
    if let Err(err) = gateway
        .execute_editor_command("vscode.open", vec![json!(link)])
        .await
    {
        tracing::warn!(target: "nova.debug_config", link, error = %err, "failed to open link");
    }
}

pub async fn guide_to_install_java_extension(host: &dyn Host, gateway: &CommandGateway) {
    let answer = host
        .show_message(
            Severity::Error,
            "Language Support for Java is required. Please install and enable it.",
            &[INSTALL],
        )
        .await;
    if answer.as_deref() == Some(INSTALL) {
        if let Err(err) = gateway
            .execute_editor_command(
                "workbench.extensions.installExtension",
                vec![json!(JAVA_EXTENSION_ID)],
            )
            .await
        {
            tracing::warn!(target: "nova.debug_config", error = %err, "failed to install the Java extension");
        }
    }
}
