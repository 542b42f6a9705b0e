//! Pre-launch workspace build.

use serde_json::json;

use crate::error::{GatewayError, ResolveError, Resolution, StageResult};
use crate::gateway::{CommandGateway, CompileStatus};
use crate::host::{Host, Severity};
use crate::progress::ProgressReporter;

pub const PROCEED: &str = "Proceed";
pub const FIX: &str = "Fix...";
pub const CANCEL: &str = "Cancel";

const SHOW_PROBLEMS: &str = "workbench.actions.view.problems";

pub struct BuildStep<'a> {
    pub gateway: &'a CommandGateway,
    pub host: &'a dyn Host,
    /// Skip the prompt and continue after a failed build.
    pub proceed_on_failure: bool,
}

impl BuildStep<'_> {
    /// Builds the workspace. Resolves when the launch should continue.
    pub async fn run(&self, progress: &ProgressReporter) -> StageResult<()> {
        progress.report("build", "Compiling...");
        let status = match self.gateway.compile_workspace(false).await {
            Ok(status) => status,
            Err(GatewayError::NotActivated) => return Err(ResolveError::NotActivated),
            Err(err) => {
                tracing::warn!(target: "nova.debug_config.build", error = %err, "workspace build failed");
                CompileStatus::Failed
            }
        };
        if progress.is_cancelled() {
            return Ok(Resolution::Abandoned);
        }

        match status {
            CompileStatus::Succeeded => Ok(Resolution::Resolved(())),
            CompileStatus::Cancelled => {
                tracing::debug!(target: "nova.debug_config.build", "build was cancelled");
                Ok(Resolution::Abandoned)
            }
            CompileStatus::Failed | CompileStatus::WithError => {
                self.on_build_failure(progress).await
            }
        }
    }

    async fn on_build_failure(&self, progress: &ProgressReporter) -> StageResult<()> {
        if self.proceed_on_failure {
            return Ok(Resolution::Resolved(()));
        }

        let answer = self
            .host
            .show_message(
                Severity::Error,
                "Build failed, do you want to continue?",
                &[PROCEED, FIX, CANCEL],
            )
            .await;
        if progress.is_cancelled() {
            return Ok(Resolution::Abandoned);
        }

        match answer.as_deref() {
            Some(PROCEED) => Ok(Resolution::Resolved(())),
            Some(FIX) => {
                if let Err(err) = self
                    .gateway
                    .execute_editor_command(SHOW_PROBLEMS, vec![json!({})])
                    .await
                {
                    tracing::warn!(target: "nova.debug_config.build", error = %err, "failed to open the problems view");
                }
                Ok(Resolution::Abandoned)
            }
            _ => Ok(Resolution::Abandoned),
        }
    }
}
