//! Attach configurations: either an explicit `hostName`/`port` pair or a
//! local process id whose JDWP agent address is discovered.

use async_trait::async_trait;

use crate::config::{DebugConfiguration, ProcessIdValue};
use crate::error::{anchor, Resolution, StageResult, UserError};
use crate::progress::ProgressReporter;

/// The JDWP agent flag users should start the debuggee with.
pub const JDWP_AGENT_FLAG: &str = "-agentlib:jdwp=transport=dt_socket,server=y,address=5005";

/// Debug endpoint of a local JVM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaProcess {
    pub pid: u32,
    pub host_name: String,
    pub debug_port: u16,
}

/// Finds the JDWP socket of a running JVM.
#[async_trait]
pub trait ProcessInspector: Send + Sync {
    /// `Ok(None)` when the process does not exist or was not started with a
    /// socket-transport debug agent.
    async fn resolve_java_process(&self, pid: u32) -> anyhow::Result<Option<JavaProcess>>;
}

fn attach_config_error() -> UserError {
    UserError::usage("Please specify the host name and the port of the remote debuggee in the launch.json.")
        .with_anchor(anchor::ATTACH_CONFIG_ERROR)
}

pub struct AttachResolver<'a> {
    pub processes: &'a dyn ProcessInspector,
}

impl AttachResolver<'_> {
    /// Leaves `config` with a concrete `hostName`/`port` and no `processId`.
    pub async fn resolve(
        &self,
        config: &mut DebugConfiguration,
        progress: &ProgressReporter,
    ) -> StageResult<()> {
        let has_host = config.host_name.as_deref().is_some_and(|host| !host.is_empty());

        if has_host && config.port.is_some() {
            if config.process_id.take().is_some() {
                tracing::debug!(
                    target: "nova.debug_config.attach",
                    "hostName/port take precedence over processId"
                );
            }
            return Ok(Resolution::Resolved(()));
        }

        let Some(process_id) = config.process_id.clone() else {
            return Err(attach_config_error().into());
        };
        if process_id.is_pick_sentinel() {
            // The editor's picker was dismissed without substituting a pid.
            return Ok(Resolution::Abandoned);
        }

        let pid = parse_pid(&process_id)?;
        progress.report("attach", "Resolving the debug port of the Java process...");
        let process = self.processes.resolve_java_process(pid).await?;
        if progress.is_cancelled() {
            return Ok(Resolution::Abandoned);
        }

        let Some(process) = process else {
            return Err(UserError::usage(format!(
                "Failed to attach to remote debuggee VM with process id {pid}. Please make sure the process was started with the debug flag '{JDWP_AGENT_FLAG}'."
            ))
            .with_anchor(anchor::INVALID_PROCESS_ID)
            .into());
        };

        tracing::info!(
            target: "nova.debug_config.attach",
            pid,
            host = %process.host_name,
            port = process.debug_port,
            "resolved debug endpoint of local process"
        );
        config.host_name = Some(process.host_name);
        config.port = Some(process.debug_port);
        config.process_id = None;
        Ok(Resolution::Resolved(()))
    }
}

fn parse_pid(process_id: &ProcessIdValue) -> Result<u32, UserError> {
    process_id.to_pid().ok_or_else(|| {
        UserError::usage(format!(
            "The process id '{process_id}' is not a valid number."
        ))
        .with_anchor(anchor::INVALID_PROCESS_ID)
    })
}
