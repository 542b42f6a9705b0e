use thiserror::Error;

/// Troubleshooting anchors understood by the documentation site.
pub mod anchor {
    pub const CANNOT_FIND_MAIN_CLASS: &str = "cannot-find-a-class-with-the-main-method";
    pub const FAILED_TO_RESOLVE_CLASSPATH: &str = "failed-to-resolve-classpath";
    pub const CLASSPATH_MISSING: &str = "modulepaths-classpaths-not-resolved";
    pub const ATTACH_CONFIG_ERROR: &str = "please-specify-the-host-name-and-the-port-of-the-remote-debuggee-in-the-launchjson";
    pub const REQUEST_TYPE_NOT_SUPPORTED: &str = "request-type-is-not-supported";
    pub const INVALID_PROCESS_ID: &str = "invalid-process-id";
    pub const ENV_FILE_ERROR: &str = "failed-to-load-environment-file";
    pub const PREVIEW_RUNTIME: &str = "preview-features-require-a-newer-runtime";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserErrorKind {
    Usage,
    Internal,
}

/// A misconfiguration the user can fix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UserError {
    pub message: String,
    pub kind: UserErrorKind,
    pub anchor: Option<String>,
}

impl UserError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: UserErrorKind::Usage,
            anchor: None,
        }
    }

    pub fn with_anchor(mut self, anchor: &str) -> Self {
        self.anchor = Some(anchor.to_string());
        self
    }
}

/// Failures raised by the command gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The Java language tooling is not installed or not enabled.
    #[error("the Java language support extension is not activated")]
    NotActivated,
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
    #[error("failed to decode `{command}` response: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Error type shared by every resolution stage.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("the Java language support extension is not activated")]
    NotActivated,
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<GatewayError> for ResolveError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotActivated => ResolveError::NotActivated,
            GatewayError::Remote(err) => ResolveError::Internal(err),
            err @ GatewayError::Decode { .. } => ResolveError::Internal(anyhow::Error::new(err)),
        }
    }
}

/// Outcome of a stage that may be abandoned by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Resolved(T),
    Abandoned,
}

impl<T> Resolution<T> {
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Resolution::Abandoned)
    }

    pub fn resolved(self) -> Option<T> {
        match self {
            Resolution::Resolved(value) => Some(value),
            Resolution::Abandoned => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Resolution::Resolved(value) => Resolution::Resolved(f(value)),
            Resolution::Abandoned => Resolution::Abandoned,
        }
    }
}

pub type StageResult<T> = Result<Resolution<T>, ResolveError>;

/// Unwraps a `StageResult`, returning early from the enclosing stage when it
/// was abandoned or failed.
macro_rules! resolved {
    ($stage:expr) => {
        match $stage? {
            $crate::error::Resolution::Resolved(value) => value,
            $crate::error::Resolution::Abandoned => {
                return Ok($crate::error::Resolution::Abandoned)
            }
        }
    };
}

pub(crate) use resolved;
