//! Error types for stages and whole pipeline runs

use tokio::task::JoinError;

/// Error returned by a single stage (or one of its per-item sub-tasks).
#[derive(Debug)]
pub enum StageError {
    /// Downstream receiver was dropped before the stage finished sending.
    Disconnected,
    /// The run was cancelled while the stage was waiting.
    Cancelled,
    /// A spawned sub-task panicked or was aborted.
    Task(String),
    /// Stage-specific failure.
    Failed(String),
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "output stream disconnected"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Task(msg) => write!(f, "sub-task failed: {msg}"),
            Self::Failed(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for StageError {}

impl StageError {
    /// Secondary errors are consequences of a failure elsewhere in the run,
    /// never its root cause.
    pub fn is_secondary(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Cancelled)
    }
}

impl From<JoinError> for StageError {
    fn from(e: JoinError) -> Self {
        if e.is_cancelled() {
            return Self::Cancelled;
        }
        match e.try_into_panic() {
            Ok(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "panic with non-string payload".to_string());
                Self::Task(format!("panicked: {msg}"))
            }
            Err(e) => Self::Task(e.to_string()),
        }
    }
}

/// Error from a complete pipeline run: the root cause, reported once.
#[derive(Debug)]
pub enum PipelineError {
    Stage {
        stage: &'static str,
        source: StageError,
    },
    /// Run cancelled from outside (e.g. Ctrl-C) with no stage failure.
    Cancelled,
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stage { stage, source } => write!(f, "stage {stage}: {source}"),
            Self::Cancelled => write!(f, "pipeline cancelled"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Stage { source, .. } => Some(source),
            Self::Cancelled => None,
        }
    }
}

impl PipelineError {
    /// Name of the stage that caused the failure, if any.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secondary_errors() {
        assert!(StageError::Disconnected.is_secondary());
        assert!(StageError::Cancelled.is_secondary());
        assert!(!StageError::Task("x".into()).is_secondary());
        assert!(!StageError::Failed("x".into()).is_secondary());
    }

    #[test]
    fn display_stage_error() {
        let err = PipelineError::Stage {
            stage: "single_hash",
            source: StageError::Task("panicked: boom".into()),
        };
        assert_eq!(
            format!("{err}"),
            "stage single_hash: sub-task failed: panicked: boom"
        );
        assert_eq!(err.stage(), Some("single_hash"));
    }

    #[test]
    fn display_cancelled() {
        assert_eq!(format!("{}", PipelineError::Cancelled), "pipeline cancelled");
        assert!(PipelineError::Cancelled.is_cancelled());
    }

    #[tokio::test]
    async fn join_error_from_panic() {
        let handle = tokio::spawn(async {
            panic!("boom");
        });
        let err = StageError::from(handle.await.unwrap_err());
        match err {
            StageError::Task(msg) => assert!(msg.contains("boom"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn join_error_from_abort() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let err = StageError::from(handle.await.unwrap_err());
        assert!(matches!(err, StageError::Cancelled));
    }
}
