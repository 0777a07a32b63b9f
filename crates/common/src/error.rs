use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Application not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Build context error: {0}")]
    Context(String),

    #[error("Build failed: {0}")]
    Build(String),

    #[error("Container launch failed: {0}")]
    Launch(String),

    #[error("Deployment cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage a deployment failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validating,
    Resolving,
    Building,
    Launching,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Resolving => "resolving",
            Stage::Building => "building",
            Stage::Launching => "launching",
        };
        f.write_str(name)
    }
}

/// A deployment failure tagged with the stage it originated from.
///
/// Failures are terminal for the attempt; the caller decides whether to
/// re-invoke the deployment.
#[derive(Error, Debug)]
#[error("deployment failed while {stage}: {error}")]
pub struct DeployError {
    pub stage: Stage,
    #[source]
    pub error: Error,
}

impl DeployError {
    pub fn new(stage: Stage, error: Error) -> Self {
        Self { stage, error }
    }
}

/// Extension to tag component errors with their originating stage.
pub trait StageExt<T> {
    fn at_stage(self, stage: Stage) -> std::result::Result<T, DeployError>;
}

impl<T> StageExt<T> for Result<T> {
    fn at_stage(self, stage: Stage) -> std::result::Result<T, DeployError> {
        self.map_err(|error| DeployError::new(stage, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Validating.to_string(), "validating");
        assert_eq!(Stage::Launching.to_string(), "launching");
    }

    #[test]
    fn test_deploy_error_message_carries_stage_and_reason() {
        let err = DeployError::new(Stage::Building, Error::Build("exit code 1".into()));
        assert_eq!(
            err.to_string(),
            "deployment failed while building: Build failed: exit code 1"
        );
    }

    #[test]
    fn test_at_stage_tags_failures() {
        let res: Result<()> = Err(Error::NotFound("abc".into()));
        let err = res.at_stage(Stage::Resolving).unwrap_err();
        assert_eq!(err.stage, Stage::Resolving);
        assert!(matches!(err.error, Error::NotFound(_)));
    }
}
