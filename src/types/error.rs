use thiserror::Error;

/// Errors from grid construction and access.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
    #[error("out of bounds: {0}")]
    OutOfBounds(String),
}

/// Setup-time configuration failures. These are hard initialization errors
/// and are never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown {kind} plugin: {name:?}")]
    UnknownPlugin { kind: &'static str, name: String },
    #[error("invalid kinematic limit: {0}")]
    InvalidLimit(String),
    #[error("conflicting mode flags: {0}")]
    ConflictingMode(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Planning-time failures. These fail the current cycle only; the caller
/// is expected to hold position or trigger a recovery.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("received plan with zero length")]
    EmptyPlan,
    #[error("no plan poses remain within the local window")]
    NoPosesInWindow,
    #[error("no legal trajectories: {summary}")]
    NoLegalTrajectories {
        /// Human-readable tally of rejections grouped by critic.
        summary: String,
    },
}
