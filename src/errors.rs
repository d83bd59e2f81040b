/// Trellis Error Types
#[derive(Debug, thiserror::Error)]
pub enum TrellisError {
    /// Git-related errors
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Branch management errors
    #[error("Branch error: {0}")]
    Branch(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// A merge or rebase stopped on textual conflicts and is waiting for a human
    #[error("{0} stopped on conflicts")]
    Conflict(ConflictOperation),

    /// The user aborted conflict resolution; the current update cannot continue
    #[error("{0} aborted due to conflicts.")]
    OperationAborted(ConflictOperation),

    /// Conflict resolution did not finish before the configured deadline
    #[error("{0} conflicts were not resolved before the deadline")]
    ConflictResolutionTimeout(ConflictOperation),

    /// The update was cancelled at a poll boundary
    #[error("Operation cancelled")]
    Cancelled,

    /// GitHub API errors
    #[error("GitHub API error: {0}")]
    GitHub(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Which conflicting operation a conflict-kind error refers to.
///
/// A tag only: the two kinds differ in which in-progress marker the
/// resolution detector watches and which abort verb applies, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictOperation {
    Merge,
    Rebase,
}

impl std::fmt::Display for ConflictOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictOperation::Merge => write!(f, "Merge"),
            ConflictOperation::Rebase => write!(f, "Rebase"),
        }
    }
}

impl TrellisError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        TrellisError::Config(msg.into())
    }

    pub fn branch<S: Into<String>>(msg: S) -> Self {
        TrellisError::Branch(msg.into())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        TrellisError::Validation(msg.into())
    }

    pub fn github<S: Into<String>>(msg: S) -> Self {
        TrellisError::GitHub(msg.into())
    }

    pub fn github_api(status: u16, message: String) -> Self {
        TrellisError::GitHub(format!("{status} - {message}"))
    }

    /// Whether this error is a conflict raised by a merge/rebase command,
    /// as opposed to a fatal failure.
    pub fn conflict_kind(&self) -> Option<ConflictOperation> {
        match self {
            TrellisError::Conflict(op) => Some(*op),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrellisError>;
