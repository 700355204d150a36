//! Error types for fieldveil

/// Result type alias using fieldveil's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fieldveil operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Policy document could not be parsed at all
    #[error("policy parse error: {0}")]
    PolicyParse(String),

    /// A specific rule in the policy failed validation
    #[error("policy validation failed at rule {index}: {reason}")]
    PolicyValidation { index: usize, reason: String },

    /// An action name was resolved that was never registered
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// An action name was registered twice
    #[error("duplicate action registration: {0}")]
    DuplicateAction(String),

    /// An individual action invocation failed
    #[error("action '{action}' failed on field '{field}': {reason}")]
    ActionExecution {
        field: String,
        action: String,
        reason: String,
    },

    /// Failure of an action's external dependency (token vault, key store)
    #[error("dependency error: {0}")]
    Dependency(String),

    /// A reveal was requested against an irreversible action
    #[error("not reversible: {0}")]
    NotReversible(String),

    /// An audit write could not be confirmed
    #[error("audit persistence error: {0}")]
    AuditPersistence(String),

    /// The transformation was cancelled before completion
    #[error("transformation cancelled")]
    Cancelled,

    /// An external dependency exceeded its call deadline
    #[error("operation timed out")]
    Timeout,

    /// IO errors from stores and loaders
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a policy parse error
    pub fn policy_parse(msg: impl Into<String>) -> Self {
        Self::PolicyParse(msg.into())
    }

    /// Create a validation error for a specific rule
    pub fn rule_invalid(index: usize, reason: impl Into<String>) -> Self {
        Self::PolicyValidation {
            index,
            reason: reason.into(),
        }
    }

    /// Create an action execution error
    pub fn action_failed(
        field: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ActionExecution {
            field: field.into(),
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Create an audit persistence error
    pub fn audit(msg: impl Into<String>) -> Self {
        Self::AuditPersistence(msg.into())
    }

    /// Create a dependency error
    pub fn dependency(msg: impl Into<String>) -> Self {
        Self::Dependency(msg.into())
    }
}
