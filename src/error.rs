use thiserror::Error;

/// Main error type for verbgraph
#[derive(Error, Debug)]
pub enum GraphError {
    /// Unrecognized or malformed rule/node configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A query verb without a leading `>` or `<`
    #[error("Invalid verb direction: {0:?} must start with '>' or '<'")]
    InvalidVerbDirection(String),

    /// Traversal distance outside the supported range
    #[error("Invalid distance: {0} (must be at least 1)")]
    InvalidDistance(i64),

    /// An accessor that cannot be resolved against an instance
    #[error("Unsupported accessor kind: {0}")]
    UnsupportedAccessorKind(String),

    /// A member accessor named something the entity does not expose
    #[error("Unknown member {member:?} on {type_name}")]
    UnknownMember { type_name: String, member: String },

    /// Textual node reference that is not `Type:Value`
    #[error("Invalid node reference: {0:?}")]
    InvalidNodeRef(String),

    /// The key-value backend failed to serve a read or write
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenient Result type using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;
