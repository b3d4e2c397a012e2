//! Error types for the Shelf catalog core.

/// Boxed source error carried by adapter failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in catalog operations.
///
/// Adapters map their driver errors (SQL, index, I/O) into these kinds at
/// their boundary, so callers only ever match on catalog semantics.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Input violates a product invariant or a paging bound.
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation, if known
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// The relational product store failed.
    #[error("Persistence error: {message}")]
    Persistence {
        /// Human-readable error message
        message: String,
        /// Source error if available
        #[source]
        source: Option<BoxError>,
    },

    /// The search index failed to apply a write (upsert, delete, clear).
    #[error("Index error: {message}")]
    Index {
        /// Human-readable error message
        message: String,
        /// Source error if available
        #[source]
        source: Option<BoxError>,
    },

    /// The search index refused or failed a query.
    #[error("Query execution error: {message}")]
    QueryExecution {
        /// Human-readable error message
        message: String,
        /// Source error if available
        #[source]
        source: Option<BoxError>,
    },

    /// An existing index does not match the expected schema.
    #[error("Index '{index}' is incompatible with the product schema: {}", .differences.join("; "))]
    SchemaIncompatible {
        /// Name of the offending index
        index: String,
        /// One entry per differing field
        differences: Vec<String>,
    },

    /// The request was cancelled before the operation completed.
    #[error("Operation cancelled: {operation}")]
    Cancelled {
        /// Operation that was interrupted
        operation: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience `Result` type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether this error is worth retrying by the caller.
    ///
    /// Store, index, and query failures are usually transient (connection
    /// loss, lock contention). Validation and schema problems never resolve
    /// on their own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Persistence { .. } => true,
            Error::Index { .. } => true,
            Error::QueryExecution { .. } => true,
            Error::Io(_) => true,
            Error::Validation { .. } => false,
            Error::SchemaIncompatible { .. } => false,
            Error::Cancelled { .. } => false,
            Error::Config { .. } => false,
            Error::Serialization(_) => false,
        }
    }

    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a new validation error with a field name.
    pub fn validation_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a new persistence error.
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Error::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new persistence error with a source error.
    pub fn persistence_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new index write error.
    pub fn index<S: Into<String>>(message: S) -> Self {
        Error::Index {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new index write error with a source error.
    pub fn index_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Index {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new query execution error.
    pub fn query<S: Into<String>>(message: S) -> Self {
        Error::QueryExecution {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new query execution error with a source error.
    pub fn query_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::QueryExecution {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new schema incompatibility error.
    pub fn schema_incompatible<S: Into<String>>(index: S, differences: Vec<String>) -> Self {
        Error::SchemaIncompatible {
            index: index.into(),
            differences,
        }
    }

    /// Creates a new cancellation error.
    pub fn cancelled<S: Into<String>>(operation: S) -> Self {
        Error::Cancelled {
            operation: operation.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Returns `true` for [`Error::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}
