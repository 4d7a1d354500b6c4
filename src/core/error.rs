//! Typed error handling for repositories
//!
//! Every backend maps its driver failures into [`RepositoryError`] so that
//! service-layer callers can match on the failure category instead of
//! inspecting message strings.
//!
//! # Error Categories
//!
//! - [`RepositoryError::Validation`]: criteria required but the compiled filter is empty
//! - [`RepositoryError::NotFound`]: a single-record operation matched nothing
//! - [`RepositoryError::Conflict`]: the storage engine rejected a write
//! - [`RepositoryError::Connection`]: the storage engine could not be reached
//! - [`RepositoryError::MalformedIdentifier`]: an id cannot be coerced to the native key type
//! - [`ConfigError`]: invalid repository configuration, raised at construction time
//!
//! # Example
//!
//! ```rust,ignore
//! match repository.get_item(&criteria).await {
//!     Ok(user) => println!("Found: {:?}", user),
//!     Err(RepositoryError::NotFound { collection, .. }) => {
//!         println!("Nothing in {}", collection);
//!     }
//!     Err(e) => eprintln!("Other error: {} ({})", e, e.error_code()),
//! }
//! ```

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;

/// The error type returned by every repository operation
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Criteria were required but compiled to an empty filter, or a
    /// criteria value was rejected before reaching the storage engine
    #[error("Validation failed for {operation}: {message}")]
    Validation {
        operation: &'static str,
        message: String,
    },

    /// The targeted record does not exist
    #[error("No record in '{collection}' matched the criteria for {operation}")]
    NotFound {
        collection: String,
        operation: &'static str,
    },

    /// The storage engine acknowledged the write as failed
    /// (duplicate key, constraint violation, rejected document)
    #[error("Write rejected by {backend} during {operation}: {message}")]
    Conflict {
        backend: &'static str,
        operation: &'static str,
        message: String,
    },

    /// The storage engine could not be reached
    #[error("Failed to connect to {backend}: {message}")]
    Connection {
        backend: &'static str,
        message: String,
    },

    /// An identifier could not be converted to the backend's native key type
    #[error("Identifier '{value}' is not a valid {backend} identifier")]
    MalformedIdentifier {
        backend: &'static str,
        value: String,
    },

    /// A DTO or stored record could not be converted
    #[error("Failed to serialize/deserialize record: {message}")]
    Serialization { message: String },

    /// Any other driver failure while executing a statement
    #[error("{backend} query error during {operation}: {message}")]
    Query {
        backend: &'static str,
        operation: &'static str,
        message: String,
    },

    /// Configuration was rejected when building the repository
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RepositoryError {
    /// Shorthand for the "criteria required" failure of single-record operations
    pub fn criteria_required(operation: &'static str) -> Self {
        RepositoryError::Validation {
            operation,
            message: "at least one criterion is required".to_string(),
        }
    }

    pub fn not_found(collection: impl Into<String>, operation: &'static str) -> Self {
        RepositoryError::NotFound {
            collection: collection.into(),
            operation,
        }
    }

    pub fn serialization(message: impl std::fmt::Display) -> Self {
        RepositoryError::Serialization {
            message: message.to_string(),
        }
    }

    /// Stable machine-readable code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            RepositoryError::Validation { .. } => "VALIDATION_ERROR",
            RepositoryError::NotFound { .. } => "NOT_FOUND",
            RepositoryError::Conflict { .. } => "WRITE_CONFLICT",
            RepositoryError::Connection { .. } => "CONNECTION_ERROR",
            RepositoryError::MalformedIdentifier { .. } => "MALFORMED_IDENTIFIER",
            RepositoryError::Serialization { .. } => "SERIALIZATION_ERROR",
            RepositoryError::Query { .. } => "QUERY_ERROR",
            RepositoryError::Config(e) => e.error_code(),
        }
    }

    /// Whether the caller supplied something the repository refused to run
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RepositoryError::Validation { .. }
                | RepositoryError::NotFound { .. }
                | RepositoryError::MalformedIdentifier { .. }
        )
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::serialization(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors raised while loading or interpreting a repository configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The backend-kind tag names no known backend
    #[error("Unsupported backend kind: '{kind}'")]
    UnknownBackend { kind: String },

    /// The backend is known but its cargo feature was not compiled in
    #[error("Backend '{kind}' requires the '{feature}' feature")]
    BackendDisabled {
        kind: &'static str,
        feature: &'static str,
    },

    /// A required field is empty or invalid
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Failed to parse a configuration document
    #[error("Failed to parse config{}: {message}", file_suffix(.file))]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// IO error while reading a configuration file
    #[error("IO error: {message}")]
    IoError { message: String },
}

fn file_suffix(file: &Option<String>) -> String {
    file.as_deref()
        .map(|f| format!(" file '{}'", f))
        .unwrap_or_default()
}

impl ConfigError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::UnknownBackend { .. } => "UNKNOWN_BACKEND",
            ConfigError::BackendDisabled { .. } => "BACKEND_DISABLED",
            ConfigError::InvalidValue { .. }
            | ConfigError::ParseError { .. }
            | ConfigError::IoError { .. } => "CONFIG_ERROR",
        }
    }
}
