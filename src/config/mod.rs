//! Repository configuration loading and validation

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage technology a repository talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Process-local store, for tests and development
    InMemory,
    /// MongoDB
    DocumentStore,
    /// PostgreSQL
    RelationalStore,
}

impl BackendKind {
    /// Canonical tag
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::InMemory => "in-memory",
            BackendKind::DocumentStore => "document-store",
            BackendKind::RelationalStore => "relational-store",
        }
    }

    /// Cargo feature that compiles this backend in
    pub fn feature(self) -> &'static str {
        match self {
            BackendKind::InMemory => "in-memory",
            BackendKind::DocumentStore => "mongodb_backend",
            BackendKind::RelationalStore => "postgres",
        }
    }

    /// Whether this backend needs a connection string
    pub fn needs_connection(self) -> bool {
        !matches!(self, BackendKind::InMemory)
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    /// Accepts the canonical tags and the engine names, in any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in-memory" | "memory" | "inmemory" => Ok(BackendKind::InMemory),
            "document-store" | "mongodb" | "mongo" => Ok(BackendKind::DocumentStore),
            "relational-store" | "postgres" | "postgresql" => Ok(BackendKind::RelationalStore),
            _ => Err(ConfigError::UnknownBackend {
                kind: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of one entity repository
///
/// Built once by the service layer and never mutated afterwards. The
/// backend tag is kept as raw text so that an unknown tag is reported when
/// the repository is constructed, with the offending value.
///
/// ```yaml
/// backendKind: document-store
/// connectionString: mongodb://localhost:27017
/// databaseName: shop
/// collection: users
/// softDeleteField: deletedAt
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConfig {
    /// Backend tag, see [`BackendKind`]
    pub backend_kind: String,

    /// Driver connection string (unused by the in-memory backend)
    #[serde(default)]
    pub connection_string: String,

    /// Logical database name
    #[serde(default)]
    pub database_name: String,

    /// Collection (document store) or table (relational store)
    #[serde(alias = "collection", alias = "table")]
    pub collection_or_table_name: String,

    /// Field marking a record as soft-deleted; reads skip such records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_delete_field: Option<String>,

    /// Upper bound for the driver's connection pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

impl RepositoryConfig {
    pub fn new(
        backend_kind: impl Into<String>,
        connection_string: impl Into<String>,
        database_name: impl Into<String>,
        collection_or_table_name: impl Into<String>,
    ) -> Self {
        Self {
            backend_kind: backend_kind.into(),
            connection_string: connection_string.into(),
            database_name: database_name.into(),
            collection_or_table_name: collection_or_table_name.into(),
            soft_delete_field: None,
            max_connections: None,
        }
    }

    /// Configuration for an in-memory repository
    pub fn in_memory(collection: impl Into<String>) -> Self {
        Self::new(BackendKind::InMemory.as_str(), "", "", collection)
    }

    pub fn with_soft_delete_field(mut self, field: impl Into<String>) -> Self {
        self.soft_delete_field = Some(field.into());
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: format!("{}: {}", path, e),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })
    }

    /// Load configuration from an already-parsed JSON value
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })
    }

    /// Parse the backend tag
    pub fn backend(&self) -> Result<BackendKind, ConfigError> {
        self.backend_kind.parse()
    }

    /// Parse the backend tag and check the fields it needs
    pub fn validate(&self) -> Result<BackendKind, ConfigError> {
        let kind = self.backend()?;

        if self.collection_or_table_name.trim().is_empty() {
            return Err(invalid("collectionOrTableName", "must not be empty"));
        }

        if kind.needs_connection() && self.connection_string.trim().is_empty() {
            return Err(invalid(
                "connectionString",
                format!("required by the {} backend", kind),
            ));
        }

        if kind == BackendKind::DocumentStore && self.database_name.trim().is_empty() {
            return Err(invalid("databaseName", "required by the document-store backend"));
        }

        if self
            .soft_delete_field
            .as_deref()
            .is_some_and(|field| field.trim().is_empty())
        {
            return Err(invalid("softDeleteField", "must not be empty when set"));
        }

        if self.max_connections == Some(0) {
            return Err(invalid("maxConnections", "must be at least 1"));
        }

        Ok(kind)
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}
