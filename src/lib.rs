//! # Critere
//!
//! Criteria-driven generic repositories over interchangeable storage backends.
//!
//! ## Features
//!
//! - **Declared Criteria**: per-entity criteria structs generated by macro, no runtime reflection
//! - **Backend-Neutral Filters**: criteria compile once into a predicate IR,
//!   then each backend lowers it
//! - **Literal Pattern Matching**: `*Like` values are escaped, never interpreted as pattern syntax
//! - **Uniform Contract**: one [`DataRepository`](core::DataRepository) trait for every backend
//! - **Fail-Fast Factory**: unknown or uncompiled backends are rejected at construction
//! - **Automatic Timestamps**: `createdAt` and `updatedAt` managed by the repository
//! - **Soft Delete Guard**: reads hide soft-deleted records unless `includeDeleted` is set
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use critere::prelude::*;
//!
//! impl_dto!(User, {
//!     name: String,
//!     age: Option<i64>,
//! });
//!
//! impl_criteria!(
//!     UserCriteria,
//!     search = ["name"],
//!     {
//!         name_like: String => like "name",
//!         age_min: i64 => min "age",
//!         age_max: i64 => max "age",
//!     }
//! );
//!
//! let users = Repository::<User, UserCriteria>::new(&RepositoryConfig::in_memory("users"))?;
//! users.create_item(&User::new("Alice".to_string(), Some(30))).await?;
//!
//! let found = users
//!     .get_items(&UserCriteria {
//!         name_like: Some("alic".to_string()),
//!         ..Default::default()
//!     })
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        BaseCriteria, ConfigError, Criteria, DataRepository, Dto, FieldValue, FilterBuilder,
        Paginated, PaginationMeta, RepositoryError, Result, SortDirection,
    };

    // === Macros ===
    pub use crate::{impl_criteria, impl_dto};

    // === Storage ===
    pub use crate::storage::{InMemoryRepository, Repository};
    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::MongoRepository;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresRepository;

    // === Config ===
    pub use crate::config::{BackendKind, RepositoryConfig};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
}
