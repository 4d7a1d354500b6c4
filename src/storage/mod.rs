//! Storage implementations for different backends

pub mod factory;
pub mod in_memory;
#[cfg(feature = "mongodb_backend")]
pub mod mongodb;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use factory::Repository;
pub use in_memory::InMemoryRepository;
#[cfg(feature = "mongodb_backend")]
pub use mongodb::MongoRepository;
#[cfg(feature = "postgres")]
pub use postgres::PostgresRepository;
