//! Declaration macros for entity records and criteria

pub mod macros;
