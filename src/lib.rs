pub mod cli;
pub mod config;
pub mod convert;
pub mod database;
pub mod entity;
pub mod error;
pub mod models;
pub mod tenancy;
pub mod types;

pub use convert::VersionedEntityConverter;
pub use error::{ApiError, ErrorKind};
pub use tenancy::TenantAuthorizer;

#[cfg(test)]
pub mod testing;
