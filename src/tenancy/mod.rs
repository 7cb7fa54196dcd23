pub mod authorizer;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use authorizer::TenantAuthorizer;
pub use error::{StoreError, TenancyError};
pub use memory::{InMemoryResources, InMemoryTenantStore};
pub use postgres::{PgResourceTenants, PgTenantStore};
pub use store::{ResourceTenants, TenantStore};
