pub mod convert;
pub mod health;
pub mod tenancy;
pub mod validate;
