//! Capability boundary to the external user directory.
//!
//! The directory owns principal records and application role catalogs; this
//! service only reads and patches them through these traits.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{DirectorySeed, InMemoryDirectory};
pub use r#trait::{
    AppRegistration, AppRoleAssignment, AppRoleDefinition, AppRoleDirectory, DirectoryError,
    UserDirectory,
};
