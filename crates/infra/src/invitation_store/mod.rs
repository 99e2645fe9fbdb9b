//! Keyed storage of pending invitations.
//!
//! Backends differ in durability only; all of them guarantee that `take`
//! hands a record to at most one caller.

pub mod file;
pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use file::FileInvitationStore;
pub use in_memory::InMemoryInvitationStore;
pub use postgres::PostgresInvitationStore;
pub use r#trait::{InvitationStore, StoreError};
