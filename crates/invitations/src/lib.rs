//! Invitation domain module.
//!
//! This crate contains the rules for single-use invitation codes, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod code;
pub mod issue;
pub mod outcome;
pub mod record;

pub use code::{BOOTSTRAP_CODE, GENERATED_CODE_LEN, InvitationCode, MIN_CODE_LEN};
pub use issue::{IssueInvitation, plan_issue};
pub use outcome::{InvalidReason, Validation};
pub use record::{InvitationRecord, sort_for_display};
