//! Read-only accessors over the dashboard's relational schema, plus the
//! append-mostly `agent_runs` table.
//!
//! The transcript/company schema is owned by the dashboard's CRUD layer; this
//! crate never creates or migrates those tables. It only ensures its own
//! `agent_runs` table and reads everything else defensively: JSON columns are
//! decoded field-by-field with every nested value treated as optional, so a
//! malformed row degrades to an empty fragment instead of an error.

pub mod decode;
pub mod error;
pub mod rows;
pub mod runs;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Result, StoreError};
pub use rows::{CoachingNote, CompanyRow, MemberStats, TeamMemberRow, TranscriptRow, UserRow};
pub use runs::RunLogger;
pub use store::SalesStore;
