//! Shared types for the Sonar agent pipeline.
//!
//! This crate defines the wire-level request types, the domain fragments that
//! source fetchers produce, and the persisted run record. It has no I/O of
//! its own; every other crate in the workspace builds on these definitions.

pub mod domain;
pub mod request;
pub mod run;

pub use domain::{
    CallSummary, CallType, CompanyProfile, Contact, IcpProfile, Persona, PersonaRollup,
    RepProfile, TeamRole, TeamRoleKind,
};
pub use request::{
    ChatMessage, ChatRole, ContextRequest, LegacyContextType, PageContext, PageType,
};
pub use run::{AgentRunRecord, RunStatus};
