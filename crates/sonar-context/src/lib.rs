//! Context assembly pipeline for the Sonar agent.
//!
//! This crate is the retrieval engine between an incoming agent request and
//! the model call: it resolves exactly one retrieval mode from the request
//! (fixed precedence), fans out to the source fetchers that mode needs,
//! joins the results into a [`ContextBundle`], and renders the bundle into a
//! deterministic system prompt.
//!
//! Fetchers never fail the pipeline: any downstream problem degrades that
//! one fragment to empty and the rest of the context still loads.

pub mod bundle;
pub mod error;
pub mod fetch;
pub mod format;
pub mod loader;
pub mod mode;
pub mod search;

pub use bundle::ContextBundle;
pub use error::{ContextError, Result};
pub use fetch::Fetchers;
pub use format::format_system_prompt;
pub use loader::ContextLoader;
pub use mode::ContextMode;
pub use search::{StaticSearch, StoreSearch, WorkspaceSearch};
