//! Workspace search seam.
//!
//! The indexing/embedding mechanism is an external collaborator; the
//! pipeline only needs this contract. A keyword-scoring implementation over
//! the relational store ships for self-contained deployments, and a static
//! one for tests.

use std::sync::Arc;

use async_trait::async_trait;
use sonar_store::SalesStore;
use tracing::warn;

/// How many fragments a workspace query returns by default.
pub const DEFAULT_TOP_K: usize = 8;

/// Opaque workspace retrieval contract.
///
/// Implementations never fail: no matches, a backend error, or an empty
/// query all produce an empty string.
#[async_trait]
pub trait WorkspaceSearch: Send + Sync {
    /// Return the most relevant workspace fragments for a query, already
    /// rendered as prompt text.
    async fn search(&self, user_id: &str, query: &str, top_k: usize) -> String;
}

// ─────────────────────────────────────────────────────────────────────────────
// Store-backed keyword search
// ─────────────────────────────────────────────────────────────────────────────

/// Keyword search across the user's calls and companies.
pub struct StoreSearch {
    store: Arc<SalesStore>,
}

impl StoreSearch {
    /// Create a search over the given store.
    pub fn new(store: Arc<SalesStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WorkspaceSearch for StoreSearch {
    async fn search(&self, user_id: &str, query: &str, top_k: usize) -> String {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|t| t.len() > 2)
            .map(String::from)
            .collect();
        if terms.is_empty() {
            return String::new();
        }

        let mut scored: Vec<(usize, String)> = Vec::new();

        match self.store.transcripts_for_user(user_id) {
            Ok(calls) => {
                for call in calls {
                    let haystack = call.title.to_lowercase();
                    let score = score_terms(&haystack, &terms);
                    if score > 0 {
                        let line = match call.score {
                            Some(s) => {
                                format!("Call \"{}\" ({}) — {}/100", call.title, call.created_at, s)
                            }
                            None => format!("Call \"{}\" ({})", call.title, call.created_at),
                        };
                        scored.push((score, line));
                    }
                }
            }
            Err(e) => warn!(error = %e, "workspace search: transcript scan failed"),
        }

        match self.store.companies_for_user(user_id) {
            Ok(companies) => {
                for company in companies {
                    let haystack = format!(
                        "{} {}",
                        company.name.to_lowercase(),
                        company.pain_points.join(" ").to_lowercase()
                    );
                    let score = score_terms(&haystack, &terms);
                    if score > 0 {
                        let mut line = format!("Company \"{}\"", company.name);
                        if !company.pain_points.is_empty() {
                            line.push_str(&format!(
                                " — pain points: {}",
                                company.pain_points.join(", ")
                            ));
                        }
                        scored.push((score, line));
                    }
                }
            }
            Err(e) => warn!(error = %e, "workspace search: company scan failed"),
        }

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(top_k)
            .map(|(_, line)| format!("- {}", line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn score_terms(haystack: &str, terms: &[String]) -> usize {
    terms
        .iter()
        .map(|term| haystack.matches(term.as_str()).count())
        .sum()
}

// ─────────────────────────────────────────────────────────────────────────────
// Static search (tests)
// ─────────────────────────────────────────────────────────────────────────────

/// Search stub that always returns the same text.
#[derive(Debug, Clone, Default)]
pub struct StaticSearch {
    result: String,
}

impl StaticSearch {
    /// A stub returning the given text for every query.
    pub fn returning(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
        }
    }

    /// A stub that finds nothing.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkspaceSearch for StaticSearch {
    async fn search(&self, _user_id: &str, _query: &str, _top_k: usize) -> String {
        self.result.clone()
    }
}
