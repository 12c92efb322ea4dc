//! The merged context bundle.

use sonar_types::{CallSummary, CallType, CompanyProfile, IcpProfile, RepProfile};

/// Everything the loader gathered for one request.
///
/// Produced fresh per request and discarded after formatting; it has no
/// identity of its own. Fields a mode did not load stay empty, and the
/// formatter omits empty fragments entirely.
#[derive(Debug, Clone, Default)]
pub struct ContextBundle {
    /// Previous calls with the same company, newest first, capped at five.
    pub previous_calls: Vec<CallSummary>,

    /// Structured company profile.
    pub company: Option<CompanyProfile>,

    /// The requesting rep's profile.
    pub rep: Option<RepProfile>,

    /// ICP/persona enrichment.
    pub icp: Option<IcpProfile>,

    /// Rendered single-call context (legacy call mode).
    pub call_context: String,

    /// Rendered company overview (legacy company mode).
    pub company_context: String,

    /// Rendered page aggregate (page-specific mode).
    pub page_context: String,

    /// Workspace search results.
    pub search_context: String,

    /// Stage classification inferred from `previous_calls`.
    pub call_type: CallType,
}

impl ContextBundle {
    /// True when no fetcher contributed anything.
    pub fn is_empty(&self) -> bool {
        self.previous_calls.is_empty()
            && self.company.is_none()
            && self.rep.is_none()
            && self.icp.is_none()
            && self.call_context.is_empty()
            && self.company_context.is_empty()
            && self.page_context.is_empty()
            && self.search_context.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bundle_is_empty() {
        let bundle = ContextBundle::default();
        assert!(bundle.is_empty());
        assert_eq!(bundle.call_type, CallType::Discovery);
    }

    #[test]
    fn test_any_fragment_makes_it_non_empty() {
        let bundle = ContextBundle {
            search_context: "one result".to_string(),
            ..Default::default()
        };
        assert!(!bundle.is_empty());
    }
}
