//! Retrieval mode resolution.
//!
//! The request's context fields are not mutually exclusive on the wire, so
//! ambiguity is resolved here and nowhere else: one ordered match over the
//! request, first branch wins.

use sonar_types::{ContextRequest, LegacyContextType, PageContext, PageType};

use crate::error::{ContextError, Result};

/// The resolved retrieval mode, exactly one per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextMode {
    /// Page aggregate plus workspace search for the page the user is on.
    PageSpecific {
        page: PageType,
        page_context: PageContext,
        user_id: String,
    },

    /// Workspace-wide semantic retrieval.
    SemanticWorkspace { user_id: String },

    /// Single-call context via the legacy selector.
    LegacyCall { transcript_id: String },

    /// Single-company context via the legacy selector.
    LegacyCompany { company_id: String },

    /// Workspace retrieval with degradation tolerated, chosen when nothing
    /// more specific matched but the user is known.
    FallbackWorkspace { user_id: String },

    /// Nothing to retrieve; the prompt says so explicitly.
    NoContext,
}

impl ContextMode {
    /// Resolve the mode for a request.
    ///
    /// Precedence, first match wins:
    /// 1. `page_type` + `user_id` → page-specific
    /// 2. `use_semantic_search` or legacy `workspace` → semantic workspace
    ///    (requires `user_id`; its absence is the one fatal input error)
    /// 3. legacy `call`/`company` with an id → legacy modes
    /// 4. `user_id` alone → fallback workspace
    /// 5. otherwise → no context
    pub fn resolve(request: &ContextRequest) -> Result<Self> {
        if let (Some(page), Some(user_id)) = (request.page_type, request.user_id.as_deref()) {
            return Ok(ContextMode::PageSpecific {
                page,
                page_context: request.page_context.clone().unwrap_or_default(),
                user_id: user_id.to_string(),
            });
        }

        if request.use_semantic_search
            || request.context_type == Some(LegacyContextType::Workspace)
        {
            return match request.user_id.as_deref() {
                Some(user_id) => Ok(ContextMode::SemanticWorkspace {
                    user_id: user_id.to_string(),
                }),
                None => Err(ContextError::MissingUserId),
            };
        }

        if let (Some(context_type), Some(context_id)) =
            (request.context_type, request.context_id.as_deref())
        {
            match context_type {
                LegacyContextType::Call => {
                    return Ok(ContextMode::LegacyCall {
                        transcript_id: context_id.to_string(),
                    });
                }
                LegacyContextType::Company => {
                    return Ok(ContextMode::LegacyCompany {
                        company_id: context_id.to_string(),
                    });
                }
                // Workspace was consumed by the branch above.
                LegacyContextType::Workspace => {}
            }
        }

        if let Some(user_id) = request.user_id.as_deref() {
            return Ok(ContextMode::FallbackWorkspace {
                user_id: user_id.to_string(),
            });
        }

        Ok(ContextMode::NoContext)
    }

    /// Stable mode name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ContextMode::PageSpecific { .. } => "page_specific",
            ContextMode::SemanticWorkspace { .. } => "semantic_workspace",
            ContextMode::LegacyCall { .. } => "legacy_call",
            ContextMode::LegacyCompany { .. } => "legacy_company",
            ContextMode::FallbackWorkspace { .. } => "fallback_workspace",
            ContextMode::NoContext => "no_context",
        }
    }

    /// The context-type string recorded on the run row.
    pub fn context_type(&self) -> &'static str {
        match self {
            ContextMode::PageSpecific { .. } => "page",
            ContextMode::SemanticWorkspace { .. } | ContextMode::FallbackWorkspace { .. } => {
                "workspace"
            }
            ContextMode::LegacyCall { .. } => "call",
            ContextMode::LegacyCompany { .. } => "company",
            ContextMode::NoContext => "none",
        }
    }

    /// The transcript this mode is grounded in, if any.
    pub fn transcript_id(&self) -> Option<&str> {
        match self {
            ContextMode::LegacyCall { transcript_id } => Some(transcript_id),
            ContextMode::PageSpecific { page_context, .. } => {
                page_context.transcript_id.as_deref()
            }
            _ => None,
        }
    }

    /// The company this mode is grounded in, if any.
    pub fn company_id(&self) -> Option<&str> {
        match self {
            ContextMode::LegacyCompany { company_id } => Some(company_id),
            ContextMode::PageSpecific { page_context, .. } => page_context.company_id.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_types::ChatMessage;

    fn base_request() -> ContextRequest {
        ContextRequest::new(vec![ChatMessage::user("hello")])
    }

    #[test]
    fn test_page_specific_wins_over_everything() {
        // Every other selector is present too; page + user must still win.
        let mut request = base_request();
        request.page_type = Some(PageType::Dashboard);
        request.user_id = Some("u1".to_string());
        request.use_semantic_search = true;
        request.context_type = Some(LegacyContextType::Call);
        request.context_id = Some("42".to_string());

        let mode = ContextMode::resolve(&request).unwrap();
        assert_eq!(mode.name(), "page_specific");
    }

    #[test]
    fn test_page_type_without_user_falls_through() {
        let mut request = base_request();
        request.page_type = Some(PageType::Calls);
        request.context_type = Some(LegacyContextType::Call);
        request.context_id = Some("42".to_string());

        let mode = ContextMode::resolve(&request).unwrap();
        assert_eq!(
            mode,
            ContextMode::LegacyCall {
                transcript_id: "42".to_string()
            }
        );
    }

    #[test]
    fn test_semantic_search_flag() {
        let mut request = base_request();
        request.use_semantic_search = true;
        request.user_id = Some("u1".to_string());

        let mode = ContextMode::resolve(&request).unwrap();
        assert_eq!(
            mode,
            ContextMode::SemanticWorkspace {
                user_id: "u1".to_string()
            }
        );
    }

    #[test]
    fn test_workspace_context_type_maps_to_semantic() {
        let mut request = base_request();
        request.context_type = Some(LegacyContextType::Workspace);
        request.user_id = Some("u1".to_string());

        let mode = ContextMode::resolve(&request).unwrap();
        assert_eq!(mode.name(), "semantic_workspace");
    }

    #[test]
    fn test_semantic_without_user_is_fatal() {
        let mut request = base_request();
        request.use_semantic_search = true;

        let err = ContextMode::resolve(&request).unwrap_err();
        assert!(matches!(err, ContextError::MissingUserId));
    }

    #[test]
    fn test_semantic_beats_legacy_call() {
        let mut request = base_request();
        request.use_semantic_search = true;
        request.user_id = Some("u1".to_string());
        request.context_type = Some(LegacyContextType::Call);
        request.context_id = Some("42".to_string());

        let mode = ContextMode::resolve(&request).unwrap();
        assert_eq!(mode.name(), "semantic_workspace");
    }

    #[test]
    fn test_legacy_call_and_company() {
        let mut request = base_request();
        request.context_type = Some(LegacyContextType::Call);
        request.context_id = Some("42".to_string());
        assert_eq!(
            ContextMode::resolve(&request).unwrap(),
            ContextMode::LegacyCall {
                transcript_id: "42".to_string()
            }
        );

        request.context_type = Some(LegacyContextType::Company);
        request.context_id = Some("7".to_string());
        assert_eq!(
            ContextMode::resolve(&request).unwrap(),
            ContextMode::LegacyCompany {
                company_id: "7".to_string()
            }
        );
    }

    #[test]
    fn test_legacy_without_id_falls_through_to_fallback() {
        let mut request = base_request();
        request.context_type = Some(LegacyContextType::Call);
        request.user_id = Some("u1".to_string());

        let mode = ContextMode::resolve(&request).unwrap();
        assert_eq!(mode.name(), "fallback_workspace");
    }

    #[test]
    fn test_user_only_is_fallback_workspace() {
        let mut request = base_request();
        request.user_id = Some("u1".to_string());

        let mode = ContextMode::resolve(&request).unwrap();
        assert_eq!(
            mode,
            ContextMode::FallbackWorkspace {
                user_id: "u1".to_string()
            }
        );
    }

    #[test]
    fn test_nothing_set_is_no_context() {
        let mode = ContextMode::resolve(&base_request()).unwrap();
        assert_eq!(mode, ContextMode::NoContext);
        assert_eq!(mode.context_type(), "none");
    }

    #[test]
    fn test_run_record_ids() {
        let mode = ContextMode::LegacyCall {
            transcript_id: "42".to_string(),
        };
        assert_eq!(mode.transcript_id(), Some("42"));
        assert_eq!(mode.company_id(), None);
        assert_eq!(mode.context_type(), "call");

        let mode = ContextMode::PageSpecific {
            page: PageType::CompanyDetail,
            page_context: PageContext {
                company_id: Some("7".to_string()),
                ..Default::default()
            },
            user_id: "u1".to_string(),
        };
        assert_eq!(mode.company_id(), Some("7"));
        assert_eq!(mode.context_type(), "page");
    }
}
