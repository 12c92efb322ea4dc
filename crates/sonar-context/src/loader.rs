//! Context loading: fan-out to the fetchers a mode needs, fan-in to a bundle.

use std::sync::Arc;

use sonar_types::{CallType, ContextRequest};
use tracing::debug;

use crate::bundle::ContextBundle;
use crate::fetch::Fetchers;
use crate::mode::ContextMode;
use crate::search::{DEFAULT_TOP_K, WorkspaceSearch};

/// Loads the minimal fetcher set for a resolved mode.
///
/// Fetchers run concurrently and the join waits for all of them; a slow or
/// failed fetcher degrades its own field to empty without delaying or
/// failing the others beyond its own completion. There are no retries.
///
/// The join order into the bundle is fixed (previous calls, company, rep
/// profile, enrichment, page aggregate) so formatting is deterministic for
/// identical inputs.
#[derive(Clone)]
pub struct ContextLoader {
    fetchers: Fetchers,
    search: Arc<dyn WorkspaceSearch>,
}

impl ContextLoader {
    /// Create a loader over the given fetchers and search collaborator.
    pub fn new(fetchers: Fetchers, search: Arc<dyn WorkspaceSearch>) -> Self {
        Self { fetchers, search }
    }

    /// Load the context bundle for a resolved mode.
    pub async fn load(&self, mode: &ContextMode, request: &ContextRequest) -> ContextBundle {
        let query = request.latest_user_message().unwrap_or_default();

        let bundle = match mode {
            ContextMode::LegacyCall { transcript_id } => {
                self.load_call(transcript_id, request.user_id.as_deref()).await
            }
            ContextMode::LegacyCompany { company_id } => {
                self.load_company(company_id, request.user_id.as_deref()).await
            }
            ContextMode::PageSpecific {
                page,
                page_context,
                user_id,
            } => {
                let (page_text, search_text) = tokio::join!(
                    self.fetchers.page_context(*page, page_context, user_id),
                    self.search.search(user_id, query, DEFAULT_TOP_K),
                );
                ContextBundle {
                    page_context: page_text,
                    search_context: search_text,
                    ..Default::default()
                }
            }
            ContextMode::SemanticWorkspace { user_id }
            | ContextMode::FallbackWorkspace { user_id } => ContextBundle {
                search_context: self.search.search(user_id, query, DEFAULT_TOP_K).await,
                ..Default::default()
            },
            ContextMode::NoContext => ContextBundle::default(),
        };

        debug!(
            mode = mode.name(),
            previous_calls = bundle.previous_calls.len(),
            has_company = bundle.company.is_some(),
            has_rep = bundle.rep.is_some(),
            has_icp = bundle.icp.is_some(),
            "context loaded"
        );
        bundle
    }

    /// Single-call context plus the enrichment fragments.
    async fn load_call(&self, transcript_id: &str, user_id: Option<&str>) -> ContextBundle {
        // The enrichment fetchers key off the call's company; resolving that
        // link is the one cheap lookup ahead of the fan-out.
        let company_id = self.fetchers.company_of_call(transcript_id).await;

        let (call_context, previous_calls, company, rep, icp) = tokio::join!(
            self.fetchers.call_context(transcript_id),
            async {
                match company_id.as_deref() {
                    Some(company) => {
                        self.fetchers
                            .previous_calls(company, Some(transcript_id))
                            .await
                    }
                    None => Vec::new(),
                }
            },
            async {
                match company_id.as_deref() {
                    Some(company) => self.fetchers.company_profile(company).await,
                    None => None,
                }
            },
            async {
                match user_id {
                    Some(user) => self.fetchers.rep_profile(user).await,
                    None => None,
                }
            },
            async {
                match company_id.as_deref() {
                    Some(company) => self.fetchers.icp_enrichment(company).await,
                    None => None,
                }
            },
        );

        let call_type = CallType::infer(&previous_calls);
        ContextBundle {
            previous_calls,
            company,
            rep,
            icp,
            call_context,
            call_type,
            ..Default::default()
        }
    }

    /// Company overview plus the enrichment fragments.
    async fn load_company(&self, company_id: &str, user_id: Option<&str>) -> ContextBundle {
        let (company_context, previous_calls, company, rep, icp) = tokio::join!(
            self.fetchers.company_context(company_id),
            self.fetchers.previous_calls(company_id, None),
            self.fetchers.company_profile(company_id),
            async {
                match user_id {
                    Some(user) => self.fetchers.rep_profile(user).await,
                    None => None,
                }
            },
            self.fetchers.icp_enrichment(company_id),
        );

        let call_type = CallType::infer(&previous_calls);
        ContextBundle {
            previous_calls,
            company,
            rep,
            icp,
            company_context,
            call_type,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::StaticSearch;
    use sonar_cache::TtlCache;
    use sonar_store::{SalesStore, testing};
    use sonar_types::{ChatMessage, LegacyContextType, PageContext, PageType};

    fn seeded_loader() -> ContextLoader {
        let store = SalesStore::open_in_memory().unwrap();
        testing::create_dashboard_schema(&store);
        testing::insert_transcript(
            &store,
            testing::TranscriptFixture {
                id: "42".into(),
                title: "Demo Call".into(),
                company_id: Some("7".into()),
                user_id: Some("u1".into()),
                created_at: "2026-03-10T14:00:00Z".into(),
                score: Some(72),
                ..Default::default()
            },
        );
        testing::insert_transcript(
            &store,
            testing::TranscriptFixture {
                id: "41".into(),
                title: "Intro Call".into(),
                company_id: Some("7".into()),
                created_at: "2026-03-01T14:00:00Z".into(),
                score: Some(61),
                ..Default::default()
            },
        );
        testing::link_company_call(&store, "7", "42", "2026-03-10T14:00:00Z");
        testing::link_company_call(&store, "7", "41", "2026-03-01T14:00:00Z");
        testing::insert_company(
            &store,
            "7",
            "Acme",
            Some("acme.io"),
            Some("u1"),
            Some(r#"["manual forecasting"]"#),
            None,
            None,
        );
        testing::insert_user(&store, "u1", Some("Dana"), Some("team-1"), Some("plg"));

        let store = std::sync::Arc::new(store);
        let fetchers = Fetchers::new(store, std::sync::Arc::new(TtlCache::default()));
        ContextLoader::new(fetchers, Arc::new(StaticSearch::returning("- a search hit")))
    }

    fn call_request() -> ContextRequest {
        let mut request = ContextRequest::new(vec![ChatMessage::user("How did it go?")]);
        request.context_type = Some(LegacyContextType::Call);
        request.context_id = Some("42".to_string());
        request.user_id = Some("u1".to_string());
        request
    }

    #[tokio::test]
    async fn test_load_call_joins_all_fragments() {
        let loader = seeded_loader();
        let mode = ContextMode::LegacyCall {
            transcript_id: "42".to_string(),
        };

        let bundle = loader.load(&mode, &call_request()).await;

        assert!(bundle.call_context.contains("Demo Call"));
        assert_eq!(bundle.previous_calls.len(), 1);
        assert_eq!(bundle.previous_calls[0].title, "Intro Call");
        assert_eq!(bundle.company.as_ref().unwrap().name, "Acme");
        assert_eq!(bundle.rep.as_ref().unwrap().name.as_deref(), Some("Dana"));
        assert!(bundle.icp.is_none());
        assert_eq!(bundle.call_type, CallType::FollowUp);
    }

    #[tokio::test]
    async fn test_load_call_without_company_link() {
        let loader = seeded_loader();
        let mode = ContextMode::LegacyCall {
            transcript_id: "missing".to_string(),
        };

        let bundle = loader.load(&mode, &call_request()).await;

        assert_eq!(bundle.call_context, "");
        assert!(bundle.previous_calls.is_empty());
        assert!(bundle.company.is_none());
        assert_eq!(bundle.call_type, CallType::Discovery);
        // The rep fragment still loads; one empty source does not drain the rest.
        assert!(bundle.rep.is_some());
    }

    #[tokio::test]
    async fn test_fetcher_failure_never_fails_load() {
        // No dashboard schema: every store-backed fetcher errors internally.
        let store = std::sync::Arc::new(SalesStore::open_in_memory().unwrap());
        let fetchers = Fetchers::new(store, std::sync::Arc::new(TtlCache::default()));
        let loader = ContextLoader::new(fetchers, Arc::new(StaticSearch::empty()));

        let mode = ContextMode::LegacyCall {
            transcript_id: "42".to_string(),
        };
        let bundle = loader.load(&mode, &call_request()).await;

        assert!(bundle.is_empty());
    }

    #[tokio::test]
    async fn test_load_company_mode() {
        let loader = seeded_loader();
        let mode = ContextMode::LegacyCompany {
            company_id: "7".to_string(),
        };

        let bundle = loader.load(&mode, &call_request()).await;

        assert!(bundle.company_context.contains("## Company: Acme"));
        assert!(bundle.call_context.is_empty());
        // Company mode keeps the full history, no exclusion.
        assert_eq!(bundle.previous_calls.len(), 2);
    }

    #[tokio::test]
    async fn test_load_page_specific_concatenates_search() {
        let loader = seeded_loader();
        let mode = ContextMode::PageSpecific {
            page: PageType::Dashboard,
            page_context: PageContext::default(),
            user_id: "u1".to_string(),
        };

        let bundle = loader.load(&mode, &call_request()).await;

        assert!(bundle.page_context.contains("Recent calls"));
        assert_eq!(bundle.search_context, "- a search hit");
    }

    #[tokio::test]
    async fn test_load_workspace_modes_only_search() {
        let loader = seeded_loader();

        for mode in [
            ContextMode::SemanticWorkspace {
                user_id: "u1".to_string(),
            },
            ContextMode::FallbackWorkspace {
                user_id: "u1".to_string(),
            },
        ] {
            let bundle = loader.load(&mode, &call_request()).await;
            assert_eq!(bundle.search_context, "- a search hit");
            assert!(bundle.page_context.is_empty());
            assert!(bundle.company.is_none());
        }
    }

    #[tokio::test]
    async fn test_load_no_context_is_empty() {
        let loader = seeded_loader();
        let bundle = loader.load(&ContextMode::NoContext, &call_request()).await;
        assert!(bundle.is_empty());
    }
}
