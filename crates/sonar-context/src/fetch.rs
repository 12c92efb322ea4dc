//! Source fetchers.
//!
//! One fetcher per data domain, all sharing the same contract: a fetcher
//! never raises. Any downstream problem — store unavailable, row missing,
//! malformed column — is logged and degrades to the empty sentinel for that
//! fragment (`""`, `None`, or an empty list), so one failed source never
//! stops the others from contributing.
//!
//! Call and company context are expensive denormalizations and are cached
//! under `call:<id>` / `company:<id>`; the previous-calls fragment feeds the
//! lower-volume enrichment path and is always fetched fresh.

use std::fmt::Write as _;
use std::sync::Arc;

use sonar_cache::ContextCache;
use sonar_store::{SalesStore, TranscriptRow};
use sonar_types::{CallSummary, CompanyProfile, IcpProfile, PageContext, PageType, RepProfile};
use tracing::warn;

/// Cap on previous calls included for historical grounding.
pub const PREVIOUS_CALLS_LIMIT: usize = 5;

/// Cap on associated calls in the company overview.
const COMPANY_CALLS_LIMIT: usize = 10;

/// Cap on transcript lines in the call context.
const TRANSCRIPT_LINES_LIMIT: usize = 100;

/// Cap on recent items in the dashboard aggregate.
const DASHBOARD_RECENT_LIMIT: usize = 5;

/// The source fetchers, sharing one store handle and one cache.
#[derive(Clone)]
pub struct Fetchers {
    store: Arc<SalesStore>,
    cache: Arc<dyn ContextCache>,
}

impl Fetchers {
    /// Create fetchers over the given store and cache.
    pub fn new(store: Arc<SalesStore>, cache: Arc<dyn ContextCache>) -> Self {
        Self { store, cache }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Call context
    // ─────────────────────────────────────────────────────────────────────────

    /// Denormalized single-call context, cache-backed under `call:<id>`.
    pub async fn call_context(&self, transcript_id: &str) -> String {
        let key = format!("call:{transcript_id}");
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let row = match self.store.transcript(transcript_id) {
            Ok(Some(row)) => row,
            Ok(None) => return String::new(),
            Err(e) => {
                warn!(transcript_id, error = %e, "call context fetch failed");
                return String::new();
            }
        };

        let rendered = render_call_context(&row);
        if !rendered.is_empty() {
            self.cache.set(&key, rendered.clone());
        }
        rendered
    }

    /// The company a transcript is linked to, if any.
    pub async fn company_of_call(&self, transcript_id: &str) -> Option<String> {
        match self.store.transcript_company_id(transcript_id) {
            Ok(company_id) => company_id,
            Err(e) => {
                warn!(transcript_id, error = %e, "company lookup for call failed");
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Company context
    // ─────────────────────────────────────────────────────────────────────────

    /// Company overview with recent calls, cache-backed under `company:<id>`.
    pub async fn company_context(&self, company_id: &str) -> String {
        let key = format!("company:{company_id}");
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let company = match self.store.company(company_id) {
            Ok(Some(row)) => row.into_profile(),
            Ok(None) => return String::new(),
            Err(e) => {
                warn!(company_id, error = %e, "company context fetch failed");
                return String::new();
            }
        };

        // A failed call listing shortens the overview, it does not empty it.
        let calls = match self.store.recent_company_calls(company_id, COMPANY_CALLS_LIMIT) {
            Ok(calls) => calls,
            Err(e) => {
                warn!(company_id, error = %e, "company call listing failed");
                Vec::new()
            }
        };

        let rendered = render_company_context(&company, &calls);
        if !rendered.is_empty() {
            self.cache.set(&key, rendered.clone());
        }
        rendered
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Previous calls
    // ─────────────────────────────────────────────────────────────────────────

    /// Up to five most recent other calls for the company, newest first.
    /// Never cached.
    pub async fn previous_calls(
        &self,
        company_id: &str,
        exclude_transcript_id: Option<&str>,
    ) -> Vec<CallSummary> {
        match self
            .store
            .other_company_calls(company_id, exclude_transcript_id, PREVIOUS_CALLS_LIMIT)
        {
            Ok(calls) => calls,
            Err(e) => {
                warn!(company_id, error = %e, "previous calls fetch failed");
                Vec::new()
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Company profile (structured)
    // ─────────────────────────────────────────────────────────────────────────

    /// Typed company profile.
    pub async fn company_profile(&self, company_id: &str) -> Option<CompanyProfile> {
        match self.store.company(company_id) {
            Ok(row) => row.map(|r| r.into_profile()),
            Err(e) => {
                warn!(company_id, error = %e, "company profile fetch failed");
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Rep profile
    // ─────────────────────────────────────────────────────────────────────────

    /// The requesting rep's sales motion and resolved roles.
    pub async fn rep_profile(&self, user_id: &str) -> Option<RepProfile> {
        let user = match self.store.user(user_id) {
            Ok(Some(user)) => user,
            Ok(None) => return None,
            Err(e) => {
                warn!(user_id, error = %e, "rep profile fetch failed");
                return None;
            }
        };

        let roles = match self.store.roles_for_user(user_id) {
            Ok(roles) => roles,
            Err(e) => {
                warn!(user_id, error = %e, "role resolution failed");
                Vec::new()
            }
        };

        Some(RepProfile {
            user_id: user.id,
            name: user.name,
            sales_motion: user.sales_motion,
            roles,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 6. ICP enrichment
    // ─────────────────────────────────────────────────────────────────────────

    /// ICP/persona enrichment for a company.
    pub async fn icp_enrichment(&self, company_id: &str) -> Option<IcpProfile> {
        match self.store.icp_for_company(company_id) {
            Ok(icp) => icp,
            Err(e) => {
                warn!(company_id, error = %e, "ICP enrichment fetch failed");
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 7. Page aggregate
    // ─────────────────────────────────────────────────────────────────────────

    /// Page-specific aggregate, one behavior per page type. Sub-queries are
    /// individually non-fatal: a failed one yields a shorter context.
    pub async fn page_context(
        &self,
        page: PageType,
        page_context: &PageContext,
        user_id: &str,
    ) -> String {
        match page {
            PageType::Dashboard => self.dashboard_aggregate(user_id),
            PageType::Calls => self.calls_aggregate(user_id),
            PageType::CallDetail => match page_context.transcript_id.as_deref() {
                Some(transcript_id) => self.call_context(transcript_id).await,
                None => String::new(),
            },
            PageType::Companies => self.companies_aggregate(user_id),
            PageType::CompanyDetail => match page_context.company_id.as_deref() {
                Some(company_id) => self.company_context(company_id).await,
                None => String::new(),
            },
            PageType::Team => self.team_aggregate(page_context.team_id.as_deref()),
        }
    }

    fn dashboard_aggregate(&self, user_id: &str) -> String {
        let mut out = String::new();

        match self.store.recent_scored_calls(user_id, DASHBOARD_RECENT_LIMIT) {
            Ok(calls) if !calls.is_empty() => {
                out.push_str("## Recent calls\n");
                for call in &calls {
                    let _ = writeln!(out, "- {}", summary_line(call));
                }
            }
            Ok(_) => {}
            Err(e) => warn!(user_id, error = %e, "dashboard call listing failed"),
        }

        match self.store.coaching_notes_for_user(user_id, DASHBOARD_RECENT_LIMIT) {
            Ok(notes) if !notes.is_empty() => {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str("## Coaching notes\n");
                for note in &notes {
                    let _ = writeln!(out, "- {} ({})", note.note, date_of(&note.created_at));
                }
            }
            Ok(_) => {}
            Err(e) => warn!(user_id, error = %e, "coaching note listing failed"),
        }

        out.trim_end().to_string()
    }

    fn calls_aggregate(&self, user_id: &str) -> String {
        let calls = match self.store.transcripts_for_user(user_id) {
            Ok(calls) => calls,
            Err(e) => {
                warn!(user_id, error = %e, "call listing failed");
                return String::new();
            }
        };
        if calls.is_empty() {
            return String::new();
        }

        let scored: Vec<i64> = calls.iter().filter_map(|c| c.score).collect();
        let strong = scored.iter().filter(|s| **s >= 80).count();
        let moderate = scored.iter().filter(|s| (60..80).contains(*s)).count();
        let weak = scored.iter().filter(|s| **s < 60).count();

        let mut out = String::new();
        let _ = writeln!(
            out,
            "## All calls ({} total)\nScore bands: {} strong (80+), {} moderate (60-79), {} weak (<60)",
            calls.len(),
            strong,
            moderate,
            weak
        );
        for call in &calls {
            let _ = writeln!(out, "- {}", summary_line(call));
        }
        out.trim_end().to_string()
    }

    fn companies_aggregate(&self, user_id: &str) -> String {
        let companies = match self.store.companies_for_user(user_id) {
            Ok(companies) => companies,
            Err(e) => {
                warn!(user_id, error = %e, "company listing failed");
                return String::new();
            }
        };
        if companies.is_empty() {
            return String::new();
        }

        let mut out = String::new();
        let _ = writeln!(out, "## Companies ({} total)", companies.len());
        let mut all_pain_points: Vec<String> = Vec::new();

        for company in &companies {
            // Latest-call lookup is per company and individually non-fatal.
            let latest = self
                .store
                .recent_company_calls(&company.id, 1)
                .ok()
                .and_then(|calls| calls.into_iter().next());
            let at_risk = latest
                .as_ref()
                .map(|call| {
                    call.score.is_some_and(|s| s < 60)
                        || call
                            .deal_signal
                            .as_deref()
                            .is_some_and(|s| s.eq_ignore_ascii_case("negative"))
                })
                .unwrap_or(false);

            let mut line = format!("- {}", company.name);
            if let Some(call) = &latest
                && let Some(score) = call.score
            {
                let _ = write!(line, " — last call {}/100", score);
            }
            if at_risk {
                line.push_str(" — AT RISK");
            }
            let _ = writeln!(out, "{}", line);

            for pain in &company.pain_points {
                if !all_pain_points.iter().any(|p| p == pain) {
                    all_pain_points.push(pain.clone());
                }
            }
        }

        if !all_pain_points.is_empty() {
            out.push_str("\n## Pain points across companies\n");
            for pain in &all_pain_points {
                let _ = writeln!(out, "- {}", pain);
            }
        }
        out.trim_end().to_string()
    }

    fn team_aggregate(&self, team_id: Option<&str>) -> String {
        let Some(team_id) = team_id else {
            return String::new();
        };

        let members = match self.store.team_members(team_id) {
            Ok(members) => members,
            Err(e) => {
                warn!(team_id, error = %e, "team roster fetch failed");
                return String::new();
            }
        };
        if members.is_empty() {
            return String::new();
        }

        let mut out = String::new();
        let _ = writeln!(out, "## Team roster ({} members)", members.len());
        for member in &members {
            let name = member.name.as_deref().unwrap_or(&member.user_id);
            // Per-member stats are individually non-fatal: a failed lookup
            // drops the stats, not the member.
            match self.store.member_call_stats(&member.user_id) {
                Ok(stats) => {
                    let mut line = format!("- {} — {} calls", name, stats.call_count);
                    if let Some(avg) = stats.average_score {
                        let _ = write!(line, ", average score {:.0}/100", avg);
                    }
                    let _ = writeln!(out, "{}", line);
                }
                Err(e) => {
                    warn!(user_id = %member.user_id, error = %e, "member stats failed");
                    let _ = writeln!(out, "- {}", name);
                }
            }
        }
        out.trim_end().to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

fn render_call_context(row: &TranscriptRow) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Call: {}", row.title);
    let _ = writeln!(out, "Date: {}", date_of(&row.created_at));

    if !row.participants.is_empty() {
        let _ = writeln!(out, "Participants: {}", row.participants.join(", "));
    }
    if let Some(score) = row.score {
        let _ = writeln!(out, "Score: {}/100", score);
    }
    if let Some(signal) = &row.deal_signal {
        let _ = writeln!(out, "Deal signal: {}", signal);
    }

    if let Some(summary) = &row.summary {
        let _ = write!(out, "\n### Summary\n{}\n", summary);
    }

    if !row.scores.is_empty() {
        out.push_str("\n### Detailed scores\n");
        for (name, value) in &row.scores {
            let _ = writeln!(out, "- {}: {}/100", name, value);
        }
    }

    if !row.risk_alerts.is_empty() {
        out.push_str("\n### Risk alerts\n");
        for alert in &row.risk_alerts {
            let _ = writeln!(out, "- {}", alert);
        }
    }

    if !row.qualification_gaps.is_empty() {
        out.push_str("\n### Qualification gaps\n");
        for gap in &row.qualification_gaps {
            let _ = writeln!(out, "- {}", gap);
        }
    }

    if !row.lines.is_empty() {
        let shown = row.lines.len().min(TRANSCRIPT_LINES_LIMIT);
        let _ = write!(out, "\n### Transcript (first {} lines)\n", shown);
        for (speaker, text) in row.lines.iter().take(TRANSCRIPT_LINES_LIMIT) {
            match speaker {
                Some(speaker) => {
                    let _ = writeln!(out, "{}: {}", speaker, text);
                }
                None => {
                    let _ = writeln!(out, "{}", text);
                }
            }
        }
    }

    out.trim_end().to_string()
}

fn render_company_context(company: &CompanyProfile, calls: &[CallSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Company: {}", company.name);
    if let Some(domain) = &company.domain {
        let _ = writeln!(out, "Domain: {}", domain);
    }
    if let Some(goal) = &company.goal {
        let _ = writeln!(out, "Goal: {}", goal);
    }

    if !company.pain_points.is_empty() {
        out.push_str("\n### Pain points\n");
        for pain in &company.pain_points {
            let _ = writeln!(out, "- {}", pain);
        }
    }

    if !company.contacts.is_empty() {
        out.push_str("\n### Contacts\n");
        for contact in &company.contacts {
            let mut line = format!("- {}", contact.name);
            if let Some(title) = &contact.title {
                let _ = write!(line, " ({})", title);
            }
            if let Some(email) = &contact.email {
                let _ = write!(line, " — {}", email);
            }
            let _ = writeln!(out, "{}", line);
        }
    }

    if !calls.is_empty() {
        let scored: Vec<i64> = calls.iter().filter_map(|c| c.score).collect();
        let _ = write!(out, "\n### Recent calls ({})\n", calls.len());
        if !scored.is_empty() {
            let average = scored.iter().sum::<i64>() as f64 / scored.len() as f64;
            let _ = writeln!(out, "Average score: {:.0}/100", average);
        }
        for call in calls {
            let _ = writeln!(out, "- {}", summary_line(call));
        }
    }

    out.trim_end().to_string()
}

/// One bullet for a call summary: date, title, score, signal.
pub(crate) fn summary_line(call: &CallSummary) -> String {
    let mut line = format!("{} — {}", date_of(&call.created_at), call.title);
    if let Some(score) = call.score {
        let _ = write!(line, " — {}/100", score);
    }
    if let Some(signal) = &call.deal_signal {
        let _ = write!(line, " — signal: {}", signal);
    }
    line
}

/// Date portion of an RFC 3339 timestamp.
fn date_of(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}
