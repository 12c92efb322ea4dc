//! Typed row shapes read from the dashboard schema.

use serde_json::Value;
use sonar_types::{CompanyProfile, Contact};

use crate::decode;

/// Denormalized transcript row with its decoded JSON columns.
#[derive(Debug, Clone)]
pub struct TranscriptRow {
    pub id: String,
    pub title: String,
    pub company_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: String,
    pub score: Option<i64>,
    pub deal_signal: Option<String>,
    pub participants: Vec<String>,
    pub summary: Option<String>,
    /// Named sub-scores from the AI analysis, e.g. ("discovery", 70).
    pub scores: Vec<(String, i64)>,
    pub risk_alerts: Vec<String>,
    pub qualification_gaps: Vec<String>,
    /// (speaker, text) pairs in transcript order.
    pub lines: Vec<(Option<String>, String)>,
}

impl TranscriptRow {
    /// Decode the JSON columns of a transcript row.
    pub(crate) fn decode(
        id: String,
        title: String,
        company_id: Option<String>,
        user_id: Option<String>,
        created_at: String,
        score: Option<i64>,
        deal_signal: Option<String>,
        participants_json: Option<String>,
        analysis_json: Option<String>,
        lines_json: Option<String>,
    ) -> Self {
        let participants =
            decode::parse_json(participants_json.as_deref(), "transcripts.participants");
        let analysis = decode::parse_json(analysis_json.as_deref(), "transcripts.analysis");
        let lines = decode::parse_json(lines_json.as_deref(), "transcripts.lines");

        let summary = analysis
            .as_ref()
            .and_then(|a| decode::opt_string(a, "summary"));
        let scores = analysis
            .as_ref()
            .and_then(|a| a.get("scores"))
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_i64().map(|n| (k.clone(), n)))
                    .collect()
            })
            .unwrap_or_default();
        let risk_alerts = decode::string_list(analysis.as_ref().and_then(|a| a.get("riskAlerts")));
        let qualification_gaps =
            decode::string_list(analysis.as_ref().and_then(|a| a.get("qualificationGaps")));

        Self {
            id,
            title,
            company_id,
            user_id,
            created_at,
            score,
            deal_signal,
            participants: decode::participant_list(participants.as_ref()),
            summary,
            scores,
            risk_alerts,
            qualification_gaps,
            lines: decode::line_list(lines.as_ref()),
        }
    }
}

/// Company row with its decoded JSON columns.
#[derive(Debug, Clone)]
pub struct CompanyRow {
    pub id: String,
    pub name: String,
    pub domain: Option<String>,
    pub user_id: Option<String>,
    pub pain_points: Vec<String>,
    pub contacts: Vec<Contact>,
    pub goal: Option<String>,
}

impl CompanyRow {
    /// Decode the JSON columns of a company row.
    pub(crate) fn decode(
        id: String,
        name: String,
        domain: Option<String>,
        user_id: Option<String>,
        pain_points_json: Option<String>,
        contacts_json: Option<String>,
        goal: Option<String>,
    ) -> Self {
        let pain_points = decode::parse_json(pain_points_json.as_deref(), "companies.pain_points");
        let contacts = decode::parse_json(contacts_json.as_deref(), "companies.contacts");

        Self {
            id,
            name,
            domain,
            user_id,
            pain_points: decode::string_list(pain_points.as_ref()),
            contacts: decode::contact_list(contacts.as_ref()),
            goal: goal.filter(|g| !g.is_empty()),
        }
    }

    /// Convert to the structured profile fragment.
    pub fn into_profile(self) -> CompanyProfile {
        CompanyProfile {
            company_id: self.id,
            name: self.name,
            domain: self.domain,
            pain_points: self.pain_points,
            contacts: self.contacts,
            goal: self.goal,
        }
    }
}

/// A user row.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub name: Option<String>,
    pub team_id: Option<String>,
    pub sales_motion: Option<String>,
}

/// A team roster entry.
#[derive(Debug, Clone)]
pub struct TeamMemberRow {
    pub user_id: String,
    pub name: Option<String>,
}

/// Per-member call statistics for the team page.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberStats {
    pub call_count: i64,
    pub average_score: Option<f64>,
}

/// A coaching note row.
#[derive(Debug, Clone)]
pub struct CoachingNote {
    pub note: String,
    pub transcript_id: Option<String>,
    pub created_at: String,
}
