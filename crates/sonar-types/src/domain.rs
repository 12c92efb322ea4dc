//! Domain fragments produced by the source fetchers.
//!
//! Every field that the relational store may omit or garble is optional or a
//! collection here; decoders fill in what they can and leave the rest empty.

use serde::{Deserialize, Serialize};

/// Summary of one previous call, used for historical grounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSummary {
    /// Transcript id.
    pub transcript_id: String,

    /// Call title as recorded at import time.
    pub title: String,

    /// Overall AI score, 0–100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,

    /// Deal-health signal extracted from the analysis (e.g. "positive").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_signal: Option<String>,

    /// Creation timestamp, RFC 3339.
    pub created_at: String,
}

/// A contact attached to a company record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Structured company profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// Company id.
    pub company_id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pain_points: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contacts: Vec<Contact>,

    /// What the company is trying to achieve, in their own words.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

/// How a team role was assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRoleKind {
    /// Built-in role (admin, member, ...).
    System,
    /// Customer-defined department role.
    Custom,
}

/// One resolved role entry for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRole {
    pub name: String,

    pub kind: TeamRoleKind,

    /// Free-text description; custom roles usually carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The requesting rep's sales profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepProfile {
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The team's sales motion (e.g. "product-led", "enterprise outbound").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_motion: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<TeamRole>,
}

/// A buyer persona from the ICP enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub title: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pain_points: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goals: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responsibilities: Vec<String>,
}

/// Aggregates derived across all personas of a profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaRollup {
    pub pain_points: Vec<String>,
    pub goals: Vec<String>,
    pub job_titles: Vec<String>,
    pub responsibilities: Vec<String>,
}

impl PersonaRollup {
    /// Collect deduplicated attributes across a persona set, preserving
    /// first-seen order so downstream formatting stays deterministic.
    pub fn from_personas(personas: &[Persona]) -> Self {
        let mut rollup = Self::default();
        for persona in personas {
            push_unique(&mut rollup.job_titles, &persona.title);
            for p in &persona.pain_points {
                push_unique(&mut rollup.pain_points, p);
            }
            for g in &persona.goals {
                push_unique(&mut rollup.goals, g);
            }
            for r in &persona.responsibilities {
                push_unique(&mut rollup.responsibilities, r);
            }
        }
        rollup
    }

    /// True when no persona contributed anything.
    pub fn is_empty(&self) -> bool {
        self.pain_points.is_empty()
            && self.goals.is_empty()
            && self.job_titles.is_empty()
            && self.responsibilities.is_empty()
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Ideal-customer-profile enrichment for the seller's own product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcpProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_proposition: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub icp_attributes: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub personas: Vec<Persona>,
}

impl IcpProfile {
    /// Derive the cross-persona rollup.
    pub fn rollup(&self) -> PersonaRollup {
        PersonaRollup::from_personas(&self.personas)
    }
}

/// Call-stage classification inferred from prior history with the company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    /// No earlier calls with this company on record.
    #[default]
    Discovery,
    /// At least one earlier call exists.
    FollowUp,
}

impl CallType {
    /// Infer the stage from the previous-calls fragment.
    pub fn infer(previous_calls: &[CallSummary]) -> Self {
        if previous_calls.is_empty() {
            CallType::Discovery
        } else {
            CallType::FollowUp
        }
    }

    /// Human-readable label used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            CallType::Discovery => "discovery call",
            CallType::FollowUp => "follow-up call",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona(title: &str, pains: &[&str], goals: &[&str]) -> Persona {
        Persona {
            title: title.to_string(),
            pain_points: pains.iter().map(|s| s.to_string()).collect(),
            goals: goals.iter().map(|s| s.to_string()).collect(),
            responsibilities: vec![],
        }
    }

    #[test]
    fn test_rollup_dedupes_across_personas() {
        let personas = vec![
            persona("VP Sales", &["slow pipeline", "churn"], &["grow ARR"]),
            persona("CRO", &["churn"], &["grow ARR", "forecast accuracy"]),
        ];

        let rollup = PersonaRollup::from_personas(&personas);
        assert_eq!(rollup.job_titles, vec!["VP Sales", "CRO"]);
        assert_eq!(rollup.pain_points, vec!["slow pipeline", "churn"]);
        assert_eq!(rollup.goals, vec!["grow ARR", "forecast accuracy"]);
        assert!(rollup.responsibilities.is_empty());
    }

    #[test]
    fn test_rollup_empty() {
        assert!(PersonaRollup::from_personas(&[]).is_empty());
    }

    #[test]
    fn test_call_type_inference() {
        assert_eq!(CallType::infer(&[]), CallType::Discovery);

        let previous = vec![CallSummary {
            transcript_id: "1".into(),
            title: "Intro".into(),
            score: Some(60),
            deal_signal: None,
            created_at: "2026-01-01T00:00:00Z".into(),
        }];
        assert_eq!(CallType::infer(&previous), CallType::FollowUp);
    }
}
