//! System prompt formatting.
//!
//! Pure functions from `(mode, bundle)` to prompt text: no I/O, no clocks,
//! byte-identical output for identical input. Every template embeds the role
//! preamble, the communication-style block, the rendered context, and the
//! guidelines block, joined with blank lines.
//!
//! Missing optional fragments are omitted entirely — no placeholder text —
//! and the tagged sections (`<company_profile>`, `<icp>`, `<buyer_personas>`,
//! `<rep_context>`) appear only when the corresponding fragment is
//! non-empty.

use std::fmt::Write as _;

use sonar_types::{CompanyProfile, IcpProfile, RepProfile, TeamRoleKind};

use crate::bundle::ContextBundle;
use crate::fetch::summary_line;
use crate::mode::ContextMode;

/// Render the system prompt for a resolved mode and loaded bundle.
pub fn format_system_prompt(mode: &ContextMode, bundle: &ContextBundle) -> String {
    let sections = [
        preamble(mode),
        style_block().to_string(),
        context_section(mode, bundle),
        guidelines_block().to_string(),
    ];
    sections.join("\n\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixed blocks
// ─────────────────────────────────────────────────────────────────────────────

fn preamble(mode: &ContextMode) -> String {
    let base = "You are Sonar, an AI sales assistant embedded in a sales intelligence \
                dashboard. You analyze call transcripts, company records, and team \
                performance to help reps close deals.";

    let capability = match mode {
        ContextMode::LegacyCall { .. } => {
            "Right now you are answering questions about one specific sales call."
        }
        ContextMode::LegacyCompany { .. } => {
            "Right now you are answering questions about one specific company."
        }
        ContextMode::PageSpecific { .. } => {
            "Right now you are answering questions about the page the user is viewing, \
             with workspace search results as supporting context."
        }
        ContextMode::SemanticWorkspace { .. } | ContextMode::FallbackWorkspace { .. } => {
            "Right now you are answering questions across the user's whole workspace."
        }
        ContextMode::NoContext => "Right now no specific sales data is loaded.",
    };

    format!("{}\n{}", base, capability)
}

fn style_block() -> &'static str {
    "# Communication style\n\
     - Be direct and specific; cite scores, names, and dates from the context.\n\
     - Keep answers short unless the user asks for depth.\n\
     - Never invent facts that are not in the context; say when something is unknown."
}

fn guidelines_block() -> &'static str {
    "# Guidelines\n\
     - Ground every claim in the context above.\n\
     - When the context includes scores, quote them as n/100.\n\
     - Recommend concrete next steps when the user asks what to do."
}

// ─────────────────────────────────────────────────────────────────────────────
// Context section per mode
// ─────────────────────────────────────────────────────────────────────────────

fn context_section(mode: &ContextMode, bundle: &ContextBundle) -> String {
    match mode {
        ContextMode::LegacyCall { .. } => {
            let mut parts: Vec<String> = Vec::new();
            if bundle.call_context.is_empty() {
                parts.push("No data could be loaded for the selected call.".to_string());
            } else {
                parts.push(format!("# Current call\n\n{}", bundle.call_context));
                parts.push(format!(
                    "This conversation concerns a {}.",
                    bundle.call_type.label()
                ));
            }
            push_shared_sections(&mut parts, bundle);
            parts.join("\n\n")
        }
        ContextMode::LegacyCompany { .. } => {
            let mut parts: Vec<String> = Vec::new();
            if bundle.company_context.is_empty() {
                parts.push("No data could be loaded for the selected company.".to_string());
            } else {
                parts.push(format!("# Company overview\n\n{}", bundle.company_context));
            }
            push_shared_sections(&mut parts, bundle);
            parts.join("\n\n")
        }
        ContextMode::PageSpecific { page, .. } => {
            let mut parts: Vec<String> = Vec::new();
            if bundle.page_context.is_empty() {
                parts.push(format!(
                    "No data could be loaded for the {} page.",
                    page.as_str()
                ));
            } else {
                parts.push(format!(
                    "# Page context: {}\n\n{}",
                    page.as_str(),
                    bundle.page_context
                ));
            }
            if !bundle.search_context.is_empty() {
                parts.push(format!(
                    "# Workspace search results\n{}",
                    bundle.search_context
                ));
            }
            parts.join("\n\n")
        }
        ContextMode::SemanticWorkspace { .. } => {
            if bundle.search_context.is_empty() {
                "# Workspace search results\nNo matching content was found in the workspace."
                    .to_string()
            } else {
                format!("# Workspace search results\n{}", bundle.search_context)
            }
        }
        ContextMode::FallbackWorkspace { .. } => {
            if bundle.search_context.is_empty() {
                "Workspace context is limited right now. Answer from general sales \
                 knowledge and tell the user when specifics are unavailable."
                    .to_string()
            } else {
                format!("# Workspace search results\n{}", bundle.search_context)
            }
        }
        ContextMode::NoContext => {
            "No call or company is currently selected. Tell the user they can open a \
             call or a company to get grounded answers, and answer general sales \
             questions in the meantime."
                .to_string()
        }
    }
}

/// Enrichment sections shared by the legacy call/company templates, emitted
/// in fixed order: previous calls, company profile, rep context, ICP,
/// buyer personas.
fn push_shared_sections(parts: &mut Vec<String>, bundle: &ContextBundle) {
    if !bundle.previous_calls.is_empty() {
        let mut section = String::from("# Previous calls with this company\n");
        for call in &bundle.previous_calls {
            let _ = writeln!(section, "- {}", summary_line(call));
        }
        parts.push(section.trim_end().to_string());
    }

    if let Some(company) = &bundle.company {
        parts.push(company_profile_section(company));
    }

    if let Some(rep) = &bundle.rep {
        parts.push(rep_section(rep));
    }

    if let Some(icp) = &bundle.icp {
        if let Some(section) = icp_section(icp) {
            parts.push(section);
        }
        if let Some(section) = personas_section(icp) {
            parts.push(section);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tagged sections
// ─────────────────────────────────────────────────────────────────────────────

fn company_profile_section(company: &CompanyProfile) -> String {
    let mut out = String::from("<company_profile>\n");
    let _ = writeln!(out, "Name: {}", company.name);
    if let Some(domain) = &company.domain {
        let _ = writeln!(out, "Domain: {}", domain);
    }
    if let Some(goal) = &company.goal {
        let _ = writeln!(out, "Goal: {}", goal);
    }
    if !company.pain_points.is_empty() {
        out.push_str("Pain points:\n");
        for pain in &company.pain_points {
            let _ = writeln!(out, "- {}", pain);
        }
    }
    if !company.contacts.is_empty() {
        out.push_str("Contacts:\n");
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
    out.push_str("</company_profile>");
    out
}

fn rep_section(rep: &RepProfile) -> String {
    let mut out = String::from("<rep_context>\n");
    if let Some(name) = &rep.name {
        let _ = writeln!(out, "Rep: {}", name);
    }
    if let Some(motion) = &rep.sales_motion {
        let _ = writeln!(out, "Sales motion: {}", motion);
    }
    if !rep.roles.is_empty() {
        out.push_str("Roles:\n");
        for role in &rep.roles {
            let kind = match role.kind {
                TeamRoleKind::System => "system",
                TeamRoleKind::Custom => "custom",
            };
            let mut line = format!("- {} ({})", role.name, kind);
            if let Some(description) = &role.description {
                let _ = write!(line, ": {}", description);
            }
            let _ = writeln!(out, "{}", line);
        }
    }
    out.push_str("</rep_context>");
    out
}

fn icp_section(icp: &IcpProfile) -> Option<String> {
    let rollup = icp.rollup();
    if icp.value_proposition.is_none()
        && icp.products.is_empty()
        && icp.icp_attributes.is_empty()
        && rollup.is_empty()
    {
        return None;
    }

    let mut out = String::from("<icp>\n");
    if let Some(value_proposition) = &icp.value_proposition {
        let _ = writeln!(out, "Value proposition: {}", value_proposition);
    }
    if !icp.products.is_empty() {
        out.push_str("Products:\n");
        for product in &icp.products {
            let _ = writeln!(out, "- {}", product);
        }
    }
    if !icp.icp_attributes.is_empty() {
        out.push_str("Ideal customer attributes:\n");
        for attribute in &icp.icp_attributes {
            let _ = writeln!(out, "- {}", attribute);
        }
    }
    if !rollup.job_titles.is_empty() {
        let _ = writeln!(out, "Typical buyer titles: {}", rollup.job_titles.join(", "));
    }
    if !rollup.pain_points.is_empty() {
        let _ = writeln!(out, "Common pain points: {}", rollup.pain_points.join(", "));
    }
    if !rollup.goals.is_empty() {
        let _ = writeln!(out, "Common goals: {}", rollup.goals.join(", "));
    }
    out.push_str("</icp>");
    Some(out)
}

fn personas_section(icp: &IcpProfile) -> Option<String> {
    if icp.personas.is_empty() {
        return None;
    }

    let mut out = String::from("<buyer_personas>\n");
    for persona in &icp.personas {
        let _ = writeln!(out, "## {}", persona.title);
        if !persona.pain_points.is_empty() {
            let _ = writeln!(out, "Pain points: {}", persona.pain_points.join(", "));
        }
        if !persona.goals.is_empty() {
            let _ = writeln!(out, "Goals: {}", persona.goals.join(", "));
        }
        if !persona.responsibilities.is_empty() {
            let _ = writeln!(
                out,
                "Responsibilities: {}",
                persona.responsibilities.join(", ")
            );
        }
    }
    out.push_str("</buyer_personas>");
    Some(out)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
