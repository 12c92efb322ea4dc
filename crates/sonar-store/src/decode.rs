//! Tolerant decoders for JSON columns.
//!
//! The dashboard writes these columns from TypeScript with no schema
//! enforcement, so every shape assumption here is defensive: wrong types are
//! skipped, missing keys yield empty values, and a parse failure decodes to
//! nothing rather than an error.

use serde_json::Value;
use sonar_types::{Contact, Persona};
use tracing::warn;

/// Parse a JSON column. `None`, empty, or malformed text decodes to `None`.
pub fn parse_json(column: Option<&str>, context: &str) -> Option<Value> {
    let text = column?.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(column = context, error = %e, "malformed JSON column, ignoring");
            None
        }
    }
}

/// A string field, accepting only actual strings.
pub fn opt_string(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// An array of strings; non-string elements are skipped.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value.and_then(Value::as_array) {
        Some(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        None => Vec::new(),
    }
}

/// Participant entries are either plain strings or `{name, role?}` objects.
pub fn participant_list(value: Option<&Value>) -> Vec<String> {
    match value.and_then(Value::as_array) {
        Some(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Object(_) => {
                    let name = opt_string(item, "name")?;
                    match opt_string(item, "role") {
                        Some(role) => Some(format!("{} ({})", name, role)),
                        None => Some(name),
                    }
                }
                _ => None,
            })
            .collect(),
        None => Vec::new(),
    }
}

/// Contact entries: `{name, title?, email?}`; entries without a name are
/// skipped.
pub fn contact_list(value: Option<&Value>) -> Vec<Contact> {
    match value.and_then(Value::as_array) {
        Some(items) => items
            .iter()
            .filter_map(|item| {
                let name = opt_string(item, "name")?;
                Some(Contact {
                    name,
                    title: opt_string(item, "title"),
                    email: opt_string(item, "email"),
                })
            })
            .collect(),
        None => Vec::new(),
    }
}

/// Persona entries: `{title, painPoints?, goals?, responsibilities?}`.
pub fn persona_list(value: Option<&Value>) -> Vec<Persona> {
    match value.and_then(Value::as_array) {
        Some(items) => items
            .iter()
            .filter_map(|item| {
                let title = opt_string(item, "title")?;
                Some(Persona {
                    title,
                    pain_points: string_list(item.get("painPoints")),
                    goals: string_list(item.get("goals")),
                    responsibilities: string_list(item.get("responsibilities")),
                })
            })
            .collect(),
        None => Vec::new(),
    }
}

/// Transcript lines: `{speaker?, text}` objects; entries without text are
/// skipped.
pub fn line_list(value: Option<&Value>) -> Vec<(Option<String>, String)> {
    match value.and_then(Value::as_array) {
        Some(items) => items
            .iter()
            .filter_map(|item| {
                let text = opt_string(item, "text")?;
                Some((opt_string(item, "speaker"), text))
            })
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_handles_garbage() {
        assert!(parse_json(Some(r#"{"a": 1}"#), "t").is_some());
        assert!(parse_json(Some("not json"), "t").is_none());
        assert!(parse_json(Some(""), "t").is_none());
        assert!(parse_json(None, "t").is_none());
    }

    #[test]
    fn test_string_list_skips_non_strings() {
        let value = json!(["a", 3, null, "b", {"x": 1}]);
        assert_eq!(string_list(Some(&value)), vec!["a", "b"]);
        assert!(string_list(Some(&json!("not an array"))).is_empty());
        assert!(string_list(None).is_empty());
    }

    #[test]
    fn test_participant_list_mixed_shapes() {
        let value = json!([
            "Dana",
            {"name": "Alex", "role": "AE"},
            {"name": "Sam"},
            {"role": "no name"},
            42
        ]);
        assert_eq!(
            participant_list(Some(&value)),
            vec!["Dana", "Alex (AE)", "Sam"]
        );
    }

    #[test]
    fn test_contact_list_requires_name() {
        let value = json!([
            {"name": "Pat", "title": "CTO", "email": "pat@acme.io"},
            {"title": "nameless"},
            {"name": "Riley"}
        ]);
        let contacts = contact_list(Some(&value));
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].name, "Pat");
        assert_eq!(contacts[0].title.as_deref(), Some("CTO"));
        assert!(contacts[1].email.is_none());
    }

    #[test]
    fn test_persona_list() {
        let value = json!([
            {"title": "VP Sales", "painPoints": ["churn"], "goals": ["grow"], "responsibilities": ["forecast"]},
            {"painPoints": ["ignored, no title"]}
        ]);
        let personas = persona_list(Some(&value));
        assert_eq!(personas.len(), 1);
        assert_eq!(personas[0].title, "VP Sales");
        assert_eq!(personas[0].pain_points, vec!["churn"]);
    }

    #[test]
    fn test_line_list() {
        let value = json!([
            {"speaker": "Rep", "text": "Hi there"},
            {"text": "Hello"},
            {"speaker": "no text"}
        ]);
        let lines = line_list(Some(&value));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0.as_deref(), Some("Rep"));
        assert_eq!(lines[1].0, None);
    }
}
