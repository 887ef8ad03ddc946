//! Text-level markup rewriting.
//!
//! Two transformations live here:
//! - redaction of hidden anchor spans into ordinary placeholders
//! - `{{ name }}` placeholder substitution

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::TemplateError;

lazy_static! {
    /// `{{ name }}` with optional inner whitespace.
    static ref PLACEHOLDER_PATTERN: Regex = Regex::new(
        r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}"
    ).unwrap();
}

/// Build the pattern for a white-on-white span wrapping `/field/`.
fn hidden_span_pattern(field: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r#"(?i)<span[^>]*style="color:\s*white"[^>]*>\s*/{}/\s*</span>"#,
        regex::escape(field)
    ))
}

/// Replace each field's hidden anchor span with a visible placeholder.
///
/// `<span style="color: white">/street/</span>` becomes
/// `<span class="user-info">{{ street }}</span>`. Fields without matching
/// markup are left alone.
pub fn redact_hidden_fields(content: &str, fields: &[&str]) -> String {
    let mut content = content.to_string();

    for field in fields {
        let pattern = match hidden_span_pattern(field) {
            Ok(p) => p,
            Err(e) => {
                warn!(field = *field, error = %e, "Skipping redaction for field");
                continue;
            }
        };

        let replacement = format!(r#"<span class="user-info">{{{{ {} }}}}</span>"#, field);
        let rewritten = pattern.replace_all(&content, regex::NoExpand(&replacement));
        if rewritten == content {
            debug!(field = *field, "No hidden span to redact");
            continue;
        }
        content = rewritten.into_owned();
    }

    content
}

/// Names of all placeholders referenced by `content`, in order of appearance.
pub fn placeholders(content: &str) -> Vec<&str> {
    PLACEHOLDER_PATTERN
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Substitute every placeholder in a single pass.
///
/// Substituted text is not rescanned, so values that themselves look like
/// placeholders are emitted literally.
pub fn substitute(
    content: &str,
    variables: &BTreeMap<String, String>,
    raw: &[&str],
) -> Result<String, TemplateError> {
    if let Some(missing) = placeholders(content)
        .into_iter()
        .find(|name| !variables.contains_key(*name))
    {
        return Err(TemplateError::UnresolvedVariable(missing.to_string()));
    }

    let rendered = PLACEHOLDER_PATTERN.replace_all(content, |caps: &Captures| {
        let name = &caps[1];
        let value = variables.get(name).map(String::as_str).unwrap_or_default();
        if raw.contains(&name) {
            value.to_string()
        } else {
            escape_html(value)
        }
    });

    Ok(rendered.into_owned())
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_redact_hidden_span() {
        let html = r#"<p>Street: <span style="color: white">/street/</span></p>"#;
        let out = redact_hidden_fields(html, &["street"]);
        assert_eq!(
            out,
            r#"<p>Street: <span class="user-info">{{ street }}</span></p>"#
        );
    }

    #[test]
    fn test_redact_is_case_insensitive_and_tolerates_attributes() {
        let html = r#"<SPAN class="x" STYLE="COLOR:WHITE" id="z"> /zip_code/ </SPAN>"#;
        let out = redact_hidden_fields(html, &["zip_code"]);
        assert_eq!(out, r#"<span class="user-info">{{ zip_code }}</span>"#);
    }

    #[test]
    fn test_redact_ignores_visible_spans_and_absent_fields() {
        let html = r#"<span style="color: black">/city/</span>"#;
        assert_eq!(redact_hidden_fields(html, &["city", "country"]), html);
    }

    #[test]
    fn test_redact_does_not_match_other_tokens() {
        let html = r#"<span style="color: white">/user_email/</span>"#;
        assert_eq!(redact_hidden_fields(html, &["email"]), html);
    }

    #[test]
    fn test_redact_twice_is_stable() {
        let html = r#"<span style="color: white">/state/</span>"#;
        let once = redact_hidden_fields(html, &["state"]);
        let twice = redact_hidden_fields(&once, &["state"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_substitute() {
        let out = substitute("Hi {{name}}, {{ city }}!", &vars(&[("name", "A"), ("city", "X")]), &[])
            .unwrap();
        assert_eq!(out, "Hi A, X!");
    }

    #[test]
    fn test_unresolved_variable_is_error() {
        let result = substitute("{{ name }} {{ missing }}", &vars(&[("name", "A")]), &[]);
        assert!(matches!(
            result,
            Err(TemplateError::UnresolvedVariable(ref name)) if name == "missing"
        ));
    }

    #[test]
    fn test_values_are_escaped_unless_raw() {
        let variables = vars(&[("note", "<b>&</b>"), ("img", "a+b/c=")]);
        let out = substitute("{{ note }}|{{ img }}", &variables, &["img"]).unwrap();
        assert_eq!(out, "&lt;b&gt;&amp;&lt;/b&gt;|a+b/c=");
    }

    #[test]
    fn test_substitution_is_single_pass() {
        let variables = vars(&[("a", "{{ b }}"), ("b", "nope")]);
        let out = substitute("{{ a }}", &variables, &[]).unwrap();
        assert_eq!(out, "{{ b }}");
    }

    proptest! {
        #[test]
        fn prop_text_without_placeholders_is_unchanged(text in "[^{}<>&\"']{0,64}") {
            let out = substitute(&text, &BTreeMap::new(), &[]).unwrap();
            prop_assert_eq!(out, text);
        }

        #[test]
        fn prop_redaction_is_idempotent(value in "[a-z_]{1,12}") {
            let html = format!(r#"<div><span style="color: white">/{}/</span></div>"#, value);
            let once = redact_hidden_fields(&html, &[value.as_str()]);
            let twice = redact_hidden_fields(&once, &[value.as_str()]);
            prop_assert_eq!(once, twice);
        }
    }
}
