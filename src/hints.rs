//! Issue hints and the static tag registry.
//!
//! A hint binds a subject (a file or a component) to a registered tag.
//! Severity and the human-readable message template come from a tag
//! definition document loaded once at startup; message variables are bound
//! when the hint is raised and substituted at report time.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Embedded tag definition document.
const HINT_TAG_DEFINITIONS: &str = include_str!("../data/hint-tags.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// What a hint is attached to. File subjects are resolved to a component id
/// at aggregation time when the file produced a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintSubject {
    File(String),
    Component(String),
}

/// An unrendered hint as accumulated during package processing and persisted
/// in the store: the tag plus its variable bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHint {
    pub tag: String,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TagDefinition {
    severity: Severity,
    text: String,
}

/// Registry mapping hint tags to severity and message template.
///
/// Populated once at startup and shared by reference; never mutated
/// afterwards, so it is read without synchronization.
pub struct HintRegistry {
    tags: HashMap<String, TagDefinition>,
}

impl HintRegistry {
    /// Load the registry from the embedded tag definition document.
    pub fn load_default() -> Result<Self> {
        Self::from_json(HINT_TAG_DEFINITIONS)
    }

    pub fn from_json(doc: &str) -> Result<Self> {
        let tags: HashMap<String, TagDefinition> =
            serde_json::from_str(doc).context("failed to parse hint tag definitions")?;
        Ok(Self { tags })
    }

    pub fn severity(&self, tag: &str) -> Option<Severity> {
        self.tags.get(tag).map(|def| def.severity)
    }

    /// Render the message for `tag` by substituting `{{var}}` occurrences.
    /// Returns `None` for unknown tags.
    pub fn render(&self, tag: &str, vars: &BTreeMap<String, String>) -> Option<String> {
        let def = self.tags.get(tag)?;
        Some(render_template(&def.text, vars))
    }
}

/// Substitute `{{name}}` occurrences with the bound variables. Unbound
/// variables render as empty strings.
fn render_template(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => {
                let var = after[..close].trim();
                if let Some(value) = vars.get(var) {
                    out.push_str(value);
                }
                rest = &after[close + 2..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn default_registry_contains_the_core_tags() {
        let registry = HintRegistry::load_default().unwrap();
        assert_eq!(registry.severity("desktop-file-error"), Some(Severity::Error));
        assert_eq!(registry.severity("metainfo-quoted-value"), Some(Severity::Info));
        assert_eq!(registry.severity("category-name-invalid"), Some(Severity::Warning));
        assert_eq!(registry.severity("no-such-tag"), None);
    }

    #[test]
    fn messages_substitute_bound_variables() {
        let registry = HintRegistry::from_json(
            r#"{"sample": {"severity": "warning", "text": "bad value {{value}} in {{key}}"}}"#,
        )
        .unwrap();
        let msg = registry
            .render("sample", &vars(&[("value", "x"), ("key", "Name")]))
            .unwrap();
        assert_eq!(msg, "bad value x in Name");
    }

    #[test]
    fn unbound_variables_render_empty() {
        let registry = HintRegistry::from_json(
            r#"{"sample": {"severity": "info", "text": "got: {{missing}}!"}}"#,
        )
        .unwrap();
        assert_eq!(registry.render("sample", &BTreeMap::new()).unwrap(), "got: !");
    }

    #[test]
    fn unknown_tags_render_nothing() {
        let registry = HintRegistry::load_default().unwrap();
        assert_eq!(registry.render("no-such-tag", &BTreeMap::new()), None);
    }
}
