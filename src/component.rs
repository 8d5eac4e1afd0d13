//! The unified component model produced by the metadata parsers.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Component kind emitted by the desktop-entry front-end.
pub const KIND_DESKTOP_APP: &str = "desktop-app";

/// Provided-item kind for mime-type handlers.
pub const PROVIDED_MIMETYPE: &str = "mimetype";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub kind: String,
    pub width: u32,
    pub height: u32,
    pub name: String,
}

/// One catalog entry describing an installable application.
///
/// Localized attributes map a locale tag to a value; `"C"` is the reserved
/// tag for the untranslated base and is distinct from a missing entry.
/// A component is mutated only while its source file is being parsed and is
/// handed off immutably to aggregation afterwards.
#[derive(Debug, Clone, Default)]
pub struct Component {
    id: String,
    kind: String,
    name: HashMap<String, String>,
    summary: HashMap<String, String>,
    keywords: HashMap<String, Vec<String>>,
    categories: BTreeSet<String>,
    provided: BTreeMap<String, Vec<String>>,
    icons: Vec<Icon>,
}

impl Component {
    pub fn new(id: &str, kind: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn set_name(&mut self, locale: &str, value: &str) {
        self.name.insert(locale.to_string(), value.to_string());
    }

    pub fn name(&self, locale: &str) -> Option<&str> {
        self.name.get(locale).map(String::as_str)
    }

    /// Merge hook-supplied name translations. Explicitly parsed locales win.
    pub fn merge_names(&mut self, translations: HashMap<String, String>) {
        for (locale, value) in translations {
            self.name.entry(locale).or_insert(value);
        }
    }

    pub fn set_summary(&mut self, locale: &str, value: &str) {
        self.summary.insert(locale.to_string(), value.to_string());
    }

    pub fn summary(&self, locale: &str) -> Option<&str> {
        self.summary.get(locale).map(String::as_str)
    }

    pub fn merge_summaries(&mut self, translations: HashMap<String, String>) {
        for (locale, value) in translations {
            self.summary.entry(locale).or_insert(value);
        }
    }

    pub fn set_keywords(&mut self, locale: &str, words: Vec<String>) {
        self.keywords.insert(locale.to_string(), words);
    }

    pub fn keywords(&self, locale: &str) -> Option<&[String]> {
        self.keywords.get(locale).map(Vec::as_slice)
    }

    pub fn add_category(&mut self, category: &str) {
        self.categories.insert(category.to_string());
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn add_provided(&mut self, kind: &str, item: &str) {
        self.provided.entry(kind.to_string()).or_default().push(item.to_string());
    }

    pub fn provided(&self, kind: &str) -> Option<&[String]> {
        self.provided.get(kind).map(Vec::as_slice)
    }

    pub fn add_icon(&mut self, icon: Icon) {
        self.icons.push(icon);
    }

    pub fn icons(&self) -> &[Icon] {
        &self.icons
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn base_locale_is_distinct_from_missing() {
        let mut cpt = Component::new("org.example.app", KIND_DESKTOP_APP);
        cpt.set_name("C", "App");
        assert_eq!(cpt.name("C"), Some("App"));
        assert_eq!(cpt.name("de"), None);
    }

    #[test]
    fn explicit_locale_wins_over_merged_translations() {
        let mut cpt = Component::new("org.example.app", KIND_DESKTOP_APP);
        cpt.set_name("C", "App");
        cpt.set_name("de", "Anwendung");

        let mut hook = HashMap::new();
        hook.insert("de".to_string(), "Programm".to_string());
        hook.insert("fr".to_string(), "Application".to_string());
        cpt.merge_names(hook);

        assert_eq!(cpt.name("de"), Some("Anwendung"));
        assert_eq!(cpt.name("fr"), Some("Application"));
    }

    #[test]
    fn provided_items_are_grouped_by_kind() {
        let mut cpt = Component::new("org.example.app", KIND_DESKTOP_APP);
        cpt.add_provided(PROVIDED_MIMETYPE, "text/html");
        cpt.add_provided(PROVIDED_MIMETYPE, "image/png");
        assert_eq!(
            cpt.provided(PROVIDED_MIMETYPE),
            Some(&["text/html".to_string(), "image/png".to_string()][..])
        );
        assert_eq!(cpt.provided("binary"), None);
    }

    #[test]
    fn categories_are_a_set() {
        let mut cpt = Component::new("org.example.app", KIND_DESKTOP_APP);
        cpt.add_category("Network");
        cpt.add_category("Network");
        assert_eq!(cpt.categories().len(), 1);
    }
}
