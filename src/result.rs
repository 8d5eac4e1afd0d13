//! Per-package accumulator for components and hints.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value, json};

use crate::component::Component;
use crate::hints::{HintSubject, RawHint};
use crate::package::Package;

/// Accumulates everything extracted from one package: components keyed by
/// the file basename they came from, and the hints raised along the way.
/// Created per package and consumed once.
pub struct GeneratorResult<'a> {
    pkg: &'a Package,
    components: HashMap<String, Component>,
    hints: Vec<(HintSubject, RawHint)>,
}

impl<'a> GeneratorResult<'a> {
    pub fn new(pkg: &'a Package) -> Self {
        Self {
            pkg,
            components: HashMap::new(),
            hints: Vec::new(),
        }
    }

    pub fn pkg(&self) -> &Package {
        self.pkg
    }

    pub fn component(&self, basename: &str) -> Option<&Component> {
        self.components.get(basename)
    }

    /// Attach a component for a file basename. At most one component may
    /// exist per basename; a second registration is ignored.
    pub fn add_component(&mut self, basename: &str, component: Component) {
        self.components.entry(basename.to_string()).or_insert(component);
    }

    pub fn components(&self) -> impl Iterator<Item = (&str, &Component)> {
        self.components.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn add_hint(&mut self, subject: HintSubject, tag: &str, vars: BTreeMap<String, String>) {
        self.hints.push((
            subject,
            RawHint {
                tag: tag.to_string(),
                vars,
            },
        ));
    }

    pub fn hints(&self) -> &[(HintSubject, RawHint)] {
        &self.hints
    }

    pub fn has_hints(&self) -> bool {
        !self.hints.is_empty()
    }

    /// Serialize the accumulated hints grouped by subject id, the shape
    /// persisted under the package's pkid. File subjects resolve to the id
    /// of the component parsed from that file when one exists.
    pub fn hints_json(&self) -> Value {
        let mut grouped: Map<String, Value> = Map::new();
        for (subject, hint) in &self.hints {
            let cid = match subject {
                HintSubject::Component(id) => id.clone(),
                HintSubject::File(name) => self
                    .components
                    .get(name)
                    .map(|cpt| cpt.id().to_string())
                    .unwrap_or_else(|| name.clone()),
            };
            let entry = grouped.entry(cid).or_insert_with(|| json!([]));
            if let Some(list) = entry.as_array_mut() {
                list.push(json!({ "tag": hint.tag, "vars": hint.vars }));
            }
        }
        Value::Object(grouped)
    }
}
