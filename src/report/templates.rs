//! Template rendering contract and a small built-in engine.
//!
//! The report generator only depends on [`TemplateEngine`] plus the
//! [`Context`] model: names resolve to text, to ordered sub-contexts, or to
//! lambdas that receive the unrendered inner content of their section and
//! return rendered text. [`SimpleEngine`] implements a mustache subset that
//! is sufficient for the bundled report pages; vendors can swap in a richer
//! engine without touching the aggregation code.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Result, bail};

pub type Lambda = Rc<dyn Fn(&str) -> String>;

#[derive(Clone)]
pub enum CtxValue {
    Text(String),
    List(Vec<Context>),
    Lambda(Lambda),
}

/// Name-indexed rendering context.
#[derive(Clone, Default)]
pub struct Context {
    values: BTreeMap<String, CtxValue>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, key: &str, value: impl AsRef<str>) {
        self.values
            .insert(key.to_string(), CtxValue::Text(value.as_ref().to_string()));
    }

    /// Presence marker: sections keyed on `key` render their body once.
    pub fn set_flag(&mut self, key: &str) {
        self.set_text(key, "yes");
    }

    pub fn set_list(&mut self, key: &str, items: Vec<Context>) {
        self.values.insert(key.to_string(), CtxValue::List(items));
    }

    pub fn set_lambda(&mut self, key: &str, f: impl Fn(&str) -> String + 'static) {
        self.values.insert(key.to_string(), CtxValue::Lambda(Rc::new(f)));
    }

    pub fn get(&self, key: &str) -> Option<&CtxValue> {
        self.values.get(key)
    }
}

pub trait TemplateEngine: Sync {
    fn render(&self, template: &str, ctx: &Context) -> String;
}

/// Built-in mustache-subset engine.
///
/// Supported: `{{name}}` substitution (no HTML escaping; values destined for
/// markup are escaped by the producer), `{{#name}}…{{/name}}` sections over
/// lists, lambdas and truthy text, `{{^name}}…{{/name}}` inverted sections
/// and `{{! comment}}`. Section tags must be written without inner spaces.
pub struct SimpleEngine;

impl TemplateEngine for SimpleEngine {
    fn render(&self, template: &str, ctx: &Context) -> String {
        render_chain(template, &[ctx])
    }
}

fn lookup<'a>(chain: &[&'a Context], key: &str) -> Option<&'a CtxValue> {
    chain.iter().rev().find_map(|ctx| ctx.get(key))
}

fn render_chain(template: &str, chain: &[&Context]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        let tag = after[..close].trim();
        let following = &after[close + 2..];

        if let Some(name) = tag.strip_prefix('#') {
            let Some((inner, remainder)) = find_section_end(following, name) else {
                out.push_str(&rest[open..]);
                return out;
            };
            match lookup(chain, name) {
                Some(CtxValue::List(items)) => {
                    for item in items {
                        let mut child = chain.to_vec();
                        child.push(item);
                        out.push_str(&render_chain(inner, &child));
                    }
                }
                Some(CtxValue::Lambda(f)) => out.push_str(&f(inner)),
                Some(CtxValue::Text(_)) => out.push_str(&render_chain(inner, chain)),
                None => {}
            }
            rest = remainder;
        } else if let Some(name) = tag.strip_prefix('^') {
            let Some((inner, remainder)) = find_section_end(following, name) else {
                out.push_str(&rest[open..]);
                return out;
            };
            let falsy = match lookup(chain, name) {
                None => true,
                Some(CtxValue::List(items)) => items.is_empty(),
                Some(_) => false,
            };
            if falsy {
                out.push_str(&render_chain(inner, chain));
            }
            rest = remainder;
        } else if tag.starts_with('!') {
            rest = following;
        } else {
            if let Some(CtxValue::Text(value)) = lookup(chain, tag) {
                out.push_str(value);
            }
            rest = following;
        }
    }

    out.push_str(rest);
    out
}

/// Locate the `{{/name}}` closing the section that starts at the beginning
/// of `input`, skipping nested sections of the same name. Returns the inner
/// content and the remainder after the closing tag.
fn find_section_end<'a>(input: &'a str, name: &str) -> Option<(&'a str, &'a str)> {
    let open_section = format!("{{{{#{name}}}}}");
    let open_inverted = format!("{{{{^{name}}}}}");
    let close = format!("{{{{/{name}}}}}");

    let mut depth = 0usize;
    let mut search = 0usize;
    loop {
        let close_pos = input[search..].find(&close)? + search;
        let segment = &input[search..close_pos];
        depth += segment.matches(&open_section).count();
        depth += segment.matches(&open_inverted).count();
        if depth == 0 {
            return Some((&input[..close_pos], &input[close_pos + close.len()..]));
        }
        depth -= 1;
        search = close_pos + close.len();
    }
}

/// Install the `partial` / `block` inheritance lambdas on a page context.
///
/// Both close over one partials map scoped to this render: a `partial`
/// section's first line names it and the remaining lines are stored as its
/// body; a `block` section renders the stored body when its name was
/// defined, otherwise its own body.
pub fn add_inheritance_lambdas(ctx: &mut Context) {
    let partials: Rc<RefCell<HashMap<String, String>>> = Rc::new(RefCell::new(HashMap::new()));

    let store = Rc::clone(&partials);
    ctx.set_lambda("partial", move |inner| {
        let (name, body) = split_first_line(inner);
        store.borrow_mut().insert(name.to_string(), body.to_string());
        String::new()
    });

    ctx.set_lambda("block", move |inner| {
        let (name, body) = split_first_line(inner);
        match partials.borrow().get(name) {
            Some(text) => text.clone(),
            None => body.to_string(),
        }
    });
}

fn split_first_line(inner: &str) -> (&str, &str) {
    match inner.trim_start_matches('\n').split_once('\n') {
        Some((first, rest)) => (first.trim(), rest),
        None => (inner.trim(), ""),
    }
}

/// Resolve the vendor template directory: `<root>/<project>` first, then
/// `<root>/default`, then the root itself when it directly contains pages.
pub fn find_template_dir(root: &Path, project_name: &str) -> Result<PathBuf> {
    for candidate in [root.join(project_name), root.join("default")] {
        if candidate.is_dir() {
            return Ok(candidate);
        }
    }
    let has_pages = root
        .read_dir()
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.path().extension().is_some_and(|ext| ext == "html"))
        })
        .unwrap_or(false);
    if has_pages {
        return Ok(root.to_path_buf());
    }
    bail!("no usable template directory under {}", root.display());
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn render(template: &str, ctx: &Context) -> String {
        SimpleEngine.render(template, ctx)
    }

    #[test]
    fn substitutes_text_values() {
        let mut ctx = Context::new();
        ctx.set_text("name", "sid");
        assert_eq!(render("suite: {{name}}!", &ctx), "suite: sid!");
        assert_eq!(render("missing: {{other}}!", &ctx), "missing: !");
    }

    #[test]
    fn iterates_list_sections() {
        let mut ctx = Context::new();
        let items = ["a", "b"]
            .iter()
            .map(|v| {
                let mut c = Context::new();
                c.set_text("v", *v);
                c
            })
            .collect();
        ctx.set_list("items", items);
        assert_eq!(render("{{#items}}[{{v}}]{{/items}}", &ctx), "[a][b]");
    }

    #[test]
    fn child_contexts_fall_back_to_the_parent() {
        let mut ctx = Context::new();
        ctx.set_text("suite", "sid");
        let mut item = Context::new();
        item.set_text("v", "x");
        ctx.set_list("items", vec![item]);
        assert_eq!(render("{{#items}}{{v}}@{{suite}}{{/items}}", &ctx), "x@sid");
    }

    #[test]
    fn flags_gate_conditional_sections() {
        let mut ctx = Context::new();
        ctx.set_flag("has_errors");
        assert_eq!(render("{{#has_errors}}E{{/has_errors}}", &ctx), "E");
        assert_eq!(render("{{#has_warnings}}W{{/has_warnings}}", &ctx), "");
        assert_eq!(render("{{^has_warnings}}none{{/has_warnings}}", &ctx), "none");
    }

    #[test]
    fn lambdas_receive_unrendered_content() {
        let mut ctx = Context::new();
        ctx.set_text("name", "sid");
        ctx.set_lambda("upper", |inner| inner.to_uppercase());
        assert_eq!(render("{{#upper}}{{name}}{{/upper}}", &ctx), "{{NAME}}");
    }

    #[test]
    fn block_falls_back_to_its_own_body() {
        let mut ctx = Context::new();
        add_inheritance_lambdas(&mut ctx);
        let out = render("{{#block}}title\nDefault Title\n{{/block}}", &ctx);
        assert_eq!(out.trim(), "Default Title");
    }

    #[test]
    fn block_reuses_a_defined_partial() {
        let mut ctx = Context::new();
        add_inheritance_lambdas(&mut ctx);
        let template = "{{#partial}}title\nVendor Title\n{{/partial}}{{#block}}title\nDefault Title\n{{/block}}";
        assert_eq!(render(template, &ctx).trim(), "Vendor Title");
    }

    #[test]
    fn nested_sections_of_the_same_name_close_correctly() {
        let mut inner_item = Context::new();
        inner_item.set_text("v", "leaf");
        let mut item = Context::new();
        item.set_list("items", vec![inner_item]);
        let mut ctx = Context::new();
        ctx.set_list("items", vec![item]);
        assert_eq!(
            render("{{#items}}<{{#items}}{{v}}{{/items}}>{{/items}}", &ctx),
            "<leaf>"
        );
    }

    #[test]
    fn template_dir_resolution_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        assert!(find_template_dir(root, "vendor").is_err());

        std::fs::write(root.join("main.html"), "x").unwrap();
        assert_eq!(find_template_dir(root, "vendor").unwrap(), root);

        std::fs::create_dir(root.join("default")).unwrap();
        assert_eq!(find_template_dir(root, "vendor").unwrap(), root.join("default"));

        std::fs::create_dir(root.join("vendor")).unwrap();
        assert_eq!(find_template_dir(root, "vendor").unwrap(), root.join("vendor"));
    }
}
