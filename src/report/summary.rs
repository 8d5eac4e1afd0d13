//! Hint aggregation and HTML report rendering.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde_json::Value;

use crate::config::Config;
use crate::hints::{HintRegistry, Severity};
use crate::package::Package;
use crate::report::templates::{
    Context, TemplateEngine, add_inheritance_lambdas, find_template_dir,
};
use crate::store::DataStore;
use crate::utils;

/// Per-package hint counters, grouped under the package's maintainer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PkgSummary {
    pub pkgname: String,
    pub maintainer: String,
    pub info_count: u64,
    pub warning_count: u64,
    pub error_count: u64,
}

/// Rendered hints of one component, partitioned by severity.
#[derive(Debug, Clone, Default)]
pub struct HintEntry {
    pub cid: String,
    pub archs: BTreeSet<String>,
    /// `(tag, rendered message)` pairs in raise order.
    pub infos: Vec<(String, String)>,
    pub warnings: Vec<(String, String)>,
    pub errors: Vec<(String, String)>,
}

/// Everything the report pages of one (suite, section) need.
#[derive(Debug, Default)]
pub struct DataSummary {
    pub suite: String,
    pub section: String,
    /// maintainer → package summaries, in package-name order.
    pub pkg_summaries: BTreeMap<String, Vec<PkgSummary>>,
    /// pkgname → component id → entry.
    pub hint_entries: BTreeMap<String, BTreeMap<String, HintEntry>>,
    pub total_infos: u64,
    pub total_warnings: u64,
    pub total_errors: u64,
}

pub struct ReportGenerator<'a> {
    conf: &'a Config,
    store: &'a dyn DataStore,
    registry: &'a HintRegistry,
    engine: &'a dyn TemplateEngine,
    template_dir: std::path::PathBuf,
}

impl<'a> ReportGenerator<'a> {
    /// Fails when no usable template directory exists; HTML rendering is a
    /// hard requirement of the pipeline.
    pub fn new(
        conf: &'a Config,
        store: &'a dyn DataStore,
        registry: &'a HintRegistry,
        engine: &'a dyn TemplateEngine,
    ) -> Result<Self> {
        let template_dir = find_template_dir(&conf.template_root, &conf.project_name)?;
        Ok(Self {
            conf,
            store,
            registry,
            engine,
            template_dir,
        })
    }

    /// Fold the persisted hints of `packages` into a [`DataSummary`].
    pub fn preprocess(&self, suite: &str, section: &str, packages: &[Package]) -> DataSummary {
        let mut summary = DataSummary {
            suite: suite.to_string(),
            section: section.to_string(),
            ..Default::default()
        };
        let mut per_pkg: BTreeMap<String, PkgSummary> = BTreeMap::new();

        for pkg in packages {
            // Every package gets a summary, hints or not; a maintainer with
            // only clean packages still shows up in the report.
            per_pkg.entry(pkg.name.clone()).or_insert_with(|| PkgSummary {
                pkgname: pkg.name.clone(),
                maintainer: pkg.maintainer.clone(),
                ..Default::default()
            });

            let Some(blob) = self.store.get_hints(&pkg.pkid()) else {
                continue;
            };
            let Some(by_component) = blob.as_object() else {
                utils::warn(&format!("malformed hints blob for {}", pkg.pkid()));
                continue;
            };

            for (cid, raw_hints) in by_component {
                let entry = summary
                    .hint_entries
                    .entry(pkg.name.clone())
                    .or_default()
                    .entry(cid.clone())
                    .or_insert_with(|| HintEntry {
                        cid: cid.clone(),
                        ..Default::default()
                    });
                entry.archs.insert(pkg.arch.clone());

                let pkg_summary = per_pkg.entry(pkg.name.clone()).or_insert_with(|| PkgSummary {
                    pkgname: pkg.name.clone(),
                    maintainer: pkg.maintainer.clone(),
                    ..Default::default()
                });

                for raw in raw_hints.as_array().map(Vec::as_slice).unwrap_or(&[]) {
                    let Some(tag) = raw.get("tag").and_then(Value::as_str) else {
                        continue;
                    };
                    let vars: BTreeMap<String, String> = raw
                        .get("vars")
                        .and_then(Value::as_object)
                        .map(|obj| {
                            obj.iter()
                                .filter_map(|(k, v)| {
                                    v.as_str().map(|s| (k.clone(), s.to_string()))
                                })
                                .collect()
                        })
                        .unwrap_or_default();

                    let Some(severity) = self.registry.severity(tag) else {
                        utils::error(&format!(
                            "hint tag {tag:?} on {}/{cid} is not registered, dropping it",
                            pkg.name
                        ));
                        continue;
                    };
                    let message = self.registry.render(tag, &vars).unwrap_or_default();
                    let pair = (tag.to_string(), message);

                    // The same hint may arrive through several architectures.
                    let bucket = match severity {
                        Severity::Info => &mut entry.infos,
                        Severity::Warning => &mut entry.warnings,
                        Severity::Error => &mut entry.errors,
                    };
                    if bucket.contains(&pair) {
                        continue;
                    }
                    bucket.push(pair);

                    match severity {
                        Severity::Info => {
                            pkg_summary.info_count += 1;
                            summary.total_infos += 1;
                        }
                        Severity::Warning => {
                            pkg_summary.warning_count += 1;
                            summary.total_warnings += 1;
                        }
                        Severity::Error => {
                            pkg_summary.error_count += 1;
                            summary.total_errors += 1;
                        }
                    }
                }
            }
        }

        for (_, pkg_summary) in per_pkg {
            summary
                .pkg_summaries
                .entry(pkg_summary.maintainer.clone())
                .or_default()
                .push(pkg_summary);
        }

        summary
    }

    /// Render the per-package issue pages and the section overview.
    pub fn render_section_pages(
        &self,
        suite: &str,
        section: &str,
        summary: &DataSummary,
    ) -> Result<()> {
        let export = self.conf.html_export_dir();

        for (pkgname, components) in &summary.hint_entries {
            let mut ctx = self.page_context();
            ctx.set_text("pkgname", pkgname);
            ctx.set_text("suite", suite);
            ctx.set_text("section", section);

            let entries = components.values().map(component_context).collect();
            ctx.set_list("entries", entries);

            self.render_page(
                "issues_page",
                &export.join(suite).join(section).join("issues").join(format!("{pkgname}.html")),
                ctx,
            )?;
        }

        let mut ctx = self.page_context();
        ctx.set_text("suite", suite);
        ctx.set_text("section", section);
        ctx.set_text("total_infos", summary.total_infos.to_string());
        ctx.set_text("total_warnings", summary.total_warnings.to_string());
        ctx.set_text("total_errors", summary.total_errors.to_string());

        let maintainers = summary
            .pkg_summaries
            .iter()
            .map(|(maintainer, pkgs)| {
                let mut mctx = Context::new();
                mctx.set_text("maintainer", maintainer);
                mctx.set_list("packages", pkgs.iter().map(pkg_summary_context).collect());
                mctx
            })
            .collect();
        ctx.set_list("maintainers", maintainers);

        self.render_page(
            "section_overview",
            &export.join(suite).join(section).join("index.html"),
            ctx,
        )
    }

    /// Render the main index listing all configured suites.
    pub fn render_main_index(&self) -> Result<()> {
        let mut ctx = self.page_context();
        let suites = self
            .conf
            .suites
            .iter()
            .map(|suite| {
                let mut sctx = Context::new();
                sctx.set_text("suite", &suite.name);
                let sections = suite
                    .sections
                    .iter()
                    .map(|section| {
                        let mut secctx = Context::new();
                        secctx.set_text("section", section);
                        secctx
                    })
                    .collect();
                sctx.set_list("sections", sections);
                sctx
            })
            .collect();
        ctx.set_list("suites", suites);

        self.render_page("main", &self.conf.html_export_dir().join("index.html"), ctx)
    }

    fn page_context(&self) -> Context {
        let mut ctx = Context::new();
        ctx.set_text("root_url", &self.conf.html_base_url);
        ctx
    }

    fn render_page(&self, template_name: &str, out_path: &Path, mut ctx: Context) -> Result<()> {
        let template_path = self.template_dir.join(format!("{template_name}.html"));
        let template = fs::read_to_string(&template_path)
            .with_context(|| format!("failed to read template {}", template_path.display()))?;

        add_inheritance_lambdas(&mut ctx);
        let html = self.engine.render(&template, &ctx);

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(out_path, html)
            .with_context(|| format!("failed to write {}", out_path.display()))
    }
}

fn component_context(entry: &HintEntry) -> Context {
    let mut ctx = Context::new();
    ctx.set_text("cid", &entry.cid);
    ctx.set_text(
        "architectures",
        entry.archs.iter().cloned().collect::<Vec<_>>().join(", "),
    );

    let hint_list = |pairs: &[(String, String)]| {
        pairs
            .iter()
            .map(|(tag, message)| {
                let mut hctx = Context::new();
                hctx.set_text("tag", tag);
                hctx.set_text("message", message);
                hctx
            })
            .collect::<Vec<_>>()
    };

    if !entry.errors.is_empty() {
        ctx.set_flag("has_errors");
        ctx.set_list("errors", hint_list(&entry.errors));
    }
    if !entry.warnings.is_empty() {
        ctx.set_flag("has_warnings");
        ctx.set_list("warnings", hint_list(&entry.warnings));
    }
    if !entry.infos.is_empty() {
        ctx.set_flag("has_infos");
        ctx.set_list("infos", hint_list(&entry.infos));
    }
    ctx
}

fn pkg_summary_context(pkg: &PkgSummary) -> Context {
    let mut ctx = Context::new();
    ctx.set_text("pkgname", &pkg.pkgname);
    ctx.set_text("info_count", pkg.info_count.to_string());
    ctx.set_text("warning_count", pkg.warning_count.to_string());
    ctx.set_text("error_count", pkg.error_count.to_string());
    if pkg.error_count > 0 {
        ctx.set_flag("has_error_count");
    }
    if pkg.warning_count > 0 {
        ctx.set_flag("has_warning_count");
    }
    if pkg.info_count > 0 {
        ctx.set_flag("has_info_count");
    }
    ctx
}
