//! The batch driver: walks the configured slices, fans package processing
//! out over a worker pool and hands the results to the report generator.
//!
//! A package is the unit of parallelism. Parsing and hint collection happen
//! on the worker's stack inside a [`GeneratorResult`]; the persisted hint
//! blobs are written back sequentially after each parallel section, so the
//! store never sees concurrent writers from one slice.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rayon::prelude::*;
use serde_json::Value;
use walkdir::WalkDir;

use crate::config::Config;
use crate::fetcher::{Downloader, Fetcher};
use crate::hints::HintRegistry;
use crate::index::PackageIndex;
use crate::package::Package;
use crate::parsers::{TranslationHook, parse_desktop_file};
use crate::report::{ReportGenerator, TemplateEngine};
use crate::result::GeneratorResult;
use crate::stats::{PlaceholderMetadataCounter, StatsStore};
use crate::store::DataStore;
use crate::utils;

/// Source of the desktop entries a package ships.
///
/// Unpacking binary packages is a backend concern; the pipeline only needs
/// `(basename, contents)` pairs per package.
pub trait PayloadSource: Sync {
    fn desktop_files(&self, pkg: &Package) -> Result<Vec<(String, String)>>;
}

/// Payload source over unpacked package trees: resolves each package's
/// `Filename` against a root directory and collects the `.desktop` files
/// found below it. Packages without an unpacked tree yield no files.
pub struct DirPayload {
    root: PathBuf,
}

impl DirPayload {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl PayloadSource for DirPayload {
    fn desktop_files(&self, pkg: &Package) -> Result<Vec<(String, String)>> {
        let tree = self.root.join(&pkg.filename);
        if !tree.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&tree).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "desktop") {
                continue;
            }
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            match fs::read_to_string(path) {
                Ok(contents) => files.push((name, contents)),
                Err(err) => {
                    utils::warn(&format!("unreadable desktop file {}: {err}", path.display()));
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Outcome counters of one `run` invocation.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub slices_processed: usize,
    pub slices_skipped: usize,
    pub packages_processed: usize,
    pub total_infos: u64,
    pub total_warnings: u64,
    pub total_errors: u64,
}

pub struct Engine<'a> {
    conf: &'a Config,
    store: &'a dyn DataStore,
    payload: &'a dyn PayloadSource,
    hook: Option<&'a dyn TranslationHook>,
    index: PackageIndex,
    reports: ReportGenerator<'a>,
}

impl<'a> Engine<'a> {
    pub fn new(
        conf: &'a Config,
        store: &'a dyn DataStore,
        registry: &'a HintRegistry,
        template_engine: &'a dyn TemplateEngine,
        payload: &'a dyn PayloadSource,
        downloader: Box<dyn Downloader>,
        hook: Option<&'a dyn TranslationHook>,
    ) -> Result<Self> {
        let index = PackageIndex::new(&conf.archive_root, &conf.tmp_dir, Fetcher::new(downloader));
        let reports = ReportGenerator::new(conf, store, registry, template_engine)?;
        Ok(Self {
            conf,
            store,
            payload,
            hook,
            index,
            reports,
        })
    }

    /// Process all configured suites (or just `only_suite`). Slices whose
    /// index did not change since the recorded run are skipped unless
    /// `force` is set.
    pub fn run(&self, only_suite: Option<&str>, force: bool) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for suite in &self.conf.suites {
            if only_suite.is_some_and(|name| name != suite.name) {
                continue;
            }

            for section in &suite.sections {
                let mut changed = force;
                for arch in &suite.archs {
                    changed |= self.index.has_changes(self.store, &suite.name, section, arch)?;
                }
                if !changed {
                    summary.slices_skipped += suite.archs.len();
                    continue;
                }

                let mut section_pkgs: Vec<Package> = Vec::new();
                for arch in &suite.archs {
                    let pkgs = self.index.packages_for(&suite.name, section, arch);
                    summary.packages_processed += self.process_packages(&pkgs)?;
                    summary.slices_processed += 1;
                    section_pkgs.extend(pkgs.iter().cloned());
                }

                let data = self.reports.preprocess(&suite.name, section, &section_pkgs);
                StatsStore::new(self.store)
                    .add_statistics(&data, &PlaceholderMetadataCounter)?;
                self.reports.render_section_pages(&suite.name, section, &data)?;

                summary.total_infos += data.total_infos;
                summary.total_warnings += data.total_warnings;
                summary.total_errors += data.total_errors;
            }

            self.index.release();
        }

        self.reports.render_main_index()?;
        Ok(summary)
    }

    /// Fan one slice's packages out over the worker pool, then merge the
    /// resulting hint blobs into the store sequentially.
    fn process_packages(&self, pkgs: &[Package]) -> Result<usize> {
        let blobs: Vec<(String, Value)> = pkgs
            .par_iter()
            .filter_map(|pkg| self.process_package(pkg))
            .collect();

        for (pkid, blob) in blobs {
            self.store.set_hints(&pkid, blob)?;
        }
        Ok(pkgs.len())
    }

    /// Everything here is confined to the worker: failures become hints or
    /// warnings, never errors that cross the package boundary.
    fn process_package(&self, pkg: &Package) -> Option<(String, Value)> {
        let mut res = GeneratorResult::new(pkg);

        let files = match self.payload.desktop_files(pkg) {
            Ok(files) => files,
            Err(err) => {
                utils::warn(&format!("could not read payload of {}: {err}", pkg.pkid()));
                Vec::new()
            }
        };

        for (name, contents) in &files {
            parse_desktop_file(
                &mut res,
                name,
                contents,
                false,
                self.conf.format_version,
                self.hook,
            );
        }

        if res.has_hints() {
            Some((pkg.pkid(), res.hints_json()))
        } else {
            None
        }
    }
}
