//! Package index access for one archive.
//!
//! For a (suite, section, arch) slice this resolves the `Packages` index,
//! builds [`Package`] records and correlates translated long descriptions
//! from the suite's `Translation-*` files. Loaded slices are cached; change
//! detection against the persistent store decides whether a slice needs
//! reprocessing at all.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::UNIX_EPOCH;

use anyhow::Result;
use regex::Regex;
use serde_json::{Value, json};

use crate::fetcher::Fetcher;
use crate::package::Package;
use crate::store::DataStore;
use crate::tagfile::TagFileReader;
use crate::utils;

fn translation_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Translation-(\w+)").unwrap())
}

pub struct PackageIndex {
    root: String,
    tmp_dir: PathBuf,
    fetcher: Fetcher,
    /// Loaded package slices, keyed by `suite/section/arch`.
    pkg_cache: Mutex<HashMap<String, Arc<Vec<Package>>>>,
    /// Index mtimes observed this run, keyed by resolved index path.
    mtime_cache: Mutex<HashMap<String, i64>>,
}

impl PackageIndex {
    pub fn new(root: &str, tmp_dir: &std::path::Path, fetcher: Fetcher) -> Self {
        Self {
            root: root.to_string(),
            tmp_dir: tmp_dir.to_path_buf(),
            fetcher,
            pkg_cache: Mutex::new(HashMap::new()),
            mtime_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Packages of one slice. The first access loads and caches; later
    /// accesses return the cached slice.
    pub fn packages_for(&self, suite: &str, section: &str, arch: &str) -> Arc<Vec<Package>> {
        let key = format!("{suite}/{section}/{arch}");
        let mut cache = self.pkg_cache.lock().unwrap();
        if let Some(pkgs) = cache.get(&key) {
            return Arc::clone(pkgs);
        }
        let pkgs = Arc::new(self.load_packages(suite, section, arch));
        cache.insert(key, Arc::clone(&pkgs));
        pkgs
    }

    /// Drop all cached state.
    pub fn release(&self) {
        self.pkg_cache.lock().unwrap().clear();
        self.mtime_cache.lock().unwrap().clear();
    }

    /// Languages with translated descriptions in this suite, in first-seen
    /// order. Falls back to English when the release manifest is missing or
    /// unreadable.
    pub fn find_translations(&self, suite: &str, _section: &str) -> Vec<String> {
        let scan = || -> Result<Vec<String>> {
            let path = self.fetcher.fetch_plain(
                &self.root,
                &self.tmp_dir,
                &format!("dists/{suite}/InRelease"),
            )?;
            let content = fs::read_to_string(path)?;
            let mut langs: Vec<String> = Vec::new();
            for caps in translation_pattern().captures_iter(&content) {
                let code = &caps[1];
                if !langs.iter().any(|l| l == code) {
                    langs.push(code.to_string());
                }
            }
            Ok(langs)
        };

        match scan() {
            Ok(langs) => langs,
            Err(err) => {
                utils::warn(&format!(
                    "could not scan release manifest of {suite} for translations: {err}"
                ));
                vec!["en".to_string()]
            }
        }
    }

    fn index_path(&self, suite: &str, section: &str, arch: &str) -> Result<PathBuf> {
        self.fetcher.fetch(
            &self.root,
            &self.tmp_dir,
            &format!("dists/{suite}/{section}/binary-{arch}/Packages{{fmt}}"),
        )
    }

    fn load_packages(&self, suite: &str, section: &str, arch: &str) -> Vec<Package> {
        let index = match self.index_path(suite, section, arch) {
            Ok(path) => path,
            Err(err) => {
                utils::warn(&format!(
                    "no package index for {suite}/{section}/{arch}: {err}"
                ));
                return Vec::new();
            }
        };
        let mut tf = match TagFileReader::open(&index) {
            Ok(tf) => tf,
            Err(err) => {
                utils::warn(&format!(
                    "unreadable package index {}: {err}",
                    index.display()
                ));
                return Vec::new();
            }
        };

        let mut pkgs = Vec::new();
        loop {
            if let Some(name) = tf.field("Package") {
                let mut pkg = Package::new(name, tf.field("Version").unwrap_or(""), arch);
                pkg.filename = tf.field("Filename").unwrap_or("").to_string();
                pkg.maintainer = tf.field("Maintainer").unwrap_or("").to_string();
                if pkg.is_valid() {
                    pkgs.push(pkg);
                } else {
                    utils::warn(&format!(
                        "dropping invalid package entry {:?} in {suite}/{section}/{arch}",
                        pkg.name
                    ));
                }
            }
            if !tf.next_section() {
                break;
            }
        }

        self.load_long_descriptions(suite, section, &mut pkgs);
        pkgs
    }

    /// Correlate translated long descriptions with their packages.
    fn load_long_descriptions(&self, suite: &str, section: &str, pkgs: &mut [Package]) {
        let langs = self.find_translations(suite, section);
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (i, pkg) in pkgs.iter().enumerate() {
            by_name.entry(pkg.name.clone()).or_insert(i);
        }

        for lang in &langs {
            let rel = format!("dists/{suite}/{section}/i18n/Translation-{lang}{{fmt}}");
            let path = match self.fetcher.fetch(&self.root, &self.tmp_dir, &rel) {
                Ok(path) => path,
                // Translation files are optional.
                Err(_) => continue,
            };
            let mut tf = match TagFileReader::open(&path) {
                Ok(tf) => tf,
                Err(err) => {
                    utils::warn(&format!("unreadable translation file {}: {err}", path.display()));
                    continue;
                }
            };

            let desc_field = format!("Description-{lang}");
            loop {
                if let (Some(name), Some(raw)) = (tf.field("Package"), tf.field(&desc_field))
                    && let Some(&i) = by_name.get(name)
                {
                    let rendered = render_description(raw);
                    pkgs[i].set_description(lang, &rendered);
                    if lang == "en" {
                        pkgs[i].set_description("C", &rendered);
                    }
                }
                if !tf.next_section() {
                    break;
                }
            }
        }
    }

    /// Whether the slice's index changed since the last recorded run.
    ///
    /// True when the index is absent, when no timestamp was recorded before,
    /// or when the timestamps differ. The fresh timestamp is written back in
    /// every case, including when nothing changed.
    pub fn has_changes(
        &self,
        store: &dyn DataStore,
        suite: &str,
        section: &str,
        arch: &str,
    ) -> Result<bool> {
        let Ok(index) = self.index_path(suite, section, arch) else {
            return Ok(true);
        };

        let key = index.display().to_string();
        let mtime = {
            let mut cache = self.mtime_cache.lock().unwrap();
            match cache.get(&key) {
                Some(&mtime) => mtime,
                None => {
                    let Some(mtime) = file_mtime(&index) else {
                        return Ok(true);
                    };
                    cache.insert(key, mtime);
                    mtime
                }
            }
        };

        let previous = store
            .get_repo_info(suite, section, arch)
            .and_then(|info| info.get("mtime").and_then(Value::as_i64));
        let changed = previous != Some(mtime);
        store.set_repo_info(suite, section, arch, json!({ "mtime": mtime }))?;
        Ok(changed)
    }
}

fn file_mtime(path: &std::path::Path) -> Option<i64> {
    let modified = fs::metadata(path).and_then(|md| md.modified()).ok()?;
    Some(modified.duration_since(UNIX_EPOCH).ok()?.as_secs() as i64)
}

/// Fold a raw tag-file description into rendered paragraphs.
///
/// The first line is the short summary and is discarded. A line of `.`
/// starts a new paragraph; contiguous lines are joined with single spaces.
/// Each paragraph is XML-escaped and wrapped in `<p>` tags.
pub fn render_description(raw: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in raw.lines().skip(1) {
        let line = line.trim();
        if line == "." {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else if !line.is_empty() {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs
        .iter()
        .map(|p| format!("<p>{}</p>", utils::escape_xml(p)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fetcher::NoDownloader;
    use crate::store::MemoryStore;

    fn write_fixture(root: &std::path::Path) {
        let dists = root.join("dists/sid/main/binary-amd64");
        fs::create_dir_all(&dists).unwrap();
        fs::write(
            dists.join("Packages"),
            "Package: foobar\n\
Version: 1.0-1\n\
Filename: pool/main/f/foobar/foobar_1.0-1_amd64.deb\n\
Maintainer: Jane Doe <jane@example.org>\n\
\n\
Package: broken\n\
Version: 0.1\n\
\n\
Package: bazqux\n\
Version: 2.2-3\n\
Filename: pool/main/b/bazqux/bazqux_2.2-3_amd64.deb\n\
Maintainer: John Roe <john@example.org>\n",
        )
        .unwrap();

        fs::write(
            root.join("dists/sid/InRelease"),
            " aabb 1234 main/i18n/Translation-en.bz2\n\
 ccdd 5678 main/i18n/Translation-de.bz2\n\
 eeff 9012 main/i18n/Translation-de.xz\n\
 0011 3456 main/i18n/Translation-fr.bz2\n",
        )
        .unwrap();

        let i18n = root.join("dists/sid/main/i18n");
        fs::create_dir_all(&i18n).unwrap();
        fs::write(
            i18n.join("Translation-en"),
            "Package: foobar\nDescription-en: a short summary\n first paragraph line 1\n first paragraph line 2\n .\n second paragraph\n",
        )
        .unwrap();
        fs::write(
            i18n.join("Translation-de"),
            "Package: foobar\nDescription-de: kurze Zusammenfassung\n erster Absatz\n",
        )
        .unwrap();
    }

    fn index_for(root: &std::path::Path) -> PackageIndex {
        PackageIndex::new(
            root.to_str().unwrap(),
            root,
            Fetcher::new(Box::new(NoDownloader)),
        )
    }

    #[test]
    fn translations_preserve_first_seen_order_and_dedup() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let index = index_for(dir.path());
        assert_eq!(index.find_translations("sid", "main"), vec!["en", "de", "fr"]);
    }

    #[test]
    fn translations_default_to_english_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_for(dir.path());
        assert_eq!(index.find_translations("nosuite", "main"), vec!["en"]);
    }

    #[test]
    fn packages_load_with_descriptions() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let index = index_for(dir.path());

        let pkgs = index.packages_for("sid", "main", "amd64");
        assert_eq!(pkgs.len(), 2);

        let foobar = pkgs.iter().find(|p| p.name == "foobar").unwrap();
        assert_eq!(foobar.maintainer, "Jane Doe <jane@example.org>");
        assert_eq!(
            foobar.description("en"),
            Some(
                "<p>first paragraph line 1 first paragraph line 2</p>\n<p>second paragraph</p>"
            )
        );
        assert_eq!(foobar.description("C"), foobar.description("en"));
        assert_eq!(foobar.description("de"), Some("<p>erster Absatz</p>"));
    }

    #[test]
    fn slices_are_cached_until_release() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let index = index_for(dir.path());

        let first = index.packages_for("sid", "main", "amd64");
        let second = index.packages_for("sid", "main", "amd64");
        assert!(Arc::ptr_eq(&first, &second));

        index.release();
        let third = index.packages_for("sid", "main", "amd64");
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn missing_index_yields_an_empty_slice() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_for(dir.path());
        assert!(index.packages_for("sid", "main", "amd64").is_empty());
    }

    #[test]
    fn has_changes_is_true_then_false_without_mtime_change() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let index = index_for(dir.path());
        let store = MemoryStore::new();

        assert!(index.has_changes(&store, "sid", "main", "amd64").unwrap());
        assert!(!index.has_changes(&store, "sid", "main", "amd64").unwrap());
    }

    #[test]
    fn has_changes_detects_a_different_recorded_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let index = index_for(dir.path());
        let store = MemoryStore::new();
        store.set_repo_info("sid", "main", "amd64", json!({"mtime": 1})).unwrap();

        assert!(index.has_changes(&store, "sid", "main", "amd64").unwrap());
    }

    #[test]
    fn has_changes_is_true_for_a_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_for(dir.path());
        let store = MemoryStore::new();
        assert!(index.has_changes(&store, "sid", "main", "amd64").unwrap());
    }

    #[test]
    fn description_paragraph_folding() {
        let raw = "short\nfirst paragraph line 1\nfirst paragraph line 2\n.\nsecond paragraph";
        assert_eq!(
            render_description(raw),
            "<p>first paragraph line 1 first paragraph line 2</p>\n<p>second paragraph</p>"
        );
    }

    #[test]
    fn description_escapes_markup() {
        let raw = "short\nuses <b> & friends";
        assert_eq!(render_description(raw), "<p>uses &lt;b&gt; &amp; friends</p>");
    }
}
