//! Desktop-entry parser.
//!
//! Turns one `.desktop` file into a [`Component`] attached to the package's
//! [`GeneratorResult`]. The parser is deliberately forgiving: anything that
//! prevents extraction becomes a hint against the file, never an error that
//! crosses the package boundary.

use std::collections::{BTreeMap, HashMap};

use crate::component::{Component, Icon, KIND_DESKTOP_APP, PROVIDED_MIMETYPE};
use crate::config::FormatVersion;
use crate::hints::HintSubject;
use crate::locale::split_localized_key;
use crate::parsers::categories;
use crate::result::GeneratorResult;

/// Replacement for control characters found in desktop-entry values.
const BAD_CHAR_MARKER: &str = "#?#";

/// First path segments of reverse-DNS style desktop-file names.
const TOP_LEVEL_DOMAINS: &[&str] = &[
    "at", "au", "be", "br", "ca", "ch", "cn", "co", "com", "cz", "de", "dev", "edu", "es", "eu",
    "fi", "fr", "gov", "hu", "ie", "in", "info", "int", "io", "it", "jp", "me", "mil", "net",
    "nl", "no", "org", "pl", "ru", "se", "sh", "so", "uk", "us",
];

/// Backend hook supplying extra translations for a base value, e.g. from
/// distribution language packs. Explicitly parsed locales always win over
/// hook-supplied ones.
pub trait TranslationHook: Sync {
    fn translations(&self, key: &str, base_value: &str) -> HashMap<String, String>;
}

/// Parse one desktop-entry file and attach the resulting component to `res`.
///
/// Returns the component id, or `None` when the file was skipped. Skips are
/// silent except for unparsable files, which raise `desktop-file-error`.
pub fn parse_desktop_file(
    res: &mut GeneratorResult,
    fname: &str,
    contents: &str,
    ignore_nodisplay: bool,
    format_version: FormatVersion,
    hook: Option<&dyn TranslationHook>,
) -> Option<String> {
    let basename = fname.rsplit('/').next().unwrap_or(fname).to_string();

    let entries = match parse_desktop_group(contents) {
        Ok(entries) => entries,
        Err(msg) => {
            let mut vars = BTreeMap::new();
            vars.insert("msg".to_string(), msg);
            res.add_hint(HintSubject::File(basename), "desktop-file-error", vars);
            return None;
        }
    };

    let plain = |key: &str| {
        entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    if let Some(kind) = plain("Type")
        && !kind.eq_ignore_ascii_case("application")
    {
        return None;
    }
    if plain("NoDisplay").is_some_and(|v| v.eq_ignore_ascii_case("true")) && !ignore_nodisplay {
        return None;
    }
    if plain("X-AppStream-Ignore").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
        return None;
    }

    let cid = derive_component_id(&basename, format_version);
    let mut cpt = Component::new(&cid, KIND_DESKTOP_APP);

    for (key, raw_value) in &entries {
        let Some((base, locale)) = split_localized_key(key) else {
            continue;
        };
        let value = check_value(res, &basename, raw_value);

        match base {
            "Name" => cpt.set_name(&locale, &value),
            "Comment" => cpt.set_summary(&locale, &value),
            "Categories" => {
                for category in value.split(';').filter(|c| !c.is_empty()) {
                    if categories::is_blacklisted(category) {
                        continue;
                    }
                    if categories::is_valid_category(category) {
                        cpt.add_category(category);
                    } else {
                        let mut vars = BTreeMap::new();
                        vars.insert("category".to_string(), category.to_string());
                        res.add_hint(
                            HintSubject::File(basename.clone()),
                            "category-name-invalid",
                            vars,
                        );
                    }
                }
            }
            "Keywords" => {
                let mut words: Vec<String> = value.split(';').map(str::to_string).collect();
                if words.last().is_some_and(String::is_empty) {
                    words.pop();
                }
                cpt.set_keywords(&locale, words);
            }
            "MimeType" => {
                for mime in value.split(';').filter(|m| !m.is_empty()) {
                    cpt.add_provided(PROVIDED_MIMETYPE, mime);
                }
            }
            "Icon" => {
                // The real size is resolved later by the icon pipeline.
                cpt.add_icon(Icon {
                    kind: "cached".to_string(),
                    width: 1,
                    height: 1,
                    name: value.clone(),
                });
            }
            _ => {}
        }
    }

    if let Some(hook) = hook {
        if let Some(base_name) = cpt.name("C").map(str::to_string) {
            cpt.merge_names(hook.translations("Name", &base_name));
        }
        if let Some(base_summary) = cpt.summary("C").map(str::to_string) {
            cpt.merge_summaries(hook.translations("Comment", &base_summary));
        }
    }

    res.add_component(&basename, cpt);
    Some(cid)
}

/// Extract the key/value entries of the `[Desktop Entry]` group, preserving
/// file order. Fails with a message when the input is not a key-file grouped
/// under `[Desktop Entry]`.
fn parse_desktop_group(contents: &str) -> Result<Vec<(String, String)>, String> {
    let mut lines = contents
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'));

    match lines.next() {
        Some(header) if header.trim() == "[Desktop Entry]" => {}
        Some(other) => return Err(format!("file does not start with a [Desktop Entry] group (found {other:?})")),
        None => return Err("file is empty".to_string()),
    }

    let mut entries = Vec::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            // Another group begins; only [Desktop Entry] is relevant.
            break;
        }
        match trimmed.split_once('=') {
            Some((key, value)) => entries.push((key.trim().to_string(), value.trim().to_string())),
            None => return Err(format!("invalid key-file line: {trimmed:?}")),
        }
    }
    Ok(entries)
}

/// Sanitize a raw value and raise a hint for suspicious quoting.
///
/// Control characters are replaced with a visible marker; values wrapped in
/// matching quotes are reported but retained verbatim.
fn check_value(res: &mut GeneratorResult, basename: &str, raw: &str) -> String {
    let value = sanitize_value(raw);
    if is_quoted(&value) {
        let mut vars = BTreeMap::new();
        vars.insert("value".to_string(), value.clone());
        res.add_hint(
            HintSubject::File(basename.to_string()),
            "metainfo-quoted-value",
            vars,
        );
    }
    value
}

fn sanitize_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\x00' | '\x08' | '\x0B' | '\x0C' | '\x0E'..='\x1F' => out.push_str(BAD_CHAR_MARKER),
            _ => out.push(c),
        }
    }
    out
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
}

/// Derive the component id from the file basename.
///
/// Since format version 0.10, reverse-DNS style names lose their `.desktop`
/// suffix; everything else keeps the full basename as its id.
fn derive_component_id(basename: &str, format_version: FormatVersion) -> String {
    let stem = basename.strip_suffix(".desktop").unwrap_or(basename);
    if format_version >= FormatVersion::REVERSE_DNS_CUTOFF {
        let first = stem.split('.').next().unwrap_or("");
        if TOP_LEVEL_DOMAINS.contains(&first.to_lowercase().as_str()) {
            return stem.to_string();
        }
    }
    basename.to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::package::Package;

    const SAMPLE: &str = "[Desktop Entry]\n\
Name=FooBar\n\
Name[de_DE]=FööBär\n\
Comment=A foo-ish bar.\n\
Keywords=Flubber;Test;Meh;\n\
Keywords[de_DE]=Goethe;Schiller;Kant;\n";

    fn pkg() -> Package {
        let mut p = Package::new("foobar", "1.0-1", "amd64");
        p.filename = "pool/main/f/foobar/foobar_1.0-1_amd64.deb".to_string();
        p
    }

    fn modern() -> FormatVersion {
        FormatVersion::REVERSE_DNS_CUTOFF
    }

    fn legacy() -> FormatVersion {
        FormatVersion::new(0, 8)
    }

    #[test]
    fn parses_a_basic_desktop_file() {
        let pkg = pkg();
        let mut res = GeneratorResult::new(&pkg);
        let cid = parse_desktop_file(&mut res, "foobar.desktop", SAMPLE, false, modern(), None);
        assert_eq!(cid.as_deref(), Some("foobar.desktop"));

        let cpt = res.component("foobar.desktop").unwrap();
        assert_eq!(cpt.name("C"), Some("FooBar"));
        assert_eq!(cpt.name("de_DE"), Some("FööBär"));
        assert_eq!(cpt.summary("C"), Some("A foo-ish bar."));
        assert_eq!(
            cpt.keywords("C").unwrap(),
            &["Flubber".to_string(), "Test".to_string(), "Meh".to_string()]
        );
        assert_eq!(
            cpt.keywords("de_DE").unwrap(),
            &["Goethe".to_string(), "Schiller".to_string(), "Kant".to_string()]
        );
    }

    #[test]
    fn reverse_dns_names_lose_the_desktop_suffix() {
        let pkg = pkg();
        let mut res = GeneratorResult::new(&pkg);
        let cid = parse_desktop_file(
            &mut res,
            "org.example.foobar.desktop",
            SAMPLE,
            false,
            modern(),
            None,
        );
        assert_eq!(cid.as_deref(), Some("org.example.foobar"));
    }

    #[test]
    fn legacy_format_keeps_the_full_basename() {
        let pkg = pkg();
        let mut res = GeneratorResult::new(&pkg);
        let cid = parse_desktop_file(
            &mut res,
            "org.example.foobar.desktop",
            SAMPLE,
            false,
            legacy(),
            None,
        );
        assert_eq!(cid.as_deref(), Some("org.example.foobar.desktop"));
    }

    #[test]
    fn nodisplay_skips_unless_overridden() {
        let contents = format!("{SAMPLE}NoDisplay=true\n");
        let pkg = pkg();

        let mut res = GeneratorResult::new(&pkg);
        assert_eq!(
            parse_desktop_file(&mut res, "foobar.desktop", &contents, false, modern(), None),
            None
        );

        let mut res = GeneratorResult::new(&pkg);
        assert!(
            parse_desktop_file(&mut res, "foobar.desktop", &contents, true, modern(), None)
                .is_some()
        );
    }

    #[test]
    fn non_application_types_are_skipped_silently() {
        let contents = "[Desktop Entry]\nType=Link\nName=SomeLink\n";
        let pkg = pkg();
        let mut res = GeneratorResult::new(&pkg);
        assert_eq!(
            parse_desktop_file(&mut res, "link.desktop", contents, false, modern(), None),
            None
        );
        assert!(!res.has_hints());
    }

    #[test]
    fn appstream_ignore_is_honored() {
        let contents = format!("{SAMPLE}X-AppStream-Ignore=true\n");
        let pkg = pkg();
        let mut res = GeneratorResult::new(&pkg);
        assert_eq!(
            parse_desktop_file(&mut res, "foobar.desktop", &contents, false, modern(), None),
            None
        );
    }

    #[test]
    fn categories_are_filtered_and_invalid_ones_reported() {
        let contents = "[Desktop Entry]\nName=App\nCategories=Network;X-Foo;GUI;NotARealCategory;\n";
        let pkg = pkg();
        let mut res = GeneratorResult::new(&pkg);
        parse_desktop_file(&mut res, "app.desktop", contents, false, modern(), None).unwrap();

        let cpt = res.component("app.desktop").unwrap();
        assert_eq!(cpt.categories().iter().collect::<Vec<_>>(), vec!["Network"]);

        let hints = res.hints();
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].1.tag, "category-name-invalid");
        assert_eq!(hints[0].1.vars.get("category").unwrap(), "NotARealCategory");
    }

    #[test]
    fn broken_files_raise_a_desktop_file_error() {
        let pkg = pkg();
        let mut res = GeneratorResult::new(&pkg);
        assert_eq!(
            parse_desktop_file(&mut res, "broken.desktop", "Name=NoHeader\n", false, modern(), None),
            None
        );
        assert_eq!(res.hints().len(), 1);
        assert_eq!(res.hints()[0].1.tag, "desktop-file-error");
        assert_eq!(res.hints()[0].0, HintSubject::File("broken.desktop".to_string()));
    }

    #[test]
    fn control_characters_are_replaced() {
        let contents = "[Desktop Entry]\nName=Fo\x0Bo\n";
        let pkg = pkg();
        let mut res = GeneratorResult::new(&pkg);
        parse_desktop_file(&mut res, "foo.desktop", contents, false, modern(), None).unwrap();
        assert_eq!(res.component("foo.desktop").unwrap().name("C"), Some("Fo#?#o"));
    }

    #[test]
    fn quoted_values_are_reported_but_kept() {
        let contents = "[Desktop Entry]\nName=\"FooBar\"\n";
        let pkg = pkg();
        let mut res = GeneratorResult::new(&pkg);
        parse_desktop_file(&mut res, "foo.desktop", contents, false, modern(), None).unwrap();

        assert_eq!(res.component("foo.desktop").unwrap().name("C"), Some("\"FooBar\""));
        assert_eq!(res.hints()[0].1.tag, "metainfo-quoted-value");
    }

    #[test]
    fn mimetypes_and_icons_are_attached() {
        let contents = "[Desktop Entry]\nName=App\nMimeType=text/html;image/png;\nIcon=app-icon\n";
        let pkg = pkg();
        let mut res = GeneratorResult::new(&pkg);
        parse_desktop_file(&mut res, "app.desktop", contents, false, modern(), None).unwrap();

        let cpt = res.component("app.desktop").unwrap();
        assert_eq!(
            cpt.provided(PROVIDED_MIMETYPE).unwrap(),
            &["text/html".to_string(), "image/png".to_string()]
        );
        assert_eq!(cpt.icons().len(), 1);
        assert_eq!(cpt.icons()[0].kind, "cached");
        assert_eq!(cpt.icons()[0].name, "app-icon");
        assert_eq!((cpt.icons()[0].width, cpt.icons()[0].height), (1, 1));
    }

    #[test]
    fn hook_translations_merge_without_overriding() {
        struct FakeHook;
        impl TranslationHook for FakeHook {
            fn translations(&self, _key: &str, _base: &str) -> HashMap<String, String> {
                let mut map = HashMap::new();
                map.insert("de_DE".to_string(), "Langpack".to_string());
                map.insert("fr".to_string(), "Traduit".to_string());
                map
            }
        }

        let pkg = pkg();
        let mut res = GeneratorResult::new(&pkg);
        parse_desktop_file(&mut res, "foobar.desktop", SAMPLE, false, modern(), Some(&FakeHook))
            .unwrap();

        let cpt = res.component("foobar.desktop").unwrap();
        assert_eq!(cpt.name("de_DE"), Some("FööBär"));
        assert_eq!(cpt.name("fr"), Some("Traduit"));
    }

    #[test]
    fn unknown_locale_keys_are_ignored() {
        let contents = "[Desktop Entry]\nName=App\nName[not a locale]=Nope\n";
        let pkg = pkg();
        let mut res = GeneratorResult::new(&pkg);
        parse_desktop_file(&mut res, "app.desktop", contents, false, modern(), None).unwrap();

        let cpt = res.component("app.desktop").unwrap();
        assert_eq!(cpt.name("C"), Some("App"));
        assert_eq!(cpt.name("not a locale"), None);
    }
}
