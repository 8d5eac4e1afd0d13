//! Locale tag extraction from desktop-entry key suffixes.
//!
//! Desktop entries localize values through bracketed key suffixes such as
//! `Name[de_DE.UTF-8]`. This module decodes those suffixes into plain locale
//! tags, with `"C"` reserved for the untranslated base value.

use std::sync::OnceLock;

use regex::Regex;

/// Locale tag for untranslated base values.
pub const BASE_LOCALE: &str = "C";

fn locale_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z]+(_[A-Za-z0-9]+)?(@[A-Za-z0-9]+)?$").unwrap()
    })
}

/// Check whether a tag looks like a usable locale: letters, an optional
/// `_REGION` part and an optional `@modifier`.
pub fn is_valid_locale(tag: &str) -> bool {
    locale_pattern().is_match(tag)
}

/// Extract the locale tag from a desktop-entry key.
///
/// Keys without a bracket suffix belong to the untranslated base and yield
/// `"C"`. Bracketed suffixes are normalized by dropping a trailing `.UTF-8`
/// and legacy `.iso*` encoding annotations. Returns `None` when the residue
/// is not a usable locale, which signals that the key should be ignored.
pub fn locale_from_key(key: &str) -> Option<String> {
    let Some(open) = key.find('[') else {
        return Some(BASE_LOCALE.to_string());
    };

    let rest = &key[open + 1..];
    let mut locale = match rest.find(']') {
        Some(close) => &rest[..close],
        None => rest,
    };

    if locale.len() >= 6 && locale[locale.len() - 6..].eq_ignore_ascii_case(".utf-8") {
        locale = &locale[..locale.len() - 6];
    }

    // Legacy encodings like `wa.iso885915@euro` carry an explicit charset
    // between the language and the modifier.
    let mut normalized = locale.to_string();
    if let Some(dot) = normalized.find('.') {
        let after = &normalized[dot + 1..];
        if after.to_lowercase().starts_with("iso") {
            let modifier = after.find('@').map(|at| after[at..].to_string());
            normalized.truncate(dot);
            if let Some(modifier) = modifier {
                normalized.push_str(&modifier);
            }
        }
    }

    if is_valid_locale(&normalized) {
        Some(normalized)
    } else {
        None
    }
}

/// Split a desktop-entry key into its base name and decoded locale.
///
/// `Name[de_DE]` becomes `("Name", "de_DE")`; `Name` becomes `("Name", "C")`.
pub fn split_localized_key(key: &str) -> Option<(&str, String)> {
    let base = match key.find('[') {
        Some(open) => &key[..open],
        None => key,
    };
    locale_from_key(key).map(|locale| (base, locale))
}
