//! Collision-free output file names.
//!
//! Output files live in a shared directory, so every name is checked
//! against what already exists there. Collisions are resolved by a
//! parenthesised counter: `base.json`, `base(1).json`, `base(2).json`, where
//! the counter is one more than the highest counter already present.
//!
//! These functions only compute names from a listing; the check-then-write
//! is not atomic across processes.

use chrono::{DateTime, Utc};

/// Timestamp fragment used in generated names (`20240131_235959`).
#[must_use]
pub fn timestamp_fragment(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Date fragment used for run base names (`20240131`).
#[must_use]
pub fn date_fragment(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d").to_string()
}

/// Parse the `(n)` counter of `name` if it has the shape `<stem>(n)<suffix>`.
fn counter_of(name: &str, stem: &str, suffix: &str) -> Option<u32> {
    name.strip_prefix(stem)?
        .strip_suffix(suffix)?
        .strip_prefix('(')?
        .strip_suffix(')')?
        .parse()
        .ok()
}

/// Highest `(n)` counter among names shaped `<stem>(n)<suffix>`, or 0.
fn max_counter<S: AsRef<str>>(existing: &[S], stem: &str, suffix: &str) -> u32 {
    existing
        .iter()
        .filter_map(|name| counter_of(name.as_ref(), stem, suffix))
        .max()
        .unwrap_or(0)
}

/// First free file name for `<stem>.<extension>`.
#[must_use]
pub fn unique_file_name<S: AsRef<str>>(existing: &[S], stem: &str, extension: &str) -> String {
    let suffix = format!(".{extension}");
    let plain = format!("{stem}{suffix}");
    if !existing.iter().any(|name| name.as_ref() == plain) {
        return plain;
    }
    let next = max_counter(existing, stem, &suffix) + 1;
    format!("{stem}({next}){suffix}")
}

/// First free run base name derived from `base`.
///
/// A base is taken when any file starts with `<base>_` (pages, consolidated
/// output, reports). Taken bases get a counter: `<base>(1)`, `<base>(2)`.
#[must_use]
pub fn unique_run_base<S: AsRef<str>>(existing: &[S], base: &str) -> String {
    let in_use = |candidate: &str| {
        let prefix = format!("{candidate}_");
        existing.iter().any(|name| name.as_ref().starts_with(&prefix))
    };
    if !in_use(base) {
        return base.to_string();
    }
    let next = existing
        .iter()
        .filter_map(|name| {
            let rest = name.as_ref().strip_prefix(base)?.strip_prefix('(')?;
            let (digits, _) = rest.split_once(')')?;
            digits.parse::<u32>().ok()
        })
        .max()
        .unwrap_or(0)
        + 1;
    format!("{base}({next})")
}

/// Name of one page file: `<base>_<page>.json`.
#[must_use]
pub fn page_file_name(base: &str, page: u64) -> String {
    format!("{base}_{page}.json")
}

/// Page number of `name` if it is a page file of `base`.
#[must_use]
pub fn page_number(base: &str, name: &str) -> Option<u64> {
    let digits = name.strip_prefix(base)?.strip_prefix('_')?.strip_suffix(".json")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Archive name for an input file: timestamp appended to the stem.
#[must_use]
pub fn archived_file_name(file_name: &str, at: DateTime<Utc>) -> String {
    let stamp = timestamp_fragment(at);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{stamp}.{ext}"),
        _ => format!("{file_name}_{stamp}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unique_file_name_free() {
        let existing: [&str; 0] = [];
        assert_eq!(unique_file_name(&existing, "base", "json"), "base.json");
    }

    #[test]
    fn test_unique_file_name_counter_is_max_plus_one() {
        let existing = ["base.json", "base(1).json", "base(4).json", "base(2).csv", "other(9).json"];
        assert_eq!(unique_file_name(&existing, "base", "json"), "base(5).json");
        assert_eq!(unique_file_name(&["base.json"], "base", "json"), "base(1).json");
    }

    #[test]
    fn test_unique_run_base() {
        let existing = ["profiles_20240101_1.json", "profiles_20240101(2)_consolidated.json"];
        assert_eq!(unique_run_base(&existing, "products_20240101"), "products_20240101");
        assert_eq!(unique_run_base(&existing, "profiles_20240101"), "profiles_20240101(3)");
    }

    #[test]
    fn test_page_number() {
        assert_eq!(page_number("run", "run_3.json"), Some(3));
        assert_eq!(page_number("run", "run_12.json"), Some(12));
        assert_eq!(page_number("run", "run_consolidated.json"), None);
        assert_eq!(page_number("run", "run(1)_3.json"), None);
        assert_eq!(page_number("run", "run_.json"), None);
        assert_eq!(page_number("run", "run_+3.json"), None);
    }

    #[test]
    fn test_archived_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 58).unwrap();
        assert_eq!(archived_file_name("ids.csv", at), "ids_20240131_235958.csv");
        assert_eq!(archived_file_name("ids", at), "ids_20240131_235958");
    }
}
