//! Display names for results files.

use std::path::Path;

use heck::ToTitleCase;

/// Prefix k6 result files conventionally carry, e.g. `k6_results_login.json`.
pub const DEFAULT_PREFIX: &str = "k6_results_";

/// Derive the display name of a results file from its path.
///
/// The file stem is taken, every occurrence of `prefix` removed and the
/// remainder title-cased with `_`, `-` and spaces as word separators:
/// `out/k6_results_user_module.json` becomes `User Module`.
#[must_use]
pub fn display_name(path: &Path, prefix: &str) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    let stem = if prefix.is_empty() {
        stem.into_owned()
    } else {
        stem.replace(prefix, "")
    };
    stem.to_title_case()
}
