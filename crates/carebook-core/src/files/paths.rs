//! Conversions between device-local and portable file references.
//!
//! A portable reference is relative to the app's base directory, e.g.
//! `attachments/r1.jpg`. Local references are absolute and device specific,
//! either plain paths or `file://` URIs.

use crate::models::Category;

/// Directory (relative to the base) that restores download into first.
pub const STAGING_DIR: &str = ".restore-staging";

/// Final path segment.
pub fn basename(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

/// `base` with exactly one trailing `/`.
pub fn normalize_base(base: &str) -> String {
    format!("{}/", base.trim_end_matches('/'))
}

/// Rewrite a local reference relative to `base`.
///
/// If the reference was written under a different base (another device or a
/// reinstall moved the sandbox) the trailing `<category>/<name>` is kept.
/// Other files under `base` become plain relative paths. References that
/// match neither are returned unchanged.
pub fn to_portable(uri: &str, base: &str) -> String {
    if !is_absolute(uri) {
        return uri.trim_start_matches("./").to_string();
    }

    let base = normalize_base(strip_file_scheme(base));
    let stripped = strip_file_scheme(uri);
    let relative = stripped.strip_prefix(base.as_str());
    if let Some(rest) = relative.filter(|rest| category_of(rest).is_some()) {
        return rest.to_string();
    }

    let fallback = Category::ALL
        .iter()
        .filter_map(|c| {
            let marker = format!("/{}/", c.dir_name());
            stripped.rfind(&marker).map(|idx| idx + 1)
        })
        .max();
    match (fallback, relative) {
        (Some(idx), _) => stripped[idx..].to_string(),
        (None, Some(rest)) => rest.to_string(),
        (None, None) => uri.to_string(),
    }
}

/// Resolve a portable reference against `base`. Absolute input is kept.
pub fn to_local(portable: &str, base: &str) -> String {
    if is_absolute(portable) {
        portable.to_string()
    } else {
        join(base, portable)
    }
}

pub fn join(base: &str, relative: &str) -> String {
    format!("{}{}", normalize_base(base), relative.trim_start_matches('/'))
}

/// URI of `name` inside a category directory.
pub fn category_path(base: &str, category: Category, name: &str) -> String {
    join(base, &format!("{}/{}", category.dir_name(), name))
}

/// URI a restore stages `name` at before committing it.
pub fn staging_path(base: &str, category: Category, name: &str) -> String {
    join(&staging_dir(base, Some(category)), name)
}

/// The staging directory, or its per-category subdirectory.
pub fn staging_dir(base: &str, category: Option<Category>) -> String {
    match category {
        Some(category) => join(base, &format!("{}/{}", STAGING_DIR, category.dir_name())),
        None => join(base, STAGING_DIR),
    }
}

/// Whether `name` can be used as a file name inside a watched directory.
///
/// Rejects empty names, `.` and `..`, and anything with a path separator.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
}

/// Whether a portable reference names a file directly inside `category`'s
/// directory, e.g. `avatars/a.png`.
pub fn is_in_category(portable: &str, category: Category) -> bool {
    match portable.split_once('/') {
        Some((dir, name)) => dir == category.dir_name() && is_safe_name(name),
        None => false,
    }
}

/// Category a portable reference lives in.
pub fn category_of(portable: &str) -> Option<Category> {
    portable.split('/').next().and_then(Category::from_dir_name)
}

pub(crate) fn strip_file_scheme(uri: &str) -> &str {
    uri.strip_prefix("file://").unwrap_or(uri)
}

fn is_absolute(uri: &str) -> bool {
    uri.starts_with('/') || uri.contains("://")
}
