//! Path helpers shared by the resolver, the list renderer and the walker.
//!
//! Source paths travel through the build as root-relative strings with `/`
//! separators (`posts/2024-01-01-hello.md`), which is also how they appear in
//! document variables.

use std::path::{Component, Path};

/// Extension of `path` including the leading dot, or `""`.
///
/// `foo.md` → `.md`, `dir.d/foo` → `""`, `.hidden` → `.hidden`
pub fn ext(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    path[name_start..]
        .rfind('.')
        .map_or("", |dot| &path[name_start + dot..])
}

/// Replace the extension `old` of `path` by `new`.
///
/// An empty `old` means "whatever extension `path` has". When that extension
/// is empty too, `new` is simply appended. A path not ending in `old` is
/// returned unchanged.
pub fn rename_ext(path: &str, old: &str, new: &str) -> String {
    let old = if old.is_empty() { ext(path) } else { old };
    if old.is_empty() {
        format!("{path}{new}")
    } else if let Some(stem) = path.strip_suffix(old) {
        format!("{stem}{new}")
    } else {
        path.to_owned()
    }
}

/// Hidden entries: the name or the whole relative path starts with a dot.
pub fn is_hidden(path: &str) -> bool {
    let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    name.starts_with('.') || path.starts_with('.')
}

/// Root-relative string form of `path` with `/` separators and without any
/// leading `./`.
pub fn to_rel_string(path: &Path) -> String {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
