//! File-name-safe slugs.

use deunicode::deunicode;

/// Slugify `text`: transliterated to ASCII, lowercased, every run of
/// non-alphanumeric characters collapsed into a single `-`.
///
/// | Input                  | Slug                   |
/// |------------------------|------------------------|
/// | `laurent.lourenco.pro` | `laurent-lourenco-pro` |
/// | `Café Müller`          | `cafe-muller`          |
/// | `--a__b--`             | `a-b`                  |
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in deunicode(text).chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
