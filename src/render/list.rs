//! The `renderlist` builtin.
//!
//! `{{renderlist posts/*.md}}` renders every file matching the pattern with
//! the item layout and concatenates the results, newest name first. The item
//! layout is `.zazzy/itemlayout.html` unless the document sets `itemlayout`
//! to another root-relative path.

use super::expand;
use crate::{
    config::{CONFIG_DIR, SiteConfig},
    error::{BuildError, Result},
    log,
    utils::{
        glob::{self, IgnoreList},
        path::is_hidden,
    },
    vars::{self, Vars},
};

const ITEM_LAYOUT: &str = "itemlayout.html";

/// Render the list selected by the single pattern argument.
///
/// Each item is rendered with its own resolved variables, layered over the
/// variables of the listing document.
pub fn render_list(args: &[&str], vars: &Vars, config: &SiteConfig) -> Result<String> {
    let [pattern] = args else {
        return Err(BuildError::Argument(format!(
            "renderlist expects one pattern, got {}",
            args.len()
        )));
    };

    let mut matches = glob::expand(&config.root, pattern)?;
    if matches.is_empty() {
        return Err(BuildError::NoMatch((*pattern).to_owned()));
    }
    matches.sort_unstable_by(|a, b| b.cmp(a));

    let ignore = IgnoreList::load(config);
    let template = item_template(vars, config);
    let mut html = String::new();

    for path in matches
        .iter()
        .filter(|path| !is_hidden(path) && !ignore.is_ignored(path))
    {
        if config.path(path).is_dir() {
            continue;
        }

        let mut item = match vars::resolve(path, vars, config) {
            Ok((item, _)) => item,
            Err(e) => {
                log!("error"; "renderlist item skipped: {e}");
                continue;
            }
        };
        item.set_location(path, config);

        log!("renderlist"; "{path}");
        html.push_str(&expand(&template, &item, 1, config)?);
    }

    Ok(html)
}

/// Body of the item layout, or an empty template if it cannot be read.
fn item_template(vars: &Vars, config: &SiteConfig) -> String {
    let layout = match vars.get("itemlayout") {
        Some(layout) if !layout.is_empty() => layout.to_owned(),
        _ => format!("{CONFIG_DIR}/{ITEM_LAYOUT}"),
    };

    match vars::resolve(&layout, vars, config) {
        Ok((_, body)) => body,
        Err(e) => {
            log!("error"; "item layout: {e}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig::load(dir.path(), Vec::<(String, String)>::new()).unwrap();
        (dir, config)
    }

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn blog(dir: &TempDir) {
        write(dir, ".zazzy/itemlayout.html", "<li><a href=\"/{{url}}\">{{title}}</a></li>\n");
        write(dir, "posts/2024-01-01-first.md", "title: First\n---\none");
        write(dir, "posts/2024-02-01-second.md", "title: Second\n---\ntwo");
        write(dir, "posts/.draft.md", "title: Hidden\n---\n");
    }

    #[test]
    fn test_items_newest_first() {
        let (dir, config) = site();
        blog(&dir);

        let html = render_list(&["posts/*.md"], &Vars::default(), &config).unwrap();
        assert_eq!(
            html,
            "<li><a href=\"/posts/2024-02-01-second.html\">Second</a></li>\n\
             <li><a href=\"/posts/2024-01-01-first.html\">First</a></li>\n"
        );
    }

    #[test]
    fn test_ignored_items_skipped() {
        let (dir, config) = site();
        blog(&dir);
        write(&dir, ".zazzy/.ignore", "posts/2024-01-*\n");

        let html = render_list(&["posts/*.md"], &Vars::default(), &config).unwrap();
        assert!(html.contains("Second"));
        assert!(!html.contains("First"));
    }

    #[test]
    fn test_custom_item_layout() {
        let (dir, config) = site();
        blog(&dir);
        write(&dir, "layouts/row.html", "[{{title}}]");
        let vars: Vars = [("itemlayout", "layouts/row.html")].into_iter().collect();

        let html = render_list(&["posts/*.md"], &vars, &config).unwrap();
        assert_eq!(html, "[Second][First]");
    }

    #[test]
    fn test_listing_vars_inherited() {
        let (dir, config) = site();
        write(&dir, ".zazzy/itemlayout.html", "{{section}}:{{title}};");
        write(&dir, "notes/a.md", "title: A\n---\n");
        let vars: Vars = [("section", "notes")].into_iter().collect();

        let html = render_list(&["notes/*.md"], &vars, &config).unwrap();
        assert_eq!(html, "notes:A;");
    }

    #[test]
    fn test_matching_directories_skipped() {
        let (dir, config) = site();
        blog(&dir);
        fs::create_dir_all(dir.path().join("posts/2025-archive")).unwrap();

        let html = render_list(&["posts/*"], &Vars::default(), &config).unwrap();
        assert_eq!(
            html,
            "<li><a href=\"/posts/2024-02-01-second.html\">Second</a></li>\n\
             <li><a href=\"/posts/2024-01-01-first.html\">First</a></li>\n"
        );
    }

    #[test]
    fn test_unreadable_item_skipped() {
        let (dir, config) = site();
        blog(&dir);
        write(&dir, "posts/2024-03-01-broken.md", "tags:\n  - a\n  - b\n---\nbody");

        let html = render_list(&["posts/*.md"], &Vars::default(), &config).unwrap();
        assert!(!html.contains("broken"));
        assert!(html.contains("Second"));
        assert!(html.contains("First"));
    }

    #[test]
    fn test_no_match_is_error() {
        let (_dir, config) = site();
        let err = render_list(&["missing/*.md"], &Vars::default(), &config).unwrap_err();
        assert!(matches!(err, BuildError::NoMatch(_)));
    }

    #[test]
    fn test_argument_count_checked() {
        let (_dir, config) = site();
        let err = render_list(&[], &Vars::default(), &config).unwrap_err();
        assert!(matches!(err, BuildError::Argument(_)));
        let err = render_list(&["a", "b"], &Vars::default(), &config).unwrap_err();
        assert!(matches!(err, BuildError::Argument(_)));
    }

    #[test]
    fn test_missing_item_layout_renders_empty_items() {
        let (dir, config) = site();
        write(&dir, "posts/a.md", "x");

        let html = render_list(&["posts/*.md"], &Vars::default(), &config).unwrap();
        assert_eq!(html, "");
    }
}
