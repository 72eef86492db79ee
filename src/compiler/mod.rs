//! Per-file build pipelines.
//!
//! The extension of a source file selects its pipeline:
//!
//! | Extension        | Pipeline                                            |
//! |------------------|-----------------------------------------------------|
//! | `.md`, `.mkd`    | expand, convert to HTML, wrap in the layout         |
//! | `.html`, `.xml`  | expand, evaluate `<% %>` actions                    |
//! | anything else    | copy verbatim                                       |
//!
//! # Markdown Flow
//!
//! ```text
//! resolve ──► expand ──► markdown ──► $content ──► layout? ──► write
//!                                                    │
//!                                                    └─ absent: write $content
//! ```
//!
//! Output goes to the given writer when there is one, otherwise into the
//! publish directory.

pub mod markdown;
pub mod template;

use crate::{
    config::{CONFIG_DIR, SiteConfig},
    error::{BuildError, Result},
    generator::sitemap,
    render::expand,
    utils::path::ext,
    vars::{Vars, resolve},
};
use std::{
    fs::{self, File},
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};

/// Name reported for write failures on a caller-supplied writer.
const STDOUT: &str = "<stdout>";

/// Build one root-relative source file.
pub fn build_file(
    path: &str,
    writer: Option<&mut dyn Write>,
    globals: &Vars,
    config: &SiteConfig,
) -> Result<()> {
    match ext(path) {
        ".md" | ".mkd" => build_markdown(path, writer, globals, config),
        ".html" | ".xml" => build_html(path, writer, globals, config),
        _ => copy_raw(path, writer, config),
    }
}

fn build_markdown(
    path: &str,
    writer: Option<&mut dyn Write>,
    globals: &Vars,
    config: &SiteConfig,
) -> Result<()> {
    let (mut vars, body) = resolve(path, globals, config)?;
    let content = expand(&body, &vars, 1, config)?;
    vars.insert("content", markdown::to_html(&content));
    sitemap::record(path, &vars, config);

    let target = config.path(vars.output());
    let layout = format!("{CONFIG_DIR}/{}", vars.layout());

    match fs::metadata(config.path(&layout)) {
        Ok(_) => {
            let (_, html) = render_html(&layout, &vars, config)?;
            write_output(writer, &target, html.as_bytes())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            write_output(writer, &target, vars.get("content").unwrap_or_default().as_bytes())
        }
        Err(e) => Err(BuildError::Read(config.path(&layout), e)),
    }
}

fn build_html(
    path: &str,
    writer: Option<&mut dyn Write>,
    globals: &Vars,
    config: &SiteConfig,
) -> Result<()> {
    let (vars, html) = render_html(path, globals, config)?;

    // feeds and other XML keep their name and location
    let target = if ext(path) == ".xml" {
        config.publish_dir().join(path)
    } else {
        config.path(vars.output())
    };
    write_output(writer, &target, html.as_bytes())
}

/// Resolve, expand and evaluate the HTML document at `path`.
fn render_html(path: &str, globals: &Vars, config: &SiteConfig) -> Result<(Vars, String)> {
    let (vars, body) = resolve(path, globals, config)?;
    let expanded = expand(&body, &vars, 1, config)?;
    let html = template::render(path, &expanded, &vars)?;
    sitemap::record(path, &vars, config);
    Ok((vars, html))
}

fn copy_raw(path: &str, writer: Option<&mut dyn Write>, config: &SiteConfig) -> Result<()> {
    let source = config.path(path);
    match writer {
        Some(writer) => {
            let mut file = File::open(&source).map_err(|e| BuildError::Read(source.clone(), e))?;
            io::copy(&mut file, writer).map_err(|e| BuildError::Write(PathBuf::from(STDOUT), e))?;
        }
        None => {
            let target = config.publish_dir().join(path);
            create_parent(&target)?;
            fs::copy(&source, &target).map_err(|e| BuildError::Write(target, e))?;
        }
    }
    Ok(())
}

fn write_output(writer: Option<&mut dyn Write>, target: &Path, content: &[u8]) -> Result<()> {
    match writer {
        Some(writer) => writer
            .write_all(content)
            .map_err(|e| BuildError::Write(PathBuf::from(STDOUT), e)),
        None => {
            create_parent(target)?;
            fs::write(target, content).map_err(|e| BuildError::Write(target.to_path_buf(), e))
        }
    }
}

fn create_parent(target: &Path) -> Result<()> {
    match target.parent() {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|e| BuildError::Write(parent.to_path_buf(), e))
        }
        None => Ok(()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
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

    fn read(dir: &TempDir, rel: &str) -> String {
        fs::read_to_string(dir.path().join(rel)).unwrap()
    }

    #[test]
    fn test_markdown_with_layout() {
        let (dir, config) = site();
        write(&dir, ".zazzy/layout.html", "<title>{{title}}</title>{{content}}");
        write(&dir, "index.md", "title: Home\n---\n# {{title}}\n");

        build_file("index.md", None, &config.globals, &config).unwrap();
        assert_eq!(
            read(&dir, ".pub/index.html"),
            "<title>Home</title><h1>Home</h1>\n"
        );
    }

    #[test]
    fn test_markdown_without_layout() {
        let (dir, config) = site();
        write(&dir, "notes/a.mkd", "*hi*");

        build_file("notes/a.mkd", None, &config.globals, &config).unwrap();
        assert_eq!(read(&dir, ".pub/notes/a.html"), "<p><em>hi</em></p>\n");
    }

    #[test]
    fn test_markdown_named_layout() {
        let (dir, config) = site();
        write(&dir, ".zazzy/post.html", "<article>{{content}}</article>");
        write(&dir, "a.md", "layout: post.html\n---\ntext");

        build_file("a.md", None, &config.globals, &config).unwrap();
        assert_eq!(read(&dir, ".pub/a.html"), "<article><p>text</p>\n</article>");
    }

    #[test]
    fn test_html_template_stage() {
        let (dir, config) = site();
        write(&dir, "page.html", "title: About\n---\n<h1>{{title}}</h1><% .url %>");

        build_file("page.html", None, &config.globals, &config).unwrap();
        assert_eq!(read(&dir, ".pub/page.html"), "<h1>About</h1>page.html");
    }

    #[test]
    fn test_xml_keeps_location() {
        let (dir, config) = site();
        write(&dir, "feeds/atom.xml", "<feed>{{pubdir}}</feed>");

        build_file("feeds/atom.xml", None, &config.globals, &config).unwrap();
        assert_eq!(read(&dir, ".pub/feeds/atom.xml"), "<feed>.pub</feed>");
    }

    #[test]
    fn test_raw_copy() {
        let (dir, config) = site();
        write(&dir, "css/style.css", "body {{ color: red }}");

        build_file("css/style.css", None, &config.globals, &config).unwrap();
        assert_eq!(read(&dir, ".pub/css/style.css"), "body {{ color: red }}");
    }

    #[test]
    fn test_writer_receives_output() {
        let (dir, config) = site();
        write(&dir, "a.md", "# x");

        let mut buf = Vec::new();
        build_file("a.md", Some(&mut buf), &config.globals, &config).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "<h1>x</h1>\n");
        assert!(!dir.path().join(".pub/a.html").exists());
    }

    #[test]
    fn test_unterminated_macro_fails_build() {
        let (dir, config) = site();
        write(&dir, "a.md", "oops {{title");

        let err = build_file("a.md", None, &config.globals, &config).unwrap_err();
        assert!(matches!(err, BuildError::UnterminatedMacro));
        assert!(!dir.path().join(".pub/a.html").exists());
    }

    #[test]
    fn test_sitemap_recorded() {
        let (dir, config) = site();
        write(
            &dir,
            "a.md",
            "sitemap: true\nsitemaptype: txt\nhosturl: https://example.com\n---\nx",
        );

        build_file("a.md", None, &config.globals, &config).unwrap();
        assert_eq!(read(&dir, ".pub/sitemap.txt"), "https://example.com/a.html\n");
    }
}
