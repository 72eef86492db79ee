//! Document variables and their resolution.
//!
//! Every document render works on a [`Vars`] map built in three layers,
//! each overwriting the previous one:
//!
//! ```text
//! computed defaults  <  global variables  <  document header
//! (title, url, ...)     (ZS_*, config)        (YAML or JSON)
//! ```
//!
//! The header is everything before the first `\n---\n`. A document without
//! that delimiter is body-only.

use crate::{
    config::SiteConfig,
    error::{BuildError, Result},
    utils::path::{ext, rename_ext},
};
use serde_json::Value as JsonValue;
use serde_yaml_ng::Value as YamlValue;
use std::{collections::BTreeMap, fs};

/// Separator between the header block and the body.
const HEADER_DELIM: &str = "\n---\n";

/// Layout used when neither globals nor the header name one.
const DEFAULT_LAYOUT: &str = "layout.html";

// ============================================================================
// Vars
// ============================================================================

/// String-keyed variables of one document render.
///
/// Arbitrary keys flow through untyped; the well-known ones have accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars(BTreeMap<String, String>);

impl Vars {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Overwrite entries with those of `other`.
    pub fn overlay(&mut self, other: &Vars) {
        for (key, value) in other.iter() {
            self.0.insert(key.to_owned(), value.to_owned());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    pub fn url(&self) -> &str {
        self.value("url")
    }

    pub fn output(&self) -> &str {
        self.value("output")
    }

    pub fn layout(&self) -> &str {
        self.value("layout")
    }

    /// Point `file`, `url` and `output` at `path`.
    pub fn set_location(&mut self, path: &str, config: &SiteConfig) {
        let url = rename_ext(path, ext(path), ".html");
        self.insert("output", output_for(&url, config));
        self.insert("file", path);
        self.insert("url", url);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Vars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn output_for(url: &str, config: &SiteConfig) -> String {
    config.pubdir.join(url).to_string_lossy().into_owned()
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the variables and body of the document at root-relative `path`.
///
/// `output` is computed from the default `url`; a header overriding only
/// `url` leaves `output` where the default put it.
pub fn resolve(path: &str, globals: &Vars, config: &SiteConfig) -> Result<(Vars, String)> {
    let full = config.path(path);
    let raw = fs::read_to_string(&full).map_err(|e| BuildError::Read(full.clone(), e))?;

    let mut vars = defaults(path, config);
    vars.overlay(globals);
    if !vars.contains_key("layout") {
        vars.insert("layout", DEFAULT_LAYOUT);
    }

    let body = match raw.split_once(HEADER_DELIM) {
        None => raw,
        Some((header, body)) => {
            vars.overlay(&parse_header(path, header)?);
            body.to_owned()
        }
    };

    let url = vars.url().trim_start_matches(['.', '/']).to_owned();
    vars.insert("url", url);

    Ok((vars, body))
}

/// Content-derived defaults for `path`.
fn defaults(path: &str, config: &SiteConfig) -> Vars {
    let mut vars = Vars::default();
    vars.insert("title", path.replace(['_', '-'], " ").to_uppercase());
    vars.insert("description", "");
    vars.set_location(path, config);
    vars
}

/// Decode a header block as a flat string mapping.
///
/// A block opening with `{` is JSON, anything else is YAML.
fn parse_header(path: &str, header: &str) -> Result<Vars> {
    let parse_err = |message: String| BuildError::Parse {
        path: path.to_owned(),
        message,
    };

    if header.trim().is_empty() {
        return Ok(Vars::default());
    }

    if header.trim_start().starts_with('{') {
        let map: BTreeMap<String, JsonValue> =
            serde_json::from_str(header).map_err(|e| parse_err(e.to_string()))?;
        flatten(map, json_scalar).map_err(parse_err)
    } else {
        let map: BTreeMap<String, YamlValue> =
            serde_yaml_ng::from_str(header).map_err(|e| parse_err(e.to_string()))?;
        flatten(map, yaml_scalar).map_err(parse_err)
    }
}

fn flatten<T>(
    map: BTreeMap<String, T>,
    scalar: fn(T) -> Option<String>,
) -> std::result::Result<Vars, String> {
    let mut vars = Vars::default();
    for (key, value) in map {
        match scalar(value) {
            Some(value) => vars.insert(key, value),
            None => return Err(format!("value of `{key}` is not a scalar")),
        }
    }
    Ok(vars)
}

fn yaml_scalar(value: YamlValue) -> Option<String> {
    match value {
        YamlValue::Null => Some(String::new()),
        YamlValue::Bool(b) => Some(b.to_string()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::String(s) => Some(s),
        YamlValue::Tagged(tagged) => yaml_scalar(tagged.value),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) => None,
    }
}

fn json_scalar(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => Some(String::new()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::String(s) => Some(s),
        JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
