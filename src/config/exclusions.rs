// src/config/exclusions.rs
//! News topic exclusion list.
//!
//! Resolution order:
//! 1) explicit path (`NEWS_EXCLUDE_PATH`)
//! 2) `config/news_exclude.toml`
//! 3) `config/news_exclude.json`
//! 4) built-in sport keywords

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dedup::TopicFilter;

pub const DEFAULT_TOML_PATH: &str = "config/news_exclude.toml";
pub const DEFAULT_JSON_PATH: &str = "config/news_exclude.json";

/// Load a filter from an explicit path. `.toml` files hold
/// `keywords = [...]`, `.json` files a plain array of strings. Other
/// extensions are read as JSON when the content starts with `[`.
pub fn load_exclusions_from(path: &Path) -> Result<TopicFilter> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading exclusions from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let keywords = parse_exclusions(&content, ListFormat::detect(&ext, &content))
        .with_context(|| format!("parsing exclusions in {}", path.display()))?;
    Ok(TopicFilter::new(keywords))
}

pub fn load_topic_filter(explicit: Option<&str>) -> Result<TopicFilter> {
    if let Some(p) = explicit {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("NEWS_EXCLUDE_PATH points to non-existent path {p}"));
        }
        return load_exclusions_from(&pb);
    }
    for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            return load_exclusions_from(&pb);
        }
    }
    Ok(TopicFilter::sports())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListFormat {
    Toml,
    Json,
}

impl ListFormat {
    fn detect(ext: &str, content: &str) -> Self {
        match ext {
            "toml" => ListFormat::Toml,
            "json" => ListFormat::Json,
            _ if content.trim_start().starts_with('[') => ListFormat::Json,
            _ => ListFormat::Toml,
        }
    }
}

#[derive(serde::Deserialize)]
struct TomlList {
    keywords: Vec<String>,
}

fn parse_exclusions(s: &str, format: ListFormat) -> Result<Vec<String>> {
    Ok(match format {
        ListFormat::Toml => toml::from_str::<TomlList>(s)?.keywords,
        ListFormat::Json => serde_json::from_str(s)?,
    })
}
