// src/sources/news.rs
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::sync::Arc;

use super::{FetchResult, RunContext, SourceAdapter};
use crate::dedup::{Deduplicator, TopicFilter};
use crate::http::{FetchError, Transport};
use crate::retry::{retry, RetryPolicy};
use crate::text::clean_text;

pub const NEWS_FALLBACK: &str = "Сегодня без громких новостей";
pub const DEFAULT_MAX_ITEMS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub source: String,
}

/// Accepted headlines in source-priority, then document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsDigest {
    pub items: Vec<NewsItem>,
}

impl NewsDigest {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One RSS feed, consulted in configured order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsOutlet {
    pub name: String,
    pub url: String,
}

impl NewsOutlet {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
}

/// Raw `(title, link)` pairs in document order. Missing fields stay `None`;
/// filtering happens in [`NewsCollector::offer`].
pub fn parse_feed(xml: &str) -> Result<Vec<(Option<String>, Option<String>)>, FetchError> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss =
        from_str(&xml_clean).map_err(|e| FetchError::validation(format!("rss: {e}")))?;
    Ok(rss
        .channel
        .item
        .into_iter()
        .map(|it| (it.title, it.link))
        .collect())
}

// quick-xml only knows the five XML entities; feeds routinely use HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "—")
        .replace("&laquo;", "«")
        .replace("&raquo;", "»")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "…")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Accepted,
    Incomplete,
    Excluded,
    Duplicate,
    Full,
}

/// Running news selection for one digest: completeness check, topic
/// exclusion, cross-source dedup and the item cap, applied in that order.
#[derive(Debug)]
pub struct NewsCollector {
    filter: TopicFilter,
    dedup: Deduplicator,
    max_items: usize,
    items: Vec<NewsItem>,
}

impl NewsCollector {
    pub fn new(filter: TopicFilter, max_items: usize) -> Self {
        Self {
            filter,
            dedup: Deduplicator::new(),
            max_items,
            items: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max_items
    }

    pub fn offer(&mut self, source: &str, title: Option<&str>, link: Option<&str>) -> Offer {
        if self.is_full() {
            return Offer::Full;
        }
        let title = title.map(clean_text).unwrap_or_default();
        let link = link.map(str::trim).unwrap_or_default();
        if title.is_empty() || link.is_empty() {
            return Offer::Incomplete;
        }
        if self.filter.is_excluded(&title) {
            return Offer::Excluded;
        }
        if !self.dedup.accept(&title) {
            return Offer::Duplicate;
        }
        self.items.push(NewsItem {
            title,
            link: link.to_string(),
            source: source.to_string(),
        });
        Offer::Accepted
    }

    pub fn finish(self) -> NewsDigest {
        NewsDigest { items: self.items }
    }
}

pub struct NewsAdapter {
    transport: Arc<dyn Transport>,
    outlets: Vec<NewsOutlet>,
    filter: TopicFilter,
    max_items: usize,
    retry: RetryPolicy,
}

impl NewsAdapter {
    pub fn new(transport: Arc<dyn Transport>, outlets: Vec<NewsOutlet>) -> Self {
        Self {
            transport,
            outlets,
            filter: TopicFilter::default(),
            max_items: DEFAULT_MAX_ITEMS,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_filter(mut self, filter: TopicFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn pull_outlet(
        &self,
        outlet: &NewsOutlet,
    ) -> Result<Vec<(Option<String>, Option<String>)>, FetchError> {
        let xml = retry(&self.retry, &outlet.name, || {
            self.transport.get_text(&outlet.url)
        })
        .await?;
        parse_feed(&xml)
    }
}

#[async_trait]
impl SourceAdapter for NewsAdapter {
    type Output = NewsDigest;

    fn name(&self) -> &'static str {
        "news"
    }

    async fn fetch(&self, _ctx: &RunContext) -> FetchResult<NewsDigest> {
        let mut collector = NewsCollector::new(self.filter.clone(), self.max_items);

        for outlet in &self.outlets {
            if collector.is_full() {
                break;
            }
            let entries = match self.pull_outlet(outlet).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(outlet = %outlet.name, error = %e, "news outlet skipped");
                    continue;
                }
            };

            let (mut accepted, mut excluded, mut duplicates) = (0usize, 0usize, 0usize);
            for (title, link) in &entries {
                match collector.offer(&outlet.name, title.as_deref(), link.as_deref()) {
                    Offer::Accepted => accepted += 1,
                    Offer::Excluded => excluded += 1,
                    Offer::Duplicate => duplicates += 1,
                    Offer::Incomplete => {}
                    Offer::Full => break,
                }
            }
            tracing::info!(
                outlet = %outlet.name,
                parsed = entries.len(),
                accepted,
                excluded,
                duplicates,
                "news outlet processed"
            );
        }

        let digest = collector.finish();
        if digest.is_empty() {
            return FetchResult::from_result(
                self.name(),
                NEWS_FALLBACK,
                Err("no headlines accepted from any outlet"),
            );
        }
        FetchResult::Success(digest)
    }
}
