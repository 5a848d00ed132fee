// src/dedup.rs
//! Near-duplicate headline detection and topic exclusion.
//!
//! Headlines are compared as token sets: lower-cased, punctuation removed,
//! split on whitespace. Two titles are near-duplicates when the overlap
//! coefficient `|A ∩ B| / min(|A|, |B|)` is strictly greater than
//! [`SIMILARITY_THRESHOLD`]. Empty token sets never match anything, not even
//! each other.

use std::collections::HashSet;

pub const SIMILARITY_THRESHOLD: f64 = 0.5;

pub fn tokenize(title: &str) -> HashSet<String> {
    let stripped: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().map(str::to_string).collect()
}

fn overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / smaller as f64
}

pub fn similarity(a: &str, b: &str) -> f64 {
    overlap(&tokenize(a), &tokenize(b))
}

pub fn is_similar(a: &str, b: &str) -> bool {
    similarity(a, b) > SIMILARITY_THRESHOLD
}

/// Remembers every accepted title of a run, across all sources, in order.
/// First seen wins.
#[derive(Debug, Default)]
pub struct Deduplicator {
    accepted: Vec<HashSet<String>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `title` unless it is a near-duplicate of an earlier one.
    /// A title with no tokens (`⚡️⚡️`) is similar to nothing, so it is
    /// always accepted.
    pub fn accept(&mut self, title: &str) -> bool {
        let tokens = tokenize(title);
        if self
            .accepted
            .iter()
            .any(|seen| overlap(seen, &tokens) > SIMILARITY_THRESHOLD)
        {
            return false;
        }
        self.accepted.push(tokens);
        true
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Built-in exclusion list: sport coverage.
pub const SPORT_KEYWORDS: &[&str] = &[
    "спорт",
    "футбол",
    "хоккей",
    "теннис",
    "баскетбол",
    "волейбол",
    "биатлон",
    "фигурист",
    "олимпи",
    "чемпионат",
    "матч",
    "турнир",
    "рпл",
    "кхл",
    "нхл",
    "уефа",
    "фифа",
    "sport",
    "football",
    "hockey",
    "tennis",
];

/// Case-insensitive substring blacklist for headlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    keywords: Vec<String>,
}

impl TopicFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect();
        Self { keywords }
    }

    pub fn sports() -> Self {
        Self::new(SPORT_KEYWORDS.iter().copied())
    }

    pub fn none() -> Self {
        Self {
            keywords: Vec::new(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_excluded(&self, title: &str) -> bool {
        let t = title.to_lowercase();
        self.keywords.iter().any(|k| t.contains(k.as_str()))
    }
}

impl Default for TopicFilter {
    fn default() -> Self {
        Self::sports()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_strips_punctuation_and_case() {
        let t = tokenize("Цены на нефть выросли на 5%!");
        let expected: HashSet<String> = ["цены", "на", "нефть", "выросли", "5"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(t, expected);
    }

    #[test]
    fn threshold_is_strict() {
        // {a, b} vs {a, c}: 1/2 == 0.5 is not similar
        assert!(!is_similar("alpha beta", "alpha gamma"));
        assert!(is_similar("alpha beta", "alpha beta gamma delta"));
    }

    #[test]
    fn dedup_keeps_first_seen() {
        let mut d = Deduplicator::new();
        assert!(d.accept("Цены на нефть выросли"));
        assert!(!d.accept("Цены на нефть выросли на 5%"));
        assert!(d.accept("Курс рубля укрепился"));
        assert!(d.accept("..."));
        assert!(d.accept("..."));
        assert_eq!(d.len(), 4);
    }

    #[test]
    fn topic_filter_is_case_insensitive_substring() {
        let f = TopicFilter::sports();
        assert!(f.is_excluded("ФУТБОЛЬНЫЙ клуб сменил тренера"));
        assert!(f.is_excluded("Сборная вышла в финал чемпионата"));
        assert!(!f.is_excluded("Госдума приняла закон о бюджете"));
        assert!(!TopicFilter::none().is_excluded("Футбол"));
    }

    #[test]
    fn topic_filter_normalizes_keywords_in_order() {
        let f = TopicFilter::new([" Хоккей ", "", "КХЛ", "хоккей", "  "]);
        assert_eq!(f.keywords(), ["хоккей", "кхл"]);
    }
}
