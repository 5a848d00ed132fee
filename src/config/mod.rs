// src/config/mod.rs
//! Process configuration, read once at startup.
//!
//! `DigestConfig` is immutable after construction and passed explicitly to
//! the pipeline; nothing below `main` reads the environment.

pub mod exclusions;

use std::time::Duration;

use crate::dedup::TopicFilter;
use crate::retry::RetryPolicy;
use crate::sources::horoscope::ZodiacSign;
use crate::sources::news::{NewsOutlet, DEFAULT_MAX_ITEMS};
use crate::sources::rates::ReferenceCurrency;

pub const ENV_BOT_TOKEN: &str = "BOT_TOKEN";
pub const ENV_CHAT_ID: &str = "CHAT_ID";
pub const ENV_WEATHER_KEY: &str = "WEATHER_KEY";

pub const DEFAULT_CITY: &str = "Moscow,ru";
pub const DEFAULT_CITY_LABEL: &str = "Москва";
pub const DEFAULT_HOROSCOPE_FEED: &str = "https://ignio.com/r/export/utf/xml/daily/com.xml";
pub const DEFAULT_NEWS_FEEDS: &str = "RBC=https://rssexport.rbc.ru/rbcnews/news/30/full.rss";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid {key}=`{value}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("news exclusions: {0:#}")]
    Exclusions(anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub weather: String,
    pub fx: String,
    pub crypto: String,
    pub telegram: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            weather: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            fx: "https://api.exchangerate.host/latest".to_string(),
            crypto: "https://api.coingecko.com/api/v3/simple/price".to_string(),
            telegram: crate::notify::telegram::DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub weather_key: String,

    pub city_query: String,
    pub city_label: String,
    pub weather_lang: String,

    pub local_currency: String,
    pub btc_reference: ReferenceCurrency,
    pub fx_api_key: Option<String>,

    pub zodiac_sign: ZodiacSign,
    /// `None` = canned phrases only.
    pub horoscope_feed: Option<String>,

    pub news_outlets: Vec<NewsOutlet>,
    pub news_max_items: usize,
    pub news_filter: TopicFilter,

    pub endpoints: Endpoints,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl DigestConfig {
    /// Read from the process environment (call `dotenvy` first if wanted).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup. Blank values count as unset. All missing
    /// required keys are reported together.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| {
            lookup(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or = |k: &str, default: &str| get(k).unwrap_or_else(|| default.to_string());

        let required = [ENV_BOT_TOKEN, ENV_CHAT_ID, ENV_WEATHER_KEY];
        let missing: Vec<&'static str> = required
            .into_iter()
            .filter(|k| get(*k).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let zodiac_sign: ZodiacSign = parse_key(&get, "ZODIAC_SIGN", "aries", |v| v.parse())?;
        let btc_reference: ReferenceCurrency = parse_key(&get, "BTC_REFERENCE", "local", |v| v.parse())?;
        let news_max_items = parse_key(&get, "NEWS_MAX_ITEMS", &DEFAULT_MAX_ITEMS.to_string(), |v| {
            match v.parse::<usize>() {
                Ok(0) => Err("must be at least 1".to_string()),
                Ok(n) => Ok(n),
                Err(e) => Err(e.to_string()),
            }
        })?;
        let timeout_secs: u64 =
            parse_key(&get, "REQUEST_TIMEOUT_SECS", "10", |v| v.parse().map_err(|e| format!("{e}")))?;
        let max_attempts: u32 =
            parse_key(&get, "RETRY_MAX_ATTEMPTS", "3", |v| v.parse().map_err(|e| format!("{e}")))?;
        let delay_secs: u64 =
            parse_key(&get, "RETRY_DELAY_SECS", "2", |v| v.parse().map_err(|e| format!("{e}")))?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_SECS",
                value: "0".into(),
                reason: "requests need a finite, non-zero timeout".into(),
            });
        }

        let news_outlets = parse_key(&get, "NEWS_FEEDS", DEFAULT_NEWS_FEEDS, parse_outlets)?;

        let horoscope_feed = match or("HOROSCOPE_FEED_URL", DEFAULT_HOROSCOPE_FEED) {
            v if matches!(v.to_ascii_lowercase().as_str(), "off" | "none") => None,
            v => Some(v),
        };

        let news_filter = exclusions::load_topic_filter(get("NEWS_EXCLUDE_PATH").as_deref())
            .map_err(ConfigError::Exclusions)?;

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            weather: or("WEATHER_API_URL", &defaults.weather),
            fx: or("FX_API_URL", &defaults.fx),
            crypto: or("CRYPTO_API_URL", &defaults.crypto),
            telegram: or("TELEGRAM_API_URL", &defaults.telegram),
        };

        Ok(Self {
            bot_token: or(ENV_BOT_TOKEN, ""),
            chat_id: or(ENV_CHAT_ID, ""),
            weather_key: or(ENV_WEATHER_KEY, ""),
            city_query: or("DIGEST_CITY", DEFAULT_CITY),
            city_label: or("DIGEST_CITY_LABEL", DEFAULT_CITY_LABEL),
            weather_lang: or("WEATHER_LANG", "ru"),
            local_currency: or("LOCAL_CURRENCY", "RUB").to_ascii_uppercase(),
            btc_reference,
            fx_api_key: get("FX_API_KEY"),
            zodiac_sign,
            horoscope_feed,
            news_outlets,
            news_max_items,
            news_filter,
            endpoints,
            request_timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy::new(max_attempts, Duration::from_secs(delay_secs)),
        })
    }
}

fn parse_key<T, G, P>(get: &G, key: &'static str, default: &str, parse: P) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    P: FnOnce(&str) -> Result<T, String>,
{
    let value = get(key).unwrap_or_else(|| default.to_string());
    parse(&value).map_err(|reason| ConfigError::Invalid {
        key,
        value,
        reason,
    })
}

/// `Name=url,Other=url` or bare urls (named after their host).
pub fn parse_outlets(list: &str) -> Result<Vec<NewsOutlet>, String> {
    let mut out = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, url) = match part.split_once('=') {
            Some((n, u)) if !n.contains("://") => {
                (n.trim().to_string(), u.trim().to_string())
            }
            _ => (host_of(part), part.to_string()),
        };
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("`{url}` is not an http(s) url"));
        }
        out.push(NewsOutlet::new(name, url));
    }
    if out.is_empty() {
        return Err("no news feeds configured".to_string());
    }
    Ok(out)
}

fn host_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outlets_accept_named_and_bare_urls() {
        let v = parse_outlets("RBC=https://rbc.test/rss, https://lenta.test/rss?x=1").unwrap();
        assert_eq!(v[0], NewsOutlet::new("RBC", "https://rbc.test/rss"));
        assert_eq!(v[1], NewsOutlet::new("lenta.test", "https://lenta.test/rss?x=1"));
        assert!(parse_outlets("RBC=ftp://x").is_err());
        assert!(parse_outlets(" , ").is_err());
    }
}
