// src/sources/weather.rs
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{FetchResult, RunContext, SourceAdapter};
use crate::http::{FetchError, Transport};
use crate::retry::{retry, RetryPolicy};
use crate::text::capitalize_first;

pub const WEATHER_FALLBACK: &str = "Погода недоступна";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherIcon {
    Snow,
    Rain,
    Clear,
    Cloudy,
    Fog,
    Thunder,
    Unknown,
}

/// Evaluated top to bottom; the first icon with a matching stem wins.
const ICON_KEYWORDS: &[(WeatherIcon, &[&str])] = &[
    (WeatherIcon::Snow, &["снег", "снеж", "snow", "sleet"]),
    (
        WeatherIcon::Rain,
        &["дожд", "ливен", "ливн", "морос", "rain", "drizzle", "shower"],
    ),
    (WeatherIcon::Clear, &["ясно", "clear", "sunny"]),
    (
        WeatherIcon::Cloudy,
        &["облачн", "пасмурн", "cloud", "overcast"],
    ),
    (WeatherIcon::Fog, &["туман", "дымка", "мгла", "fog", "mist", "haze"]),
    (WeatherIcon::Thunder, &["гроз", "thunder", "storm"]),
];

impl WeatherIcon {
    pub fn from_description(description: &str) -> Self {
        let d = description.to_lowercase();
        ICON_KEYWORDS
            .iter()
            .find(|(_, stems)| stems.iter().any(|s| d.contains(s)))
            .map(|(icon, _)| *icon)
            .unwrap_or(WeatherIcon::Unknown)
    }

    pub fn emoji(self) -> &'static str {
        match self {
            WeatherIcon::Snow => "❄️",
            WeatherIcon::Rain => "🌧",
            WeatherIcon::Clear => "☀️",
            WeatherIcon::Cloudy => "☁️",
            WeatherIcon::Fog => "🌫",
            WeatherIcon::Thunder => "⛈",
            WeatherIcon::Unknown => "🌡",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub location: String,
    pub temperature_celsius: i32,
    pub feels_like_celsius: i32,
    pub description: String,
    pub icon: WeatherIcon,
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    #[serde(default)]
    name: Option<String>,
    main: OwmMain,
    weather: Vec<OwmCondition>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
}

/// Map an OpenWeatherMap "current weather" payload. `location` wins over the
/// API-provided name when non-empty.
pub fn parse_weather(payload: Value, location: &str) -> Result<WeatherReport, FetchError> {
    let rsp: OwmResponse = serde_json::from_value(payload)
        .map_err(|e| FetchError::validation(format!("weather: {e}")))?;

    let description = rsp
        .weather
        .first()
        .map(|c| c.description.trim())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| FetchError::validation("weather: empty conditions"))?;

    if !rsp.main.temp.is_finite() || !rsp.main.feels_like.is_finite() {
        return Err(FetchError::validation("weather: non-finite temperature"));
    }

    let location = if location.trim().is_empty() {
        rsp.name.unwrap_or_default()
    } else {
        location.to_string()
    };

    Ok(WeatherReport {
        location,
        temperature_celsius: rsp.main.temp.round() as i32,
        feels_like_celsius: rsp.main.feels_like.round() as i32,
        description: capitalize_first(description),
        icon: WeatherIcon::from_description(description),
    })
}

pub struct WeatherAdapter {
    transport: Arc<dyn Transport>,
    endpoint: String,
    api_key: String,
    city_query: String,
    city_label: String,
    lang: String,
    retry: RetryPolicy,
}

impl WeatherAdapter {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        city_query: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            city_query: city_query.into(),
            city_label: String::new(),
            lang: "ru".to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.city_label = label.into();
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn try_fetch(&self) -> Result<WeatherReport, FetchError> {
        let query = [
            ("q", self.city_query.as_str()),
            ("appid", self.api_key.as_str()),
            ("units", "metric"),
            ("lang", self.lang.as_str()),
        ];
        let payload = retry(&self.retry, "weather", || {
            self.transport.get_json(&self.endpoint, &query)
        })
        .await?;
        parse_weather(payload, &self.city_label)
    }
}

#[async_trait]
impl SourceAdapter for WeatherAdapter {
    type Output = WeatherReport;

    fn name(&self) -> &'static str {
        "weather"
    }

    async fn fetch(&self, _ctx: &RunContext) -> FetchResult<WeatherReport> {
        FetchResult::from_result(self.name(), WEATHER_FALLBACK, self.try_fetch().await)
    }
}
