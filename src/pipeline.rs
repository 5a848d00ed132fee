// src/pipeline.rs
//! One digest run: fetch every section in a fixed order, compose, deliver.
//!
//! Adapters degrade internally, so the orchestrator never handles their
//! failures. Only delivery can fail a run.

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::compose::{compose, ComposeOptions, Digest};
use crate::config::DigestConfig;
use crate::http::Transport;
use crate::notify::Notifier;
use crate::retry::{retry, RetryPolicy};
use crate::sources::horoscope::{HoroscopeAdapter, HoroscopeText};
use crate::sources::news::{NewsAdapter, NewsDigest};
use crate::sources::rates::{RateQuote, RatesAdapter};
use crate::sources::weather::{WeatherAdapter, WeatherReport};
use crate::sources::{RunContext, SourceAdapter};

pub type WeatherSource = Box<dyn SourceAdapter<Output = WeatherReport>>;
pub type RatesSource = Box<dyn SourceAdapter<Output = RateQuote>>;
pub type HoroscopeSource = Box<dyn SourceAdapter<Output = HoroscopeText>>;
pub type NewsSource = Box<dyn SourceAdapter<Output = NewsDigest>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub digest: Digest,
    /// Names of sections that fell back to placeholder text.
    pub degraded: Vec<&'static str>,
}

pub struct DigestPipeline {
    weather: WeatherSource,
    rates: RatesSource,
    horoscope: HoroscopeSource,
    news: NewsSource,
    notifier: Box<dyn Notifier>,
    options: ComposeOptions,
    delivery_retry: RetryPolicy,
}

impl DigestPipeline {
    pub fn new(
        weather: WeatherSource,
        rates: RatesSource,
        horoscope: HoroscopeSource,
        news: NewsSource,
        notifier: Box<dyn Notifier>,
        options: ComposeOptions,
    ) -> Self {
        Self {
            weather,
            rates,
            horoscope,
            news,
            notifier,
            options,
            delivery_retry: RetryPolicy::default(),
        }
    }

    pub fn with_delivery_retry(mut self, retry: RetryPolicy) -> Self {
        self.delivery_retry = retry;
        self
    }

    /// Wire the real adapters over one shared transport.
    pub fn from_config(
        cfg: &DigestConfig,
        transport: Arc<dyn Transport>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let weather = WeatherAdapter::new(
            transport.clone(),
            cfg.endpoints.weather.clone(),
            cfg.weather_key.clone(),
            cfg.city_query.clone(),
        )
        .with_label(cfg.city_label.clone())
        .with_lang(cfg.weather_lang.clone())
        .with_retry(cfg.retry);

        let rates = RatesAdapter::new(
            transport.clone(),
            cfg.endpoints.fx.clone(),
            cfg.endpoints.crypto.clone(),
        )
        .with_local_currency(cfg.local_currency.clone())
        .with_reference(cfg.btc_reference)
        .with_access_key(cfg.fx_api_key.clone())
        .with_retry(cfg.retry);

        let horoscope =
            HoroscopeAdapter::new(transport.clone(), cfg.zodiac_sign, cfg.horoscope_feed.clone())
                .with_retry(cfg.retry);

        let news = NewsAdapter::new(transport, cfg.news_outlets.clone())
            .with_filter(cfg.news_filter.clone())
            .with_max_items(cfg.news_max_items)
            .with_retry(cfg.retry);

        let options = ComposeOptions {
            city_label: cfg.city_label.clone(),
            sign: cfg.zodiac_sign,
        };

        Self::new(
            Box::new(weather),
            Box::new(rates),
            Box::new(horoscope),
            Box::new(news),
            notifier,
            options,
        )
        .with_delivery_retry(cfg.retry)
    }

    /// Fetch all sections sequentially (weather, rates, horoscope, news) and
    /// compose. Always produces a digest.
    pub async fn build_digest(&self, ctx: &RunContext) -> RunReport {
        let weather = self.weather.fetch(ctx).await;
        let rates = self.rates.fetch(ctx).await;
        let horoscope = self.horoscope.fetch(ctx).await;
        let news = self.news.fetch(ctx).await;

        let degraded: Vec<&'static str> = [
            (self.weather.name(), weather.is_degraded()),
            (self.rates.name(), rates.is_degraded()),
            (self.horoscope.name(), horoscope.is_degraded()),
            (self.news.name(), news.is_degraded()),
        ]
        .into_iter()
        .filter_map(|(name, d)| d.then_some(name))
        .collect();

        let digest = compose(ctx.date, &weather, &rates, &horoscope, &news, &self.options);
        info!(
            date = %ctx.date,
            degraded = ?degraded,
            chars = digest.as_str().chars().count(),
            "digest composed"
        );
        RunReport { digest, degraded }
    }

    /// Build the digest and hand it to the notifier. Delivery is retried
    /// per `delivery_retry`; a final delivery failure fails the run.
    pub async fn run(&self, ctx: &RunContext) -> Result<RunReport> {
        let t0 = Instant::now();
        let report = self.build_digest(ctx).await;

        let delivered = retry(&self.delivery_retry, self.notifier.name(), || {
            self.notifier.deliver(report.digest.as_str())
        })
        .await;
        histogram!("digest_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if let Err(e) = delivered {
            counter!("digest_delivery_failures_total").increment(1);
            error!(notifier = self.notifier.name(), error = %e, "digest not delivered");
            return Err(e).with_context(|| format!("delivering digest via {}", self.notifier.name()));
        }
        Ok(report)
    }
}
