// src/sources/mod.rs
pub mod horoscope;
pub mod news;
pub mod rates;
pub mod weather;

use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::counter;
use std::fmt::Display;

/// Per-run inputs shared by every adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub date: NaiveDate,
}

impl RunContext {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }
}

/// Outcome of one adapter call. `Degraded` carries a fixed, non-empty
/// placeholder that the composer substitutes for the section body.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult<T> {
    Success(T),
    Degraded(String),
}

impl<T> FetchResult<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, FetchResult::Degraded(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            FetchResult::Success(v) => Some(v),
            FetchResult::Degraded(_) => None,
        }
    }

    /// Map a fallible fetch into a section outcome, logging the cause on
    /// failure.
    pub fn from_result<E: Display>(source: &'static str, fallback: &str, res: Result<T, E>) -> Self {
        match res {
            Ok(v) => FetchResult::Success(v),
            Err(e) => {
                tracing::warn!(source, error = %e, "source degraded");
                counter!("digest_source_degraded_total").increment(1);
                FetchResult::Degraded(fallback.to_string())
            }
        }
    }
}

/// One external feed. Implementations never fail: every expected error is
/// turned into [`FetchResult::Degraded`] inside `fetch`.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    type Output: Send;

    fn name(&self) -> &'static str;

    async fn fetch(&self, ctx: &RunContext) -> FetchResult<Self::Output>;
}
