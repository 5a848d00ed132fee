// src/sources/rates.rs
use async_trait::async_trait;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

use super::{FetchResult, RunContext, SourceAdapter};
use crate::http::{FetchError, Transport};
use crate::retry::{retry, RetryPolicy};

pub const RATES_FALLBACK: &str = "Курсы недоступны";

pub const FIAT_DECIMALS: usize = 2;
pub const BTC_DECIMALS: usize = 0;

/// Currency the BTC price is quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceCurrency {
    #[default]
    Local,
    Usd,
}

impl FromStr for ReferenceCurrency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "" => Ok(ReferenceCurrency::Local),
            "usd" => Ok(ReferenceCurrency::Usd),
            other => Err(format!("expected `local` or `usd`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub usd_to_local: f64,
    pub eur_to_local: f64,
    pub btc_to_reference: f64,
    pub reference_currency: ReferenceCurrency,
    /// ISO code, e.g. `RUB`.
    pub local_currency: String,
}

impl RateQuote {
    /// Values are rounded to display precision here, once.
    pub fn new(
        usd_to_local: f64,
        eur_to_local: f64,
        btc_to_reference: f64,
        reference_currency: ReferenceCurrency,
        local_currency: impl Into<String>,
    ) -> Self {
        Self {
            usd_to_local: round_to(usd_to_local, FIAT_DECIMALS),
            eur_to_local: round_to(eur_to_local, FIAT_DECIMALS),
            btc_to_reference: round_to(btc_to_reference, BTC_DECIMALS),
            reference_currency,
            local_currency: local_currency.into(),
        }
    }

    pub fn local_symbol(&self) -> &str {
        currency_symbol(&self.local_currency)
    }

    pub fn btc_symbol(&self) -> &str {
        match self.reference_currency {
            ReferenceCurrency::Local => self.local_symbol(),
            ReferenceCurrency::Usd => "$",
        }
    }
}

pub fn currency_symbol(code: &str) -> &str {
    match code {
        "RUB" => "₽",
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "UAH" => "₴",
        "KZT" => "₸",
        other => other,
    }
}

fn round_to(v: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (v * factor).round() / factor
}

/// Fixed decimals, thousands grouped with a space: `91234.5` → `91 234.50`.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(*ch);
    }

    let mut out = String::new();
    if value < 0.0 && raw.chars().any(|c| c != '0' && c != '.') {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(f) = frac_part {
        out.push('.');
        out.push_str(f);
    }
    out
}

fn positive(v: Option<f64>, what: &str) -> Result<f64, FetchError> {
    match v {
        Some(x) if x.is_finite() && x > 0.0 => Ok(x),
        Some(x) => Err(FetchError::validation(format!("rates: {what} = {x}"))),
        None => Err(FetchError::validation(format!("rates: missing {what}"))),
    }
}

/// `(usd_to_local, eur_to_local)` from a USD-based `rates` table.
pub fn parse_fiat(payload: &Value, local: &str) -> Result<(f64, f64), FetchError> {
    let rates = payload
        .get("rates")
        .ok_or_else(|| FetchError::validation("rates: missing `rates`"))?;
    let usd_local = positive(rates.get(local).and_then(Value::as_f64), local)?;
    let usd_eur = positive(rates.get("EUR").and_then(Value::as_f64), "EUR")?;
    Ok((usd_local, usd_local / usd_eur))
}

/// `bitcoin.{vs}` from a coingecko `simple/price` payload.
pub fn parse_crypto(payload: &Value, vs: &str) -> Result<f64, FetchError> {
    positive(
        payload
            .get("bitcoin")
            .and_then(|b| b.get(vs))
            .and_then(Value::as_f64),
        &format!("bitcoin.{vs}"),
    )
}

pub struct RatesAdapter {
    transport: Arc<dyn Transport>,
    fiat_url: String,
    crypto_url: String,
    local_currency: String,
    reference: ReferenceCurrency,
    access_key: Option<String>,
    retry: RetryPolicy,
}

impl RatesAdapter {
    pub fn new(
        transport: Arc<dyn Transport>,
        fiat_url: impl Into<String>,
        crypto_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            fiat_url: fiat_url.into(),
            crypto_url: crypto_url.into(),
            local_currency: "RUB".to_string(),
            reference: ReferenceCurrency::Local,
            access_key: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_local_currency(mut self, code: impl Into<String>) -> Self {
        self.local_currency = code.into().to_ascii_uppercase();
        self
    }

    pub fn with_reference(mut self, reference: ReferenceCurrency) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_access_key(mut self, key: Option<String>) -> Self {
        self.access_key = key;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn try_fetch(&self) -> Result<RateQuote, FetchError> {
        let symbols = format!("{},EUR", self.local_currency);
        let mut fiat_query = vec![("base", "USD"), ("symbols", symbols.as_str())];
        if let Some(key) = self.access_key.as_deref() {
            fiat_query.push(("access_key", key));
        }
        let fiat = retry(&self.retry, "rates.fiat", || {
            self.transport.get_json(&self.fiat_url, &fiat_query)
        })
        .await?;
        let (usd, eur) = parse_fiat(&fiat, &self.local_currency)?;

        let vs = match self.reference {
            ReferenceCurrency::Local => self.local_currency.to_ascii_lowercase(),
            ReferenceCurrency::Usd => "usd".to_string(),
        };
        let crypto_query = [("ids", "bitcoin"), ("vs_currencies", vs.as_str())];
        let crypto = retry(&self.retry, "rates.crypto", || {
            self.transport.get_json(&self.crypto_url, &crypto_query)
        })
        .await?;
        let btc = parse_crypto(&crypto, &vs)?;

        Ok(RateQuote::new(
            usd,
            eur,
            btc,
            self.reference,
            self.local_currency.clone(),
        ))
    }
}

#[async_trait]
impl SourceAdapter for RatesAdapter {
    type Output = RateQuote;

    fn name(&self) -> &'static str {
        "rates"
    }

    /// Both calls must succeed; a half-filled quote is never returned.
    async fn fetch(&self, _ctx: &RunContext) -> FetchResult<RateQuote> {
        FetchResult::from_result(self.name(), RATES_FALLBACK, self.try_fetch().await)
    }
}
