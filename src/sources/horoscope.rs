// src/sources/horoscope.rs
//! Daily horoscope: remote XML export first, canned phrase as a fallback.
//!
//! The section is never empty. Any failure of the remote feed (transport,
//! status, malformed XML, missing sign, blank text) falls through to a phrase
//! picked by day of month, so the adapter always returns `Success`.

use async_trait::async_trait;
use chrono::Datelike;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::{FetchResult, RunContext, SourceAdapter};
use crate::http::{FetchError, Transport};
use crate::retry::{retry, RetryPolicy};
use crate::text::{cap_chars, clean_text};

pub const HOROSCOPE_CAP: usize = 450;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl ZodiacSign {
    pub const ALL: [ZodiacSign; 12] = [
        ZodiacSign::Aries,
        ZodiacSign::Taurus,
        ZodiacSign::Gemini,
        ZodiacSign::Cancer,
        ZodiacSign::Leo,
        ZodiacSign::Virgo,
        ZodiacSign::Libra,
        ZodiacSign::Scorpio,
        ZodiacSign::Sagittarius,
        ZodiacSign::Capricorn,
        ZodiacSign::Aquarius,
        ZodiacSign::Pisces,
    ];

    /// Lower-case English name; also the element name in the XML export.
    pub fn key(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "aries",
            ZodiacSign::Taurus => "taurus",
            ZodiacSign::Gemini => "gemini",
            ZodiacSign::Cancer => "cancer",
            ZodiacSign::Leo => "leo",
            ZodiacSign::Virgo => "virgo",
            ZodiacSign::Libra => "libra",
            ZodiacSign::Scorpio => "scorpio",
            ZodiacSign::Sagittarius => "sagittarius",
            ZodiacSign::Capricorn => "capricorn",
            ZodiacSign::Aquarius => "aquarius",
            ZodiacSign::Pisces => "pisces",
        }
    }

    pub fn label_ru(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Овен",
            ZodiacSign::Taurus => "Телец",
            ZodiacSign::Gemini => "Близнецы",
            ZodiacSign::Cancer => "Рак",
            ZodiacSign::Leo => "Лев",
            ZodiacSign::Virgo => "Дева",
            ZodiacSign::Libra => "Весы",
            ZodiacSign::Scorpio => "Скорпион",
            ZodiacSign::Sagittarius => "Стрелец",
            ZodiacSign::Capricorn => "Козерог",
            ZodiacSign::Aquarius => "Водолей",
            ZodiacSign::Pisces => "Рыбы",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "♈",
            ZodiacSign::Taurus => "♉",
            ZodiacSign::Gemini => "♊",
            ZodiacSign::Cancer => "♋",
            ZodiacSign::Leo => "♌",
            ZodiacSign::Virgo => "♍",
            ZodiacSign::Libra => "♎",
            ZodiacSign::Scorpio => "♏",
            ZodiacSign::Sagittarius => "♐",
            ZodiacSign::Capricorn => "♑",
            ZodiacSign::Aquarius => "♒",
            ZodiacSign::Pisces => "♓",
        }
    }
}

impl fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ZodiacSign {
    type Err = String;

    /// Accepts English keys and Russian labels, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        ZodiacSign::ALL
            .into_iter()
            .find(|z| z.key() == needle || z.label_ru().to_lowercase() == needle)
            .ok_or_else(|| format!("unknown zodiac sign `{}`", s.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoroscopeText {
    pub sign: ZodiacSign,
    body: String,
}

impl HoroscopeText {
    /// Trims and caps `body` at [`HOROSCOPE_CAP`] characters.
    pub fn new(sign: ZodiacSign, body: &str) -> Self {
        Self {
            sign,
            body: cap_chars(body, HOROSCOPE_CAP),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

const CANNED_PHRASES: &[&str] = &[
    "Хороший день, чтобы довести до конца давно начатое дело.",
    "Звёзды советуют не торопиться с выводами и больше слушать.",
    "День благоприятен для новых знакомств и неожиданных идей.",
    "Стоит уделить внимание здоровью и выкроить время на прогулку.",
    "Финансовые вопросы решатся проще, чем кажется на первый взгляд.",
    "Прислушайтесь к интуиции: она сегодня особенно точна.",
    "Удачное время, чтобы навести порядок в делах и мыслях.",
    "Близкие люди оценят вашу заботу и внимание.",
    "Не бойтесь просить о помощи: вас поддержат.",
    "Сегодня важна последовательность, а не скорость.",
    "Небольшой риск оправдан, если он продуман заранее.",
    "Вечер лучше провести спокойно и набраться сил.",
];

/// Deterministic offline horoscope keyed by day of month.
pub fn canned_phrase(ctx: &RunContext) -> &'static str {
    CANNED_PHRASES[ctx.date.day() as usize % CANNED_PHRASES.len()]
}

/// Pull `<{sign}><today>…</today></{sign}>` out of a daily XML export.
pub fn extract_today(xml: &str, sign: ZodiacSign) -> Result<String, FetchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let sign_tag = sign.key().as_bytes();
    let mut in_sign = false;
    let mut in_today = false;
    let mut raw = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                if name.as_ref() == sign_tag {
                    in_sign = true;
                } else if in_sign && name.as_ref() == b"today" {
                    in_today = true;
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if in_today && name.as_ref() == b"today" {
                    break;
                }
                if name.as_ref() == sign_tag {
                    in_sign = false;
                }
            }
            Ok(Event::Text(t)) if in_today => {
                let text = t
                    .unescape()
                    .map_err(|e| FetchError::validation(format!("horoscope: {e}")))?;
                raw.push_str(&text);
                raw.push(' ');
            }
            Ok(Event::CData(c)) if in_today => {
                raw.push_str(&String::from_utf8_lossy(&c));
                raw.push(' ');
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchError::validation(format!("horoscope xml: {e}"))),
            _ => {}
        }
    }

    let text = clean_text(&raw);
    if text.is_empty() {
        return Err(FetchError::validation(format!(
            "horoscope: no text for `{sign}`"
        )));
    }
    Ok(text)
}

pub struct HoroscopeAdapter {
    transport: Arc<dyn Transport>,
    feed_url: Option<String>,
    sign: ZodiacSign,
    retry: RetryPolicy,
}

impl HoroscopeAdapter {
    /// `feed_url = None` uses canned phrases only.
    pub fn new(transport: Arc<dyn Transport>, sign: ZodiacSign, feed_url: Option<String>) -> Self {
        Self {
            transport,
            feed_url,
            sign,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn try_remote(&self, url: &str) -> Result<String, FetchError> {
        let xml = retry(&self.retry, "horoscope", || self.transport.get_text(url)).await?;
        extract_today(&xml, self.sign)
    }
}

#[async_trait]
impl SourceAdapter for HoroscopeAdapter {
    type Output = HoroscopeText;

    fn name(&self) -> &'static str {
        "horoscope"
    }

    async fn fetch(&self, ctx: &RunContext) -> FetchResult<HoroscopeText> {
        if let Some(url) = self.feed_url.as_deref() {
            match self.try_remote(url).await {
                Ok(body) => return FetchResult::Success(HoroscopeText::new(self.sign, &body)),
                Err(e) => {
                    tracing::warn!(source = self.name(), error = %e, "remote horoscope failed, using canned phrase");
                }
            }
        }
        FetchResult::Success(HoroscopeText::new(self.sign, canned_phrase(ctx)))
    }
}
