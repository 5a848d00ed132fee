// src/compose.rs
//! Digest composition for Telegram's HTML parse mode.
//!
//! Everything that did not come from a literal in this file (feed text,
//! degraded placeholders, configured city) goes through [`esc`] exactly once.
//! Literals use only `<b>` and `<a>` as markup and contain no other reserved
//! characters, so they are never escaped.

use chrono::NaiveDate;
use std::fmt;

use crate::sources::horoscope::{HoroscopeText, ZodiacSign};
use crate::sources::news::{NewsDigest, NEWS_FALLBACK};
use crate::sources::rates::{format_grouped, RateQuote, BTC_DECIMALS, FIAT_DECIMALS};
use crate::sources::weather::{WeatherIcon, WeatherReport};
use crate::sources::FetchResult;

pub const DATE_FORMAT: &str = "%d.%m.%Y";
const SECTION_SEPARATOR: &str = "\n\n";
const NEWS_HEADER: &str = "🗞 <b>Новости</b>";

/// Telegram's `sendMessage` limit, in UTF-16 code units. Counting the raw
/// HTML (tags included) over-estimates the parsed text, so staying under it
/// is always safe.
pub const MAX_MESSAGE_LEN: usize = 4096;

fn telegram_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Fixed configuration the composer needs besides the section outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeOptions {
    pub city_label: String,
    pub sign: ZodiacSign,
}

/// The final message of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest(String);

impl Digest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn esc(s: &str) -> String {
    html_escape::encode_text(s).into_owned()
}

fn esc_attr(s: &str) -> String {
    html_escape::encode_double_quoted_attribute(s).into_owned()
}

pub fn render_greeting(date: NaiveDate) -> String {
    format!("☀️ <b>Доброе утро!</b> ({})", date.format(DATE_FORMAT))
}

pub fn render_weather(weather: &FetchResult<WeatherReport>, opts: &ComposeOptions) -> String {
    match weather {
        FetchResult::Success(w) => {
            let location = if w.location.is_empty() {
                &opts.city_label
            } else {
                &w.location
            };
            format!(
                "{} <b>{}</b>\n{}°C, {}\nОщущается как {}°C",
                w.icon.emoji(),
                esc(location),
                w.temperature_celsius,
                esc(&w.description),
                w.feels_like_celsius
            )
        }
        FetchResult::Degraded(text) => format!(
            "{} <b>{}</b>\n{}",
            WeatherIcon::Unknown.emoji(),
            esc(&opts.city_label),
            esc(text)
        ),
    }
}

pub fn render_rates(rates: &FetchResult<RateQuote>) -> String {
    let body = match rates {
        FetchResult::Success(q) => {
            let sym = esc(q.local_symbol());
            format!(
                "USD — {} {sym}\nEUR — {} {sym}\nBTC — {} {}",
                format_grouped(q.usd_to_local, FIAT_DECIMALS),
                format_grouped(q.eur_to_local, FIAT_DECIMALS),
                format_grouped(q.btc_to_reference, BTC_DECIMALS),
                esc(q.btc_symbol()),
            )
        }
        FetchResult::Degraded(text) => esc(text),
    };
    format!("💱 <b>Курсы</b>\n{body}")
}

pub fn render_horoscope(horoscope: &FetchResult<HoroscopeText>, opts: &ComposeOptions) -> String {
    let body = match horoscope {
        FetchResult::Success(h) => esc(h.body()),
        FetchResult::Degraded(text) => esc(text),
    };
    format!(
        "{} <b>Гороскоп · {}</b>\n{body}",
        opts.sign.symbol(),
        opts.sign.label_ru()
    )
}

pub fn render_news(news: &FetchResult<NewsDigest>) -> String {
    render_news_within(news, usize::MAX)
}

/// News section no longer than `budget` UTF-16 units. Headlines are kept in
/// order until the next one would not fit; if none fits the section shows
/// the no-news placeholder.
pub fn render_news_within(news: &FetchResult<NewsDigest>, budget: usize) -> String {
    let mut out = String::from(NEWS_HEADER);
    match news {
        FetchResult::Success(d) => {
            let mut shown = 0;
            for (i, item) in d.items.iter().enumerate() {
                let line = format!(
                    "\n{}. <a href=\"{}\">{}</a>",
                    i + 1,
                    esc_attr(&item.link),
                    esc(&item.title)
                );
                if telegram_len(&out) + telegram_len(&line) > budget {
                    break;
                }
                out.push_str(&line);
                shown += 1;
            }
            if shown == 0 {
                out.push('\n');
                out.push_str(&esc(NEWS_FALLBACK));
            }
        }
        FetchResult::Degraded(text) => {
            out.push('\n');
            out.push_str(&esc(text));
        }
    }
    out
}

pub const SIGN_OFF: &str = "Хорошего дня!";

/// Assemble the digest. Pure; section order and headers are fixed and a
/// degraded section keeps its header.
pub fn compose(
    date: NaiveDate,
    weather: &FetchResult<WeatherReport>,
    rates: &FetchResult<RateQuote>,
    horoscope: &FetchResult<HoroscopeText>,
    news: &FetchResult<NewsDigest>,
    opts: &ComposeOptions,
) -> Digest {
    let head = [
        render_greeting(date),
        render_weather(weather, opts),
        render_rates(rates),
        render_horoscope(horoscope, opts),
    ]
    .join(SECTION_SEPARATOR);

    // News is the only unbounded section; it gets whatever room is left.
    let fixed =
        telegram_len(&head) + 2 * telegram_len(SECTION_SEPARATOR) + telegram_len(SIGN_OFF);
    let news = render_news_within(news, MAX_MESSAGE_LEN.saturating_sub(fixed));

    Digest([head, news, SIGN_OFF.to_string()].join(SECTION_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::news::NewsItem;
    use crate::sources::rates::ReferenceCurrency;

    fn opts() -> ComposeOptions {
        ComposeOptions {
            city_label: "Москва".into(),
            sign: ZodiacSign::Aries,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn full_digest_layout() {
        let weather = FetchResult::Success(WeatherReport {
            location: "Москва".into(),
            temperature_celsius: -3,
            feels_like_celsius: -7,
            description: "Небольшой снег".into(),
            icon: WeatherIcon::Snow,
        });
        let rates = FetchResult::Success(RateQuote::new(
            91.234,
            98.1,
            6_123_456.0,
            ReferenceCurrency::Local,
            "RUB",
        ));
        let horoscope = FetchResult::Success(HoroscopeText::new(ZodiacSign::Aries, "Удачный день."));
        let news = FetchResult::Success(NewsDigest {
            items: vec![NewsItem {
                title: "Банк России сохранил ставку".into(),
                link: "https://www.rbc.ru/finances/1".into(),
                source: "RBC".into(),
            }],
        });

        let d = compose(date(), &weather, &rates, &horoscope, &news, &opts());
        let expected = "☀️ <b>Доброе утро!</b> (19.10.2026)\n\n\
❄️ <b>Москва</b>\n-3°C, Небольшой снег\nОщущается как -7°C\n\n\
💱 <b>Курсы</b>\nUSD — 91.23 ₽\nEUR — 98.10 ₽\nBTC — 6 123 456 ₽\n\n\
♈ <b>Гороскоп · Овен</b>\nУдачный день.\n\n\
🗞 <b>Новости</b>\n1. <a href=\"https://www.rbc.ru/finances/1\">Банк России сохранил ставку</a>\n\n\
Хорошего дня!";
        assert_eq!(d.as_str(), expected);
    }

    #[test]
    fn reserved_characters_escaped_once_in_feed_text_only() {
        let news = FetchResult::Success(NewsDigest {
            items: vec![NewsItem {
                title: "S&P <500> падает *снова* & ещё_раз".into(),
                link: "https://x.test/a?b=1&c=\"2\"".into(),
                source: "X".into(),
            }],
        });
        let out = render_news(&news);
        assert!(out.contains("S&amp;P &lt;500&gt; падает *снова* &amp; ещё_раз"));
        assert!(out.contains("href=\"https://x.test/a?b=1&amp;c=&quot;2&quot;\""));
        assert!(!out.contains("&amp;amp;"));
        // template markup untouched
        assert!(out.starts_with("🗞 <b>Новости</b>\n1. <a href="));
    }

    #[test]
    fn date_is_not_escaped() {
        assert_eq!(
            render_greeting(date()),
            "☀️ <b>Доброе утро!</b> (19.10.2026)"
        );
    }

    #[test]
    fn degraded_sections_keep_headers() {
        let d = compose(
            date(),
            &FetchResult::Degraded("Погода недоступна".into()),
            &FetchResult::Degraded("Курсы недоступны".into()),
            &FetchResult::Degraded("—".into()),
            &FetchResult::Degraded("Сегодня без громких новостей".into()),
            &opts(),
        );
        let s = d.as_str();
        assert!(s.contains("🌡 <b>Москва</b>\nПогода недоступна"));
        assert!(s.contains("💱 <b>Курсы</b>\nКурсы недоступны"));
        assert!(s.contains("♈ <b>Гороскоп · Овен</b>\n—"));
        assert!(s.contains("🗞 <b>Новости</b>\nСегодня без громких новостей"));
        assert!(s.ends_with(SIGN_OFF));
    }

    fn long_news(n: usize) -> FetchResult<NewsDigest> {
        FetchResult::Success(NewsDigest {
            items: (1..=n)
                .map(|i| NewsItem {
                    title: format!("{i} {}", "очень длинный заголовок & ".repeat(4)),
                    link: format!("https://www.rbc.ru/economics/{i}"),
                    source: "RBC".into(),
                })
                .collect(),
        })
    }

    #[test]
    fn oversized_news_is_cut_to_message_limit() {
        let d = compose(
            date(),
            &FetchResult::Degraded("Погода недоступна".into()),
            &FetchResult::Degraded("Курсы недоступны".into()),
            &FetchResult::Success(HoroscopeText::new(ZodiacSign::Aries, &"ы".repeat(600))),
            &long_news(40),
            &opts(),
        );
        let s = d.as_str();
        assert!(s.encode_utf16().count() <= MAX_MESSAGE_LEN);
        assert!(s.contains("\n1. <a href=\"https://www.rbc.ru/economics/1\">"));
        assert!(!s.contains("economics/40\""));
        assert!(s.ends_with("</a>\n\nХорошего дня!"));
    }

    #[test]
    fn news_budget_keeps_whole_lines_or_placeholder() {
        let news = long_news(3);
        let full = render_news(&news);
        let first_two = full.rsplit_once("\n3. ").map(|(head, _)| head).unwrap();

        let cut = render_news_within(&news, first_two.encode_utf16().count());
        assert_eq!(cut, first_two);

        let none = render_news_within(&news, 10);
        assert_eq!(none, format!("{NEWS_HEADER}\n{NEWS_FALLBACK}"));
    }
}
