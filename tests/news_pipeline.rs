// tests/news_pipeline.rs
mod common;

use common::{rss, Reply, ScriptedTransport};
use morning_digest::dedup::TopicFilter;
use morning_digest::retry::RetryPolicy;
use morning_digest::sources::news::{parse_feed, NewsAdapter, NewsOutlet, NEWS_FALLBACK};
use morning_digest::sources::{FetchResult, RunContext, SourceAdapter};
use std::sync::Arc;
use std::time::Duration;

const A: &str = "https://a.test/rss";
const B: &str = "https://b.test/rss";
const C: &str = "https://c.test/rss";

const FEED_A: [&str; 5] = [
    "Минфин разместил облигации федерального займа",
    "В Петербурге открылась новая станция метро",
    "Росстат зафиксировал замедление инфляции",
    "Аэрофлот запускает рейсы во Владивосток",
    "Сбербанк снизил ставки по ипотеке",
];
const FEED_B: [&str; 5] = [
    "Газпром увеличил поставки газа в Китай",
    "Госдума приняла закон о платформенной занятости",
    "Учёные МГУ представили новый аккумулятор",
    "Цены на бензин выросли третью неделю подряд",
    "Яндекс открыл офис в Казани",
];
const FEED_C: [&str; 5] = [
    "Пенсионный фонд изменил график выплат",
    "Метеорологи обещают раннюю зиму в Сибири",
    "Автоваз возобновил выпуск седанов Веста",
    "Музей Пушкина показал коллекцию импрессионистов",
    "Курс юаня обновил годовой максимум",
];

fn ctx() -> RunContext {
    RunContext::new(chrono::NaiveDate::from_ymd_opt(2026, 10, 19).unwrap())
}

fn fast() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO)
}

fn feed(host: &str, titles: &[&str]) -> Reply {
    let items: Vec<(String, String)> = titles
        .iter()
        .enumerate()
        .map(|(i, t)| (t.to_string(), format!("https://{host}/n/{i}")))
        .collect();
    let refs: Vec<(&str, &str)> = items.iter().map(|(t, l)| (t.as_str(), l.as_str())).collect();
    Reply::Text(rss(&refs))
}

fn outlets() -> Vec<NewsOutlet> {
    vec![
        NewsOutlet::new("A", A),
        NewsOutlet::new("B", B),
        NewsOutlet::new("C", C),
    ]
}

fn three_feeds() -> Arc<ScriptedTransport> {
    Arc::new(
        ScriptedTransport::new()
            .on(A, vec![feed("a.test", &FEED_A)])
            .on(B, vec![feed("b.test", &FEED_B)])
            .on(C, vec![feed("c.test", &FEED_C)]),
    )
}

#[tokio::test]
async fn cap_is_min_of_max_items_and_available() {
    for (max, expected) in [(1usize, 1usize), (5, 5), (7, 7), (15, 15), (40, 15)] {
        let transport = three_feeds();
        let adapter = NewsAdapter::new(transport.clone(), outlets())
            .with_max_items(max)
            .with_retry(fast());

        let digest = match adapter.fetch(&ctx()).await {
            FetchResult::Success(d) => d,
            other => panic!("max={max}: expected success, got {other:?}"),
        };
        assert_eq!(digest.len(), expected, "max={max}");

        // Outlet order, then feed order.
        let expected_titles: Vec<&str> = FEED_A
            .iter()
            .chain(FEED_B.iter())
            .chain(FEED_C.iter())
            .copied()
            .take(expected)
            .collect();
        let got: Vec<&str> = digest.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(got, expected_titles, "max={max}");
    }
}

#[tokio::test]
async fn stops_fetching_once_full() {
    let transport = three_feeds();
    let adapter = NewsAdapter::new(transport.clone(), outlets())
        .with_max_items(5)
        .with_retry(fast());

    let digest = adapter.fetch(&ctx()).await;
    let items = &digest.success().unwrap().items;
    assert!(items.iter().all(|i| i.source == "A"));
    assert_eq!(transport.calls(A), 1);
    assert_eq!(transport.calls(B), 0);
    assert_eq!(transport.calls(C), 0);
}

#[tokio::test]
async fn sport_and_cross_source_duplicates_are_dropped() {
    let b_titles = [
        "Минфин разместил облигации федерального займа на 10 млрд",
        "«Зенит» сыграл вничью в матче РПЛ",
        "Хоккей: СКА обыграл «Динамо»",
        "Яндекс открыл офис в Казани",
    ];
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(A, vec![feed("a.test", &FEED_A[..2])])
            .on(B, vec![feed("b.test", &b_titles)]),
    );
    let adapter = NewsAdapter::new(
        transport,
        vec![NewsOutlet::new("A", A), NewsOutlet::new("B", B)],
    )
    .with_max_items(10)
    .with_retry(fast());

    let digest = adapter.fetch(&ctx()).await;
    let titles: Vec<String> = digest
        .success()
        .unwrap()
        .items
        .iter()
        .map(|i| i.title.clone())
        .collect();
    assert_eq!(
        titles,
        vec![
            FEED_A[0].to_string(),
            FEED_A[1].to_string(),
            "Яндекс открыл офис в Казани".to_string(),
        ]
    );
}

#[tokio::test]
async fn custom_filter_replaces_sport_list() {
    let transport = Arc::new(ScriptedTransport::new().on(
        A,
        vec![feed(
            "a.test",
            &["Хоккей: СКА обыграл Динамо", "Биржа: индекс Мосбиржи вырос"],
        )],
    ));
    let adapter = NewsAdapter::new(transport, vec![NewsOutlet::new("A", A)])
        .with_filter(TopicFilter::new(["биржа"]))
        .with_retry(fast());

    let digest = adapter.fetch(&ctx()).await;
    let items = &digest.success().unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Хоккей: СКА обыграл Динамо");
}

#[tokio::test]
async fn failing_outlet_is_skipped_after_retries() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(A, vec![Reply::Status(503)])
            .on(B, vec![feed("b.test", &FEED_B[..3])]),
    );
    let adapter = NewsAdapter::new(
        transport.clone(),
        vec![NewsOutlet::new("A", A), NewsOutlet::new("B", B)],
    )
    .with_retry(fast());

    let digest = adapter.fetch(&ctx()).await;
    let items = &digest.success().unwrap().items;
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| i.source == "B"));
    assert_eq!(transport.calls(A), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(A, vec![Reply::Status(404)])
            .on(B, vec![Reply::Text("<html>not a feed</html>".into())]),
    );
    let adapter = NewsAdapter::new(
        transport.clone(),
        vec![NewsOutlet::new("A", A), NewsOutlet::new("B", B)],
    )
    .with_retry(fast());

    let digest = adapter.fetch(&ctx()).await;
    assert_eq!(digest, FetchResult::Degraded(NEWS_FALLBACK.to_string()));
    assert_eq!(transport.calls(A), 1);
    assert_eq!(transport.calls(B), 1);
}

#[tokio::test]
async fn only_excluded_headlines_degrade() {
    let transport = Arc::new(ScriptedTransport::new().on(
        A,
        vec![feed("a.test", &["Футбол: итоги тура", "Теннис: финал турнира"])],
    ));
    let adapter = NewsAdapter::new(transport, vec![NewsOutlet::new("A", A)]).with_retry(fast());

    assert!(adapter.fetch(&ctx()).await.is_degraded());
}

#[test]
fn rbc_fixture_parses_and_filters() {
    let xml = std::fs::read_to_string("tests/fixtures/rbc_news.xml").unwrap();
    let raw = parse_feed(&xml).unwrap();
    assert_eq!(raw.len(), 7);
    assert_eq!(raw[5].1, None);

    let mut collector =
        morning_digest::sources::news::NewsCollector::new(TopicFilter::default(), 5);
    for (title, link) in &raw {
        collector.offer("RBC", title.as_deref(), link.as_deref());
    }
    let digest = collector.finish();
    let titles: Vec<&str> = digest.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "ЦБ сохранил ключевую ставку на уровне 16 %",
            "Правительство одобрило \"бюджет\" на 2027 год",
            "Москва & область: метро продлит работу в праздники",
        ]
    );
    assert_eq!(
        digest.items[2].link,
        "https://www.rbc.ru/society/19/10/2026/a6?utm=rss&x=1"
    );
}

#[tokio::test]
async fn items_interleaved_with_channel_metadata_are_all_read() {
    let xml = include_str!("fixtures/interleaved_feed.xml");
    let transport = Arc::new(ScriptedTransport::new().on(A, vec![Reply::Text(xml.to_string())]));
    let adapter = NewsAdapter::new(transport, vec![NewsOutlet::new("Lenta", A)]).with_retry(fast());

    let digest = adapter.fetch(&ctx()).await;
    let titles: Vec<&str> = digest
        .success()
        .unwrap()
        .items
        .iter()
        .map(|i| i.title.as_str())
        .collect();
    assert_eq!(
        titles,
        vec![
            "Минфин разместил облигации федерального займа",
            "Доллар <90 рублей, евро >100",
            "Музей Пушкина показал коллекцию импрессионистов",
        ]
    );
}
