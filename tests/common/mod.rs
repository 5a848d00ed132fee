// tests/common/mod.rs
// Scripted transport and recording notifier shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use morning_digest::http::{FetchError, Transport};
use morning_digest::notify::{DeliveryError, Notifier};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Text(String),
    Status(u16),
}

/// Answers per URL from a queue; the last reply repeats once the queue is
/// down to one. Unknown URLs answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, url: &str, replies: Vec<Reply>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into());
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn next(&self, url: &str) -> Reply {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let mut script = self.script.lock().unwrap();
        match script.get_mut(url) {
            Some(q) if q.len() > 1 => q.pop_front().unwrap(),
            Some(q) => q.front().cloned().unwrap_or(Reply::Status(404)),
            None => Reply::Status(404),
        }
    }
}

fn status(url: &str, status: u16) -> FetchError {
    FetchError::Status {
        url: url.to_string(),
        status,
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get_json(&self, url: &str, _query: &[(&str, &str)]) -> Result<Value, FetchError> {
        match self.next(url) {
            Reply::Json(v) => Ok(v),
            Reply::Text(t) => serde_json::from_str(&t)
                .map_err(|e| FetchError::validation(format!("{url}: malformed json: {e}"))),
            Reply::Status(s) => Err(status(url, s)),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        match self.next(url) {
            Reply::Json(v) => Ok(v.to_string()),
            Reply::Text(t) => Ok(t),
            Reply::Status(s) => Err(status(url, s)),
        }
    }
}

/// Keeps every delivered message; fails the first `failures` calls with a
/// 502 rejection.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: std::sync::Arc<Mutex<Vec<String>>>,
    failures: Mutex<usize>,
}

impl RecordingNotifier {
    pub fn failing(failures: usize) -> Self {
        Self {
            sent: Default::default(),
            failures: Mutex::new(failures),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn deliver(&self, message: &str) -> Result<(), DeliveryError> {
        {
            let mut left = self.failures.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(DeliveryError::Rejected {
                    status: 502,
                    description: "Bad Gateway".into(),
                });
            }
        }
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// RSS 2.0 document with the given `(title, link)` items.
pub fn rss(items: &[(&str, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(t, l)| format!("<item><title>{t}</title><link>{l}</link></item>"))
        .collect();
    format!(r#"<?xml version="1.0" encoding="utf-8"?><rss version="2.0"><channel><title>t</title>{body}</channel></rss>"#)
}
