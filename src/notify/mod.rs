// src/notify/mod.rs
pub mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;

use crate::retry::Retryable;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("delivery request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("delivery rejected (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },
}

impl Retryable for DeliveryError {
    fn is_retryable(&self) -> bool {
        match self {
            DeliveryError::Transport(_) => true,
            DeliveryError::Rejected { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// One best-effort delivery of a composed message. Implementations do not
/// retry; the pipeline wraps them in the retry executor.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, message: &str) -> Result<(), DeliveryError>;
}

/// Prints the message instead of sending it (`--dry-run`).
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn deliver(&self, message: &str) -> Result<(), DeliveryError> {
        println!("{message}");
        Ok(())
    }
}
