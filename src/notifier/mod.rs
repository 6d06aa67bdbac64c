pub mod format;
mod telegram;

pub use telegram::{TelegramNotifier, DEFAULT_API_BASE};

use async_trait::async_trait;

use crate::domain::Item;

/// Delivers a batch of items to a channel.
///
/// Delivery never fails the run: problems are logged and reported as `false`.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// `force_all` reports every item as a status report instead of only the
    /// available ones; `preview_only` renders without sending.
    async fn notify(&self, items: &[Item], force_all: bool, preview_only: bool) -> bool;
}
