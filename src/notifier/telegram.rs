use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use crate::app::Result;
use crate::domain::Item;
use crate::notifier::format::{render_message, selected};
use crate::notifier::Notifier;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

/// Sends notifications through the Telegram Bot API.
///
/// Without a bot token and channel id every notification is rendered as a
/// preview on stdout instead.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: Option<String>,
    channel_id: Option<String>,
    footer: Option<String>,
}

impl TelegramNotifier {
    pub fn new(
        bot_token: Option<String>,
        channel_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            bot_token: bot_token.filter(|t| !t.trim().is_empty()),
            channel_id: channel_id.filter(|c| !c.trim().is_empty()),
            footer: None,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_footer(mut self, footer: Option<String>) -> Self {
        self.footer = footer;
        self
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.bot_token.as_deref()?, self.channel_id.as_deref()?))
    }

    fn preview(&self, message: &str, count: usize) {
        let rule = "=".repeat(50);
        println!("\n{}", rule);
        println!("DRY RUN - Telegram Notification Preview:");
        println!("{}", rule);
        println!("{}", message);
        println!("{}", rule);
        info!("DRY RUN: Would notify about {} products", count);
    }

    async fn send(&self, token: &str, chat_id: &str, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let payload = SendMessage {
            chat_id,
            text: message,
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };

        // the token is part of the URL, keep it out of error messages
        self.client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?
            .error_for_status()
            .map_err(reqwest::Error::without_url)?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, items: &[Item], force_all: bool, preview_only: bool) -> bool {
        let Some(message) = render_message(items, force_all, self.footer.as_deref()) else {
            return true;
        };
        let count = selected(items, force_all).len();

        let (token, chat_id) = match (preview_only, self.credentials()) {
            (false, Some(credentials)) => credentials,
            _ => {
                self.preview(&message, count);
                return true;
            }
        };

        match self.send(token, chat_id, &message).await {
            Ok(()) => {
                info!("Notification sent for {} products", count);
                true
            }
            Err(e) => {
                error!("Failed to send Telegram notification: {}", e);
                false
            }
        }
    }
}
