//! Pushover push notifications.
//!
//! API docs: https://pushover.net/api

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{alert_text, Notifier};
use crate::error::PipelineError;
use crate::llm::client::{ChatClient, ChatMessage};
use crate::types::{truncate, Opportunity};

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";

const SOUND: &str = "cashregister";

/// Characters of crafted copy kept before the link is appended.
const MAX_CRAFTED_CHARS: usize = 200;

const COPYWRITER_MAX_TOKENS: u32 = 200;

const COPYWRITER_SYSTEM_PROMPT: &str = "You are given details of a great deal on special offer, \
     and you summarise it in a short message of 2-3 sentences";

pub struct PushoverNotifier {
    http: Client,
    endpoint: String,
    user: SecretString,
    token: SecretString,
    copywriter: Option<Arc<ChatClient>>,
}

impl PushoverNotifier {
    pub fn new(user: SecretString, token: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build Pushover HTTP client")?;
        Ok(Self {
            http,
            endpoint: PUSHOVER_URL.to_string(),
            user,
            token,
            copywriter: None,
        })
    }

    /// Write the push text with a chat model instead of the fixed format.
    pub fn with_copywriter(mut self, copywriter: Arc<ChatClient>) -> Self {
        self.copywriter = Some(copywriter);
        self
    }

    /// Override the API endpoint (for tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn copywriter_messages(opportunity: &Opportunity) -> Vec<ChatMessage> {
        let deal = opportunity.deal();
        let user = format!(
            "Summarize this great deal in 2-3 sentences to be sent as an exciting push notification \
             alerting the user about this deal.\n\
             Item Description: {}\nOffered Price: {:.2}\nEstimated true value: {:.2}\n\n\
             Respond only with the 2-3 sentence message which will be used to alert & excite the \
             user about this deal",
            deal.product_description,
            deal.price,
            opportunity.estimate()
        );
        vec![ChatMessage::system(COPYWRITER_SYSTEM_PROMPT), ChatMessage::user(user)]
    }

    /// Message to push: crafted copy when available, fixed text otherwise.
    async fn message_for(&self, opportunity: &Opportunity) -> String {
        let Some(copywriter) = &self.copywriter else {
            return alert_text(opportunity);
        };
        match copywriter
            .complete_with_limit(&Self::copywriter_messages(opportunity), COPYWRITER_MAX_TOKENS)
            .await
        {
            Ok(copy) if !copy.trim().is_empty() => crafted_text(copy.trim(), opportunity.url()),
            Ok(_) => alert_text(opportunity),
            Err(e) => {
                warn!(error = %e, "Copywriter failed, sending fixed alert text");
                alert_text(opportunity)
            }
        }
    }

    async fn push(&self, message: &str) -> Result<()> {
        let params = [
            ("token", self.token.expose_secret().as_str()),
            ("user", self.user.expose_secret().as_str()),
            ("message", message),
            ("sound", SOUND),
        ];
        let resp = self
            .http
            .post(&self.endpoint)
            .form(&params)
            .send()
            .await
            .context("Pushover request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Pushover returned HTTP {status}: {body}");
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn alert(&self, opportunity: &Opportunity) -> Result<(), PipelineError> {
        let message = self.message_for(opportunity).await;
        debug!(chars = message.chars().count(), "Sending push notification");
        self.push(&message)
            .await
            .map_err(|e| PipelineError::DeliveryFailure(format!("{e:#}")))?;
        info!(url = %opportunity.url(), "Push notification sent");
        Ok(())
    }
}

fn crafted_text(copy: &str, url: &str) -> String {
    format!("{}... {}", truncate(copy, MAX_CRAFTED_CHARS), url)
}
