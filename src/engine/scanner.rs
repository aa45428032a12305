//! Deal scanner.
//!
//! Pulls the configured RSS deal feeds concurrently, drops anything the
//! caller has already surfaced, and curates the remaining entries into
//! priced deals. Curation uses a chat model when one is configured and
//! falls back to extracting the advertised `$` price from the text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::feed::{extract_offer_price, parse_items};
use crate::error::PipelineError;
use crate::llm::client::{ChatClient, ChatMessage};
use crate::types::{Deal, DealSelection, Memory, ScrapedDeal};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Abstraction over deal sources.
///
/// `scan` returns the new deals not present in `memory`. An empty
/// selection means nothing new was found; an error means the source
/// itself could not be read.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DealSource: Send + Sync {
    async fn scan(&self, memory: &Memory) -> Result<DealSelection, PipelineError>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Deals the curator is asked to pick per scan.
const CURATED_DEALS: usize = 5;

/// Output budget for the curator's JSON reply.
const CURATOR_MAX_TOKENS: u32 = 2000;

/// Description length used when building a deal from raw feed text.
const MAX_DESCRIPTION_CHARS: usize = 600;

const CURATOR_SYSTEM_PROMPT: &str = "You identify and summarize the 5 most detailed deals from a list, \
     by selecting deals that have the most detailed, high quality description and the most clear price. \
     Respond strictly in JSON with no explanation, using this format. You should provide the price as a \
     number derived from the description. If the price of a deal isn't clear, do not include that deal \
     in your response. Most important is that you respond with the 5 deals that have the most detailed \
     product description with price. It's not important to mention the terms of the deal; most important \
     is a thorough description of the product.\n\
     Be careful with products that are described as \"$XXX off\" or \"reduced by $XXX\" - this isn't the \
     actual price of the product. Only respond with products when you are highly confident about the price.\n\n\
     {\"deals\": [{\"product_description\": \"Your clearly expressed summary of the product in 4-5 sentences. \
     Details of the item are much more important than why it's a good deal. Avoid mentioning discounts and \
     coupons; focus on the item itself.\", \"price\": 99.99, \"url\": \"the url as provided\"}]}";

// ---------------------------------------------------------------------------
// Curator reply
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CuratedDeals {
    #[serde(default)]
    deals: Vec<Deal>,
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

pub struct RssDealSource {
    http: Client,
    feeds: Vec<String>,
    items_per_feed: usize,
    curator: Option<Arc<ChatClient>>,
}

impl RssDealSource {
    /// Create a scanner over the given feed URLs.
    pub fn new(feeds: Vec<String>, items_per_feed: usize, timeout: Duration) -> Result<Self> {
        if feeds.is_empty() {
            anyhow::bail!("At least one deal feed URL is required");
        }
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("DEALHUNTER/0.1.0")
            .build()
            .context("Failed to build feed HTTP client")?;
        Ok(Self {
            http,
            feeds,
            items_per_feed,
            curator: None,
        })
    }

    /// Use a chat model to pick and summarise the deals.
    pub fn with_curator(mut self, curator: Arc<ChatClient>) -> Self {
        self.curator = Some(curator);
        self
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<ScrapedDeal>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Feed request failed: {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Feed {url} returned HTTP {status}");
        }
        let body = resp
            .text()
            .await
            .with_context(|| format!("Failed to read feed body: {url}"))?;
        Ok(parse_items(&body, self.items_per_feed))
    }

    /// Fetch every feed concurrently. Fails only if all feeds fail.
    async fn fetch_all(&self) -> Result<Vec<ScrapedDeal>, PipelineError> {
        let results = join_all(self.feeds.iter().map(|url| self.fetch_feed(url))).await;

        let mut scraped = Vec::new();
        let mut failures = Vec::new();
        for (url, result) in self.feeds.iter().zip(results) {
            match result {
                Ok(items) => {
                    debug!(feed = %url, items = items.len(), "Feed fetched");
                    scraped.extend(items);
                }
                Err(e) => {
                    warn!(feed = %url, error = %e, "Feed fetch failed, continuing without");
                    failures.push(format!("{e:#}"));
                }
            }
        }

        if failures.len() == self.feeds.len() {
            return Err(PipelineError::SourceUnavailable(failures.join("; ")));
        }
        Ok(scraped)
    }

    async fn curate(&self, curator: &ChatClient, scraped: &[ScrapedDeal]) -> Result<Vec<Deal>> {
        let messages = vec![
            ChatMessage::system(CURATOR_SYSTEM_PROMPT),
            ChatMessage::user(curator_prompt(scraped)),
        ];
        let reply = curator
            .complete_with_limit(&messages, CURATOR_MAX_TOKENS)
            .await
            .context("Deal curator call failed")?;
        parse_curated(&reply, scraped)
    }
}

#[async_trait]
impl DealSource for RssDealSource {
    async fn scan(&self, memory: &Memory) -> Result<DealSelection, PipelineError> {
        info!(feeds = self.feeds.len(), remembered = memory.len(), "Scanning deal feeds...");

        let scraped = fresh_deals(self.fetch_all().await?, memory);
        if scraped.is_empty() {
            info!("No new deals found");
            return Ok(DealSelection::default());
        }

        let deals = match &self.curator {
            Some(curator) => match self.curate(curator, &scraped).await {
                Ok(deals) => deals,
                Err(e) => {
                    warn!(error = %e, "Curation failed, falling back to advertised prices");
                    heuristic_deals(&scraped)
                }
            },
            None => heuristic_deals(&scraped),
        };

        info!(scraped = scraped.len(), selected = deals.len(), "Deal scan complete");
        Ok(DealSelection::new(deals))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Drop remembered and duplicate URLs, keeping feed order.
fn fresh_deals(scraped: Vec<ScrapedDeal>, memory: &Memory) -> Vec<ScrapedDeal> {
    let mut seen = HashSet::new();
    scraped
        .into_iter()
        .filter(|d| !memory.contains(&d.url) && seen.insert(d.url.clone()))
        .collect()
}

fn curator_prompt(scraped: &[ScrapedDeal]) -> String {
    let listing = scraped
        .iter()
        .map(ScrapedDeal::describe)
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Respond with the most promising {CURATED_DEALS} deals from this list, selecting those which \
         have the most detailed, high quality product description and a clear price that is greater \
         than 0.\nRespond strictly in JSON, and only JSON.\n\nDeals:\n\n{listing}\n\n\
         Strictly respond in JSON and include exactly {CURATED_DEALS} deals, no more."
    )
}

/// Parse the curator's JSON, keeping only priced deals that point at a
/// URL we actually scraped.
fn parse_curated(reply: &str, scraped: &[ScrapedDeal]) -> Result<Vec<Deal>> {
    let start = reply.find('{').context("Curator reply contains no JSON object")?;
    let end = reply.rfind('}').context("Curator reply contains no JSON object")?;
    if end < start {
        anyhow::bail!("Curator reply contains no JSON object");
    }
    let parsed: CuratedDeals =
        serde_json::from_str(&reply[start..=end]).context("Failed to parse curator JSON")?;

    let known: HashSet<&str> = scraped.iter().map(|d| d.url.as_str()).collect();
    let mut seen = HashSet::new();
    let deals: Vec<Deal> = parsed
        .deals
        .into_iter()
        .filter(|d| {
            let keep = d.price.is_finite()
                && d.price > 0.0
                && !d.product_description.trim().is_empty()
                && known.contains(d.url.as_str());
            if !keep {
                debug!(url = %d.url, price = d.price, "Discarding curated deal");
                return false;
            }
            if !seen.insert(d.url.clone()) {
                debug!(url = %d.url, "Discarding repeated curated deal");
                return false;
            }
            true
        })
        .collect();
    Ok(deals)
}

/// Build deals straight from feed text using the advertised `$` price.
fn heuristic_deals(scraped: &[ScrapedDeal]) -> Vec<Deal> {
    scraped
        .iter()
        .filter_map(|d| {
            let price = extract_offer_price(&d.title).or_else(|| extract_offer_price(&d.summary))?;
            let text = if d.summary.is_empty() {
                d.title.clone()
            } else {
                format!("{}. {}", d.title, d.summary)
            };
            Some(Deal {
                product_description: crate::types::truncate(&text, MAX_DESCRIPTION_CHARS).to_string(),
                price,
                url: d.url.clone(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
