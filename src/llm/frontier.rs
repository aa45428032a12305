//! Frontier estimator: retrieval-augmented pricing.
//!
//! Looks up the most similar catalogued products, puts them and their
//! known prices into the prompt as reference points, and asks a frontier
//! chat model for a bare price. An optional preprocessing model rewrites
//! the deal text into a short product description before the lookup.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::client::{ChatClient, ChatMessage};
use super::{price_from_reply, PriceEstimator, PRICE_PREFILL};
use crate::error::PipelineError;
use crate::knowledge::{PricedProduct, SimilarProducts};

const NAME: &str = "Frontier";

/// Number of similar products placed in the prompt.
const DEFAULT_NEIGHBOURS: usize = 5;

const SYSTEM_PROMPT: &str = "You estimate prices of items. Reply only with the price, no explanation";

const PREPROCESS_SYSTEM_PROMPT: &str = "You rewrite product descriptions in a format most suitable \
     for finding similar products in a Knowledge Base";

/// Token budget for the rewritten description.
const PREPROCESS_MAX_TOKENS: u32 = 200;

pub struct FrontierEstimator {
    client: Arc<ChatClient>,
    index: Arc<dyn SimilarProducts>,
    preprocessor: Option<Arc<ChatClient>>,
    neighbours: usize,
}

impl FrontierEstimator {
    pub fn new(client: Arc<ChatClient>, index: Arc<dyn SimilarProducts>) -> Self {
        Self {
            client,
            index,
            preprocessor: None,
            neighbours: DEFAULT_NEIGHBOURS,
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: Arc<ChatClient>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub fn with_neighbours(mut self, neighbours: usize) -> Self {
        self.neighbours = neighbours;
        self
    }

    /// Context block listing similar products and their prices.
    pub fn make_context(similars: &[PricedProduct]) -> String {
        let mut message = String::from(
            "To provide some context, here are some other items that might be similar \
             to the item you need to estimate.\n\n",
        );
        for similar in similars {
            message.push_str(&format!(
                "Potentially related product:\n{}\nPrice is ${:.2}\n\n",
                similar.description, similar.price
            ));
        }
        message
    }

    /// Full message list: system, user (context + question), assistant prefill.
    pub fn messages_for(description: &str, similars: &[PricedProduct]) -> Vec<ChatMessage> {
        let mut user_prompt = String::new();
        if !similars.is_empty() {
            user_prompt.push_str(&Self::make_context(similars));
            user_prompt.push_str("And now the question for you:\n\n");
        }
        user_prompt.push_str("How much does this cost?\n\n");
        user_prompt.push_str(description);

        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_prompt),
            ChatMessage::assistant(PRICE_PREFILL),
        ]
    }

    fn preprocess_messages(description: &str) -> Vec<ChatMessage> {
        let user = format!(
            "Please write a short 2-3 sentence description of the following product; \
             your description will be used to find similar products so it should be \
             comprehensive and only about the product. Details:\n{description}\n\n\
             Now please reply only with the short description, with no introduction"
        );
        vec![ChatMessage::system(PREPROCESS_SYSTEM_PROMPT), ChatMessage::user(user)]
    }

    /// Rewrite the description for retrieval; falls back to the original
    /// text if the preprocessor is absent or fails.
    async fn retrieval_text(&self, description: &str) -> String {
        let Some(preprocessor) = &self.preprocessor else {
            return description.to_string();
        };
        match preprocessor
            .complete_with_limit(&Self::preprocess_messages(description), PREPROCESS_MAX_TOKENS)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => description.to_string(),
            Err(e) => {
                warn!(error = %e, "Description preprocessing failed, using raw description");
                description.to_string()
            }
        }
    }

    async fn estimate(&self, description: &str) -> Result<String> {
        let query = self.retrieval_text(description).await;
        let similars = self.index.find_similar(&query, self.neighbours);
        if similars.is_empty() {
            warn!("No similar products found, pricing without retrieval context");
        }

        debug!(
            model = %self.client.model(),
            similars = similars.len(),
            "Calling frontier model with retrieval context"
        );

        self.client
            .complete(&Self::messages_for(description, &similars))
            .await
            .context("Frontier model call failed")
    }
}

#[async_trait]
impl PriceEstimator for FrontierEstimator {
    async fn price(&self, description: &str) -> Result<f64, PipelineError> {
        let reply = self
            .estimate(description)
            .await
            .map_err(|e| PipelineError::estimation(NAME, format!("{e:#}")))?;
        let price = price_from_reply(NAME, &reply)?;
        info!(price = format!("${price:.2}"), "Frontier estimate complete");
        Ok(price)
    }

    fn name(&self) -> &str {
        NAME
    }
}
