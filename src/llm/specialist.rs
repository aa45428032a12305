//! Specialist estimator: direct inference against a dedicated pricing model.
//!
//! No retrieval, no context: the description goes straight to a model
//! fine-tuned to answer with a price.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::client::{ChatClient, ChatMessage};
use super::{price_from_reply, PriceEstimator, PRICE_PREFILL};
use crate::error::PipelineError;

const NAME: &str = "Specialist";

pub struct SpecialistEstimator {
    client: Arc<ChatClient>,
}

impl SpecialistEstimator {
    pub fn new(client: Arc<ChatClient>) -> Self {
        Self { client }
    }

    pub fn messages_for(description: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::user(format!(
                "How much does this cost to the nearest dollar?\n\n{description}"
            )),
            ChatMessage::assistant(PRICE_PREFILL),
        ]
    }
}

#[async_trait]
impl PriceEstimator for SpecialistEstimator {
    async fn price(&self, description: &str) -> Result<f64, PipelineError> {
        let reply = self
            .client
            .complete(&Self::messages_for(description))
            .await
            .map_err(|e| PipelineError::estimation(NAME, format!("{e:#}")))?;
        let price = price_from_reply(NAME, &reply)?;
        info!(model = %self.client.model(), price = format!("${price:.2}"), "Specialist estimate complete");
        Ok(price)
    }

    fn name(&self) -> &str {
        NAME
    }
}
