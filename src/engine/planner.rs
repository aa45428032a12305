//! Planning agent.
//!
//! Drives one run of the pipeline as a fixed sequence:
//! scan → price each candidate with both estimators → average →
//! rank by discount → notify if the best discount clears the threshold.
//!
//! All work is plain futures owned by the run; nothing is spawned, so
//! dropping a run future cancels any in-flight estimator or notifier call.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::scanner::DealSource;
use crate::config::{DEFAULT_DEAL_THRESHOLD, DEFAULT_ESTIMATOR_TIMEOUT_SECS};
use crate::error::PipelineError;
use crate::llm::PriceEstimator;
use crate::notify::Notifier;
use crate::types::{Deal, Memory, Opportunity, PlanOutcome};

/// Candidates priced per run; the rest of a selection is ignored.
pub const MAX_DEALS_PER_RUN: usize = 5;

pub struct PlanningAgent {
    source: Arc<dyn DealSource>,
    frontier: Arc<dyn PriceEstimator>,
    specialist: Arc<dyn PriceEstimator>,
    notifier: Arc<dyn Notifier>,
    threshold: f64,
    estimator_timeout: Duration,
}

impl PlanningAgent {
    pub fn new(
        source: Arc<dyn DealSource>,
        frontier: Arc<dyn PriceEstimator>,
        specialist: Arc<dyn PriceEstimator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            frontier,
            specialist,
            notifier,
            threshold: DEFAULT_DEAL_THRESHOLD,
            estimator_timeout: Duration::from_secs(DEFAULT_ESTIMATOR_TIMEOUT_SECS),
        }
    }

    /// Minimum discount (exclusive) a deal needs to be notified.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_estimator_timeout(mut self, timeout: Duration) -> Self {
        self.estimator_timeout = timeout;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Price one deal with both estimators and average the results.
    ///
    /// Both estimators run concurrently and both must succeed.
    pub async fn evaluate(&self, deal: &Deal) -> Result<Opportunity, PipelineError> {
        let description = deal.product_description.as_str();
        let (frontier, specialist) = tokio::join!(
            self.estimate_with(self.frontier.as_ref(), description),
            self.estimate_with(self.specialist.as_ref(), description),
        );
        let estimate = (frontier? + specialist?) / 2.0;

        let opportunity = Opportunity::new(deal.clone(), estimate);
        if !opportunity.discount().is_finite() {
            return Err(PipelineError::estimation(
                "Planner",
                format!("deal price {} is not a finite number", deal.price),
            ));
        }
        Ok(opportunity)
    }

    async fn estimate_with(
        &self,
        estimator: &dyn PriceEstimator,
        description: &str,
    ) -> Result<f64, PipelineError> {
        let price = tokio::time::timeout(self.estimator_timeout, estimator.price(description))
            .await
            .map_err(|_| {
                PipelineError::estimation(
                    estimator.name(),
                    format!("timed out after {}s", self.estimator_timeout.as_secs_f64()),
                )
            })??;

        if !price.is_finite() || price < 0.0 {
            return Err(PipelineError::estimation(
                estimator.name(),
                format!("invalid price {price}"),
            ));
        }
        Ok(price)
    }

    /// Run the full workflow and report what happened.
    pub async fn run(&self, memory: &Memory) -> Result<PlanOutcome, PipelineError> {
        info!(remembered = memory.len(), "Planning Agent is kicking off a run");

        let selection = self.source.scan(memory).await?;
        if selection.is_empty() {
            info!("No new deals to evaluate");
            return Ok(PlanOutcome::NoCandidates);
        }

        let candidates = &selection.deals[..selection.len().min(MAX_DEALS_PER_RUN)];
        debug!(
            selected = selection.len(),
            evaluating = candidates.len(),
            "Pricing candidate deals"
        );

        let results = join_all(candidates.iter().map(|deal| self.evaluate(deal))).await;

        let mut opportunities = Vec::with_capacity(candidates.len());
        for (deal, result) in candidates.iter().zip(results) {
            match result {
                Ok(opportunity) => {
                    info!(
                        url = %deal.url,
                        price = format!("${:.2}", deal.price),
                        estimate = format!("${:.2}", opportunity.estimate()),
                        discount = format!("${:.2}", opportunity.discount()),
                        "Deal priced"
                    );
                    opportunities.push(opportunity);
                }
                Err(e) => warn!(url = %deal.url, error = %e, "Skipping deal"),
            }
        }

        // Stable: among equal discounts the earliest deal stays first.
        opportunities.sort_by(|a, b| b.discount().total_cmp(&a.discount()));

        let Some(best) = opportunities.into_iter().next() else {
            return Err(PipelineError::RunFailed {
                attempted: candidates.len(),
            });
        };

        if best.discount() > self.threshold {
            let delivered = match self.notifier.alert(&best).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(url = %best.url(), error = %e, "Alert not delivered");
                    false
                }
            };
            info!(
                url = %best.url(),
                discount = format!("${:.2}", best.discount()),
                delivered,
                "Planning Agent has completed a run with an opportunity"
            );
            Ok(PlanOutcome::Notified {
                opportunity: best,
                delivered,
            })
        } else {
            info!(
                best_discount = format!("${:.2}", best.discount()),
                threshold = format!("${:.2}", self.threshold),
                "Planning Agent has completed a run, nothing above threshold"
            );
            Ok(PlanOutcome::BelowThreshold(best))
        }
    }

    /// Run the workflow and return the notified opportunity, if any.
    pub async fn plan(&self, memory: &Memory) -> Result<Option<Opportunity>, PipelineError> {
        Ok(self.run(memory).await?.into_surfaced())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
