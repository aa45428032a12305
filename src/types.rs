//! Shared types for the DEALHUNTER agent.
//!
//! These types form the data model used across all modules: deals as
//! they come out of the scanner, opportunities as they come out of the
//! planner, and the caller-owned memory of what has already been surfaced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Deals
// ---------------------------------------------------------------------------

/// A raw entry pulled from a deal feed, before it has been curated into
/// a priced [`Deal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedDeal {
    pub title: String,
    pub summary: String,
    pub url: String,
}

impl ScrapedDeal {
    /// Text handed to the curator: title and summary in one block.
    pub fn describe(&self) -> String {
        format!("Title: {}\nDetails: {}\nURL: {}", self.title, self.summary, self.url)
    }
}

/// A candidate offer with a description, an offer price and a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub product_description: String,
    /// Offer price in the agent's currency.
    pub price: f64,
    pub url: String,
}

impl fmt::Display for Deal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2} {} ({})", self.price, truncate(&self.product_description, 40), self.url)
    }
}

/// The ordered deals produced by one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealSelection {
    pub deals: Vec<Deal>,
}

impl DealSelection {
    pub fn new(deals: Vec<Deal>) -> Self {
        Self { deals }
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deals.len()
    }
}

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

/// A priced deal: the blended estimate of its true value and the
/// resulting discount. `discount == estimate - deal.price` by construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    deal: Deal,
    estimate: f64,
    discount: f64,
}

/// Stored form of an [`Opportunity`]. Any persisted `discount` is
/// ignored and recomputed from the deal and estimate on load.
#[derive(Deserialize)]
struct OpportunityRecord {
    deal: Deal,
    estimate: f64,
}

impl<'de> Deserialize<'de> for Opportunity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = OpportunityRecord::deserialize(deserializer)?;
        Ok(Opportunity::new(record.deal, record.estimate))
    }
}

impl Opportunity {
    pub fn new(deal: Deal, estimate: f64) -> Self {
        let discount = estimate - deal.price;
        Self {
            deal,
            estimate,
            discount,
        }
    }

    pub fn deal(&self) -> &Deal {
        &self.deal
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn url(&self) -> &str {
        &self.deal.url
    }
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | estimate ${:.2} | discount ${:.2}",
            self.deal, self.estimate, self.discount
        )
    }
}

/// An opportunity as persisted by the framework, stamped with when it
/// was surfaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfacedOpportunity {
    pub opportunity: Opportunity,
    pub surfaced_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Identifiers (URLs) of deals that have already been surfaced.
///
/// Owned by the caller and passed by shared reference into each run; the
/// planner and the deal source only ever read it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    urls: BTreeSet<String>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Memory {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl Memory {
    /// Build the identifier set from previously surfaced opportunities.
    pub fn from_surfaced(surfaced: &[SurfacedOpportunity]) -> Self {
        surfaced
            .iter()
            .map(|s| s.opportunity.url().to_string())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Run outcome & statistics
// ---------------------------------------------------------------------------

/// What a single planning run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    /// The scan found nothing new; no estimator was called.
    NoCandidates,
    /// The best deal did not clear the threshold. Nothing was sent.
    BelowThreshold(Opportunity),
    /// The best deal cleared the threshold and was dispatched.
    /// `delivered` is false when the notifier reported a failure.
    Notified {
        opportunity: Opportunity,
        delivered: bool,
    },
}

impl PlanOutcome {
    /// The opportunity worth surfacing, if any.
    pub fn surfaced(&self) -> Option<&Opportunity> {
        match self {
            PlanOutcome::Notified { opportunity, .. } => Some(opportunity),
            _ => None,
        }
    }

    /// The best evaluated opportunity, qualified or not.
    pub fn best(&self) -> Option<&Opportunity> {
        match self {
            PlanOutcome::NoCandidates => None,
            PlanOutcome::BelowThreshold(best) => Some(best),
            PlanOutcome::Notified { opportunity, .. } => Some(opportunity),
        }
    }

    pub fn into_surfaced(self) -> Option<Opportunity> {
        match self {
            PlanOutcome::Notified { opportunity, .. } => Some(opportunity),
            _ => None,
        }
    }
}

impl fmt::Display for PlanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanOutcome::NoCandidates => write!(f, "no new deals"),
            PlanOutcome::BelowThreshold(_) => write!(f, "below threshold"),
            PlanOutcome::Notified { delivered: true, .. } => write!(f, "notified"),
            PlanOutcome::Notified { delivered: false, .. } => write!(f, "notified (delivery failed)"),
        }
    }
}

/// Counters kept across runs for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub runs: u64,
    pub failed_runs: u64,
    pub opportunities_surfaced: u64,
    pub start_time: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            runs: 0,
            failed_runs: 0,
            opportunities_surfaced: 0,
            start_time: Utc::now(),
            last_run: None,
        }
    }

    pub fn record(&mut self, outcome: &Result<PlanOutcome, crate::error::PipelineError>) {
        self.runs += 1;
        self.last_run = Some(Utc::now());
        match outcome {
            Ok(o) if o.surfaced().is_some() => self.opportunities_surfaced += 1,
            Ok(_) => {}
            Err(_) => self.failed_runs += 1,
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Take at most `max_chars` characters, never splitting a code point.
pub fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
impl Deal {
    pub fn sample(url: &str, price: f64) -> Self {
        Deal {
            product_description: format!("Sample product at {url}"),
            price,
            url: url.to_string(),
        }
    }
}
