//! In-memory collaborators for integration testing.
//!
//! Deterministic `DealSource`, `PriceEstimator` and `Notifier`
//! implementations with no network access. Behaviour and failures are
//! controllable from test code and every call is recorded.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dealhunter::engine::scanner::DealSource;
use dealhunter::error::PipelineError;
use dealhunter::llm::PriceEstimator;
use dealhunter::notify::Notifier;
use dealhunter::types::{Deal, DealSelection, Memory, Opportunity};

/// A fixed catalogue of deals, filtered by memory like a real feed scanner.
pub struct FakeDealSource {
    deals: Vec<Deal>,
    /// If set, every scan fails with this message.
    force_error: Arc<Mutex<Option<String>>>,
    scans: Arc<Mutex<Vec<Memory>>>,
}

impl FakeDealSource {
    pub fn new(deals: Vec<Deal>) -> Self {
        Self {
            deals,
            force_error: Arc::new(Mutex::new(None)),
            scans: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    /// The memory passed to each scan, in call order.
    pub fn scans(&self) -> Vec<Memory> {
        self.scans.lock().unwrap().clone()
    }
}

#[async_trait]
impl DealSource for FakeDealSource {
    async fn scan(&self, memory: &Memory) -> Result<DealSelection, PipelineError> {
        self.scans.lock().unwrap().push(memory.clone());
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(PipelineError::SourceUnavailable(err.clone()));
        }
        let fresh = self
            .deals
            .iter()
            .filter(|d| !memory.contains(&d.url))
            .cloned()
            .collect();
        Ok(DealSelection::new(fresh))
    }
}

/// Prices looked up by exact product description.
pub struct TableEstimator {
    name: String,
    prices: HashMap<String, f64>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl TableEstimator {
    pub fn new(name: &str, prices: &[(&str, f64)]) -> Self {
        Self {
            name: name.to_string(),
            prices: prices.iter().map(|(d, p)| (d.to_string(), *p)).collect(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceEstimator for TableEstimator {
    async fn price(&self, description: &str) -> Result<f64, PipelineError> {
        self.calls.lock().unwrap().push(description.to_string());
        self.prices
            .get(description)
            .copied()
            .ok_or_else(|| PipelineError::estimation(&self.name, "unknown product"))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Records every alert; can be told to fail delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<Opportunity>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn alerts(&self) -> Vec<Opportunity> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn alert(&self, opportunity: &Opportunity) -> Result<(), PipelineError> {
        self.alerts.lock().unwrap().push(opportunity.clone());
        if *self.fail.lock().unwrap() {
            return Err(PipelineError::DeliveryFailure("push service unavailable".into()));
        }
        Ok(())
    }
}

/// Deal with a readable description and a URL derived from it.
pub fn deal(description: &str, price: f64) -> Deal {
    Deal {
        product_description: description.to_string(),
        price,
        url: format!("https://deals.example.com/{}", description.to_lowercase().replace(' ', "-")),
    }
}
