//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::{PlanOutcome, RunStats, SurfacedOpportunity};

/// Entries returned by the list endpoints.
const MAX_LISTED: usize = 100;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub agent_name: String,
    pub threshold: f64,
    pub stats: RwLock<RunStats>,
    pub opportunities: RwLock<Vec<SurfacedOpportunity>>,
    pub run_log: RwLock<Vec<RunLogEntry>>,
}

impl DashboardState {
    pub fn new(agent_name: impl Into<String>, threshold: f64) -> Self {
        Self {
            agent_name: agent_name.into(),
            threshold,
            stats: RwLock::new(RunStats::new()),
            opportunities: RwLock::new(Vec::new()),
            run_log: RwLock::new(Vec::new()),
        }
    }

    /// Publish the framework's view after a run.
    pub async fn record_run(
        &self,
        entry: RunLogEntry,
        stats: &RunStats,
        opportunities: &[SurfacedOpportunity],
    ) {
        *self.stats.write().await = stats.clone();
        *self.opportunities.write().await = opportunities.to_vec();
        let mut log = self.run_log.write().await;
        log.push(entry);
        if log.len() > MAX_LISTED {
            let excess = log.len() - MAX_LISTED;
            log.drain(..excess);
        }
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub agent_name: String,
    pub threshold: f64,
    pub runs: u64,
    pub failed_runs: u64,
    pub opportunities_surfaced: u64,
    pub last_run: Option<String>,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpportunityEntry {
    pub surfaced_at: String,
    pub description: String,
    pub price: f64,
    pub estimate: f64,
    pub discount: f64,
    pub url: String,
}

impl From<&SurfacedOpportunity> for OpportunityEntry {
    fn from(s: &SurfacedOpportunity) -> Self {
        let o = &s.opportunity;
        Self {
            surfaced_at: s.surfaced_at.to_rfc3339(),
            description: o.deal().product_description.clone(),
            price: o.deal().price,
            estimate: o.estimate(),
            discount: o.discount(),
            url: o.url().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunLogEntry {
    pub run_id: String,
    pub timestamp: String,
    pub outcome: String,
    pub best_url: Option<String>,
    pub best_discount: Option<f64>,
    pub error: Option<String>,
}

impl RunLogEntry {
    pub fn new(run_id: impl Into<String>, result: &anyhow::Result<PlanOutcome>) -> Self {
        let (outcome, best, error) = match result {
            Ok(o) => (o.to_string(), o.best(), None),
            Err(e) => ("failed".to_string(), None, Some(format!("{e:#}"))),
        };
        Self {
            run_id: run_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            outcome,
            best_url: best.map(|b| b.url().to_string()),
            best_discount: best.map(|b| b.discount()),
            error,
        }
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

pub type AppState = Arc<DashboardState>;

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let stats = state.stats.read().await;
    let uptime = (chrono::Utc::now() - stats.start_time).num_seconds();

    Json(StatusResponse {
        agent_name: state.agent_name.clone(),
        threshold: state.threshold,
        runs: stats.runs,
        failed_runs: stats.failed_runs,
        opportunities_surfaced: stats.opportunities_surfaced,
        last_run: stats.last_run.map(|t| t.to_rfc3339()),
        uptime_secs: uptime,
    })
}

/// GET /api/opportunities
pub async fn get_opportunities(State(state): State<AppState>) -> Json<Vec<OpportunityEntry>> {
    let opportunities = state.opportunities.read().await;
    let start = opportunities.len().saturating_sub(MAX_LISTED);
    Json(opportunities[start..].iter().map(OpportunityEntry::from).collect())
}

/// GET /api/runs
pub async fn get_runs(State(state): State<AppState>) -> Json<Vec<RunLogEntry>> {
    let log = state.run_log.read().await;
    let start = log.len().saturating_sub(MAX_LISTED);
    Json(log[start..].to_vec())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::types::{Deal, Opportunity};
    use chrono::Utc;

    fn surfaced(url: &str) -> SurfacedOpportunity {
        SurfacedOpportunity {
            opportunity: Opportunity::new(Deal::sample(url, 20.0), 100.0),
            surfaced_at: Utc::now(),
        }
    }

    #[test]
    fn test_run_log_entry_from_outcome() {
        let opp = Opportunity::new(Deal::sample("https://a", 20.0), 100.0);
        let entry = RunLogEntry::new("run-1", &Ok(PlanOutcome::BelowThreshold(opp)));
        assert_eq!(entry.outcome, "below threshold");
        assert_eq!(entry.best_url.as_deref(), Some("https://a"));
        assert_eq!(entry.best_discount, Some(80.0));
        assert!(entry.error.is_none());
    }

    #[test]
    fn test_run_log_entry_from_error() {
        let result: anyhow::Result<PlanOutcome> = Err(PipelineError::RunFailed { attempted: 5 }.into());
        let entry = RunLogEntry::new("run-2", &result);
        assert_eq!(entry.outcome, "failed");
        assert!(entry.error.unwrap().contains("all 5 candidate deals"));
        assert!(entry.best_url.is_none());
    }

    #[test]
    fn test_opportunity_entry_serializes() {
        let entry = OpportunityEntry::from(&surfaced("https://deal"));
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"discount\":80.0"));
        assert!(json.contains("https://deal"));
    }

    #[tokio::test]
    async fn test_get_status_handler() {
        let state = Arc::new(DashboardState::new("DEALHUNTER-TEST", 50.0));
        let Json(resp) = get_status(State(state)).await;
        assert_eq!(resp.agent_name, "DEALHUNTER-TEST");
        assert_eq!(resp.runs, 0);
        assert!(resp.last_run.is_none());
    }

    #[tokio::test]
    async fn test_record_run_updates_everything() {
        let state = Arc::new(DashboardState::new("DEALHUNTER-TEST", 50.0));
        let mut stats = RunStats::new();
        let opp = surfaced("https://a");
        let outcome = PlanOutcome::Notified {
            opportunity: opp.opportunity.clone(),
            delivered: true,
        };
        stats.record(&Ok(outcome.clone()));
        state
            .record_run(RunLogEntry::new("run-1", &Ok(outcome)), &stats, &[opp])
            .await;

        let Json(status) = get_status(State(state.clone())).await;
        assert_eq!(status.runs, 1);
        assert_eq!(status.opportunities_surfaced, 1);

        let Json(opps) = get_opportunities(State(state.clone())).await;
        assert_eq!(opps.len(), 1);

        let Json(runs) = get_runs(State(state)).await;
        assert_eq!(runs[0].outcome, "notified");
    }

    #[tokio::test]
    async fn test_lists_are_capped() {
        let state = Arc::new(DashboardState::new("DEALHUNTER-TEST", 50.0));
        {
            let mut opportunities = state.opportunities.write().await;
            for i in 0..150 {
                opportunities.push(surfaced(&format!("https://d/{i}")));
            }
        }
        let Json(opps) = get_opportunities(State(state)).await;
        assert_eq!(opps.len(), MAX_LISTED);
        assert_eq!(opps[0].url, "https://d/50");
    }

    #[tokio::test]
    async fn test_run_log_keeps_only_recent_runs() {
        let state = DashboardState::new("DEALHUNTER-TEST", 50.0);
        let stats = RunStats::new();
        for i in 0..150 {
            let entry = RunLogEntry::new(format!("run-{i}"), &Ok(PlanOutcome::NoCandidates));
            state.record_run(entry, &stats, &[]).await;
        }
        let log = state.run_log.read().await;
        assert_eq!(log.len(), MAX_LISTED);
        assert_eq!(log[0].run_id, "run-50");
        assert_eq!(log[MAX_LISTED - 1].run_id, "run-149");
    }
}
