//! Agent framework.
//!
//! Owns the persisted memory of surfaced opportunities. Each run derives
//! the URL set from it, hands that to the planning agent, and records a
//! newly notified opportunity back to disk so it is never surfaced twice.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use super::planner::PlanningAgent;
use crate::storage;
use crate::types::{Memory, PlanOutcome, RunStats, SurfacedOpportunity};

pub struct DealAgentFramework {
    planner: PlanningAgent,
    memory_path: String,
    memory: Vec<SurfacedOpportunity>,
    stats: RunStats,
}

impl DealAgentFramework {
    /// Create the framework, restoring memory from `memory_path`.
    pub fn new(planner: PlanningAgent, memory_path: impl Into<String>) -> Result<Self> {
        let memory_path = memory_path.into();
        let memory = storage::load_memory(Some(&memory_path))?;
        info!(path = %memory_path, entries = memory.len(), "Agent framework ready");
        Ok(Self {
            planner,
            memory_path,
            memory,
            stats: RunStats::new(),
        })
    }

    /// Run one planning cycle.
    ///
    /// Pipeline failures come back as `PipelineError` wrapped in `anyhow`;
    /// a failure to persist memory is returned after the opportunity has
    /// been kept in process.
    pub async fn run(&mut self) -> Result<PlanOutcome> {
        let known = Memory::from_surfaced(&self.memory);
        let result = self.planner.run(&known).await;
        self.stats.record(&result);

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Planning run failed");
                return Err(e.into());
            }
        };

        if let Some(opportunity) = outcome.surfaced() {
            self.memory.push(SurfacedOpportunity {
                opportunity: opportunity.clone(),
                surfaced_at: Utc::now(),
            });
            storage::save_memory(&self.memory, Some(&self.memory_path))?;
            info!(
                url = %opportunity.url(),
                remembered = self.memory.len(),
                "Opportunity added to memory"
            );
        }

        Ok(outcome)
    }

    pub fn memory(&self) -> &[SurfacedOpportunity] {
        &self.memory
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }
}
