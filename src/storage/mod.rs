//! Persistence layer.
//!
//! Saves and loads the surfaced opportunities ("memory") to/from a JSON
//! file. The URL set handed to each planning run is derived from it.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::types::SurfacedOpportunity;

/// Default memory file path.
pub const DEFAULT_MEMORY_FILE: &str = "memory.json";

/// Save surfaced opportunities to a JSON file.
pub fn save_memory(memory: &[SurfacedOpportunity], path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_MEMORY_FILE);
    let json = serde_json::to_string_pretty(memory)
        .context("Failed to serialise memory")?;

    std::fs::write(path, &json)
        .context(format!("Failed to write memory to {path}"))?;

    debug!(path, entries = memory.len(), "Memory saved");
    Ok(())
}

/// Load surfaced opportunities from a JSON file.
/// A missing file is an empty memory (fresh start).
pub fn load_memory(path: Option<&str>) -> Result<Vec<SurfacedOpportunity>> {
    let path = path.unwrap_or(DEFAULT_MEMORY_FILE);

    if !Path::new(path).exists() {
        info!(path, "No saved memory found, starting fresh");
        return Ok(Vec::new());
    }

    let json = std::fs::read_to_string(path)
        .context(format!("Failed to read memory from {path}"))?;

    let memory: Vec<SurfacedOpportunity> = serde_json::from_str(&json)
        .context(format!("Failed to parse memory from {path}"))?;

    info!(path, entries = memory.len(), "Memory loaded from disk");
    Ok(memory)
}

/// Delete the memory file (for testing or reset).
pub fn delete_memory(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_MEMORY_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path)
            .context(format!("Failed to delete memory file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
