//! DEALHUNTER — Autonomous deal scanning and alerting agent
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod error;
pub mod types;
pub mod knowledge;
pub mod llm;
pub mod notify;
pub mod engine;
pub mod storage;
pub mod dashboard;
