//! Core engine — the scan → estimate → rank → notify workflow.

pub mod feed;
pub mod framework;
pub mod planner;
pub mod scanner;
