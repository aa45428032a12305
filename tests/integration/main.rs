//! Integration tests for the DEALHUNTER pipeline.

mod fakes;
mod feed;
mod pipeline;
