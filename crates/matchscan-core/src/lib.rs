//! matchscan-core: question allocation and compatibility scoring.
//!
//! This crate holds the question bank model, the allocation controller that
//! builds and repairs an assessment queue, and the scoring engine that turns
//! a finished session into a persisted [`record::MatchScan`].

pub mod allocation;
pub mod bank;
pub mod config;
pub mod error;
pub mod model;
pub mod record;
pub mod scoring;
pub mod session;
