pub mod activity;
pub mod analyzer;
pub mod budget;
pub mod cli;
pub mod collector;
pub mod comment;
pub mod config;
pub mod error;
pub mod github;
pub mod issues;
pub mod orchestrator;
pub mod recency;
pub mod suitability;
pub mod targets;
