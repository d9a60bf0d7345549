//! TIPSTER: scheduled sports prediction bot for Telegram channels
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod extract;
pub mod llm;
pub mod generator;
pub mod composer;
pub mod telegram;
pub mod engine;
pub mod dashboard;
