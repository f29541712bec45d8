//! Reviver: AI content actions with request deduplication and streamed delivery.

pub mod actions;
pub mod config;
pub mod dedup;
pub mod error;
pub mod json;
pub mod llm;
pub mod model;
pub mod relay;
pub mod server;
pub mod tracker;
