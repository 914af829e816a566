//! Cafe Finder Engine Library
//!
//! This library provides the core functionality of the Cafe Finder agent.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Text generation layer
pub mod llm;

/// HTTP collaborator adapters
pub mod tools;

/// Café recommendation agent
pub mod agent;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
