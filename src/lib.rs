// ABOUTME: Library root for rollout - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod aws;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod output;
pub mod platform;
pub mod process;
pub mod publish;
pub mod state;
pub mod types;
