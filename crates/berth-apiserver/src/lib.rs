//! Berth API Server - HTTP surface for clusters, deployments and the scheduler
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Cluster and deployment record endpoints
//! - Submit, stop, drain and queue-status endpoints backed by the scheduling engine

pub mod error;
pub mod handlers;
pub mod response;
pub mod server;
pub mod state;
pub mod validation;

// Re-export commonly used types
pub use error::{ApiError, Result};
pub use server::{router, ApiServer, Config};
pub use state::AppState;
