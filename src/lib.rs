//! Access Portal Core
//!
//! Backend for an IAM access request portal: an application catalog, access
//! requests and the sequential multi-level approval workflow that decides
//! them. The `workflow` module owns every approval rule; the HTTP layer and
//! the repositories only carry its decisions.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod migration;
pub mod openapi;
pub mod policy;
pub mod repository;
pub mod server;
pub mod service;
pub mod state;
pub mod telemetry;
pub mod workflow;

pub use config::Config;
pub use error::{AppError, Result};
