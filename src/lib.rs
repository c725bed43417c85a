//! History server for finished jobs.
//!
//! Periodically pulls job archives from the configured locations into a
//! local cache directory and serves that cache over HTTP, together with a
//! small REST surface and the dashboard's bootstrap descriptor.
//!
//! # Architecture Overview
//!
//! ```text
//!   archive.dirs ──▶ archive::location ──▶ lifecycle::HistoryServer
//!                                              │ start()
//!                      ┌───────────────────────┼───────────────────────┐
//!                      ▼                       ▼                       ▼
//!              dashboard::descriptor   archive::fetcher          http::server
//!                 (config.json)       (poll + unpack) ──▶ cache ──▶ (REST + static)
//! ```

// Core subsystems
pub mod archive;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::schema::HistoryServerConfig;
pub use error::HistoryServerError;
pub use lifecycle::{HistoryServer, ShutdownHooks};
