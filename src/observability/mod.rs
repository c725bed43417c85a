//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
