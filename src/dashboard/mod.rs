//! Dashboard bootstrap subsystem.
//!
//! # Data Flow
//! ```text
//! web.refresh_interval_ms + local time + build metadata
//!     → descriptor.rs (DashboardDescriptor)
//!     → <cache>/config.json (atomic replace)
//!     → served under GET /config
//! ```

pub mod descriptor;

pub use descriptor::{DashboardDescriptor, DescriptorError, DESCRIPTOR_FILE_NAME};
