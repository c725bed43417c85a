//! Local cache directory subsystem.
//!
//! # Data Flow
//! ```text
//! lifecycle::HistoryServer::start
//!     → directory.rs (create)
//!     → dashboard descriptor + archive fetcher write into it (write_atomic)
//!     → web frontend reads from it
//! lifecycle::HistoryServer::stop
//!     → directory.rs (remove)
//! ```
//!
//! # Design Decisions
//! - The directory is ephemeral: recreated on start, deleted on stop
//! - Writers go through temp-file-then-rename so readers never see partial files

pub mod directory;

pub use directory::{create_cache_dir, default_cache_dir, remove_cache_dir, write_atomic};
