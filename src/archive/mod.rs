//! Archive subsystem.
//!
//! # Data Flow
//! ```text
//! archive.dirs ("file:///a,file:///b")
//!     → location.rs (split, normalize, bind to a backend; bad entries dropped)
//!     → Vec<RefreshLocation>
//!     → fetcher.rs (periodic poll of every location)
//!     → backend.rs (list + read archives)
//!     → bundle.rs (unpack into cache dir, merge job overview)
//! ```
//!
//! # Design Decisions
//! - Archives are immutable: each one is unpacked once per server run
//! - A failing location or archive never stops the polling cadence
//! - The lifecycle controller only sees the `ArchiveFetcher` trait

pub mod backend;
pub mod bundle;
pub mod fetcher;
pub mod location;

pub use backend::{BackendRegistry, LocalFileSystem, StorageBackend};
pub use fetcher::{ArchiveFetcher, FetchError, FetcherContext, FetcherFactory, PollingArchiveFetcher};
pub use location::{resolve_locations, LocationError, RefreshLocation};
