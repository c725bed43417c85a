//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Construction (controller.rs):
//!     Validate config → Resolve archive locations → Load TLS → Register exit hook
//!
//! Startup (controller.rs):
//!     Create cache dir → Write dashboard descriptor → Start fetcher → Bind web server
//!
//! Shutdown (controller.rs):
//!     Stop web server → Stop fetcher → Delete cache dir → Deregister exit hook
//!
//! Signals (signals.rs → hooks.rs):
//!     SIGTERM/SIGINT → Run registered exit hooks → HistoryServer::stop
//! ```
//!
//! # Design Decisions
//! - Construction is all-or-nothing and touches no files
//! - Startup steps run in order; a failed startup is rolled back
//! - Shutdown is best effort: every step runs even if an earlier one failed

pub mod controller;
pub mod hooks;
pub mod shutdown;
pub mod signals;

pub use controller::{HistoryServer, HistoryServerBuilder, LifecycleState, ServiceConfig};
pub use hooks::{HookId, ShutdownHooks};
pub use shutdown::Shutdown;
pub use signals::install_signal_handler;
