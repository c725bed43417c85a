//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! web.address + web.port
//!     → listener.rs (bind, report the actually bound port)
//!     → tls.rs (optional rustls context from PEM files)
//!     → http::server (axum-server, plain or TLS)
//! ```

pub mod listener;
pub mod tls;

pub use listener::{bind, BoundListener, ListenerError};
pub use tls::{load_tls_config, server_tls_context};
