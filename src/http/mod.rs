//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum-server, plain or rustls)
//!     → request.rs (assign x-request-id)
//!     → routes.rs (REST routes, static fallback)
//!     → <cache directory>
//! ```

pub mod request;
pub mod routes;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use routes::build_router;
pub use server::{HttpFrontend, ServeOptions, WebServer};
