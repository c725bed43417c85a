//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Define the contract the lifecycle controller drives (`start` / `shutdown`)
//! - Bind the listener and report the actually bound port
//! - Serve the router over plain TCP or rustls
//! - Drain in-flight requests on shutdown, bounded by a grace period

use async_trait::async_trait;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::http::routes::build_router;
use crate::net;

/// What the lifecycle controller hands to the web server on start.
#[derive(Clone)]
pub struct ServeOptions {
    pub address: String,
    pub port: u16,
    /// Directory served by the REST and static routes.
    pub static_root: PathBuf,
    pub tls: Option<RustlsConfig>,
}

/// A web server bound by the lifecycle controller.
#[async_trait]
pub trait WebServer: Send {
    /// Bind and begin serving. Returns the bound address.
    async fn start(&mut self, options: ServeOptions) -> io::Result<SocketAddr>;

    /// The bound port, while serving.
    fn port(&self) -> Option<u16>;

    /// Release the listener and every serving task. Safe to call when
    /// `start` never ran or failed part way.
    async fn shutdown(&mut self) -> io::Result<()>;
}

/// Default web server: axum router served by axum-server.
pub struct HttpFrontend {
    grace_period: Duration,
    handle: Option<Handle>,
    task: Option<JoinHandle<io::Result<()>>>,
    local_addr: Option<SocketAddr>,
}

impl HttpFrontend {
    /// Create a frontend that waits at most `grace_period` for in-flight
    /// requests on shutdown.
    pub fn new(grace_period: Duration) -> Self {
        Self {
            grace_period,
            handle: None,
            task: None,
            local_addr: None,
        }
    }
}

#[async_trait]
impl WebServer for HttpFrontend {
    async fn start(&mut self, options: ServeOptions) -> io::Result<SocketAddr> {
        if self.task.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "web server is already running",
            ));
        }

        let bound = net::bind(&options.address, options.port).map_err(net::ListenerError::into_io)?;
        let app = build_router(&options.static_root).into_make_service();
        let handle = Handle::new();

        let task = match options.tls {
            Some(tls) => tokio::spawn(
                axum_server::tls_rustls::from_tcp_rustls(bound.listener, tls)
                    .handle(handle.clone())
                    .serve(app),
            ),
            None => tokio::spawn(
                axum_server::from_tcp(bound.listener)
                    .handle(handle.clone())
                    .serve(app),
            ),
        };

        tracing::info!(
            address = %bound.local_addr,
            root = %options.static_root.display(),
            "Web frontend listening"
        );

        self.handle = Some(handle);
        self.task = Some(task);
        self.local_addr = Some(bound.local_addr);
        Ok(bound.local_addr)
    }

    fn port(&self) -> Option<u16> {
        self.local_addr.map(|addr| addr.port())
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.local_addr = None;
        if let Some(handle) = self.handle.take() {
            handle.graceful_shutdown(Some(self.grace_period));
        }

        let Some(task) = self.task.take() else {
            return Ok(());
        };
        let result = task.await.map_err(io::Error::other)?;
        tracing::info!("Web frontend stopped");
        result
    }
}
