//! The history server lifecycle controller.
//!
//! # State machine
//! ```text
//!            start() ok
//! Created ──────────────▶ Running
//!    │  start() err            │
//!    │  (rolled back)          │ stop()
//!    ▼                         ▼
//! Stopped ◀────────────────────┘   (terminal; stop() from Created also lands here)
//! ```
//!
//! `start()` and `stop()` run under one async mutex around the lifecycle
//! state, so neither can observe the other half done. The state value is
//! also the shutdown guard: the first `stop()` to take the lock tears down,
//! every later one finds `Stopped` and returns without side effects.

use chrono::{DateTime, FixedOffset, Local};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};

use crate::archive::{
    resolve_locations, ArchiveFetcher, BackendRegistry, FetcherContext, FetcherFactory,
    PollingArchiveFetcher, RefreshLocation,
};
use crate::cache;
use crate::config::{validate_config, ConfigError, HistoryServerConfig};
use crate::dashboard::DashboardDescriptor;
use crate::error::{HistoryServerError, Result};
use crate::http::{HttpFrontend, ServeOptions, WebServer};
use crate::lifecycle::hooks::{HookId, ShutdownHooks};
use crate::net;

/// Name under which the server registers its exit hook.
const HOOK_NAME: &str = "HistoryServer";

/// Lifecycle state of a [`HistoryServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Running,
    Stopped,
}

/// Validated settings, fixed for the lifetime of a server.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub address: String,
    pub port: u16,
    pub web_refresh_interval: Duration,
    pub cache_dir: PathBuf,
    pub tls_enabled: bool,
    /// Raw entries of the archive location list, in configured order.
    pub archive_dirs: Vec<String>,
    pub archive_refresh_interval: Duration,
    pub shutdown_grace: Duration,
}

/// Serves the cache of finished job archives over HTTP.
///
/// Cloning yields another handle to the same server.
#[derive(Clone)]
pub struct HistoryServer {
    inner: Arc<Inner>,
}

struct Inner {
    config: ServiceConfig,
    locations: Vec<RefreshLocation>,
    tls: Option<axum_server::tls_rustls::RustlsConfig>,
    hooks: Arc<ShutdownHooks>,
    hook_id: HookId,
    lifecycle: Mutex<Lifecycle>,
    stopped: watch::Sender<bool>,
}

struct Lifecycle {
    state: LifecycleState,
    fetcher: Box<dyn ArchiveFetcher>,
    web: Box<dyn WebServer>,
}

/// Assembles a [`HistoryServer`], with injectable collaborators.
pub struct HistoryServerBuilder {
    config: HistoryServerConfig,
    hooks: Option<Arc<ShutdownHooks>>,
    backends: BackendRegistry,
    fetcher: Option<FetcherFactory>,
    web: Option<Box<dyn WebServer>>,
}

impl HistoryServerBuilder {
    /// Registry the server's exit hook goes into. Defaults to a private one.
    pub fn hooks(mut self, hooks: Arc<ShutdownHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Storage backends archive locations may bind to.
    pub fn backends(mut self, backends: BackendRegistry) -> Self {
        self.backends = backends;
        self
    }

    pub fn fetcher_factory(mut self, factory: FetcherFactory) -> Self {
        self.fetcher = Some(factory);
        self
    }

    pub fn web_server(mut self, web: Box<dyn WebServer>) -> Self {
        self.web = Some(web);
        self
    }

    /// Validate the configuration and construct the server.
    ///
    /// Nothing is written to disk. Fails if the configuration is invalid, if
    /// no archive location survives validation, or if TLS is enabled and the
    /// TLS context cannot be loaded.
    pub async fn build(self) -> Result<HistoryServer> {
        let config = self.config;
        validate_config(&config).map_err(ConfigError::Validation)?;

        let tls = net::server_tls_context(&config.web.ssl)
            .await
            .map_err(ConfigError::Tls)?;

        let raw_dirs = config.archive.dirs.as_deref();
        let locations = resolve_locations(raw_dirs, &self.backends)?;

        let cache_dir = config
            .web
            .tmp_dir
            .clone()
            .unwrap_or_else(cache::default_cache_dir);

        let service = ServiceConfig {
            address: config.web.address.clone(),
            port: config.web.port,
            web_refresh_interval: Duration::from_millis(config.web.refresh_interval_ms),
            cache_dir,
            tls_enabled: tls.is_some(),
            archive_dirs: raw_dirs
                .unwrap_or_default()
                .split(crate::archive::location::LOCATION_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            archive_refresh_interval: Duration::from_millis(config.archive.refresh_interval_ms),
            shutdown_grace: Duration::from_millis(config.web.shutdown_grace_ms),
        };

        let fetcher_factory = self.fetcher.unwrap_or_else(PollingArchiveFetcher::factory);
        let fetcher = fetcher_factory(FetcherContext {
            refresh_interval: service.archive_refresh_interval,
            locations: locations.clone(),
            cache_dir: service.cache_dir.clone(),
        });
        let web = self
            .web
            .unwrap_or_else(|| Box::new(HttpFrontend::new(service.shutdown_grace)));
        let hooks = self.hooks.unwrap_or_default();

        tracing::info!(
            address = %service.address,
            port = service.port,
            cache_dir = %service.cache_dir.display(),
            locations = locations.len(),
            tls = service.tls_enabled,
            "History server configured"
        );

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            let hook_id = hooks.register(HOOK_NAME, move || async move {
                if let Some(inner) = weak.upgrade() {
                    inner.stop().await;
                }
            });

            Inner {
                config: service,
                locations,
                tls,
                hooks: hooks.clone(),
                hook_id,
                lifecycle: Mutex::new(Lifecycle {
                    state: LifecycleState::Created,
                    fetcher,
                    web,
                }),
                stopped: watch::channel(false).0,
            }
        });

        Ok(HistoryServer { inner })
    }
}

impl HistoryServer {
    pub fn builder(config: HistoryServerConfig) -> HistoryServerBuilder {
        HistoryServerBuilder {
            config,
            hooks: None,
            backends: BackendRegistry::default(),
            fetcher: None,
            web: None,
        }
    }

    /// Construct a server with the default fetcher and web frontend.
    pub async fn new(config: HistoryServerConfig, hooks: Arc<ShutdownHooks>) -> Result<Self> {
        Self::builder(config).hooks(hooks).build().await
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// The local cache directory (it only exists while running).
    pub fn cache_dir(&self) -> &Path {
        &self.inner.config.cache_dir
    }

    /// The archive locations that survived validation.
    pub fn locations(&self) -> &[RefreshLocation] {
        &self.inner.locations
    }

    pub async fn state(&self) -> LifecycleState {
        self.inner.lifecycle.lock().await.state
    }

    /// The port the web server is bound to, while running.
    pub async fn web_port(&self) -> Option<u16> {
        let lifecycle = self.inner.lifecycle.lock().await;
        match lifecycle.state {
            LifecycleState::Running => lifecycle.web.port(),
            _ => None,
        }
    }

    /// Create the cache directory, write the dashboard descriptor, start the
    /// archive fetcher and bind the web server, in that order.
    ///
    /// May only be called once. If any step fails, the steps already taken
    /// are torn down, the server ends up `Stopped` and the error is returned.
    pub async fn start(&self) -> Result<()> {
        let inner = &self.inner;
        let mut lifecycle = inner.lifecycle.lock().await;
        if lifecycle.state != LifecycleState::Created {
            return Err(HistoryServerError::IllegalState {
                operation: "start",
                state: lifecycle.state,
            });
        }

        tracing::info!("Starting history server");
        match inner.bring_up(&mut lifecycle, Local::now().into()).await {
            Ok(addr) => {
                lifecycle.state = LifecycleState::Running;
                tracing::info!(address = %addr, "History server started");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to start history server, rolling back");
                inner.tear_down(&mut lifecycle).await;
                Err(e)
            }
        }
    }

    /// Stop the server. Idempotent and safe to call concurrently.
    ///
    /// A server that never started only moves to `Stopped` and deregisters
    /// its exit hook; the cache directory is left alone. Otherwise shuts down the web server, stops the fetcher, deletes the cache
    /// directory and deregisters the exit hook. A failing step is logged and
    /// the remaining steps still run.
    pub async fn stop(&self) {
        self.inner.stop().await;
    }

    /// Start, then wait until the server is stopped by [`stop`](Self::stop) or
    /// by its exit hook. Always leaves the server stopped.
    pub async fn run(&self) -> Result<()> {
        let mut stopped = self.inner.stopped.subscribe();

        let result = self.start().await;
        match &result {
            Ok(()) => {
                // The sender lives in `inner`, so this only returns once stopped
                let _ = stopped.wait_for(|stopped| *stopped).await;
            }
            Err(e) => tracing::error!(error = %e, "Failure while running history server"),
        }

        self.stop().await;
        result
    }

    /// Resolve once the server has been stopped.
    pub async fn stopped(&self) {
        let mut stopped = self.inner.stopped.subscribe();
        let _ = stopped.wait_for(|stopped| *stopped).await;
    }
}

impl Inner {
    async fn bring_up(
        &self,
        lifecycle: &mut Lifecycle,
        now: DateTime<FixedOffset>,
    ) -> Result<SocketAddr> {
        let cache_dir = &self.config.cache_dir;
        cache::create_cache_dir(cache_dir).map_err(|source| {
            HistoryServerError::CacheDirectory {
                path: cache_dir.clone(),
                source,
            }
        })?;
        tracing::info!(cache_dir = %cache_dir.display(), "Using directory as local cache");

        DashboardDescriptor::new(self.config.web_refresh_interval, now).write_to(cache_dir)?;

        lifecycle.fetcher.start().await?;

        let options = ServeOptions {
            address: self.config.address.clone(),
            port: self.config.port,
            static_root: cache_dir.clone(),
            tls: self.tls.clone(),
        };
        lifecycle
            .web
            .start(options)
            .await
            .map_err(|source| HistoryServerError::WebServer {
                address: self.config.address.clone(),
                port: self.config.port,
                source,
            })
    }

    async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        match lifecycle.state {
            LifecycleState::Stopped => {}
            LifecycleState::Created => {
                lifecycle.state = LifecycleState::Stopped;
                self.hooks.deregister(self.hook_id);
                tracing::info!("Stopped history server before it was started");
                self.stopped.send_replace(true);
            }
            LifecycleState::Running => self.tear_down(&mut lifecycle).await,
        }
    }

    /// Runs every teardown step exactly once. Caller holds the lifecycle lock.
    async fn tear_down(&self, lifecycle: &mut Lifecycle) {
        tracing::info!("Stopping history server");
        lifecycle.state = LifecycleState::Stopped;

        if let Err(e) = lifecycle.web.shutdown().await {
            tracing::warn!(error = %e, "Error while shutting down web server");
        }

        if let Err(e) = lifecycle.fetcher.stop().await {
            tracing::warn!(error = %e, "Error while stopping archive fetcher");
        }

        let cache_dir = &self.config.cache_dir;
        tracing::info!(cache_dir = %cache_dir.display(), "Removing local cache directory");
        if let Err(e) = cache::remove_cache_dir(cache_dir) {
            tracing::warn!(cache_dir = %cache_dir.display(), error = %e, "Error while deleting local cache directory");
        }

        if !self.hooks.deregister(self.hook_id) {
            tracing::debug!("Shutdown hook already taken, process is exiting");
        }

        tracing::info!("Stopped history server");
        self.stopped.send_replace(true);
    }
}
