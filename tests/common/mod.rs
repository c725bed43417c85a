//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use history_server::archive::{ArchiveFetcher, FetchError, FetcherFactory};
use history_server::config::HistoryServerConfig;
use history_server::http::{ServeOptions, WebServer};

/// Port reported by [`FakeWebServer`].
pub const FAKE_PORT: u16 = 4242;

/// How often each collaborator was driven by the server.
#[derive(Debug, Default)]
pub struct Calls {
    pub fetcher_started: AtomicUsize,
    pub fetcher_stopped: AtomicUsize,
    pub web_started: AtomicUsize,
    pub web_shutdown: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct FakeFetcher {
    calls: Arc<Calls>,
    fail_stop: bool,
}

#[async_trait]
impl ArchiveFetcher for FakeFetcher {
    async fn start(&mut self) -> Result<(), FetchError> {
        self.calls.fetcher_started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), FetchError> {
        self.calls.fetcher_stopped.fetch_add(1, Ordering::SeqCst);
        // Widen the window for racing stops
        tokio::time::sleep(Duration::from_millis(5)).await;
        if self.fail_stop {
            return Err(FetchError::Other("injected stop failure".into()));
        }
        Ok(())
    }
}

/// A factory for [`FakeFetcher`]s reporting into `calls`.
pub fn fake_fetcher(calls: &Arc<Calls>, fail_stop: bool) -> FetcherFactory {
    let calls = calls.clone();
    Box::new(move |_context| -> Box<dyn ArchiveFetcher> {
        Box::new(FakeFetcher { calls, fail_stop })
    })
}

pub struct FakeWebServer {
    calls: Arc<Calls>,
    fail_start: bool,
    port: Option<u16>,
}

impl FakeWebServer {
    pub fn boxed(calls: &Arc<Calls>, fail_start: bool) -> Box<dyn WebServer> {
        Box::new(Self {
            calls: calls.clone(),
            fail_start,
            port: None,
        })
    }
}

#[async_trait]
impl WebServer for FakeWebServer {
    async fn start(&mut self, options: ServeOptions) -> io::Result<SocketAddr> {
        self.calls.web_started.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(io::Error::new(io::ErrorKind::AddrInUse, "port already in use"));
        }
        assert!(options.static_root.is_dir(), "cache directory must exist before binding");
        self.port = Some(FAKE_PORT);
        Ok(SocketAddr::from(([127, 0, 0, 1], FAKE_PORT)))
    }

    fn port(&self) -> Option<u16> {
        self.port
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.calls.web_shutdown.fetch_add(1, Ordering::SeqCst);
        self.port = None;
        Ok(())
    }
}

/// `file://` URI of a local directory.
pub fn location_uri(dir: &Path) -> String {
    url::Url::from_directory_path(dir)
        .expect("absolute directory path")
        .to_string()
}

/// A config reading from `dirs`, caching under `cache_dir` and binding to
/// an ephemeral loopback port.
pub fn test_config(dirs: Option<String>, cache_dir: PathBuf) -> HistoryServerConfig {
    let mut config = HistoryServerConfig::default();
    config.web.address = "127.0.0.1".into();
    config.web.port = 0;
    config.web.tmp_dir = Some(cache_dir);
    config.web.shutdown_grace_ms = 200;
    config.archive.dirs = dirs;
    config.archive.refresh_interval_ms = 50;
    config
}

/// Write a job archive named `job_id` into `dir`.
pub fn write_archive(dir: &Path, job_id: &str) {
    let archive = serde_json::json!({
        "archive": [
            {
                "path": "/joboverview",
                "json": serde_json::json!({ "finished": [{ "jid": job_id, "state": "FINISHED" }] }).to_string(),
            },
            {
                "path": format!("/jobs/{job_id}"),
                "json": serde_json::json!({ "jid": job_id, "name": "word-count" }).to_string(),
            },
            {
                "path": format!("/jobs/{job_id}/vertices"),
                "json": serde_json::json!({ "vertices": [] }).to_string(),
            },
        ]
    });
    std::fs::write(dir.join(job_id), archive.to_string()).expect("write archive");
}

/// Poll `check` until it holds, failing after `timeout`.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
