//! Periodic archive fetching.
//!
//! # Responsibilities
//! - Define the contract the lifecycle controller drives (`start` / `stop`)
//! - Poll every refresh location at a fixed cadence
//! - Unpack archives not seen before into the cache directory
//! - Keep the merged job overview up to date

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::archive::bundle::{self, ArchiveError};
use crate::archive::location::RefreshLocation;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Errors reported by an archive fetcher's `start` or `stop`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("archive fetcher was already started")]
    AlreadyStarted,

    #[error("failed to prepare cache directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive fetcher task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Other(String),
}

/// A background poller that pulls archives into the cache directory.
#[async_trait]
pub trait ArchiveFetcher: Send {
    /// Begin polling. Must return without waiting for the first poll.
    async fn start(&mut self) -> Result<(), FetchError>;

    /// Stop polling. Returns once no further writes to the cache directory
    /// will happen. Stopping a fetcher that never started is a no-op.
    async fn stop(&mut self) -> Result<(), FetchError>;
}

/// Everything a fetcher needs from the lifecycle controller.
#[derive(Debug, Clone)]
pub struct FetcherContext {
    pub refresh_interval: Duration,
    pub locations: Vec<RefreshLocation>,
    pub cache_dir: PathBuf,
}

/// Builds the fetcher once the controller has resolved its locations.
pub type FetcherFactory = Box<dyn FnOnce(FetcherContext) -> Box<dyn ArchiveFetcher> + Send>;

/// Default fetcher: a tokio task ticking at the refresh interval.
pub struct PollingArchiveFetcher {
    context: Arc<FetcherContext>,
    shutdown: Shutdown,
    task: Option<JoinHandle<()>>,
    cycles: Option<watch::Sender<u64>>,
}

impl PollingArchiveFetcher {
    pub fn new(context: FetcherContext) -> Self {
        Self {
            context: Arc::new(context),
            shutdown: Shutdown::new(),
            task: None,
            cycles: None,
        }
    }

    /// Report the number of completed poll cycles through `tx`.
    pub fn with_cycle_reporter(mut self, tx: watch::Sender<u64>) -> Self {
        self.cycles = Some(tx);
        self
    }

    /// A [`FetcherFactory`] producing this fetcher.
    pub fn factory() -> FetcherFactory {
        Box::new(|context| -> Box<dyn ArchiveFetcher> { Box::new(PollingArchiveFetcher::new(context)) })
    }
}

#[async_trait]
impl ArchiveFetcher for PollingArchiveFetcher {
    async fn start(&mut self) -> Result<(), FetchError> {
        if self.task.is_some() || self.shutdown.is_triggered() {
            return Err(FetchError::AlreadyStarted);
        }

        bundle::init_overview(&self.context.cache_dir)?;

        let worker = FetchWorker {
            context: self.context.clone(),
            processed: HashSet::new(),
            cycles: self.cycles.take(),
            completed: 0,
        };
        let shutdown = self.shutdown.subscribe();
        self.task = Some(tokio::spawn(worker.run(shutdown)));

        tracing::info!(
            interval_ms = self.context.refresh_interval.as_millis() as u64,
            locations = self.context.locations.len(),
            "Archive fetcher started"
        );
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), FetchError> {
        self.shutdown.trigger();
        if let Some(task) = self.task.take() {
            task.await?;
            tracing::info!("Archive fetcher stopped");
        }
        Ok(())
    }
}

struct FetchWorker {
    context: Arc<FetcherContext>,
    /// `<location>/<archive>` keys already unpacked.
    processed: HashSet<String>,
    cycles: Option<watch::Sender<u64>>,
    completed: u64,
}

impl FetchWorker {
    async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval(self.context.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.fetch_cycle().await;
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Archive fetcher received stop signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn fetch_cycle(&mut self) {
        let mut fetched = 0;

        for location in self.context.locations.clone() {
            let names = match location.backend().list(location.uri()).await {
                Ok(names) => names,
                Err(e) => {
                    tracing::warn!(location = %location, error = %e, "Failed to list archive location");
                    metrics::record_fetch_error("list");
                    continue;
                }
            };

            for name in names {
                let key = format!("{}/{}", location.uri(), name);
                if self.processed.contains(&key) {
                    continue;
                }

                match self.fetch_archive(&location, &name).await {
                    Ok(files) => {
                        tracing::info!(location = %location, archive = %name, files, "Processed job archive");
                        self.processed.insert(key);
                        fetched += 1;
                    }
                    Err(e) => {
                        tracing::warn!(location = %location, archive = %name, error = %e, "Failed to process job archive");
                        metrics::record_fetch_error("archive");
                    }
                }
            }
        }

        if fetched > 0 {
            let cache_dir = self.context.cache_dir.clone();
            match tokio::task::spawn_blocking(move || bundle::update_overview(&cache_dir)).await {
                Ok(Ok(jobs)) => tracing::debug!(jobs, "Updated job overview"),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Failed to update job overview");
                    metrics::record_fetch_error("overview");
                }
                Err(e) => tracing::warn!(error = %e, "Job overview task failed"),
            }
        }

        metrics::record_fetch_cycle(fetched);
        self.completed += 1;
        if let Some(cycles) = &self.cycles {
            cycles.send_replace(self.completed);
        }
    }

    async fn fetch_archive(&self, location: &RefreshLocation, name: &str) -> Result<usize, ArchiveError> {
        let bytes = location.backend().read(location.uri(), name).await?;
        let cache_dir = self.context.cache_dir.clone();
        let name = name.to_string();

        tokio::task::spawn_blocking(move || bundle::unpack_archive(&cache_dir, &name, &bytes))
            .await
            .map_err(|e| ArchiveError::Io(std::io::Error::other(e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::backend::BackendRegistry;
    use crate::archive::location::resolve_locations;
    use serde_json::json;

    fn write_archive(dir: &std::path::Path, job_id: &str) {
        let archive = json!({
            "archive": [
                { "path": "/joboverview", "json": json!({"finished": [{"jid": job_id}]}).to_string() },
                { "path": format!("/jobs/{job_id}"), "json": json!({"jid": job_id}).to_string() },
            ]
        });
        std::fs::write(dir.join(job_id), archive.to_string()).unwrap();
    }

    #[tokio::test]
    async fn test_polls_new_archives_until_stopped() {
        let archives = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        write_archive(archives.path(), "job-1");
        std::fs::write(archives.path().join("garbage"), "nope").unwrap();

        let uri = url::Url::from_directory_path(archives.path()).unwrap();
        let locations = resolve_locations(Some(uri.as_str()), &BackendRegistry::default()).unwrap();

        let (tx, mut rx) = watch::channel(0);
        let mut fetcher = PollingArchiveFetcher::new(FetcherContext {
            refresh_interval: Duration::from_millis(20),
            locations,
            cache_dir: cache.path().to_path_buf(),
        })
        .with_cycle_reporter(tx);

        fetcher.start().await.unwrap();
        assert!(matches!(fetcher.start().await, Err(FetchError::AlreadyStarted)));
        rx.wait_for(|n| *n >= 1).await.unwrap();
        assert!(cache.path().join("jobs/job-1.json").is_file());

        write_archive(archives.path(), "job-2");
        let seen = *rx.borrow();
        rx.wait_for(|n| *n >= seen + 2).await.unwrap();
        assert!(cache.path().join("jobs/job-2.json").is_file());

        let overview: serde_json::Value = serde_json::from_slice(
            &std::fs::read(cache.path().join(bundle::OVERVIEW_FILE_NAME)).unwrap(),
        )
        .unwrap();
        assert_eq!(overview["finished"].as_array().unwrap().len(), 2);

        fetcher.stop().await.unwrap();
        fetcher.stop().await.unwrap();
        let stopped_at = *rx.borrow();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(*rx.borrow(), stopped_at);
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let mut fetcher = PollingArchiveFetcher::new(FetcherContext {
            refresh_interval: Duration::from_secs(1),
            locations: Vec::new(),
            cache_dir: PathBuf::from("/nonexistent"),
        });
        fetcher.stop().await.unwrap();
        assert!(matches!(fetcher.start().await, Err(FetchError::AlreadyStarted)));
    }
}
