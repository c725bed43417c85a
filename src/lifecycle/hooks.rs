//! Process-exit hook registry.
//!
//! Components that own external resources register a hook here at
//! construction and deregister it once they have cleaned up on their own.
//! Whatever is still registered when the process is asked to terminate is run
//! by [`ShutdownHooks::run_all`], which `signals::install_signal_handler`
//! wires to SIGINT/SIGTERM. Tests call `run_all` directly to simulate exit.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Future returned by a hook.
pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A hook run at most once, on process exit.
pub type ShutdownHook = Box<dyn FnOnce() -> HookFuture + Send + 'static>;

/// Identifies a registered hook for deregistration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

struct Registered {
    id: HookId,
    name: String,
    hook: ShutdownHook,
}

/// Registry of hooks run when the process is asked to exit.
#[derive(Default)]
pub struct ShutdownHooks {
    next_id: AtomicU64,
    hooks: Mutex<Vec<Registered>>,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` under a descriptive `name`.
    pub fn register<F, Fut>(&self, name: impl Into<String>, hook: F) -> HookId
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: ShutdownHook = Box::new(move || -> HookFuture { Box::pin(hook()) });
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = name.into();
        tracing::debug!(hook = %name, "Registered shutdown hook");

        self.lock().push(Registered { id, name, hook });
        id
    }

    /// Remove a hook. Returns `false` if it was not registered, which is the
    /// case once `run_all` has taken it.
    pub fn deregister(&self, id: HookId) -> bool {
        let mut hooks = self.lock();
        match hooks.iter().position(|h| h.id == id) {
            Some(index) => {
                let removed = hooks.remove(index);
                tracing::debug!(hook = %removed.name, "Deregistered shutdown hook");
                true
            }
            None => false,
        }
    }

    /// Number of hooks currently registered.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every registered hook in registration order, removing them.
    ///
    /// Hooks may deregister themselves while running.
    pub async fn run_all(&self) {
        let hooks = std::mem::take(&mut *self.lock());
        for registered in hooks {
            tracing::info!(hook = %registered.name, "Running shutdown hook");
            (registered.hook)().await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Registered>> {
        // A panicking hook must not disable the registry
        self.hooks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for ShutdownHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.lock().iter().map(|h| h.name.clone()).collect();
        f.debug_struct("ShutdownHooks").field("hooks", &names).finish()
    }
}
