//! Best-effort loader for per-kernel extension modules.
//!
//! # Responsibility
//! - Fetch a kernel's extension module by URL and run its init entry point.
//! - Report every failure through logs only.
//!
//! # Invariants
//! - Loading never panics into the caller and never retries.
//! - `spawn_load` returns immediately; nothing waits on the spawned task.

use crate::logging::panic_payload_message;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

type EntryPoint = Box<dyn FnOnce() + Send>;

/// A fetched extension module.
pub struct ExtensionModule {
    onload: Option<EntryPoint>,
}

impl ExtensionModule {
    /// Module exposing a no-argument init entry point.
    pub fn with_onload<F>(onload: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            onload: Some(Box::new(onload)),
        }
    }

    /// Module that loaded but declares no entry point.
    pub fn without_entry_point() -> Self {
        Self { onload: None }
    }

    pub fn has_entry_point(&self) -> bool {
        self.onload.is_some()
    }
}

impl Debug for ExtensionModule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionModule")
            .field("has_entry_point", &self.has_entry_point())
            .finish()
    }
}

/// Extension load failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionLoadError {
    /// Network or evaluation failure while fetching the module.
    Fetch(String),
    /// The init entry point panicked.
    EntryPointPanicked(String),
}

impl Display for ExtensionLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(message) => write!(f, "failed to fetch extension module: {message}"),
            Self::EntryPointPanicked(message) => {
                write!(f, "extension entry point panicked: {message}")
            }
        }
    }
}

impl Error for ExtensionLoadError {}

/// Module source contract, e.g. a script host or plugin resolver.
pub trait ModuleFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<ExtensionModule, ExtensionLoadError>;
}

/// Result of one load attempt, observed for logging and tests only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Initialized,
    MissingEntryPoint,
    Failed(ExtensionLoadError),
}

/// Loads extension modules through a `ModuleFetcher`.
#[derive(Clone)]
pub struct ExtensionLoader {
    fetcher: Arc<dyn ModuleFetcher>,
}

impl ExtensionLoader {
    pub fn new(fetcher: Arc<dyn ModuleFetcher>) -> Self {
        Self { fetcher }
    }

    /// Loads one module on the calling thread.
    pub fn load(&self, kernel_name: &str, url: &str) -> LoadOutcome {
        let module = match self.fetcher.fetch(url) {
            Ok(module) => module,
            Err(err) => {
                warn!(
                    "event=extension_load module=extension status=error kernel={} url={} error={}",
                    kernel_name, url, err
                );
                return LoadOutcome::Failed(err);
            }
        };

        let Some(onload) = module.onload else {
            warn!(
                "event=extension_load module=extension status=degraded kernel={} url={} error_code=missing_entry_point",
                kernel_name, url
            );
            return LoadOutcome::MissingEntryPoint;
        };

        match catch_unwind(AssertUnwindSafe(onload)) {
            Ok(()) => {
                info!(
                    "event=extension_load module=extension status=ok kernel={} url={}",
                    kernel_name, url
                );
                LoadOutcome::Initialized
            }
            Err(payload) => {
                let err =
                    ExtensionLoadError::EntryPointPanicked(panic_payload_message(payload.as_ref()));
                warn!(
                    "event=extension_load module=extension status=error kernel={} url={} error={}",
                    kernel_name, url, err
                );
                LoadOutcome::Failed(err)
            }
        }
    }

    /// Starts a load on a detached worker thread.
    ///
    /// Returns `None` when the worker could not be spawned; that failure is
    /// logged and otherwise ignored.
    pub fn spawn_load(&self, kernel_name: &str, url: &str) -> Option<JoinHandle<LoadOutcome>> {
        let loader = self.clone();
        let kernel = kernel_name.to_string();
        let target = url.to_string();
        let spawned = std::thread::Builder::new()
            .name(format!("kernel-ext-{kernel_name}"))
            .spawn(move || loader.load(&kernel, &target));

        match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(
                    "event=extension_load module=extension status=error kernel={} url={} error_code=spawn_failed error={}",
                    kernel_name, url, err
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExtensionLoadError, ExtensionLoader, ExtensionModule, LoadOutcome, ModuleFetcher};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StaticFetcher {
        calls: Arc<AtomicUsize>,
        mode: &'static str,
    }

    impl ModuleFetcher for StaticFetcher {
        fn fetch(&self, url: &str) -> Result<ExtensionModule, ExtensionLoadError> {
            match self.mode {
                "ok" => {
                    let calls = Arc::clone(&self.calls);
                    Ok(ExtensionModule::with_onload(move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                    }))
                }
                "bare" => Ok(ExtensionModule::without_entry_point()),
                "panic" => Ok(ExtensionModule::with_onload(|| panic!("boom"))),
                _ => Err(ExtensionLoadError::Fetch(format!("404 for {url}"))),
            }
        }
    }

    fn loader(mode: &'static str) -> (ExtensionLoader, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = StaticFetcher {
            calls: Arc::clone(&calls),
            mode,
        };
        (ExtensionLoader::new(Arc::new(fetcher)), calls)
    }

    #[test]
    fn runs_entry_point_once() {
        let (loader, calls) = loader("ok");
        assert_eq!(loader.load("ir", "/kernel.js"), LoadOutcome::Initialized);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_entry_point_is_not_fatal() {
        let (loader, _) = loader("bare");
        assert_eq!(
            loader.load("ir", "/kernel.js"),
            LoadOutcome::MissingEntryPoint
        );
    }

    #[test]
    fn fetch_failure_is_reported_without_panicking() {
        let (loader, calls) = loader("missing");
        let outcome = loader.load("ir", "/kernel.js");
        assert_eq!(
            outcome,
            LoadOutcome::Failed(ExtensionLoadError::Fetch("404 for /kernel.js".to_string()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_entry_point_is_contained() {
        let (loader, _) = loader("panic");
        match loader.load("ir", "/kernel.js") {
            LoadOutcome::Failed(ExtensionLoadError::EntryPointPanicked(message)) => {
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn spawn_load_runs_on_worker_thread() {
        let (loader, calls) = loader("ok");
        let handle = loader
            .spawn_load("ir", "/kernel.js")
            .expect("worker should spawn");
        assert_eq!(handle.join().expect("join"), LoadOutcome::Initialized);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
