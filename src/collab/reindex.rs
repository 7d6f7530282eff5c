//! Background reindex queue
//!
//! At most one rebuild runs at a time. A request made while one is in flight
//! is dropped (the running rebuild already covers it). Errors are logged, never
//! returned to the requester.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;

/// One unit of reindex work
#[async_trait]
pub trait ReindexJob: Send + Sync + 'static {
    /// Rebuild and persist the index; returns how many memories were indexed
    async fn run(&self) -> Result<usize>;
}

/// Clears the in-flight flag when the task ends, even by panic
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Default)]
pub struct ReindexQueue {
    in_flight: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReindexQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `job` in the background unless a rebuild is already running
    ///
    /// Returns whether the job was started. Needs a tokio runtime.
    pub fn request(&self, job: Arc<dyn ReindexJob>) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("reindex requested outside a runtime, skipped");
            return false;
        };

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("reindex already in flight");
            return false;
        }

        let guard = InFlight(Arc::clone(&self.in_flight));
        let handle = runtime.spawn(async move {
            let _guard = guard;
            match job.run().await {
                Ok(count) => info!(count, "reindex finished"),
                Err(e) => warn!(error = %e, "reindex failed"),
            }
        });

        *self.handle.lock().unwrap_or_else(|p| p.into_inner()) = Some(handle);
        true
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Wait up to `timeout` for the current rebuild
    ///
    /// Returns `false` if it was still running when the timeout expired.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let handle = self.handle.lock().unwrap_or_else(|p| p.into_inner()).take();
        let Some(handle) = handle else {
            return true;
        };

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "reindex task aborted");
                true
            }
            Err(_) => {
                warn!(?timeout, "reindex still running, leaving it behind");
                false
            }
        }
    }
}
