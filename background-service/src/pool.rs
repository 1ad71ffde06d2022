use agora_core::{CoreError, ErrorExt, EventError, WorkerConfig};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::backtrace::Backtrace;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub panicked: u64,
    /// Queued tasks dropped by shutdown before they started
    pub cancelled: u64,
}

#[derive(Debug, Default)]
struct PoolCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    panicked: AtomicU64,
    cancelled: AtomicU64,
}

impl PoolCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Bounded pool for background units of work.
///
/// At most `max_concurrency` tasks run at once; the rest wait for a permit. Each running task gets
/// a child of the pool's cancellation token, which is cancelled when the task exceeds its timeout
/// or the pool shuts down. A panicking task is logged and counted without affecting the others.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    task_timeout: Duration,
    counters: Arc<PoolCounters>,
}

impl WorkerPool {
    pub fn new(max_concurrency: usize, task_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            task_timeout,
            counters: Arc::new(PoolCounters::default()),
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.max_concurrency, config.task_timeout())
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Tasks that are running or waiting for a permit.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Queue `task`. It receives a token that is cancelled on timeout or shutdown.
    pub fn submit<F, Fut>(&self, name: impl Into<String>, task: F) -> Result<(), CoreError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), CoreError>> + Send + 'static,
    {
        if self.is_shut_down() {
            return Err(EventError::PoolClosed.into());
        }

        let name = name.into();
        let semaphore = Arc::clone(&self.semaphore);
        let shutdown = self.shutdown.clone();
        let counters = Arc::clone(&self.counters);
        let task_timeout = self.task_timeout;
        PoolCounters::bump(&counters.submitted);

        self.tracker.spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("Task {} dropped before start, pool is shutting down", name);
                    PoolCounters::bump(&counters.cancelled);
                    return;
                }
                permit = semaphore.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        PoolCounters::bump(&counters.cancelled);
                        return;
                    }
                },
            };

            let token = shutdown.child_token();
            let run = AssertUnwindSafe(task(token.clone())).catch_unwind();

            match tokio::time::timeout(task_timeout, run).await {
                Ok(Ok(Ok(()))) => {
                    debug!("Task {} completed", name);
                    PoolCounters::bump(&counters.completed);
                }
                Ok(Ok(Err(e))) => {
                    warn!("Task {} failed [{}]: {}", name, e.error_code(), e);
                    PoolCounters::bump(&counters.failed);
                }
                // The backtrace was logged at the panic site by the hook.
                Ok(Err(panic)) => {
                    error!("Task {} panicked: {}", name, panic_message(panic.as_ref()));
                    PoolCounters::bump(&counters.panicked);
                }
                Err(_) => {
                    token.cancel();
                    let e = CoreError::Timeout {
                        seconds: task_timeout.as_secs(),
                    };
                    error!("Task {} cancelled [{}]: {}", name, e.error_code(), e);
                    PoolCounters::bump(&counters.timed_out);
                }
            }
        });

        Ok(())
    }

    /// Wait until every task submitted so far has finished. The pool stays open.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop accepting work and cancel running tasks' tokens, then wait for them.
    ///
    /// With `timeout` set, returns false if tasks were still running when it expired. Those tasks
    /// are abandoned and whatever they already applied stays applied.
    pub async fn shutdown(&self, timeout: Option<Duration>) -> bool {
        info!("Shutting down worker pool with {} pending tasks", self.pending());
        self.shutdown.cancel();
        self.tracker.close();

        let drained = match timeout {
            None => {
                self.tracker.wait().await;
                true
            }
            Some(limit) => tokio::time::timeout(limit, self.tracker.wait())
                .await
                .is_ok(),
        };

        if drained {
            info!("Worker pool drained");
        } else {
            warn!(
                "Worker pool shutdown timed out, abandoning {} tasks",
                self.pending()
            );
        }
        drained
    }

    pub fn stats(&self) -> PoolStats {
        let c = &self.counters;
        PoolStats {
            submitted: c.submitted.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            timed_out: c.timed_out.load(Ordering::Relaxed),
            panicked: c.panicked.load(Ordering::Relaxed),
            cancelled: c.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Log panics through `tracing` with a backtrace captured where the panic happened.
///
/// Pool tasks are unwound by `catch_unwind`, so by the time the pool sees a panic the stack is
/// gone. Install this once at startup, after the subscriber.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = Backtrace::force_capture();
        error!("{}\n{}", info, backtrace);
    }));
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
