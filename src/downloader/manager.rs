// Download orchestration: FIFO task queue, worker pool, admission gate
// and active-download registry.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::{error, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex as AsyncMutex, Notify, Semaphore};
use tokio::task::JoinHandle;

use super::errors::SubmitError;
use super::models::DownloadTask;
use super::traits::MediaExtractor;

/// Sizing for the worker pool and the admission gate.
///
/// The gate bounds how many tasks may sit in the blocking download step at
/// once. By default it equals the worker count, which makes the two bounds
/// coincide; operators can lower the gate below the worker count to
/// respect upstream rate limits while keeping queue-pop latency low.
#[derive(Debug, Clone)]
pub struct DownloadManagerConfig {
    pub workers: usize,
    pub max_concurrent_downloads: usize,
}

impl DownloadManagerConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            max_concurrent_downloads: workers,
        }
    }

    pub fn with_max_concurrent_downloads(mut self, limit: usize) -> Self {
        self.max_concurrent_downloads = limit;
        self
    }
}

impl Default for DownloadManagerConfig {
    fn default() -> Self {
        Self::new(4)
    }
}

/// State shared between the manager handle and its worker tasks.
struct Shared {
    /// Keys of tasks accepted and not yet finished
    registry: Mutex<HashSet<String>>,
    /// Counting admission gate for the blocking download step
    gate: Semaphore,
    /// Tasks accepted and not yet finished, for drain tracking
    pending: AtomicUsize,
    /// Signalled whenever `pending` drops to zero
    drained: Notify,
}

impl Shared {
    /// Unlock step: runs for every accepted task exactly once, success or
    /// failure.
    fn release(&self, key: &str) {
        self.registry.lock().unwrap().remove(key);
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Serializes and deduplicates media downloads against a rate-limited
/// upstream.
///
/// Submission is fire-and-forget: `submit` returns as soon as the task is
/// queued, and per-task failures are logged rather than surfaced. Callers
/// that need the outcome poll the cache for the artifact.
pub struct DownloadManager {
    extractor: Arc<dyn MediaExtractor>,
    config: DownloadManagerConfig,
    running: AtomicBool,
    sender: Mutex<Option<UnboundedSender<DownloadTask>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shared: Arc<Shared>,
}

impl DownloadManager {
    pub fn new(config: DownloadManagerConfig, extractor: Arc<dyn MediaExtractor>) -> Self {
        let mut config = config;
        if config.workers == 0 {
            warn!("worker count of 0 requested, using 1");
            config.workers = 1;
        }
        if config.max_concurrent_downloads == 0 {
            warn!("download gate of 0 requested, using 1");
            config.max_concurrent_downloads = 1;
        }

        Self {
            extractor,
            running: AtomicBool::new(false),
            sender: Mutex::new(None),
            workers: Mutex::new(Vec::new()),
            shared: Arc::new(Shared {
                registry: Mutex::new(HashSet::new()),
                gate: Semaphore::new(config.max_concurrent_downloads),
                pending: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
            config,
        }
    }

    /// Spawn the worker pool. Idempotent; a no-op while already running.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(AsyncMutex::new(rx));

        let mut workers = self.workers.lock().unwrap();
        for worker_id in 0..self.config.workers {
            workers.push(tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&rx),
                Arc::clone(&self.shared),
                Arc::clone(&self.extractor),
            )));
        }
        *self.sender.lock().unwrap() = Some(tx);

        info!(
            "download manager started with {} workers, {} concurrent download slots",
            self.config.workers, self.config.max_concurrent_downloads
        );
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of tasks currently pending or executing.
    pub fn active_count(&self) -> usize {
        self.shared.registry.lock().unwrap().len()
    }

    /// Queue a download.
    ///
    /// Returns immediately; the download runs on the worker pool. A task
    /// whose key (video id + quality tag) is already pending or executing
    /// is rejected as a duplicate and the in-flight task is left alone.
    pub fn submit(&self, task: DownloadTask) -> Result<(), SubmitError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(SubmitError::NotRunning);
        }

        let key = task.key();
        if !self.shared.registry.lock().unwrap().insert(key.clone()) {
            warn!("duplicate download ignored: {}", key);
            return Err(SubmitError::Duplicate(key));
        }
        self.shared.pending.fetch_add(1, Ordering::AcqRel);

        let sent = match self.sender.lock().unwrap().as_ref() {
            Some(tx) => tx.send(task).is_ok(),
            None => false,
        };
        if !sent {
            // Lost the race with shutdown; undo the registration
            self.shared.release(&key);
            return Err(SubmitError::NotRunning);
        }

        info!("queued download: {}", key);
        Ok(())
    }

    /// Stop accepting work, wait for every queued task to finish, then
    /// tear down the workers. Idempotent.
    ///
    /// In-flight downloads are never interrupted; only idle workers are
    /// cancelled, and only after the queue has fully drained.
    pub async fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("download manager shutting down, draining queue");

        loop {
            let notified = self.shared.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.pending.load(Ordering::Acquire) == 0 {
                break;
            }
            notified.await;
        }

        // Closing the channel is the cancellation signal: recv() yields
        // None once the (already empty) queue is consumed.
        self.sender.lock().unwrap().take();

        let handles: Vec<_> = self.workers.lock().unwrap().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("worker task failed to join: {}", e);
            }
        }
        info!("download manager shut down");
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<AsyncMutex<UnboundedReceiver<DownloadTask>>>,
    shared: Arc<Shared>,
    extractor: Arc<dyn MediaExtractor>,
) {
    info!("worker-{} started", worker_id);
    loop {
        let task = { rx.lock().await.recv().await };
        let Some(task) = task else {
            info!("worker-{} shutting down", worker_id);
            break;
        };

        let key = task.key();
        let permit = match shared.gate.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                // Gate closed mid-flight; release the task and stop
                shared.release(&key);
                break;
            }
        };

        info!("worker-{} starting download for {}", worker_id, key);
        match extractor.download(&task.url, &task.options).await {
            Ok(()) => info!("finished download for {}", key),
            Err(e) => error!("error downloading {}: {}", key, e),
        }

        drop(permit);
        shared.release(&key);
    }
}
