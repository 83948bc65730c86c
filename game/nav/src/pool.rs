use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

/// Cooperative cancellation flag shared between a search and its requester.
/// Checked once per node expansion, so cancelled searches stop promptly
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs searches on a tokio thread pool
pub struct AsyncWorkerPool {
    pool: Runtime,
}

impl AsyncWorkerPool {
    pub fn new(threads: usize) -> Result<Self, futures::io::Error> {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.worker_threads(threads).thread_name_fn(|| {
            static ATOMIC_ID: AtomicUsize = AtomicUsize::new(0);
            let id = ATOMIC_ID.fetch_add(1, Ordering::SeqCst);
            format!("path-worker-{}", id)
        });
        Self::with_rt_builder(builder)
    }

    fn with_rt_builder(mut builder: tokio::runtime::Builder) -> Result<Self, futures::io::Error> {
        let pool = builder.enable_time().build()?;
        Ok(Self { pool })
    }

    pub fn runtime(&self) -> &Runtime {
        &self.pool
    }

    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.pool.spawn(fut)
    }

    /// Blocks the calling thread until the future resolves
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.pool.block_on(fut)
    }
}
