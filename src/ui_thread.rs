use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

enum Job {
    Run(Box<dyn FnOnce() + Send>),
    Shutdown,
}

/// Dedicated thread owning all mutations of a host surface.
///
/// Models the single-threaded-affinity rule of GUI toolkits as a
/// single-consumer job queue: callers on other threads enqueue closures,
/// callers already on the owning thread run inline (see
/// [`crate::marshal::invoke_if_required`]). Dropping the `UiThread` runs
/// the jobs queued so far, then joins the worker; handles outliving it
/// turn into no-ops.
pub struct UiThread {
    handle: UiHandle,
    worker: Option<JoinHandle<()>>,
}

/// Cloneable sender half of a [`UiThread`], safe to hold from any thread.
#[derive(Clone)]
pub struct UiHandle {
    tx: Sender<Job>,
    thread_id: ThreadId,
    alive: Arc<AtomicBool>,
}

impl UiThread {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let worker = thread::Builder::new()
            .name("busy-overlay-ui".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    match job {
                        Job::Run(run) => run(),
                        Job::Shutdown => break,
                    }
                }
            })
            .expect("failed to spawn ui thread");
        Self {
            handle: UiHandle {
                tx,
                thread_id: worker.thread().id(),
                alive: Arc::new(AtomicBool::new(true)),
            },
            worker: Some(worker),
        }
    }

    pub fn handle(&self) -> UiHandle {
        self.handle.clone()
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.handle.alive.store(false, Ordering::SeqCst);
        let _ = self.handle.tx.send(Job::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl UiHandle {
    /// Whether the calling thread is the owning thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Whether the owning thread is still processing jobs.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Enqueue `job` for the owning thread. Returns `false` when the
    /// thread has shut down (the job is dropped).
    pub fn dispatch<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.is_alive() {
            return false;
        }
        self.tx.send(Job::Run(Box::new(job))).is_ok()
    }

    /// Queue barrier: blocks until every job enqueued before this call has
    /// run. Inline no-op on the owning thread itself, where blocking on
    /// the queue would deadlock.
    pub fn flush(&self) {
        if self.is_current() {
            return;
        }
        let (tx, rx) = mpsc::channel();
        if self.dispatch(move || {
            let _ = tx.send(());
        }) {
            let _ = rx.recv();
        }
    }
}
