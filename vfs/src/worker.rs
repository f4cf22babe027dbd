use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::{Arc, mpsc};
use std::task::{Context, Poll, Waker};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

type Job = Box<dyn FnOnce() + Send>;

/// A dedicated thread that runs submitted work strictly in submission order.
///
/// Dropping the worker closes the queue, lets the thread drain every job
/// already submitted, and joins it. There is no cancellation: a submitted
/// job always runs, even if nobody holds its [`LoadHandle`] anymore.
pub(crate) struct Worker {
    name: String,
    sender: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the worker thread.
    ///
    /// If the thread cannot be spawned the worker stays inert and every
    /// handle it returns resolves to `None`.
    pub fn spawn(name: impl Into<String>) -> Self {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Job>();
        let thread_name = name.clone();
        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            for job in receiver {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    log::error!("Job on worker `{thread_name}` panicked");
                }
            }
            log::debug!("Worker `{thread_name}` shut down");
        });

        match spawned {
            Ok(thread) => {
                log::debug!("Worker `{name}` started");
                Self {
                    name,
                    sender: Some(sender),
                    thread: Some(thread),
                }
            }
            Err(err) => {
                log::error!("Failed to spawn worker `{name}`: {err}");
                Self {
                    name,
                    sender: None,
                    thread: None,
                }
            }
        }
    }

    /// Queue `work` behind everything submitted before it.
    ///
    /// `work` returning `None` (or never running) resolves the handle to `None`.
    pub fn submit<T, F>(&self, work: F) -> LoadHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Option<T> + Send + 'static,
    {
        let slot = Arc::new(Slot::default());
        let completer = Completer {
            slot: Some(Arc::clone(&slot)),
        };
        let job: Job = Box::new(move || completer.complete(work()));

        match &self.sender {
            Some(sender) => {
                if sender.send(job).is_err() {
                    log::warn!("Worker `{}` is gone, job dropped", self.name);
                }
            }
            None => log::warn!("Worker `{}` is not running, job dropped", self.name),
        }

        LoadHandle { slot }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() == thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                log::error!("Worker `{}` terminated abnormally", self.name);
            }
        }
    }
}

struct SlotState<T> {
    value: Option<T>,
    done: bool,
    waker: Option<Waker>,
}

struct Slot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(SlotState {
                value: None,
                done: false,
                waker: None,
            }),
            ready: Condvar::new(),
        }
    }
}

impl<T> Slot<T> {
    fn finish(&self, value: Option<T>) {
        let waker = {
            let mut state = self.state.lock();
            state.value = value;
            state.done = true;
            state.waker.take()
        };
        self.ready.notify_all();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// Resolves the slot exactly once, with `None` if the job is dropped unrun.
struct Completer<T> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Completer<T> {
    fn complete(mut self, value: Option<T>) {
        if let Some(slot) = self.slot.take() {
            slot.finish(value);
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.finish(None);
        }
    }
}

/// Handle to work queued on a VFS or archive worker.
///
/// Resolves to `Some(T)` when the work succeeded and `None` when it failed
/// (e.g. the file could not be opened) or never ran. Can be `.await`ed on
/// any executor, polled with [`try_recv`](Self::try_recv), or waited on
/// with [`recv`](Self::recv).
///
/// # Example
///
/// ```ignore
/// let handle = vfs.load_async(&Url::parse("assets://level.json"));
/// // ... do other work ...
/// let bytes = handle.recv();
/// ```
pub struct LoadHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> LoadHandle<T> {
    /// A handle that is already resolved to `value`.
    pub(crate) fn resolved(value: Option<T>) -> Self {
        let slot = Arc::new(Slot::default());
        slot.finish(value);
        Self { slot }
    }

    /// Whether the work has finished (successfully or not).
    pub fn is_finished(&self) -> bool {
        self.slot.state.lock().done
    }

    /// Attempts to retrieve the result without blocking.
    ///
    /// This consumes the value; subsequent calls return `None`.
    pub fn try_recv(&self) -> Option<T> {
        let mut state = self.slot.state.lock();
        if state.done { state.value.take() } else { None }
    }

    /// Blocks until the work completes and returns the result.
    ///
    /// # Warning
    ///
    /// This blocks the calling thread.
    pub fn recv(self) -> Option<T> {
        let mut state = self.slot.state.lock();
        while !state.done {
            self.slot.ready.wait(&mut state);
        }
        state.value.take()
    }
}

impl<T> Future for LoadHandle<T> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let mut state = self.slot.state.lock();
        if state.done {
            Poll::Ready(state.value.take())
        } else {
            state.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Wake;
    use std::time::Duration;

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn recv_returns_value() {
        let worker = Worker::spawn("test-worker");
        let handle = worker.submit(|| Some(42u32));
        assert_eq!(handle.recv(), Some(42));
    }

    #[test]
    fn failed_work_resolves_none() {
        let worker = Worker::spawn("test-worker");
        let handle = worker.submit(|| None::<u32>);
        assert_eq!(handle.recv(), None);
    }

    #[test]
    fn jobs_run_in_submission_order() {
        let worker = Worker::spawn("test-worker");
        let order = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let order = Arc::clone(&order);
                worker.submit(move || {
                    order.lock().push(i);
                    Some(i)
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.recv(), Some(i));
        }
        assert_eq!(*order.lock(), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn drop_drains_queued_jobs() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let worker = Worker::spawn("test-worker");
            for _ in 0..8 {
                let counter = Arc::clone(&counter);
                // Handles are discarded on purpose; the work still runs.
                let _ = worker.submit(move || {
                    thread::sleep(Duration::from_millis(1));
                    counter.fetch_add(1, Ordering::SeqCst);
                    Some(())
                });
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn panicking_job_does_not_kill_worker() {
        let worker = Worker::spawn("test-worker");
        let bad = worker.submit(|| -> Option<u32> { panic!("boom") });
        assert_eq!(bad.recv(), None);
        assert_eq!(worker.submit(|| Some(7u32)).recv(), Some(7));
    }

    #[test]
    fn resolved_handle_is_finished() {
        let handle = LoadHandle::resolved(Some(3u8));
        assert!(handle.is_finished());
        assert_eq!(handle.recv(), Some(3));
        assert_eq!(LoadHandle::<u8>::resolved(None).recv(), None);
    }

    #[test]
    fn try_recv_consumes_value() {
        let worker = Worker::spawn("test-worker");
        let handle = worker.submit(|| Some("done"));
        while !handle.is_finished() {
            thread::yield_now();
        }
        assert_eq!(handle.try_recv(), Some("done"));
        assert_eq!(handle.try_recv(), None);
    }

    #[test]
    fn future_wakes_registered_waker() {
        let worker = Worker::spawn("test-worker");
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let mut handle = worker.submit(move || {
            gate_rx.recv().ok()?;
            Some(99u32)
        });

        let counting = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = Waker::from(Arc::clone(&counting));
        let mut cx = Context::from_waker(&waker);

        assert!(Pin::new(&mut handle).poll(&mut cx).is_pending());
        gate_tx.send(()).unwrap();

        while counting.0.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        match Pin::new(&mut handle).poll(&mut cx) {
            Poll::Ready(Some(99)) => {}
            other => panic!("Expected Ready(Some(99)), got {other:?}"),
        }
    }
}
