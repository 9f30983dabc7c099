//! Background thread tied to the lifetime of its handle.
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Cooperative cancellation flag. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Runs a closure on a named thread. The closure receives a [`StopFlag`] it
/// should poll; dropping the runner raises the flag and joins the thread,
/// so one handle never outlives its thread.
pub struct Runner<T: Send + 'static> {
    stop: StopFlag,
    handle: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> Runner<T> {
    pub fn spawn<W>(name: &str, work: W) -> io::Result<Self>
    where
        W: FnOnce(StopFlag) -> T + Send + 'static,
    {
        let stop = StopFlag::new();
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || work(flag))?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Asks the thread to stop without waiting for it.
    pub fn stop(&self) {
        self.stop.raise();
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Waits for the thread and returns its result, or the panic payload.
    pub fn join(mut self) -> thread::Result<T> {
        match self.handle.take() {
            Some(handle) => handle.join(),
            None => Err(Box::new("runner already joined")),
        }
    }
}

impl<T: Send + 'static> Drop for Runner<T> {
    fn drop(&mut self) {
        self.stop.raise();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
