//! Synchronous execution of asynchronous chain operations.
//!
//! Every network-facing operation in the harness is an async future; test
//! code is synchronous. The bridge owns one persistent multi-thread runtime
//! so repeated calls do not pay per-call runtime construction, and hands
//! operations off to an ambient runtime when the caller is already inside
//! one.

use std::future::Future;

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::{HarnessError, HarnessResult};

enum Slot {
    Open(Runtime),
    Closed,
}

/// Bridge between synchronous callers and the async chain client.
///
/// Concurrent callers from different threads are serialized on the owned
/// runtime; callers from the same thread observe submission order. The
/// context-unusable condition is the structural closed state of the runtime
/// slot, never an error-string match, and is repaired by rebuilding the
/// runtime on the next operation.
pub struct AsyncBridge {
    slot: Mutex<Slot>,
}

impl AsyncBridge {
    /// Create the bridge together with its persistent runtime.
    pub fn new() -> HarnessResult<Self> {
        Ok(Self {
            slot: Mutex::new(Slot::Open(build_runtime()?)),
        })
    }

    /// Whether the persistent runtime is currently open.
    pub fn is_open(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Open(_))
    }

    /// Run `future` to completion and return its output.
    ///
    /// From inside a runtime the future is scheduled onto that runtime and
    /// the calling thread blocks on its completion; otherwise the bridge's
    /// own runtime drives it. If the owned runtime was closed, it is rebuilt
    /// once before the operation runs; operation failures themselves are
    /// never retried.
    pub fn run<T, F>(&self, future: F) -> HarnessResult<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        if let Ok(handle) = Handle::try_current() {
            // Already inside a runtime: schedule there and block this thread
            // on the hand-off channel.
            let (tx, rx) = std::sync::mpsc::channel();
            handle.spawn(async move {
                let _ = tx.send(future.await);
            });
            return rx
                .recv()
                .map_err(|_| HarnessError::Bridge("operation dropped before completion".into()));
        }

        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Closed) {
            debug!("execution context was closed; rebuilding");
            *slot = Slot::Open(build_runtime()?);
        }
        match &*slot {
            Slot::Open(runtime) => Ok(runtime.block_on(future)),
            Slot::Closed => unreachable!("slot was just rebuilt"),
        }
    }

    /// Tear the persistent runtime down, releasing its sockets and threads.
    ///
    /// A later [`run`](Self::run) transparently rebuilds it.
    pub fn close(&self) {
        let mut slot = self.slot.lock();
        if let Slot::Open(runtime) = std::mem::replace(&mut *slot, Slot::Closed) {
            debug!("shutting execution context down");
            runtime.shutdown_background();
        }
    }
}

impl Drop for AsyncBridge {
    fn drop(&mut self) {
        if self.is_open() {
            self.close();
        }
    }
}

fn build_runtime() -> HarnessResult<Runtime> {
    Builder::new_multi_thread()
        .enable_all()
        .thread_name("sandbox-bridge")
        .build()
        .map_err(|e| {
            warn!("failed to build execution context: {e}");
            HarnessError::Bridge(e.to_string())
        })
}
