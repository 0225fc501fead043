//! Execution gate
//!
//! One gate per page. Script runs, timer firings and async completions all
//! enter through it, so at most one of them touches the guarded state at a
//! time.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// Gate failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The calling thread is already inside the gate
    #[error("execution gate re-entered from the thread holding it")]
    Reentrant,
}

/// Mutual-exclusion gate around `T`
pub struct ExecutionGate<T> {
    inner: Arc<GateInner<T>>,
}

struct GateInner<T> {
    state: Mutex<T>,
    holder: Mutex<Option<ThreadId>>,
}

impl<T> ExecutionGate<T> {
    pub fn new(state: T) -> Self {
        Self {
            inner: Arc::new(GateInner {
                state: Mutex::new(state),
                holder: Mutex::new(None),
            }),
        }
    }

    /// Run `f` with exclusive access to the state.
    ///
    /// Blocks while another thread is inside. Entering again from the thread
    /// that already holds the gate fails with [`GateError::Reentrant`].
    pub fn run<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, GateError> {
        let me = thread::current().id();
        if self.holder() == Some(me) {
            return Err(GateError::Reentrant);
        }
        // A panicking holder leaves the state as it was; keep going with it.
        let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        let _holder = HolderGuard::enter(&self.inner.holder, me);
        Ok(f(&mut state))
    }

    /// Whether the calling thread is currently inside the gate
    pub fn is_held_by_current_thread(&self) -> bool {
        self.holder() == Some(thread::current().id())
    }

    fn holder(&self) -> Option<ThreadId> {
        *lock(&self.inner.holder)
    }
}

impl<T> Clone for ExecutionGate<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ExecutionGate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionGate")
            .field("holder", &self.holder())
            .finish()
    }
}

struct HolderGuard<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl<'a> HolderGuard<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>, id: ThreadId) -> Self {
        *lock(slot) = Some(id);
        Self { slot }
    }
}

impl Drop for HolderGuard<'_> {
    fn drop(&mut self) {
        *lock(self.slot) = None;
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn test_run_returns_value() {
        let gate = ExecutionGate::new(vec![1, 2]);
        let len = gate.run(|v| {
            v.push(3);
            v.len()
        });
        assert_eq!(len, Ok(3));
    }

    #[test]
    fn test_reentry_rejected() {
        let gate = ExecutionGate::new(0);
        let inner = gate.clone();
        let result = gate.run(|_| inner.run(|n| *n));
        assert_eq!(result, Ok(Err(GateError::Reentrant)));
        assert!(!gate.is_held_by_current_thread());
    }

    #[test]
    fn test_exclusive_across_threads() {
        let gate = ExecutionGate::new(0u32);
        let inside = Arc::new(AtomicBool::new(false));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let gate = gate.clone();
                let inside = inside.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        gate.run(|n| {
                            assert!(!inside.swap(true, Ordering::SeqCst));
                            *n += 1;
                            thread::sleep(Duration::from_micros(10));
                            inside.store(false, Ordering::SeqCst);
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(gate.run(|n| *n), Ok(200));
    }

    #[test]
    fn test_panic_releases_gate() {
        let gate = ExecutionGate::new(1);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            gate.run(|_| panic!("handler blew up")).unwrap();
        }));
        assert!(result.is_err());
        assert!(!gate.is_held_by_current_thread());
        assert_eq!(gate.run(|n| *n), Ok(1));
    }
}
