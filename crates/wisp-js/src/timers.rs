//! Timer APIs
//!
//! `setTimeout`/`setInterval` backed by one scheduler thread per registry.
//! Every firing runs inside the page's [`ExecutionGate`].

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crate::gate::{lock, ExecutionGate};
use crate::{JsError, JsValue};

static TIMER_ID: AtomicU32 = AtomicU32::new(1);

/// How long clearing an interval waits for a firing in progress
pub const DEFAULT_CANCEL_TIMEOUT: Duration = Duration::from_secs(10);

/// Timer callback. Receives the gated state and the arguments captured at
/// scheduling time.
pub type TimerHandler<T> = Arc<dyn Fn(&mut T, &[JsValue]) -> Result<(), JsError> + Send + Sync>;

/// Argument-less notification
pub type Notification = Arc<dyn Fn() + Send + Sync>;

/// Receiver of errors and panics raised by timer handlers
pub type TimerErrorSink = Arc<dyn Fn(&JsError) + Send + Sync>;

/// Wrap a closure as a [`TimerHandler`]
pub fn timer_handler<T, F>(f: F) -> TimerHandler<T>
where
    F: Fn(&mut T, &[JsValue]) -> Result<(), JsError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Opaque timer id, as handed to scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u32);

impl TimerHandle {
    pub fn id(self) -> u32 {
        self.0
    }

    /// Rebuild a handle from the number a script passed back
    pub fn from_raw(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Timeout,
    Interval,
}

/// Failure to start the scheduler
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("failed to spawn timer thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Hooks invoked around every firing. They run while the gate is held.
#[derive(Clone, Default)]
pub struct TimerHooks {
    pub on_executing: Option<Notification>,
    pub on_executed: Option<Notification>,
    pub on_error: Option<TimerErrorSink>,
}

struct Entry<T> {
    kind: TimerKind,
    handler: TimerHandler<T>,
    args: Arc<[JsValue]>,
    period: Duration,
}

struct Registry<T> {
    entries: HashMap<TimerHandle, Entry<T>>,
    queue: BinaryHeap<Reverse<(Instant, TimerHandle)>>,
    /// Intervals whose handler is executing, and on which thread
    running: HashMap<TimerHandle, ThreadId>,
    shutdown: bool,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            queue: BinaryHeap::new(),
            running: HashMap::new(),
            shutdown: false,
        }
    }
}

struct Shared<T> {
    gate: ExecutionGate<T>,
    registry: Mutex<Registry<T>>,
    /// Wakes the scheduler when the queue changes
    wakeup: Condvar,
    /// Signalled whenever a firing finishes
    finished: Condvar,
    hooks: Mutex<TimerHooks>,
    cancel_timeout: Duration,
}

/// Per-page timer registry
pub struct WindowTimers<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    scheduler: Option<JoinHandle<()>>,
}

/// Cloneable access to a [`WindowTimers`] registry, for code running inside
/// the gate (script bindings, other handlers)
pub struct TimerControl<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TimerControl<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> WindowTimers<T> {
    pub fn new(gate: ExecutionGate<T>) -> Result<Self, TimerError> {
        Self::with_cancel_timeout(gate, DEFAULT_CANCEL_TIMEOUT)
    }

    /// Create a registry whose interval cancellation waits at most `cancel_timeout`
    pub fn with_cancel_timeout(
        gate: ExecutionGate<T>,
        cancel_timeout: Duration,
    ) -> Result<Self, TimerError> {
        let shared = Arc::new(Shared {
            gate,
            registry: Mutex::new(Registry::default()),
            wakeup: Condvar::new(),
            finished: Condvar::new(),
            hooks: Mutex::new(TimerHooks::default()),
            cancel_timeout,
        });
        let worker = Arc::clone(&shared);
        let scheduler = thread::Builder::new()
            .name("wisp-timers".to_string())
            .spawn(move || worker.run_scheduler())?;
        tracing::debug!("Timer scheduler started");
        Ok(Self {
            shared,
            scheduler: Some(scheduler),
        })
    }

    pub fn control(&self) -> TimerControl<T> {
        TimerControl {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn set_hooks(&self, hooks: TimerHooks) {
        *lock(&self.shared.hooks) = hooks;
    }

    pub fn set_on_executing(&self, hook: Option<Notification>) {
        lock(&self.shared.hooks).on_executing = hook;
    }

    pub fn set_on_executed(&self, hook: Option<Notification>) {
        lock(&self.shared.hooks).on_executed = hook;
    }

    pub fn set_error_sink(&self, sink: Option<TimerErrorSink>) {
        lock(&self.shared.hooks).on_error = sink;
    }

    pub fn set_timeout(&self, handler: TimerHandler<T>, delay_ms: u64, args: Vec<JsValue>) -> TimerHandle {
        self.shared.schedule(TimerKind::Timeout, handler, delay_ms, args)
    }

    pub fn set_interval(&self, handler: TimerHandler<T>, period_ms: u64, args: Vec<JsValue>) -> TimerHandle {
        self.shared.schedule(TimerKind::Interval, handler, period_ms, args)
    }

    pub fn clear_timeout(&self, handle: TimerHandle) {
        self.shared.clear(handle);
    }

    pub fn clear_interval(&self, handle: TimerHandle) {
        self.shared.clear(handle);
    }

    /// Cancel every live timer. The registry stays usable.
    pub fn clear_all(&self) {
        self.shared.clear_all();
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.shared.is_active(handle)
    }

    pub fn active_count(&self) -> usize {
        self.shared.active_count()
    }
}

impl<T> TimerControl<T> {
    pub fn set_timeout(&self, handler: TimerHandler<T>, delay_ms: u64, args: Vec<JsValue>) -> TimerHandle {
        self.shared.schedule(TimerKind::Timeout, handler, delay_ms, args)
    }

    pub fn set_interval(&self, handler: TimerHandler<T>, period_ms: u64, args: Vec<JsValue>) -> TimerHandle {
        self.shared.schedule(TimerKind::Interval, handler, period_ms, args)
    }

    pub fn clear_timeout(&self, handle: TimerHandle) {
        self.shared.clear(handle);
    }

    pub fn clear_interval(&self, handle: TimerHandle) {
        self.shared.clear(handle);
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.shared.is_active(handle)
    }
}

impl<T: Send + 'static> Drop for WindowTimers<T> {
    fn drop(&mut self) {
        self.shared.clear_all();
        {
            let mut registry = self.shared.registry();
            registry.shutdown = true;
        }
        self.shared.wakeup.notify_all();

        let Some(scheduler) = self.scheduler.take() else {
            return;
        };
        // Joining would wait on ourselves: the scheduler may be queued on
        // the gate we hold, or this may be the scheduler thread.
        if self.shared.gate.is_held_by_current_thread()
            || scheduler.thread().id() == thread::current().id()
        {
            return;
        }
        if scheduler.join().is_err() {
            tracing::warn!("Timer scheduler thread panicked");
        }
    }
}

impl<T: Send + 'static> fmt::Debug for WindowTimers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowTimers")
            .field("active", &self.active_count())
            .finish()
    }
}

impl<T> Shared<T> {
    fn registry(&self) -> MutexGuard<'_, Registry<T>> {
        lock(&self.registry)
    }

    fn schedule(
        &self,
        kind: TimerKind,
        handler: TimerHandler<T>,
        delay_ms: u64,
        args: Vec<JsValue>,
    ) -> TimerHandle {
        let handle = TimerHandle(TIMER_ID.fetch_add(1, Ordering::SeqCst));
        let delay = match kind {
            TimerKind::Timeout => Duration::from_millis(delay_ms),
            TimerKind::Interval => Duration::from_millis(delay_ms.max(1)),
        };
        let mut registry = self.registry();
        registry.entries.insert(
            handle,
            Entry {
                kind,
                handler,
                args: args.into(),
                period: delay,
            },
        );
        registry.queue.push(Reverse((Instant::now() + delay, handle)));
        drop(registry);
        self.wakeup.notify_all();
        tracing::trace!("Scheduled {:?} {} in {:?}", kind, handle.0, delay);
        handle
    }

    fn clear(&self, handle: TimerHandle) {
        let me = thread::current().id();
        let mut registry = self.registry();
        if registry.entries.remove(&handle).is_none() {
            return;
        }
        tracing::trace!("Cleared timer {}", handle.0);

        // Wait for a firing on another thread; never for our own.
        let deadline = Instant::now() + self.cancel_timeout;
        while matches!(registry.running.get(&handle), Some(&t) if t != me) {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    "Timer {} still running after {:?}; releasing it anyway",
                    handle.0,
                    self.cancel_timeout
                );
                break;
            }
            registry = self
                .finished
                .wait_timeout(registry, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn clear_all(&self) {
        let mut registry = self.registry();
        let count = registry.entries.len();
        registry.entries.clear();
        registry.queue.clear();
        drop(registry);
        if count > 0 {
            tracing::debug!("Cleared {} timers", count);
        }
    }

    fn is_active(&self, handle: TimerHandle) -> bool {
        self.registry().entries.contains_key(&handle)
    }

    fn active_count(&self) -> usize {
        self.registry().entries.len()
    }

    fn hooks(&self) -> TimerHooks {
        lock(&self.hooks).clone()
    }

    fn run_scheduler(&self) {
        while let Some(handle) = self.next_due() {
            self.fire(handle);
        }
        tracing::debug!("Timer scheduler stopped");
    }

    /// Block until a timer is due. `None` once the registry shuts down.
    fn next_due(&self) -> Option<TimerHandle> {
        let mut registry = self.registry();
        loop {
            if registry.shutdown {
                return None;
            }
            let now = Instant::now();
            let next = registry.queue.peek().map(|Reverse(item)| *item);
            match next {
                None => {
                    registry = self
                        .wakeup
                        .wait(registry)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some((deadline, handle)) if deadline <= now => {
                    registry.queue.pop();
                    // Entries cleared since they were queued leave stale items behind
                    if registry.entries.contains_key(&handle) {
                        return Some(handle);
                    }
                }
                Some((deadline, _)) => {
                    registry = self
                        .wakeup
                        .wait_timeout(registry, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }

    fn fire(&self, handle: TimerHandle) {
        let me = thread::current().id();
        let hooks = self.hooks();

        let outcome = self.gate.run(|state| {
            // Claim the firing. A clear that won the race removed the entry.
            let job = {
                let mut registry = self.registry();
                let job = match registry.entries.get(&handle) {
                    Some(entry) => (entry.kind, entry.handler.clone(), entry.args.clone()),
                    None => return None,
                };
                match job.0 {
                    TimerKind::Timeout => {
                        registry.entries.remove(&handle);
                    }
                    TimerKind::Interval => {
                        registry.running.insert(handle, me);
                    }
                }
                job
            };
            let (kind, handler, args) = job;

            notify(hooks.on_executing.as_ref(), "on_executing");
            let result = panic::catch_unwind(AssertUnwindSafe(|| handler(state, &args[..])));
            notify(hooks.on_executed.as_ref(), "on_executed");
            Some((kind, result))
        });

        let (kind, result) = match outcome {
            Ok(Some(done)) => done,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!("Timer {} could not enter the gate: {}", handle.0, err);
                return;
            }
        };

        if kind == TimerKind::Interval {
            let mut registry = self.registry();
            registry.running.remove(&handle);
            if let Some(period) = registry.entries.get(&handle).map(|e| e.period) {
                registry.queue.push(Reverse((Instant::now() + period, handle)));
            }
            drop(registry);
            self.finished.notify_all();
        }

        let error = match result {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => JsError::Panic(panic_message(payload.as_ref())),
        };
        tracing::warn!("Timer {} handler failed: {}", handle.0, error);
        if let Some(sink) = &hooks.on_error {
            sink(&error);
        }
    }
}

/// Run a firing hook. A panicking hook is logged and does not stop the firing.
fn notify(hook: Option<&Notification>, name: &str) {
    let Some(hook) = hook else {
        return;
    };
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook())) {
        tracing::warn!("Timer {} hook panicked: {}", name, panic_message(payload.as_ref()));
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
