//! Timer cancellation tests for wisp-js
//!
//! Cancellation races between the scheduler thread, the gate and callers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use wisp_js::{timer_handler, ExecutionGate, JsError, TimerHandle, WindowTimers};

#[derive(Default)]
struct Page {
    fired: u32,
    observed_active: Option<bool>,
}

fn setup() -> (ExecutionGate<Page>, WindowTimers<Page>) {
    let gate = ExecutionGate::new(Page::default());
    let timers = WindowTimers::new(gate.clone()).unwrap();
    (gate, timers)
}

fn fired(gate: &ExecutionGate<Page>) -> u32 {
    gate.run(|p| p.fired).unwrap()
}

#[test]
fn test_interval_stops_after_clear() {
    let (gate, timers) = setup();
    let handle = timers.set_interval(
        timer_handler(|p: &mut Page, _| {
            p.fired += 1;
            Ok(())
        }),
        50,
        vec![],
    );

    thread::sleep(Duration::from_millis(180));
    timers.clear_interval(handle);
    let count = fired(&gate);
    assert!((1..=4).contains(&count), "fired {} times", count);

    thread::sleep(Duration::from_millis(150));
    assert_eq!(fired(&gate), count);
    assert!(!timers.is_active(handle));
}

#[test]
fn test_clear_timeout_twice_and_after_firing() {
    let (gate, timers) = setup();
    let handle = timers.set_timeout(
        timer_handler(|p: &mut Page, _| {
            p.fired += 1;
            Ok(())
        }),
        0,
        vec![],
    );

    thread::sleep(Duration::from_millis(80));
    assert_eq!(fired(&gate), 1);
    timers.clear_timeout(handle);
    timers.clear_timeout(handle);
    timers.clear_interval(TimerHandle::from_raw(u32::MAX));
    assert_eq!(fired(&gate), 1);
}

#[test]
fn test_one_shot_sees_itself_inactive() {
    let (gate, timers) = setup();
    let control = timers.control();
    let slot: Arc<Mutex<Option<TimerHandle>>> = Arc::default();
    let own = slot.clone();

    let handle = timers.set_timeout(
        timer_handler(move |p: &mut Page, _| {
            let handle = own.lock().unwrap().expect("handle recorded");
            p.observed_active = Some(control.is_active(handle));
            Ok(())
        }),
        30,
        vec![],
    );
    *slot.lock().unwrap() = Some(handle);

    thread::sleep(Duration::from_millis(120));
    assert_eq!(gate.run(|p| p.observed_active).unwrap(), Some(false));
}

#[test]
fn test_interval_cleared_from_its_own_handler() {
    let (gate, timers) = setup();
    let control = timers.control();
    let slot: Arc<Mutex<Option<TimerHandle>>> = Arc::default();
    let own = slot.clone();

    let handle = timers.set_interval(
        timer_handler(move |p: &mut Page, _| {
            p.fired += 1;
            if let Some(handle) = *own.lock().unwrap() {
                // Must not wait on the firing we are part of
                control.clear_interval(handle);
            }
            Ok(())
        }),
        10,
        vec![],
    );
    *slot.lock().unwrap() = Some(handle);

    let started = Instant::now();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(fired(&gate), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_clear_waits_for_running_firing() {
    let gate = ExecutionGate::new(Page::default());
    let timers = WindowTimers::with_cancel_timeout(gate.clone(), Duration::from_secs(2)).unwrap();
    let entered = Arc::new(AtomicUsize::new(0));
    let seen = entered.clone();

    let handle = timers.set_interval(
        timer_handler(move |p: &mut Page, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(100));
            p.fired += 1;
            Ok(())
        }),
        5,
        vec![],
    );

    while entered.load(Ordering::SeqCst) == 0 {
        thread::sleep(Duration::from_millis(1));
    }
    timers.clear_interval(handle);
    // The firing in progress completed before clear returned
    assert_eq!(fired(&gate), entered.load(Ordering::SeqCst) as u32);
}

#[test]
fn test_cancel_bound_releases_stuck_firing() {
    let gate = ExecutionGate::new(Page::default());
    let timers =
        WindowTimers::with_cancel_timeout(gate.clone(), Duration::from_millis(50)).unwrap();
    let entered = Arc::new(AtomicUsize::new(0));
    let seen = entered.clone();

    let handle = timers.set_interval(
        timer_handler(move |_: &mut Page, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(400));
            Ok(())
        }),
        5,
        vec![],
    );

    while entered.load(Ordering::SeqCst) == 0 {
        thread::sleep(Duration::from_millis(1));
    }
    let started = Instant::now();
    timers.clear_interval(handle);
    assert!(started.elapsed() < Duration::from_millis(300));
    assert!(!timers.is_active(handle));
}

#[test]
fn test_handler_error_routed_to_sink() {
    let (gate, timers) = setup();
    let errors: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = errors.clone();
    timers.set_error_sink(Some(Arc::new(move |err: &JsError| {
        sink.lock().unwrap().push(err.to_string());
    })));

    timers.set_timeout(
        timer_handler(|_: &mut Page, _| Err(JsError::Runtime("bad".into()))),
        0,
        vec![],
    );
    timers.set_timeout(
        timer_handler(|p: &mut Page, _| {
            p.fired += 1;
            Ok(())
        }),
        20,
        vec![],
    );

    thread::sleep(Duration::from_millis(120));
    assert_eq!(*errors.lock().unwrap(), vec!["JavaScript error: bad"]);
    assert_eq!(fired(&gate), 1);
}
