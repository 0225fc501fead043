//! Page integration tests for wisp-engine
//!
//! Loading, script entry points, completions, timers and navigation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use wisp_engine::dom::{callback, Document, EventCallback, HandlerError, Provenance};
use wisp_engine::js::{timer_handler, JsError, JsValue, ScriptEngine, StubEngine};
use wisp_engine::{Config, Engine, EngineError, Page};

fn engine_with_stub() -> (Engine, StubEngine) {
    let stub = StubEngine::new();
    let engine = Engine::with_script_engine(Config::default(), Arc::new(stub.clone()));
    (engine, stub)
}

fn count_tag(page: &Page, tag: &str) -> usize {
    page.with_document(|doc| doc.get_elements_by_tag_name(doc.root(), tag).len())
        .unwrap()
}

// ============================================================================
// LOADING
// ============================================================================

#[test]
fn test_inline_scripts_run_in_order() {
    let (engine, stub) = engine_with_stub();
    engine
        .load_html(
            "https://example.com/",
            "<script>console.log(1)</script><p>x</p><script>second()</script>",
        )
        .unwrap();
    assert_eq!(stub.executed(), vec!["console.log(1)", "second()"]);
}

#[test]
fn test_external_and_non_js_scripts_skipped() {
    let (engine, stub) = engine_with_stub();
    engine
        .load_html(
            "https://example.com/",
            r#"<script src="app.js"></script><script type="text/template">tpl</script>"#,
        )
        .unwrap();
    assert!(stub.executed().is_empty());
}

#[test]
fn test_javascript_disabled() {
    let stub = StubEngine::new();
    let engine = Engine::with_script_engine(Config::static_pages(), Arc::new(stub.clone()));
    let page = engine
        .load_html("https://example.com/", "<script>run()</script>")
        .unwrap();

    assert!(stub.executed().is_empty());
    assert!(matches!(
        page.run_script("1 + 1"),
        Err(EngineError::JavaScriptDisabled)
    ));
}

#[test]
fn test_load_events_reach_handlers() {
    let (engine, stub) = engine_with_stub();
    let page = engine.blank_page("https://example.com/").unwrap();
    page.with_document(|doc| {
        let root = doc.root();
        doc.add_event_listener(
            root,
            "DOMContentLoaded",
            callback(|doc, _| {
                let marker = doc.create_element("ready");
                let body = doc.ensure_body();
                doc.append_child(body, marker)
                    .map(|_| ())
                    .map_err(|e| HandlerError::new(e.to_string()))
            }),
            false,
        )
    })
    .unwrap()
    .unwrap();

    page.load(r#"<body onload="init()"></body>"#).unwrap();
    assert_eq!(count_tag(&page, "ready"), 1);
    assert_eq!(stub.executed(), vec!["init()"]);
}

// ============================================================================
// EVENTS
// ============================================================================

#[test]
fn test_click_runs_attribute_handler() {
    let (engine, stub) = engine_with_stub();
    let page = engine
        .load_html("https://example.com/", r#"<button id=b onclick="go()">Go</button>"#)
        .unwrap();
    let button = page
        .with_document(|doc| doc.get_element_by_id("b"))
        .unwrap()
        .unwrap();

    assert!(page.click(button).unwrap());
    assert_eq!(stub.executed(), vec!["go()"]);
}

#[test]
fn test_listener_errors_collected() {
    let (engine, _stub) = engine_with_stub();
    let page = engine
        .load_html("https://example.com/", "<div id=d></div>")
        .unwrap();
    page.with_document(|doc| {
        let d = doc.get_element_by_id("d").unwrap();
        doc.add_event_listener(d, "click", callback(|_, _| Err(HandlerError::new("nope"))), false)
    })
    .unwrap()
    .unwrap();

    let d = page.with_document(|doc| doc.get_element_by_id("d")).unwrap().unwrap();
    page.click(d).unwrap();
    assert_eq!(page.take_errors(), vec!["nope"]);
    assert!(page.take_errors().is_empty());
}

// ============================================================================
// COMPLETIONS
// ============================================================================

#[test]
fn test_run_completion_isolates_errors() {
    let (engine, _stub) = engine_with_stub();
    let page = engine.blank_page("https://example.com/").unwrap();

    page.run_completion(
        |doc: &mut Document, args: &[JsValue]| {
            let text = args[0].as_string().unwrap_or_default().to_string();
            let body = doc.ensure_body();
            let node = doc.create_text_node(&text);
            doc.append_child(body, node)
                .map(|_| ())
                .map_err(|e| JsError::Runtime(e.to_string()))
        },
        &[JsValue::from("loaded")],
    )
    .unwrap();
    page.run_completion(|_: &mut Document, _: &[JsValue]| Err(JsError::Runtime("bad response".into())), &[])
        .unwrap();
    page.run_completion(|_: &mut Document, _: &[JsValue]| panic!("callback bug"), &[])
        .unwrap();

    let text = page
        .with_document(|doc| doc.body().map(|b| doc.text_content(b)))
        .unwrap();
    assert_eq!(text.as_deref(), Some("loaded"));
    assert_eq!(
        page.take_errors(),
        vec!["JavaScript error: bad response", "completion callback panicked"]
    );
}

#[test]
fn test_complete_async() {
    let (engine, _stub) = engine_with_stub();
    let page = engine.blank_page("https://example.com/").unwrap();

    let task = page.complete_async(
        async { vec![JsValue::from("xhr"), JsValue::Number(200.0)] },
        |doc: &mut Document, args: &[JsValue]| {
            let body = doc.ensure_body();
            let status = args[1].as_number().unwrap_or_default();
            doc.set_attribute(body, "data-status", &status.to_string())
                .map_err(|e| JsError::Runtime(e.to_string()))
        },
    )
    .unwrap();
    smol::block_on(task).unwrap();

    let status = page
        .with_document(|doc| {
            doc.body()
                .and_then(|b| doc.get_attribute(b, "data-status").map(str::to_string))
        })
        .unwrap();
    assert_eq!(status.as_deref(), Some("200"));
}

#[test]
fn test_complete_async_after_navigation_is_dropped() {
    let (engine, _stub) = engine_with_stub();
    let mut page = engine
        .load_html("https://example.com/a/", "<p>old</p>")
        .unwrap();

    let task = page
        .complete_async(
            async {
                smol::Timer::after(Duration::from_millis(100)).await;
                vec![]
            },
            |doc: &mut Document, _: &[JsValue]| {
                let body = doc.ensure_body();
                let stale = doc.create_element("stale-response");
                doc.append_child(body, stale)
                    .map(|_| ())
                    .map_err(|e| JsError::Runtime(e.to_string()))
            },
        )
        .unwrap();
    page.navigate("../b/", "<div>new</div>").unwrap();
    smol::block_on(task).unwrap();

    assert_eq!(count_tag(&page, "stale-response"), 0);
    assert!(page.take_errors().is_empty());
}

#[test]
fn test_script_engine_panic_is_an_error() {
    struct PanickingEngine;

    impl ScriptEngine for PanickingEngine {
        fn execute(&self, _: &mut Document, _: &str) -> Result<JsValue, JsError> {
            panic!("engine bug")
        }

        fn compile_handler(&self, _: &str, _: &str) -> Result<EventCallback, JsError> {
            Err(JsError::Syntax("unsupported".into()))
        }
    }

    let engine = Engine::with_script_engine(Config::default(), Arc::new(PanickingEngine));
    let page = engine.blank_page("https://example.com/").unwrap();

    assert!(matches!(
        page.run_script("anything"),
        Err(EngineError::JavaScript(JsError::Panic(_)))
    ));
    // The gate was released by the unwind
    assert!(page.title().is_ok());
}

// ============================================================================
// EVENTS UNDER FAILURE
// ============================================================================

#[test]
fn test_panicking_listener_does_not_escape_click() {
    let (engine, _stub) = engine_with_stub();
    let page = engine
        .load_html("https://example.com/", "<div id=outer><div id=inner></div></div>")
        .unwrap();
    let reached = Arc::new(AtomicBool::new(false));

    let inner = page
        .with_document(|doc| {
            let inner = doc.get_element_by_id("inner").unwrap();
            let outer = doc.get_element_by_id("outer").unwrap();
            doc.add_event_listener(inner, "click", callback(|_, _| panic!("inner bug")), false)
                .unwrap();
            let flag = reached.clone();
            doc.add_event_listener(
                outer,
                "click",
                callback(move |_, _| {
                    flag.store(true, Ordering::SeqCst);
                    Ok(())
                }),
                false,
            )
            .unwrap();
            inner
        })
        .unwrap();

    assert!(page.click(inner).unwrap());
    assert!(reached.load(Ordering::SeqCst));
    assert_eq!(page.take_errors(), vec!["click handler panicked: inner bug"]);
}

// ============================================================================
// TIMERS AND NAVIGATION
// ============================================================================

#[test]
fn test_timer_mutates_document_through_gate() {
    let (engine, _stub) = engine_with_stub();
    let page = engine.blank_page("https://example.com/").unwrap();
    page.set_timeout(
        timer_handler(|doc: &mut Document, _| {
            let body = doc.ensure_body();
            let p = doc.create_element("p");
            doc.append_child(body, p)
                .map(|_| ())
                .map_err(|e| JsError::Runtime(e.to_string()))
        }),
        10,
        vec![],
    );

    thread::sleep(Duration::from_millis(120));
    assert_eq!(count_tag(&page, "p"), 1);
}

#[test]
fn test_navigate_supersedes_document() {
    let (engine, _stub) = engine_with_stub();
    let mut page = engine
        .load_html("https://example.com/a/", "<p>old</p>")
        .unwrap();
    let old_id = page.with_document(|doc| doc.id()).unwrap();
    let interval = page.set_interval(timer_handler(|_: &mut Document, _| Ok(())), 1000, vec![]);

    page.navigate("../b/", "<div>new</div>").unwrap();

    assert_eq!(page.url().as_str(), "https://example.com/b/");
    assert!(!page.timers().is_active(interval));
    assert_ne!(page.with_document(|doc| doc.id()).unwrap(), old_id);
    assert_eq!(count_tag(&page, "p"), 0);
    assert_eq!(count_tag(&page, "div"), 1);
}

#[test]
fn test_set_inner_html_is_script_provenance() {
    let (engine, stub) = engine_with_stub();
    let page = engine
        .load_html("https://example.com/", "<div id=host><span>old</span></div>")
        .unwrap();
    let host = page
        .with_document(|doc| doc.get_element_by_id("host"))
        .unwrap()
        .unwrap();

    page.set_inner_html(host, "<b>new</b><script>late()</script>").unwrap();

    let (tags, provenance) = page
        .with_document(|doc| {
            let tags: Vec<String> = doc
                .children(host)
                .iter()
                .filter_map(|&c| doc.local_name(c).map(str::to_string))
                .collect();
            (tags, doc.provenance(doc.children(host)[0]))
        })
        .unwrap();
    assert_eq!(tags, vec!["b", "script"]);
    assert_eq!(provenance, Some(Provenance::Script));
    assert!(stub.executed().is_empty());
}

#[test]
fn test_reentrant_gate_use_is_an_error() {
    let (engine, _stub) = engine_with_stub();
    let page = engine.blank_page("https://example.com/").unwrap();
    let nested = page.with_document(|_| page.title()).unwrap();
    assert!(matches!(nested, Err(EngineError::Gate(_))));
}
