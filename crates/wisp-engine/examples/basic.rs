//! Example: Basic usage of Wisp Engine

use std::thread;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wisp_engine::dom::{callback, Document};
use wisp_engine::js::{timer_handler, JsError};
use wisp_engine::{Config, Engine};

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head><title>Wisp demo</title></head>
  <body>
    <table><p>fostered</p><tr><td>cell</td></tr></table>
    <button id="go" onclick="go()">Go</button>
    <script>console.log("inline")</script>
  </body>
</html>"#;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let engine = Engine::new(Config::default());
    let page = engine.load_html("https://example.com/", PAGE)?;
    println!("Loaded \"{}\" (Wisp v{})", page.title()?, wisp_engine::VERSION);

    let button = page
        .with_document(|doc| doc.get_element_by_id("go"))?
        .ok_or_else(|| anyhow::anyhow!("button missing"))?;
    page.with_document(|doc| {
        doc.add_event_listener(
            button,
            "click",
            callback(|_, event| {
                println!("click reached listener, phase {}", event.event_phase());
                Ok(())
            }),
            false,
        )
    })??;
    page.click(button)?;

    page.set_timeout(
        timer_handler(|doc: &mut Document, _| {
            let body = doc.ensure_body();
            let note = doc.create_element("p");
            doc.set_text_content(note, "added by timer")
                .and_then(|_| doc.append_child(body, note))
                .map(|_| ())
                .map_err(|e| JsError::Runtime(e.to_string()))
        }),
        50,
        vec![],
    );
    thread::sleep(Duration::from_millis(150));

    let paragraphs = page.with_document(|doc| {
        doc.get_elements_by_tag_name(doc.root(), "p")
            .into_iter()
            .map(|p| doc.text_content(p))
            .collect::<Vec<_>>()
    })?;
    println!("Paragraphs: {:?}", paragraphs);

    for err in page.take_errors() {
        println!("swallowed: {}", err);
    }
    Ok(())
}
