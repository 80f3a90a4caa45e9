//! Span correlation demonstration with a recording backend
//!
//! This example simulates the lifecycle events a host orchestration runtime
//! would fire while executing a chain that calls an LLM and fans out to two
//! tools, and shows how the correlation engine reconstructs the execution
//! tree. When the simulated run finishes, the script displays a summary of
//! every recorded span.
//!
//! It also demonstrates the installation guard (attaching the correlator to
//! repeatedly constructed callback managers exactly once) and trace-context
//! injection into the headers of a simulated outbound completion call.
//!
//! # Running the example
//!
//! ```bash
//! cargo run --example trace_demo
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use tracelink::callback::CallbackManager;
use tracelink::instrument::Instrumentor;
use tracelink::run::{LifecycleEvent, RunId, RunKind};
use tracelink::tracer::{RecordingTracer, TRACEPARENT_HEADER};
use uuid::Uuid;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("{}", "=".repeat(80));
    println!("Span Correlation Demonstration");
    println!("{}", "=".repeat(80));
    println!();
    println!("This example simulates a host runtime executing a chain that calls an LLM");
    println!("and two tools in parallel. The correlation engine turns the lifecycle events");
    println!("into a span tree, and the outbound hook injects the active trace context");
    println!("into the headers of a simulated downstream request.");
    println!();

    // The recording backend stands in for a real export pipeline
    let tracer = Arc::new(RecordingTracer::new());
    let instrumentor = Arc::new(Instrumentor::new(tracer.clone()));

    // The host constructs callback managers freely; the guard keeps the
    // correlator attached exactly once per manager
    let mut manager = CallbackManager::new();
    instrumentor.on_manager_constructed(&mut manager);
    instrumentor.on_manager_constructed(&mut manager);
    let mut child_manager = manager.child();
    instrumentor.on_manager_constructed(&mut child_manager);
    println!(
        "Installation guard: hook fired 3 times, handlers registered: {}",
        child_manager.inheritable_handlers().len()
    );
    println!();

    let manager = Arc::new(child_manager);

    // One chain run with an LLM call and two parallel tool calls beneath it
    let chain = RunId::from(Uuid::new_v4());
    manager.dispatch(&LifecycleEvent::Start {
        kind: RunKind::Chain,
        run_id: chain,
        parent_run_id: None,
        name: "qa_pipeline".to_string(),
        inputs: HashMap::from([("question".to_string(), serde_json::json!("What day is tomorrow?"))]),
        tags: vec!["demo".to_string()],
        metadata: HashMap::new(),
    });

    let llm = RunId::from(Uuid::new_v4());
    manager.dispatch(&LifecycleEvent::start(RunKind::Llm, llm, Some(chain), "qwen2.5:7b"));

    // The outbound hook injects the llm span's context before the request
    let mut extra_headers = HashMap::from([(
        "authorization".to_string(),
        "Bearer demo-token".to_string(),
    )]);
    let response: Result<String, String> =
        instrumentor.wrap_completion(llm, &mut extra_headers, |headers| {
            println!("Outbound completion call headers:");
            let mut keys: Vec<&String> = headers.keys().collect();
            keys.sort();
            for key in keys {
                println!("  {}: {}", key, headers[key]);
            }
            Ok("Tomorrow is Wednesday.".to_string())
        });
    println!();
    println!(
        "Downstream service continues the trace via the '{}' header.",
        TRACEPARENT_HEADER
    );
    println!("Simulated completion: {}", response.unwrap());
    println!();

    manager.dispatch(&LifecycleEvent::End {
        run_id: llm,
        outputs: HashMap::from([("completion".to_string(), serde_json::json!("Tomorrow is Wednesday."))]),
    });

    // Two tool branches run on their own threads, as a host thread pool would
    let mut workers = Vec::new();
    for tool_name in ["resolve_date", "web_search"] {
        let manager = Arc::clone(&manager);
        workers.push(std::thread::spawn(move || {
            let tool = RunId::from(Uuid::new_v4());
            manager.dispatch(&LifecycleEvent::start(RunKind::Tool, tool, Some(chain), tool_name));
            if tool_name == "web_search" {
                // one branch fails; its span records the error and closes
                manager.dispatch(&LifecycleEvent::error(tool, "network unreachable"));
            } else {
                manager.dispatch(&LifecycleEvent::end(tool));
            }
        }));
    }
    for worker in workers {
        worker.join().expect("tool branch panicked");
    }

    manager.dispatch(&LifecycleEvent::end(chain));

    display_span_summary(&tracer, &instrumentor);
}

/// Display a summary of every recorded span
fn display_span_summary(tracer: &RecordingTracer, instrumentor: &Instrumentor) {
    println!("{}", "=".repeat(80));
    println!("Recorded Span Summary");
    println!("{}", "=".repeat(80));
    println!();

    let finished = tracer.finished_spans();
    println!("Total spans recorded: {}", finished.len());
    println!(
        "Live registry entries after the run: {}",
        instrumentor.correlator().registry().len()
    );
    println!();

    for (i, span) in finished.iter().enumerate() {
        println!("{}. {}", i + 1, span.printable_summary());
        println!();
    }

    let trace_ids: std::collections::HashSet<&str> =
        finished.iter().map(|s| s.context.trace_id()).collect();
    println!(
        "All {} spans share {} trace id(s); the chain span is the root of the tree.",
        finished.len(),
        trace_ids.len()
    );
    println!();
    println!("{}", "=".repeat(80));
    println!("Span correlation demonstration complete!");
    println!("{}", "=".repeat(80));
}
