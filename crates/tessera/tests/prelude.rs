//! Facade smoke tests: a server assembled only from the prelude.

use std::time::Duration;
use tessera::prelude::*;

/// Replies `{ok: 1}`-style to `ping`, fails `unknownCmd`.
fn command_router() -> impl Handler {
    handler_fn(|_ctx, msg: Message| async move {
        match msg.command().as_str() {
            "ping" => Ok(Message::new("ping", &b"ok"[..])),
            other => Err(HandlerError::command(
                59,
                "CommandNotFound",
                format!("no such command: '{other}'"),
            )),
        }
    })
}

fn server(memory: &MemorySinks) -> Pipeline {
    Pipeline::builder()
        .layer(ObservabilityMiddleware::with_sinks(memory.sinks()))
        .layer(TimeoutMiddleware::new(Duration::from_secs(1)))
        .build(command_router())
}

#[tokio::test]
async fn test_prelude_pipeline_round_trip() {
    let memory = MemorySinks::new();
    let pipeline = server(&memory);
    let ctx = RequestContext::new();

    let reply = pipeline.handle(&ctx, Message::empty("ping")).await.unwrap();
    assert_eq!(reply.payload().as_ref(), b"ok");

    let err = pipeline
        .handle(&ctx, Message::empty("unknownCmd"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Command);
    assert_eq!(
        err.to_string(),
        "CommandNotFound (59): no such command: 'unknownCmd'"
    );

    let outcomes: Vec<String> = memory
        .metrics
        .counters()
        .into_iter()
        .filter_map(|sample| {
            sample
                .labels
                .into_iter()
                .find(|(key, _)| *key == "outcome")
                .map(|(_, value)| value)
        })
        .collect();
    assert_eq!(outcomes, ["success", "failure"]);
}

#[tokio::test]
async fn test_pipeline_is_shared_across_tasks() {
    let memory = MemorySinks::new();
    let pipeline = server(&memory);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let ctx = RequestContext::new();
                pipeline.handle(&ctx, Message::empty("ping")).await
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(memory.tracer.ended(), 8);
    assert_eq!(pipeline.stage_names(), ["observability", "timeout"]);
}

#[test]
fn test_guard_sinks_set_the_metric_namespace() {
    let config = TelemetryConfig::builder()
        .service_name("docdb")
        .namespace("docdb")
        .build();
    let guard = TelemetryGuard::new(&config, None);

    let observability = ObservabilityMiddleware::with_sinks(guard.sinks());
    assert_eq!(observability.config().counter_name(), "docdb_commands_total");
    assert_eq!(
        observability.config().histogram_name(),
        "docdb_command_duration_seconds"
    );
    guard.shutdown();
}
