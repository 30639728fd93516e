//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dxflow::config::{ApiConfiguration, OcrModel};
use dxflow::events::CollectingEventSink;
use dxflow::pipeline::PipelineOrchestrator;
use dxflow::testing::{fixtures, StubStageClient};
use std::sync::Arc;

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let config = Some(ApiConfiguration::new(OcrModel::Azure));

    let orchestrator = PipelineOrchestrator::new(Arc::new(StubStageClient::new()));
    c.bench_function("execute_stubbed", |b| {
        b.iter(|| {
            let outcome = runtime
                .block_on(orchestrator.execute(Some(fixtures::sample_document()), config))
                .unwrap();
            black_box(outcome)
        });
    });

    let sink = Arc::new(CollectingEventSink::new());
    let observed = PipelineOrchestrator::new(Arc::new(StubStageClient::new()))
        .with_event_sink(sink.clone());
    c.bench_function("execute_stubbed_with_events", |b| {
        b.iter(|| {
            let outcome = runtime
                .block_on(observed.execute(Some(fixtures::sample_document()), config))
                .unwrap();
            sink.clear();
            black_box(outcome)
        });
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
