use courseapm::apm::{RecorderSettings, TransactionRecorder};
use courseapm::emitter::{EmitError, Emitter};
use courseapm::registry::routes;
use courseapm::router::Router;
use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use std::hint::black_box;
use std::sync::Arc;

/// Accepts and discards everything.
struct NullEmitter;

impl Emitter for NullEmitter {
    fn submit(&self, _: &str, _: &str, _: &[u8], _: i64) -> Result<(), EmitError> {
        Ok(())
    }
}

fn bench_route_match(c: &mut Criterion) {
    let router = Router::new(routes()).unwrap();
    c.bench_function("route_match_cources", |b| {
        b.iter(|| black_box(router.route(Method::GET, black_box("/cources"))))
    });
    c.bench_function("route_miss", |b| {
        b.iter(|| black_box(router.route(Method::GET, black_box("/nope/nothing"))))
    });
}

fn bench_transaction_lifecycle(c: &mut Criterion) {
    let recorder = TransactionRecorder::new(Arc::new(NullEmitter), RecorderSettings::default());
    c.bench_function("transaction_one_segment_finalize", |b| {
        b.iter(|| {
            let tx = recorder.start();
            tx.open_segment().close();
            black_box(recorder.finalize(&tx))
        })
    });
}

criterion_group!(benches, bench_route_match, bench_transaction_lifecycle);
criterion_main!(benches);
