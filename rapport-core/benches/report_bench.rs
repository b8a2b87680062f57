#[macro_use]
extern crate criterion;

use std::sync::Arc;

use criterion::Criterion;
use parking_lot::Mutex;

use rapport_core::{ChannelKind, Reporter, SinkTarget, Threshold};

fn bench_report_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_fan_out");

    for sinks in [1, 4, 16] {
        group.throughput(criterion::Throughput::Elements(1));
        group.bench_function(format!("sinks_{}", sinks), |b| {
            let reporter = Reporter::new();
            reporter.remove_all_sinks(ChannelKind::Console).unwrap();
            reporter.set_logging_level(Threshold::Verbose);
            let buffers: Vec<_> = (0..sinks)
                .map(|_| Arc::new(Mutex::new(String::new())))
                .collect();
            for buf in &buffers {
                reporter
                    .add_sink(ChannelKind::TextLogger, SinkTarget::text(buf.clone()))
                    .unwrap();
            }
            b.iter(|| {
                reporter.report_info("bench", "payload");
                for buf in &buffers {
                    buf.lock().clear();
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_report_fan_out);
criterion_main!(benches);
