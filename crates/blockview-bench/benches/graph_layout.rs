use blockview_bench::util;
use blockview_graph::{GraphModel, LayeredLayouter, Layouter};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn bench_layered_layout(c: &mut Criterion) {
    let layouter = LayeredLayouter::default();
    let mut group = c.benchmark_group("layered_layout");

    for block_count in [16, 128, 512] {
        let graph = util::branchy_function(block_count, 9);
        let model = GraphModel::from_function(&graph);
        let sizes = util::block_sizes(&graph);

        group.bench_with_input(BenchmarkId::from_parameter(block_count), &model, |b, model| {
            b.iter(|| {
                let result = layouter.layout(black_box(model), black_box(&sizes), None);
                black_box(result);
            })
        });
    }
    group.finish();
}

fn bench_model_build(c: &mut Criterion) {
    let graph = util::branchy_function(512, 9);
    c.bench_function("graph_model_from_function_512", |b| {
        b.iter(|| black_box(GraphModel::from_function(black_box(&graph))))
    });
}

criterion_group!(benches, bench_layered_layout, bench_model_build);
criterion_main!(benches);
