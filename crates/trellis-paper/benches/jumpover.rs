use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use serde_json::json;
use std::hint::black_box;
use std::time::Duration;
use trellis_geom::point;
use trellis_graph::{Cell, CellId, ConnectorRef, EndRef, Graph};
use trellis_paper::connector::jumpover::{self, JumpOverContext};
use trellis_paper::{JumpOverOptions, LinkGeometry, Paper, PaperOptions};

/// `n` horizontal and `n` vertical jump-over links forming an `n x n` lattice of crossings.
fn lattice(n: usize) -> Graph {
    let span = (n as f64 + 1.0) * 20.0;
    let mut cells = Vec::with_capacity(n * 2);
    for i in 0..n {
        let at = (i as f64 + 1.0) * 20.0;
        cells.push(
            Cell::link(format!("v{i}"))
                .with_source(EndRef::point(at, 0.0))
                .with_target(EndRef::point(at, span))
                .with_connector(ConnectorRef::new("jumpover")),
        );
        cells.push(
            Cell::link(format!("h{i}"))
                .with_source(EndRef::point(0.0, at))
                .with_target(EndRef::point(span, at))
                .with_vertices(&[point(span / 2.0, at + 5.0)])
                .with_connector(ConnectorRef::new("jumpover").with_args(json!({ "radius": 4 }))),
        );
    }
    let mut graph = Graph::new();
    if let Err(err) = graph.add_cells(cells) {
        panic!("lattice cells are unique: {err}");
    }
    graph
}

fn geometries(graph: &Graph) -> HashMap<CellId, LinkGeometry, FxBuildHasher> {
    graph
        .links()
        .filter_map(|link| {
            let end = |e: Option<EndRef>| match e {
                Some(EndRef::Point(p)) => Some(p),
                _ => None,
            };
            let geometry = LinkGeometry::new(
                end(link.source())?,
                end(link.target())?,
                link.vertices(),
            );
            Some((link.id().clone(), geometry))
        })
        .collect()
}

fn bench_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("jumpover_compute");
    group.measurement_time(Duration::from_secs(5));

    for n in [8usize, 32, 96] {
        let graph = lattice(n);
        let others = geometries(&graph);
        // The last horizontal link sits above every vertical one.
        let id = CellId::new(format!("h{}", n - 1));
        let own = others[&id].clone();
        let opts = JumpOverOptions {
            radius: 4.0,
            ..JumpOverOptions::default()
        };
        group.bench_with_input(BenchmarkId::new("compute", n), &n, |b, _| {
            let ctx = JumpOverContext {
                link: &id,
                graph: &graph,
                default_connector: "normal",
                geometry: &others,
            };
            b.iter(|| {
                let path = jumpover::compute(
                    black_box(own.source),
                    black_box(own.target),
                    &own.route,
                    &opts,
                    &ctx,
                );
                black_box(path.segments().len());
            })
        });
    }

    group.finish();
}

fn bench_paper(c: &mut Criterion) {
    let mut group = c.benchmark_group("jumpover_paper");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for n in [8usize, 32] {
        group.bench_with_input(BenchmarkId::new("render_lattice", n), &n, |b, &n| {
            b.iter_batched(
                || lattice(n),
                |mut graph| match Paper::new(&mut graph, PaperOptions::default()) {
                    Ok(paper) => black_box(paper.jumpover().len()),
                    Err(err) => panic!("paper: {err}"),
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compute, bench_paper);
criterion_main!(benches);
