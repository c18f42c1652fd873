use criterion::{Criterion, black_box, criterion_group, criterion_main};
use shadow_editor_engine::{Editor, EditorOptions, MemoryHost, ShadowTree};
mod common;

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("shadow_rebuild");
    group.sample_size(20);

    for sections in [10, 100] {
        let host = MemoryHost::from_markup(&common::generate_markup(sections)).unwrap();
        group.bench_function(format!("flat_{sections}"), |b| {
            b.iter(|| {
                let tree = ShadowTree::build(black_box(&host)).unwrap();
                black_box(tree);
            });
        });
    }

    let host = MemoryHost::from_markup(&common::generate_nested_markup(64)).unwrap();
    group.bench_function("nested_64", |b| {
        b.iter(|| {
            let tree = ShadowTree::build(black_box(&host)).unwrap();
            black_box(tree);
        });
    });

    group.finish();
}

fn bench_position_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("position_resolution");
    group.sample_size(20);

    let host = MemoryHost::from_markup(&common::generate_markup(100)).unwrap();
    let mut editor = Editor::new(host, EditorOptions::default()).unwrap();
    let len = editor.text().chars().count();

    group.bench_function("resolve_spread", |b| {
        b.iter(|| {
            for position in (0..len).step_by(97) {
                let id = editor.find_suitable_node_for_position(black_box(position)).unwrap();
                black_box(id);
            }
        });
    });

    group.finish();
}

fn bench_edit_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("edit_cycle");
    group.sample_size(20);

    group.bench_function("insert_and_flush", |b| {
        b.iter_batched(
            || {
                let host = MemoryHost::from_markup(&common::generate_markup(20)).unwrap();
                Editor::new(host, EditorOptions::default()).unwrap()
            },
            |mut editor| {
                editor.insert_text("x", black_box(40)).unwrap();
                editor.flush().unwrap();
                black_box(editor);
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_rebuild, bench_position_resolution, bench_edit_cycle);
criterion_main!(benches);
