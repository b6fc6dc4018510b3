use criterion::{black_box, criterion_group, criterion_main, Criterion};
use smartscript::context::CaptureContext;
use smartscript::script::{parse, render, write_tree};

fn make_template(repeats: usize) -> String {
    let chunk = "Row {$= i $}: {$FOR j 1 10 $}{$= i j * \"0.00\" @decfmt $} {$END$}\n";
    format!("{{$ FOR i 1 {repeats} $}}{chunk}{{$END$}}")
}

fn make_static(repeats: usize) -> String {
    let chunk = "The quick brown fox {$= \"jumps\" $} over the lazy dog. \\{ \\\\\n";
    chunk.repeat(repeats)
}

fn bench_parse(c: &mut Criterion) {
    let small = make_static(100);
    let large = make_static(10_000);

    let mut g = c.benchmark_group("parse");
    g.bench_function("static_small", |b| b.iter(|| parse(black_box(&small))));
    g.bench_function("static_large", |b| b.iter(|| parse(black_box(&large))));
    g.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut g = c.benchmark_group("render");
    for repeats in [10, 100, 1000] {
        let doc = parse(&make_template(repeats)).expect("bench template parses");
        g.bench_function(format!("nested_loops_{repeats}"), |b| {
            b.iter(|| {
                let mut ctx = CaptureContext::new();
                render(black_box(&doc), &mut ctx).expect("render");
                ctx.output
            })
        });
    }
    g.finish();
}

fn bench_write_tree(c: &mut Criterion) {
    let doc = parse(&make_static(1000)).expect("bench template parses");
    c.bench_function("write_tree", |b| b.iter(|| write_tree(black_box(&doc))));
}

criterion_group!(benches, bench_parse, bench_render, bench_write_tree);
criterion_main!(benches);
