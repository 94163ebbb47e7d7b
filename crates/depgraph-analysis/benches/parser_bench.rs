use criterion::{black_box, criterion_group, criterion_main, Criterion};
use depgraph_analysis::parsers::bsl::parse_module;
use depgraph_analysis::parsers::ParserManager;
use depgraph_analysis::scanner::{SourceUnit, UnitKind};
use depgraph_core::config::ParserConfig;

fn synthetic_module(procedures: usize) -> String {
    let mut src = String::new();
    for i in 0..procedures {
        src.push_str(&format!("// @requirement REQ-{i}\n"));
        src.push_str(&format!("Function Step{i}(Value) Export\n"));
        src.push_str("    If Value > 0 Then\n");
        src.push_str(&format!("        Items = Catalogs.Products{i}.Select();\n"));
        src.push_str("    EndIf;\n");
        if i > 0 {
            src.push_str(&format!("    Return Step{}(Value - 1);\n", i - 1));
        }
        src.push_str("EndFunction\n\n");
    }
    src
}

fn bench_fast_path(c: &mut Criterion) {
    let src = synthetic_module(200);
    c.bench_function("bsl_fast_path_200_procs", |b| {
        b.iter(|| parse_module(black_box(&src)))
    });
}

fn bench_cached_parse(c: &mut Criterion) {
    let unit = SourceUnit::from_text(
        "CommonModules/Bench/Ext/Module.bsl",
        UnitKind::SourceModule,
        synthetic_module(200),
    );
    let manager = ParserManager::new(ParserConfig::default());
    let _ = manager.parse(&unit);
    c.bench_function("parser_manager_cache_hit", |b| {
        b.iter(|| manager.parse(black_box(&unit)))
    });
}

criterion_group!(benches, bench_fast_path, bench_cached_parse);
criterion_main!(benches);
