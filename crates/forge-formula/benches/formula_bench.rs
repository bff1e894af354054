//! Criterion benchmarks for formula evaluation.
//!
//! Groups:
//! - `compile`: token list to compiled formula.
//! - `apply`: the evaluator hot path for constant, leveling, and stack
//!   programs.
//! - `variable_formula`: evaluation including custom tool variables.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use forge_formula::*;
use forge_loadable::Loadable;
use serde_json::json;

fn stat_loadable() -> FormulaLoadable {
    FormulaLoadable::new(STAT_VARIABLES.iter().copied(), FallbackFormula::Identity)
}

fn bench_compile(c: &mut Criterion) {
    let loadable = stat_loadable();
    let node = json!(["$value", "$level", 0.5, "*", 1, "+", "*", "$level", "sqrt", "max"]);
    c.bench_function("compile/stack_program", |b| {
        b.iter(|| loadable.convert(black_box(&node), "formula"))
    });
}

fn bench_apply(c: &mut Criterion) {
    let loadable = stat_loadable();
    let constant = loadable.convert(&json!(4.0), "").unwrap();
    let leveling = loadable
        .convert(&json!(["$level", 2.5, "*", 10, "+"]), "")
        .unwrap();
    let program = loadable
        .convert(
            &json!(["$value", "$level", 0.5, "*", 1, "+", "*", "$level", "sqrt", "max"]),
            "",
        )
        .unwrap();
    let values = [3.0f32, 12.0];

    let mut group = c.benchmark_group("apply");
    group.bench_function("constant", |b| b.iter(|| constant.apply(black_box(&values))));
    group.bench_function("leveling", |b| b.iter(|| leveling.apply(black_box(&values))));
    group.bench_function("stack_program", |b| b.iter(|| program.apply(black_box(&values))));
    group.finish();
}

fn bench_variable_formula(c: &mut Criterion) {
    let loaders = ToolLoaders::new().unwrap();
    let loadable =
        VariableFormulaLoadable::new(STAT_VARIABLES, FallbackFormula::Identity, loaders.variables);
    let formula = loadable
        .convert(
            &json!({
                "variables": {
                    "speed": {"type": "stat", "stat": "mining_speed", "fallback": 1},
                    "wear": "durability_percent"
                },
                "formula": ["$value", "$speed", "*", "$wear", "*"]
            }),
            "",
        )
        .unwrap();
    let tool = ToolContext::new(3)
        .with_stat("mining_speed", 6.0)
        .with_durability(120, 200);

    c.bench_function("variable_formula/stat", |b| {
        b.iter(|| formula.apply(black_box(&tool), &stat_values(&tool, 10.0)))
    });
}

criterion_group!(benches, bench_compile, bench_apply, bench_variable_formula);
criterion_main!(benches);
