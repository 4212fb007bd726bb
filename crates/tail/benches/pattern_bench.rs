//! 패턴 매칭 벤치마크
//!
//! 단일/다중 상태 패턴 평가와 토픽 템플릿 전개 성능을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use logsentry_core::config::StateRule;
use logsentry_tail::PatternSet;

fn rule(state: &str, pattern: &str) -> StateRule {
    StateRule {
        state: state.to_owned(),
        pattern: pattern.to_owned(),
        payload: None,
    }
}

fn door_rules(count: usize) -> Vec<StateRule> {
    (0..count)
        .flat_map(|i| {
            vec![
                rule(&format!("open_{i}"), &format!(r"^SENSOR{i} (?<id>\d+) OPEN$")),
                rule(
                    &format!("closed_{i}"),
                    &format!(r"^SENSOR{i} (?<id>\d+) CLOSED$"),
                ),
            ]
        })
        .collect()
}

fn bench_single_pattern_match(c: &mut Criterion) {
    let set = PatternSet::compile(&[rule("open", r"^DOOR (?<id>\d+) OPEN$")]).unwrap();

    let mut group = c.benchmark_group("single_pattern");
    group.throughput(Throughput::Elements(1));
    group.bench_function("matching_line", |b| {
        b.iter(|| set.first_match(black_box("DOOR 42 OPEN")))
    });
    group.bench_function("non_matching_line", |b| {
        b.iter(|| set.first_match(black_box("unrelated log output")))
    });
    group.finish();
}

fn bench_pattern_set_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_set_scaling");
    for size in [1usize, 5, 10, 25] {
        let set = PatternSet::compile(&door_rules(size)).unwrap();
        group.throughput(Throughput::Elements(size as u64 * 2));
        group.bench_with_input(BenchmarkId::from_parameter(size), &set, |b, set| {
            // 마지막 패턴에만 매칭되는 최악의 경우
            let line = format!("SENSOR{} 7 CLOSED", size - 1);
            b.iter(|| set.matches(black_box(&line)).count())
        });
    }
    group.finish();
}

fn bench_template_expansion(c: &mut Criterion) {
    let set = PatternSet::compile(&[rule(
        "on",
        r"^(?<site>\w+)/(?<room>\w+)/(?<name>\w+):(?<val>\d+)$",
    )])
    .unwrap();

    c.bench_function("template_expansion", |b| {
        b.iter(|| {
            let m = set.first_match(black_box("home/kitchen/door1:1")).unwrap();
            m.expand(black_box("sensor/{site}/{room}/{name}"))
        })
    });
}

criterion_group!(
    benches,
    bench_single_pattern_match,
    bench_pattern_set_scaling,
    bench_template_expansion
);
criterion_main!(benches);
