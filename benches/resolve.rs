use std::fs::File;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde::Deserialize;

use endpoint_rules::{resolve_endpoint, resolve_endpoint_with_trace, Environment, RuleSet};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestFile {
    rule_set: RuleSet,
}

fn load(path: &str) -> RuleSet {
    let test_file: TestFile = serde_json::from_reader(File::open(path).unwrap()).unwrap();
    test_file.rule_set
}

fn criterion_benchmark(c: &mut Criterion) {
    {
        let rule_set = load("tests/data/rules/regional.json");
        let mut group = c.benchmark_group("regional");
        group.throughput(Throughput::Elements(1));

        let environment = Environment::new().with("Region", "us-west-2");
        group.bench_function("resolve_endpoint", |b| {
            b.iter(|| resolve_endpoint(black_box(&rule_set), black_box(&environment)))
        });
        group.bench_function("resolve_endpoint_with_trace", |b| {
            b.iter(|| resolve_endpoint_with_trace(black_box(&rule_set), black_box(&environment)))
        });

        let environment = Environment::new()
            .with("Region", "us-isob-east-1")
            .with("UseFIPS", true)
            .with("UseDualStack", true);
        group.bench_function("resolve_endpoint_error", |b| {
            b.iter(|| resolve_endpoint(black_box(&rule_set), black_box(&environment)))
        });
        group.finish();
    }

    {
        let rule_set = load("tests/data/rules/bucket.json");
        let mut group = c.benchmark_group("bucket");
        group.throughput(Throughput::Elements(1));

        let environment = Environment::new()
            .with(
                "Bucket",
                "arn:aws:s3-outposts:us-west-2:123456789012:outpost/op-01234567890123456/accesspoint/reports",
            )
            .with("Region", "us-west-2");
        group.bench_function("outposts_arn", |b| {
            b.iter(|| resolve_endpoint(black_box(&rule_set), black_box(&environment)))
        });
        group.finish();
    }

    c.bench_function("parse_rule_set", |b| {
        let json = std::fs::read_to_string("tests/data/rules/regional.json").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let rule_set_json = value["ruleSet"].to_string();
        b.iter(|| RuleSet::from_json(black_box(&rule_set_json)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
