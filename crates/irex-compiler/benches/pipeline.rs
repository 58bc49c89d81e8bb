//! Pipeline benchmarks.
//!
//! Measures a full build (decode, validate, normalize, assemble) of a
//! project with a varying number of model-bound services.
//!
//! Run with: cargo bench -p irex-compiler --bench pipeline

use std::fs;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use irex_compiler::{build, BuildOptions};

const CONFIG: &str = r#"
project:
  name: bench
  version: 1.0.0
  author: bench
  license: MIT
  paths: { specifications: ./spec, templates: ./templates, output: ./out }
  generator: { schema: true, service: true }
  runtime:
    name: node
    version: 20
    options: { package_manager: pnpm, entry: src/server.ts }
    schema: { framework: mongoose, options: { uri: !env MONGO_URI } }
    service: { framework: fastify, options: { port: 3000, host: 0.0.0.0 } }
  meta: { created_at: 2026-01-01T00:00:00Z, generator_version: 0.1.0 }
"#;

/// One schema file per model, plus one service file binding a service to each.
fn write_project(dir: &std::path::Path, service_count: usize) {
    fs::create_dir_all(dir.join("spec/schema")).unwrap();
    fs::create_dir_all(dir.join("spec/service")).unwrap();
    fs::write(dir.join("irex.yaml"), CONFIG).unwrap();

    let mut services = String::from(
        r#"policies:
  presets:
    - { name: authenticated, scope: request }
  customs:
    - { name: ownerOnly, scope: resource }
rate_limits:
  presets:
    - { name: standard, limit: 100/1m }
services:
  base_path: /api
  defaults: { pagination: true, crud_operations: !except [delete], middlewares: [auth] }
  services:
"#,
    );

    for i in 0..service_count {
        fs::write(
            dir.join(format!("spec/schema/model{i}.yaml")),
            format!(
                r#"models:
  - name: Model{i}
    fields:
      - {{ name: title, type: string, required: true, min_length: 1, max_length: 255 }}
      - {{ name: count, type: number, min: 0 }}
"#
            ),
        )
        .unwrap();
        services.push_str(&format!(
            r#"    - name: resource{i}
      model: Model{i}
      path: /resource{i}
      apply:
        - {{ type: policy, name: authenticated, rate_limits: [standard] }}
        - {{ type: policy, name: ownerOnly, to_operations: [read, update] }}
"#
        ));
    }
    fs::write(dir.join("spec/service/main.yaml"), services).unwrap();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for count in [10, 50, 100] {
        let temp_dir = tempfile::TempDir::new().unwrap();
        write_project(temp_dir.path(), count);
        let options = BuildOptions::new(temp_dir.path().join("irex.yaml"));

        group.bench_with_input(
            BenchmarkId::new("services", count),
            &options,
            |b, options| {
                b.iter(|| {
                    let output = build(black_box(options));
                    black_box(output.into_result().unwrap());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
