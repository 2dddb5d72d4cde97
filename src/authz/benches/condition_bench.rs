//! Condition evaluation and permission check benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use permit_authz::{
    Condition, Context, Evaluator, EvaluatorConfig, InMemoryBackend, MemoryCache, Permission,
    PermissionStore, RoleAdmin, StoreConfig,
};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn nested_condition() -> Condition {
    Condition::parse(&json!({
        "and": [
            {"field": "ownerId", "operator": "eq", "value": "@currentUser"},
            {"or": [
                {"field": "status", "operator": "in", "value": ["draft", "review"]},
                {"not": {"field": "amount", "operator": "gt", "value": 1000}}
            ]}
        ]
    }))
}

fn request_context() -> Context {
    let mut context = Context::new();
    context.insert("ownerId".to_string(), json!("u1"));
    context.insert("currentUser".to_string(), json!("u1"));
    context.insert("status".to_string(), json!("published"));
    context.insert("amount".to_string(), json!(250));
    context
}

fn bench_condition_evaluation(c: &mut Criterion) {
    let condition = nested_condition();
    let context = request_context();

    c.bench_function("condition_evaluate_nested", |b| {
        b.iter(|| black_box(condition.evaluate(black_box(&context))));
    });

    c.bench_function("condition_parse_nested", |b| {
        let raw = nested_condition().to_value();
        b.iter(|| black_box(Condition::parse(black_box(&raw))));
    });
}

fn bench_permission_check(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("permission_check");

    for decision_cache in [false, true] {
        group.bench_with_input(
            BenchmarkId::new("decision_cache", decision_cache),
            &decision_cache,
            |b, &enable_cache| {
                let evaluator = rt.block_on(async {
                    let backend = Arc::new(InMemoryBackend::new());
                    let store = Arc::new(PermissionStore::new(
                        backend.clone(),
                        backend.clone(),
                        Arc::new(MemoryCache::default()),
                        StoreConfig::default(),
                    ));
                    let admin = RoleAdmin::new(store.clone());

                    let role = admin.create_role("EDITOR", None, false).await.unwrap();
                    let mut ids = Vec::new();
                    for i in 0..50 {
                        let permission = store
                            .save(Permission::new(format!("resource-{}", i), "update").with_conditions(nested_condition()))
                            .await
                            .unwrap();
                        ids.push(permission.id);
                    }
                    admin.assign_permissions(&role.id, &ids).await.unwrap();
                    admin.assign_role("u1", &role.id).await.unwrap();

                    Evaluator::new(
                        store,
                        EvaluatorConfig {
                            enable_cache,
                            enable_metrics: false,
                            ..Default::default()
                        },
                    )
                });
                let context = request_context();

                b.to_async(&rt).iter(|| async {
                    let allowed = evaluator
                        .has_permission("u1", "resource-7", "update", black_box(&context))
                        .await
                        .unwrap();
                    black_box(allowed);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_condition_evaluation, bench_permission_check);
criterion_main!(benches);
