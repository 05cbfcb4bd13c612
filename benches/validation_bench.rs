use criterion::{Criterion, criterion_group, criterion_main};
use jsonschema_resolver::*;
use serde_json::{Value, json};
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

const ORDER_URI: &str = "http://example.com/bench/order.json";

fn order_schema() -> Value {
    let mut properties = serde_json::Map::new();
    for i in 0..50 {
        properties.insert(format!("field{i}"), json!({"type": "string", "maxLength": 32}));
    }
    properties.insert(
        "lines".to_string(),
        json!({"type": "array", "items": {"$ref": "#/definitions/line"}, "minItems": 1}),
    );

    json!({
        "type": "object",
        "properties": properties,
        "definitions": {
            "line": {
                "type": "object",
                "properties": {
                    "sku": {"type": "string", "pattern": "^[A-Z]{3}-[0-9]+$", "required": true},
                    "quantity": {"type": "integer", "minimum": 1},
                    "price": {"type": "number", "multipleOf": 0.01}
                },
                "additionalProperties": false
            }
        }
    })
}

fn order_instance() -> Value {
    let mut order = serde_json::Map::new();
    for i in 0..50 {
        order.insert(format!("field{i}"), json!(format!("value {i}")));
    }
    let lines: Vec<Value> = (0..100)
        .map(|i| json!({"sku": format!("ABC-{i}"), "quantity": i + 1, "price": 9.99}))
        .collect();
    order.insert("lines".to_string(), Value::Array(lines));
    Value::Object(order)
}

fn provider() -> SchemaProvider {
    SchemaProvider::new(Arc::new(MemoryFetcher::new().with_document(ORDER_URI, order_schema())))
}

fn bench_schema_resolution(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("schema_resolution", |b| {
        b.iter(|| {
            rt.block_on(async {
                let schema = provider().load(ORDER_URI, None).await.unwrap();
                black_box(schema)
            })
        })
    });

    let cached = provider();
    rt.block_on(cached.load(ORDER_URI, None)).unwrap();
    c.bench_function("schema_cache_hit", |b| {
        b.iter(|| black_box(rt.block_on(cached.load(ORDER_URI, None)).unwrap()))
    });
}

fn bench_validation(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let schema = rt.block_on(provider().load(ORDER_URI, None)).unwrap();
    let instance = order_instance();

    c.bench_function("validate_report_all", |b| {
        let validator = SchemaValidator::new();
        b.iter(|| black_box(validator.validate(&schema, &instance)))
    });

    c.bench_function("validate_fail_fast", |b| {
        let validator = SchemaValidator::new().with_mode(ValidationMode::FailFast);
        b.iter(|| black_box(validator.validate(&schema, &instance)))
    });
}

criterion_group!(benches, bench_schema_resolution, bench_validation);
criterion_main!(benches);
