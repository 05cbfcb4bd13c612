mod common;

use std::sync::Arc;

use common::*;
use jsonschema_resolver::utils::{join_path, unescape_segment};
use jsonschema_resolver::*;
use once_cell::sync::Lazy;
use proptest::prelude::*;
use serde_json::{Value, json};

static BOUNDED_INTEGER: Lazy<Arc<SchemaNode>> =
    Lazy::new(|| tokio_test::block_on(resolve_inline(json!({"type": "integer", "minimum": 0, "maximum": 100}))));

static PERSON: Lazy<Arc<SchemaNode>> = Lazy::new(|| {
    tokio_test::block_on(resolve_at(PERSON_URI, person_schema())).expect("person schema resolves")
});

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-1000i64..1000).prop_map(Value::from),
        (-1000.0f64..1000.0).prop_map(Value::from),
        "[a-z@.]{0,8}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::btree_map(
                prop_oneof![
                    Just("name".to_string()),
                    Just("age".to_string()),
                    Just("tags".to_string()),
                    "[a-z]{1,4}"
                ],
                inner,
                0..4
            )
            .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn bounded_integer_matches_range(n in -500i64..500) {
        let result = SchemaValidator::new().validate(&BOUNDED_INTEGER, &json!(n));
        prop_assert_eq!(result.is_valid, (0..=100).contains(&n));
    }

    #[test]
    fn validation_is_deterministic(data in json_value()) {
        let validator = SchemaValidator::new();
        let first = validator.validate(&PERSON, &data);
        let second = validator.validate(&PERSON, &data);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.is_valid, first.failures.is_empty());
        prop_assert_eq!(PERSON.is_valid(&data), first.is_valid);
    }

    #[test]
    fn fail_fast_agrees_with_report_all(data in json_value()) {
        let all = SchemaValidator::new().validate(&PERSON, &data);
        let fast = SchemaValidator::new()
            .with_mode(ValidationMode::FailFast)
            .validate(&PERSON, &data);

        prop_assert_eq!(all.is_valid, fast.is_valid);
        prop_assert!(fast.failures.len() <= 1);
        if let Some(first) = fast.failures.first() {
            prop_assert_eq!(first, &all.failures[0]);
        }
    }

    #[test]
    fn pointer_segments_round_trip(segment in "[a-z~/]{0,12}") {
        let path = join_path("", &segment);
        prop_assert_eq!(unescape_segment(&path[1..]), segment);
    }
}
