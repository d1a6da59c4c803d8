//! Feature vectors keep their schema shape whatever the input looks like.

use common::Capability;
use proptest::prelude::*;
use serde_json::{Map, Value};
use soilsense_pipeline::{known_fields, schema_for, FeatureVectorBuilder};

fn any_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1e6f64..1e6).prop_map(|v| serde_json::json!(v)),
        "[a-z0-9.]{0,6}".prop_map(Value::String),
    ]
}

fn any_record() -> impl Strategy<Value = Map<String, Value>> {
    let names: Vec<String> = known_fields().into_iter().map(str::to_string).collect();
    prop::collection::btree_map(prop::sample::select(names), any_value(), 0..5)
        .prop_map(|m| m.into_iter().collect())
}

proptest! {
    #[test]
    fn prop_length_and_order_match_schema(
        cap in prop::sample::select(Capability::ALL.to_vec()),
        record in any_record(),
    ) {
        let fv = FeatureVectorBuilder::build(cap, &record);
        let schema = schema_for(cap);
        prop_assert_eq!(fv.len(), schema.len());
        let expected: Vec<&str> = schema.iter().map(|s| s.name).collect();
        prop_assert_eq!(fv.names(), expected.as_slice());
        prop_assert!(fv.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn prop_absent_fields_take_defaults(
        cap in prop::sample::select(Capability::ALL.to_vec()),
        record in any_record(),
    ) {
        let fv = FeatureVectorBuilder::build(cap, &record);
        for spec in schema_for(cap) {
            if fv.defaulted().contains(&spec.name) {
                prop_assert_eq!(fv.get(spec.name), Some(spec.default));
            }
        }
    }
}
