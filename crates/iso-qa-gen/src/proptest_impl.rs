//! Proptest strategies and properties for the plan/oracle pipeline
//!
//! Generates small random catalogs and checks the properties every plan must
//! hold regardless of schema content.

use crate::baseline::FieldValueMap;
use crate::oracle::{ParsedElement, Response, ResponseOracle};
use crate::plan::{plan_for, Expectation};
use crate::schema::{Category, Schema};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Strategy for a field format name
pub fn format_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("fixed"), Just("llvar"), Just("lllvar"), Just("bitmap")]
}

/// Strategy for a field type name
pub fn type_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("numeric"),
        Just("alphanumeric"),
        Just("ans"),
        Just("binary"),
        Just("hex"),
    ]
}

/// Strategy for a subset of categories
pub fn categories_strategy() -> impl Strategy<Value = Vec<Category>> {
    prop::sample::subsequence(Category::all().to_vec(), 0..=4)
}

/// Strategy for one catalog entry. Valid candidates are digits, exemplars are
/// prefixed with `X` so the two never collide.
pub fn entry_strategy() -> impl Strategy<Value = Value> {
    (
        format_strategy(),
        type_strategy(),
        prop::option::of("[0-9]{1,12}"),
        prop::option::of("[0-9]{1,12}"),
        categories_strategy(),
        "[A-Z]{0,6}",
    )
        .prop_map(|(format, field_type, example, raw, categories, suffix)| {
            let mut entry = Map::new();
            entry.insert("name".to_string(), json!(format!("Field {suffix}")));
            entry.insert("format".to_string(), json!(format));
            entry.insert("type".to_string(), json!(field_type));
            if let Some(example) = example {
                entry.insert("validExample".to_string(), json!(example));
            }
            if let Some(raw) = raw {
                entry.insert("validExampleRaw".to_string(), json!(raw));
            }
            for (i, category) in categories.into_iter().enumerate() {
                entry.insert(category.value_key(), json!(format!("X{i}{suffix}")));
            }
            Value::Object(entry)
        })
}

/// Strategy for a whole schema document
pub fn schema_strategy() -> impl Strategy<Value = String> {
    prop::collection::btree_map(1u32..129, entry_strategy(), 1..8).prop_map(|fields| {
        let doc: Map<String, Value> = fields
            .into_iter()
            .map(|(id, entry)| (id.to_string(), entry))
            .collect();
        Value::Object(doc).to_string()
    })
}

fn echo(values: &FieldValueMap) -> Response {
    Response::elements(
        values
            .iter()
            .map(|(id, v)| ParsedElement::new(id, v))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_schema_strategy_generates_loadable_schemas() {
        let mut runner = TestRunner::default();
        for _ in 0..50 {
            let doc = schema_strategy()
                .new_tree(&mut runner)
                .expect("Failed to generate")
                .current();
            let schema = Schema::from_json_str(&doc).expect("parse");
            assert!(schema.config_errors().is_empty(), "{:?}", schema.config_errors());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_plan_is_deterministic(doc in schema_strategy()) {
            let schema = Schema::from_json_str(&doc).expect("parse");
            let a = serde_json::to_string(&plan_for(&schema)).expect("json");
            let b = serde_json::to_string(&plan_for(&schema)).expect("json");
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_mutation_changes_exactly_one_field(doc in schema_strategy()) {
            let schema = Schema::from_json_str(&doc).expect("parse");
            let plan = plan_for(&schema);
            for case in plan.cases() {
                let mutated = case.mutate(&plan.baseline);
                prop_assert_eq!(mutated.differing_ids(&plan.baseline), vec![case.field_id.clone()]);
            }
        }

        #[test]
        fn prop_recovery_restores_baseline(doc in schema_strategy()) {
            let schema = Schema::from_json_str(&doc).expect("parse");
            let plan = plan_for(&schema);
            for case in plan.cases() {
                let restored = case.restore(&case.mutate(&plan.baseline));
                prop_assert_eq!(&restored, &plan.baseline);
            }
        }

        #[test]
        fn prop_cases_only_for_declared_categories(doc in schema_strategy()) {
            let schema = Schema::from_json_str(&doc).expect("parse");
            let plan = plan_for(&schema);
            for case in plan.cases() {
                prop_assert!(schema.has_category(&case.field_id, case.category));
                prop_assert_eq!(
                    schema.category_value(&case.field_id, case.category),
                    Some(case.invalid_value.as_str())
                );
            }
        }

        #[test]
        fn prop_echoed_exemplar_fails_reject_leg(doc in schema_strategy()) {
            let schema = Schema::from_json_str(&doc).expect("parse");
            let plan = plan_for(&schema);
            let oracle = ResponseOracle::new(&schema);
            for case in plan.cases() {
                let mutated = case.mutate(&plan.baseline);
                let verdict = oracle.judge(Expectation::Reject, &echo(&mutated), &mutated);
                prop_assert!(!verdict.passed);
            }
        }

        #[test]
        fn prop_echoed_baseline_is_correct(doc in schema_strategy()) {
            let schema = Schema::from_json_str(&doc).expect("parse");
            let plan = plan_for(&schema);
            let outcome = ResponseOracle::new(&schema).evaluate(&echo(&plan.baseline), &plan.baseline);
            prop_assert!(outcome.is_accepted_correct());
        }
    }
}
