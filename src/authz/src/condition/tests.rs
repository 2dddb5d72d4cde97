//! Condition tree tests: parsing, reference resolution, fail-closed evaluation

use super::{Condition, ConditionError, Operand, Operator, Predicate};
use crate::types::Context;
use serde_json::{json, Value};

fn ctx(pairs: &[(&str, Value)]) -> Context {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_parse_leaf() {
    let condition = Condition::parse(&json!({"field": "amount", "operator": "lte", "value": 500}));

    assert_eq!(
        condition,
        Condition::Leaf(Predicate {
            field: "amount".to_string(),
            operator: Operator::Lte,
            value: Operand::Literal(json!(500)),
        })
    );
}

#[test]
fn test_parse_reference_operand() {
    let condition = Condition::parse(&json!({"field": "ownerId", "operator": "eq", "value": "@currentUser"}));

    match condition {
        Condition::Leaf(predicate) => {
            assert_eq!(predicate.value, Operand::Reference("currentUser".to_string()));
        }
        other => panic!("expected leaf, got {:?}", other),
    }
}

#[test]
fn test_parse_nested_tree() {
    let condition = Condition::parse(&json!({
        "or": [
            {"field": "role", "operator": "eq", "value": "manager"},
            {"and": [
                {"field": "ownerId", "operator": "eq", "value": "@currentUser"},
                {"not": {"field": "status", "operator": "eq", "value": "locked"}}
            ]}
        ]
    }));

    assert!(condition.validate().is_ok());
    match condition {
        Condition::Or(children) => {
            assert_eq!(children.len(), 2);
            assert!(matches!(children[1], Condition::And(_)));
        }
        other => panic!("expected or, got {:?}", other),
    }
}

#[test]
fn test_parse_empty_condition() {
    assert!(Condition::parse(&Value::Null).is_unconditional());
    assert!(Condition::parse(&json!({})).is_unconditional());
    assert!(Condition::parse(&json!({"and": []})).is_unconditional());
    assert!(!Condition::parse(&json!({"or": []})).is_unconditional());
}

#[test]
fn test_parse_flat_per_field_shape() {
    let condition = Condition::parse(&json!({
        "ownerId": {"operator": "eq", "value": "@currentUser"},
        "amount": {"operator": "lte", "value": 1000}
    }));

    assert!(condition.validate().is_ok());
    match &condition {
        Condition::And(children) => assert_eq!(children.len(), 2),
        other => panic!("expected implicit and, got {:?}", other),
    }

    let context = ctx(&[("ownerId", json!("u1")), ("currentUser", json!("u1")), ("amount", json!(200))]);
    assert!(condition.evaluate(&context));

    let context = ctx(&[("ownerId", json!("u1")), ("currentUser", json!("u1")), ("amount", json!(2000))]);
    assert!(!condition.evaluate(&context));
}

#[test]
fn test_parse_rejects_ambiguous_nodes() {
    let both = Condition::parse(&json!({
        "and": [],
        "field": "ownerId", "operator": "eq", "value": "u1"
    }));
    assert!(matches!(both.validate(), Err(ConditionError::AmbiguousNode(_))));

    let two_logical = Condition::parse(&json!({"and": [], "or": []}));
    assert!(matches!(two_logical.validate(), Err(ConditionError::AmbiguousNode(_))));
}

#[test]
fn test_parse_rejects_invalid_shapes() {
    let cases = [
        json!("ownerId == u1"),
        json!([{"field": "a", "operator": "eq", "value": 1}]),
        json!({"and": {"field": "a", "operator": "eq", "value": 1}}),
        json!({"field": "a", "operator": "eq", "value": 1, "extra": true}),
        json!({"field": 7, "operator": "eq", "value": 1}),
        json!({"operator": "eq", "value": 1}),
        json!({"ownerId": "u1"}),
        json!({"and": [], "extra": 1}),
    ];

    for case in cases {
        let condition = Condition::parse(&case);
        assert!(
            matches!(condition.validate(), Err(ConditionError::InvalidShape(_))),
            "{} should be an invalid shape",
            case
        );
    }

    let bad_not = Condition::parse(&json!({"not": [{"field": "a", "operator": "eq", "value": 1}]}));
    assert_eq!(bad_not.validate(), Err(ConditionError::InvalidNot));
}

#[test]
fn test_validate_reports_unknown_operator() {
    let condition = Condition::parse(&json!({
        "and": [
            {"field": "a", "operator": "eq", "value": 1},
            {"field": "b", "operator": "matches", "value": ".*"}
        ]
    }));

    assert_eq!(
        condition.validate(),
        Err(ConditionError::UnknownOperator("matches".to_string()))
    );
}

#[test]
fn test_serialization_emits_nested_tree() {
    let flat = Condition::parse(&json!({"ownerId": {"operator": "eq", "value": "@currentUser"}}));

    assert_eq!(
        flat.to_value(),
        json!({"and": [{"field": "ownerId", "operator": "eq", "value": "@currentUser"}]})
    );

    let tree = json!({"not": {"field": "status", "operator": "in", "value": ["a", "b"]}});
    assert_eq!(Condition::parse(&tree).to_value(), tree);
}

#[test]
fn test_serialization_preserves_malformed_input() {
    let raw = json!({"and": [], "or": []});
    let encoded = serde_json::to_value(Condition::parse(&raw)).unwrap();
    assert_eq!(encoded, raw);
}

// ============================================================================
// Evaluation
// ============================================================================

#[test]
fn test_empty_condition_always_holds() {
    assert!(Condition::parse(&Value::Null).evaluate(&Context::new()));
    assert!(Condition::parse(&json!({})).evaluate(&Context::new()));
}

#[test]
fn test_empty_logical_identities() {
    assert!(Condition::and(vec![]).evaluate(&Context::new()));
    assert!(!Condition::or(vec![]).evaluate(&Context::new()));
}

#[test]
fn test_context_reference_resolution() {
    let condition = Condition::leaf("ownerId", Operator::Eq, "@currentUser");

    assert!(condition.evaluate(&ctx(&[("ownerId", json!("u1")), ("currentUser", json!("u1"))])));
    assert!(!condition.evaluate(&ctx(&[("ownerId", json!("u1")), ("currentUser", json!("u2"))])));
}

#[test]
fn test_missing_reference_is_absent() {
    let eq = Condition::leaf("ownerId", Operator::Eq, "@currentUser");
    let ne = Condition::leaf("ownerId", Operator::Ne, "@currentUser");
    let context = ctx(&[("ownerId", json!("u1"))]);

    assert!(!eq.evaluate(&context));
    assert!(ne.evaluate(&context));
}

#[test]
fn test_missing_field_is_absent() {
    let context = Context::new();

    assert!(!Condition::leaf("status", Operator::Eq, "open").evaluate(&context));
    assert!(Condition::leaf("status", Operator::Ne, "open").evaluate(&context));
    assert!(Condition::leaf("status", Operator::NotIn, json!(["closed"])).evaluate(&context));
    assert!(!Condition::leaf("status", Operator::In, json!(["closed"])).evaluate(&context));
    assert!(!Condition::leaf("amount", Operator::Gte, 0).evaluate(&context));
}

#[test]
fn test_numeric_boundaries_under_and() {
    let adult = Condition::and(vec![
        Condition::leaf("age", Operator::Gte, 18),
        Condition::leaf("age", Operator::Lt, 65),
    ]);

    assert!(!adult.evaluate(&ctx(&[("age", json!(17))])));
    assert!(adult.evaluate(&ctx(&[("age", json!(18))])));
    assert!(adult.evaluate(&ctx(&[("age", json!(64))])));
    assert!(!adult.evaluate(&ctx(&[("age", json!(65))])));
}

#[test]
fn test_membership_against_referenced_list() {
    let condition = Condition::leaf("region", Operator::In, "@allowedRegions");
    let context = ctx(&[("region", json!("eu")), ("allowedRegions", json!(["eu", "us"]))]);

    assert!(condition.evaluate(&context));
}

#[test]
fn test_not_inverts() {
    let locked = Condition::leaf("status", Operator::Eq, "locked");
    let unlocked = Condition::not(locked.clone());
    let context = ctx(&[("status", json!("open"))]);

    assert!(!locked.evaluate(&context));
    assert!(unlocked.evaluate(&context));
}

#[test]
fn test_unknown_operator_fails_closed() {
    let condition = Condition::parse(&json!({"field": "a", "operator": "between", "value": [1, 2]}));
    let context = ctx(&[("a", json!(1))]);

    assert!(!condition.evaluate(&context));
}

#[test]
fn test_negated_bad_leaf_never_grants() {
    let context = ctx(&[("a", json!(1))]);

    let unknown = Condition::parse(&json!({"not": {"field": "a", "operator": "between", "value": 1}}));
    assert!(!unknown.evaluate(&context));

    let malformed = Condition::parse(&json!({"not": {"and": [], "or": []}}));
    assert!(!malformed.evaluate(&context));
}

#[test]
fn test_bad_branch_does_not_block_good_grant() {
    let condition = Condition::parse(&json!({
        "or": [
            {"field": "a", "operator": "between", "value": 1},
            {"field": "a", "operator": "eq", "value": 1}
        ]
    }));

    assert!(condition.evaluate(&ctx(&[("a", json!(1))])));
    assert!(!condition.evaluate(&ctx(&[("a", json!(2))])));
}

#[test]
fn test_and_with_false_child_denies_despite_bad_leaf() {
    let condition = Condition::parse(&json!({
        "and": [
            {"field": "a", "operator": "between", "value": 1},
            {"field": "a", "operator": "eq", "value": 2}
        ]
    }));

    assert!(!condition.evaluate(&ctx(&[("a", json!(1))])));
}

#[test]
fn test_large_id_leaf_does_not_match_neighbouring_id() {
    let neighbour = ctx(&[("accountId", json!(9_007_199_254_740_992u64))]);
    let exact = ctx(&[("accountId", json!(9_007_199_254_740_993u64))]);

    let eq = Condition::leaf("accountId", Operator::Eq, 9_007_199_254_740_993u64);
    assert!(!eq.evaluate(&neighbour));
    assert!(eq.evaluate(&exact));

    let member = Condition::leaf("accountId", Operator::In, json!([9_007_199_254_740_993u64]));
    assert!(!member.evaluate(&neighbour));

    let above = Condition::leaf("accountId", Operator::Gt, 9_007_199_254_740_992u64);
    assert!(above.evaluate(&exact));
}

#[test]
fn test_concurrent_evaluation() {
    use std::sync::Arc;

    let condition = Arc::new(Condition::leaf("ownerId", Operator::Eq, "@currentUser"));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let condition = Arc::clone(&condition);
            std::thread::spawn(move || {
                let user = format!("u{}", i);
                let context = ctx(&[("ownerId", json!(user)), ("currentUser", json!(user))]);
                condition.evaluate(&context)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
