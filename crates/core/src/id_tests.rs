// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn new_ids_carry_prefix_and_are_unique() {
    let a = CorrelationId::new();
    let b = CorrelationId::new();
    assert!(a.as_str().starts_with(CorrelationId::PREFIX));
    assert_ne!(a, b);
}

#[test]
fn id_length_fits_inline() {
    // prefix (4) + nanoid (19) stays within SmolStr's 23-byte inline buffer
    assert_eq!(RunnerId::new().as_str().len(), 23);
}

#[parameterized(
    runner = { RunnerId::PREFIX, "rnr-" },
    correlation = { CorrelationId::PREFIX, "cor-" },
    job = { JobId::PREFIX, "job-" },
    action = { ActionId::PREFIX, "act-" },
    trigger = { TriggerId::PREFIX, "trg-" },
)]
fn prefixes(actual: &str, expected: &str) {
    assert_eq!(actual, expected);
}

#[test]
fn id_serde_is_transparent() {
    let id = RunnerId::from_string("rnr-fixed");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"rnr-fixed\"");
    let parsed: RunnerId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn id_compares_against_str() {
    let id = JobId::from_string("job-x");
    assert_eq!(id, "job-x");
    assert_eq!(id.to_string(), "job-x");
}
