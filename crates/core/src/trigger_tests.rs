// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn trigger_key_matches_glossary_format() {
    let repo = RepositoryId::from_string("rep-abc");
    assert_eq!(make_trigger_key("push", &repo, "main"), "push:rep-abc:main");
}

#[test]
fn recent_trigger_is_duplicate_within_window() {
    let rec = TriggerRecord::new("k".into(), RunId::new(), 1_000);
    assert!(rec.is_duplicate(1_500, 3600));
}

#[test]
fn old_trigger_is_not_duplicate_outside_window() {
    let rec = TriggerRecord::new("k".into(), RunId::new(), 0);
    assert!(!rec.is_duplicate(3_600_001, 3600));
}

#[test]
fn zero_window_disables_dedup() {
    let rec = TriggerRecord::new("k".into(), RunId::new(), 0);
    assert!(!rec.is_duplicate(1, 0));
}
