// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn sub_second_shows_millis() {
    assert_eq!(format_elapsed_ms(250), "250ms");
}

#[test]
fn seconds_only() {
    assert_eq!(format_elapsed_ms(45_000), "45s");
}

#[test]
fn minutes_and_seconds() {
    assert_eq!(format_elapsed_ms(125_000), "2m5s");
}

#[test]
fn hours_minutes_seconds() {
    assert_eq!(format_elapsed_ms(3_725_000), "1h2m5s");
}

#[test]
fn duration_wrapper_matches_ms() {
    assert_eq!(
        format_elapsed(Duration::from_secs(65)),
        format_elapsed_ms(65_000)
    );
}
