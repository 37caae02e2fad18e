// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_match_spec_table() {
    let cfg = Config::default();
    assert_eq!(cfg.heartbeat_interval_s, 10);
    assert_eq!(cfg.registration_timeout_s, 10);
    assert_eq!(cfg.ack_timeout_s, 5);
    assert_eq!(cfg.runner_death_timeout_s, 30);
    assert_eq!(cfg.default_step_timeout_s, 3600);
    assert_eq!(cfg.trigger_dedup_window_s, 3600);
    assert_eq!(cfg.debug_default_timeout_s, 3600);
    assert_eq!(cfg.debug_max_timeout_s, 14400);
    assert_eq!(cfg.orphan_grace_minutes, 5);
    assert_eq!(cfg.completed_exec_retention_days, 30);
}

#[test]
fn agent_routing_defaults_to_stricter_remote_only_rule() {
    assert!(!Config::default().allow_local_agent_steps);
}

#[test]
fn single_node_lock_backend_is_default() {
    assert!(Config::default().single_node);
}
