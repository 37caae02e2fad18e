// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::state_machine::StateMachine;
use std::collections::HashSet;

#[test]
fn pause_attach_and_resume_cycle() {
    use DebugState::*;
    let mut sm = StateMachine::new(Pending);
    sm.transition_to(WaitingAtBreakpoint).unwrap();
    sm.transition_to(Connected).unwrap();
    sm.transition_to(WaitingAtBreakpoint).unwrap();
    sm.transition_to(Ended).unwrap();
    assert!(sm.is_terminal());
}

#[test]
fn timeout_reachable_from_wait_or_connected() {
    use DebugState::*;
    for start in [WaitingAtBreakpoint, Connected] {
        let mut sm = StateMachine::new(start);
        sm.transition_to(Timeout).unwrap();
    }
}

#[test]
fn ended_and_timeout_are_terminal() {
    for terminal in [DebugState::Ended, DebugState::Timeout] {
        let mut sm = StateMachine::new(terminal);
        assert!(sm.transition_to(DebugState::Pending).is_err());
    }
}

#[test]
fn has_breakpoint_checks_membership() {
    let mut bps = HashSet::new();
    bps.insert(2);
    let session = DebugSession::new(RunId::new(), None, bps, "tok".into(), 3600, 14400, 0);
    assert!(session.has_breakpoint(2));
    assert!(!session.has_breakpoint(3));
}

#[test]
fn extend_is_capped_at_max_timeout() {
    let mut session =
        DebugSession::new(RunId::new(), None, HashSet::new(), "tok".into(), 100, 200, 0);
    session.extend(1000, 0);
    assert_eq!(session.expires_at_ms, 200_000);
}
