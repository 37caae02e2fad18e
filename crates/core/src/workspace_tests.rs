// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::state_machine::StateMachine;

#[test]
fn full_lifecycle_happy_path() {
    use WorkspaceStatus::*;
    let mut sm = StateMachine::new(Creating);
    for next in [Ready, InUse, Ready, Cleaning, Cleaned] {
        sm.transition_to(next).unwrap();
    }
    assert!(sm.is_terminal());
}

#[test]
fn failed_can_retry_cleanup() {
    let mut sm = StateMachine::new(WorkspaceStatus::Failed);
    sm.transition_to(WorkspaceStatus::Cleaning).unwrap();
}

#[test]
fn cleaned_is_terminal() {
    let mut sm = StateMachine::new(WorkspaceStatus::Cleaned);
    assert!(sm.transition_to(WorkspaceStatus::Creating).is_err());
}

#[test]
fn in_use_requires_nonzero_use_count() {
    let mut ws = Workspace::new(RunId::new(), RepositoryId::new(), "main".into(), 0);
    ws.status = WorkspaceStatus::InUse;
    ws.use_count = 0;
    assert!(!ws.invariant_holds());
    ws.use_count = 1;
    assert!(ws.invariant_holds());
}

#[test]
fn cannot_enter_cleaning_with_active_leases() {
    let mut ws = Workspace::new(RunId::new(), RepositoryId::new(), "main".into(), 0);
    ws.status = WorkspaceStatus::Ready;
    ws.use_count = 2;
    assert!(!ws.can_enter_cleaning());
    ws.use_count = 0;
    assert!(ws.can_enter_cleaning());
}
