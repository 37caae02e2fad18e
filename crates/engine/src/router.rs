// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution Router: decides Local vs. Remote for a step.
//! Claiming an execution so concurrent callers converge on one record is
//! `PersistenceGateway::claim_execution` itself; callers call it directly
//! rather than through a redundant wrapper here.

use lazyaf_core::StepDef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub target: RouteTarget,
    /// Set only when routed Remote because the Local Executor was
    /// unavailable rather than by an earlier, stronger rule.
    pub fallback_reason: Option<&'static str>,
}

/// First-match routing. A step's `requires.hardware` or
/// `required_runner_id` subsumes rule 3's "non-default runner_type" case:
/// `StepDef` carries no separate `runner_type` field outside `StepType::Agent`
/// (see Note on lifted JSON blobs), so a non-agent step can
/// only ask for a specific runner through those two fields.
pub fn decide_route(
    step: &StepDef,
    local_executor_available: bool,
    force_local: bool,
    force_remote: bool,
) -> RouteDecision {
    let remote = |reason: Option<&'static str>| RouteDecision { target: RouteTarget::Remote, fallback_reason: reason };
    let local = RouteDecision { target: RouteTarget::Local, fallback_reason: None };

    if force_local {
        return local;
    }
    if force_remote {
        return remote(None);
    }
    if step.step_type.is_agent() {
        return remote(None);
    }
    if step.required_runner_id.is_some() || !step.requires.is_empty() {
        return remote(None);
    }
    if !local_executor_available {
        return remote(Some("local_executor_unavailable"));
    }
    local
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
