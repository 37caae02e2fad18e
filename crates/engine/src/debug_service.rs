// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debug Session Service: breakpoint pause, token-gated
//! attach, resume/abort, and timeout extension for a pipeline-run rerun.
//! `check_breakpoint` is the scheduler's hook — it blocks the calling task on
//! a per-session [`tokio::sync::Notify`] until `resume`/`abort` (or the
//! expiry sweep) fires it, so the run driver simply awaits it inline rather
//! than polling.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lazyaf_core::{
    Clock, ConnectionMode, DebugEventKind, DebugSession, DebugSessionId, DebugState, EngineError,
    EngineResult, Event, PipelineRun, RunId, StateMachine, TriggerType,
};
use lazyaf_storage::PersistenceGateway;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::event_bus::EventBus;

/// What a blocked `check_breakpoint` call should do once woken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointDecision {
    Resume,
    Abort,
}

struct Waiter {
    notify: Arc<Notify>,
    decision: Arc<Mutex<Option<BreakpointDecision>>>,
}

pub struct DebugSessionService<C: Clock> {
    gateway: PersistenceGateway,
    events: EventBus,
    clock: C,
    waiters: Mutex<HashMap<DebugSessionId, Waiter>>,
}

impl<C: Clock> DebugSessionService<C> {
    pub fn new(gateway: PersistenceGateway, events: EventBus, clock: C) -> Self {
        Self { gateway, events, clock, waiters: Mutex::new(HashMap::new()) }
    }

    /// Starts a new `PipelineRun` (forked from `original_run`'s pipeline) and
    /// a `DebugSession` armed with `breakpoints`, gated by `token`.
    pub fn create_debug_rerun(
        &self,
        original_run: &PipelineRun,
        breakpoints: HashSet<u32>,
        token: String,
        timeout_seconds: u64,
        max_timeout_seconds: u64,
    ) -> EngineResult<(PipelineRun, DebugSession)> {
        let now = self.clock.epoch_ms();
        let run = PipelineRun::new(original_run.pipeline_id, TriggerType::Manual, now);
        self.gateway.insert_pipeline_run(run.clone())?;

        let session = DebugSession::new(
            run.id,
            Some(original_run.id),
            breakpoints,
            token,
            timeout_seconds,
            max_timeout_seconds,
            now,
        );
        self.gateway.insert_debug_session(session.clone())?;
        Ok((run, session))
    }

    /// Scheduler hook, called before a step is dispatched. If `run_id` carries
    /// a live debug session armed at `step_index`, transitions it to
    /// `WAITING_AT_BP`, broadcasts `breakpoint_hit`, and blocks until
    /// resumed or aborted. Returns `true` when the step should be aborted
    /// instead of dispatched.
    pub async fn check_breakpoint(&self, run_id: RunId, step_index: u32) -> EngineResult<bool> {
        let Some(session) = self.gateway.get_debug_session_for_run(run_id)? else {
            return Ok(false);
        };
        if session.status.is_terminal() || !session.has_breakpoint(step_index) {
            return Ok(false);
        }

        let notify = Arc::new(Notify::new());
        let decision = Arc::new(Mutex::new(None));
        self.waiters.lock().insert(session.id, Waiter { notify: notify.clone(), decision: decision.clone() });

        let session = self.gateway.update_debug_session(session.id, |s| {
            s.status = StateMachine::new(s.status).transition_to(DebugState::WaitingAtBreakpoint)?;
            s.current_step_index = Some(step_index);
            Ok(s.clone())
        })?;
        self.events.broadcast(Event::DebugEvent {
            session_id: session.id,
            status: session.status,
            kind: DebugEventKind::BreakpointHit,
        });

        notify.notified().await;
        self.waiters.lock().remove(&session.id);

        Ok(decision.lock().take() == Some(BreakpointDecision::Abort))
    }

    /// Validates the bearer token against the session's, requires
    /// `WAITING_AT_BP`, and transitions to `CONNECTED`.
    pub fn attach(&self, session_id: DebugSessionId, token: &str, mode: ConnectionMode) -> EngineResult<DebugSession> {
        self.gateway.update_debug_session(session_id, |s| {
            if !constant_time_eq(s.token.as_bytes(), token.as_bytes()) {
                return Err(EngineError::forbidden("invalid debug session token"));
            }
            if s.status != DebugState::WaitingAtBreakpoint {
                return Err(EngineError::conflict(format!("debug session {} is not waiting at a breakpoint", s.id)));
            }
            s.status = StateMachine::new(s.status).transition_to(DebugState::Connected)?;
            s.connection_mode = Some(mode);
            Ok(s.clone())
        })
    }

    /// Wakes a blocked `check_breakpoint` call with `Resume`. The session
    /// itself is left `CONNECTED`; the next breakpoint hit re-arms it.
    pub fn resume(&self, session_id: DebugSessionId) -> EngineResult<DebugSession> {
        self.wake(session_id, BreakpointDecision::Resume)?;
        let session = self.gateway.get_debug_session(session_id)?;
        self.events.broadcast(Event::DebugEvent { session_id, status: session.status, kind: DebugEventKind::Resumed });
        Ok(session)
    }

    /// Wakes a blocked `check_breakpoint` call with `Abort` and ends the
    /// session. The caller (run driver) owns cascading the cancellation to
    /// the pipeline run's in-flight step executions.
    pub fn abort(&self, session_id: DebugSessionId) -> EngineResult<DebugSession> {
        let _ = self.wake(session_id, BreakpointDecision::Abort);
        let session = self.gateway.update_debug_session(session_id, |s| {
            if !s.status.is_terminal() {
                s.status = StateMachine::new(s.status).transition_to(DebugState::Ended)?;
            }
            Ok(s.clone())
        })?;
        self.events.broadcast(Event::DebugEvent { session_id, status: session.status, kind: DebugEventKind::Aborted });
        Ok(session)
    }

    pub fn extend_timeout(&self, session_id: DebugSessionId, delta_seconds: u64) -> EngineResult<DebugSession> {
        let now = self.clock.epoch_ms();
        self.gateway.update_debug_session(session_id, |s| {
            s.extend(delta_seconds, now);
            Ok(s.clone())
        })
    }

    /// Background sweep: transitions expired, non-terminal sessions to
    /// `TIMEOUT` and wakes any blocked `check_breakpoint` call with `Abort`.
    /// The run driver cascades each returned session into a pipeline abort.
    pub fn sweep_expired(&self) -> Vec<DebugSession> {
        let now = self.clock.epoch_ms();
        let mut expired = Vec::new();
        for session in self.gateway.active_debug_sessions() {
            if session.expires_at_ms > now {
                continue;
            }
            let _ = self.wake(session.id, BreakpointDecision::Abort);
            let Ok(updated) = self.gateway.update_debug_session(session.id, |s| {
                s.status = StateMachine::new(s.status).transition_to(DebugState::Timeout)?;
                Ok(s.clone())
            }) else {
                continue;
            };
            self.events.broadcast(Event::DebugEvent { session_id: updated.id, status: updated.status, kind: DebugEventKind::TimedOut });
            expired.push(updated);
        }
        expired
    }

    fn wake(&self, session_id: DebugSessionId, decision: BreakpointDecision) -> EngineResult<()> {
        let waiters = self.waiters.lock();
        let waiter = waiters
            .get(&session_id)
            .ok_or_else(|| EngineError::not_found(format!("no blocked breakpoint for session {session_id}")))?;
        *waiter.decision.lock() = Some(decision);
        waiter.notify.notify_one();
        Ok(())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
#[path = "debug_service_tests.rs"]
mod tests;
