// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes for every entity in the data model. All built on
//! [`crate::define_id!`]; see `id.rs` for the prefixed-nanoid representation.

crate::define_id! {
    /// A repository known to the external CRUD layer; the engine only reads it.
    pub struct RepositoryId("rep-");
}

crate::define_id! {
    /// A pipeline definition (DAG of steps).
    pub struct PipelineId("pln-");
}

crate::define_id! {
    /// One run of a pipeline.
    pub struct RunId("run-");
}

crate::define_id! {
    /// One step instance within a pipeline run.
    pub struct StepRunId("srn-");
}

crate::define_id! {
    /// A stable identifier for a step *definition* within a pipeline (not an instance).
    pub struct StepId("stp-");
}

crate::define_id! {
    /// One attempt of a StepRun.
    pub struct ExecutionId("exe-");
}

crate::define_id! {
    /// A workspace volume shared by all steps of one pipeline run.
    pub struct WorkspaceId("wks-");
}

crate::define_id! {
    /// A WebSocket-connected remote runner.
    pub struct RunnerId("rnr-");
}

crate::define_id! {
    /// A debug/breakpoint session attached to a pipeline run.
    pub struct DebugSessionId("dbg-");
}
