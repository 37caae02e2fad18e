// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory pipeline definition store. `Pipeline` is owned by the external
//! CRUD layer per `lazyaf-core`'s own doc comment on the type; this
//! single-binary deployment has no separate CRUD service, so the daemon
//! holds the registered definitions itself, the same way `RepositoryResolver`
//! stands in for a repository-registry lookup.

use std::collections::HashMap;
use std::sync::Arc;

use lazyaf_core::{EngineError, EngineResult, Pipeline, PipelineId};
use parking_lot::Mutex;

#[derive(Default, Clone)]
pub struct PipelineRegistry {
    pipelines: Arc<Mutex<HashMap<PipelineId, Pipeline>>>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the DAG before accepting it; replaces any prior definition
    /// under the same id.
    pub fn register(&self, pipeline: Pipeline) -> EngineResult<Pipeline> {
        pipeline.validate()?;
        self.pipelines.lock().insert(pipeline.id, pipeline.clone());
        Ok(pipeline)
    }

    pub fn get(&self, id: PipelineId) -> EngineResult<Pipeline> {
        self.pipelines
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("pipeline {id} not registered")))
    }

    pub fn remove(&self, id: PipelineId) -> Option<Pipeline> {
        self.pipelines.lock().remove(&id)
    }

    pub fn list(&self) -> Vec<Pipeline> {
        self.pipelines.lock().values().cloned().collect()
    }
}

#[cfg(test)]
#[path = "pipeline_registry_tests.rs"]
mod tests;
