//! [`queue::JobProcessor`] implementations bridging the durable queue to
//! the in-memory [`engine::FlowExecutor`].
//!
//! The flow-queue processor is authoritative: claiming a `FlowJob` builds
//! and runs a real executor. The node-queue exists for the two-queue
//! operational surface `spec.md` describes (separate pause/resume/counts
//! per queue kind) but dispatch of an individual node is not re-derived
//! from the queue here — `FlowExecutor` owns that in-process, since it is
//! the sole owner of its `ExecutionState` (spec invariant on ownership).
//! The node-queue processor therefore just completes immediately; nothing
//! in this build enqueues a real `NodeJob` onto it.

use std::sync::Arc;

use async_trait::async_trait;
use db::models::JobRow;
use engine::{FlowExecutor, FlowExecutorConfig};
use queue::{FlowJob, JobProcessor};
use tracing::{error, info};

use crate::state::AppState;

pub struct FlowJobProcessor {
    pub state: AppState,
}

#[async_trait]
impl JobProcessor for FlowJobProcessor {
    async fn process(&self, job: JobRow) -> Result<(), String> {
        let flow_job: FlowJob = serde_json::from_value(job.payload).map_err(|e| e.to_string())?;

        let mut flow: engine::Flow = serde_json::from_value(flow_job.flow.clone()).map_err(|e| e.to_string())?;
        flow.flow_id = flow_job.flow_id;

        let executor = FlowExecutor::new(
            flow,
            (*self.state.agents).clone(),
            self.state.supervisor.clone(),
            self.state.registry.clone(),
            self.state.events.clone(),
            FlowExecutorConfig::default(),
        )
        .map_err(|e| e.to_string())?;

        db::repository::executions::create_execution(
            &self.state.pool,
            executor.execution_id(),
            flow_job.project_id,
            flow_job.workflow_id,
            flow_job.flow.clone(),
        )
        .await
        .map_err(|e| e.to_string())?;

        self.state.executors.insert(executor.clone()).await;
        info!(execution_id = %executor.execution_id(), flow_id = %executor.flow_id(), "flow run starting");

        let result = executor.execute().await;
        self.state.executors.remove(executor.execution_id()).await;

        match &result {
            Ok(final_state) => {
                let status = format!("{:?}", final_state.status).to_lowercase();
                if let Err(e) =
                    db::repository::executions::update_execution_status(&self.state.pool, executor.execution_id(), &status, true).await
                {
                    error!(execution_id = %executor.execution_id(), error = %e, "failed to persist final execution status");
                }
            }
            Err(e) => {
                if let Err(persist_err) =
                    db::repository::executions::update_execution_status(&self.state.pool, executor.execution_id(), "failed", true).await
                {
                    error!(execution_id = %executor.execution_id(), error = %persist_err, "failed to persist failed execution status");
                }
                return Err(e.to_string());
            }
        }

        Ok(())
    }
}

/// Completes every node-queue job immediately. See the module doc: node
/// dispatch is driven entirely in-process by `FlowExecutor`, not replayed
/// from this queue.
pub struct NodeJobProcessor;

#[async_trait]
impl JobProcessor for NodeJobProcessor {
    async fn process(&self, _job: JobRow) -> Result<(), String> {
        Ok(())
    }
}
