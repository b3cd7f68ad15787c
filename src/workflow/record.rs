// src/workflow/record.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Created,
    Running,
    Completed,
    Failed,
}

impl WorkflowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed)
    }

    /// created → running → {completed | failed}; nothing else.
    fn can_move_to(self, next: WorkflowStatus) -> bool {
        matches!(
            (self, next),
            (WorkflowStatus::Created, WorkflowStatus::Running)
                | (WorkflowStatus::Running, WorkflowStatus::Running)
                | (WorkflowStatus::Running, WorkflowStatus::Completed)
                | (WorkflowStatus::Running, WorkflowStatus::Failed)
        )
    }
}

/// Snapshot served by `GET /workflow/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRecord {
    pub workflow_id: String,
    pub kind: String,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub progress: f64,
    pub details: Value,
}

impl WorkflowRecord {
    pub fn new(workflow_id: String, kind: &str) -> Self {
        let now = Utc::now();
        Self {
            workflow_id,
            kind: kind.to_string(),
            status: WorkflowStatus::Created,
            created_at: now,
            updated_at: now,
            progress: 0.0,
            details: Value::Object(Default::default()),
        }
    }

    fn transition(&mut self, next: WorkflowStatus, progress: f64) -> bool {
        if !self.status.can_move_to(next) {
            tracing::warn!(
                workflow_id = %self.workflow_id,
                from = ?self.status,
                to = ?next,
                "illegal workflow transition ignored"
            );
            return false;
        }
        self.status = next;
        // Progress never goes backwards.
        self.progress = self.progress.max(progress.clamp(0.0, 1.0));
        self.updated_at = Utc::now();
        true
    }

    pub fn start(&mut self) -> bool {
        self.transition(WorkflowStatus::Running, 0.0)
    }

    /// Record a finished stage while running.
    pub fn advance(&mut self, progress: f64, stage: &str, output: Value) -> bool {
        if !self.transition(WorkflowStatus::Running, progress) {
            return false;
        }
        if let Value::Object(m) = &mut self.details {
            m.insert(stage.to_string(), output);
        }
        true
    }

    pub fn complete(&mut self) -> bool {
        self.transition(WorkflowStatus::Completed, 1.0)
    }

    pub fn fail(&mut self, stage: &str, message: &str) -> bool {
        if !self.transition(WorkflowStatus::Failed, 1.0) {
            return false;
        }
        if let Value::Object(m) = &mut self.details {
            m.insert("status".into(), Value::String("error".into()));
            m.insert("stage".into(), Value::String(stage.to_string()));
            m.insert("message".into(), Value::String(message.to_string()));
        }
        true
    }
}
