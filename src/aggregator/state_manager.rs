use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::models::{SearchQuery, SourceKind};

pub type StatusSender = broadcast::Sender<SourceRunStatus>;
pub type StatusReceiver = broadcast::Receiver<SourceRunStatus>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Completed,
    Failed,
}

/// Outcome of the most recent search against one source
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRunStatus {
    pub run_id: Uuid,
    pub source: SourceKind,
    pub state: RunState,
    pub job_query: String,
    pub location_query: String,
    pub count: usize,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

#[derive(Clone)]
pub struct ScrapeStateManager {
    states: Arc<RwLock<HashMap<SourceKind, SourceRunStatus>>>,
    status_tx: StatusSender,
}

impl ScrapeStateManager {
    pub fn new() -> Self {
        let (status_tx, _) = broadcast::channel(256);
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
            status_tx,
        }
    }

    pub fn subscribe(&self) -> StatusReceiver {
        self.status_tx.subscribe()
    }

    /// Record a new run as the latest for `source` and return its id
    pub async fn start_run(&self, source: SourceKind, query: &SearchQuery) -> Uuid {
        let run_id = Uuid::new_v4();
        let status = SourceRunStatus {
            run_id,
            source,
            state: RunState::Running,
            job_query: query.job_query.clone(),
            location_query: query.location_query.clone(),
            count: 0,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
        };

        {
            let mut states = self.states.write().await;
            states.insert(source, status.clone());
        }

        let _ = self.status_tx.send(status);
        run_id
    }

    pub async fn complete_run(&self, source: SourceKind, run_id: Uuid, count: usize) {
        self.finish(source, run_id, RunState::Completed, count, None).await;
    }

    pub async fn fail_run(&self, source: SourceKind, run_id: Uuid, error: String) {
        self.finish(source, run_id, RunState::Failed, 0, Some(error)).await;
    }

    /// A run that has since been superseded by a newer one leaves the entry alone
    async fn finish(&self, source: SourceKind, run_id: Uuid, state: RunState, count: usize, error: Option<String>) {
        let updated = {
            let mut states = self.states.write().await;
            states.get_mut(&source).filter(|status| status.run_id == run_id).map(|status| {
                let now = Utc::now();
                status.state = state;
                status.count = count;
                status.error = error;
                status.completed_at = Some(now);
                status.duration_ms = Some((now - status.started_at).num_milliseconds());
                status.clone()
            })
        };

        if let Some(status) = updated {
            let _ = self.status_tx.send(status);
        }
    }

    pub async fn get_status(&self, source: SourceKind) -> Option<SourceRunStatus> {
        let states = self.states.read().await;
        states.get(&source).cloned()
    }

    /// Last run of every source that has been searched, in source order
    pub async fn get_all_status(&self) -> Vec<SourceRunStatus> {
        let states = self.states.read().await;
        let mut all: Vec<_> = states.values().cloned().collect();
        all.sort_by_key(|status| status.source);
        all
    }
}

impl Default for ScrapeStateManager {
    fn default() -> Self {
        Self::new()
    }
}
