//! # Workflow Store
//!
//! The persistence seam used by the auto-saver. The API client is the real
//! implementation; [`InMemoryWorkflowStore`] backs tests and offline demos.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use studio_canvas::WorkflowDocument;
use tokio::sync::Mutex;

use crate::api::{ApiClient, WorkflowSummary};
use crate::error::{ClientError, Result};

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Stores a new workflow and returns its id.
    async fn create(&self, document: &WorkflowDocument) -> Result<String>;
    async fn update(&self, id: &str, document: &WorkflowDocument) -> Result<()>;
    async fn get(&self, id: &str) -> Result<WorkflowDocument>;
    async fn list(&self) -> Result<Vec<WorkflowSummary>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

#[async_trait]
impl WorkflowStore for ApiClient {
    async fn create(&self, document: &WorkflowDocument) -> Result<String> {
        let created = self.create_workflow(document).await?;
        created
            .id
            .ok_or_else(|| ClientError::Validation("server did not return a workflow id".into()))
    }

    async fn update(&self, id: &str, document: &WorkflowDocument) -> Result<()> {
        self.update_workflow(id, document).await.map(|_| ())
    }

    async fn get(&self, id: &str) -> Result<WorkflowDocument> {
        self.get_workflow(id).await
    }

    async fn list(&self) -> Result<Vec<WorkflowSummary>> {
        self.list_workflows().await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.delete_workflow(id).await
    }
}

/// Loads `id` and stores a copy of it as a new workflow.
///
/// The copy is named `name`, or "Copy of <original>" when `name` is `None`.
/// Returns the stored copy with its new id.
pub async fn fork(
    store: &dyn WorkflowStore,
    id: &str,
    name: Option<&str>,
) -> Result<WorkflowDocument> {
    let original = store.get(id).await?;
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| format!("Copy of {}", original.name));

    let mut copy = original.fork(name);
    let new_id = store.create(&copy).await?;
    tracing::info!(source_id = %id, workflow_id = %new_id, "Forked workflow");
    copy.id = Some(new_id);
    Ok(copy)
}

/// Workflow store kept in memory.
///
/// Counts writes and can be switched into a failing mode to exercise error paths.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    documents: Mutex<BTreeMap<String, WorkflowDocument>>,
    creates: AtomicUsize,
    updates: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every write fails with a 503 status error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub async fn document(&self, id: &str) -> Option<WorkflowDocument> {
        self.documents.lock().await.get(id).cloned()
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::Status {
                status: 503,
                body: "store unavailable".into(),
            });
        }
        Ok(())
    }

    fn not_found(id: &str) -> ClientError {
        ClientError::Status {
            status: 404,
            body: format!("workflow {id} not found"),
        }
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn create(&self, document: &WorkflowDocument) -> Result<String> {
        self.check_available()?;
        let id = format!("wf_{}", uuid::Uuid::new_v4().simple());

        let mut stored = document.clone();
        stored.id = Some(id.clone());
        self.documents.lock().await.insert(id.clone(), stored);
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn update(&self, id: &str, document: &WorkflowDocument) -> Result<()> {
        self.check_available()?;
        let mut documents = self.documents.lock().await;
        let slot = documents.get_mut(id).ok_or_else(|| Self::not_found(id))?;

        *slot = document.clone();
        slot.id = Some(id.to_string());
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<WorkflowDocument> {
        self.document(id).await.ok_or_else(|| Self::not_found(id))
    }

    async fn list(&self) -> Result<Vec<WorkflowSummary>> {
        let now = Utc::now();
        Ok(self
            .documents
            .lock()
            .await
            .iter()
            .map(|(id, doc)| WorkflowSummary {
                id: id.clone(),
                name: doc.name.clone(),
                description: doc.description.clone(),
                updated_at: Some(now),
            })
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.check_available()?;
        self.documents
            .lock()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }
}
