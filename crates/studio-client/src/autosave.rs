//! # Auto-Save
//!
//! Debounced write-behind of the editor's document to a [`WorkflowStore`].
//!
//! The editor calls [`AutoSaver::notify`] after every change. Changes arriving
//! within the debounce window coalesce and only the latest document is sent.
//! The first save creates the workflow and records its id; later saves update
//! it. Failed saves are logged and leave the status dirty; there is no retry
//! until the next change or an explicit [`AutoSaver::flush`].

use std::sync::Arc;
use studio_canvas::WorkflowDocument;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::store::WorkflowStore;

/// Observable state of the auto-saver.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SaveStatus {
    /// There are edits the backend has not acknowledged.
    pub dirty: bool,
    /// Backend id, once the workflow exists there.
    pub workflow_id: Option<String>,
    pub last_error: Option<String>,
    pub saves_completed: u64,
}

enum Command {
    Notify(WorkflowDocument),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

pub struct AutoSaver {
    tx: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
    task: JoinHandle<()>,
}

impl AutoSaver {
    /// Starts the save task. `initial_id` is the backend id of an already stored workflow.
    pub fn spawn(
        store: Arc<dyn WorkflowStore>,
        config: &ClientConfig,
        initial_id: Option<String>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus {
            workflow_id: initial_id.clone(),
            ..SaveStatus::default()
        });

        let worker = SaveWorker {
            store,
            debounce: config.autosave_debounce(),
            workflow_id: initial_id,
            status: status_tx,
        };
        let task = tokio::spawn(worker.run(rx));

        Self { tx, status, task }
    }

    /// Queues `document` for saving and restarts the debounce window.
    pub fn notify(&self, document: WorkflowDocument) {
        if self.tx.send(Command::Notify(document)).is_err() {
            warn!("Auto-save task has stopped; dropping change");
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// A receiver that observes every status change.
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Saves the pending document now instead of waiting for the window to close.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).is_err() {
            warn!("Auto-save task has stopped; nothing to flush");
            return;
        }
        let _ = ack_rx.await;
    }

    /// Flushes and stops the task.
    pub async fn shutdown(self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
        if let Err(e) = self.task.await {
            error!(error = %e, "Auto-save task ended abnormally");
        }
    }
}

struct SaveWorker {
    store: Arc<dyn WorkflowStore>,
    debounce: Duration,
    workflow_id: Option<String>,
    status: watch::Sender<SaveStatus>,
}

impl SaveWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let mut pending: Option<WorkflowDocument> = None;
        let mut deadline: Option<Instant> = None;

        loop {
            let wake_at = deadline;
            let window = async move {
                match wake_at {
                    Some(at) => time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Notify(document)) => {
                        pending = Some(document);
                        deadline = Some(Instant::now() + self.debounce);
                        self.status.send_if_modified(|s| !std::mem::replace(&mut s.dirty, true));
                    }
                    Some(Command::Flush(ack)) => {
                        deadline = None;
                        if let Some(document) = pending.take() {
                            pending = self.save(document).await;
                        }
                        let _ = ack.send(());
                    }
                    Some(Command::Shutdown(ack)) => {
                        if let Some(document) = pending.take() {
                            self.save(document).await;
                        }
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        if let Some(document) = pending.take() {
                            self.save(document).await;
                        }
                        break;
                    }
                },
                () = window => {
                    deadline = None;
                    if let Some(document) = pending.take() {
                        pending = self.save(document).await;
                    }
                }
            }
        }
        debug!("Auto-save task stopped");
    }

    /// Creates or updates the workflow. Hands the document back on failure so
    /// an explicit flush can retry it.
    async fn save(&mut self, mut document: WorkflowDocument) -> Option<WorkflowDocument> {
        document.id = self.workflow_id.clone();

        let result = match self.workflow_id.as_deref() {
            Some(id) => self.store.update(id, &document).await.map(|()| id.to_string()),
            None => self.store.create(&document).await,
        };

        match result {
            Ok(id) => {
                info!(
                    workflow_id = %id,
                    created = self.workflow_id.is_none(),
                    nodes = document.nodes.len(),
                    "Workflow saved"
                );
                self.workflow_id = Some(id.clone());
                self.status.send_modify(|s| {
                    s.dirty = false;
                    s.workflow_id = Some(id);
                    s.last_error = None;
                    s.saves_completed += 1;
                });
                None
            }
            Err(e) => {
                error!(workflow_id = ?self.workflow_id, error = %e, "Auto-save failed");
                let message = e.to_string();
                self.status.send_modify(|s| s.last_error = Some(message));
                Some(document)
            }
        }
    }
}
