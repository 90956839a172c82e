//! # Studio Client
//!
//! The network side of the workflow studio: a typed client for the backend
//! API and the flows built on it.
//!
//! - [`api`]: workflows and the node catalog.
//! - [`autosave`]: debounced write-behind of the editor's document.
//! - [`builder`]: the AI builder chat and its SSE stream.
//! - [`settings`], [`credentials`], [`files`]: the remaining endpoints.

pub mod api;
pub mod autosave;
pub mod builder;
pub mod config;
pub mod credentials;
pub mod error;
pub mod files;
pub mod settings;
pub mod store;

pub use api::{ApiClient, WorkflowSummary};
pub use autosave::{AutoSaver, SaveStatus};
pub use builder::{Artifact, BuilderEvent, Conversation, Phase, run_turn};
pub use config::ClientConfig;
pub use error::ClientError;
pub use store::{InMemoryWorkflowStore, WorkflowStore, fork};
