//! # Builder Chat
//!
//! The AI builder conversation: a chat whose assistant replies stream in over
//! SSE and may end with a generated node or workflow draft.
//!
//! ## Phases
//! - `Idle`: ready for a message.
//! - `Streaming`: a reply is arriving; tokens append to the last assistant message.
//! - `Generated`: the reply produced an artifact the host can review and apply.
//!
//! Sending is only refused while a stream is open. Cancelling keeps the
//! partial reply unless it is too short to be useful.

use chrono::{DateTime, Utc};
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use reqwest::Method;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use studio_canvas::WorkflowDocument;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::config::{ClientConfig, DEFAULT_MAX_ATTACHMENTS};
use crate::error::{ClientError, Result};

/// Assistant replies with fewer non-whitespace characters than this are dropped on cancel.
const MIN_KEPT_REPLY_CHARS: usize = 3;

/// Payloads carried in the `data` field of builder stream frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuilderEvent {
    Token {
        content: String,
    },
    Status {
        message: String,
    },
    GenerationComplete {
        #[serde(default)]
        node: Option<Value>,
    },
    WorkflowDraft {
        workflow: Value,
    },
    Error {
        message: String,
    },
    Done,
}

impl BuilderEvent {
    /// Decodes one stream event, skipping anything malformed.
    ///
    /// The `type` comes from the JSON payload, or from the SSE event name when
    /// the payload has none. A bare `[DONE]` payload means `Done`.
    pub fn decode(event_name: Option<&str>, data: &str) -> Option<Self> {
        let data = data.trim();
        if data == "[DONE]" {
            return Some(BuilderEvent::Done);
        }

        let mut value: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, data = %data, "Skipping malformed builder event");
                return None;
            }
        };

        let Some(object) = value.as_object_mut() else {
            warn!(data = %data, "Skipping builder event that is not an object");
            return None;
        };
        if !object.get("type").is_some_and(Value::is_string) {
            match event_name {
                Some(name) => {
                    object.insert("type".into(), Value::String(name.to_string()));
                }
                None => {
                    warn!(data = %data, "Skipping builder event without a type");
                    return None;
                }
            }
        }

        match serde_json::from_value(value) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "Skipping unrecognised builder event");
                None
            }
        }
    }

    fn from_sse(event: &Event) -> Option<Self> {
        // The SSE default event name carries no type information.
        let name = Some(event.event.as_str()).filter(|n| !n.is_empty() && *n != "message");
        Self::decode(name, &event.data)
    }
}

/// What a finished generation produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Artifact {
    Node(Value),
    Workflow(Value),
}

impl Artifact {
    /// Reads a workflow draft as a canvas document.
    pub fn workflow_document(&self) -> Option<WorkflowDocument> {
        match self {
            Artifact::Workflow(value) => serde_json::from_value(value.clone())
                .inspect_err(|e| warn!(error = %e, "Workflow draft is not a valid document"))
                .ok(),
            Artifact::Node(_) => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Phase {
    #[default]
    Idle,
    Streaming,
    Generated {
        artifact: Option<Artifact>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Ids of uploaded files.
    #[serde(default)]
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>, attachments: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            attachments,
            created_at: Utc::now(),
        }
    }
}

/// Client-side state of one builder conversation.
#[derive(Clone, Debug)]
pub struct Conversation {
    /// Backend id, assigned when the conversation is first used.
    pub id: Option<String>,
    messages: Vec<ChatMessage>,
    phase: Phase,
    stream_open: bool,
    status: Option<String>,
    last_error: Option<String>,
    max_attachments: usize,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTACHMENTS)
    }
}

impl Conversation {
    pub fn new(max_attachments: usize) -> Self {
        Self {
            id: None,
            messages: Vec::new(),
            phase: Phase::Idle,
            stream_open: false,
            status: None,
            last_error: None,
            max_attachments,
        }
    }

    /// A conversation that enforces the configured attachment limit.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.max_attachments)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// True while a reply is streaming in.
    pub fn is_streaming(&self) -> bool {
        self.stream_open
    }

    /// Latest progress message from the server.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.phase {
            Phase::Generated { artifact } => artifact.as_ref(),
            _ => None,
        }
    }

    /// Appends the user message and an empty assistant reply, and opens the stream.
    pub fn begin_send(&mut self, text: &str, attachments: Vec<String>) -> Result<()> {
        if text.trim().is_empty() {
            return Err(ClientError::Validation("message is empty".into()));
        }
        if attachments.len() > self.max_attachments {
            return Err(ClientError::TooManyAttachments {
                count: attachments.len(),
                max: self.max_attachments,
            });
        }
        if self.stream_open {
            return Err(ClientError::ConversationBusy);
        }

        self.messages.push(ChatMessage::new(Role::User, text, attachments));
        self.messages.push(ChatMessage::new(Role::Assistant, "", Vec::new()));
        self.phase = Phase::Streaming;
        self.stream_open = true;
        self.status = None;
        self.last_error = None;
        Ok(())
    }

    /// Applies one stream event. Returns false when no stream is open.
    pub fn apply(&mut self, event: BuilderEvent) -> bool {
        if !self.stream_open {
            debug!(?event, "Ignoring builder event outside a stream");
            return false;
        }

        match event {
            BuilderEvent::Token { content } => {
                if let Some(reply) = self.reply_mut() {
                    reply.content.push_str(&content);
                }
            }
            BuilderEvent::Status { message } => self.status = Some(message),
            BuilderEvent::GenerationComplete { node } => {
                self.phase = Phase::Generated {
                    artifact: node.map(Artifact::Node),
                };
            }
            BuilderEvent::WorkflowDraft { workflow } => {
                self.phase = Phase::Generated {
                    artifact: Some(Artifact::Workflow(workflow)),
                };
            }
            BuilderEvent::Error { message } => self.fail(message),
            BuilderEvent::Done => self.finish_stream(),
        }
        true
    }

    /// Closes the stream as if `done` had arrived.
    pub fn finish_stream(&mut self) {
        self.stream_open = false;
        self.status = None;
        if self.phase == Phase::Streaming {
            self.phase = Phase::Idle;
        }
    }

    /// Records a failure and returns to `Idle`. An empty reply is removed.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(conversation_id = ?self.id, error = %message, "Builder reply failed");
        self.stream_open = false;
        self.status = None;
        self.phase = Phase::Idle;
        self.last_error = Some(message);
        self.drop_reply_if_shorter_than(1);
    }

    /// Stops applying events. Returns false when no stream was open.
    pub fn cancel(&mut self) -> bool {
        if !self.stream_open {
            return false;
        }
        self.stream_open = false;
        self.status = None;
        if self.phase == Phase::Streaming {
            self.phase = Phase::Idle;
        }
        self.drop_reply_if_shorter_than(MIN_KEPT_REPLY_CHARS);
        info!(conversation_id = ?self.id, "Builder reply cancelled");
        true
    }

    fn reply_mut(&mut self) -> Option<&mut ChatMessage> {
        self.messages
            .last_mut()
            .filter(|m| m.role == Role::Assistant)
    }

    fn drop_reply_if_shorter_than(&mut self, min_chars: usize) {
        let too_short = self.reply_mut().is_some_and(|reply| {
            reply.content.chars().filter(|c| !c.is_whitespace()).count() < min_chars
        });
        if too_short {
            self.messages.pop();
        }
    }
}

/// A conversation as listed by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct NewConversation<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    content: &'a str,
    attachments: &'a [String],
}

impl ApiClient {
    pub async fn create_conversation(&self, title: Option<&str>) -> Result<ConversationSummary> {
        self.send_json(
            Method::POST,
            &["builder", "conversations"],
            &NewConversation { title },
        )
        .await
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.get_json(&["builder", "conversations"]).await
    }

    pub async fn delete_conversation(&self, id: &str) -> Result<()> {
        self.delete(&["builder", "conversations", id]).await
    }

    /// Posts a message and returns the reply as a stream of builder events.
    pub async fn stream_message(
        &self,
        conversation_id: &str,
        content: &str,
        attachments: &[String],
    ) -> Result<impl Stream<Item = Result<BuilderEvent>>> {
        let request = self
            .request(
                Method::POST,
                &["builder", "conversations", conversation_id, "messages"],
            )?
            .header(ACCEPT, "text/event-stream")
            .json(&OutgoingMessage {
                content,
                attachments,
            });
        let response = Self::send(request).await?;

        Ok(async_stream::try_stream! {
            let events = response.bytes_stream().eventsource();
            futures::pin_mut!(events);
            while let Some(event) = events.next().await {
                let event = event.map_err(stream_error)?;
                if let Some(event) = BuilderEvent::from_sse(&event) {
                    yield event;
                }
            }
        })
    }
}

fn stream_error(e: EventStreamError<reqwest::Error>) -> ClientError {
    match e {
        EventStreamError::Transport(e) => ClientError::Http(e),
        other => ClientError::EventStream(other.to_string()),
    }
}

/// Sends `text` and applies the streamed reply to `conversation`.
///
/// Creates the backend conversation on first use. A message on `cancel_rx`
/// aborts the request and cancels the reply; dropping the sender does not.
pub async fn run_turn(
    client: &ApiClient,
    conversation: &mut Conversation,
    text: &str,
    attachments: Vec<String>,
    mut cancel_rx: mpsc::Receiver<()>,
) -> Result<()> {
    conversation.begin_send(text, attachments.clone())?;

    let outcome = tokio::select! {
        result = stream_reply(client, conversation, text, &attachments) => result,
        Some(()) = cancel_rx.recv() => Err(ClientError::Cancelled),
    };

    match outcome {
        Ok(()) => Ok(()),
        Err(ClientError::Cancelled) => {
            conversation.cancel();
            Err(ClientError::Cancelled)
        }
        Err(e) => {
            if conversation.is_streaming() {
                conversation.fail(e.to_string());
            }
            Err(e)
        }
    }
}

async fn stream_reply(
    client: &ApiClient,
    conversation: &mut Conversation,
    text: &str,
    attachments: &[String],
) -> Result<()> {
    let conversation_id = match conversation.id.clone() {
        Some(id) => id,
        None => {
            let created = client.create_conversation(None).await?;
            info!(conversation_id = %created.id, "Created builder conversation");
            conversation.id = Some(created.id.clone());
            created.id
        }
    };

    let events = client
        .stream_message(&conversation_id, text, attachments)
        .await?;
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        conversation.apply(event?);
        if !conversation.is_streaming() {
            return Ok(());
        }
    }

    // The server closed the stream without `done`.
    conversation.finish_stream();
    Ok(())
}
