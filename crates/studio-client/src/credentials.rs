//! # Credentials
//!
//! Named credential records whose fields follow a server-defined schema per
//! credential type. Secret values never come back from the server in
//! plaintext; they arrive masked and are masked again for display.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::ApiClient;
use crate::error::{ClientError, Result};

/// Placeholder shown, and sent back, in place of a secret value.
pub const MASK: &str = "••••••••";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Password,
    Secret,
    Number,
    Boolean,
    Url,
    Select,
}

impl FieldKind {
    pub fn is_secret(&self) -> bool {
        matches!(self, FieldKind::Password | FieldKind::Secret)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredentialField {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
    /// Allowed values for `select` fields.
    #[serde(default)]
    pub options: Vec<String>,
}

/// Schema of one credential type, e.g. an API key or an OAuth client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredentialType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<CredentialField>,
}

impl CredentialType {
    pub fn field(&self, name: &str) -> Option<&CredentialField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Checks `data` against the schema.
    ///
    /// Required fields must be present and non-empty, typed fields must hold
    /// the matching JSON type, and fields outside the schema are rejected. A
    /// masked secret counts as present, meaning "keep the stored value".
    pub fn validate(&self, data: &Map<String, Value>) -> Result<()> {
        if let Some(unknown) = data.keys().find(|k| self.field(k).is_none()) {
            return Err(ClientError::Validation(format!(
                "{}: unknown field `{unknown}`",
                self.name
            )));
        }

        for field in &self.fields {
            let value = data.get(&field.name).filter(|v| !is_blank(v));
            let Some(value) = value else {
                if field.required {
                    return Err(ClientError::Validation(format!(
                        "{}: `{}` is required",
                        self.name, field.name
                    )));
                }
                continue;
            };

            let ok = match field.kind {
                FieldKind::Number => value.is_number(),
                FieldKind::Boolean => value.is_boolean(),
                FieldKind::Url => value
                    .as_str()
                    .is_some_and(|s| url::Url::parse(s).is_ok()),
                FieldKind::Select => value.as_str().is_some_and(|s| {
                    field.options.is_empty() || field.options.iter().any(|o| o == s)
                }),
                FieldKind::Text | FieldKind::Password | FieldKind::Secret => value.is_string(),
            };
            if !ok {
                return Err(ClientError::Validation(format!(
                    "{}: `{}` is not a valid {:?} value",
                    self.name, field.name, field.kind
                )));
            }
        }
        Ok(())
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Id of the [`CredentialType`].
    #[serde(rename = "type")]
    pub credential_type: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(name: impl Into<String>, credential_type: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            credential_type: credential_type.into(),
            data: Map::new(),
            created_at: None,
        }
    }

    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(field.into(), value.into());
        self
    }

    /// The data with every non-empty secret field replaced by [`MASK`].
    pub fn masked_fields(&self, schema: &CredentialType) -> Map<String, Value> {
        self.data
            .iter()
            .map(|(name, value)| {
                let secret = schema.field(name).is_some_and(|f| f.kind.is_secret());
                if secret && !is_blank(value) {
                    (name.clone(), Value::String(MASK.to_string()))
                } else {
                    (name.clone(), value.clone())
                }
            })
            .collect()
    }

    /// A copy without fields still holding [`MASK`], so an update leaves those
    /// secrets unchanged on the server.
    pub fn without_masked_values(&self) -> Self {
        let mut copy = self.clone();
        copy.data.retain(|_, v| v.as_str() != Some(MASK));
        copy
    }
}

impl ApiClient {
    pub async fn credential_types(&self) -> Result<Vec<CredentialType>> {
        self.get_json(&["credentials", "types"]).await
    }

    pub async fn list_credentials(&self) -> Result<Vec<Credential>> {
        self.get_json(&["credentials"]).await
    }

    /// Validates against `schema` and stores a new credential.
    pub async fn create_credential(
        &self,
        schema: &CredentialType,
        credential: &Credential,
    ) -> Result<Credential> {
        check_type(schema, credential)?;
        schema.validate(&credential.data)?;

        let created: Credential = self
            .send_json(Method::POST, &["credentials"], credential)
            .await?;
        tracing::info!(
            credential_id = ?created.id,
            kind = %created.credential_type,
            "Created credential"
        );
        Ok(created)
    }

    /// Validates and updates a stored credential. Masked secrets are left untouched.
    pub async fn update_credential(
        &self,
        schema: &CredentialType,
        credential: &Credential,
    ) -> Result<Credential> {
        check_type(schema, credential)?;
        let id = credential
            .id
            .as_deref()
            .ok_or_else(|| ClientError::Validation("credential has no id".into()))?;
        schema.validate(&credential.data)?;

        let payload = credential.without_masked_values();
        self.send_json(Method::PUT, &["credentials", id], &payload).await
    }

    pub async fn delete_credential(&self, id: &str) -> Result<()> {
        self.delete(&["credentials", id]).await?;
        tracing::info!(credential_id = %id, "Deleted credential");
        Ok(())
    }
}

fn check_type(schema: &CredentialType, credential: &Credential) -> Result<()> {
    if schema.id != credential.credential_type {
        return Err(ClientError::Validation(format!(
            "credential is of type `{}`, not `{}`",
            credential.credential_type, schema.id
        )));
    }
    Ok(())
}
