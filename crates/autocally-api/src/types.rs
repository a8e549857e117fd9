//! Request bodies and the few response shapes the client relies on.
//!
//! Entity payloads (assistants, phone numbers, knowledge bases, calls) are
//! passed through as [`serde_json::Value`]; the client only maps them.

use serde::{Deserialize, Serialize};

/// `POST /security/login`. `username` accepts a username or an email.
#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest {
    /// Username or email.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Successful login.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent calls.
    pub token: String,
    /// Canonical username.
    pub user: String,
}

/// `POST /security/create_user`.
#[derive(Clone, Debug, Serialize)]
pub struct CreateUserRequest {
    /// 3 to 150 characters.
    pub username: String,
    /// 6 to 50 characters.
    pub password: String,
    /// Email address.
    pub email: String,
}

/// Account created.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreateUserResponse {
    /// Confirmation message.
    pub message: String,
    /// New user id.
    pub user_id: i64,
}

/// `GET /security/health`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `ok` when the service is up.
    pub status: String,
    /// Human-readable detail.
    #[serde(default)]
    pub message: String,
}

/// Generic `{"message": ...}` reply.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    /// Message text.
    pub message: String,
}

/// Fields accepted by assistant create and update. Unset fields are omitted.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AssistantFields {
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// System prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// First sentence spoken on a call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greeting_message: Option<String>,
    /// Text-to-speech voice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cartesia_voice_id: Option<String>,
    /// Attached phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number_id: Option<String>,
    /// LLM model name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_temperature: Option<f64>,
    /// Completion length cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_max_tokens: Option<u32>,
}

/// Twilio credentials for importing a number.
#[derive(Clone, Debug, Serialize)]
pub struct TwilioImport {
    /// Twilio account SID.
    pub account_sid: String,
    /// Twilio auth token.
    pub auth_token: String,
    /// E.164 phone number.
    pub phone_number: String,
}

/// Phone number update. Unset fields are omitted.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PhoneNumberUpdate {
    /// E.164 phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Twilio account SID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_sid: Option<String>,
    /// Twilio auth token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Verification flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
}

/// New knowledge base.
#[derive(Clone, Debug, Serialize)]
pub struct NewKnowledgeBase {
    /// Name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Assistants using it.
    pub assistant_ids: Vec<String>,
}

/// Knowledge base rename or re-description.
#[derive(Clone, Debug, Default, Serialize)]
pub struct KnowledgeBaseUpdate {
    /// Name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Text document written directly into a knowledge base.
#[derive(Clone, Debug, Serialize)]
pub struct TextDocument {
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Edit to a text document. Unset fields are omitted.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TextDocumentUpdate {
    /// Title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A file to upload into a knowledge base.
#[derive(Clone, Debug)]
pub struct FileUpload {
    /// File name sent in the multipart part.
    pub file_name: String,
    /// MIME type; `application/octet-stream` when unset.
    pub mime_type: Option<String>,
    /// File contents.
    pub contents: Vec<u8>,
    /// Optional description field.
    pub description: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
