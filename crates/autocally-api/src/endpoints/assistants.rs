//! `/assistants`: voice assistant configuration and chat.

use std::fmt::Display;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::Method;
use serde_json::{Value, json};

use crate::client::ApiClient;
use crate::errors::{ApiError, Result};
use crate::types::AssistantFields;

/// Assistant endpoints.
#[derive(Clone, Copy, Debug)]
pub struct Assistants<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    /// Assistant endpoints.
    pub fn assistants(&self) -> Assistants<'_> {
        Assistants { client: self }
    }
}

impl Assistants<'_> {
    /// Create an assistant.
    pub async fn create(&self, fields: &AssistantFields) -> Result<Value> {
        self.client.post("/assistants/create", fields).await
    }

    /// All assistants of the current user.
    pub async fn list(&self) -> Result<Value> {
        self.client.get("/assistants/").await
    }

    /// One assistant.
    pub async fn get(&self, id: impl Display) -> Result<Value> {
        self.client.get(&format!("/assistants/{id}")).await
    }

    /// Delete an assistant.
    pub async fn delete(&self, id: impl Display) -> Result<Value> {
        self.client.delete(&format!("/assistants/delete/{id}")).await
    }

    /// Partial update; covers rename and voice changes too.
    pub async fn update(&self, id: impl Display, fields: &AssistantFields) -> Result<Value> {
        self.client.put(&format!("/assistants/update/{id}"), fields).await
    }

    /// Replace the system prompt.
    pub async fn update_prompt(&self, id: impl Display, prompt: &str) -> Result<Value> {
        self.client
            .put(&format!("/assistants/{id}/prompt"), &json!({ "prompt": prompt }))
            .await
    }

    /// Available text-to-speech voices.
    pub async fn voices(&self) -> Result<Value> {
        self.client.get("/assistants/voices").await
    }

    /// Ask the assistant a question and stream the raw response body.
    pub async fn chat_stream(
        &self,
        id: impl Display,
        question: &str,
    ) -> Result<BoxStream<'static, Result<Bytes>>> {
        let request = self
            .client
            .request(Method::POST, &format!("/assistants/{id}/chat"))?
            .json(&json!({ "question": question }));
        let response = self.client.send(request).await?;
        Ok(response.bytes_stream().map_err(ApiError::from).boxed())
    }

    /// [`chat_stream`](Self::chat_stream), collected and parsed as JSON.
    pub async fn chat(&self, id: impl Display, question: &str) -> Result<Value> {
        let mut stream = self.chat_stream(id, question).await?;
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
