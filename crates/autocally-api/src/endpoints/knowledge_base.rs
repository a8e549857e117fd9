//! `/base-knowledge`: document collections assistants answer from.

use std::fmt::Display;

use bytes::Bytes;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::ApiClient;
use crate::errors::Result;
use crate::types::{
    FileUpload, KnowledgeBaseUpdate, NewKnowledgeBase, TextDocument, TextDocumentUpdate,
};

/// Knowledge base endpoints.
#[derive(Clone, Copy, Debug)]
pub struct KnowledgeBases<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    /// Knowledge base endpoints.
    pub fn knowledge_bases(&self) -> KnowledgeBases<'_> {
        KnowledgeBases { client: self }
    }
}

impl KnowledgeBases<'_> {
    /// All knowledge bases.
    pub async fn list(&self) -> Result<Value> {
        self.client.get("/base-knowledge/").await
    }

    /// One knowledge base.
    pub async fn get(&self, id: impl Display) -> Result<Value> {
        self.client.get(&format!("/base-knowledge/{id}")).await
    }

    /// Create a knowledge base.
    pub async fn create(&self, draft: &NewKnowledgeBase) -> Result<Value> {
        self.client.post("/base-knowledge/", draft).await
    }

    /// Files in a knowledge base.
    pub async fn files(&self, id: impl Display) -> Result<Value> {
        self.client.get(&format!("/base-knowledge/{id}/files")).await
    }

    /// Link an assistant.
    pub async fn add_assistant(&self, id: impl Display, assistant_id: &str) -> Result<Value> {
        self.client
            .post(
                &format!("/base-knowledge/{id}/assistants"),
                &json!({ "assistant_id": assistant_id }),
            )
            .await
    }

    /// Unlink an assistant.
    pub async fn remove_assistant(&self, id: impl Display, assistant_id: &str) -> Result<Value> {
        self.client
            .delete(&format!("/base-knowledge/{id}/assistants/{assistant_id}"))
            .await
    }

    /// Rename or re-describe.
    pub async fn update(&self, id: impl Display, update: &KnowledgeBaseUpdate) -> Result<Value> {
        self.client.put(&format!("/base-knowledge/{id}"), update).await
    }

    /// Delete a knowledge base and its files.
    pub async fn delete(&self, id: impl Display) -> Result<Value> {
        self.client.delete(&format!("/base-knowledge/{id}")).await
    }

    /// Upload a file as `multipart/form-data`.
    pub async fn upload_file(&self, id: impl Display, upload: FileUpload) -> Result<Value> {
        let FileUpload {
            file_name,
            mime_type,
            contents,
            description,
        } = upload;
        debug!(file_name = %file_name, size = contents.len(), "uploading knowledge base file");

        let part = Part::bytes(contents)
            .file_name(file_name)
            .mime_str(mime_type.as_deref().unwrap_or("application/octet-stream"))?;
        let mut form = Form::new().part("file", part);
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            form = form.text("description", description);
        }

        let request = self
            .client
            .request(Method::POST, &format!("/base-knowledge/{id}/files"))?
            .multipart(form);
        self.client.send_json(request).await
    }

    /// Write a text document directly.
    pub async fn create_text_document(
        &self,
        id: impl Display,
        document: &TextDocument,
    ) -> Result<Value> {
        self.client
            .post(&format!("/base-knowledge/{id}/text"), document)
            .await
    }

    /// Delete a file.
    pub async fn delete_file(&self, id: impl Display, file_id: impl Display) -> Result<Value> {
        self.client
            .delete(&format!("/base-knowledge/{id}/files/{file_id}"))
            .await
    }

    /// Extracted text of a file.
    pub async fn file_content(&self, id: impl Display, file_id: impl Display) -> Result<Value> {
        self.client
            .get(&format!("/base-knowledge/{id}/files/{file_id}/content"))
            .await
    }

    /// Original file bytes.
    pub async fn download_file(&self, id: impl Display, file_id: impl Display) -> Result<Bytes> {
        let request = self.client.request(
            Method::GET,
            &format!("/base-knowledge/{id}/files/{file_id}/download"),
        )?;
        let response = self.client.send(request).await?;
        Ok(response.bytes().await?)
    }

    /// Edit a text document.
    pub async fn update_text_file(
        &self,
        id: impl Display,
        file_id: impl Display,
        update: &TextDocumentUpdate,
    ) -> Result<Value> {
        self.client
            .put(&format!("/base-knowledge/{id}/files/{file_id}"), update)
            .await
    }

    /// Queue embedding of pending files. Returns the task descriptor.
    pub async fn start_processing(&self, id: impl Display) -> Result<Value> {
        self.client
            .post(&format!("/base-knowledge/{id}/process"), &json!({}))
            .await
    }

    /// Status of a processing task.
    pub async fn task_status(&self, task_id: &str) -> Result<Value> {
        self.client
            .get(&format!("/base-knowledge/tasks/{task_id}"))
            .await
    }

    /// Status of the most recent processing task of a knowledge base.
    pub async fn last_task_status(&self, id: impl Display) -> Result<Value> {
        self.client
            .get(&format!("/base-knowledge/{id}/tasks/last"))
            .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
