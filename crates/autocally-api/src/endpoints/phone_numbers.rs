//! `/phone-numbers`: Twilio numbers attached to the account.

use std::fmt::Display;

use serde_json::Value;

use crate::client::ApiClient;
use crate::errors::Result;
use crate::types::{PhoneNumberUpdate, TwilioImport};

/// Phone number endpoints.
#[derive(Clone, Copy, Debug)]
pub struct PhoneNumbers<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    /// Phone number endpoints.
    pub fn phone_numbers(&self) -> PhoneNumbers<'_> {
        PhoneNumbers { client: self }
    }
}

impl PhoneNumbers<'_> {
    /// Import a number from a Twilio account.
    pub async fn import_from_twilio(&self, import: &TwilioImport) -> Result<Value> {
        self.client.post("/phone-numbers/", import).await
    }

    /// All numbers.
    pub async fn list(&self) -> Result<Value> {
        self.client.get("/phone-numbers/").await
    }

    /// Partial update.
    pub async fn update(&self, id: impl Display, update: &PhoneNumberUpdate) -> Result<Value> {
        self.client.put(&format!("/phone-numbers/{id}"), update).await
    }

    /// Remove a number.
    pub async fn delete(&self, id: impl Display) -> Result<Value> {
        self.client.delete(&format!("/phone-numbers/{id}")).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
