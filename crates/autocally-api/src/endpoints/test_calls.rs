//! `/calls/test-call`: browser test calls against an assistant's number.

use serde_json::{Value, json};

use crate::client::ApiClient;
use crate::errors::Result;

/// Test call endpoints.
#[derive(Clone, Copy, Debug)]
pub struct TestCalls<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    /// Test call endpoints.
    pub fn test_calls(&self) -> TestCalls<'_> {
        TestCalls { client: self }
    }
}

impl TestCalls<'_> {
    /// Start a test call on `phone_number_id`. The reply carries the call id
    /// used to open the real-time channel for the call.
    pub async fn start(&self, phone_number_id: i64) -> Result<Value> {
        self.client
            .post(
                "/calls/test-call/start",
                &json!({ "phone_number_id": phone_number_id }),
            )
            .await
    }

    /// End a test call.
    pub async fn end(&self, call_id: i64) -> Result<Value> {
        self.client
            .post("/calls/test-call/end", &json!({ "call_id": call_id }))
            .await
    }

    /// Numbers that can host a test call.
    pub async fn available_phone_numbers(&self) -> Result<Value> {
        self.client.get("/calls/test-call/available-phone-numbers").await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::client_for;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn start_and_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/calls/test-call/start"))
            .and(body_json(json!({"phone_number_id": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"call_id": 31})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/calls/test-call/end"))
            .and(body_json(json!({"call_id": 31})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ended"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t"));
        let started = client.test_calls().start(2).await.unwrap();
        let call_id = started["call_id"].as_i64().unwrap();
        let ended = client.test_calls().end(call_id).await.unwrap();
        assert_eq!(ended["status"], "ended");
    }

    #[tokio::test]
    async fn available_numbers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/calls/test-call/available-phone-numbers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2}])))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t"));
        let numbers = client.test_calls().available_phone_numbers().await.unwrap();
        assert_eq!(numbers.as_array().map(Vec::len), Some(1));
    }
}
