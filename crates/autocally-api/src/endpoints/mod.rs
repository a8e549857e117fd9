//! Endpoint groups, one per backend blueprint.
//!
//! Each group is a cheap borrowed view over [`ApiClient`](crate::ApiClient),
//! e.g. `client.assistants().list()`.

pub mod assistants;
pub mod knowledge_base;
pub mod phone_numbers;
pub mod security;
pub mod test_calls;

pub use assistants::Assistants;
pub use knowledge_base::KnowledgeBases;
pub use phone_numbers::PhoneNumbers;
pub use security::Security;
pub use test_calls::TestCalls;
