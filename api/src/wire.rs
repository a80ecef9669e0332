//! Wire shapes shared by every endpoint: response envelopes and error
//! bodies. Entity payloads deserialize straight into the domain types.

use crate::User;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Most endpoints wrap their payload in `{"data": ...}`; a few return it bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}

/// Body returned on non-2xx responses. 422s carry per-field messages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .filter(|m| !m.trim().is_empty())
    }
}

/// Result of the OAuth callback exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedirectResponse {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadResponse {
    #[serde(default)]
    pub read_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkAllResponse {
    #[serde(default)]
    pub updated: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_accepts_wrapped_and_bare_payloads() {
        let wrapped: Envelope<Vec<u32>> = serde_json::from_str(r#"{"data": [1, 2]}"#).unwrap();
        let bare: Envelope<Vec<u32>> = serde_json::from_str("[3]").unwrap();
        assert_eq!(wrapped.into_inner(), vec![1, 2]);
        assert_eq!(bare.into_inner(), vec![3]);
    }

    #[test]
    fn error_body_prefers_message_over_error() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"message": "Nope", "error": "ignored"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("Nope"));

        let body: ErrorBody = serde_json::from_str(r#"{"error": "Locked"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("Locked"));

        let body: ErrorBody = serde_json::from_str(r#"{"message": "  "}"#).unwrap();
        assert_eq!(body.message(), None);
    }
}
