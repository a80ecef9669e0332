use crate::wire::{Envelope, ErrorBody};
use log::debug;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const API_PREFIX: &str = "/api/v1";

const GENERIC_FAILURE: &str = "Something went wrong, please try again later.";

/// HTTP client for the platform API.
///
/// Clones share one token slot: the session writes it on login/logout and
/// every outgoing request reads it.
#[derive(Debug, Clone)]
pub struct GuildApi {
    client: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
    timeout: Duration,
}

impl Default for GuildApi {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("parse error for {url}: {source}")]
    Parsing {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// Caught client-side before any request was sent.
    #[error("{0}")]
    Invalid(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Text shown to the user. Server business-rule messages pass through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation { message, fields } => {
                if fields.is_empty() {
                    return message.clone();
                }
                fields
                    .iter()
                    .flat_map(|(field, msgs)| msgs.iter().map(move |m| format!("{field}: {m}")))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            ApiError::Unauthorized(_) => "Session expired, please reconnect.".to_string(),
            ApiError::Forbidden(_) => "You do not have permission to do that.".to_string(),
            ApiError::NotFound(message) => message.clone(),
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Invalid(message) => message.clone(),
            ApiError::Server { .. } | ApiError::Network { .. } | ApiError::Parsing { .. } => {
                GENERIC_FAILURE.to_string()
            }
        }
    }

    /// Classify a non-success response from its status and decoded body.
    pub(crate) fn from_status(status: StatusCode, body: ErrorBody, url: &str) -> Self {
        let message = body.message();
        match status {
            StatusCode::UNAUTHORIZED => {
                ApiError::Unauthorized(message.unwrap_or_else(|| "unauthenticated".into()))
            }
            StatusCode::FORBIDDEN => {
                ApiError::Forbidden(message.unwrap_or_else(|| "forbidden".into()))
            }
            StatusCode::NOT_FOUND => {
                ApiError::NotFound(message.unwrap_or_else(|| format!("{url} not found")))
            }
            StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation {
                message: message.unwrap_or_else(|| "The given data was invalid.".into()),
                fields: body.errors,
            },
            s if s.is_client_error() => ApiError::Rejected {
                status: s.as_u16(),
                message: message.unwrap_or_else(|| s.to_string()),
            },
            s => ApiError::Server {
                status: s.as_u16(),
                message: message.unwrap_or_else(|| s.to_string()),
            },
        }
    }
}

impl GuildApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("guildtui/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path such as `/tournaments/cup`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    pub fn set_token(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut slot) => *slot = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(self.request(Method::GET, path), path).await
    }

    pub async fn get_query<T, Q>(&self, path: &str, query: &Q) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(self.request(Method::GET, path).query(query), path).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::POST, path).json(body), path).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::PUT, path).json(body), path).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::PATCH, path).json(body), path).await
    }

    /// DELETE, discarding whatever body the server answers with.
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let url = self.url(path);
        self.checked(self.request(Method::DELETE, path), &url).await?;
        Ok(())
    }

    /// POST with an empty JSON object, discarding the response body.
    pub async fn post_empty(&self, path: &str) -> ApiResult<()> {
        let url = self.url(path);
        let builder = self.request(Method::POST, path).json(&serde_json::json!({}));
        self.checked(builder, &url).await?;
        Ok(())
    }

    /// Raw response bytes, e.g. attachment downloads.
    pub async fn download(&self, path: &str) -> ApiResult<Vec<u8>> {
        let url = self.url(path);
        let response = self.checked(self.request(Method::GET, path), &url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ApiError::Network { url: url.clone(), source })?;
        Ok(bytes.to_vec())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .timeout(self.timeout)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = self.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, path: &str) -> ApiResult<T> {
        let url = self.url(path);
        let response = self.checked(builder, &url).await?;
        response
            .json::<Envelope<T>>()
            .await
            .map(Envelope::into_inner)
            .map_err(|source| ApiError::Parsing { url, source })
    }

    async fn checked(&self, builder: RequestBuilder, url: &str) -> ApiResult<Response> {
        debug!("request {url}");
        let response = builder
            .send()
            .await
            .map_err(|source| ApiError::Network { url: url.to_owned(), source })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .ok()
            .and_then(|text| serde_json::from_str::<ErrorBody>(&text).ok())
            .unwrap_or_default();
        let err = ApiError::from_status(status, body, url);
        debug!("request {url} failed: {err}");
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ping {
        ok: bool,
    }

    #[test]
    fn url_joins_base_and_prefix() {
        let api = GuildApi::new("https://guild.example/");
        assert_eq!(api.url("/tournaments"), "https://guild.example/api/v1/tournaments");
    }

    #[test]
    fn clones_share_the_token_slot() {
        let api = GuildApi::new("http://localhost");
        let clone = api.clone();
        api.set_token(Some("abc".into()));
        assert_eq!(clone.token().as_deref(), Some("abc"));
        clone.set_token(None);
        assert!(!api.has_token());
    }

    #[test]
    fn validation_errors_aggregate_into_lines() {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), vec!["is required".to_string()]);
        fields.insert(
            "team_size".to_string(),
            vec!["must be at least 1".to_string(), "must be an integer".to_string()],
        );
        let err = ApiError::Validation { message: "invalid".into(), fields };
        assert_eq!(
            err.user_message(),
            "name: is required\nteam_size: must be at least 1\nteam_size: must be an integer"
        );
    }

    #[test]
    fn status_classification() {
        let body = |m: &str| ErrorBody { message: Some(m.into()), ..Default::default() };
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, body("x"), "u"),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, body("x"), "u"),
            ApiError::Forbidden(_)
        ));
        let rejected = ApiError::from_status(StatusCode::CONFLICT, body("Team is full"), "u");
        assert_eq!(rejected.user_message(), "Team is full");
        let server = ApiError::from_status(StatusCode::BAD_GATEWAY, body("upstream"), "u");
        assert_eq!(server.user_message(), GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn attaches_bearer_token_and_unwraps_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/ping")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": {"ok": true}}"#)
            .create_async()
            .await;

        let api = GuildApi::new(server.url());
        api.set_token(Some("secret".into()));
        let ping: Ping = api.get("/ping").await.unwrap();
        assert_eq!(ping, Ping { ok: true });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn omits_authorization_without_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/ping")
            .match_header("authorization", mockito::Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"ok": false}"#)
            .create_async()
            .await;

        let api = GuildApi::new(server.url());
        let ping: Ping = api.get("/ping").await.unwrap();
        assert!(!ping.ok);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unprocessable_entity_maps_to_validation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/tournaments")
            .with_status(422)
            .with_body(r#"{"message": "invalid", "errors": {"name": ["is required"]}}"#)
            .create_async()
            .await;

        let api = GuildApi::new(server.url());
        let err = api
            .post::<Ping, _>("/tournaments", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "name: is required");
    }

    #[tokio::test]
    async fn non_json_error_body_still_classifies() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/ping")
            .with_status(401)
            .with_body("<html>nope</html>")
            .create_async()
            .await;

        let api = GuildApi::new(server.url());
        let err = api.get::<Ping>("/ping").await.unwrap_err();
        assert!(err.is_unauthorized());
    }
}
