//! Auth context: the current user and the bearer token, plus where the token
//! is persisted between runs.

use crate::User;
use crate::client::{ApiError, ApiResult, GuildApi};
use crate::wire::{LoginResponse, RedirectResponse};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key the token is stored under in the session file.
pub const TOKEN_KEY: &str = "auth_token";

pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(rename = "auth_token", default, skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
}

/// JSON file holding `{"auth_token": "..."}`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_CONFIG_HOME/guildtui/session.json`, falling back to `~/.config`.
    pub fn default_path() -> PathBuf {
        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME")
            && !config_dir.trim().is_empty()
        {
            return PathBuf::from(config_dir).join("guildtui").join("session.json");
        }
        if let Ok(home) = std::env::var("HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home)
                .join(".config")
                .join("guildtui")
                .join("session.json");
        }
        PathBuf::from("guildtui-session.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<SessionFile>(&content) {
            Ok(file) => file.auth_token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!("ignoring unreadable session file {}: {e}", self.path.display());
                None
            }
        }
    }

    fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = SessionFile { auth_token: Some(token.to_string()) };
        let payload = serde_json::to_string_pretty(&file).map_err(io::Error::other)?;
        std::fs::write(&self.path, payload)
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self { token: Mutex::new(Some(token.to_string())) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        let mut slot = self.token.lock().map_err(|e| io::Error::other(e.to_string()))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        let mut slot = self.token.lock().map_err(|e| io::Error::other(e.to_string()))?;
        *slot = None;
        Ok(())
    }
}

/// The signed-in user and their token. Sole writer of the client's token slot.
pub struct Session<S: TokenStore> {
    api: GuildApi,
    store: S,
    user: Option<User>,
}

impl<S: TokenStore> Session<S> {
    pub fn new(api: GuildApi, store: S) -> Self {
        Self { api, store, user: None }
    }

    pub fn api(&self) -> &GuildApi {
        &self.api
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.api.has_token()
    }

    pub fn token(&self) -> Option<String> {
        self.api.token()
    }

    /// Pick up a token persisted by a previous run and check it is still valid.
    pub async fn restore(&mut self) -> ApiResult<Option<&User>> {
        let Some(token) = self.store.load() else {
            debug!("no stored session");
            return Ok(None);
        };
        self.api.set_token(Some(token));
        match self.refresh().await {
            Ok(_) => Ok(self.user.as_ref()),
            Err(e) if e.is_unauthorized() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// URL of the identity provider's consent page.
    pub async fn login_url(&self) -> ApiResult<String> {
        let redirect: RedirectResponse = self.api.get("/auth/discord/redirect").await?;
        Ok(redirect.url)
    }

    /// Exchange the callback's `code`/`state` for a session token.
    pub async fn complete_login(&mut self, code: &str, state: &str) -> ApiResult<&User> {
        let login: LoginResponse = self
            .api
            .get_query("/auth/discord/callback", &[("code", code), ("state", state)])
            .await?;
        Ok(self.establish(login.token, login.user))
    }

    /// Adopt a token issued out of band (e.g. pasted from the web app).
    pub async fn login_with_token(&mut self, token: &str) -> ApiResult<&User> {
        self.api.set_token(Some(token.to_string()));
        let user = match self.refresh().await {
            Ok(user) => user,
            Err(e) => {
                if !e.is_unauthorized() {
                    self.api.set_token(None);
                }
                return Err(e);
            }
        };
        Ok(self.establish(token.to_string(), user))
    }

    /// Re-fetch the current user. A 401 tears the session down.
    pub async fn refresh(&mut self) -> ApiResult<User> {
        match self.api.get::<User>("/auth/check").await {
            Ok(user) => {
                self.user = Some(user.clone());
                Ok(user)
            }
            Err(e) => {
                self.observe(&e);
                Err(e)
            }
        }
    }

    /// Ends the session. Local state is cleared whether or not the backend
    /// call succeeds; its error, if any, is still returned.
    pub async fn logout(&mut self) -> ApiResult<()> {
        let result = if self.api.has_token() {
            self.api.post_empty("/auth/logout").await
        } else {
            Ok(())
        };
        if let Err(e) = &result {
            warn!("logout request failed: {e}");
        }
        self.invalidate();
        result
    }

    /// Feed every API error through here: a 401 means the token is dead.
    pub fn observe(&mut self, err: &ApiError) {
        if err.is_unauthorized() {
            debug!("401 received, clearing session");
            self.invalidate();
        }
    }

    fn establish(&mut self, token: String, user: User) -> &User {
        if let Err(e) = self.store.save(&token) {
            warn!("could not persist session token: {e}");
        }
        self.api.set_token(Some(token));
        self.user.insert(user)
    }

    fn invalidate(&mut self) {
        self.api.set_token(None);
        self.user = None;
        if let Err(e) = self.store.clear() {
            warn!("could not clear stored session token: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_JSON: &str = r#"{"data": {"id": 7, "handle": "ace", "roles": ["admin"]}}"#;

    fn session(server: &mockito::Server, store: MemoryTokenStore) -> Session<MemoryTokenStore> {
        Session::new(GuildApi::new(server.url()), store)
    }

    #[tokio::test]
    async fn restore_with_valid_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/auth/check")
            .match_header("authorization", "Bearer stored")
            .with_status(200)
            .with_body(USER_JSON)
            .create_async()
            .await;

        let mut session = session(&server, MemoryTokenStore::with_token("stored"));
        let user = session.restore().await.unwrap().cloned();
        assert_eq!(user.map(|u| u.handle), Some("ace".to_string()));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn restore_with_expired_token_clears_store() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/auth/check")
            .with_status(401)
            .with_body(r#"{"message": "Unauthenticated."}"#)
            .create_async()
            .await;

        let mut session = session(&server, MemoryTokenStore::with_token("stale"));
        assert!(session.restore().await.unwrap().is_none());
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
        assert!(session.store().load().is_none());
    }

    #[tokio::test]
    async fn logout_clears_state_even_when_backend_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/auth/check")
            .with_status(200)
            .with_body(USER_JSON)
            .create_async()
            .await;
        server
            .mock("POST", "/api/v1/auth/logout")
            .with_status(500)
            .create_async()
            .await;

        let mut session = session(&server, MemoryTokenStore::with_token("stored"));
        session.restore().await.unwrap();
        assert!(session.is_authenticated());

        assert!(session.logout().await.is_err());
        assert!(!session.is_authenticated());
        assert!(session.current_user().is_none());
        assert!(session.token().is_none());
        assert!(session.store().load().is_none());
    }

    #[tokio::test]
    async fn complete_login_persists_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/auth/discord/callback")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("code".into(), "abc".into()),
                mockito::Matcher::UrlEncoded("state".into(), "xyz".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"token": "fresh", "user": {"id": 7, "handle": "ace"}}"#)
            .create_async()
            .await;

        let mut session = session(&server, MemoryTokenStore::default());
        let handle = session.complete_login("abc", "xyz").await.unwrap().handle.clone();
        assert_eq!(handle, "ace");
        assert_eq!(session.token().as_deref(), Some("fresh"));
        assert_eq!(session.store().load().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn any_401_observed_tears_down_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/auth/check")
            .with_status(200)
            .with_body(USER_JSON)
            .create_async()
            .await;

        let mut session = session(&server, MemoryTokenStore::with_token("stored"));
        session.restore().await.unwrap();
        session.observe(&ApiError::Forbidden("nope".into()));
        assert!(session.is_authenticated(), "403 keeps the session");
        session.observe(&ApiError::Unauthorized("expired".into()));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn file_store_round_trip_uses_fixed_key() {
        let dir = std::env::temp_dir().join(format!("guildtui-session-{}", std::process::id()));
        let store = FileTokenStore::new(dir.join("session.json"));
        assert!(store.load().is_none());

        store.save("tok").unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[TOKEN_KEY], "tok");
        assert_eq!(store.load().as_deref(), Some("tok"));

        store.clear().unwrap();
        assert!(store.load().is_none());
        store.clear().unwrap();
        let _ = std::fs::remove_dir_all(dir);
    }
}
