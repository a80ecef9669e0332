use guild_api::bracket::Locale;
use guild_api::client::DEFAULT_API_URL;
use guild_api::session::FileTokenStore;
use log::LevelFilter;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8000";

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub full_screen: bool,
    pub log_level: Option<LevelFilter>,
    pub api_url: String,
    pub ws_url: String,
    /// Pre-issued token; takes precedence over the stored session.
    pub token: Option<String>,
    pub session_file: PathBuf,
    pub locale: Locale,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            full_screen: false,
            log_level: None,
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            token: None,
            session_file: FileTokenStore::default_path(),
            locale: Locale::default(),
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            full_screen: false,
            log_level: get("GUILDTUI_LOG").and_then(|v| LevelFilter::from_str(&v).ok()),
            api_url: get("GUILDTUI_API_URL").unwrap_or(defaults.api_url),
            ws_url: get("GUILDTUI_WS_URL").unwrap_or(defaults.ws_url),
            token: get("GUILDTUI_TOKEN"),
            session_file: get("GUILDTUI_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_file),
            locale: get("GUILDTUI_LOCALE")
                .and_then(|v| Locale::parse(&v))
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> AppSettings {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppSettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let s = settings(&[]);
        assert_eq!(s.api_url, DEFAULT_API_URL);
        assert_eq!(s.ws_url, DEFAULT_WS_URL);
        assert_eq!(s.locale, Locale::Fr);
        assert!(s.token.is_none());
        assert!(s.log_level.is_none());
    }

    #[test]
    fn reads_overrides() {
        let s = settings(&[
            ("GUILDTUI_API_URL", "https://guild.example"),
            ("GUILDTUI_WS_URL", "wss://guild.example"),
            ("GUILDTUI_TOKEN", "abc"),
            ("GUILDTUI_SESSION_FILE", "/tmp/s.json"),
            ("GUILDTUI_LOCALE", "en"),
            ("GUILDTUI_LOG", "debug"),
        ]);
        assert_eq!(s.api_url, "https://guild.example");
        assert_eq!(s.ws_url, "wss://guild.example");
        assert_eq!(s.token.as_deref(), Some("abc"));
        assert_eq!(s.session_file, PathBuf::from("/tmp/s.json"));
        assert_eq!(s.locale, Locale::En);
        assert_eq!(s.log_level, Some(LevelFilter::Debug));
    }

    #[test]
    fn blank_and_unknown_values_fall_back() {
        let s = settings(&[("GUILDTUI_TOKEN", "  "), ("GUILDTUI_LOCALE", "klingon"), ("GUILDTUI_LOG", "loud")]);
        assert!(s.token.is_none());
        assert_eq!(s.locale, Locale::Fr);
        assert!(s.log_level.is_none());
    }
}
