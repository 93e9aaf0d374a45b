use std::str::FromStr;
use tracing::Level;

pub const KEY_USERS: &str = "nexus_v51_users";
pub const KEY_CHATS: &str = "nexus_v51_chats";
pub const KEY_SETTINGS: &str = "nexus_v51_settings";
pub const KEY_SESSION: &str = "nexus_v51_session";

pub const EXPORT_VERSION: &str = "5.2.1";

#[derive(Clone, PartialEq, Debug)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub tts_model: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            text_model: "gemini-3-flash-preview".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
        }
    }
}

/// Demo-grade shortcut account. Credentials are compared in cleartext.
#[derive(Clone, PartialEq, Debug)]
pub struct MasterAccount {
    pub username: String,
    pub password: String,
}

impl MasterAccount {
    pub const USER_ID: &'static str = "admin-001";
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct AuthConfig {
    pub master: Option<MasterAccount>,
}

/// What a turn leaves in the transcript when the gateway fails outright.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TurnFailurePolicy {
    /// Keep only the user message.
    #[default]
    Silent,
    /// Append a model message carrying the error text.
    InlineError,
}

#[derive(Clone, PartialEq, Debug)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    pub failure_policy: TurnFailurePolicy,
    pub log_level: Level,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            auth: AuthConfig::default(),
            failure_policy: TurnFailurePolicy::default(),
            log_level: Level::INFO,
        }
    }
}

impl AppConfig {
    /// Reads the build environment; the browser has no runtime env.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| match key {
            "NEXUS_API_KEY" => option_env!("NEXUS_API_KEY"),
            "API_KEY" => option_env!("API_KEY"),
            "NEXUS_API_BASE" => option_env!("NEXUS_API_BASE"),
            "NEXUS_LOG" => option_env!("NEXUS_LOG"),
            "NEXUS_MASTER_USER" => option_env!("NEXUS_MASTER_USER"),
            "NEXUS_MASTER_PASSWORD" => option_env!("NEXUS_MASTER_PASSWORD"),
            "NEXUS_INLINE_ERRORS" => option_env!("NEXUS_INLINE_ERRORS"),
            _ => None,
        })
    }

    pub fn from_lookup<'a, F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let non_empty = |key: &str| lookup(key).map(str::trim).filter(|v| !v.is_empty());
        let mut config = AppConfig::default();

        config.gateway.api_key = non_empty("NEXUS_API_KEY")
            .or_else(|| non_empty("API_KEY"))
            .map(str::to_string);
        if let Some(base) = non_empty("NEXUS_API_BASE") {
            config.gateway.base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(level) = non_empty("NEXUS_LOG").and_then(|l| Level::from_str(l).ok()) {
            config.log_level = level;
        }
        if let (Some(username), Some(password)) =
            (non_empty("NEXUS_MASTER_USER"), non_empty("NEXUS_MASTER_PASSWORD"))
        {
            config.auth.master = Some(MasterAccount {
                username: username.to_string(),
                password: password.to_string(),
            });
        }
        if matches!(non_empty("NEXUS_INLINE_ERRORS"), Some("1") | Some("true")) {
            config.failure_policy = TurnFailurePolicy::InlineError;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&'static str, &'static str)]) -> AppConfig {
        let vars: HashMap<&str, &str> = pairs.iter().copied().collect();
        AppConfig::from_lookup(|k| vars.get(k).copied())
    }

    #[test]
    fn empty_env_gives_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, AppConfig::default());
        assert!(config.gateway.api_key.is_none());
        assert!(config.auth.master.is_none());
    }

    #[test]
    fn reads_key_level_master_and_policy() {
        let config = config_from(&[
            ("API_KEY", "k-123"),
            ("NEXUS_API_BASE", "http://localhost:9000/"),
            ("NEXUS_LOG", "debug"),
            ("NEXUS_MASTER_USER", "root"),
            ("NEXUS_MASTER_PASSWORD", "pw"),
            ("NEXUS_INLINE_ERRORS", "true"),
        ]);
        assert_eq!(config.gateway.api_key.as_deref(), Some("k-123"));
        assert_eq!(config.gateway.base_url, "http://localhost:9000");
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.auth.master.unwrap().username, "root");
        assert_eq!(config.failure_policy, TurnFailurePolicy::InlineError);
    }

    #[test]
    fn master_needs_both_fields() {
        let config = config_from(&[("NEXUS_MASTER_USER", "root")]);
        assert!(config.auth.master.is_none());
    }
}
