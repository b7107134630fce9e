use log::LevelFilter;

/// Default admin desk identity, matching the backend's seeded admin account.
/// Override with PITCHSIDE_ADMIN_ID when pointing at another deployment.
pub const DEFAULT_ADMIN_ID: &str = "694e945afc34aa398d1baa1b";

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub api_base: String,
    pub chat_ws: String,
    pub admin_id: String,
    pub full_screen: bool,
    pub log_level: Option<LevelFilter>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8008".to_string(),
            chat_ws: "ws://127.0.0.1:8787".to_string(),
            admin_id: DEFAULT_ADMIN_ID.to_string(),
            full_screen: false,
            log_level: None,
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            api_base: env_or("PITCHSIDE_API_BASE", defaults.api_base),
            chat_ws: env_or("PITCHSIDE_CHAT_WS", defaults.chat_ws),
            admin_id: env_or("PITCHSIDE_ADMIN_ID", defaults.admin_id),
            full_screen: false,
            log_level: std::env::var("PITCHSIDE_LOG")
                .ok()
                .and_then(|level| level.parse::<LevelFilter>().ok()),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default,
    }
}
