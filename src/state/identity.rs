use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Who the session belongs to. Loaded once at startup and injected into the
/// app by value; nothing else reads the session file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Persisted auth record: identity plus the bearer token for the realtime
/// channel and the HTTP API. Cleared as one unit on logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    #[serde(flatten)]
    pub identity: Identity,
    pub token: String,
}

impl AuthSession {
    /// Load the persisted session, if any. A malformed record is treated as
    /// "not logged in" and discarded rather than surfaced as an error.
    pub fn load() -> Option<Self> {
        let path = session_path();
        let content = std::fs::read_to_string(&path).ok()?;
        match Self::parse(&content) {
            Some(session) => Some(session),
            None => {
                warn!("discarding malformed session record at {}", path.display());
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    pub fn save(&self) -> Result<(), String> {
        let path = session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| format!("create dir failed: {e}"))?;
        }
        let payload = serde_json::to_string_pretty(self)
            .map_err(|e| format!("serialize session failed: {e}"))?;
        std::fs::write(&path, payload).map_err(|e| format!("write session failed: {e}"))
    }

    /// Logout: remove the persisted record.
    pub fn clear() {
        let _ = std::fs::remove_file(session_path());
    }

    fn parse(content: &str) -> Option<Self> {
        let session: AuthSession = serde_json::from_str(content).ok()?;
        if session.identity.id.trim().is_empty() || session.token.trim().is_empty() {
            return None;
        }
        Some(session)
    }
}

fn session_path() -> PathBuf {
    if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME")
        && !config_dir.trim().is_empty()
    {
        return PathBuf::from(config_dir).join("pitchside").join("session.json");
    }
    if let Ok(home) = std::env::var("HOME")
        && !home.trim().is_empty()
    {
        return PathBuf::from(home)
            .join(".config")
            .join("pitchside")
            .join("session.json");
    }
    PathBuf::from("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_a_complete_record() {
        let raw = r#"{"id":"u1","role":"user","display_name":"Sami","token":"t0k3n"}"#;
        let session = AuthSession::parse(raw).expect("should parse");
        assert_eq!(session.identity.id, "u1");
        assert_eq!(session.identity.role, Role::User);
        assert_eq!(session.token, "t0k3n");
    }

    #[test]
    fn parse_accepts_admin_role_without_display_name() {
        let raw = r#"{"id":"a1","role":"admin","token":"t"}"#;
        let session = AuthSession::parse(raw).expect("should parse");
        assert_eq!(session.identity.role, Role::Admin);
        assert!(session.identity.display_name.is_none());
    }

    #[test]
    fn malformed_records_are_rejected() {
        for raw in [
            "not json",
            "{}",
            r#"{"id":"u1","role":"superuser","token":"t"}"#,
            r#"{"id":"","role":"user","token":"t"}"#,
            r#"{"id":"u1","role":"user","token":"  "}"#,
        ] {
            assert!(AuthSession::parse(raw).is_none(), "accepted: {raw}");
        }
    }

    #[test]
    fn session_round_trips_through_json() {
        let session = AuthSession {
            identity: Identity {
                id: "u1".into(),
                role: Role::User,
                display_name: None,
            },
            token: "t".into(),
        };
        let raw = serde_json::to_string(&session).unwrap();
        let back = AuthSession::parse(&raw).unwrap();
        assert_eq!(back.identity, session.identity);
    }
}
