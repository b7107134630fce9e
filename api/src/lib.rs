pub mod client;
pub mod wire;

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Domain types — clean model, independent of the backend wire format
// ---------------------------------------------------------------------------

/// One direct message between a user and the admin desk.
///
/// `id` is the server-assigned identifier once the backend has persisted the
/// message. Messages composed locally carry a `temp-` prefixed placeholder id
/// until (and unless) the server echo is reconciled against them; a temp id
/// is never reused as a real id.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectMessage {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl DirectMessage {
    pub fn is_optimistic(&self) -> bool {
        self.id.starts_with("temp-")
    }

    /// The endpoint of this message that is not `me`.
    pub fn peer_of(&self, me: &str) -> &str {
        if self.sender_id == me {
            &self.receiver_id
        } else {
            &self.sender_id
        }
    }

    /// True iff this message was exchanged between exactly `a` and `b`,
    /// in either direction.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

/// Admin-inbox row summarizing the latest state of a thread with one peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub peer_id: String,
    pub display_name: String,
    pub last_message_body: String,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: u32,
}

impl Conversation {
    /// Placeholder name for a peer the client has not resolved yet, derived
    /// from the tail of the id the way the inbox list labels unknown users.
    pub fn placeholder_name(peer_id: &str) -> String {
        let tail: String = peer_id
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("User {tail}")
    }
}

/// Minimal user record, as returned by `GET /api/users/{id}`.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            Conversation::placeholder_name(&self.id)
        } else {
            name.to_string()
        }
    }
}

/// Payload for the AI match-summary proxy (`POST /api/ai/chat`).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub rule: String,
    pub start_date: String,
    pub end_date: String,
    pub sport_type: String,
    pub mode: String,
    pub duration: String,
}

impl Default for SummaryRequest {
    fn default() -> Self {
        Self {
            rule: "match-summary".into(),
            start_date: String::new(),
            end_date: String::new(),
            sport_type: "football".into(),
            mode: "brief".into(),
            duration: "90".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(id: &str, from: &str, to: &str) -> DirectMessage {
        DirectMessage {
            id: id.into(),
            sender_id: from.into(),
            receiver_id: to.into(),
            body: "hi".into(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn peer_of_picks_the_other_endpoint() {
        let m = msg("1", "alice", "admin");
        assert_eq!(m.peer_of("admin"), "alice");
        assert_eq!(m.peer_of("alice"), "admin");
    }

    #[test]
    fn is_between_is_direction_agnostic() {
        let m = msg("1", "alice", "admin");
        assert!(m.is_between("admin", "alice"));
        assert!(m.is_between("alice", "admin"));
        assert!(!m.is_between("alice", "bob"));
    }

    #[test]
    fn temp_ids_are_optimistic() {
        assert!(msg("temp-42", "a", "b").is_optimistic());
        assert!(!msg("661f0c", "a", "b").is_optimistic());
    }

    #[test]
    fn placeholder_name_uses_id_tail() {
        assert_eq!(
            Conversation::placeholder_name("694e945afc34aa398d1baa1b"),
            "User aa1b"
        );
        assert_eq!(Conversation::placeholder_name("ab"), "User ab");
    }

    #[test]
    fn display_name_falls_back_to_placeholder() {
        let p = UserProfile {
            id: "9d1baa1b".into(),
            first_name: String::new(),
            last_name: String::new(),
        };
        assert_eq!(p.display_name(), "User aa1b");

        let p = UserProfile {
            id: "x".into(),
            first_name: "Sami".into(),
            last_name: "Haddad".into(),
        };
        assert_eq!(p.display_name(), "Sami Haddad");
    }
}
