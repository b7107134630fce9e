//! Wire types for the backend's chat endpoints, plus the normalization layer
//! that maps them onto the clean domain model.
//!
//! The backend is loose about response shapes: list endpoints sometimes wrap
//! their payload in an envelope (`{"messages": [...]}`), sometimes ship a
//! bare array, and older deployments used a generic `{"data": [...]}`. The
//! untagged enums here accept all of them so callers never branch on shape.

use crate::{Conversation, DirectMessage, UserProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GET /api/chat/history/{peer}
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
pub enum HistoryResponse {
    Envelope { messages: Vec<WireMessage> },
    Data { data: Vec<WireMessage> },
    Bare(Vec<WireMessage>),
    #[default]
    Empty,
}

impl HistoryResponse {
    /// Flatten whichever shape arrived into chronological domain messages.
    /// Order is preserved exactly as the server sent it (oldest first).
    pub fn into_messages(self) -> Vec<DirectMessage> {
        let wire = match self {
            HistoryResponse::Envelope { messages } => messages,
            HistoryResponse::Data { data } => data,
            HistoryResponse::Bare(messages) => messages,
            HistoryResponse::Empty => Vec::new(),
        };
        wire.into_iter().map(WireMessage::into_domain).collect()
    }
}

/// A single message as it travels on the wire — the same shape is used by the
/// history endpoint and the realtime `dm:receive` event. Only `sender`,
/// `receiver` and `message` are guaranteed to be populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub receiver: String,
    #[serde(default, alias = "body")]
    pub message: String,
    #[serde(
        default,
        rename = "createdAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
}

impl WireMessage {
    pub fn into_domain(self) -> DirectMessage {
        let created_at = parse_timestamp(self.created_at.as_deref());
        // Persisted messages should always carry an id; tolerate its absence
        // with the same sender+timestamp key the realtime path uses.
        let id = self
            .id
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| format!("{}-{}", self.sender, created_at.timestamp_millis()));
        DirectMessage {
            id,
            sender_id: self.sender,
            receiver_id: self.receiver,
            body: self.message,
            created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// GET /api/chat/conversations
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
pub enum ConversationsResponse {
    Envelope {
        conversations: Vec<WireConversation>,
    },
    Bare(Vec<WireConversation>),
    #[default]
    Empty,
}

impl ConversationsResponse {
    pub fn into_conversations(self) -> Vec<Conversation> {
        let wire = match self {
            ConversationsResponse::Envelope { conversations } => conversations,
            ConversationsResponse::Bare(conversations) => conversations,
            ConversationsResponse::Empty => Vec::new(),
        };
        wire.into_iter().map(WireConversation::into_domain).collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireConversation {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
}

impl WireConversation {
    pub fn into_domain(self) -> Conversation {
        let display_name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| Conversation::placeholder_name(&self.user_id));
        Conversation {
            display_name,
            last_message_body: self.last_message.unwrap_or_default(),
            last_message_at: parse_timestamp(self.updated_at.as_deref()),
            unread_count: self.unread_count,
            peer_id: self.user_id,
        }
    }
}

// ---------------------------------------------------------------------------
// GET /api/users/{id}
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUser {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl WireUser {
    pub fn into_domain(self) -> UserProfile {
        UserProfile {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/ai/chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryResponse {
    #[serde(default)]
    pub text: String,
}

/// Parse the backend's RFC 3339 timestamps, falling back to "now" when the
/// field is absent or unreadable. Ordering never depends on this value, so a
/// skewed fallback cannot reorder a thread.
pub fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_accepts_envelope_and_bare_shapes() {
        let envelope = r#"{"messages":[{"_id":"m1","sender":"u1","receiver":"a1","message":"hi","createdAt":"2026-03-01T12:00:00Z"}]}"#;
        let bare = r#"[{"_id":"m1","sender":"u1","receiver":"a1","message":"hi","createdAt":"2026-03-01T12:00:00Z"}]"#;
        let data = r#"{"data":[{"_id":"m1","sender":"u1","receiver":"a1","message":"hi","createdAt":"2026-03-01T12:00:00Z"}]}"#;

        for raw in [envelope, bare, data] {
            let parsed: HistoryResponse = serde_json::from_str(raw).unwrap();
            let messages = parsed.into_messages();
            assert_eq!(messages.len(), 1, "shape failed: {raw}");
            assert_eq!(messages[0].id, "m1");
            assert_eq!(messages[0].body, "hi");
        }
    }

    #[test]
    fn history_preserves_server_order() {
        let raw = r#"{"messages":[
            {"_id":"m1","sender":"u","receiver":"a","message":"first"},
            {"_id":"m2","sender":"a","receiver":"u","message":"second"},
            {"_id":"m3","sender":"u","receiver":"a","message":"third"}
        ]}"#;
        let parsed: HistoryResponse = serde_json::from_str(raw).unwrap();
        let ids: Vec<String> = parsed.into_messages().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn message_without_id_gets_sender_timestamp_key() {
        let wire = WireMessage {
            id: None,
            sender: "u1".into(),
            receiver: "a1".into(),
            message: "hi".into(),
            created_at: Some("2026-03-01T12:00:00Z".into()),
        };
        let msg = wire.into_domain();
        assert!(msg.id.starts_with("u1-"));
        assert!(!msg.is_optimistic());
    }

    #[test]
    fn conversations_accept_both_shapes() {
        let envelope =
            r#"{"conversations":[{"userId":"u1","name":"Sami","lastMessage":"hey","unreadCount":2}]}"#;
        let bare = r#"[{"userId":"u1","name":"Sami","lastMessage":"hey","unreadCount":2}]"#;
        for raw in [envelope, bare] {
            let parsed: ConversationsResponse = serde_json::from_str(raw).unwrap();
            let list = parsed.into_conversations();
            assert_eq!(list.len(), 1);
            assert_eq!(list[0].peer_id, "u1");
            assert_eq!(list[0].unread_count, 2);
        }
    }

    #[test]
    fn nameless_conversation_gets_placeholder() {
        let raw = r#"[{"userId":"398d1baa1b","lastMessage":"hey"}]"#;
        let parsed: ConversationsResponse = serde_json::from_str(raw).unwrap();
        let list = parsed.into_conversations();
        assert_eq!(list[0].display_name, "User aa1b");
    }

    #[test]
    fn bad_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let parsed = parse_timestamp(Some("not-a-date"));
        assert!(parsed >= before);
    }
}
