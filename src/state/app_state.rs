use crate::state::chat::DmEnvelope;
use chrono::Local;
use log::debug;
use pitchside_api::{Conversation, DirectMessage, SummaryRequest};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Thread state — shared by both chat variants
// ---------------------------------------------------------------------------

/// Visible thread cap. Dropping the oldest entries keeps long sessions
/// bounded without ever reordering what remains.
const THREAD_CAP: usize = 500;

/// Optimistic sends awaiting their server echo. Bounded; stale entries are
/// dropped on history reload.
const PENDING_CAP: usize = 32;

#[derive(Debug, Clone)]
struct PendingEcho {
    temp_id: String,
    body: String,
}

/// The ordered message list for one open thread, plus the composer buffer.
///
/// Messages are append-only in arrival order: history seeds the list oldest
/// first and realtime messages go on the end. Nothing here sorts by
/// timestamp — ordering is by arrival, so clock skew between sources cannot
/// shuffle a thread.
#[derive(Debug, Default)]
pub struct ThreadState {
    pub messages: Vec<DirectMessage>,
    pub input: String,
    pub composing: bool,
    pub scroll_offset: u16,
    seen_ids: HashSet<String>,
    pending_echoes: Vec<PendingEcho>,
    temp_seq: u64,
}

impl ThreadState {
    /// Replace the visible list with freshly loaded history. Realtime
    /// messages arriving after this append to it.
    pub fn seed_history(&mut self, messages: Vec<DirectMessage>) {
        self.seen_ids = messages.iter().map(|m| m.id.clone()).collect();
        self.messages = messages;
        self.pending_echoes.clear();
        self.trim();
        self.scroll_offset = 0;
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.seen_ids.clear();
        self.pending_echoes.clear();
        self.scroll_offset = 0;
    }

    /// Apply one inbound message that already passed the relevance filter.
    /// Returns true when the visible list changed.
    ///
    /// When the message is our own server echo and its body matches a
    /// pending optimistic entry, that entry is rewritten in place with the
    /// server id and timestamp instead of appending a duplicate.
    pub fn ingest(&mut self, msg: DirectMessage, from_me: bool) -> bool {
        if self.seen_ids.contains(&msg.id) {
            return false;
        }
        if from_me
            && let Some(pos) = self
                .pending_echoes
                .iter()
                .position(|p| p.body == msg.body)
        {
            let pending = self.pending_echoes.remove(pos);
            self.seen_ids.insert(msg.id.clone());
            if let Some(entry) = self.messages.iter_mut().find(|m| m.id == pending.temp_id) {
                entry.id = msg.id;
                entry.created_at = msg.created_at;
                return true;
            }
            // Temp entry already trimmed away; fall through to a plain append.
        }
        self.seen_ids.insert(msg.id.clone());
        self.messages.push(msg);
        self.trim();
        self.scroll_offset = 0;
        true
    }

    /// Append a locally composed message with a placeholder id. The temp id
    /// is never a server id, so later dedup-by-id cannot collide with it.
    pub fn push_optimistic(&mut self, me: &str, peer: &str, body: &str) -> DirectMessage {
        self.temp_seq += 1;
        let msg = DirectMessage {
            id: format!(
                "temp-{}-{}",
                self.temp_seq,
                Local::now()
                    .timestamp_nanos_opt()
                    .unwrap_or_else(|| Local::now().timestamp_micros() * 1000)
            ),
            sender_id: me.to_string(),
            receiver_id: peer.to_string(),
            body: body.to_string(),
            created_at: chrono::Utc::now(),
        };
        self.seen_ids.insert(msg.id.clone());
        self.pending_echoes.push(PendingEcho {
            temp_id: msg.id.clone(),
            body: body.to_string(),
        });
        if self.pending_echoes.len() > PENDING_CAP {
            self.pending_echoes.remove(0);
        }
        self.messages.push(msg.clone());
        self.trim();
        self.scroll_offset = 0;
        msg
    }

    /// Take the composer buffer for sending: clears the input synchronously,
    /// yields None when the trimmed text is empty.
    pub fn take_input(&mut self) -> Option<String> {
        let body = self.input.trim().to_string();
        self.input.clear();
        self.composing = false;
        if body.is_empty() { None } else { Some(body) }
    }

    fn trim(&mut self) {
        if self.messages.len() > THREAD_CAP {
            let remove_count = self.messages.len() - THREAD_CAP;
            self.messages.drain(0..remove_count);
        }
    }
}

/// Outbound send produced by a composer, to be forwarded to the channel
/// worker. `to_user_id` is None for the user variant (implicit admin
/// destination).
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundDm {
    pub to_user_id: Option<String>,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Direct thread — user-facing single-peer variant
// ---------------------------------------------------------------------------

/// The user's chat with the admin desk: one fixed peer, no conversation
/// list, no unread tracking (the view is always open while mounted).
#[derive(Debug)]
pub struct DirectThread {
    pub me: String,
    pub admin_id: String,
    pub thread: ThreadState,
}

impl DirectThread {
    pub fn new(me: String, admin_id: String) -> Self {
        Self {
            me,
            admin_id,
            thread: ThreadState::default(),
        }
    }

    /// Relevance filter + dedup. Only messages exchanged between the local
    /// identity and the admin belong to this thread.
    pub fn on_receive(&mut self, envelope: DmEnvelope) -> bool {
        let msg = envelope.into_domain();
        if !msg.is_between(&self.me, &self.admin_id) {
            return false;
        }
        let from_me = msg.sender_id == self.me;
        self.thread.ingest(msg, from_me)
    }

    pub fn submit(&mut self) -> Option<OutboundDm> {
        let body = self.thread.take_input()?;
        let admin_id = self.admin_id.clone();
        let me = self.me.clone();
        self.thread.push_optimistic(&me, &admin_id, &body);
        Some(OutboundDm {
            to_user_id: None,
            body,
        })
    }
}

// ---------------------------------------------------------------------------
// Inbox — admin conversation store
// ---------------------------------------------------------------------------

/// The admin inbox: at most one conversation row per peer, ordered most
/// recent first, with per-row unread counters. The open thread's messages
/// live in `thread`; selection changes swap its contents via the history
/// loader.
#[derive(Debug)]
pub struct Inbox {
    pub me: String,
    pub conversations: Vec<Conversation>,
    pub selected_peer: Option<String>,
    pub thread: ThreadState,
    pub loading_thread: bool,
    history_epoch: u64,
}

impl Inbox {
    pub fn new(me: String) -> Self {
        Self {
            me,
            conversations: Vec::new(),
            selected_peer: None,
            thread: ThreadState::default(),
            loading_thread: false,
            history_epoch: 0,
        }
    }

    /// Seed the inbox from the backend snapshot. When nothing is selected
    /// yet, the first (most recent) conversation is selected; the returned
    /// peer/epoch pair tells the caller to kick off its history load.
    pub fn seed(&mut self, conversations: Vec<Conversation>) -> Option<(String, u64)> {
        self.conversations = conversations;
        if self.selected_peer.is_none()
            && let Some(first) = self.conversations.first().map(|c| c.peer_id.clone())
        {
            let epoch = self.select(&first);
            return Some((first, epoch));
        }
        None
    }

    /// Open a conversation: zeroes exactly that row's unread counter and
    /// invalidates any history response still in flight for the previous
    /// selection. The returned epoch must be echoed back by the loader.
    pub fn select(&mut self, peer_id: &str) -> u64 {
        self.selected_peer = Some(peer_id.to_string());
        if let Some(row) = self.conversations.iter_mut().find(|c| c.peer_id == peer_id) {
            row.unread_count = 0;
        }
        self.thread.reset();
        self.loading_thread = true;
        self.history_epoch += 1;
        self.history_epoch
    }

    /// Move the selection within the current list order. Returns the newly
    /// selected peer and epoch so the caller can trigger a history load.
    pub fn select_offset(&mut self, delta: isize) -> Option<(String, u64)> {
        if self.conversations.is_empty() {
            return None;
        }
        let current = self
            .selected_peer
            .as_ref()
            .and_then(|p| self.conversations.iter().position(|c| &c.peer_id == p));
        let next = match current {
            Some(idx) => idx
                .saturating_add_signed(delta)
                .min(self.conversations.len() - 1),
            None => 0,
        };
        let peer = self.conversations[next].peer_id.clone();
        if self.selected_peer.as_deref() == Some(peer.as_str()) {
            return None;
        }
        let epoch = self.select(&peer);
        Some((peer, epoch))
    }

    /// Apply a resolved history load. Stale resolutions — a selection change
    /// or a newer load since the request was issued — are discarded.
    pub fn apply_history(
        &mut self,
        peer_id: &str,
        epoch: u64,
        messages: Vec<DirectMessage>,
    ) -> bool {
        if epoch != self.history_epoch || self.selected_peer.as_deref() != Some(peer_id) {
            debug!("dropping stale history for {peer_id} (epoch {epoch})");
            return false;
        }
        self.thread.seed_history(messages);
        self.loading_thread = false;
        true
    }

    /// Apply one inbound realtime event: append to the open thread when
    /// relevant, and upsert the conversation row either way.
    pub fn on_receive(&mut self, envelope: DmEnvelope) -> bool {
        let msg = envelope.into_domain();
        let other_id = msg.peer_of(&self.me).to_string();
        let related = self.selected_peer.as_deref() == Some(other_id.as_str());
        let from_me = msg.sender_id == self.me;

        let mut changed = false;
        if related {
            changed |= self.thread.ingest(msg.clone(), from_me);
        }

        let existing = self
            .conversations
            .iter()
            .position(|c| c.peer_id == other_id);
        let (display_name, unread_count) = match existing {
            Some(idx) => {
                let row = self.conversations.remove(idx);
                let unread = if related { 0 } else { row.unread_count + 1 };
                (row.display_name, unread)
            }
            None => {
                let unread = if related { 0 } else { 1 };
                (Conversation::placeholder_name(&other_id), unread)
            }
        };
        self.conversations.insert(
            0,
            Conversation {
                peer_id: other_id,
                display_name,
                last_message_body: msg.body,
                last_message_at: msg.created_at,
                unread_count,
            },
        );
        changed = true;
        changed
    }

    /// Attach a resolved display name to a conversation row.
    pub fn resolve_name(&mut self, peer_id: &str, display_name: String) -> bool {
        if let Some(row) = self.conversations.iter_mut().find(|c| c.peer_id == peer_id) {
            row.display_name = display_name;
            true
        } else {
            false
        }
    }

    pub fn selected_conversation(&self) -> Option<&Conversation> {
        let selected = self.selected_peer.as_deref()?;
        self.conversations.iter().find(|c| c.peer_id == selected)
    }

    pub fn submit(&mut self) -> Option<OutboundDm> {
        let peer = self.selected_peer.clone()?;
        let body = self.thread.take_input()?;
        let me = self.me.clone();
        self.thread.push_optimistic(&me, &peer, &body);
        Some(OutboundDm {
            to_user_id: Some(peer),
            body,
        })
    }
}

// ---------------------------------------------------------------------------
// Chat view — role-selected variant
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ChatView {
    Direct(DirectThread),
    Inbox(Inbox),
}

impl ChatView {
    pub fn thread(&self) -> &ThreadState {
        match self {
            ChatView::Direct(direct) => &direct.thread,
            ChatView::Inbox(inbox) => &inbox.thread,
        }
    }

    pub fn thread_mut(&mut self) -> &mut ThreadState {
        match self {
            ChatView::Direct(direct) => &mut direct.thread,
            ChatView::Inbox(inbox) => &mut inbox.thread,
        }
    }

    pub fn on_receive(&mut self, envelope: DmEnvelope) -> bool {
        match self {
            ChatView::Direct(direct) => direct.on_receive(envelope),
            ChatView::Inbox(inbox) => inbox.on_receive(envelope),
        }
    }

    pub fn submit(&mut self) -> Option<OutboundDm> {
        match self {
            ChatView::Direct(direct) => direct.submit(),
            ChatView::Inbox(inbox) => inbox.submit(),
        }
    }

    pub fn inbox_mut(&mut self) -> Option<&mut Inbox> {
        match self {
            ChatView::Inbox(inbox) => Some(inbox),
            ChatView::Direct(_) => None,
        }
    }

    pub fn inbox(&self) -> Option<&Inbox> {
        match self {
            ChatView::Inbox(inbox) => Some(inbox),
            ChatView::Direct(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// AI match-summary tab state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SummaryState {
    pub request: SummaryRequest,
    pub selected_field: usize,
    pub editing: bool,
    pub requesting: bool,
    pub response: Option<String>,
}

impl SummaryState {
    pub const FIELD_COUNT: usize = 6;

    pub fn field_label(index: usize) -> &'static str {
        match index {
            0 => "rule",
            1 => "start date",
            2 => "end date",
            3 => "sport",
            4 => "mode",
            _ => "duration",
        }
    }

    pub fn field_mut(&mut self, index: usize) -> &mut String {
        match index {
            0 => &mut self.request.rule,
            1 => &mut self.request.start_date,
            2 => &mut self.request.end_date,
            3 => &mut self.request.sport_type,
            4 => &mut self.request.mode,
            _ => &mut self.request.duration,
        }
    }

    pub fn field(&self, index: usize) -> &str {
        match index {
            0 => &self.request.rule,
            1 => &self.request.start_date,
            2 => &self.request.end_date,
            3 => &self.request.sport_type,
            4 => &self.request.mode,
            _ => &self.request.duration,
        }
    }

    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % Self::FIELD_COUNT;
    }

    pub fn prev_field(&mut self) {
        self.selected_field = (self.selected_field + Self::FIELD_COUNT - 1) % Self::FIELD_COUNT;
    }
}

// ---------------------------------------------------------------------------
// Root app state
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppState {
    pub active_tab: crate::app::MenuItem,
    pub previous_tab: crate::app::MenuItem,
    pub show_logs: bool,
    pub last_error: Option<String>,
    pub connected: bool,
    pub status: Option<String>,
    pub chat: ChatView,
    pub summary: SummaryState,
}

impl AppState {
    pub fn new(chat: ChatView) -> Self {
        Self {
            active_tab: Default::default(),
            previous_tab: Default::default(),
            show_logs: false,
            last_error: None,
            connected: false,
            status: Some("connecting...".to_string()),
            chat,
            summary: SummaryState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const ME: &str = "admin-1";
    const ADMIN: &str = "admin-1";
    const U1: &str = "user-1111";
    const U2: &str = "user-2222";

    fn envelope(id: Option<&str>, from: &str, to: &str, body: &str) -> DmEnvelope {
        DmEnvelope {
            id: id.map(str::to_string),
            sender: from.to_string(),
            receiver: to.to_string(),
            message: body.to_string(),
            created_at: Some("2026-03-01T12:00:00Z".to_string()),
        }
    }

    fn history_msg(id: &str, from: &str, to: &str, body: &str) -> DirectMessage {
        DirectMessage {
            id: id.to_string(),
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            body: body.to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap(),
        }
    }

    // -- direct thread (user variant) ---------------------------------------

    #[test]
    fn direct_thread_ignores_unrelated_messages() {
        let mut chat = DirectThread::new(U1.into(), ADMIN.into());
        assert!(!chat.on_receive(envelope(Some("m1"), U2, ADMIN, "not mine")));
        assert!(chat.thread.messages.is_empty());
    }

    #[test]
    fn direct_thread_accepts_both_directions() {
        let mut chat = DirectThread::new(U1.into(), ADMIN.into());
        assert!(chat.on_receive(envelope(Some("m1"), U1, ADMIN, "hi")));
        assert!(chat.on_receive(envelope(Some("m2"), ADMIN, U1, "hello")));
        let bodies: Vec<&str> = chat.thread.messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["hi", "hello"]);
    }

    #[test]
    fn duplicate_delivery_is_idempotent() {
        let mut chat = DirectThread::new(U1.into(), ADMIN.into());
        assert!(chat.on_receive(envelope(Some("m1"), ADMIN, U1, "hello")));
        assert!(!chat.on_receive(envelope(Some("m1"), ADMIN, U1, "hello")));
        assert_eq!(chat.thread.messages.len(), 1);
    }

    #[test]
    fn history_then_realtime_is_append_only() {
        let mut chat = DirectThread::new(U1.into(), ADMIN.into());
        chat.thread.seed_history(vec![
            history_msg("m1", U1, ADMIN, "one"),
            history_msg("m2", ADMIN, U1, "two"),
            history_msg("m3", U1, ADMIN, "three"),
        ]);
        chat.on_receive(envelope(Some("m4"), ADMIN, U1, "four"));
        let ids: Vec<&str> = chat.thread.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn submit_clears_input_and_appends_optimistically() {
        let mut chat = DirectThread::new(U1.into(), ADMIN.into());
        chat.thread.input = "hello".into();
        let out = chat.submit().expect("should produce an outbound send");
        assert_eq!(out, OutboundDm { to_user_id: None, body: "hello".into() });
        assert!(chat.thread.input.is_empty());
        assert_eq!(chat.thread.messages.len(), 1);
        assert!(chat.thread.messages[0].is_optimistic());
        assert_eq!(chat.thread.messages[0].body, "hello");
    }

    #[test]
    fn submit_of_blank_input_is_a_noop() {
        let mut chat = DirectThread::new(U1.into(), ADMIN.into());
        chat.thread.input = "   ".into();
        assert!(chat.submit().is_none());
        assert!(chat.thread.messages.is_empty());
        assert!(chat.thread.input.is_empty());
    }

    #[test]
    fn two_sends_before_any_echo_stay_in_order() {
        let mut chat = DirectThread::new(U1.into(), ADMIN.into());
        chat.thread.input = "a".into();
        chat.submit().unwrap();
        chat.thread.input = "b".into();
        chat.submit().unwrap();
        let bodies: Vec<&str> = chat.thread.messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["a", "b"]);
        assert!(chat.thread.messages.iter().all(|m| m.is_optimistic()));
        assert_ne!(chat.thread.messages[0].id, chat.thread.messages[1].id);
    }

    #[test]
    fn self_echo_reconciles_the_optimistic_entry() {
        let mut chat = DirectThread::new(U1.into(), ADMIN.into());
        chat.thread.input = "hello".into();
        chat.submit().unwrap();

        // Server echo of our own send: same body, authoritative id.
        assert!(chat.on_receive(envelope(Some("srv-9"), U1, ADMIN, "hello")));
        assert_eq!(chat.thread.messages.len(), 1, "echo must not duplicate");
        assert_eq!(chat.thread.messages[0].id, "srv-9");

        // A redelivery of the server id is now a plain duplicate.
        assert!(!chat.on_receive(envelope(Some("srv-9"), U1, ADMIN, "hello")));
        assert_eq!(chat.thread.messages.len(), 1);
    }

    // -- inbox (admin variant) ----------------------------------------------

    #[test]
    fn inbound_with_no_selection_only_updates_conversations() {
        let mut inbox = Inbox::new(ME.into());
        inbox.on_receive(envelope(Some("m1"), U1, ME, "hi"));
        assert!(inbox.thread.messages.is_empty(), "no open thread to append to");
        assert_eq!(inbox.conversations.len(), 1);
        let row = &inbox.conversations[0];
        assert_eq!(row.peer_id, U1);
        assert_eq!(row.unread_count, 1);
        assert_eq!(row.last_message_body, "hi");
        assert_eq!(row.display_name, "User 1111");
    }

    #[test]
    fn select_zeroes_only_that_conversation() {
        let mut inbox = Inbox::new(ME.into());
        inbox.on_receive(envelope(Some("m1"), U1, ME, "hi"));
        inbox.on_receive(envelope(Some("m2"), U2, ME, "yo"));
        inbox.on_receive(envelope(Some("m3"), U2, ME, "yo again"));
        assert_eq!(unread_of(&inbox, U1), 1);
        assert_eq!(unread_of(&inbox, U2), 2);

        inbox.select(U2);
        assert_eq!(unread_of(&inbox, U2), 0);
        assert_eq!(unread_of(&inbox, U1), 1, "other counters must not move");
    }

    #[test]
    fn related_inbound_appends_and_keeps_unread_at_zero() {
        let mut inbox = Inbox::new(ME.into());
        inbox.on_receive(envelope(Some("m1"), U1, ME, "hi"));
        let epoch = inbox.select(U1);
        inbox.apply_history(U1, epoch, vec![history_msg("m1", U1, ME, "hi")]);

        inbox.on_receive(envelope(Some("m2"), U1, ME, "still there?"));
        assert_eq!(inbox.thread.messages.len(), 2);
        assert_eq!(unread_of(&inbox, U1), 0);
    }

    #[test]
    fn unrelated_inbound_never_touches_the_open_thread() {
        let mut inbox = Inbox::new(ME.into());
        let epoch = inbox.select(U1);
        inbox.apply_history(U1, epoch, vec![]);

        inbox.on_receive(envelope(Some("m5"), U2, ME, "other thread"));
        assert!(inbox.thread.messages.is_empty());
        assert_eq!(unread_of(&inbox, U2), 1);
    }

    #[test]
    fn conversations_move_to_front_on_activity() {
        let mut inbox = Inbox::new(ME.into());
        inbox.on_receive(envelope(Some("m1"), U1, ME, "first"));
        inbox.on_receive(envelope(Some("m2"), U2, ME, "second"));
        assert_eq!(inbox.conversations[0].peer_id, U2);

        inbox.on_receive(envelope(Some("m3"), U1, ME, "third"));
        assert_eq!(inbox.conversations[0].peer_id, U1);
        assert_eq!(inbox.conversations.len(), 2, "one row per peer");
    }

    #[test]
    fn fresh_user_message_scenario() {
        // Admin with an empty inbox, nothing selected; user U1 says "hi".
        let mut inbox = Inbox::new(ME.into());
        inbox.on_receive(envelope(Some("m1"), U1, ME, "hi"));
        assert_eq!(inbox.conversations.len(), 1);
        assert_eq!(inbox.conversations[0].unread_count, 1);
        assert_eq!(inbox.conversations[0].last_message_body, "hi");

        // Admin opens the conversation: unread drops to 0 and a history
        // load is keyed to the new epoch.
        let epoch = inbox.select(U1);
        assert_eq!(unread_of(&inbox, U1), 0);
        assert!(inbox.apply_history(U1, epoch, vec![history_msg("m1", U1, ME, "hi")]));
        assert_eq!(inbox.thread.messages.len(), 1);
    }

    #[test]
    fn stale_history_is_discarded() {
        let mut inbox = Inbox::new(ME.into());
        let first_epoch = inbox.select(U1);
        inbox.select(U2);

        // The U1 response resolves after the selection moved on.
        assert!(!inbox.apply_history(U1, first_epoch, vec![history_msg("m1", U1, ME, "late")]));
        assert!(inbox.thread.messages.is_empty());
    }

    #[test]
    fn reselecting_the_same_peer_invalidates_older_loads() {
        let mut inbox = Inbox::new(ME.into());
        let old_epoch = inbox.select(U1);
        let new_epoch = inbox.select(U1);
        assert!(!inbox.apply_history(U1, old_epoch, vec![history_msg("m1", U1, ME, "old")]));
        assert!(inbox.apply_history(U1, new_epoch, vec![history_msg("m2", U1, ME, "new")]));
        assert_eq!(inbox.thread.messages[0].id, "m2");
    }

    #[test]
    fn seed_auto_selects_the_first_conversation_once() {
        let mut inbox = Inbox::new(ME.into());
        let snapshot = vec![
            Conversation {
                peer_id: U1.into(),
                display_name: "Sami".into(),
                last_message_body: "hey".into(),
                last_message_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
                unread_count: 3,
            },
            Conversation {
                peer_id: U2.into(),
                display_name: "Nora".into(),
                last_message_body: "hi".into(),
                last_message_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
                unread_count: 1,
            },
        ];
        let picked = inbox.seed(snapshot.clone());
        assert_eq!(picked.as_ref().map(|(p, _)| p.as_str()), Some(U1));
        assert_eq!(unread_of(&inbox, U1), 0, "selection clears unread");

        // A refreshed snapshot while something is selected changes nothing.
        assert!(inbox.seed(snapshot).is_none());
    }

    #[test]
    fn select_offset_walks_the_list() {
        let mut inbox = Inbox::new(ME.into());
        inbox.on_receive(envelope(Some("m1"), U1, ME, "a"));
        inbox.on_receive(envelope(Some("m2"), U2, ME, "b"));
        // List order: [U2, U1]; nothing selected yet.
        let (first, _) = inbox.select_offset(1).unwrap();
        assert_eq!(first, U2);
        let (second, _) = inbox.select_offset(1).unwrap();
        assert_eq!(second, U1);
        assert!(inbox.select_offset(1).is_none(), "already at the end");
        let (back, _) = inbox.select_offset(-1).unwrap();
        assert_eq!(back, U2);
    }

    #[test]
    fn admin_submit_requires_a_selected_peer() {
        let mut inbox = Inbox::new(ME.into());
        inbox.thread.input = "hello".into();
        assert!(inbox.submit().is_none());

        inbox.select(U1);
        inbox.thread.input = "hello".into();
        let out = inbox.submit().unwrap();
        assert_eq!(out.to_user_id.as_deref(), Some(U1));
        assert_eq!(inbox.thread.messages.len(), 1);
        assert!(inbox.thread.messages[0].is_optimistic());
    }

    #[test]
    fn admin_echo_updates_row_without_unread() {
        let mut inbox = Inbox::new(ME.into());
        let epoch = inbox.select(U1);
        inbox.apply_history(U1, epoch, vec![]);
        inbox.thread.input = "on it".into();
        inbox.submit().unwrap();

        // Fan-out echo of the admin's own send.
        inbox.on_receive(envelope(Some("srv-1"), ME, U1, "on it"));
        assert_eq!(inbox.thread.messages.len(), 1);
        assert_eq!(inbox.thread.messages[0].id, "srv-1");
        assert_eq!(unread_of(&inbox, U1), 0);
        assert_eq!(inbox.conversations[0].last_message_body, "on it");
    }

    #[test]
    fn resolve_name_replaces_the_placeholder() {
        let mut inbox = Inbox::new(ME.into());
        inbox.on_receive(envelope(Some("m1"), U1, ME, "hi"));
        assert_eq!(inbox.conversations[0].display_name, "User 1111");
        assert!(inbox.resolve_name(U1, "Sami Haddad".into()));
        assert_eq!(inbox.conversations[0].display_name, "Sami Haddad");
        assert!(!inbox.resolve_name("nobody", "x".into()));
    }

    #[test]
    fn envelope_without_id_gets_a_stable_fallback_key() {
        let mut chat = DirectThread::new(U1.into(), ADMIN.into());
        assert!(chat.on_receive(envelope(None, ADMIN, U1, "no id")));
        assert!(chat.thread.messages[0].id.starts_with(ADMIN));
    }

    fn unread_of(inbox: &Inbox, peer: &str) -> u32 {
        inbox
            .conversations
            .iter()
            .find(|c| c.peer_id == peer)
            .map(|c| c.unread_count)
            .unwrap_or(0)
    }
}
