use crate::state::app_settings::AppSettings;
use crate::state::app_state::{AppState, ChatView, DirectThread, Inbox, OutboundDm};
use crate::state::chat::{ChatCommand, DmEnvelope};
use crate::state::identity::{Identity, Role};
use pitchside_api::{Conversation, DirectMessage};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Chat,
    Summary,
    Help,
}

pub struct App {
    pub settings: AppSettings,
    pub identity: Option<Identity>,
    pub state: AppState,
}

impl App {
    pub fn new(settings: AppSettings, identity: Option<Identity>) -> Self {
        let chat = match &identity {
            Some(me) if me.role == Role::Admin => ChatView::Inbox(Inbox::new(me.id.clone())),
            Some(me) => ChatView::Direct(DirectThread::new(
                me.id.clone(),
                settings.admin_id.clone(),
            )),
            // Not logged in: an inert direct view. The realtime worker is
            // never started without a session, so nothing ever lands here.
            None => ChatView::Direct(DirectThread::new(String::new(), settings.admin_id.clone())),
        };

        let mut state = AppState::new(chat);
        if identity.is_none() {
            state.status = Some("not logged in - run `pitchside --help` for setup".to_string());
        }

        let app = Self { settings, identity, state };

        if let Some(level) = app.settings.log_level {
            log::set_max_level(level);
            tui_logger::set_default_level(level);
        }

        app
    }

    pub fn is_admin(&self) -> bool {
        matches!(&self.identity, Some(me) if me.role == Role::Admin)
    }

    // -----------------------------------------------------------------------
    // Network response handlers — called from main_ui_loop
    // -----------------------------------------------------------------------

    /// Inbox snapshot arrived. When this auto-selects the first conversation,
    /// the returned peer/epoch pair must trigger a history load.
    pub fn on_inbox_loaded(&mut self, conversations: Vec<Conversation>) -> Option<(String, u64)> {
        self.state.last_error = None;
        self.state.chat.inbox_mut()?.seed(conversations)
    }

    pub fn on_history_loaded(&mut self, peer_id: &str, epoch: u64, messages: Vec<DirectMessage>) {
        self.state.last_error = None;
        match &mut self.state.chat {
            ChatView::Inbox(inbox) => {
                inbox.apply_history(peer_id, epoch, messages);
            }
            // The user's single thread has no selection to go stale.
            ChatView::Direct(direct) => direct.thread.seed_history(messages),
        }
    }

    pub fn on_user_resolved(&mut self, user_id: &str, display_name: String) {
        if let Some(inbox) = self.state.chat.inbox_mut() {
            inbox.resolve_name(user_id, display_name);
        }
    }

    pub fn on_dm_received(&mut self, envelope: DmEnvelope) -> bool {
        self.state.chat.on_receive(envelope)
    }

    pub fn on_summary_ready(&mut self, text: String) {
        self.state.summary.requesting = false;
        self.state.summary.response = Some(text);
    }

    pub fn on_error(&mut self, message: String) {
        self.state.summary.requesting = false;
        self.state.last_error = Some(message);
    }

    // -----------------------------------------------------------------------
    // Realtime channel lifecycle
    // -----------------------------------------------------------------------

    pub fn on_chat_connected(&mut self) {
        self.state.connected = true;
        self.state.status = Some(format!("connected to {}", self.settings.chat_ws));
    }

    pub fn on_chat_disconnected(&mut self) {
        if self.state.connected {
            self.state.status = Some("chat disconnected, retrying...".to_string());
        }
        self.state.connected = false;
    }

    pub fn on_chat_error(&mut self, message: String) {
        self.state.status = Some(format!("chat error: {message}"));
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) {
        if self.state.active_tab == next {
            return;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
        if self.state.active_tab == MenuItem::Chat {
            self.state.chat.thread_mut().scroll_offset = 0;
        }
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    // -----------------------------------------------------------------------
    // Composer
    // -----------------------------------------------------------------------

    /// Submit the composer buffer: appends the optimistic entry and returns
    /// the command for the realtime worker. No-op when the input is blank or
    /// the admin has no conversation open.
    pub fn submit_message(&mut self) -> Option<ChatCommand> {
        let OutboundDm { to_user_id, body } = self.state.chat.submit()?;
        Some(ChatCommand::Send { to_user_id, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            id: match role {
                Role::Admin => "admin-1".into(),
                Role::User => "user-1".into(),
            },
            role,
            display_name: None,
        }
    }

    fn app(role: Role) -> App {
        App::new(AppSettings::default(), Some(identity(role)))
    }

    #[test]
    fn role_picks_the_chat_variant() {
        assert!(matches!(app(Role::Admin).state.chat, ChatView::Inbox(_)));
        assert!(matches!(app(Role::User).state.chat, ChatView::Direct(_)));
    }

    #[test]
    fn user_submit_produces_user_send() {
        let mut app = app(Role::User);
        app.state.chat.thread_mut().input = "hello".into();
        let cmd = app.submit_message().unwrap();
        assert!(matches!(cmd, ChatCommand::Send { to_user_id: None, .. }));
    }

    #[test]
    fn admin_submit_targets_the_selected_peer() {
        let mut app = app(Role::Admin);
        assert!(app.submit_message().is_none(), "nothing selected yet");

        app.state.chat.inbox_mut().unwrap().select("user-7");
        app.state.chat.thread_mut().input = "on it".into();
        let cmd = app.submit_message().unwrap();
        match cmd {
            ChatCommand::Send { to_user_id, body } => {
                assert_eq!(to_user_id.as_deref(), Some("user-7"));
                assert_eq!(body, "on it");
            }
        }
    }

    #[test]
    fn inbox_load_auto_selects_and_requests_history() {
        let mut app = app(Role::Admin);
        let picked = app.on_inbox_loaded(vec![Conversation {
            peer_id: "user-7".into(),
            display_name: "Nora".into(),
            last_message_body: "hi".into(),
            last_message_at: chrono::Utc::now(),
            unread_count: 2,
        }]);
        assert_eq!(picked.as_ref().map(|(p, _)| p.as_str()), Some("user-7"));
    }

    #[test]
    fn help_returns_to_previous_tab() {
        let mut app = app(Role::User);
        app.update_tab(MenuItem::Summary);
        app.update_tab(MenuItem::Help);
        app.exit_help();
        assert_eq!(app.state.active_tab, MenuItem::Summary);
    }
}
