use crate::state::network::LoadingState;
use crossterm::event::KeyEvent;
use pitchside_api::{Conversation, DirectMessage, SummaryRequest};

/// Requests the UI sends to the network worker.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkRequest {
    LoadInbox,
    /// Load the persisted thread with one peer. The epoch is echoed back in
    /// the response so a selection change can invalidate in-flight loads.
    LoadHistory {
        peer_id: String,
        epoch: u64,
    },
    LookupUser {
        user_id: String,
    },
    RequestSummary {
        request: SummaryRequest,
    },
}

/// Responses flowing back from the network worker to the UI loop.
#[derive(Debug, Clone)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    InboxLoaded(Vec<Conversation>),
    HistoryLoaded {
        peer_id: String,
        epoch: u64,
        messages: Vec<DirectMessage>,
    },
    UserResolved {
        user_id: String,
        display_name: String,
    },
    SummaryReady(String),
    Error(String),
}

/// Terminal events forwarded to the UI loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    AppStarted,
}
