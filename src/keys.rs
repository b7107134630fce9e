use crate::app::{App, MenuItem};
use crate::state::chat::ChatCommand;
use crate::state::messages::NetworkRequest;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    chat_commands: &mpsc::Sender<ChatCommand>,
) {
    let mut guard = app.lock().await;

    // Composer capture comes first: while editing, printable keys belong to
    // the input buffer, not to the bindings below.
    if guard.state.active_tab == MenuItem::Chat && guard.state.chat.thread().composing {
        match (key_event.code, key_event.modifiers) {
            (Char('c'), KeyModifiers::CONTROL) => {
                crate::cleanup_terminal();
                std::process::exit(0);
            }
            (KeyCode::Esc, _) => guard.state.chat.thread_mut().composing = false,
            (KeyCode::Enter, _) => {
                if let Some(cmd) = guard.submit_message() {
                    drop(guard);
                    let _ = chat_commands.send(cmd).await;
                }
                return;
            }
            (KeyCode::Backspace, _) => {
                guard.state.chat.thread_mut().input.pop();
            }
            (Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                guard.state.chat.thread_mut().input.push(c);
            }
            _ => {}
        }
        return;
    }

    if guard.state.active_tab == MenuItem::Summary && guard.state.summary.editing {
        match (key_event.code, key_event.modifiers) {
            (Char('c'), KeyModifiers::CONTROL) => {
                crate::cleanup_terminal();
                std::process::exit(0);
            }
            (KeyCode::Esc | KeyCode::Enter, _) => guard.state.summary.editing = false,
            (KeyCode::Backspace, _) => {
                let field = guard.state.summary.selected_field;
                guard.state.summary.field_mut(field).pop();
            }
            (Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                let field = guard.state.summary.selected_field;
                guard.state.summary.field_mut(field).push(c);
            }
            _ => {}
        }
        return;
    }

    let mut selection_changed: Option<(String, u64)> = None;

    match (guard.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }

        // Tab switching
        (_, Char('1'), _) => guard.update_tab(MenuItem::Chat),
        (_, Char('2'), _) => guard.update_tab(MenuItem::Summary),
        (_, Char('?'), _) => guard.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => guard.exit_help(),

        // Chat: open the composer
        (MenuItem::Chat, Char('i') | KeyCode::Enter, _) => {
            guard.state.chat.thread_mut().composing = true;
        }

        // Chat: inbox selection (admin only; no-op for the user variant)
        (MenuItem::Chat, Char('J'), _) | (MenuItem::Chat, Char('n'), KeyModifiers::CONTROL) => {
            if let Some(inbox) = guard.state.chat.inbox_mut() {
                selection_changed = inbox.select_offset(1);
            }
        }
        (MenuItem::Chat, Char('K'), _) | (MenuItem::Chat, Char('p'), KeyModifiers::CONTROL) => {
            if let Some(inbox) = guard.state.chat.inbox_mut() {
                selection_changed = inbox.select_offset(-1);
            }
        }

        // Chat: thread scrolling
        (MenuItem::Chat, Char('j') | KeyCode::Down, _) => {
            let thread = guard.state.chat.thread_mut();
            thread.scroll_offset = thread.scroll_offset.saturating_sub(1);
        }
        (MenuItem::Chat, Char('k') | KeyCode::Up, _) => {
            let thread = guard.state.chat.thread_mut();
            thread.scroll_offset = thread.scroll_offset.saturating_add(1);
        }

        // Summary form
        (MenuItem::Summary, Char('j') | KeyCode::Down | KeyCode::Tab, _) => {
            guard.state.summary.next_field();
        }
        (MenuItem::Summary, Char('k') | KeyCode::Up, _) => {
            guard.state.summary.prev_field();
        }
        (MenuItem::Summary, Char('i') | KeyCode::Enter, _) => {
            guard.state.summary.editing = true;
        }
        (MenuItem::Summary, Char('s'), _) => {
            if !guard.state.summary.requesting {
                guard.state.summary.requesting = true;
                guard.state.summary.response = None;
                let request = guard.state.summary.request.clone();
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::RequestSummary { request })
                    .await;
                return;
            }
        }

        // Global
        (_, Char('f'), _) => guard.toggle_full_screen(),
        (_, Char('"'), _) => guard.toggle_show_logs(),

        _ => {}
    }

    // A new conversation was opened: load its history and resolve the peer's
    // display name in the background.
    if let Some((peer_id, epoch)) = selection_changed {
        drop(guard);
        let _ = network_requests
            .send(NetworkRequest::LoadHistory { peer_id: peer_id.clone(), epoch })
            .await;
        let _ = network_requests
            .send(NetworkRequest::LookupUser { user_id: peer_id })
            .await;
    }
}
