mod app;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::App;
use crate::state::app_settings::AppSettings;
use crate::state::chat::{ChatCommand, ChatEvent, ChatWorker, ReconnectPolicy};
use crate::state::identity::{AuthSession, Role};
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, NetworkWorker};
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use log::error;
use pitchside_api::client::ChatApi;
use std::io::Stdout;
use std::sync::Arc;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc};
use tui::{Terminal, backend::CrosstermBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if handle_cli_args() {
        return Ok(());
    }

    better_panic::install();

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal();

    tui_logger::init_logger(log::LevelFilter::Error)?;
    tui_logger::set_default_level(log::LevelFilter::Error);

    let settings = AppSettings::load();
    let session = AuthSession::load();
    let token = session.as_ref().map(|s| s.token.clone());
    let identity = session.map(|s| s.identity);

    let app = Arc::new(Mutex::new(App::new(settings.clone(), identity)));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);
    let (chat_cmd_tx, chat_cmd_rx) = mpsc::channel::<ChatCommand>(100);
    let (chat_evt_tx, chat_evt_rx) = mpsc::channel::<ChatEvent>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Network thread
    let client = ChatApi::new(settings.api_base.clone(), token.clone());
    let network_worker = NetworkWorker::new(client, network_req_rx, network_resp_tx);
    let network_task = tokio::spawn(network_worker.run());

    // Realtime channel thread. Without a session there is no credential to
    // connect with; the worker stays unstarted and the UI reads offline.
    let chat_task = token.map(|token| {
        let chat_worker = ChatWorker {
            url: settings.chat_ws.clone(),
            token,
            commands: chat_cmd_rx,
            events: chat_evt_tx,
            policy: ReconnectPolicy::default(),
        };
        tokio::spawn(chat_worker.run())
    });

    // Trigger the initial load on startup
    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    main_ui_loop(
        terminal,
        app,
        ui_event_rx,
        network_req_tx,
        network_resp_rx,
        chat_cmd_tx,
        chat_evt_rx,
    )
    .await;

    input_handler.abort();
    network_task.abort();
    if let Some(task) = chat_task {
        task.abort();
    }

    Ok(())
}

fn handle_cli_args() -> bool {
    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        return false;
    };

    match arg.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            true
        }
        "-V" | "--version" => {
            println!("pitchside {}", env!("CARGO_PKG_VERSION"));
            true
        }
        _ => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
}

fn usage_text() -> &'static str {
    "pitchside - tournament direct-message terminal client

Usage:
  pitchside
  pitchside --help
  pitchside --version

Session:
  Reads ~/.config/pitchside/session.json:
    {\"id\": \"<user id>\", \"role\": \"user|admin\", \"token\": \"<bearer token>\"}

Environment:
  PITCHSIDE_API_BASE   Backend HTTP base URL (default http://127.0.0.1:8008)
  PITCHSIDE_CHAT_WS    Realtime channel URL (default ws://127.0.0.1:8787)
  PITCHSIDE_ADMIN_ID   Admin desk account id
  PITCHSIDE_LOG        Log level filter (error, warn, info, debug, trace)"
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
    chat_commands: mpsc::Sender<ChatCommand>,
    mut chat_events: mpsc::Receiver<ChatEvent>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &network_requests, &chat_commands).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                let should_redraw =
                    handle_network_response(response, &app, &network_requests, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(chat_event) = chat_events.recv() => {
                let should_redraw = handle_chat_response(chat_event, &app).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    chat_commands: &mpsc::Sender<ChatCommand>,
) -> bool {
    match ui_event {
        UiEvent::AppStarted => {
            let guard = app.lock().await;
            let request = match &guard.identity {
                Some(me) if me.role == Role::Admin => Some(NetworkRequest::LoadInbox),
                // The user's single thread loads straight away; history with
                // the admin desk is keyed by the admin account id.
                Some(_) => Some(NetworkRequest::LoadHistory {
                    peer_id: guard.settings.admin_id.clone(),
                    epoch: 0,
                }),
                None => None,
            };
            drop(guard);
            if let Some(request) = request {
                let _ = network_requests.send(request).await;
            }
            true
        }
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, network_requests, chat_commands).await;
            true
        }
        UiEvent::Resize => true,
    }
}

async fn handle_chat_response(response: ChatEvent, app: &Arc<Mutex<App>>) -> bool {
    let mut guard = app.lock().await;
    match response {
        ChatEvent::Connected => {
            guard.on_chat_connected();
            true
        }
        ChatEvent::Disconnected => {
            guard.on_chat_disconnected();
            true
        }
        ChatEvent::Message(envelope) => guard.on_dm_received(envelope),
        ChatEvent::Error(message) => {
            guard.on_chat_error(message);
            true
        }
    }
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    loading: &mut LoadingState,
) -> bool {
    match response {
        NetworkResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
            return true;
        }
        NetworkResponse::InboxLoaded(conversations) => {
            let mut guard = app.lock().await;
            let auto_selected = guard.on_inbox_loaded(conversations);
            drop(guard);
            if let Some((peer_id, epoch)) = auto_selected {
                let _ = network_requests
                    .send(NetworkRequest::LoadHistory { peer_id: peer_id.clone(), epoch })
                    .await;
                let _ = network_requests
                    .send(NetworkRequest::LookupUser { user_id: peer_id })
                    .await;
            }
        }
        NetworkResponse::HistoryLoaded { peer_id, epoch, messages } => {
            let mut guard = app.lock().await;
            guard.on_history_loaded(&peer_id, epoch, messages);
        }
        NetworkResponse::UserResolved { user_id, display_name } => {
            let mut guard = app.lock().await;
            guard.on_user_resolved(&user_id, display_name);
        }
        NetworkResponse::SummaryReady(text) => {
            let mut guard = app.lock().await;
            guard.on_summary_ready(text);
        }
        NetworkResponse::Error(message) => {
            error!("Network error: {message}");
            let mut guard = app.lock().await;
            guard.on_error(message);
        }
    }
    !loading.is_loading
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        if let Ok(event) = crossterm_event::read() {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Resize(_, _) => Some(UiEvent::Resize),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.send(ui_event).await.is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide).unwrap();
    execute!(stdout, terminal::EnterAlternateScreen).unwrap();
    execute!(stdout, terminal::Clear(terminal::ClearType::All)).unwrap();
    terminal::enable_raw_mode().unwrap();
}

pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::MoveTo(0, 0)).unwrap();
    execute!(stdout, terminal::Clear(terminal::ClearType::All)).unwrap();
    execute!(stdout, terminal::LeaveAlternateScreen).unwrap();
    execute!(stdout, cursor::Show).unwrap();
    terminal::disable_raw_mode().unwrap();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}
