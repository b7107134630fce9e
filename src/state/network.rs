use crate::state::messages::{NetworkRequest, NetworkResponse};
use log::{debug, error};
use pitchside_api::client::{ApiError, ChatApi};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

pub struct NetworkWorker {
    client: ChatApi,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    is_loading: Arc<AtomicBool>,
}

impl NetworkWorker {
    pub fn new(
        client: ChatApi,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self {
            client,
            requests,
            responses,
            is_loading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            self.start_loading_animation().await;

            let result = match request {
                NetworkRequest::LoadInbox => self.handle_load_inbox().await,
                NetworkRequest::LoadHistory { peer_id, epoch } => {
                    self.handle_load_history(peer_id, epoch).await
                }
                NetworkRequest::LookupUser { user_id } => self.handle_lookup_user(user_id).await,
                NetworkRequest::RequestSummary { request } => {
                    self.handle_request_summary(request).await
                }
            };

            debug!("network request complete");
            self.stop_loading_animation(result.is_ok()).await;

            let response =
                result.unwrap_or_else(|err| NetworkResponse::Error(err.to_string()));

            if let Err(e) = self.responses.send(response).await {
                error!("Failed to send network response: {e}");
                break;
            }
        }
    }

    async fn handle_load_inbox(&self) -> Result<NetworkResponse, ApiError> {
        debug!("loading conversation inbox");
        let conversations = self.client.fetch_inbox().await?;
        Ok(NetworkResponse::InboxLoaded(conversations))
    }

    async fn handle_load_history(
        &self,
        peer_id: String,
        epoch: u64,
    ) -> Result<NetworkResponse, ApiError> {
        debug!("loading message history with {peer_id} (epoch {epoch})");
        let messages = self.client.fetch_history(&peer_id).await?;
        Ok(NetworkResponse::HistoryLoaded { peer_id, epoch, messages })
    }

    async fn handle_lookup_user(&self, user_id: String) -> Result<NetworkResponse, ApiError> {
        debug!("resolving display name for {user_id}");
        let profile = self.client.fetch_user(&user_id).await?;
        let display_name = profile.display_name();
        Ok(NetworkResponse::UserResolved { user_id, display_name })
    }

    async fn handle_request_summary(
        &self,
        request: pitchside_api::SummaryRequest,
    ) -> Result<NetworkResponse, ApiError> {
        debug!("requesting AI match summary");
        let text = self.client.request_summary(&request).await?;
        Ok(NetworkResponse::SummaryReady(text))
    }

    async fn start_loading_animation(&self) {
        self.is_loading.store(true, Ordering::Relaxed);

        let mut loading_state =
            LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                let _ = responses
                    .send(NetworkResponse::LoadingStateChanged { loading_state })
                    .await;
            }
        });
    }

    async fn stop_loading_animation(&self, is_ok: bool) {
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged {
                loading_state: LoadingState { is_loading: false, spinner_char },
            })
            .await;
    }
}
