use crate::wire::{ConversationsResponse, HistoryResponse, SummaryResponse, WireUser};
use crate::{Conversation, DirectMessage, SummaryRequest, UserProfile};
use reqwest::Client;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

/// Chat backend client. All requests carry the session's bearer token; the
/// token is fixed for the lifetime of the client (one session, one identity).
#[derive(Debug, Clone)]
pub struct ChatApi {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ChatApi {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::builder()
                .user_agent("pitchside/0.1 (terminal chat client)")
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            timeout: Duration::from_secs(10),
        }
    }

    /// Fetch the admin inbox snapshot: one row per peer with an open thread,
    /// most recent first as the server orders it.
    pub async fn fetch_inbox(&self) -> ApiResult<Vec<Conversation>> {
        let url = format!("{}/api/chat/conversations", self.base_url);
        let raw: ConversationsResponse = self.get(&url).await?;
        Ok(raw.into_conversations())
    }

    /// Fetch the persisted thread with one peer, oldest message first.
    /// Callers must preserve this order when appending realtime messages.
    pub async fn fetch_history(&self, peer_id: &str) -> ApiResult<Vec<DirectMessage>> {
        let url = format!("{}/api/chat/history/{peer_id}", self.base_url);
        let raw: HistoryResponse = self.get(&url).await?;
        Ok(raw.into_messages())
    }

    /// Resolve a peer id into a display name.
    pub async fn fetch_user(&self, user_id: &str) -> ApiResult<UserProfile> {
        let url = format!("{}/api/users/{user_id}", self.base_url);
        let raw: WireUser = self.get(&url).await?;
        Ok(raw.into_domain())
    }

    /// AI match-summary proxy. The backend owns the model call; this is a
    /// plain request/response returning the generated text.
    pub async fn request_summary(&self, request: &SummaryRequest) -> ApiResult<String> {
        let url = format!("{}/api/ai/chat", self.base_url);
        let response = self
            .authorized(self.client.post(&url))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.clone()))?;

        let raw: SummaryResponse = response
            .error_for_status()
            .map_err(|e| ApiError::Api(e, url.clone()))?
            .json()
            .await
            .map_err(|e| ApiError::Parsing(e, url))?;
        Ok(raw.text)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get<T: Default + serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self
            .authorized(self.client.get(url))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.to_owned())),
            Err(e) => {
                // 4xx (expired token, unknown peer) degrades to the empty
                // state; only server/network trouble surfaces as an error.
                if e.status().map(|s| s.is_client_error()).unwrap_or(false) {
                    Ok(T::default())
                } else {
                    Err(ApiError::Api(e, url.to_owned()))
                }
            }
        }
    }
}
