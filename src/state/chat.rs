use futures_util::{SinkExt, StreamExt};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};

pub use pitchside_api::wire::WireMessage as DmEnvelope;

#[derive(Debug, Clone)]
pub enum ChatCommand {
    /// Outbound direct message. `to_user_id` is set by the admin composer;
    /// the user composer leaves it empty (destination is implicitly the
    /// admin desk, resolved server-side).
    Send {
        to_user_id: Option<String>,
        body: String,
    },
}

#[derive(Debug, Clone)]
pub enum ChatEvent {
    Connected,
    Disconnected,
    Message(DmEnvelope),
    Error(String),
}

/// Client → server frames, tagged by the `event` field on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum ClientFrame {
    #[serde(rename = "dm:user:send")]
    UserSend { message: String },
    #[serde(rename = "dm:admin:send")]
    AdminSend {
        #[serde(rename = "toUserId")]
        to_user_id: String,
        message: String,
    },
}

/// Server → client frames. Only `sender`, `receiver` and `message` may be
/// assumed present on a received envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ServerFrame {
    #[serde(rename = "dm:receive")]
    Receive(DmEnvelope),
}

/// Reconnection policy for the realtime channel: exponential backoff from
/// `base`, saturating at `cap`, giving up after `max_attempts` consecutive
/// failures. The failure counter resets on every successful connect.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

#[derive(Debug)]
pub struct ChatWorker {
    pub url: String,
    pub token: String,
    pub commands: mpsc::Receiver<ChatCommand>,
    pub events: mpsc::Sender<ChatEvent>,
    pub policy: ReconnectPolicy,
}

impl ChatWorker {
    pub async fn run(mut self) {
        let mut pending: Vec<ChatCommand> = Vec::new();
        let mut failures: u32 = 0;
        loop {
            let endpoint = authed_url(&self.url, &self.token);
            match connect_async(endpoint.as_str()).await {
                Ok((stream, _)) => {
                    failures = 0;
                    let _ = self.events.send(ChatEvent::Connected).await;
                    let (mut write, mut read) = stream.split();

                    for cmd in pending.drain(..) {
                        if let Err(e) = send_command(&mut write, cmd).await {
                            let _ = self.events.send(ChatEvent::Error(format!("dm send failed: {e}"))).await;
                        }
                    }

                    loop {
                        tokio::select! {
                            maybe_cmd = self.commands.recv() => {
                                let Some(cmd) = maybe_cmd else {
                                    return;
                                };
                                if let Err(e) = send_command(&mut write, cmd.clone()).await {
                                    pending.push(cmd);
                                    let _ = self.events.send(ChatEvent::Error(format!("dm send failed: {e}"))).await;
                                    let _ = self.events.send(ChatEvent::Disconnected).await;
                                    break;
                                }
                            }
                            inbound = read.next() => {
                                match inbound {
                                    Some(Ok(Message::Text(text))) => {
                                        match serde_json::from_str::<ServerFrame>(&text) {
                                            Ok(ServerFrame::Receive(envelope)) => {
                                                let _ = self.events.send(ChatEvent::Message(envelope)).await;
                                            }
                                            Err(e) => {
                                                debug!("ignoring unrecognized frame: {e}");
                                            }
                                        }
                                    }
                                    Some(Ok(Message::Close(_))) | None => {
                                        let _ = self.events.send(ChatEvent::Disconnected).await;
                                        break;
                                    }
                                    Some(Ok(_)) => {}
                                    Some(Err(e)) => {
                                        let _ = self.events.send(ChatEvent::Error(format!("dm read failed: {e}"))).await;
                                        let _ = self.events.send(ChatEvent::Disconnected).await;
                                        break;
                                    }
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    let _ = self
                        .events
                        .send(ChatEvent::Error(format!("dm connect failed: {e}")))
                        .await;
                    let _ = self.events.send(ChatEvent::Disconnected).await;
                }
            }

            loop {
                match self.commands.try_recv() {
                    Ok(cmd) => pending.push(cmd),
                    Err(tokio::sync::mpsc::error::TryRecvError::Empty) => break,
                    Err(tokio::sync::mpsc::error::TryRecvError::Disconnected) => return,
                }
            }

            failures += 1;
            if failures >= self.policy.max_attempts {
                let _ = self
                    .events
                    .send(ChatEvent::Error(format!(
                        "chat offline: giving up after {failures} attempts"
                    )))
                    .await;
                return;
            }
            sleep(self.policy.delay(failures - 1)).await;
        }
    }
}

async fn send_command<S>(write: &mut S, cmd: ChatCommand) -> Result<(), String>
where
    S: futures_util::sink::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    match cmd {
        ChatCommand::Send { to_user_id, body } => {
            let frame = match to_user_id {
                Some(to_user_id) => ClientFrame::AdminSend { to_user_id, message: body },
                None => ClientFrame::UserSend { message: body },
            };
            let text = serde_json::to_string(&frame).map_err(|e| e.to_string())?;
            write
                .send(Message::Text(text.into()))
                .await
                .map_err(|e| e.to_string())
        }
    }
}

/// Bearer credential travels in the connect URL's query string.
fn authed_url(url: &str, token: &str) -> String {
    if url.contains('?') {
        format!("{url}&token={token}")
    } else {
        format!("{url}?token={token}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_saturates_at_cap() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(4), Duration::from_secs(16));
        assert_eq!(policy.delay(5), Duration::from_secs(30));
        assert_eq!(policy.delay(60), Duration::from_secs(30));
    }

    #[test]
    fn authed_url_appends_token() {
        assert_eq!(
            authed_url("ws://127.0.0.1:8787", "abc"),
            "ws://127.0.0.1:8787?token=abc"
        );
        assert_eq!(
            authed_url("ws://host/ws?v=2", "abc"),
            "ws://host/ws?v=2&token=abc"
        );
    }

    #[test]
    fn user_send_frame_carries_event_tag() {
        let frame = ClientFrame::UserSend { message: "hi".into() };
        let text = serde_json::to_string(&frame).unwrap();
        assert_eq!(text, r#"{"event":"dm:user:send","message":"hi"}"#);
    }

    #[test]
    fn admin_send_frame_targets_a_peer() {
        let frame = ClientFrame::AdminSend {
            to_user_id: "u1".into(),
            message: "hello".into(),
        };
        let value: serde_json::Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["event"], "dm:admin:send");
        assert_eq!(value["toUserId"], "u1");
        assert_eq!(value["message"], "hello");
    }

    #[test]
    fn receive_frame_tolerates_minimal_envelope() {
        let raw = r#"{"event":"dm:receive","sender":"u1","receiver":"a1","message":"hi"}"#;
        let ServerFrame::Receive(envelope) = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.sender, "u1");
        assert_eq!(envelope.receiver, "a1");
        assert_eq!(envelope.message, "hi");
        assert!(envelope.id.is_none());
        assert!(envelope.created_at.is_none());
    }

    #[test]
    fn receive_frame_accepts_full_envelope() {
        let raw = r#"{"event":"dm:receive","_id":"m9","sender":"a1","receiver":"u1","message":"ok","createdAt":"2026-03-01T12:00:00Z"}"#;
        let ServerFrame::Receive(envelope) = serde_json::from_str(raw).unwrap();
        let msg = envelope.into_domain();
        assert_eq!(msg.id, "m9");
        assert_eq!(msg.created_at.to_rfc3339(), "2026-03-01T12:00:00+00:00");
    }
}
