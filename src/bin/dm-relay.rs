//! Development relay for the realtime channel. Accepts the same frames the
//! production backend does, stamps ids and timestamps, and fans every message
//! out to all connected clients. Identity comes straight from the connect
//! token, untrusted and unverified; this is a local dev tool only.

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use pitchside_api::wire::WireMessage;
use serde::Deserialize;
use serde_json::json;
use std::env;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};

const DEFAULT_ADMIN_ID: &str = "694e945afc34aa398d1baa1b";

#[derive(Debug, Deserialize)]
#[serde(tag = "event")]
enum InboundFrame {
    #[serde(rename = "dm:user:send")]
    UserSend { message: String },
    #[serde(rename = "dm:admin:send")]
    AdminSend {
        #[serde(rename = "toUserId")]
        to_user_id: String,
        message: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let addr = env::var("PITCHSIDE_RELAY_BIND").unwrap_or_else(|_| "0.0.0.0:8787".to_string());
    let admin_id = env::var("PITCHSIDE_ADMIN_ID").unwrap_or_else(|_| DEFAULT_ADMIN_ID.to_string());
    let listener = TcpListener::bind(&addr).await?;
    let (tx, _rx) = broadcast::channel::<String>(512);

    eprintln!("dm relay listening on {addr} (admin id {admin_id})");

    loop {
        let (stream, peer) = listener.accept().await?;
        let tx = tx.clone();
        let rx = tx.subscribe();
        let admin_id = admin_id.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, tx, rx, admin_id).await {
                eprintln!("client {peer} disconnected: {e}");
            }
        });
    }
}

async fn handle_client(
    stream: TcpStream,
    tx: broadcast::Sender<String>,
    mut rx: broadcast::Receiver<String>,
    admin_id: String,
) -> anyhow::Result<()> {
    let mut sender_id = String::new();
    let ws = accept_hdr_async(stream, |req: &Request, resp: Response| {
        sender_id = token_from_query(req.uri().query());
        Ok(resp)
    })
    .await?;
    let (mut write, mut read) = ws.split();

    let mut seq: u64 = 0;
    loop {
        tokio::select! {
            inbound = read.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<InboundFrame>(&text) {
                            Ok(frame) => {
                                seq += 1;
                                let envelope = stamp(frame, &sender_id, &admin_id, seq);
                                let _ = tx.send(envelope);
                            }
                            Err(e) => eprintln!("ignoring unrecognized frame: {e}"),
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {}
                    Some(Ok(Message::Ping(_))) => {}
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => return Err(e.into()),
                }
            }
            outbound = rx.recv() => {
                match outbound {
                    Ok(text) => {
                        write.send(Message::Text(text.into())).await?;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    Ok(())
}

/// Build the `dm:receive` fan-out frame: server-assigned id, server clock,
/// routing resolved (user sends go to the admin desk).
fn stamp(frame: InboundFrame, sender_id: &str, admin_id: &str, seq: u64) -> String {
    let (receiver, message) = match frame {
        InboundFrame::UserSend { message } => (admin_id.to_string(), message),
        InboundFrame::AdminSend { to_user_id, message } => (to_user_id, message),
    };
    let envelope = WireMessage {
        id: Some(format!("{sender_id}-{}-{seq}", Utc::now().timestamp_millis())),
        sender: sender_id.to_string(),
        receiver,
        message,
        created_at: Some(Utc::now().to_rfc3339()),
    };
    let mut value = serde_json::to_value(&envelope).unwrap_or_default();
    value["event"] = json!("dm:receive");
    value.to_string()
}

fn token_from_query(query: Option<&str>) -> String {
    query
        .unwrap_or("")
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .unwrap_or("anonymous")
        .to_string()
}
