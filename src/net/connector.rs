//! WebSocket transport
//!
//! A [`Connection`] is a pair of bounded channels backed by a reader and a
//! writer task. Dropping or closing it cancels both tasks.

use async_trait::async_trait;
use async_tungstenite::tokio::connect_async;
use async_tungstenite::tungstenite::client::IntoClientRequest;
use async_tungstenite::tungstenite::http::HeaderValue;
use async_tungstenite::tungstenite::http::header::AUTHORIZATION;
use async_tungstenite::tungstenite::{Message, Utf8Bytes};
use bytes::Bytes;
use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::assets::CHANNEL_CAPACITY;
use crate::config::Endpoint;
use crate::error::{Result, ViewerError};

/// Payload received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Bytes),
}

#[derive(Debug)]
pub enum ConnectionEvent {
    Message(Inbound),
    /// Read or write failure; a `Closed` event always follows
    Error(ViewerError),
    Closed,
}

/// Handle on an open transport
pub struct Connection {
    events: mpsc::Receiver<ConnectionEvent>,
    outbound: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl Connection {
    pub fn new(
        events: mpsc::Receiver<ConnectionEvent>,
        outbound: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            events,
            outbound,
            cancel,
        }
    }

    /// Next transport event; `None` once the transport tasks are gone.
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        self.events.recv().await
    }

    /// Queue a text message without waiting. Returns false if it was dropped.
    pub fn send(&self, text: String) -> bool {
        self.outbound.try_send(text).is_ok()
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Resolves once the transport is open
    async fn connect(&self, endpoint: &Endpoint) -> Result<Connection>;
}

/// Connects with async-tungstenite over tokio
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Connection> {
        let mut request = endpoint
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ViewerError::Transport(format!("{}: {}", endpoint.url, e)))?;

        if let Some(token) = &endpoint.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ViewerError::Transport(format!("Invalid token: {e}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| ViewerError::Transport(e.to_string()))?;
        info!("Connected to {}", endpoint.url);

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let reader_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    _ = reader_cancel.cancelled() => break,
                    msg = ws_receiver.next() => msg,
                };

                let event = match msg {
                    Some(Ok(Message::Text(text))) => {
                        ConnectionEvent::Message(Inbound::Text(text.as_str().to_owned()))
                    }
                    Some(Ok(Message::Binary(data))) => {
                        ConnectionEvent::Message(Inbound::Binary(data))
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!("Server closed the connection: {:?}", frame);
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        let _ = event_tx
                            .send(ConnectionEvent::Error(ViewerError::Transport(e.to_string())))
                            .await;
                        break;
                    }
                    None => break,
                };

                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
            reader_cancel.cancel();
            let _ = event_tx.send(ConnectionEvent::Closed).await;
        });

        let writer_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                let text = tokio::select! {
                    _ = writer_cancel.cancelled() => break,
                    text = outbound_rx.recv() => match text {
                        Some(text) => text,
                        None => break,
                    },
                };

                if let Err(e) = ws_sender.send(Message::Text(Utf8Bytes::from(text))).await {
                    warn!("WebSocket write failed: {}", e);
                    writer_cancel.cancel();
                    break;
                }
            }
            let _ = ws_sender.close(None).await;
        });

        Ok(Connection::new(event_rx, outbound_tx, cancel))
    }
}
