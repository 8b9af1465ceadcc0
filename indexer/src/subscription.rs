//! Live websocket subscription to the indexer.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::IndexerError;
use crate::frame::FeedFrame;
use crate::source::FrameSource;
use crate::wire::{join_errors, ClientMessage, ServerMessage, SUBPROTOCOL};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Id of the single operation multiplexed on the connection.
const OPERATION_ID: &str = "1";

/// An open `unshieldedTransactions` subscription for one address.
pub struct Subscription {
    endpoint: String,
    socket: Socket,
}

impl Subscription {
    /// Open the websocket with the `graphql-transport-ws` subprotocol.
    pub async fn connect(endpoint: &str) -> Result<Self, IndexerError> {
        let mut request = endpoint
            .into_client_request()
            .map_err(|e| IndexerError::connection(endpoint, format!("invalid endpoint: {e}")))?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUBPROTOCOL));

        let (socket, _response) = connect_async(request)
            .await
            .map_err(|e| IndexerError::connection(endpoint, e))?;
        debug!(endpoint, "connected to indexer");

        Ok(Self {
            endpoint: endpoint.to_string(),
            socket,
        })
    }

    /// Complete the `connection_init` handshake and subscribe to `address`.
    ///
    /// On failure the socket is still open; release it with [`Self::abandon`].
    pub async fn subscribe(&mut self, address: &str) -> Result<(), IndexerError> {
        self.send(&ClientMessage::ConnectionInit {
            payload: serde_json::json!({}),
        })
        .await?;
        self.await_ack().await?;
        self.send(&ClientMessage::subscribe(OPERATION_ID, address))
            .await?;
        debug!(endpoint = %self.endpoint, address, "subscribed to unshielded transactions");
        Ok(())
    }

    /// Close a connection whose subscription never started.
    pub async fn abandon(mut self) {
        if let Err(e) = self.socket.close(None).await {
            debug!(endpoint = %self.endpoint, "websocket close failed: {e}");
        }
    }

    async fn send(&mut self, message: &ClientMessage) -> Result<(), IndexerError> {
        let text = message.to_json()?;
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|e| IndexerError::connection(&self.endpoint, e))
    }

    async fn await_ack(&mut self) -> Result<(), IndexerError> {
        loop {
            match self.read_message().await? {
                Some(ServerMessage::ConnectionAck) => return Ok(()),
                Some(ServerMessage::Ping) => self.send(&ClientMessage::Pong).await?,
                Some(ServerMessage::Error { payload, .. }) => {
                    return Err(IndexerError::Server(join_errors(&payload)))
                }
                Some(other) => trace!(?other, "ignoring message before ack"),
                None => {
                    return Err(IndexerError::connection(
                        &self.endpoint,
                        "connection closed during handshake",
                    ))
                }
            }
        }
    }

    /// Next protocol message, skipping websocket control frames.
    /// `Ok(None)` when the socket is closed.
    async fn read_message(&mut self) -> Result<Option<ServerMessage>, IndexerError> {
        loop {
            let Some(message) = self.socket.next().await else {
                return Ok(None);
            };
            match message.map_err(|e| IndexerError::connection(&self.endpoint, e))? {
                Message::Text(text) => return ServerMessage::parse(&text).map(Some),
                Message::Close(frame) => {
                    debug!(endpoint = %self.endpoint, ?frame, "indexer closed the connection");
                    return Ok(None);
                }
                // Pings are answered by tungstenite itself.
                _ => continue,
            }
        }
    }
}

impl FrameSource for Subscription {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn next_frame(&mut self) -> Result<Option<FeedFrame>, IndexerError> {
        loop {
            match self.read_message().await? {
                Some(ServerMessage::Next { payload, .. }) => {
                    if !payload.errors.is_empty() {
                        return Err(IndexerError::Server(join_errors(&payload.errors)));
                    }
                    match payload.data {
                        Some(data) => return Ok(Some(data.unshielded_transactions.into())),
                        None => trace!("next message without data"),
                    }
                }
                Some(ServerMessage::Error { payload, .. }) => {
                    return Err(IndexerError::Server(join_errors(&payload)))
                }
                Some(ServerMessage::Ping) => self.send(&ClientMessage::Pong).await?,
                Some(ServerMessage::Complete { .. }) | None => return Ok(None),
                Some(ServerMessage::ConnectionAck) | Some(ServerMessage::Pong) => {}
            }
        }
    }

    async fn close(mut self) {
        if let Err(e) = self
            .send(&ClientMessage::Complete {
                id: OPERATION_ID.to_string(),
            })
            .await
        {
            debug!(endpoint = %self.endpoint, "unsubscribe failed: {e}");
        }
        if let Err(e) = self.socket.close(None).await {
            debug!(endpoint = %self.endpoint, "websocket close failed: {e}");
        }
    }
}
