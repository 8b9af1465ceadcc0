//! Wire format of the indexer subscription (GraphQL over WebSocket).
//!
//! The transport is the `graphql-transport-ws` subprotocol. Payloads of
//! `next` messages carry an `unshieldedTransactions` object whose `__typename`
//! tells transaction frames and progress frames apart.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use night_types::{IntentHash, TokenType, UtxoId};

use crate::error::IndexerError;
use crate::frame::{CreatedUtxo, FeedFrame, TransactionFrame};

/// Websocket subprotocol negotiated with the indexer.
pub const SUBPROTOCOL: &str = "graphql-transport-ws";

/// Subscription document requesting transaction and progress events.
pub const UNSHIELDED_TRANSACTIONS_QUERY: &str = r#"subscription UnshieldedTransactions($address: UnshieldedAddress!) {
  unshieldedTransactions(address: $address) {
    __typename
    ... on UnshieldedTransaction {
      transaction { id hash }
      createdUtxos { owner intentHash value tokenType outputIndex }
      spentUtxos { owner intentHash value tokenType outputIndex }
    }
    ... on UnshieldedTransactionsProgress {
      highestTransactionId
    }
  }
}"#;

/// Messages sent by the client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ConnectionInit { payload: Value },
    Subscribe { id: String, payload: SubscribePayload },
    Complete { id: String },
    Pong,
}

#[derive(Debug, Serialize)]
pub struct SubscribePayload {
    pub query: String,
    pub variables: Value,
}

impl ClientMessage {
    /// Subscribe to the unshielded transaction feed of `address`.
    pub fn subscribe(id: &str, address: &str) -> Self {
        Self::Subscribe {
            id: id.to_string(),
            payload: SubscribePayload {
                query: UNSHIELDED_TRANSACTIONS_QUERY.to_string(),
                variables: serde_json::json!({ "address": address }),
            },
        }
    }

    pub fn to_json(&self) -> Result<String, IndexerError> {
        serde_json::to_string(self).map_err(|e| IndexerError::Protocol(e.to_string()))
    }
}

/// Messages sent by the server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionAck,
    Ping,
    Pong,
    Next { id: String, payload: NextPayload },
    Error { id: String, payload: Vec<GraphQlError> },
    Complete { id: String },
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self, IndexerError> {
        serde_json::from_str(text)
            .map_err(|e| IndexerError::Protocol(format!("{e}: {}", truncate(text, 200))))
    }
}

#[derive(Debug, Deserialize)]
pub struct NextPayload {
    #[serde(default)]
    pub data: Option<SubscriptionData>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// Join server error messages into one line.
pub fn join_errors(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionData {
    #[serde(rename = "unshieldedTransactions")]
    pub unshielded_transactions: WireEvent,
}

/// Event discriminated by `__typename`.
#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub enum WireEvent {
    UnshieldedTransaction(WireTransactionEvent),
    UnshieldedTransactionsProgress(WireProgressEvent),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTransactionEvent {
    pub transaction: WireTransaction,
    #[serde(default)]
    pub created_utxos: Vec<WireUtxo>,
    #[serde(default)]
    pub spent_utxos: Vec<WireUtxo>,
}

#[derive(Debug, Deserialize)]
pub struct WireTransaction {
    pub id: u64,
    #[serde(default)]
    pub hash: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireProgressEvent {
    pub highest_transaction_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUtxo {
    #[serde(default)]
    pub owner: Option<String>,
    pub intent_hash: IntentHash,
    pub output_index: u32,
    #[serde(deserialize_with = "de_amount")]
    pub value: u128,
    pub token_type: TokenType,
}

impl WireUtxo {
    fn id(&self) -> UtxoId {
        UtxoId::new(self.intent_hash, self.output_index)
    }
}

/// Amounts are integers in minor units, sent as decimal strings or JSON
/// integers; floats are rejected.
fn de_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s
            .trim()
            .parse::<u128>()
            .map_err(|e| serde::de::Error::custom(format!("invalid amount {s:?}: {e}"))),
        Raw::Int(n) => Ok(n as u128),
    }
}

impl From<WireEvent> for FeedFrame {
    fn from(event: WireEvent) -> Self {
        match event {
            WireEvent::UnshieldedTransaction(tx) => FeedFrame::Transaction(TransactionFrame {
                sequence: tx.transaction.id,
                created: tx
                    .created_utxos
                    .iter()
                    .map(|u| CreatedUtxo {
                        id: u.id(),
                        value: u.value,
                        token_type: u.token_type,
                    })
                    .collect(),
                spent: tx.spent_utxos.iter().map(WireUtxo::id).collect(),
            }),
            WireEvent::UnshieldedTransactionsProgress(p) => FeedFrame::Progress {
                highest: p.highest_transaction_id,
            },
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
