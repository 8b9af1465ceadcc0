//! Decoded feed frames, independent of the wire transport.

use night_types::{TokenType, UtxoId};

/// A UTXO announced as created by a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedUtxo {
    pub id: UtxoId,
    pub value: u128,
    pub token_type: TokenType,
}

/// One transaction touching the subscribed address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionFrame {
    /// Indexer-assigned transaction sequence number.
    pub sequence: u64,
    pub created: Vec<CreatedUtxo>,
    pub spent: Vec<UtxoId>,
}

/// A frame delivered by the subscription feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedFrame {
    Transaction(TransactionFrame),
    /// Highest transaction sequence number the indexer knows for the address.
    Progress { highest: u64 },
}
