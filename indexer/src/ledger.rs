//! UTXO working set and balance snapshots.
//!
//! [`UtxoLedger`] is a pure fold: every frame is applied in delivery order and
//! the completion rule is a function of the accumulated state only.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{trace, warn};

use night_types::{TokenType, UtxoId};

use crate::frame::{FeedFrame, TransactionFrame};

/// A UTXO observed during one subscription session.
///
/// Spent outputs stay in the working set so a replayed spend is a no-op.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Utxo {
    pub value: u128,
    pub token_type: TokenType,
    pub spent: bool,
}

/// Progress marker: highest sequence announced vs. highest sequence applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncProgress {
    /// `None` until the first progress frame arrives.
    pub highest_known: Option<u64>,
    pub last_applied: u64,
}

impl SyncProgress {
    /// Record an announced highest sequence number. Never decreases.
    pub fn announce(&mut self, highest: u64) {
        self.highest_known = Some(self.highest_known.map_or(highest, |h| h.max(highest)));
    }

    /// Record an applied transaction sequence number. Never decreases.
    pub fn applied(&mut self, sequence: u64) {
        self.last_applied = self.last_applied.max(sequence);
    }

    /// Caught up once a progress frame has been seen and either the address
    /// has no history (highest = 0) or every announced transaction is applied.
    pub fn is_caught_up(&self) -> bool {
        match self.highest_known {
            Some(0) => true,
            Some(highest) => self.last_applied >= highest,
            None => false,
        }
    }
}

/// Point-in-time balance derived from the unspent outputs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    /// Summed unspent value per token type.
    pub balances: BTreeMap<TokenType, u128>,
    pub utxo_count: usize,
    pub tx_count: u64,
}

impl BalanceSnapshot {
    /// Unspent native-token balance in minor units.
    pub fn native(&self) -> u128 {
        self.balances.get(&TokenType::NATIVE).copied().unwrap_or(0)
    }

    pub fn balance_of(&self, token_type: &TokenType) -> u128 {
        self.balances.get(token_type).copied().unwrap_or(0)
    }
}

/// Working set of UTXOs for one subscription session.
#[derive(Clone, Debug, Default)]
pub struct UtxoLedger {
    utxos: BTreeMap<UtxoId, Utxo>,
    progress: SyncProgress,
    tx_count: u64,
}

impl UtxoLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one frame.
    pub fn apply(&mut self, frame: &FeedFrame) {
        match frame {
            FeedFrame::Transaction(tx) => self.apply_transaction(tx),
            FeedFrame::Progress { highest } => self.progress.announce(*highest),
        }
    }

    /// Insert created outputs, mark spent ones, advance the applied marker.
    pub fn apply_transaction(&mut self, tx: &TransactionFrame) {
        for created in &tx.created {
            // A re-announced output keeps its spent flag.
            self.utxos.entry(created.id).or_insert_with(|| Utxo {
                value: created.value,
                token_type: created.token_type,
                spent: false,
            });
        }

        for id in &tx.spent {
            match self.utxos.get_mut(id) {
                Some(utxo) => utxo.spent = true,
                None => {
                    // Spend before create: the stream is inconsistent, nothing to mark.
                    warn!(utxo = %id, sequence = tx.sequence, "spend of unknown UTXO ignored");
                }
            }
        }

        self.tx_count += 1;
        self.progress.applied(tx.sequence);
        trace!(
            sequence = tx.sequence,
            created = tx.created.len(),
            spent = tx.spent.len(),
            "applied transaction frame"
        );
    }

    pub fn progress(&self) -> SyncProgress {
        self.progress
    }

    pub fn is_complete(&self) -> bool {
        self.progress.is_caught_up()
    }

    pub fn get(&self, id: &UtxoId) -> Option<&Utxo> {
        self.utxos.get(id)
    }

    /// Recompute the balance from the unspent outputs.
    pub fn snapshot(&self) -> BalanceSnapshot {
        let mut balances: BTreeMap<TokenType, u128> = BTreeMap::new();
        let mut utxo_count = 0;
        for utxo in self.utxos.values().filter(|u| !u.spent) {
            let entry = balances.entry(utxo.token_type).or_insert(0);
            *entry = entry.saturating_add(utxo.value);
            utxo_count += 1;
        }
        BalanceSnapshot {
            balances,
            utxo_count,
            tx_count: self.tx_count,
        }
    }
}
