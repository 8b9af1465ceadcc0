//! The wallet engine interface.
//!
//! The engine owns key derivation, the synchronized shielded/unshielded/dust
//! state, transaction assembly, signing, proving and submission. The
//! orchestrator only sees this narrow surface, so it can run against a stub
//! that emits synthetic state transitions and injected failures.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::{mpsc, watch};

use night_types::{NetworkProfile, Timestamp, TokenType, UtxoId};

use crate::error::EngineError;
use crate::signing::SigningMaterial;

/// Channel on which an engine reports non-fatal warnings.
pub type WarningSender = mpsc::UnboundedSender<String>;

/// A native-token UTXO as seen by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightUtxo {
    pub id: UtxoId,
    pub value: u128,
    /// Whether the UTXO already generates fee tokens.
    pub registered_for_dust: bool,
}

/// One synchronized-state snapshot published by the engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub synced: bool,
    /// Highest transaction applied by the engine.
    pub applied: u64,
    /// Highest transaction the engine knows about.
    pub highest: u64,
    #[serde(default)]
    pub balances: BTreeMap<TokenType, u128>,
    #[serde(default)]
    pub dust_balance: u128,
    #[serde(default)]
    pub night_utxos: Vec<NightUtxo>,
}

impl WalletSnapshot {
    /// Native-token balance in minor units.
    pub fn native_balance(&self) -> u128 {
        self.balances.get(&TokenType::NATIVE).copied().unwrap_or(0)
    }

    /// Native UTXOs that do not generate fee tokens yet.
    pub fn unregistered_utxos(&self) -> Vec<UtxoId> {
        self.night_utxos
            .iter()
            .filter(|u| !u.registered_for_dust)
            .map(|u| u.id)
            .collect()
    }
}

/// Unsigned description of a transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecipe {
    pub token_type: TokenType,
    pub recipient: String,
    /// Amount in minor units.
    pub amount: u128,
    /// The transaction is invalid after this time.
    pub ttl: Timestamp,
}

/// Transaction built from a recipe, not yet signed. Encoding is opaque.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnprovenTransaction(pub String);

/// Signed transaction awaiting a proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction(pub String);

/// Proven transaction ready for submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedTransaction(pub String);

/// Narrow interface to the wallet synchronization engine.
#[allow(async_fn_in_trait)]
pub trait WalletEngine {
    /// A running wallet session.
    type Handle;

    /// Start a session for `material` on `profile`. Warnings the engine
    /// considers non-fatal go to `warnings`.
    async fn start(
        &self,
        material: &SigningMaterial,
        profile: &NetworkProfile,
        warnings: WarningSender,
    ) -> Result<Self::Handle, EngineError>;

    /// Stream of state snapshots for the session.
    fn state(&self, handle: &Self::Handle) -> watch::Receiver<WalletSnapshot>;

    /// Request a resynchronization. Returns once the published state is no
    /// longer marked synced, so callers can wait for it to become synced again.
    async fn resync(&self, handle: &Self::Handle) -> Result<(), EngineError>;

    /// Register UTXOs for fee-token generation. Signed and submitted by the
    /// engine without a proof. Returns the registration transaction id.
    async fn register_dust(
        &self,
        handle: &Self::Handle,
        utxos: &[UtxoId],
    ) -> Result<String, EngineError>;

    async fn build_transfer(
        &self,
        handle: &Self::Handle,
        recipe: &TransferRecipe,
    ) -> Result<UnprovenTransaction, EngineError>;

    async fn sign(
        &self,
        handle: &Self::Handle,
        tx: UnprovenTransaction,
    ) -> Result<SignedTransaction, EngineError>;

    async fn prove(
        &self,
        handle: &Self::Handle,
        tx: SignedTransaction,
    ) -> Result<FinalizedTransaction, EngineError>;

    /// Submit and return the transaction id. Fails with
    /// [`EngineError::StaleInput`] when an input was spent elsewhere.
    async fn submit(
        &self,
        handle: &Self::Handle,
        tx: FinalizedTransaction,
    ) -> Result<String, EngineError>;

    /// Release the session.
    async fn stop(&self, handle: Self::Handle) -> Result<(), EngineError>;
}
