//! JSON-RPC client for an out-of-process wallet engine.
//!
//! Every call is a POST of `{"action": <name>, ...params}` to the engine URL.
//! Responses carry either `result` or `error` (plus an optional `code`; the
//! code `stale_input` marks a spent-input conflict). State snapshots are
//! polled in the background and published on a `watch` channel.
//!
//! A resync bumps the session's generation. Poll replies are only published
//! if no resync completed while they were in flight, so a reply describing
//! the pre-resync state cannot mark the session synced again.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use night_types::{NetworkProfile, UtxoId};

use crate::engine::{
    FinalizedTransaction, SignedTransaction, TransferRecipe, UnprovenTransaction, WalletEngine,
    WalletSnapshot, WarningSender,
};
use crate::error::EngineError;
use crate::signing::SigningMaterial;

/// Interval between state polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

/// Error code the engine uses for a spent-input conflict.
const STALE_INPUT_CODE: &str = "stale_input";

/// Wallet engine reached over HTTP.
#[derive(Clone)]
pub struct RpcEngine {
    http: reqwest::Client,
    url: String,
    poll_interval: Duration,
}

/// A running engine session.
pub struct RpcSession {
    id: String,
    publisher: Arc<watch::Sender<WalletSnapshot>>,
    /// Number of completed resyncs.
    generation: Arc<AtomicU64>,
    state: watch::Receiver<WalletSnapshot>,
    poller: JoinHandle<()>,
}

#[derive(Debug, Deserialize)]
struct StartResult {
    session: String,
}

#[derive(Debug, Deserialize)]
struct StateResult {
    #[serde(flatten)]
    snapshot: WalletSnapshot,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    tx: String,
}

#[derive(Debug, Deserialize)]
struct TxIdResult {
    tx_id: String,
}

impl RpcEngine {
    /// Create a client targeting the given engine URL (e.g. `http://127.0.0.1:9955`).
    pub fn new(url: impl Into<String>) -> Result<Self, EngineError> {
        let url = url.into();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EngineError::Transport {
                endpoint: url.clone(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            url,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Poll engine state every `interval` instead of once a second.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, action: &str, params: Value) -> Result<T, EngineError> {
        let result = rpc_call(&self.http, &self.url, action, params).await?;
        serde_json::from_value(result)
            .map_err(|e| EngineError::InvalidResponse(format!("{action}: {e}")))
    }
}

/// Send a JSON-RPC request and return the `result` field.
async fn rpc_call(
    http: &reqwest::Client,
    url: &str,
    action: &str,
    params: Value,
) -> Result<Value, EngineError> {
    let mut body = params;
    body.as_object_mut()
        .ok_or_else(|| EngineError::Other("params must be a JSON object".into()))?
        .insert("action".to_string(), json!(action));

    trace!(action, "engine request");
    let response = http
        .post(url)
        .json(&body)
        .send()
        .await
        .map_err(|e| EngineError::Transport {
            endpoint: url.to_string(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    let json: Value = response
        .json()
        .await
        .map_err(|e| EngineError::InvalidResponse(format!("{action}: HTTP {status}: {e}")))?;

    if let Some(message) = json.get("error").and_then(|e| e.as_str()) {
        let code = json.get("code").and_then(|c| c.as_str()).unwrap_or_default();
        return Err(classify_error(code, message));
    }
    if !status.is_success() {
        return Err(EngineError::InvalidResponse(format!("{action}: HTTP {status}")));
    }

    json.get("result")
        .cloned()
        .ok_or_else(|| EngineError::InvalidResponse(format!("{action}: missing result")))
}

fn classify_error(code: &str, message: &str) -> EngineError {
    match code {
        STALE_INPUT_CODE => EngineError::StaleInput(message.to_string()),
        "rejected" => EngineError::Rejected(message.to_string()),
        _ => EngineError::Other(message.to_string()),
    }
}

/// Poll `state` until the session is dropped, forwarding engine warnings.
async fn poll_state(
    http: reqwest::Client,
    url: String,
    session: String,
    interval: Duration,
    tx: Arc<watch::Sender<WalletSnapshot>>,
    generation: Arc<AtomicU64>,
    warnings: WarningSender,
) {
    loop {
        let observed = generation.load(Ordering::SeqCst);
        match rpc_call(&http, &url, "state", json!({ "session": session })).await {
            Ok(value) => match serde_json::from_value::<StateResult>(value) {
                Ok(state) => {
                    for warning in state.warnings {
                        let _ = warnings.send(warning);
                    }
                    if tx.is_closed() {
                        return;
                    }
                    publish_polled(&tx, &generation, observed, state.snapshot);
                }
                Err(e) => {
                    let _ = warnings.send(format!("unreadable state snapshot: {e}"));
                }
            },
            Err(e) => {
                let _ = warnings.send(format!("state poll failed: {e}"));
            }
        }
        tokio::time::sleep(interval).await;
    }
}

/// Publish a polled snapshot unless a resync completed after the poll was
/// sent. Returns whether it was published.
///
/// The generation is read under the channel's write lock, so a resync that
/// lands first is always seen here, and one that lands later overwrites the
/// snapshot with its own not-synced mark.
fn publish_polled(
    tx: &watch::Sender<WalletSnapshot>,
    generation: &AtomicU64,
    observed: u64,
    snapshot: WalletSnapshot,
) -> bool {
    let published = tx.send_if_modified(|current| {
        if generation.load(Ordering::SeqCst) != observed {
            return false;
        }
        *current = snapshot;
        true
    });
    if !published {
        trace!(observed, "discarding state polled before a resync");
    }
    published
}

/// Record a completed resync and mark the published state not synced.
fn mark_resynced(tx: &watch::Sender<WalletSnapshot>, generation: &AtomicU64) {
    generation.fetch_add(1, Ordering::SeqCst);
    tx.send_modify(|snapshot| snapshot.synced = false);
}

impl WalletEngine for RpcEngine {
    type Handle = RpcSession;

    async fn start(
        &self,
        material: &SigningMaterial,
        profile: &NetworkProfile,
        warnings: WarningSender,
    ) -> Result<RpcSession, EngineError> {
        let seed = material.to_hex();
        let started: StartResult = self
            .call(
                "start",
                json!({
                    "seed": seed.as_str(),
                    "network": profile.network.as_str(),
                    "indexer_ws": profile.indexer_ws,
                    "indexer_http": profile.indexer_http,
                    "node": profile.node,
                    "prover": profile.prover,
                }),
            )
            .await?;
        debug!(session = %started.session, network = %profile.network, "engine session started");

        let (tx, rx) = watch::channel(WalletSnapshot::default());
        let publisher = Arc::new(tx);
        let generation = Arc::new(AtomicU64::new(0));
        let poller = tokio::spawn(poll_state(
            self.http.clone(),
            self.url.clone(),
            started.session.clone(),
            self.poll_interval,
            Arc::clone(&publisher),
            Arc::clone(&generation),
            warnings,
        ));

        Ok(RpcSession {
            id: started.session,
            publisher,
            generation,
            state: rx,
            poller,
        })
    }

    fn state(&self, handle: &RpcSession) -> watch::Receiver<WalletSnapshot> {
        handle.state.clone()
    }

    async fn resync(&self, handle: &RpcSession) -> Result<(), EngineError> {
        let _: Value = self.call("resync", json!({ "session": handle.id })).await?;
        mark_resynced(&handle.publisher, &handle.generation);
        Ok(())
    }

    async fn register_dust(
        &self,
        handle: &RpcSession,
        utxos: &[UtxoId],
    ) -> Result<String, EngineError> {
        let result: TxIdResult = self
            .call(
                "register_dust",
                json!({ "session": handle.id, "utxos": utxos }),
            )
            .await?;
        Ok(result.tx_id)
    }

    async fn build_transfer(
        &self,
        handle: &RpcSession,
        recipe: &TransferRecipe,
    ) -> Result<UnprovenTransaction, EngineError> {
        let result: TxResult = self
            .call(
                "build_transfer",
                json!({
                    "session": handle.id,
                    "token_type": recipe.token_type,
                    "recipient": recipe.recipient,
                    "amount": recipe.amount.to_string(),
                    "ttl": recipe.ttl.as_secs(),
                }),
            )
            .await?;
        Ok(UnprovenTransaction(result.tx))
    }

    async fn sign(
        &self,
        handle: &RpcSession,
        tx: UnprovenTransaction,
    ) -> Result<SignedTransaction, EngineError> {
        let result: TxResult = self
            .call("sign", json!({ "session": handle.id, "tx": tx.0 }))
            .await?;
        Ok(SignedTransaction(result.tx))
    }

    async fn prove(
        &self,
        handle: &RpcSession,
        tx: SignedTransaction,
    ) -> Result<FinalizedTransaction, EngineError> {
        let result: TxResult = self
            .call("prove", json!({ "session": handle.id, "tx": tx.0 }))
            .await?;
        Ok(FinalizedTransaction(result.tx))
    }

    async fn submit(
        &self,
        handle: &RpcSession,
        tx: FinalizedTransaction,
    ) -> Result<String, EngineError> {
        let result: TxIdResult = self
            .call("submit", json!({ "session": handle.id, "tx": tx.0 }))
            .await?;
        Ok(result.tx_id)
    }

    async fn stop(&self, handle: RpcSession) -> Result<(), EngineError> {
        handle.poller.abort();
        let _: Value = self.call("stop", json!({ "session": handle.id })).await?;
        debug!(session = %handle.id, "engine session stopped");
        Ok(())
    }
}
