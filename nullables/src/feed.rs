//! Nullable indexer feed: replays scripted frames.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use night_indexer::{CreatedUtxo, FeedFrame, FrameSource, IndexerError, TransactionFrame};
use night_types::{TokenType, UtxoId};

/// Shared view of how often a [`NullFeed`] was closed.
///
/// Outlives the feed, which is consumed by `close`.
#[derive(Clone, Debug, Default)]
pub struct CloseCounter(Arc<AtomicU32>);

impl CloseCounter {
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

enum Step {
    Frame(FeedFrame),
    Fail(IndexerError),
}

/// What happens once the script runs out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Exhausted {
    /// The server ends the stream.
    End,
    /// No further frames ever arrive.
    Stall,
}

/// A scripted frame source.
pub struct NullFeed {
    endpoint: String,
    script: VecDeque<Step>,
    exhausted: Exhausted,
    closes: CloseCounter,
}

impl NullFeed {
    pub fn new() -> Self {
        Self {
            endpoint: "null://indexer".to_string(),
            script: VecDeque::new(),
            exhausted: Exhausted::End,
            closes: CloseCounter::default(),
        }
    }

    /// Append a frame.
    pub fn frame(mut self, frame: FeedFrame) -> Self {
        self.script.push_back(Step::Frame(frame));
        self
    }

    /// Append a progress frame announcing `highest`.
    pub fn progress(self, highest: u64) -> Self {
        self.frame(FeedFrame::Progress { highest })
    }

    /// Append a transaction frame.
    pub fn transaction(self, sequence: u64, created: Vec<CreatedUtxo>, spent: Vec<UtxoId>) -> Self {
        self.frame(FeedFrame::Transaction(TransactionFrame {
            sequence,
            created,
            spent,
        }))
    }

    /// Append a server-reported error.
    pub fn error(mut self, error: IndexerError) -> Self {
        self.script.push_back(Step::Fail(error));
        self
    }

    /// Never deliver anything after the script instead of ending the stream.
    pub fn stall(mut self) -> Self {
        self.exhausted = Exhausted::Stall;
        self
    }

    /// Handle for asserting on close calls after the feed is consumed.
    pub fn closes(&self) -> CloseCounter {
        self.closes.clone()
    }
}

impl Default for NullFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for NullFeed {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn next_frame(&mut self) -> Result<Option<FeedFrame>, IndexerError> {
        match self.script.pop_front() {
            Some(Step::Frame(frame)) => Ok(Some(frame)),
            Some(Step::Fail(error)) => Err(error),
            None => match self.exhausted {
                Exhausted::End => Ok(None),
                Exhausted::Stall => std::future::pending().await,
            },
        }
    }

    async fn close(self) {
        self.closes.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Native-token UTXO created with `value`.
pub fn native(id: UtxoId, value: u128) -> CreatedUtxo {
    CreatedUtxo {
        id,
        value,
        token_type: TokenType::NATIVE,
    }
}
