//! Source of decoded feed frames.

use crate::error::IndexerError;
use crate::frame::FeedFrame;

/// An ordered stream of feed frames for one subscription session.
///
/// Implemented by [`crate::Subscription`] for the live indexer and by test
/// doubles that replay scripted frames.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    /// Endpoint the frames come from, for error messages.
    fn endpoint(&self) -> &str;

    /// Next frame in delivery order. `Ok(None)` means the server ended the
    /// stream.
    async fn next_frame(&mut self) -> Result<Option<FeedFrame>, IndexerError>;

    /// Unsubscribe and release the connection. Consumes the source, so it
    /// runs at most once.
    async fn close(self);
}
