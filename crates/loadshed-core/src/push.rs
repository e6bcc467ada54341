// ── Stage push listener ──
//
// Turns the raw server event broadcast into a stream of stage readings.
// The transport reconnects on its own; this layer only filters, decodes
// and logs.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use loadshed_api::{
    ApiClient, EventStreamHandle, ReconnectPolicy, ServerEvent, StageReading, TransportConfig,
};

use crate::error::CoreError;

/// Event name carrying stage changes.
pub const STAGE_UPDATE_EVENT: &str = "stage-update";

/// Decode a `stage-update` payload. A missing or null `stage` is 0.
pub fn decode_stage(data: &str) -> Result<StageReading, CoreError> {
    serde_json::from_str(data).map_err(|e| CoreError::Decode {
        message: e.to_string(),
    })
}

/// Stream of stage readings from a server event broadcast.
///
/// Never yields an error: malformed payloads and lag are logged and
/// skipped. Ends when the transport task is gone.
pub struct StageFeed {
    inner: BroadcastStream<Arc<ServerEvent>>,
}

impl StageFeed {
    pub fn new(receiver: broadcast::Receiver<Arc<ServerEvent>>) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
        }
    }
}

impl Stream for StageFeed {
    type Item = StageReading;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if event.event != STAGE_UPDATE_EVENT {
                        debug!(event = %event.event, "ignoring server event");
                        continue;
                    }
                    match decode_stage(&event.data) {
                        Ok(reading) => return Poll::Ready(Some(reading)),
                        Err(e) => warn!(error = %e, data = %event.data, "dropping stage update"),
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    warn!(skipped, "stage feed lagged");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// A live subscription to the stage push channel.
///
/// Owns the transport task; [`close`](Self::close) or dropping the
/// subscription tears it down.
pub struct StageSubscription {
    handle: EventStreamHandle,
    feed: StageFeed,
}

impl StageSubscription {
    /// Open `/api/stage-updates` on `client`'s server.
    pub fn open(
        client: &ApiClient,
        transport: &TransportConfig,
        policy: ReconnectPolicy,
        cancel: CancellationToken,
    ) -> Result<Self, CoreError> {
        let handle = client.stage_updates(transport, policy, cancel)?;
        Ok(Self::from_handle(handle))
    }

    pub fn from_handle(handle: EventStreamHandle) -> Self {
        let feed = StageFeed::new(handle.subscribe());
        Self { handle, feed }
    }

    /// A fresh feed over the same connection, starting at the next event.
    pub fn restart(&self) -> StageFeed {
        StageFeed::new(self.handle.subscribe())
    }

    pub fn close(self) {
        self.handle.shutdown();
    }
}

impl Drop for StageSubscription {
    fn drop(&mut self) {
        if !self.handle.is_shut_down() {
            debug!("closing stage subscription");
            self.handle.shutdown();
        }
    }
}

impl Stream for StageSubscription {
    type Item = StageReading;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.feed).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;
    use pretty_assertions::assert_eq;

    use super::*;

    fn event(name: &str, data: &str) -> Arc<ServerEvent> {
        Arc::new(ServerEvent {
            event: name.into(),
            data: data.into(),
            id: None,
        })
    }

    #[test]
    fn decodes_stage_with_defaults() {
        assert_eq!(decode_stage(r#"{"stage":5}"#).unwrap().stage, 5);
        assert_eq!(decode_stage("{}").unwrap().stage, 0);
        assert_eq!(decode_stage(r#"{"stage":null}"#).unwrap().stage, 0);
        assert!(matches!(
            decode_stage("not json"),
            Err(CoreError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn feed_keeps_only_decodable_stage_updates() {
        let (tx, rx) = broadcast::channel(16);
        let feed = StageFeed::new(rx);

        tx.send(event("message", r#"{"stage":9}"#)).unwrap();
        tx.send(event(STAGE_UPDATE_EVENT, r#"{"stage":2}"#)).unwrap();
        tx.send(event(STAGE_UPDATE_EVENT, "garbage")).unwrap();
        tx.send(event(STAGE_UPDATE_EVENT, r#"{"stage":null}"#)).unwrap();
        drop(tx);

        let stages: Vec<i32> = feed.map(|r| r.stage).collect().await;
        assert_eq!(stages, vec![2, 0]);
    }

    #[tokio::test]
    async fn lagged_feed_continues_with_newest_events() {
        let (tx, rx) = broadcast::channel(2);
        let feed = StageFeed::new(rx);

        for stage in 1..=5 {
            tx.send(event(STAGE_UPDATE_EVENT, &format!(r#"{{"stage":{stage}}}"#)))
                .unwrap();
        }
        drop(tx);

        let stages: Vec<i32> = feed.map(|r| r.stage).collect().await;
        assert_eq!(stages, vec![4, 5]);
    }
}
