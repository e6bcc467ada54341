//! Server-Sent-Events stream with automatic reconnect.
//!
//! Opens the web service's push channel (`/api/stage-updates`), parses the
//! `text/event-stream` framing and broadcasts every dispatched event
//! through a [`tokio::sync::broadcast`] channel. Reconnection follows the
//! browser `EventSource` model: wait the server-advertised `retry:` delay
//! (3 s unless told otherwise) and reopen, resending `Last-Event-ID`.
//! There is no exponential backoff.
//!
//! # Example
//!
//! ```rust,ignore
//! use loadshed_api::{ApiClient, ReconnectPolicy, TransportConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = ApiClient::new(base_url, &TransportConfig::default())?;
//! let handle = client.stage_updates(&TransportConfig::default(), ReconnectPolicy::default(), CancellationToken::new())?;
//! let mut rx = handle.subscribe();
//!
//! while let Ok(event) = rx.recv().await {
//!     println!("{}: {}", event.event, event.data);
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::ApiClient;
use crate::error::Error;
use crate::transport::TransportConfig;

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Reconnection delay used until the server sends a `retry:` field.
pub const DEFAULT_RETRY: Duration = Duration::from_secs(3);

/// Floor for the reconnect delay, whatever the policy or server says.
pub const MIN_RETRY: Duration = Duration::from_millis(50);

/// Longest line kept by the parser. Longer lines are dropped whole.
const MAX_LINE_BYTES: usize = 64 * 1024;

// ── ServerEvent ──────────────────────────────────────────────────────

/// One dispatched event from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    /// Event name from the `event:` field, `"message"` when none was sent.
    pub event: String,

    /// Concatenated `data:` lines, joined with `\n`.
    pub data: String,

    /// Last event id seen on this stream, if the server assigns ids.
    pub id: Option<String>,
}

// ── ReconnectPolicy ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before reopening the stream. Replaced by the server's
    /// `retry:` value once one arrives. Default: 3s.
    pub retry: Duration,

    /// Consecutive failed connection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            retry: DEFAULT_RETRY,
            max_retries: None,
        }
    }
}

// ── EventStreamHandle ────────────────────────────────────────────────

/// Handle to a running event stream.
///
/// Call [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`spawn`](Self::spawn)) to tear down the background task.
pub struct EventStreamHandle {
    event_rx: broadcast::Receiver<Arc<ServerEvent>>,
    cancel: CancellationToken,
}

impl EventStreamHandle {
    /// Spawn the read/reconnect loop on the current tokio runtime.
    ///
    /// Returns immediately. The first connection attempt happens in the
    /// background; subscribe to start consuming events.
    pub fn spawn(
        http: reqwest::Client,
        url: Url,
        policy: ReconnectPolicy,
        cancel: CancellationToken,
    ) -> Self {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            stream_loop(http, url, event_tx, policy, task_cancel).await;
        });

        Self { event_rx, cancel }
    }

    /// Get a new broadcast receiver for the event stream.
    ///
    /// If a consumer falls behind it receives
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ServerEvent>> {
        self.event_rx.resubscribe()
    }

    /// Signal the background task to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl ApiClient {
    /// Open the stage push channel.
    ///
    /// `GET /api/stage-updates` as `text/event-stream`. Uses a separate
    /// HTTP client without a request timeout so the stream is not cut off.
    pub fn stage_updates(
        &self,
        transport: &TransportConfig,
        policy: ReconnectPolicy,
        cancel: CancellationToken,
    ) -> Result<EventStreamHandle, Error> {
        let url = self.api_url(&["stage-updates"])?;
        let http = transport.build_stream_client()?;
        Ok(EventStreamHandle::spawn(http, url, policy, cancel))
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Per-stream state that survives reconnects.
struct StreamState {
    retry: Duration,
    last_event_id: Option<String>,
}

/// Main loop: connect → read → wait `retry` → reconnect.
async fn stream_loop(
    http: reqwest::Client,
    url: Url,
    event_tx: broadcast::Sender<Arc<ServerEvent>>,
    policy: ReconnectPolicy,
    cancel: CancellationToken,
) {
    let mut state = StreamState {
        retry: policy.retry,
        last_event_id: None,
    };
    let mut failures: u32 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&http, &url, &event_tx, &mut state, &cancel) => {
                match result {
                    Ok(()) => {
                        tracing::info!("event stream closed, reconnecting");
                        failures = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, failures, "event stream error");

                        if let Some(max) = policy.max_retries {
                            if failures >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "event stream reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }
                        failures += 1;
                    }
                }
            }
        }

        let delay = reconnect_delay(state.retry);
        tracing::debug!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "waiting before reconnect"
        );
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!("event stream loop exiting");
}

fn reconnect_delay(retry: Duration) -> Duration {
    retry.max(MIN_RETRY)
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Open one stream and read until it drops.
async fn connect_and_read(
    http: &reqwest::Client,
    url: &Url,
    event_tx: &broadcast::Sender<Arc<ServerEvent>>,
    state: &mut StreamState,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to event stream");

    let mut request = http
        .get(url.clone())
        .header(ACCEPT, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache");
    if let Some(id) = state.last_event_id.as_deref() {
        request = request.header("Last-Event-ID", id);
    }

    let resp = request
        .send()
        .await
        .map_err(|e| Error::EventStream(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Error::EventStream(format!("HTTP {status}")));
    }

    tracing::info!("event stream connected");

    let mut body = resp.bytes_stream();
    let mut parser = EventParser::default();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            chunk = body.next() => {
                match chunk {
                    Some(Ok(bytes)) => {
                        for event in parser.feed(&bytes) {
                            if event.id.is_some() {
                                state.last_event_id.clone_from(&event.id);
                            }
                            tracing::trace!(event = %event.event, "event received");
                            // No subscribers right now is not an error.
                            let _ = event_tx.send(Arc::new(event));
                        }
                        if let Some(retry) = parser.take_retry() {
                            state.retry = retry;
                        }
                    }
                    Some(Err(e)) => return Err(Error::EventStream(e.to_string())),
                    None => return Ok(()),
                }
            }
        }
    }
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Incremental `text/event-stream` parser.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters and lines split across chunks decode correctly. Lines end
/// at `\r\n`, `\n` or a bare `\r`.
#[derive(Debug, Default)]
pub(crate) struct EventParser {
    buffer: Vec<u8>,
    /// The previous chunk ended on `\r`; a leading `\n` belongs to it.
    after_cr: bool,
    /// The current line passed `MAX_LINE_BYTES` and is being skipped.
    overlong: bool,
    event_type: String,
    data: String,
    last_event_id: Option<String>,
    retry: Option<Duration>,
}

impl EventParser {
    /// Feed a chunk and return every event it completed.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        for &byte in chunk {
            if std::mem::take(&mut self.after_cr) && byte == b'\n' {
                continue;
            }
            match byte {
                b'\r' | b'\n' => {
                    self.after_cr = byte == b'\r';
                    if let Some(event) = self.end_line() {
                        events.push(event);
                    }
                }
                _ if self.overlong => {}
                _ if self.buffer.len() >= MAX_LINE_BYTES => {
                    tracing::warn!(limit = MAX_LINE_BYTES, "dropping overlong event stream line");
                    self.buffer.clear();
                    self.overlong = true;
                }
                _ => self.buffer.push(byte),
            }
        }
        events
    }

    fn end_line(&mut self) -> Option<ServerEvent> {
        let line = std::mem::take(&mut self.buffer);
        if std::mem::take(&mut self.overlong) {
            return None;
        }
        let line = String::from_utf8_lossy(&line);
        self.process_line(&line)
    }

    /// The most recent `retry:` value, cleared once read.
    pub(crate) fn take_retry(&mut self) -> Option<Duration> {
        self.retry.take()
    }

    fn process_line(&mut self, line: &str) -> Option<ServerEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => value.clone_into(&mut self.event_type),
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "id" if !value.contains('\0') => self.last_event_id = Some(value.to_owned()),
            "retry" if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry = Some(Duration::from_millis(ms));
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<ServerEvent> {
        let event_type = std::mem::take(&mut self.event_type);
        if self.data.is_empty() {
            return None;
        }

        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }

        Some(ServerEvent {
            event: if event_type.is_empty() {
                "message".into()
            } else {
                event_type
            },
            data,
            id: self.last_event_id.clone(),
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────
