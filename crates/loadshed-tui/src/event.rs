//! Everything the app loop reacts to, merged into one channel.
//!
//! Terminal input with the tick/render clocks, navigator load completions
//! and pushed stage readings each come from a background task feeding
//! the same channel. The loop owns the navigator and drains
//! [`EventReader::next`], so every state change is applied in order on a
//! single task.

use std::time::Duration;

use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use loadshed_core::{Completion, StageReading, StageSubscription};

#[derive(Debug)]
pub enum Event {
    /// A key was pressed.
    Key(KeyEvent),
    /// Terminal was resized to (cols, rows).
    Resize(u16, u16),
    /// Status-message clock.
    Tick,
    /// Time to draw a frame.
    Render,
    /// A navigator load finished and must be applied.
    Loaded(Completion),
    /// The push channel delivered a stage reading.
    Stage(StageReading),
    /// The push channel ended for good.
    StageClosed,
}

/// Only key presses and resizes matter to the app.
fn translate(event: CrosstermEvent) -> Option<Event> {
    match event {
        CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
        CrosstermEvent::Resize(w, h) => Some(Event::Resize(w, h)),
        _ => None,
    }
}

pub struct EventReader {
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
}

impl EventReader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            cancel: CancellationToken::new(),
        }
    }

    /// Read the terminal. `tick_rate` drives [`Event::Tick`], `render_rate`
    /// drives [`Event::Render`].
    pub fn read_terminal(&self, tick_rate: Duration, render_rate: Duration) {
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut terminal = EventStream::new();
            let mut tick = tokio::time::interval(tick_rate);
            let mut render = tokio::time::interval(render_rate);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            render.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let event = tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = tick.tick() => Event::Tick,
                    _ = render.tick() => Event::Render,
                    Some(Ok(raw)) = terminal.next() => match translate(raw) {
                        Some(event) => event,
                        None => continue,
                    },
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
        });
    }

    /// Feed navigator completions into the event stream.
    pub fn forward_completions(&self, mut completions: mpsc::Receiver<Completion>) {
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                let completion = tokio::select! {
                    () = cancel.cancelled() => break,
                    completion = completions.recv() => completion,
                };
                let Some(completion) = completion else { break };
                if tx.send(Event::Loaded(completion)).is_err() {
                    break;
                }
            }
        });
    }

    /// Feed pushed stage readings into the event stream. The subscription
    /// is closed when the reader stops.
    pub fn forward_stage(&self, mut subscription: StageSubscription) {
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                let reading = tokio::select! {
                    () = cancel.cancelled() => break,
                    reading = subscription.next() => reading,
                };
                let event = reading.map_or(Event::StageClosed, Event::Stage);
                let closed = matches!(event, Event::StageClosed);
                if tx.send(event).is_err() || closed {
                    break;
                }
            }
            debug!("stage forwarding stopped");
            subscription.close();
        });
    }

    /// The next event from any source. The reader keeps a sender of its
    /// own, so this only yields `None` if the channel itself is gone.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Stop every source task.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Default for EventReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventReader {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
