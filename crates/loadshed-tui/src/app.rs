//! Application core: event loop, key mapping and action dispatch.
//!
//! One task owns the navigator. Terminal input, load completions and
//! pushed stage readings all arrive through the [`EventReader`], so every
//! state change happens here in order.

use std::path::PathBuf;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use loadshed_api::ApiClient;
use loadshed_core::{Completion, NavEvent, Navigator, Panel, Readout, StageSubscription};

use crate::action::Action;
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::target::TerminalTarget;
use crate::theme;
use crate::tui::Session;

/// Ticks (4 Hz) a status message stays on screen.
const STATUS_TICKS: u16 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusMessage {
    text: String,
    is_error: bool,
    ticks_left: u16,
}

/// Top-level application state and event loop.
pub struct App {
    navigator: Navigator<ApiClient, TerminalTarget>,
    /// Handed to the event reader when the loop starts.
    completions: Option<mpsc::Receiver<Completion>>,
    stage_updates: Option<StageSubscription>,
    export_dir: PathBuf,
    status: Option<StatusMessage>,
    running: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(
        client: ApiClient,
        stage_updates: Option<StageSubscription>,
        export_dir: PathBuf,
    ) -> Self {
        let (navigator, completions) =
            Navigator::new(std::sync::Arc::new(client), TerminalTarget::new());
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        Self {
            navigator,
            completions: Some(completions),
            stage_updates,
            export_dir,
            status: None,
            running: true,
            action_tx,
            action_rx,
        }
    }

    /// Run the main event loop.
    pub async fn run(&mut self) -> Result<()> {
        let mut session = Session::start()?;

        let mut events = EventReader::new();
        events.read_terminal(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );
        if let Some(completions) = self.completions.take() {
            events.forward_completions(completions);
        }
        if let Some(subscription) = self.stage_updates.take() {
            events.forward_stage(subscription);
        }

        self.navigator.start();
        info!("event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };
            self.handle_event(event)?;

            while let Ok(action) = self.action_rx.try_recv() {
                let render = action == Action::Render;
                self.process_action(action);
                if render {
                    session.draw(|frame| self.render(frame))?;
                }
            }
        }

        events.stop();
        info!("event loop ended");
        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        let action = match event {
            Event::Key(key) => self.handle_key_event(key),
            Event::Resize(w, h) => Some(Action::Resize(w, h)),
            Event::Tick => Some(Action::Tick),
            Event::Render => Some(Action::Render),
            Event::Loaded(completion) => {
                self.navigator.apply(completion);
                None
            }
            Event::Stage(reading) => {
                self.navigator.push_stage(reading);
                None
            }
            Event::StageClosed => {
                warn!("stage push channel closed");
                None
            }
        };
        if let Some(action) = action {
            self.action_tx.send(action)?;
        }
        Ok(())
    }

    /// Global keys first, then the panel list.
    fn handle_key_event(&mut self, key: KeyEvent) -> Option<Action> {
        global_action(key).or_else(|| self.navigator.target_mut().handle_key_event(key))
    }

    fn process_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::Tick => self.expire_status(),
            Action::Render => {}
            Action::Resize(w, h) => debug!(w, h, "terminal resized"),
            Action::SelectPrev => self.navigator.target_mut().select_prev(),
            Action::SelectNext => self.navigator.target_mut().select_next(),
            Action::Activate => {
                if let Some(intent) = self.navigator.target().selected_intent() {
                    self.navigator.activate(intent);
                }
            }
            Action::Navigate(event) => {
                self.navigator.dispatch(event);
            }
            Action::Export => self.export(),
        }
    }

    fn export(&mut self) {
        let written = self
            .navigator
            .export()
            .and_then(|file| file.write_into(&self.export_dir));

        self.status = Some(match written {
            Ok(path) => StatusMessage {
                text: format!("Exported {}", path.display()),
                is_error: false,
                ticks_left: STATUS_TICKS,
            },
            Err(e) => {
                warn!(error = %e, "export failed");
                StatusMessage {
                    text: e.to_string(),
                    is_error: true,
                    ticks_left: STATUS_TICKS,
                }
            }
        });
    }

    fn expire_status(&mut self) {
        if let Some(status) = &mut self.status {
            status.ticks_left = status.ticks_left.saturating_sub(1);
            if status.ticks_left == 0 {
                self.status = None;
            }
        }
    }

    // ── Rendering ───────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let layout = Layout::vertical([
            Constraint::Length(1), // Stage + last updated
            Constraint::Min(1),    // Visible panel
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

        self.render_header(frame, layout[0]);
        self.navigator.target().render(frame, layout[1]);
        self.render_status_bar(frame, layout[2]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let target = self.navigator.target();
        let stage = target.readout(Readout::Stage).unwrap_or("Stage ?");
        let updated = target.readout(Readout::LastUpdated).unwrap_or_default();

        let line = Line::from(vec![
            Span::raw(" "),
            Span::styled(stage.to_owned(), theme::stage()),
            Span::styled("  │  ", theme::key_hint()),
            Span::styled(updated.to_owned(), theme::status_bar()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::raw(" ")];

        if let Some(status) = &self.status {
            let style = if status.is_error {
                theme::status_error()
            } else {
                theme::status_ok()
            };
            spans.push(Span::styled(status.text.clone(), style));
        } else if self.navigator.is_refreshing() {
            spans.push(Span::styled("◐ refreshing", theme::placeholder_loading()));
        } else {
            spans.push(Span::styled(
                self.navigator.panel().to_string(),
                theme::status_bar(),
            ));
        }

        spans.push(Span::styled(" │ ", theme::key_hint()));
        for (key, label) in key_hints(self.navigator.panel()) {
            spans.push(Span::styled(*key, theme::key_hint_key()));
            spans.push(Span::styled(format!(" {label}  "), theme::key_hint()));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

/// Keys that work regardless of the visible panel.
fn global_action(key: KeyEvent) -> Option<Action> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) | (KeyModifiers::NONE, KeyCode::Char('q')) => {
            Some(Action::Quit)
        }
        (KeyModifiers::NONE, KeyCode::Esc | KeyCode::Backspace) => {
            Some(Action::Navigate(NavEvent::Back))
        }
        (KeyModifiers::NONE, KeyCode::Char('h')) => Some(Action::Navigate(NavEvent::Home)),
        (KeyModifiers::NONE, KeyCode::Char('r')) => Some(Action::Navigate(NavEvent::Refresh)),
        (KeyModifiers::NONE, KeyCode::Char('e')) => Some(Action::Export),
        _ => None,
    }
}

fn key_hints(panel: Panel) -> &'static [(&'static str, &'static str)] {
    match panel {
        Panel::Provinces => &[("↵", "open"), ("r", "refresh"), ("q", "quit")],
        Panel::Towns => &[("↵", "open"), ("esc", "back"), ("h", "home"), ("q", "quit")],
        Panel::Schedule => &[("e", "export"), ("esc", "back"), ("h", "home"), ("q", "quit")],
    }
}
