//! Terminal binding of the engine's render target.
//!
//! Keeps the node list, visibility and highlighted row of every panel so
//! the visible one can be drawn as a ratatui `List` on each frame.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use indexmap::IndexMap;
use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Text},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState},
};
use strum::IntoEnumIterator;

use loadshed_core::{Intent, Node, Panel, PlaceholderKind, Readout, RenderTarget};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

#[derive(Debug, Default)]
struct PanelView {
    nodes: Vec<Node>,
    visible: bool,
    selected: usize,
}

/// The display surface the navigator renders into.
#[derive(Debug)]
pub struct TerminalTarget {
    panels: IndexMap<Panel, PanelView>,
    readouts: IndexMap<Readout, String>,
}

impl Default for TerminalTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalTarget {
    pub fn new() -> Self {
        Self {
            panels: Panel::iter().map(|p| (p, PanelView::default())).collect(),
            readouts: IndexMap::new(),
        }
    }

    pub fn readout(&self, readout: Readout) -> Option<&str> {
        self.readouts.get(&readout).map(String::as_str)
    }

    /// The first visible panel, if any is shown yet.
    pub fn visible_panel(&self) -> Option<Panel> {
        self.panels
            .iter()
            .find(|(_, view)| view.visible)
            .map(|(panel, _)| *panel)
    }

    fn visible_view(&self) -> Option<&PanelView> {
        self.panels.values().find(|view| view.visible)
    }

    fn visible_view_mut(&mut self) -> Option<&mut PanelView> {
        self.panels.values_mut().find(|view| view.visible)
    }

    pub fn select_next(&mut self) {
        if let Some(view) = self.visible_view_mut() {
            if view.selected + 1 < view.nodes.len() {
                view.selected += 1;
            }
        }
    }

    pub fn select_prev(&mut self) {
        if let Some(view) = self.visible_view_mut() {
            view.selected = view.selected.saturating_sub(1);
        }
    }

    /// The intent of the highlighted row, if it is an interactive item.
    pub fn selected_intent(&self) -> Option<Intent> {
        let view = self.visible_view()?;
        view.nodes.get(view.selected)?.intent().cloned()
    }

    fn panel_title(&self, panel: Panel) -> String {
        match panel {
            Panel::Provinces => "Provinces".to_owned(),
            Panel::Towns => self
                .readout(Readout::TownsTitle)
                .unwrap_or("Towns")
                .to_owned(),
            Panel::Schedule => self
                .readout(Readout::ScheduleTitle)
                .unwrap_or("Schedule")
                .to_owned(),
        }
    }
}

impl RenderTarget for TerminalTarget {
    fn set_text(&mut self, readout: Readout, text: String) {
        self.readouts.insert(readout, text);
    }

    fn set_children(&mut self, panel: Panel, children: Vec<Node>) {
        let view = self.panels.entry(panel).or_default();
        view.nodes = children;
        view.selected = 0;
    }

    fn set_visible(&mut self, panel: Panel, visible: bool) {
        self.panels.entry(panel).or_default().visible = visible;
    }
}

// ── Drawing ─────────────────────────────────────────────────────────

fn placeholder_style(kind: PlaceholderKind) -> ratatui::style::Style {
    match kind {
        PlaceholderKind::Empty => theme::placeholder_empty(),
        PlaceholderKind::Loading => theme::placeholder_loading(),
        PlaceholderKind::Error => theme::placeholder_error(),
    }
}

fn node_lines(node: &Node, indent: usize) -> Vec<Line<'static>> {
    let pad = " ".repeat(indent);
    match node {
        Node::Placeholder { kind, message } => {
            vec![Line::styled(format!("{pad}{message}"), placeholder_style(*kind))]
        }
        Node::Item { label, .. } => vec![Line::styled(format!("{pad}{label}"), theme::list_row())],
        Node::Text(text) => vec![Line::styled(format!("{pad}{text}"), theme::list_row())],
        Node::Day { header, children } => {
            let mut lines = vec![Line::styled(format!("{pad}{header}"), theme::day_header())];
            lines.extend(children.iter().flat_map(|child| node_lines(child, indent + 2)));
            lines
        }
    }
}

impl Component for TerminalTarget {
    fn handle_key_event(&mut self, key: KeyEvent) -> Option<Action> {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => Some(Action::SelectPrev),
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => Some(Action::SelectNext),
            (KeyModifiers::NONE, KeyCode::Enter) => Some(Action::Activate),
            _ => None,
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let Some(panel) = self.visible_panel() else {
            return;
        };
        let Some(view) = self.panels.get(&panel) else {
            return;
        };

        let block = Block::default()
            .title(format!(" {} ", self.panel_title(panel)))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());

        let items: Vec<ListItem> = view
            .nodes
            .iter()
            .map(|node| ListItem::new(Text::from(node_lines(node, 0))))
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(theme::list_selected())
            .highlight_symbol("▸ ");

        let mut state =
            ListState::default().with_selected((!view.nodes.is_empty()).then_some(view.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }
}
