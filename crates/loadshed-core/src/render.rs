// ── View renderer ──
//
// Projects store contents into display nodes. Each panel is rendered
// independently and replaced wholesale on the target; there is no
// diffing. The display surface itself sits behind `RenderTarget`.

use chrono::NaiveDate;
use strum::{Display, EnumIter};

use loadshed_api::{Schedule, Town};

use crate::format::{day_dates, format_day_date, format_slot_range};

// ── Placeholder messages ─────────────────────────────────────────────

pub const NO_PROVINCES: &str = "No provinces found.";
pub const NO_TOWNS: &str = "No towns found.";
pub const NO_SCHEDULE: &str = "No schedule available.";
pub const NO_SLOTS: &str = "No slots";
pub const LOADING: &str = "Loading...";
pub const PROVINCES_ERROR: &str = "Error loading provinces.";
pub const TOWNS_ERROR: &str = "Error loading towns.";
pub const SCHEDULE_ERROR: &str = "Error loading schedule.";
pub const STAGE_ERROR: &str = "Error loading stage.";

/// One of the three mutually exclusive panels.
///
/// The visible panel is also the navigator's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Panel {
    Provinces,
    Towns,
    Schedule,
}

/// Single-line text fields outside the panel bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Readout {
    Stage,
    LastUpdated,
    TownsTitle,
    ScheduleTitle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Empty,
    Loading,
    Error,
}

/// What activating an item asks the navigator to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SelectProvince(String),
    SelectTown(String),
}

/// A display node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Placeholder {
        kind: PlaceholderKind,
        message: String,
    },
    /// An interactive entry.
    Item { label: String, intent: Intent },
    /// A schedule day: date header plus slot ranges, or a
    /// [`NO_SLOTS`] placeholder.
    Day { header: String, children: Vec<Node> },
    /// Plain text, used for slot ranges.
    Text(String),
}

impl Node {
    pub fn placeholder(kind: PlaceholderKind, message: &str) -> Self {
        Node::Placeholder {
            kind,
            message: message.to_owned(),
        }
    }

    pub fn loading() -> Self {
        Self::placeholder(PlaceholderKind::Loading, LOADING)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Node::Placeholder { .. })
    }

    pub fn intent(&self) -> Option<&Intent> {
        match self {
            Node::Item { intent, .. } => Some(intent),
            _ => None,
        }
    }
}

/// Minimal display capability the engine renders into.
pub trait RenderTarget {
    fn set_text(&mut self, readout: Readout, text: String);

    /// Replace all children of a panel.
    fn set_children(&mut self, panel: Panel, children: Vec<Node>);

    fn set_visible(&mut self, panel: Panel, visible: bool);
}

// ── Panel projections ────────────────────────────────────────────────

pub fn province_nodes(provinces: &[String]) -> Vec<Node> {
    if provinces.is_empty() {
        return vec![Node::placeholder(PlaceholderKind::Empty, NO_PROVINCES)];
    }
    provinces
        .iter()
        .map(|name| Node::Item {
            label: name.clone(),
            intent: Intent::SelectProvince(name.clone()),
        })
        .collect()
}

pub fn town_nodes(towns: &[Town]) -> Vec<Node> {
    if towns.is_empty() {
        return vec![Node::placeholder(PlaceholderKind::Empty, NO_TOWNS)];
    }
    towns
        .iter()
        .map(|town| Node::Item {
            label: town.name.clone(),
            intent: Intent::SelectTown(town.name.clone()),
        })
        .collect()
}

/// Schedule panel body. Day `i` is dated `start_date + i`, falling back
/// to `today` when the schedule carries no start date.
pub fn schedule_nodes(schedule: Option<&Schedule>, today: NaiveDate) -> Vec<Node> {
    let Some(schedule) = schedule.filter(|s| !s.days.is_empty()) else {
        return vec![Node::placeholder(PlaceholderKind::Empty, NO_SCHEDULE)];
    };

    let start = schedule.start_date.unwrap_or(today);
    schedule
        .days
        .iter()
        .zip(day_dates(start, schedule.days.len()))
        .map(|(day, date)| {
            let children = if day.slots.is_empty() {
                vec![Node::placeholder(PlaceholderKind::Empty, NO_SLOTS)]
            } else {
                day.slots
                    .iter()
                    .map(|slot| Node::Text(format_slot_range(slot.start.as_ref(), slot.end.as_ref())))
                    .collect()
            };
            Node::Day {
                header: format_day_date(date),
                children,
            }
        })
        .collect()
}

/// The error placeholder for a panel's failed load.
pub fn error_nodes(panel: Panel) -> Vec<Node> {
    let message = match panel {
        Panel::Provinces => PROVINCES_ERROR,
        Panel::Towns => TOWNS_ERROR,
        Panel::Schedule => SCHEDULE_ERROR,
    };
    vec![Node::placeholder(PlaceholderKind::Error, message)]
}

// ── Readout text ─────────────────────────────────────────────────────

pub fn stage_text(stage: i32) -> String {
    format!("Stage {stage}")
}

pub fn last_updated_text(timestamp: &str) -> String {
    format!("Last updated: {timestamp}")
}

pub fn towns_title(province: &str) -> String {
    format!("Towns in {province}")
}

pub fn schedule_title(town: &str) -> String {
    format!("Schedule for {town}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use loadshed_api::{Day, PackedTime, Slot};
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day(slots: Vec<Slot>) -> Day {
        Day {
            slots,
            ..Day::default()
        }
    }

    fn slot(start: u32, end: u32) -> Slot {
        Slot {
            start: Some(PackedTime::Parts(vec![start])),
            end: Some(PackedTime::Parts(vec![end, 30])),
            ..Slot::default()
        }
    }

    #[test]
    fn empty_lists_render_one_placeholder_and_no_items() {
        for nodes in [province_nodes(&[]), town_nodes(&[])] {
            assert_eq!(nodes.len(), 1);
            assert!(matches!(
                nodes[0],
                Node::Placeholder {
                    kind: PlaceholderKind::Empty,
                    ..
                }
            ));
            assert!(nodes.iter().all(|n| n.intent().is_none()));
        }
        assert_eq!(
            province_nodes(&[]),
            vec![Node::placeholder(PlaceholderKind::Empty, "No provinces found.")]
        );
        assert_eq!(
            town_nodes(&[]),
            vec![Node::placeholder(PlaceholderKind::Empty, "No towns found.")]
        );
    }

    #[test]
    fn provinces_render_one_item_each_in_order() {
        let nodes = province_nodes(&["Gauteng".into(), "Free State".into()]);
        assert_eq!(
            nodes,
            vec![
                Node::Item {
                    label: "Gauteng".into(),
                    intent: Intent::SelectProvince("Gauteng".into()),
                },
                Node::Item {
                    label: "Free State".into(),
                    intent: Intent::SelectProvince("Free State".into()),
                },
            ]
        );
    }

    #[test]
    fn towns_select_by_name() {
        let nodes = town_nodes(&[Town::named("Soweto")]);
        assert_eq!(nodes[0].intent(), Some(&Intent::SelectTown("Soweto".into())));
    }

    #[test]
    fn absent_or_empty_schedule_is_no_schedule() {
        let today = date(2024, 1, 1);
        let expected = vec![Node::placeholder(PlaceholderKind::Empty, NO_SCHEDULE)];
        assert_eq!(schedule_nodes(None, today), expected);
        assert_eq!(schedule_nodes(Some(&Schedule::default()), today), expected);
    }

    #[test]
    fn days_are_dated_from_start_date() {
        let schedule = Schedule {
            start_date: Some(date(2024, 2, 28)),
            days: vec![day(vec![slot(2, 4)]), day(vec![]), day(vec![slot(20, 22)])],
            ..Schedule::default()
        };

        let nodes = schedule_nodes(Some(&schedule), date(2000, 1, 1));

        assert_eq!(
            nodes,
            vec![
                Node::Day {
                    header: "28/2/2024".into(),
                    children: vec![Node::Text("02:00 - 04:30".into())],
                },
                Node::Day {
                    header: "29/2/2024".into(),
                    children: vec![Node::placeholder(PlaceholderKind::Empty, "No slots")],
                },
                Node::Day {
                    header: "1/3/2024".into(),
                    children: vec![Node::Text("20:00 - 22:30".into())],
                },
            ]
        );
    }

    #[test]
    fn missing_start_date_counts_from_today() {
        let schedule = Schedule {
            start_date: None,
            days: vec![day(vec![]), day(vec![])],
            ..Schedule::default()
        };
        let nodes = schedule_nodes(Some(&schedule), date(2024, 12, 31));
        let headers: Vec<&str> = nodes
            .iter()
            .map(|n| match n {
                Node::Day { header, .. } => header.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(headers, vec!["31/12/2024", "1/1/2025"]);
    }

    #[test]
    fn error_placeholders_per_panel() {
        assert_eq!(
            error_nodes(Panel::Towns),
            vec![Node::placeholder(PlaceholderKind::Error, "Error loading towns.")]
        );
        assert_eq!(
            error_nodes(Panel::Schedule)[0],
            Node::placeholder(PlaceholderKind::Error, "Error loading schedule.")
        );
    }

    #[test]
    fn readout_texts() {
        assert_eq!(stage_text(0), "Stage 0");
        assert_eq!(towns_title("Gauteng"), "Towns in Gauteng");
        assert_eq!(schedule_title("Soweto"), "Schedule for Soweto");
        assert_eq!(last_updated_text("1/2/2024, 10:00:00"), "Last updated: 1/2/2024, 10:00:00");
    }
}
