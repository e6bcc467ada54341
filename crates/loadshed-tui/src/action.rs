//! UI actions. Key presses are mapped to actions; the app loop applies them.

use loadshed_core::NavEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // ── Lifecycle ──
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Panel list ──
    SelectPrev,
    SelectNext,
    /// Activate the highlighted item.
    Activate,

    // ── Navigation ──
    Navigate(NavEvent),

    /// Write the current schedule to the export directory.
    Export,
}
