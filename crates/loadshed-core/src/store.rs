// ── View state store ──
//
// Single source of truth for the navigation position and cached lists.
// Lists are immutable snapshots: a setter swaps the whole `Arc`, so a
// reader holding the previous snapshot never sees a half-replaced list.

use std::sync::Arc;

use loadshed_api::{Schedule, Town};

/// Navigation state owned by the [`Navigator`](crate::Navigator).
///
/// Callers supply data as received; the store does not deduplicate or
/// reorder.
#[derive(Debug, Clone, Default)]
pub struct ViewStore {
    provinces: Arc<Vec<String>>,
    towns: Arc<Vec<Town>>,
    current_province: Option<String>,
    current_town: Option<String>,
    current_schedule: Option<Arc<Schedule>>,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lists ────────────────────────────────────────────────────────

    pub fn provinces(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.provinces)
    }

    pub fn set_provinces(&mut self, provinces: Vec<String>) {
        self.provinces = Arc::new(provinces);
    }

    pub fn towns(&self) -> Arc<Vec<Town>> {
        Arc::clone(&self.towns)
    }

    pub fn set_towns(&mut self, towns: Vec<Town>) {
        self.towns = Arc::new(towns);
    }

    // ── Selection ────────────────────────────────────────────────────

    pub fn current_province(&self) -> Option<&str> {
        self.current_province.as_deref()
    }

    pub fn set_current_province(&mut self, province: Option<String>) {
        self.current_province = province;
    }

    pub fn current_town(&self) -> Option<&str> {
        self.current_town.as_deref()
    }

    pub fn set_current_town(&mut self, town: Option<String>) {
        self.current_town = town;
    }

    pub fn current_schedule(&self) -> Option<Arc<Schedule>> {
        self.current_schedule.clone()
    }

    pub fn set_current_schedule(&mut self, schedule: Option<Schedule>) {
        self.current_schedule = schedule.map(Arc::new);
    }

    /// Whether `(province, town)` is the current selection.
    pub fn is_selected(&self, province: &str, town: &str) -> bool {
        self.current_province() == Some(province) && self.current_town() == Some(town)
    }
}
