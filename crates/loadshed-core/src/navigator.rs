// ── Navigation controller ──
//
// Owns the view state and drives the drill-down. Loads run as spawned
// tasks and report back as `Completion` messages; the owner feeds them
// to `apply`, which is the only place fetched data reaches the store.
// A towns or schedule result whose selection is no longer current is
// dropped there without touching state or the display.

use std::future::Future;
use std::sync::Arc;

use strum::IntoEnumIterator;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use loadshed_api::{Schedule, StageReading, Town};

use crate::error::CoreError;
use crate::export::ExportFile;
use crate::format::{timestamp_now, today};
use crate::gateway::ScheduleSource;
use crate::render::{
    Intent, Node, Panel, Readout, RenderTarget, STAGE_ERROR, error_nodes, last_updated_text,
    province_nodes, schedule_nodes, schedule_title, stage_text, town_nodes, towns_title,
};
use crate::store::ViewStore;

const COMPLETION_CHANNEL_SIZE: usize = 64;

// ── Events and transitions ───────────────────────────────────────────

/// A user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    SelectProvince(String),
    SelectTown(String),
    Back,
    /// Straight to the provinces panel from anywhere.
    Home,
    /// Re-fetch provinces and stage.
    Refresh,
}

impl From<Intent> for NavEvent {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::SelectProvince(province) => NavEvent::SelectProvince(province),
            Intent::SelectTown(town) => NavEvent::SelectTown(town),
        }
    }
}

/// The legal transitions. `None` means the event does nothing from `from`.
pub fn transition(from: Panel, event: &NavEvent) -> Option<Panel> {
    match (from, event) {
        (Panel::Provinces, NavEvent::SelectProvince(_)) => Some(Panel::Towns),
        (Panel::Towns, NavEvent::SelectTown(_)) => Some(Panel::Schedule),
        (Panel::Towns, NavEvent::Back) | (_, NavEvent::Home) => Some(Panel::Provinces),
        (Panel::Schedule, NavEvent::Back) => Some(Panel::Towns),
        (panel, NavEvent::Refresh) => Some(panel),
        _ => None,
    }
}

// ── Completions ──────────────────────────────────────────────────────

/// What triggered a provinces or stage load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    Startup,
    Navigation,
    Refresh,
}

/// A finished load, waiting to be applied.
///
/// Towns and schedule results carry the selection that requested them.
#[derive(Debug)]
pub enum Completion {
    Stage {
        origin: LoadOrigin,
        result: Result<StageReading, CoreError>,
    },
    Provinces {
        origin: LoadOrigin,
        result: Result<Vec<String>, CoreError>,
    },
    Towns {
        province: String,
        result: Result<Vec<Town>, CoreError>,
    },
    Schedule {
        province: String,
        town: String,
        result: Result<Schedule, CoreError>,
    },
}

// ── Navigator ────────────────────────────────────────────────────────

pub struct Navigator<S, R> {
    source: Arc<S>,
    target: R,
    store: ViewStore,
    panel: Panel,
    completion_tx: mpsc::Sender<Completion>,
    pending_refresh: usize,
}

impl<S: ScheduleSource, R: RenderTarget> Navigator<S, R> {
    /// Create a navigator and the receiver its loads report to.
    ///
    /// Every `Completion` read from the receiver must be passed back to
    /// [`apply`](Self::apply).
    pub fn new(source: Arc<S>, target: R) -> (Self, mpsc::Receiver<Completion>) {
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_CHANNEL_SIZE);
        let navigator = Self {
            source,
            target,
            store: ViewStore::new(),
            panel: Panel::Provinces,
            completion_tx,
            pending_refresh: 0,
        };
        (navigator, completion_rx)
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The visible panel.
    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn store(&self) -> &ViewStore {
        &self.store
    }

    pub fn target(&self) -> &R {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut R {
        &mut self.target
    }

    /// Whether a refresh still has fetches outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.pending_refresh > 0
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// Show the provinces panel and issue the initial provinces and
    /// stage loads. Call once.
    pub fn start(&mut self) {
        info!("starting navigator");
        self.show(Panel::Provinces);
        self.load_provinces(false, LoadOrigin::Startup);
        self.load_stage(LoadOrigin::Startup);
    }

    /// Handle a user action. Returns `false` if it is not legal from the
    /// current panel.
    pub fn dispatch(&mut self, event: NavEvent) -> bool {
        let Some(next) = transition(self.panel, &event) else {
            debug!(panel = %self.panel, ?event, "ignoring event");
            return false;
        };

        match event {
            NavEvent::SelectProvince(province) => self.enter_towns(province),
            NavEvent::SelectTown(town) => {
                let Some(province) = self.store.current_province().map(str::to_owned) else {
                    warn!(town = %town, "town selected without a province");
                    return false;
                };
                self.enter_schedule(province, town);
            }
            NavEvent::Back => self.show(next),
            NavEvent::Home => {
                self.show(next);
                self.load_provinces(false, LoadOrigin::Navigation);
            }
            NavEvent::Refresh => self.refresh(),
        }
        true
    }

    /// Act on an activated item.
    pub fn activate(&mut self, intent: Intent) -> bool {
        self.dispatch(intent.into())
    }

    /// Apply a stage reading from the push channel.
    pub fn push_stage(&mut self, reading: StageReading) {
        debug!(stage = reading.stage, "stage pushed");
        self.target.set_text(Readout::Stage, stage_text(reading.stage));
        self.touch_timestamp();
    }

    /// Serialize the current schedule for download.
    pub fn export(&self) -> Result<ExportFile, CoreError> {
        let schedule = self
            .store
            .current_schedule()
            .ok_or(CoreError::NothingToExport)?;
        ExportFile::new(
            &schedule,
            self.store.current_province(),
            self.store.current_town(),
        )
    }

    // ── Applying completions ─────────────────────────────────────────

    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Stage { origin, result } => self.apply_stage(origin, result),
            Completion::Provinces { origin, result } => self.apply_provinces(origin, result),
            Completion::Towns { province, result } => self.apply_towns(&province, result),
            Completion::Schedule {
                province,
                town,
                result,
            } => self.apply_schedule(&province, &town, result),
        }
    }

    fn apply_stage(&mut self, origin: LoadOrigin, result: Result<StageReading, CoreError>) {
        match result {
            Ok(reading) => {
                debug!(stage = reading.stage, "stage loaded");
                self.target.set_text(Readout::Stage, stage_text(reading.stage));
                self.touch_timestamp();
            }
            Err(e) => {
                warn!(error = %e, "stage load failed");
                self.target.set_text(Readout::Stage, STAGE_ERROR.to_owned());
                if origin == LoadOrigin::Refresh {
                    self.touch_timestamp();
                }
            }
        }
        self.finish_refresh_part(origin);
    }

    fn apply_provinces(&mut self, origin: LoadOrigin, result: Result<Vec<String>, CoreError>) {
        match result {
            Ok(provinces) => {
                info!(count = provinces.len(), "provinces loaded");
                self.store.set_provinces(provinces);
                self.render_provinces();
                self.touch_timestamp();
            }
            Err(e) => {
                warn!(error = %e, "provinces load failed");
                self.target
                    .set_children(Panel::Provinces, error_nodes(Panel::Provinces));
                if origin == LoadOrigin::Refresh {
                    self.touch_timestamp();
                }
            }
        }
        self.finish_refresh_part(origin);
    }

    fn apply_towns(&mut self, province: &str, result: Result<Vec<Town>, CoreError>) {
        if self.store.current_province() != Some(province) {
            debug!(
                province,
                current = ?self.store.current_province(),
                "discarding stale towns result"
            );
            return;
        }

        match result {
            Ok(towns) => {
                info!(province, count = towns.len(), "towns loaded");
                self.store.set_towns(towns);
                self.target
                    .set_children(Panel::Towns, town_nodes(&self.store.towns()));
                self.touch_timestamp();
            }
            Err(e) => {
                warn!(province, error = %e, "towns load failed");
                self.target
                    .set_children(Panel::Towns, error_nodes(Panel::Towns));
            }
        }
    }

    fn apply_schedule(&mut self, province: &str, town: &str, result: Result<Schedule, CoreError>) {
        if !self.store.is_selected(province, town) {
            debug!(
                province,
                town,
                current_province = ?self.store.current_province(),
                current_town = ?self.store.current_town(),
                "discarding stale schedule result"
            );
            return;
        }

        match result {
            Ok(schedule) => {
                info!(province, town, days = schedule.days.len(), "schedule loaded");
                self.store.set_current_schedule(Some(schedule));
                let nodes = schedule_nodes(self.store.current_schedule().as_deref(), today());
                self.target.set_children(Panel::Schedule, nodes);
                self.touch_timestamp();
            }
            Err(e) => {
                warn!(province, town, error = %e, "schedule load failed");
                self.target
                    .set_children(Panel::Schedule, error_nodes(Panel::Schedule));
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn show(&mut self, panel: Panel) {
        debug!(from = %self.panel, to = %panel, "switching panel");
        self.panel = panel;
        for p in Panel::iter() {
            self.target.set_visible(p, p == panel);
        }
    }

    fn enter_towns(&mut self, province: String) {
        self.store.set_current_province(Some(province.clone()));
        self.store.set_current_town(None);
        self.store.set_current_schedule(None);

        self.show(Panel::Towns);
        self.target
            .set_text(Readout::TownsTitle, towns_title(&province));
        self.target.set_children(Panel::Towns, vec![Node::loading()]);

        let source = Arc::clone(&self.source);
        self.spawn_load(async move {
            let result = source.towns(&province).await;
            Completion::Towns { province, result }
        });
    }

    fn enter_schedule(&mut self, province: String, town: String) {
        self.store.set_current_province(Some(province.clone()));
        self.store.set_current_town(Some(town.clone()));
        self.store.set_current_schedule(None);

        self.show(Panel::Schedule);
        self.target
            .set_text(Readout::ScheduleTitle, schedule_title(&town));
        self.target
            .set_children(Panel::Schedule, vec![Node::loading()]);

        let source = Arc::clone(&self.source);
        self.spawn_load(async move {
            let result = source.schedule(&province, &town).await;
            Completion::Schedule {
                province,
                town,
                result,
            }
        });
    }

    fn refresh(&mut self) {
        info!("refreshing provinces and stage");
        self.pending_refresh += 2;
        self.load_provinces(true, LoadOrigin::Refresh);
        self.load_stage(LoadOrigin::Refresh);
    }

    /// Fetch provinces, or re-render the cached list when one exists and
    /// `force` is off.
    fn load_provinces(&mut self, force: bool, origin: LoadOrigin) {
        if !force && !self.store.provinces().is_empty() {
            debug!("rendering cached provinces");
            self.render_provinces();
            self.touch_timestamp();
            return;
        }

        if origin != LoadOrigin::Refresh {
            self.target
                .set_children(Panel::Provinces, vec![Node::loading()]);
        }

        let source = Arc::clone(&self.source);
        self.spawn_load(async move {
            let result = source.provinces().await;
            Completion::Provinces { origin, result }
        });
    }

    fn load_stage(&self, origin: LoadOrigin) {
        let source = Arc::clone(&self.source);
        self.spawn_load(async move {
            let result = source.stage().await;
            Completion::Stage { origin, result }
        });
    }

    fn spawn_load<F>(&self, load: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let completion = load.await;
            if tx.send(completion).await.is_err() {
                debug!("navigator dropped, discarding completion");
            }
        });
    }

    fn render_provinces(&mut self) {
        self.target
            .set_children(Panel::Provinces, province_nodes(&self.store.provinces()));
    }

    fn touch_timestamp(&mut self) {
        self.target
            .set_text(Readout::LastUpdated, last_updated_text(&timestamp_now()));
    }

    fn finish_refresh_part(&mut self, origin: LoadOrigin) {
        if origin != LoadOrigin::Refresh {
            return;
        }
        self.pending_refresh = self.pending_refresh.saturating_sub(1);
        if self.pending_refresh == 0 {
            info!("refresh complete");
        }
    }
}
