use d_gen_assets::layout::MarkerStyle;
use globewatch_core::config::CONFIG_PATH;
use globewatch_core::globe::{POPUP_WIDTH, is_night};
use globewatch_core::loader::{self, Fetched};
use globewatch_core::mockgen::NODE_TYPES;
use globewatch_core::projection::{globe_radius_percent, graticule};
use globewatch_core::route::{self, Route, View};
use globewatch_core::summary::{
    self, CityInfrastructure, HotspotFilter, SeverityCounts, infrastructure_by_city,
};
use globewatch_core::{
    Alert, DashboardConfig, Dataset, DisplacementTimeline, FetchError, GeoCoord, GlobeController,
    HazardKind, Hotspot, Layer, LocationTree, Located, MOCK_SEED, MockDataset, NetworkTopology,
    ScreenPoint, Selection, Severity, Viewport, builtin_hotspots, default_location_tree,
};
#[cfg(target_arch = "wasm32")]
use macroquad::miniquad;
use macroquad::prelude::*;
use std::any::Any;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{error, info};

use crate::charts::{
    TIMELINE_HEIGHT, TimelineLayout, TopologyLayout, draw_timeline, draw_topology,
};
use crate::marker::{
    MarkerAtlas, MarkerDrawConfig, draw_infrastructure_marker, draw_marker,
    draw_population_marker, severity_color,
};
use crate::panels::{
    ACCENT, PANEL_BORDER, PANEL_COLOR, TEXT_MUTED, TEXT_PRIMARY, chip_rects, draw_alert_feed,
    draw_chip, draw_infrastructure_table, draw_metric_card, draw_severity_bars, draw_value_bars,
    feed_entry_at, format_count, format_percent, severity_legend, table_row_at, wrap_words,
};

mod charts;
pub mod console;
mod marker;
mod panels;

const FIXED_STEP_SECONDS: f32 = 1.0 / 60.0;
const MAX_FRAME_SECONDS: f32 = 0.25;

const HEADER_HEIGHT: f32 = 48.0;
const SIDEBAR_WIDTH: f32 = 250.0;
const STAGE_PADDING: f32 = 16.0;
const TREE_ROW_HEIGHT: f32 = 24.0;
const TREE_INDENT: f32 = 14.0;
const LAYER_CHIP_WIDTH: f32 = 112.0;
const FILTER_CHIP_WIDTH: f32 = 118.0;
const CARD_HEIGHT: f32 = 80.0;
const POPUP_LINE_HEIGHT: f32 = 20.0;
const POPUP_WRAP_CHARS: usize = 34;
const ZOOM_BUTTON_SIZE: f32 = 32.0;
const DEFAULT_SCREEN: (f32, f32) = (1280.0, 800.0);

const BACKGROUND: Color = Color::from_rgba(15, 23, 42, 255);
const SPACE_COLOR: Color = Color::from_rgba(2, 6, 23, 255);
const SATELLITE_OCEAN: Color = Color::from_rgba(14, 64, 110, 255);
const FLAT_OCEAN: Color = Color::from_rgba(30, 58, 95, 255);
const ATMOSPHERE_COLOR: Color = Color::from_rgba(56, 189, 248, 40);
const GRID_COLOR: Color = Color::from_rgba(148, 197, 255, 70);
const NIGHT_COLOR: Color = Color::from_rgba(2, 6, 23, 120);

static PENDING_ZOOM_STEPS: AtomicI32 = AtomicI32::new(0);
static PENDING_VIEW: AtomicI32 = AtomicI32::new(-1);
static PENDING_LOCATION: AtomicI32 = AtomicI32::new(-1);
static PENDING_LAYER_TOGGLES: AtomicU32 = AtomicU32::new(0);
static PENDING_CLOSE_POPUP: AtomicBool = AtomicBool::new(false);
static PENDING_RESET: AtomicBool = AtomicBool::new(false);
static PENDING_TIMELINE_TOGGLE: AtomicBool = AtomicBool::new(false);

static CURRENT_VIEW: AtomicI32 = AtomicI32::new(0);
static LAYER_VISIBILITY: AtomicU32 = AtomicU32::new(u32::MAX);
static TRANSITIONING: AtomicBool = AtomicBool::new(false);
static FRAME_FAILED: AtomicBool = AtomicBool::new(false);
static TIMELINE_PLAYING: AtomicBool = AtomicBool::new(false);

static LOCATION_NAMES: OnceLock<Vec<String>> = OnceLock::new();

#[derive(Default)]
struct SelectedHotspotUi {
    present: bool,
    title: String,
    severity: String,
    summary: String,
}

fn selected_hotspot_ui() -> MutexGuard<'static, SelectedHotspotUi> {
    static SELECTED_HOTSPOT_UI: OnceLock<Mutex<SelectedHotspotUi>> = OnceLock::new();
    SELECTED_HOTSPOT_UI
        .get_or_init(|| Mutex::new(SelectedHotspotUi::default()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn text_ptr(present: bool, text: &str) -> *const u8 {
    if present && !text.is_empty() {
        text.as_ptr()
    } else {
        ptr::null()
    }
}

fn text_len(present: bool, text: &str) -> usize {
    if present { text.len() } else { 0 }
}

#[unsafe(no_mangle)]
pub extern "C" fn zoom_in() {
    log_ui_action("zoom in");
    PENDING_ZOOM_STEPS.fetch_add(1, Ordering::SeqCst);
}

#[unsafe(no_mangle)]
pub extern "C" fn zoom_out() {
    log_ui_action("zoom out");
    PENDING_ZOOM_STEPS.fetch_sub(1, Ordering::SeqCst);
}

#[unsafe(no_mangle)]
pub extern "C" fn select_view(index: i32) {
    if index < 0 {
        return;
    }
    log_ui_action("select view");
    PENDING_VIEW.store(index, Ordering::SeqCst);
}

/// Index of the active view, or -1 while the not-found page is shown.
#[unsafe(no_mangle)]
pub extern "C" fn current_view() -> i32 {
    CURRENT_VIEW.load(Ordering::SeqCst)
}

#[unsafe(no_mangle)]
pub extern "C" fn select_location(index: i32) {
    if index < 0 {
        return;
    }
    log_ui_action("select location");
    PENDING_LOCATION.store(index, Ordering::SeqCst);
}

#[unsafe(no_mangle)]
pub extern "C" fn location_count() -> u32 {
    LOCATION_NAMES.get().map_or(0, |names| names.len() as u32)
}

fn location_name(index: u32) -> Option<&'static str> {
    LOCATION_NAMES
        .get()
        .and_then(|names| names.get(index as usize))
        .map(String::as_str)
}

#[unsafe(no_mangle)]
pub extern "C" fn location_name_ptr(index: u32) -> *const u8 {
    location_name(index).map_or(ptr::null(), str::as_ptr)
}

#[unsafe(no_mangle)]
pub extern "C" fn location_name_len(index: u32) -> usize {
    location_name(index).map_or(0, str::len)
}

#[unsafe(no_mangle)]
pub extern "C" fn toggle_layer(index: i32) {
    if !(0..Layer::ALL.len() as i32).contains(&index) {
        return;
    }
    log_ui_action("toggle layer");
    PENDING_LAYER_TOGGLES.fetch_xor(1 << index, Ordering::SeqCst);
}

#[unsafe(no_mangle)]
pub extern "C" fn layer_visible(index: i32) -> i32 {
    if !(0..Layer::ALL.len() as i32).contains(&index) {
        return 0;
    }
    let mask = LAYER_VISIBILITY.load(Ordering::SeqCst);
    if mask & (1 << index) != 0 { 1 } else { 0 }
}

#[unsafe(no_mangle)]
pub extern "C" fn close_popup() {
    log_ui_action("close popup");
    PENDING_CLOSE_POPUP.store(true, Ordering::SeqCst);
}

#[unsafe(no_mangle)]
pub extern "C" fn reset_dashboard() {
    log_ui_action("reset dashboard");
    PENDING_RESET.store(true, Ordering::SeqCst);
}

#[unsafe(no_mangle)]
pub extern "C" fn toggle_timeline() {
    log_ui_action("toggle timeline");
    PENDING_TIMELINE_TOGGLE.store(true, Ordering::SeqCst);
}

#[unsafe(no_mangle)]
pub extern "C" fn timeline_playing() -> i32 {
    if TIMELINE_PLAYING.load(Ordering::SeqCst) { 1 } else { 0 }
}

#[unsafe(no_mangle)]
pub extern "C" fn is_transitioning() -> i32 {
    if TRANSITIONING.load(Ordering::SeqCst) {
        1
    } else {
        0
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn frame_failed() -> i32 {
    if FRAME_FAILED.load(Ordering::SeqCst) {
        1
    } else {
        0
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn selected_hotspot_present() -> i32 {
    if selected_hotspot_ui().present { 1 } else { 0 }
}

#[unsafe(no_mangle)]
pub extern "C" fn selected_hotspot_title_ptr() -> *const u8 {
    let ui = selected_hotspot_ui();
    text_ptr(ui.present, &ui.title)
}

#[unsafe(no_mangle)]
pub extern "C" fn selected_hotspot_title_len() -> usize {
    let ui = selected_hotspot_ui();
    text_len(ui.present, &ui.title)
}

#[unsafe(no_mangle)]
pub extern "C" fn selected_hotspot_severity_ptr() -> *const u8 {
    let ui = selected_hotspot_ui();
    text_ptr(ui.present, &ui.severity)
}

#[unsafe(no_mangle)]
pub extern "C" fn selected_hotspot_severity_len() -> usize {
    let ui = selected_hotspot_ui();
    text_len(ui.present, &ui.severity)
}

#[unsafe(no_mangle)]
pub extern "C" fn selected_hotspot_summary_ptr() -> *const u8 {
    let ui = selected_hotspot_ui();
    text_ptr(ui.present, &ui.summary)
}

#[unsafe(no_mangle)]
pub extern "C" fn selected_hotspot_summary_len() -> usize {
    let ui = selected_hotspot_ui();
    text_len(ui.present, &ui.summary)
}

fn log_ui_action(label: &str) {
    #[cfg(target_arch = "wasm32")]
    miniquad::info!("{}", label);
    #[cfg(not(target_arch = "wasm32"))]
    info!(action = label, "ui action");
}

/// Actions queued by the exported functions, drained once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
enum UiAction {
    ZoomIn,
    ZoomOut,
    SelectView(usize),
    SelectLocation(usize),
    ToggleLayer(Layer),
    ClosePopup,
    Reset,
    ToggleTimeline,
}

fn take_pending_actions() -> Vec<UiAction> {
    let mut actions = Vec::new();

    let zoom_steps = PENDING_ZOOM_STEPS.swap(0, Ordering::SeqCst);
    let zoom_action = if zoom_steps > 0 {
        UiAction::ZoomIn
    } else {
        UiAction::ZoomOut
    };
    actions.extend(std::iter::repeat_n(zoom_action, zoom_steps.unsigned_abs() as usize));

    let view = PENDING_VIEW.swap(-1, Ordering::SeqCst);
    if view >= 0 {
        actions.push(UiAction::SelectView(view as usize));
    }

    let location = PENDING_LOCATION.swap(-1, Ordering::SeqCst);
    if location >= 0 {
        actions.push(UiAction::SelectLocation(location as usize));
    }

    let toggles = PENDING_LAYER_TOGGLES.swap(0, Ordering::SeqCst);
    for (index, layer) in Layer::ALL.into_iter().enumerate() {
        if toggles & (1 << index) != 0 {
            actions.push(UiAction::ToggleLayer(layer));
        }
    }

    if PENDING_CLOSE_POPUP.swap(false, Ordering::SeqCst) {
        actions.push(UiAction::ClosePopup);
    }
    if PENDING_RESET.swap(false, Ordering::SeqCst) {
        actions.push(UiAction::Reset);
    }
    if PENDING_TIMELINE_TOGGLE.swap(false, Ordering::SeqCst) {
        actions.push(UiAction::ToggleTimeline);
    }
    actions
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Layout {
    header: Rect,
    sidebar: Rect,
    content: Rect,
    /// Square area the globe is drawn in.
    stage: Rect,
}

impl Layout {
    fn compute(width: f32, height: f32, with_sidebar: bool) -> Self {
        let body_height = (height - HEADER_HEIGHT).max(0.0);
        let sidebar_width = if with_sidebar {
            SIDEBAR_WIDTH.min(width)
        } else {
            0.0
        };
        let header = Rect::new(0.0, 0.0, width, HEADER_HEIGHT);
        let sidebar = Rect::new(0.0, HEADER_HEIGHT, sidebar_width, body_height);
        let content = Rect::new(
            sidebar_width,
            HEADER_HEIGHT,
            (width - sidebar_width).max(0.0),
            body_height,
        );
        let side = (content.w.min(content.h) - STAGE_PADDING * 2.0).max(1.0);
        let stage = Rect::new(
            content.x + (content.w - side) * 0.5,
            content.y + (content.h - side) * 0.5,
            side,
            side,
        );
        Self {
            header,
            sidebar,
            content,
            stage,
        }
    }

    fn tab_rects(&self) -> Vec<Rect> {
        chip_rects(
            View::ALL.len(),
            self.header.x + 200.0,
            self.header.y + 11.0,
            190.0,
            (self.header.w - 210.0).max(190.0),
        )
    }

    fn tree_rows_top(&self) -> f32 {
        self.sidebar.y + 44.0
    }

    fn layer_chip_rects(&self) -> Vec<Rect> {
        let rows = Layer::ALL.len().div_ceil(2) as f32;
        let top = self.sidebar.y + self.sidebar.h - rows * 32.0 - 8.0;
        chip_rects(
            Layer::ALL.len(),
            self.sidebar.x + 8.0,
            top,
            LAYER_CHIP_WIDTH,
            self.sidebar.w - 16.0,
        )
    }

    fn zoom_button_rects(&self) -> (Rect, Rect) {
        let x = self.stage.x + self.stage.w - ZOOM_BUTTON_SIZE - 12.0;
        let y = self.stage.y + self.stage.h - ZOOM_BUTTON_SIZE * 2.0 - 18.0;
        (
            Rect::new(x, y, ZOOM_BUTTON_SIZE, ZOOM_BUTTON_SIZE),
            Rect::new(x, y + ZOOM_BUTTON_SIZE + 6.0, ZOOM_BUTTON_SIZE, ZOOM_BUTTON_SIZE),
        )
    }

    fn card_rects(&self, count: usize) -> Vec<Rect> {
        let gap = 12.0;
        let inner = (self.content.w - 32.0 - gap * (count as f32 - 1.0)).max(0.0);
        let width = inner / count as f32;
        (0..count)
            .map(|index| {
                Rect::new(
                    self.content.x + 16.0 + index as f32 * (width + gap),
                    self.content.y + 16.0,
                    width,
                    CARD_HEIGHT,
                )
            })
            .collect()
    }

    /// Minimum-severity chips followed by one chip per hazard kind.
    fn filter_chip_rects(&self) -> Vec<Rect> {
        chip_rects(
            Severity::ALL.len() + HazardKind::ALL.len(),
            self.content.x + 16.0,
            self.content.y + CARD_HEIGHT + 28.0,
            FILTER_CHIP_WIDTH,
            self.content.w - 32.0,
        )
    }

    /// Left and right panels filling the content area from `top` down.
    fn panel_columns(&self, top: f32) -> (Rect, Rect) {
        let height = (self.content.y + self.content.h - top - 16.0).max(0.0);
        let half = ((self.content.w - 44.0) * 0.5).max(0.0);
        (
            Rect::new(self.content.x + 16.0, top, half, height),
            Rect::new(self.content.x + 28.0 + half, top, half, height),
        )
    }

    fn risk_panels(&self) -> (Rect, Rect) {
        let chips_bottom = self
            .filter_chip_rects()
            .iter()
            .map(|rect| rect.y + rect.h)
            .fold(self.content.y + CARD_HEIGHT + 28.0, f32::max);
        self.panel_columns(chips_bottom + 16.0)
    }

    fn summary_panels(&self) -> (Rect, Rect) {
        self.panel_columns(self.content.y + CARD_HEIGHT + 32.0)
    }

    fn timeline_panel(&self) -> Rect {
        Rect::new(
            self.content.x + 16.0,
            self.content.y + CARD_HEIGHT + 32.0,
            (self.content.w - 32.0).max(0.0),
            TIMELINE_HEIGHT,
        )
    }

    /// Bar panels below the timeline.
    fn population_panels(&self) -> (Rect, Rect) {
        let timeline = self.timeline_panel();
        self.panel_columns(timeline.y + timeline.h + 16.0)
    }

    fn topology_layout(&self) -> TopologyLayout {
        let (_, right) = self.summary_panels();
        TopologyLayout::new(right, NODE_TYPES.len() + 1)
    }
}

/// Minimum-severity chip order, most inclusive first.
const SEVERITY_CHIPS: [Severity; 4] = [
    Severity::Low,
    Severity::Medium,
    Severity::High,
    Severity::Critical,
];

fn severity_chip_label(severity: Severity) -> String {
    match severity {
        Severity::Critical => severity.label().to_string(),
        other => format!("{}+", other.label()),
    }
}

fn hotspot_summary(hotspot: &Hotspot) -> String {
    format!(
        "{} · {} affected · {} displaced",
        hotspot.kind.as_str(),
        format_count(hotspot.affected_population as f64),
        format_count(hotspot.displaced as f64 * 1_000.0)
    )
}

fn popup_lines(hotspot: &Hotspot) -> Vec<String> {
    let mut lines = vec![
        format!("{} · {}", hotspot.severity.label(), hotspot.kind.as_str()),
        format!("Magnitude {:.1}", hotspot.magnitude),
        format!(
            "Affected: {}",
            format_count(hotspot.affected_population as f64)
        ),
        format!(
            "Displaced: {}",
            format_count(hotspot.displaced as f64 * 1_000.0)
        ),
        format!("Infrastructure at risk: {}", hotspot.infrastructure_at_risk),
        format!("Active events: {}", hotspot.events),
        format!("Updated {}", hotspot.last_update),
    ];
    lines.extend(wrap_words(&hotspot.description, POPUP_WRAP_CHARS));
    lines
}

fn close_button_rect(popup: Rect) -> Rect {
    Rect::new(popup.x + popup.w - 26.0, popup.y + 6.0, 20.0, 20.0)
}

/// Visible and not pinned to the stage border by the projection clamp.
fn on_stage(point: ScreenPoint) -> bool {
    point.visible && point.x > 0.0 && point.x < 100.0 && point.y > 0.0 && point.y < 100.0
}

fn stage_point(stage: Rect, pixel: (f64, f64)) -> Vec2 {
    vec2(stage.x + pixel.0 as f32, stage.y + pixel.1 as f32)
}

fn night_samples() -> Vec<GeoCoord> {
    let mut samples = Vec::new();
    for lat in (-80..=80).step_by(10) {
        for lon in (-180..180).step_by(10) {
            samples.push(GeoCoord::new(lat as f64, lon as f64));
        }
    }
    samples
}

#[cfg_attr(target_arch = "wasm32", allow(dead_code))]
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn fetch_text(path: &str) -> Fetched {
    load_string(path)
        .await
        .map_err(|err| FetchError::new(path, err))
}

struct DashboardState {
    config: DashboardConfig,
    route: Route,
    globe: GlobeController,
    hotspots: Vec<Hotspot>,
    alerts: Vec<Alert>,
    dataset: Dataset,
    infrastructure: Vec<CityInfrastructure>,
    tree: LocationTree,
    filter: HotspotFilter,
    markers: MarkerDrawConfig,
    atlas: Option<MarkerAtlas>,
    grid: Vec<Vec<GeoCoord>>,
    night: Vec<GeoCoord>,
    screen: (f32, f32),
    layout: Layout,
    timeline: DisplacementTimeline,
    /// Row of `infrastructure` shown in the network panel.
    topology_city: usize,
    /// Index into `NODE_TYPES`; `None` shows every type.
    topology_type: Option<usize>,
    topology: NetworkTopology,
    selected_node: Option<usize>,
}

impl DashboardState {
    fn new(
        config: DashboardConfig,
        hotspots: Vec<Hotspot>,
        alerts: Vec<Alert>,
        dataset: Dataset,
    ) -> Self {
        let route = Route::View(config.default_view);
        let layout = Layout::compute(DEFAULT_SCREEN.0, DEFAULT_SCREEN.1, true);
        let viewport = Viewport::new(layout.stage.w as f64, layout.stage.h as f64);
        let mut state = Self {
            globe: GlobeController::from_config(&config, viewport),
            infrastructure: infrastructure_by_city(&dataset),
            config,
            route,
            hotspots,
            alerts,
            dataset,
            tree: LocationTree::new(default_location_tree()),
            filter: HotspotFilter::default(),
            markers: MarkerDrawConfig::default(),
            atlas: None,
            grid: graticule(12, 8, 64),
            night: night_samples(),
            screen: DEFAULT_SCREEN,
            layout,
            timeline: DisplacementTimeline::new(MockDataset::new(MOCK_SEED).displacement_timeline()),
            topology_city: 0,
            topology_type: None,
            topology: NetworkTopology::default(),
            selected_node: None,
        };
        state.rebuild_topology();
        state.relayout();
        state
    }

    async fn load() -> Self {
        let config = loader::resolve_config(CONFIG_PATH, fetch_text(CONFIG_PATH).await);
        let paths = config.data.clone();
        let alerts = loader::resolve_alerts(&paths.alerts, fetch_text(&paths.alerts).await);
        let dataset = loader::resolve_dataset(
            fetch_text(&paths.cities).await,
            fetch_text(&paths.nodes).await,
            fetch_text(&paths.edges).await,
        );

        let mut state = Self::new(config, builtin_hotspots(), alerts, dataset);
        state.atlas = MarkerAtlas::load_from_assets().await;
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(path) = std::env::args().nth(1) {
            state.navigate(&path);
        }
        info!(
            hotspots = state.hotspots.len(),
            alerts = state.alerts.len(),
            cities = state.dataset.cities().len(),
            "dashboard ready"
        );
        state
    }

    fn navigate(&mut self, path: &str) {
        self.route = route::resolve(path);
        info!(path, route = ?self.route, "navigated");
        self.relayout();
    }

    fn select_view_index(&mut self, index: usize) {
        match View::from_index(index) {
            Some(view) => self.navigate(view.path()),
            None => self.navigate(&format!("/view/{index}")),
        }
    }

    fn on_globe_view(&self) -> bool {
        self.route == Route::View(View::GlobalOverview)
    }

    fn set_screen(&mut self, width: f32, height: f32) {
        if self.screen != (width, height) {
            self.screen = (width, height);
            self.relayout();
        }
    }

    fn relayout(&mut self) {
        self.layout = Layout::compute(self.screen.0, self.screen.1, self.on_globe_view());
        self.globe.set_viewport(Viewport::new(
            self.layout.stage.w as f64,
            self.layout.stage.h as f64,
        ));
    }

    fn reset(&mut self) {
        self.globe.reset(&self.config);
        self.filter = HotspotFilter::default();
        self.tree.collapse_all();
        self.route = Route::View(self.config.default_view);
        self.timeline.reset();
        self.topology_city = 0;
        self.topology_type = None;
        self.rebuild_topology();
        self.relayout();
        info!("dashboard reset");
    }

    fn fixed_update(&mut self) {
        self.globe.update(FIXED_STEP_SECONDS as f64, &self.hotspots);
        self.timeline.advance(FIXED_STEP_SECONDS as f64);
    }

    fn topology_city_name(&self) -> &str {
        self.infrastructure
            .get(self.topology_city)
            .map_or("no city", |row| row.name.as_str())
    }

    fn rebuild_topology(&mut self) {
        self.selected_node = None;
        self.topology = match self.infrastructure.get(self.topology_city) {
            Some(row) => NetworkTopology::for_city(
                &self.dataset,
                &row.city_id,
                self.topology_type.and_then(|index| NODE_TYPES.get(index).copied()),
            ),
            None => NetworkTopology::default(),
        };
    }

    fn show_topology_city(&mut self, index: usize) {
        if index >= self.infrastructure.len() {
            return;
        }
        self.topology_city = index;
        self.rebuild_topology();
        info!(
            city = self.topology_city_name(),
            nodes = self.topology.nodes().len(),
            "network city selected"
        );
    }

    fn step_topology_city(&mut self, forward: bool) {
        let count = self.infrastructure.len();
        if count == 0 {
            return;
        }
        let next = if forward {
            (self.topology_city + 1) % count
        } else {
            (self.topology_city + count - 1) % count
        };
        self.show_topology_city(next);
    }

    fn toggle_timeline(&mut self) {
        let playing = self.timeline.toggle_playback();
        info!(playing, index = self.timeline.index(), "timeline playback");
    }

    fn apply_action(&mut self, action: UiAction) {
        match action {
            UiAction::ZoomIn => self.globe.zoom_in(),
            UiAction::ZoomOut => self.globe.zoom_out(),
            UiAction::SelectView(index) => self.select_view_index(index),
            UiAction::SelectLocation(index) => {
                let selection = self
                    .tree
                    .sites()
                    .get(index)
                    .and_then(|node| node.selection());
                if let Some(selection) = selection {
                    self.fly_to_selection(&selection);
                }
            }
            UiAction::ToggleLayer(layer) => {
                self.globe.toggle_layer(layer);
            }
            UiAction::ClosePopup => self.globe.close_popup(),
            UiAction::Reset => self.reset(),
            UiAction::ToggleTimeline => self.toggle_timeline(),
        }
    }

    /// Switches to the globe and flies there.
    fn fly_to_selection(&mut self, selection: &Selection) {
        if !self.on_globe_view() {
            self.navigate(View::GlobalOverview.path());
        }
        if self.globe.fly_to_selection(selection) {
            info!(name = %selection.name, "flying to selection");
        }
    }

    fn selected_hotspot(&self) -> Option<&Hotspot> {
        let id = self.globe.selected()?;
        self.hotspots.iter().find(|hotspot| hotspot.id == id)
    }

    fn popup_rect(&self) -> Option<Rect> {
        let anchor = self.globe.popup()?;
        let hotspot = self.selected_hotspot()?;
        let lines = popup_lines(hotspot).len() as f32;
        Some(Rect::new(
            self.layout.stage.x + anchor.x as f32,
            self.layout.stage.y + anchor.y as f32,
            POPUP_WIDTH as f32,
            44.0 + lines * POPUP_LINE_HEIGHT,
        ))
    }

    fn handle_keyboard(&mut self) {
        if is_key_pressed(KeyCode::Escape) {
            self.globe.close_popup();
        }
        let view_keys = [KeyCode::Key1, KeyCode::Key2, KeyCode::Key3, KeyCode::Key4];
        for (index, key) in view_keys.into_iter().enumerate() {
            if is_key_pressed(key) {
                self.select_view_index(index);
            }
        }
        if is_key_pressed(KeyCode::Equal) || is_key_pressed(KeyCode::KpAdd) {
            self.globe.zoom_in();
        }
        if is_key_pressed(KeyCode::Minus) || is_key_pressed(KeyCode::KpSubtract) {
            self.globe.zoom_out();
        }
        if is_key_pressed(KeyCode::R) {
            self.reset();
        }
        if is_key_pressed(KeyCode::Space)
            && self.route == Route::View(View::PopulationDisplacement)
        {
            self.toggle_timeline();
        }
    }

    fn handle_mouse_wheel_zoom(&mut self) {
        let (_wheel_x, wheel_y) = mouse_wheel();
        if wheel_y == 0.0 || !self.on_globe_view() {
            return;
        }
        let (mouse_x, mouse_y) = mouse_position();
        if !self.layout.stage.contains(vec2(mouse_x, mouse_y)) {
            return;
        }
        if wheel_y > 0.0 {
            self.globe.zoom_in();
        } else {
            self.globe.zoom_out();
        }
    }

    fn handle_left_click(&mut self) {
        if !is_mouse_button_pressed(MouseButton::Left) {
            return;
        }
        let (mouse_x, mouse_y) = mouse_position();
        self.click_at(vec2(mouse_x, mouse_y));
    }

    fn handle_drag(&mut self) {
        if !self.globe.is_dragging() {
            return;
        }
        if is_mouse_button_down(MouseButton::Left) {
            let (mouse_x, mouse_y) = mouse_position();
            self.globe.pointer_move(
                (mouse_x - self.layout.stage.x) as f64,
                (mouse_y - self.layout.stage.y) as f64,
            );
        } else {
            self.globe.pointer_up();
        }
    }

    fn click_at(&mut self, point: Vec2) {
        if let Some(index) = self
            .layout
            .tab_rects()
            .iter()
            .position(|rect| rect.contains(point))
        {
            self.select_view_index(index);
            return;
        }

        match self.route {
            Route::View(View::GlobalOverview) => self.click_globe_view(point),
            Route::View(View::RiskAssessment) => self.click_risk_view(point),
            Route::View(View::InfrastructureImpact) => self.click_infrastructure_view(point),
            Route::View(View::PopulationDisplacement) => self.click_population_view(point),
            Route::NotFound(_) => {}
        }
    }

    fn click_globe_view(&mut self, point: Vec2) {
        if let Some(popup) = self.popup_rect() {
            if close_button_rect(popup).contains(point) {
                self.globe.close_popup();
                return;
            }
            if popup.contains(point) {
                return;
            }
            self.globe.close_popup();
        }

        let (zoom_in_rect, zoom_out_rect) = self.layout.zoom_button_rects();
        if zoom_in_rect.contains(point) {
            self.globe.zoom_in();
            return;
        }
        if zoom_out_rect.contains(point) {
            self.globe.zoom_out();
            return;
        }

        if self.layout.sidebar.contains(point) {
            self.click_sidebar(point);
            return;
        }

        let stage = self.layout.stage;
        if stage.contains(point) {
            self.click_stage((point.x - stage.x) as f64, (point.y - stage.y) as f64);
        }
    }

    fn click_sidebar(&mut self, point: Vec2) {
        if let Some(index) = self
            .layout
            .layer_chip_rects()
            .iter()
            .position(|rect| rect.contains(point))
        {
            if let Some(layer) = Layer::from_index(index) {
                self.globe.toggle_layer(layer);
            }
            return;
        }

        let offset = point.y - self.layout.tree_rows_top();
        if offset < 0.0 {
            return;
        }
        let row = (offset / TREE_ROW_HEIGHT) as usize;
        let clicked = self
            .tree
            .visible_rows()
            .get(row)
            .map(|visible| (visible.node.id.clone(), visible.node.is_group(), visible.node.selection()));
        match clicked {
            Some((id, true, _)) => {
                let expanded = self.tree.toggle(&id);
                info!(id = %id, expanded, "location group toggled");
            }
            Some((_, false, Some(selection))) => self.fly_to_selection(&selection),
            _ => {}
        }
    }

    /// Click in stage-local pixels: hazard markers win over alert dots,
    /// anything else starts a drag.
    fn click_stage(&mut self, x: f64, y: f64) {
        let layers = self.globe.layers();
        let radius = self.markers.hit_radius(self.globe.camera().zoom) as f64;

        if layers.hazards {
            let visible = self.on_stage_only(self.filter.hotspots(&self.hotspots));
            if let Some(hotspot) = self.globe.hit_test(&visible, x, y, radius) {
                if self.globe.select_hotspot(hotspot) {
                    info!(id = %hotspot.id, "hotspot selected");
                }
                return;
            }
        }

        if layers.population {
            let alerts = self.on_stage_only(self.filter.alerts(&self.alerts));
            if let Some(alert) = self.globe.hit_test(&alerts, x, y, radius) {
                let selection = Selection::from_located(*alert);
                self.globe.fly_to_selection(&selection);
                return;
            }
        }

        self.globe.pointer_down(x, y);
    }

    fn on_stage_only<'a, T: Located>(&self, mut items: Vec<&'a T>) -> Vec<&'a T> {
        items.retain(|item| on_stage(self.globe.project(item.coord())));
        items
    }

    fn click_risk_view(&mut self, point: Vec2) {
        let chips = self.layout.filter_chip_rects();
        if let Some(index) = chips.iter().position(|rect| rect.contains(point)) {
            match SEVERITY_CHIPS.get(index) {
                Some(severity) => self.filter.min_severity = *severity,
                None => {
                    if let Some(kind) = HazardKind::ALL.get(index - SEVERITY_CHIPS.len()) {
                        self.filter.toggle_kind(*kind);
                    }
                }
            }
            return;
        }

        let (_, feed_rect) = self.layout.risk_panels();
        let feed = self.filtered_feed();
        let selection = feed_entry_at(feed_rect, point, feed.len())
            .and_then(|index| feed.get(index))
            .map(|alert| Selection::from_located(*alert));
        if let Some(selection) = selection {
            self.fly_to_selection(&selection);
        }
    }

    fn click_infrastructure_view(&mut self, point: Vec2) {
        let (table, _) = self.layout.summary_panels();
        if let Some(row) = table_row_at(table, point, self.infrastructure.len()) {
            self.show_topology_city(row);
            return;
        }

        let layout = self.layout.topology_layout();
        if layout.prev.contains(point) {
            self.step_topology_city(false);
            return;
        }
        if layout.next.contains(point) {
            self.step_topology_city(true);
            return;
        }
        // Chip 0 is "All", the rest follow `NODE_TYPES`.
        if let Some(chip) = layout.type_chips.iter().position(|rect| rect.contains(point)) {
            self.topology_type = chip.checked_sub(1);
            self.rebuild_topology();
            return;
        }
        if layout.graph.contains(point) {
            self.selected_node = layout.node_at(&self.topology, point);
        }
    }

    fn click_population_view(&mut self, point: Vec2) {
        let layout = TimelineLayout::new(self.layout.timeline_panel());
        if layout.play.contains(point) {
            self.toggle_timeline();
        } else if layout.speed.contains(point) {
            let speed = self.timeline.cycle_speed();
            info!(speed, "timeline speed");
        } else if let Some(index) = layout.marker_at(self.timeline.len(), point) {
            self.timeline.seek(index);
        }
    }

    fn filtered_feed(&self) -> Vec<&Alert> {
        let mut feed = summary::live_feed(&self.alerts);
        feed.retain(|alert| self.filter.matches_alert(alert));
        feed
    }

    fn sync_ui(&self) {
        let view = match self.route {
            Route::View(view) => view.index() as i32,
            Route::NotFound(_) => -1,
        };
        CURRENT_VIEW.store(view, Ordering::SeqCst);
        TRANSITIONING.store(self.globe.is_transitioning(), Ordering::SeqCst);
        TIMELINE_PLAYING.store(self.timeline.is_playing(), Ordering::SeqCst);

        let layers = self.globe.layers();
        let mask = Layer::ALL
            .into_iter()
            .enumerate()
            .filter(|(_, layer)| layers.is_visible(*layer))
            .fold(0u32, |mask, (index, _)| mask | (1 << index));
        LAYER_VISIBILITY.store(mask, Ordering::SeqCst);

        let mut ui = selected_hotspot_ui();
        ui.title.clear();
        ui.severity.clear();
        ui.summary.clear();
        match self.selected_hotspot() {
            Some(hotspot) => {
                ui.present = true;
                ui.title.push_str(&hotspot.title);
                ui.severity.push_str(hotspot.severity.label());
                ui.summary.push_str(&hotspot_summary(hotspot));
            }
            None => ui.present = false,
        }
    }

    fn render(&self) {
        clear_background(BACKGROUND);
        match &self.route {
            Route::View(View::GlobalOverview) => {
                self.render_globe();
                self.render_sidebar();
            }
            Route::View(View::RiskAssessment) => self.render_risk(),
            Route::View(View::InfrastructureImpact) => self.render_infrastructure(),
            Route::View(View::PopulationDisplacement) => self.render_population(),
            Route::NotFound(path) => self.render_not_found(path),
        }
        self.render_header();
    }

    fn render_header(&self) {
        let header = self.layout.header;
        draw_rectangle(header.x, header.y, header.w, header.h, PANEL_COLOR);
        draw_line(
            header.x,
            header.y + header.h,
            header.x + header.w,
            header.y + header.h,
            1.0,
            PANEL_BORDER,
        );
        draw_text("GLOBEWATCH", 20.0, 32.0, 28.0, ACCENT);
        for (view, rect) in View::ALL.into_iter().zip(self.layout.tab_rects()) {
            draw_chip(rect, view.title(), self.route == Route::View(view));
        }
    }

    fn render_globe(&self) {
        let stage = self.layout.stage;
        let camera = self.globe.camera();
        let layers = self.globe.layers();
        let center = vec2(stage.x + stage.w * 0.5, stage.y + stage.h * 0.5);
        let radius = (globe_radius_percent(camera.zoom) / 100.0) as f32 * stage.w;

        draw_rectangle(stage.x, stage.y, stage.w, stage.h, SPACE_COLOR);
        if layers.atmosphere {
            draw_circle(center.x, center.y, radius * 1.06, ATMOSPHERE_COLOR);
        }
        let ocean = if layers.satellite {
            SATELLITE_OCEAN
        } else {
            FLAT_OCEAN
        };
        draw_circle(center.x, center.y, radius, ocean);

        if layers.grid {
            self.draw_grid();
        }
        if layers.day_night {
            self.draw_night_side();
        }
        if layers.infrastructure {
            self.draw_infrastructure_layer();
        }
        if layers.population {
            let alerts = self.filter.alerts(&self.alerts);
            for marker in self.globe.project_markers(&alerts) {
                if on_stage(marker.point) {
                    draw_population_marker(
                        stage_point(stage, marker.pixel),
                        marker.item.severity,
                        marker.item.displaced,
                    );
                }
            }
        }
        if layers.hazards {
            let visible = self.filter.hotspots(&self.hotspots);
            for marker in self.globe.project_markers(&visible) {
                if !on_stage(marker.point) {
                    continue;
                }
                let style = if self.globe.selected() == Some(marker.item.id.as_str()) {
                    MarkerStyle::Selected
                } else {
                    MarkerStyle::Normal
                };
                draw_marker(
                    stage_point(stage, marker.pixel),
                    marker.item.severity,
                    style,
                    camera.zoom,
                    &self.markers,
                    self.atlas.as_ref(),
                );
            }
        }
        draw_circle_lines(center.x, center.y, radius, 1.5, Color::from_rgba(148, 197, 255, 120));

        self.draw_zoom_buttons();
        severity_legend(stage.x + 12.0, stage.y + stage.h - 12.0);
        draw_text(
            &format!(
                "pitch {:.1}  yaw {:.1}  zoom {:.2}",
                camera.rotation.x,
                camera.normalized_yaw(),
                camera.zoom
            ),
            stage.x + 12.0,
            stage.y + 22.0,
            16.0,
            TEXT_MUTED,
        );
        self.draw_popup();
    }

    fn draw_grid(&self) {
        let stage = self.layout.stage;
        for line in &self.grid {
            let points: Vec<_> = line.iter().map(|coord| self.globe.project(*coord)).collect();
            for pair in points.windows(2) {
                if !(pair[0].visible && pair[1].visible) {
                    continue;
                }
                let viewport = self.globe.viewport();
                let from = stage_point(stage, viewport.to_pixels(pair[0]));
                let to = stage_point(stage, viewport.to_pixels(pair[1]));
                draw_line(from.x, from.y, to.x, to.y, 1.0, GRID_COLOR);
            }
        }
    }

    fn draw_night_side(&self) {
        let stage = self.layout.stage;
        let phase = self.globe.day_night_phase();
        let dot = (stage.w / 90.0).max(2.0) * (self.globe.camera().zoom as f32).sqrt();
        for coord in &self.night {
            if !is_night(*coord, phase) {
                continue;
            }
            let point = self.globe.project(*coord);
            if point.visible {
                let pos = stage_point(stage, self.globe.viewport().to_pixels(point));
                draw_circle(pos.x, pos.y, dot, NIGHT_COLOR);
            }
        }
    }

    fn draw_infrastructure_layer(&self) {
        let stage = self.layout.stage;
        for row in &self.infrastructure {
            let Some(city) = self.dataset.city(&row.city_id) else {
                continue;
            };
            let point = self.globe.project(city.coord());
            if on_stage(point) {
                let pos = stage_point(stage, self.globe.viewport().to_pixels(point));
                draw_infrastructure_marker(pos, row.severity, row.nodes);
            }
        }
    }

    fn draw_zoom_buttons(&self) {
        let (zoom_in_rect, zoom_out_rect) = self.layout.zoom_button_rects();
        for (rect, label) in [(zoom_in_rect, "+"), (zoom_out_rect, "-")] {
            draw_rectangle(rect.x, rect.y, rect.w, rect.h, PANEL_COLOR);
            draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, PANEL_BORDER);
            draw_text(label, rect.x + 10.0, rect.y + 23.0, 26.0, TEXT_PRIMARY);
        }
    }

    fn draw_popup(&self) {
        let (Some(rect), Some(hotspot)) = (self.popup_rect(), self.selected_hotspot()) else {
            return;
        };
        draw_rectangle(rect.x, rect.y, rect.w, rect.h, Color::from_rgba(15, 23, 42, 235));
        draw_rectangle(rect.x, rect.y, rect.w, 4.0, severity_color(hotspot.severity));
        draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, PANEL_BORDER);
        draw_text(
            &panels::ellipsize(&hotspot.title, 26),
            rect.x + 12.0,
            rect.y + 26.0,
            20.0,
            TEXT_PRIMARY,
        );
        let close = close_button_rect(rect);
        draw_text("x", close.x + 5.0, close.y + 15.0, 20.0, TEXT_MUTED);
        for (index, line) in popup_lines(hotspot).iter().enumerate() {
            draw_text(
                line,
                rect.x + 12.0,
                rect.y + 50.0 + index as f32 * POPUP_LINE_HEIGHT,
                16.0,
                TEXT_MUTED,
            );
        }
    }

    fn render_sidebar(&self) {
        let sidebar = self.layout.sidebar;
        draw_rectangle(sidebar.x, sidebar.y, sidebar.w, sidebar.h, PANEL_COLOR);
        draw_line(
            sidebar.x + sidebar.w,
            sidebar.y,
            sidebar.x + sidebar.w,
            sidebar.y + sidebar.h,
            1.0,
            PANEL_BORDER,
        );
        draw_text("Locations", sidebar.x + 12.0, sidebar.y + 28.0, 22.0, TEXT_PRIMARY);

        let chips = self.layout.layer_chip_rects();
        let rows_bottom = chips
            .first()
            .map_or(sidebar.y + sidebar.h, |rect| rect.y - 28.0);
        let top = self.layout.tree_rows_top();
        for (index, row) in self.tree.visible_rows().iter().enumerate() {
            let y = top + index as f32 * TREE_ROW_HEIGHT;
            if y + TREE_ROW_HEIGHT > rows_bottom {
                break;
            }
            let x = sidebar.x + 12.0 + row.depth as f32 * TREE_INDENT;
            let prefix = match (row.node.is_group(), row.expanded) {
                (true, true) => "v ",
                (true, false) => "> ",
                (false, _) => "  ",
            };
            draw_circle(x + 4.0, y + 12.0, 4.0, severity_color(row.node.severity()));
            draw_text(
                &format!("{prefix}{}", row.node.name),
                x + 12.0,
                y + 17.0,
                18.0,
                TEXT_PRIMARY,
            );
        }

        draw_text("Layers", sidebar.x + 12.0, rows_bottom + 20.0, 20.0, TEXT_PRIMARY);
        let layers = self.globe.layers();
        for (layer, rect) in Layer::ALL.into_iter().zip(chips) {
            draw_chip(rect, &panels::ellipsize(layer.label(), 12), layers.is_visible(layer));
        }
    }

    fn render_risk(&self) {
        let hotspots = self.filter.hotspots(&self.hotspots);
        let counts = SeverityCounts::tally(hotspots.iter().copied());
        let feed = self.filtered_feed();
        let cards = self.layout.card_rects(4);
        let values = [
            ("Active hotspots", counts.total().to_string(), ACCENT),
            (
                "Critical",
                counts.get(Severity::Critical).to_string(),
                severity_color(Severity::Critical),
            ),
            (
                "Displaced (alerts)",
                format_count(feed.iter().map(|alert| alert.displaced).sum::<f64>() * 1_000.0),
                severity_color(Severity::High),
            ),
            (
                "Mean confidence",
                summary::mean_confidence(&self.alerts).map_or("-".to_string(), format_percent),
                severity_color(Severity::Low),
            ),
        ];
        for (rect, (label, value, accent)) in cards.into_iter().zip(values) {
            draw_metric_card(rect, label, &value, accent);
        }

        let chips = self.layout.filter_chip_rects();
        for (index, rect) in chips.into_iter().enumerate() {
            match SEVERITY_CHIPS.get(index) {
                Some(severity) => draw_chip(
                    rect,
                    &severity_chip_label(*severity),
                    self.filter.min_severity == *severity,
                ),
                None => {
                    if let Some(kind) = HazardKind::ALL.get(index - SEVERITY_CHIPS.len()) {
                        draw_chip(rect, kind.as_str(), self.filter.kinds.contains(kind));
                    }
                }
            }
        }

        let (bars, feed_rect) = self.layout.risk_panels();
        draw_severity_bars(bars, &counts);
        draw_alert_feed(feed_rect, &feed);
    }

    fn render_infrastructure(&self) {
        let nodes: usize = self.infrastructure.iter().map(|row| row.nodes).sum();
        let edges: usize = self.infrastructure.iter().map(|row| row.edges).sum();
        let offline: usize = self
            .infrastructure
            .iter()
            .map(|row| row.status("offline"))
            .sum();
        let values = [
            ("Cities", self.infrastructure.len().to_string(), ACCENT),
            ("Nodes", nodes.to_string(), severity_color(Severity::Low)),
            ("Links", edges.to_string(), severity_color(Severity::Medium)),
            ("Offline nodes", offline.to_string(), severity_color(Severity::Critical)),
        ];
        for (rect, (label, value, accent)) in self.layout.card_rects(4).into_iter().zip(values) {
            draw_metric_card(rect, label, &value, accent);
        }

        let (table, _) = self.layout.summary_panels();
        let selected_row = (!self.infrastructure.is_empty()).then_some(self.topology_city);
        draw_infrastructure_table(table, &self.infrastructure, selected_row);

        let mut type_labels = vec!["All"];
        type_labels.extend(NODE_TYPES);
        draw_topology(
            &self.layout.topology_layout(),
            self.topology_city_name(),
            &self.topology,
            &type_labels,
            self.topology_type.map_or(0, |index| index + 1),
            self.selected_node,
        );
    }

    fn render_population(&self) {
        let by_country = summary::displaced_by_country(&self.hotspots);
        let hotspot_total: u64 = self.hotspots.iter().map(|hotspot| hotspot.displaced).sum();
        let affected: u64 = self
            .hotspots
            .iter()
            .map(|hotspot| hotspot.affected_population)
            .sum();
        let values = [
            (
                "Displaced (hotspots)",
                format_count(hotspot_total as f64 * 1_000.0),
                severity_color(Severity::Critical),
            ),
            ("Affected", format_count(affected as f64), severity_color(Severity::High)),
            (
                "Displaced (alerts)",
                format_count(summary::total_displaced(&self.alerts) * 1_000.0),
                severity_color(Severity::Medium),
            ),
            ("Countries", by_country.len().to_string(), ACCENT),
        ];
        for (rect, (label, value, accent)) in self.layout.card_rects(4).into_iter().zip(values) {
            draw_metric_card(rect, label, &value, accent);
        }

        draw_timeline(&TimelineLayout::new(self.layout.timeline_panel()), &self.timeline);

        let (left, right) = self.layout.population_panels();
        let country_rows: Vec<(String, f64)> = by_country
            .into_iter()
            .map(|(country, displaced)| (country, displaced as f64 * 1_000.0))
            .collect();
        draw_value_bars(
            left,
            "Displaced by country",
            &country_rows,
            severity_color(Severity::High),
        );
        let alert_rows: Vec<(String, f64)> = summary::live_feed(&self.alerts)
            .into_iter()
            .map(|alert| (alert.name.clone(), alert.displaced * 1_000.0))
            .collect();
        draw_value_bars(right, "Displaced by alert area", &alert_rows, ACCENT);
    }

    fn render_not_found(&self, path: &str) {
        let content = self.layout.content;
        let x = content.x + 40.0;
        let y = content.y + content.h * 0.4;
        draw_text("Page not found", x, y, 40.0, TEXT_PRIMARY);
        draw_text(
            &format!("No view matches `{path}`."),
            x,
            y + 36.0,
            20.0,
            TEXT_MUTED,
        );
        draw_text(
            "Pick a view above or press 1 for the global overview.",
            x,
            y + 64.0,
            20.0,
            TEXT_MUTED,
        );
    }
}

fn render_fallback(message: &str) {
    clear_background(BACKGROUND);
    let x = 40.0;
    let y = screen_height() * 0.4;
    draw_text("Something went wrong", x, y, 40.0, severity_color(Severity::Critical));
    draw_text(
        &panels::ellipsize(message, 100),
        x,
        y + 36.0,
        20.0,
        TEXT_MUTED,
    );
    draw_text("Press R to reset the dashboard.", x, y + 64.0, 20.0, TEXT_PRIMARY);
}

fn frame(dashboard: &mut DashboardState, accumulator: &mut f32) {
    // Consume real elapsed time in fixed-size simulation steps.
    *accumulator += get_frame_time().min(MAX_FRAME_SECONDS);
    while *accumulator >= FIXED_STEP_SECONDS {
        dashboard.fixed_update();
        *accumulator -= FIXED_STEP_SECONDS;
    }

    for action in take_pending_actions() {
        dashboard.apply_action(action);
    }

    dashboard.set_screen(screen_width(), screen_height());
    dashboard.handle_keyboard();
    dashboard.handle_mouse_wheel_zoom();
    dashboard.handle_left_click();
    dashboard.handle_drag();

    dashboard.render();
    dashboard.sync_ui();
}

#[cfg(not(target_arch = "wasm32"))]
fn guarded_frame(dashboard: &mut DashboardState, accumulator: &mut f32) -> Result<(), String> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| frame(dashboard, accumulator)))
        .map_err(|payload| panic_message(payload.as_ref()))
}

#[cfg(target_arch = "wasm32")]
fn guarded_frame(dashboard: &mut DashboardState, accumulator: &mut f32) -> Result<(), String> {
    frame(dashboard, accumulator);
    Ok(())
}

pub async fn run() {
    install_panic_hook();
    init_logging();

    let mut dashboard = DashboardState::load().await;
    let names = dashboard
        .tree
        .sites()
        .iter()
        .map(|node| node.name.clone())
        .collect();
    let _ = LOCATION_NAMES.set(names);

    let mut accumulator = 0.0_f32;
    let mut failure: Option<String> = None;

    loop {
        if let Some(message) = &failure {
            render_fallback(message);
            let reset_requested = take_pending_actions().contains(&UiAction::Reset);
            if reset_requested || is_key_pressed(KeyCode::R) {
                dashboard.reset();
                accumulator = 0.0;
                failure = None;
                FRAME_FAILED.store(false, Ordering::SeqCst);
            }
            next_frame().await;
            continue;
        }

        if let Err(message) = guarded_frame(&mut dashboard, &mut accumulator) {
            error!(%message, "frame failed, showing fallback screen");
            FRAME_FAILED.store(true, Ordering::SeqCst);
            failure = Some(message);
        }

        next_frame().await;
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn init_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::filter::LevelFilter;

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(target_arch = "wasm32")]
fn init_logging() {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::prelude::*;

    let layer = console::ConsoleLayer::new(console::miniquad_sink).with_filter(LevelFilter::INFO);
    let _ = tracing_subscriber::registry().with(layer).try_init();
}

#[cfg(target_arch = "wasm32")]
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let msg = info.to_string();
        if let Some(location) = info.location() {
            miniquad::error!("panic at {}:{}: {}", location.file(), location.line(), msg);
        } else {
            miniquad::error!("panic: {}", msg);
        }
    }));
}

#[cfg(not(target_arch = "wasm32"))]
fn install_panic_hook() {}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(id: &str, name: &str, lat: f64, lon: f64, severity: Severity) -> Alert {
        Alert {
            id: id.to_string(),
            name: name.to_string(),
            coord: GeoCoord::new(lat, lon),
            severity,
            displaced: 500.0,
            confidence: 0.9,
        }
    }

    fn dashboard() -> DashboardState {
        let alerts = vec![
            alert("1", "Manila, Philippines", 14.5995, 120.9842, Severity::Critical),
            alert("2", "Miami, United States", 25.7617, -80.1918, Severity::Low),
        ];
        DashboardState::new(
            DashboardConfig::default(),
            builtin_hotspots(),
            alerts,
            Dataset::default(),
        )
    }

    fn finish_flight(dashboard: &mut DashboardState) {
        for _ in 0..400 {
            dashboard.fixed_update();
        }
        assert!(!dashboard.globe.is_transitioning());
    }

    fn center(rect: Rect) -> Vec2 {
        vec2(rect.x + rect.w * 0.5, rect.y + rect.h * 0.5)
    }

    #[test]
    fn layout_keeps_square_stage_beside_sidebar() {
        let layout = Layout::compute(1280.0, 800.0, true);
        assert_eq!(layout.sidebar.w, SIDEBAR_WIDTH);
        assert_eq!(layout.stage.w, layout.stage.h);
        assert_eq!(layout.stage, Rect::new(405.0, 64.0, 720.0, 720.0));

        let wide = Layout::compute(1280.0, 800.0, false);
        assert_eq!(wide.sidebar.w, 0.0);
        assert_eq!(wide.content.w, 1280.0);
    }

    #[test]
    fn layout_survives_tiny_window() {
        let layout = Layout::compute(10.0, 20.0, true);
        assert!(layout.stage.w >= 1.0);
        assert_eq!(layout.content.w, 0.0);
    }

    #[test]
    fn pending_actions_drain_once() {
        zoom_in();
        zoom_in();
        zoom_out();
        select_view(2);
        toggle_layer(4);
        toggle_layer(99);
        close_popup();
        toggle_timeline();

        let actions = take_pending_actions();
        assert_eq!(
            actions,
            [
                UiAction::ZoomIn,
                UiAction::SelectView(2),
                UiAction::ToggleLayer(Layer::Grid),
                UiAction::ClosePopup,
                UiAction::ToggleTimeline,
            ]
        );
        assert!(take_pending_actions().is_empty());
    }

    #[test]
    fn unknown_view_index_shows_not_found() {
        let mut dashboard = dashboard();
        dashboard.apply_action(UiAction::SelectView(1));
        assert_eq!(dashboard.route, Route::View(View::RiskAssessment));
        assert_eq!(dashboard.layout.sidebar.w, 0.0);

        dashboard.apply_action(UiAction::SelectView(7));
        assert!(matches!(dashboard.route, Route::NotFound(_)));
    }

    #[test]
    fn location_action_returns_to_globe_and_flies() {
        let mut dashboard = dashboard();
        dashboard.apply_action(UiAction::SelectView(3));
        dashboard.apply_action(UiAction::SelectLocation(4));
        assert!(dashboard.on_globe_view());
        assert!(dashboard.globe.is_transitioning());

        dashboard.apply_action(UiAction::SelectLocation(99));
        assert!(dashboard.globe.is_transitioning());
    }

    #[test]
    fn clicking_centered_marker_selects_it_and_outside_click_closes_popup() {
        let mut dashboard = dashboard();
        let manila = dashboard.hotspots[1].clone();
        assert!(dashboard.globe.fly_to_selection(&Selection::from_located(&manila)));
        finish_flight(&mut dashboard);

        dashboard.click_at(center(dashboard.layout.stage));
        assert_eq!(dashboard.globe.selected(), Some("manila-earthquake"));
        assert!(dashboard.globe.is_transitioning());
        finish_flight(&mut dashboard);
        let popup = dashboard.popup_rect().unwrap();

        dashboard.click_at(center(popup));
        assert!(dashboard.globe.popup().is_some());

        let stage = dashboard.layout.stage;
        dashboard.click_at(vec2(stage.x + stage.w - 4.0, stage.y + 4.0));
        assert!(dashboard.globe.selected().is_none());
        assert!(dashboard.globe.popup().is_none());
        assert!(dashboard.globe.is_dragging());
    }

    #[test]
    fn location_action_closes_hotspot_popup() {
        let mut dashboard = dashboard();
        let manila = dashboard.hotspots[1].clone();
        dashboard.globe.select_hotspot(&manila);
        finish_flight(&mut dashboard);
        assert!(dashboard.popup_rect().is_some());

        dashboard.apply_action(UiAction::SelectLocation(0));
        assert!(dashboard.globe.is_transitioning());
        assert!(dashboard.popup_rect().is_none());
        assert!(dashboard.globe.selected().is_none());
    }

    #[test]
    fn popup_close_button_clears_selection() {
        let mut dashboard = dashboard();
        let manila = dashboard.hotspots[1].clone();
        dashboard.globe.select_hotspot(&manila);
        finish_flight(&mut dashboard);
        let popup = dashboard.popup_rect().unwrap();

        dashboard.click_at(center(close_button_rect(popup)));
        assert!(dashboard.globe.selected().is_none());
        assert!(!dashboard.globe.is_dragging());
    }

    #[test]
    fn header_tabs_switch_views() {
        let mut dashboard = dashboard();
        let tab = dashboard.layout.tab_rects()[2];
        dashboard.click_at(center(tab));
        assert_eq!(dashboard.route, Route::View(View::InfrastructureImpact));
    }

    #[test]
    fn sidebar_rows_expand_groups_and_fly_to_sites() {
        let mut dashboard = dashboard();
        let x = dashboard.layout.sidebar.x + 40.0;
        let first_row = dashboard.layout.tree_rows_top() + TREE_ROW_HEIGHT * 0.5;

        dashboard.click_at(vec2(x, first_row));
        assert!(dashboard.tree.is_expanded("uae"));
        assert!(!dashboard.globe.is_transitioning());

        dashboard.click_at(vec2(x, first_row + TREE_ROW_HEIGHT));
        assert!(dashboard.globe.is_transitioning());
    }

    #[test]
    fn layer_chips_toggle_layers() {
        let mut dashboard = dashboard();
        let grid_chip = dashboard.layout.layer_chip_rects()[4];
        dashboard.click_at(center(grid_chip));
        assert!(!dashboard.globe.layers().grid);
        dashboard.click_at(center(grid_chip));
        assert!(dashboard.globe.layers().grid);
    }

    #[test]
    fn risk_chips_update_filter() {
        let mut dashboard = dashboard();
        dashboard.apply_action(UiAction::SelectView(1));
        let chips = dashboard.layout.filter_chip_rects();

        dashboard.click_at(center(chips[2]));
        assert_eq!(dashboard.filter.min_severity, Severity::High);

        dashboard.click_at(center(chips[4 + 2]));
        assert_eq!(dashboard.filter.kinds, [HazardKind::Cyclone]);
        assert_eq!(dashboard.filter.hotspots(&dashboard.hotspots).len(), 1);
    }

    #[test]
    fn feed_click_flies_to_alert() {
        let mut dashboard = dashboard();
        dashboard.apply_action(UiAction::SelectView(1));
        let (_, feed) = dashboard.layout.risk_panels();
        let body = panels::panel_body(feed);
        dashboard.click_at(vec2(body.x + 20.0, body.y + 10.0));
        assert!(dashboard.on_globe_view());
        assert!(dashboard.globe.is_transitioning());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut dashboard = dashboard();
        dashboard.apply_action(UiAction::ZoomIn);
        dashboard.filter.min_severity = Severity::Critical;
        dashboard.apply_action(UiAction::SelectView(2));
        dashboard.apply_action(UiAction::Reset);
        assert_eq!(dashboard.route, Route::View(View::GlobalOverview));
        assert_eq!(dashboard.globe.camera().zoom, 1.0);
        assert_eq!(dashboard.filter, HotspotFilter::default());
    }

    fn mock_dashboard(view: View) -> DashboardState {
        let dataset = MockDataset::new(MOCK_SEED).dataset().unwrap();
        let mut dashboard = DashboardState::new(
            DashboardConfig::default(),
            builtin_hotspots(),
            Vec::new(),
            dataset,
        );
        dashboard.navigate(view.path());
        dashboard
    }

    #[test]
    fn table_row_click_shows_that_city_network() {
        let mut dashboard = mock_dashboard(View::InfrastructureImpact);
        assert_eq!(dashboard.topology.city_id(), dashboard.infrastructure[0].city_id);
        assert!(!dashboard.topology.is_empty());

        let (table, _) = dashboard.layout.summary_panels();
        let body = crate::panels::panel_body(table);
        dashboard.click_at(vec2(body.x + 20.0, body.y + 18.0 + 26.0 * 1.5));
        assert_eq!(dashboard.topology_city, 1);
        assert_eq!(dashboard.topology.city_id(), dashboard.infrastructure[1].city_id);
    }

    #[test]
    fn network_arrows_wrap_around_cities() {
        let mut dashboard = mock_dashboard(View::InfrastructureImpact);
        let count = dashboard.infrastructure.len();
        let layout = dashboard.layout.topology_layout();
        dashboard.click_at(center(layout.prev));
        assert_eq!(dashboard.topology_city, count - 1);
        dashboard.click_at(center(layout.next));
        assert_eq!(dashboard.topology_city, 0);
    }

    #[test]
    fn type_chips_filter_network_nodes() {
        let mut dashboard = mock_dashboard(View::InfrastructureImpact);
        let all = dashboard.topology.nodes().len();
        let layout = dashboard.layout.topology_layout();

        dashboard.click_at(center(layout.type_chips[1]));
        assert_eq!(dashboard.topology_type, Some(0));
        assert!(
            dashboard
                .topology
                .nodes()
                .iter()
                .all(|node| node.node_type == NODE_TYPES[0])
        );

        dashboard.click_at(center(layout.type_chips[0]));
        assert_eq!(dashboard.topology_type, None);
        assert_eq!(dashboard.topology.nodes().len(), all);
    }

    #[test]
    fn clicking_a_network_node_selects_it() {
        let mut dashboard = mock_dashboard(View::InfrastructureImpact);
        let layout = dashboard.layout.topology_layout();
        let target = layout.node_position(&dashboard.topology.nodes()[0]);
        dashboard.click_at(target);
        let selected = dashboard.selected_node.unwrap();
        assert_eq!(
            layout.node_position(&dashboard.topology.nodes()[selected]),
            target
        );

        dashboard.click_at(center(layout.next));
        assert_eq!(dashboard.selected_node, None);
    }

    #[test]
    fn timeline_controls_play_and_seek() {
        let mut dashboard = mock_dashboard(View::PopulationDisplacement);
        let layout = TimelineLayout::new(dashboard.layout.timeline_panel());
        let start = dashboard.timeline.index();

        dashboard.click_at(center(layout.play));
        assert!(dashboard.timeline.is_playing());
        for _ in 0..70 {
            dashboard.fixed_update();
        }
        assert_eq!(dashboard.timeline.index(), start + 1);

        dashboard.click_at(center(layout.speed));
        assert_eq!(dashboard.timeline.speed(), 2.0);

        let first = vec2(layout.marker_x(dashboard.timeline.len(), 0), layout.track.y + 3.0);
        dashboard.click_at(first);
        assert_eq!(dashboard.timeline.index(), 0);

        dashboard.apply_action(UiAction::ToggleTimeline);
        assert!(!dashboard.timeline.is_playing());
    }

    #[test]
    fn reset_rewinds_timeline_and_network() {
        let mut dashboard = mock_dashboard(View::InfrastructureImpact);
        dashboard.show_topology_city(2);
        dashboard.timeline.seek(0);
        dashboard.apply_action(UiAction::ToggleTimeline);
        dashboard.apply_action(UiAction::Reset);
        assert_eq!(dashboard.topology_city, 0);
        assert_eq!(dashboard.timeline.index(), dashboard.timeline.today_index());
        assert!(!dashboard.timeline.is_playing());
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bad frame"));
        assert_eq!(panic_message(payload.as_ref()), "bad frame");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn severity_chips_read_as_thresholds() {
        assert_eq!(severity_chip_label(Severity::Medium), "Medium+");
        assert_eq!(severity_chip_label(Severity::Critical), "Critical");
    }

    #[test]
    fn popup_lines_include_wrapped_description() {
        let hotspots = builtin_hotspots();
        let lines = popup_lines(&hotspots[0]);
        assert_eq!(lines[0], "Critical · flood");
        assert!(lines.iter().all(|line| line.chars().count() <= 40));
        assert!(lines.last().is_some_and(|line| line.ends_with("damage")));
    }
}
