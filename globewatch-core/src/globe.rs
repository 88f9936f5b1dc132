//! Globe interaction state: camera, flights between places, drag input,
//! the selected hotspot and its popup, and the overlay layers.

use crate::camera::{CameraState, ZOOM_STEP_FACTOR, clamp_pitch, wrap_degrees};
use crate::config::DashboardConfig;
use crate::coordinates::{GeoCoord, Rotation, ScreenPoint, Viewport};
use crate::hotspot::{Hotspot, Located};
use crate::locations::Selection;
use crate::projection::project;
use crate::transition::{TRANSITION_DURATION_SECS, TRANSITION_STEPS, Transition};
use tracing::{debug, info};

pub const POPUP_WIDTH: f64 = 280.0;
pub const POPUP_MARGIN: f64 = 20.0;
pub const POPUP_OFFSET_X: f64 = 15.0;
pub const POPUP_OFFSET_Y: f64 = 40.0;
pub const POPUP_MIN_TOP: f64 = 60.0;

pub const DAY_NIGHT_DEGREES_PER_TICK: f64 = 0.3;
pub const DAY_NIGHT_TICK_SECS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupAnchor {
    pub x: f64,
    pub y: f64,
}

impl PopupAnchor {
    /// Places the popup next to a marker at pixel `(x, y)`, kept inside the
    /// stage horizontally and below the toolbar.
    pub fn place(marker_x: f64, marker_y: f64, viewport: Viewport) -> Self {
        Self {
            x: (marker_x + POPUP_OFFSET_X)
                .max(POPUP_MARGIN)
                .min(viewport.width - POPUP_WIDTH),
            y: (marker_y - POPUP_OFFSET_Y).max(POPUP_MIN_TOP),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlyTarget {
    pub coord: GeoCoord,
    /// Globe zoom.
    pub zoom: f64,
    pub hotspot_id: Option<String>,
}

impl FlyTarget {
    pub fn new(coord: GeoCoord, zoom: f64) -> Self {
        Self {
            coord,
            zoom,
            hotspot_id: None,
        }
    }

    pub fn from_selection(selection: &Selection) -> Self {
        Self::new(selection.coord, selection.globe_zoom())
    }

    pub fn for_hotspot(hotspot: &Hotspot) -> Self {
        let selection = Selection::new(hotspot.name.clone(), hotspot.coord);
        Self {
            hotspot_id: Some(hotspot.id.clone()),
            ..Self::from_selection(&selection)
        }
    }
}

/// Camera that puts `coord` at the center of the stage, reached from
/// `current` by the shortest spin.
pub fn target_for(current: &CameraState, coord: GeoCoord, zoom: f64) -> CameraState {
    let centered_yaw = coord.lon + 90.0;
    let yaw = current.rotation.y + wrap_degrees(centered_yaw - current.rotation.y);
    CameraState::new(Rotation::new(clamp_pitch(coord.lat), yaw), zoom)
}

/// Whether `coord` is on the dark side for a day/night phase in degrees.
/// The sun sits over the equator at longitude `180 - phase`.
pub fn is_night(coord: GeoCoord, phase: f64) -> bool {
    let sun_lon = 180.0 - phase;
    let lat = coord.lat.to_radians();
    let hour_angle = (coord.lon - sun_lon).to_radians();
    lat.cos() * hour_angle.cos() < 0.0
}

#[derive(Debug, Clone, PartialEq)]
pub enum GlobeMode {
    Idle,
    Transitioning(Transition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Population,
    Infrastructure,
    Hazards,
    Satellite,
    Grid,
    Atmosphere,
    DayNight,
}

impl Layer {
    pub const ALL: [Layer; 7] = [
        Layer::Population,
        Layer::Infrastructure,
        Layer::Hazards,
        Layer::Satellite,
        Layer::Grid,
        Layer::Atmosphere,
        Layer::DayNight,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Layer::Population => "Population",
            Layer::Infrastructure => "Infrastructure",
            Layer::Hazards => "Hazards",
            Layer::Satellite => "Satellite",
            Layer::Grid => "Grid",
            Layer::Atmosphere => "Atmosphere",
            Layer::DayNight => "Day/Night Cycle",
        }
    }

    pub fn from_index(index: usize) -> Option<Layer> {
        Layer::ALL.get(index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerVisibility {
    pub population: bool,
    pub infrastructure: bool,
    pub hazards: bool,
    pub satellite: bool,
    pub grid: bool,
    pub atmosphere: bool,
    pub day_night: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            population: true,
            infrastructure: true,
            hazards: true,
            satellite: true,
            grid: true,
            atmosphere: true,
            day_night: true,
        }
    }
}

impl LayerVisibility {
    fn slot(&mut self, layer: Layer) -> &mut bool {
        match layer {
            Layer::Population => &mut self.population,
            Layer::Infrastructure => &mut self.infrastructure,
            Layer::Hazards => &mut self.hazards,
            Layer::Satellite => &mut self.satellite,
            Layer::Grid => &mut self.grid,
            Layer::Atmosphere => &mut self.atmosphere,
            Layer::DayNight => &mut self.day_night,
        }
    }

    pub fn is_visible(&self, layer: Layer) -> bool {
        match layer {
            Layer::Population => self.population,
            Layer::Infrastructure => self.infrastructure,
            Layer::Hazards => self.hazards,
            Layer::Satellite => self.satellite,
            Layer::Grid => self.grid,
            Layer::Atmosphere => self.atmosphere,
            Layer::DayNight => self.day_night,
        }
    }

    /// Returns the new visibility.
    pub fn toggle(&mut self, layer: Layer) -> bool {
        let slot = self.slot(layer);
        *slot = !*slot;
        *slot
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedMarker<'a, T> {
    pub item: &'a T,
    pub point: ScreenPoint,
    pub pixel: (f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragState {
    last_x: f64,
    last_y: f64,
}

#[derive(Debug, Clone)]
pub struct GlobeController {
    camera: CameraState,
    mode: GlobeMode,
    pending_hotspot: Option<String>,
    drag: Option<DragState>,
    viewport: Viewport,
    selected: Option<String>,
    popup: Option<PopupAnchor>,
    layers: LayerVisibility,
    day_night_phase: f64,
    day_night_accumulator: f64,
    transition_secs: f64,
    transition_steps: u32,
    zoom_step_factor: f64,
}

impl Default for GlobeController {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl GlobeController {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            camera: CameraState::default(),
            mode: GlobeMode::Idle,
            pending_hotspot: None,
            drag: None,
            viewport,
            selected: None,
            popup: None,
            layers: LayerVisibility::default(),
            day_night_phase: 0.0,
            day_night_accumulator: 0.0,
            transition_secs: TRANSITION_DURATION_SECS,
            transition_steps: TRANSITION_STEPS,
            zoom_step_factor: ZOOM_STEP_FACTOR,
        }
    }

    pub fn from_config(config: &DashboardConfig, viewport: Viewport) -> Self {
        Self {
            camera: CameraState::new(config.initial_rotation, config.initial_zoom),
            transition_secs: config.transition.duration_secs,
            transition_steps: config.transition.steps,
            zoom_step_factor: config.zoom_step_factor,
            ..Self::new(viewport)
        }
    }

    pub fn camera(&self) -> CameraState {
        self.camera
    }

    pub fn mode(&self) -> &GlobeMode {
        &self.mode
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.mode, GlobeMode::Transitioning(_))
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn popup(&self) -> Option<PopupAnchor> {
        self.popup
    }

    pub fn layers(&self) -> LayerVisibility {
        self.layers
    }

    pub fn toggle_layer(&mut self, layer: Layer) -> bool {
        let visible = self.layers.toggle(layer);
        debug!(?layer, visible, "layer toggled");
        visible
    }

    /// Day/night terminator angle in degrees, `[0, 360)`.
    pub fn day_night_phase(&self) -> f64 {
        self.day_night_phase
    }

    /// Starts a flight unless one is already running or the user is
    /// dragging. Returns whether the flight started. A flight that is not
    /// aimed at a hotspot closes any open popup.
    pub fn fly_to(&mut self, target: FlyTarget) -> bool {
        if self.is_transitioning() || self.is_dragging() {
            debug!(lat = target.coord.lat, lon = target.coord.lon, "fly_to ignored");
            return false;
        }
        if !target.coord.is_finite() {
            return false;
        }

        let destination = target_for(&self.camera, target.coord, target.zoom);
        info!(
            lat = target.coord.lat,
            lon = target.coord.lon,
            zoom = destination.zoom,
            "flying to target"
        );
        self.mode = GlobeMode::Transitioning(Transition::with_timing(
            self.camera,
            destination,
            self.transition_secs,
            self.transition_steps,
        ));
        if target.hotspot_id.is_none() {
            self.close_popup();
        }
        self.pending_hotspot = target.hotspot_id;
        true
    }

    pub fn fly_to_selection(&mut self, selection: &Selection) -> bool {
        self.fly_to(FlyTarget::from_selection(selection))
    }

    /// Selects `hotspot` and flies to it. The selection sticks even when the
    /// flight is refused; the popup opens only after a flight lands on it.
    pub fn select_hotspot(&mut self, hotspot: &Hotspot) -> bool {
        self.selected = Some(hotspot.id.clone());
        self.popup = None;
        self.fly_to(FlyTarget::for_hotspot(hotspot))
    }

    pub fn close_popup(&mut self) {
        self.selected = None;
        self.popup = None;
    }

    /// Advances the flight and the day/night cycle. `hotspots` is used to
    /// anchor the popup once a flight to a hotspot lands.
    pub fn update(&mut self, delta_secs: f64, hotspots: &[Hotspot]) {
        self.advance_day_night(delta_secs);

        let GlobeMode::Transitioning(transition) = &mut self.mode else {
            return;
        };
        self.camera = transition.advance(delta_secs);
        if !transition.is_complete() {
            return;
        }

        self.mode = GlobeMode::Idle;
        let landed = self.pending_hotspot.take();
        if let Some(id) = landed.filter(|id| self.selected.as_ref() == Some(id)) {
            self.popup = hotspots
                .iter()
                .find(|hotspot| hotspot.id == id)
                .and_then(|hotspot| self.popup_for(hotspot.coord));
        }
    }

    fn advance_day_night(&mut self, delta_secs: f64) {
        if !self.layers.day_night || !delta_secs.is_finite() || delta_secs <= 0.0 {
            return;
        }
        self.day_night_accumulator += delta_secs;
        while self.day_night_accumulator >= DAY_NIGHT_TICK_SECS {
            self.day_night_accumulator -= DAY_NIGHT_TICK_SECS;
            self.day_night_phase = (self.day_night_phase + DAY_NIGHT_DEGREES_PER_TICK) % 360.0;
        }
    }

    fn popup_for(&self, coord: GeoCoord) -> Option<PopupAnchor> {
        let point = self.project(coord);
        if !point.visible {
            return None;
        }
        let (x, y) = self.viewport.to_pixels(point);
        Some(PopupAnchor::place(x, y, self.viewport))
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        if self.is_transitioning() {
            return;
        }
        self.drag = Some(DragState {
            last_x: x,
            last_y: y,
        });
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if self.is_transitioning() {
            return;
        }
        let Some(drag) = &mut self.drag else {
            return;
        };
        let (delta_x, delta_y) = (x - drag.last_x, y - drag.last_y);
        drag.last_x = x;
        drag.last_y = y;
        self.camera.apply_drag(delta_x, delta_y);
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    pub fn zoom_in(&mut self) {
        if !self.is_transitioning() {
            self.camera.zoom_by(self.zoom_step_factor);
        }
    }

    pub fn zoom_out(&mut self) {
        if !self.is_transitioning() {
            self.camera.zoom_by(1.0 / self.zoom_step_factor);
        }
    }

    pub fn project(&self, coord: GeoCoord) -> ScreenPoint {
        project(coord, self.camera.rotation, self.camera.zoom)
    }

    pub fn project_markers<'a, T: Located>(&self, items: &'a [T]) -> Vec<ProjectedMarker<'a, T>> {
        items
            .iter()
            .map(|item| {
                let point = self.project(item.coord());
                ProjectedMarker {
                    item,
                    point,
                    pixel: self.viewport.to_pixels(point),
                }
            })
            .collect()
    }

    /// Nearest visible marker within `radius` pixels of `(x, y)`.
    pub fn hit_test<'a, T: Located>(
        &self,
        items: &'a [T],
        x: f64,
        y: f64,
        radius: f64,
    ) -> Option<&'a T> {
        self.project_markers(items)
            .into_iter()
            .filter(|marker| marker.point.visible)
            .map(|marker| {
                let (mx, my) = marker.pixel;
                (marker.item, (mx - x).hypot(my - y))
            })
            .filter(|(_, distance)| *distance <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(item, _)| item)
    }

    /// Back to the initial camera with nothing selected.
    pub fn reset(&mut self, config: &DashboardConfig) {
        let viewport = self.viewport;
        let layers = self.layers;
        *self = Self::from_config(config, viewport);
        self.layers = layers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotspot::builtin_hotspots;

    fn finish(globe: &mut GlobeController, hotspots: &[Hotspot]) {
        for _ in 0..200 {
            globe.update(0.05, hotspots);
        }
    }

    #[test]
    fn target_centers_coordinate() {
        let camera = CameraState::default();
        let coord = GeoCoord::new(14.5995, 120.9842);
        let target = target_for(&camera, coord, 4.0);
        let point = project(coord, target.rotation, target.zoom);
        assert!(point.visible);
        assert!((point.x - 50.0).abs() < 1e-9);
        assert!((point.y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn target_takes_the_short_way_round() {
        let camera = CameraState::new(Rotation::new(0.0, 700.0), 1.0);
        let target = target_for(&camera, GeoCoord::new(0.0, -170.0), 1.0);
        assert!((target.rotation.y - camera.rotation.y).abs() <= 180.0);
        assert!((wrap_degrees(target.rotation.y) - wrap_degrees(-80.0)).abs() < 1e-9);
    }

    #[test]
    fn target_pitch_is_clamped() {
        let target = target_for(&CameraState::default(), GeoCoord::new(89.0, 0.0), 1.0);
        assert_eq!(target.rotation.x, 80.0);
    }

    #[test]
    fn popup_anchor_stays_on_stage() {
        let viewport = Viewport::new(1000.0, 600.0);
        assert_eq!(PopupAnchor::place(500.0, 300.0, viewport), PopupAnchor { x: 515.0, y: 260.0 });
        assert_eq!(PopupAnchor::place(0.0, 10.0, viewport), PopupAnchor { x: 20.0, y: 60.0 });
        assert_eq!(PopupAnchor::place(990.0, 300.0, viewport).x, 720.0);
    }

    #[test]
    fn second_flight_is_ignored_while_transitioning() {
        let mut globe = GlobeController::default();
        assert!(globe.fly_to(FlyTarget::new(GeoCoord::new(25.0, 55.0), 4.5)));
        let target = match globe.mode() {
            GlobeMode::Transitioning(transition) => transition.target(),
            GlobeMode::Idle => panic!("expected a transition"),
        };
        assert!(!globe.fly_to(FlyTarget::new(GeoCoord::new(-6.0, 106.0), 4.0)));
        match globe.mode() {
            GlobeMode::Transitioning(transition) => assert_eq!(transition.target(), target),
            GlobeMode::Idle => panic!("expected a transition"),
        }
    }

    #[test]
    fn flight_is_ignored_while_dragging() {
        let mut globe = GlobeController::default();
        globe.pointer_down(10.0, 10.0);
        assert!(!globe.fly_to(FlyTarget::new(GeoCoord::new(25.0, 55.0), 4.5)));
        globe.pointer_up();
        assert!(globe.fly_to(FlyTarget::new(GeoCoord::new(25.0, 55.0), 4.5)));
    }

    #[test]
    fn input_is_ignored_while_transitioning() {
        let mut globe = GlobeController::default();
        globe.fly_to(FlyTarget::new(GeoCoord::new(25.0, 55.0), 4.5));
        let before = globe.camera();
        globe.zoom_in();
        globe.zoom_out();
        globe.pointer_down(0.0, 0.0);
        globe.pointer_move(200.0, 200.0);
        assert_eq!(globe.camera(), before);
        assert!(!globe.is_dragging());
    }

    #[test]
    fn drag_rotates_camera() {
        let mut globe = GlobeController::default();
        globe.pointer_down(100.0, 100.0);
        globe.pointer_move(120.0, 110.0);
        globe.pointer_move(140.0, 120.0);
        globe.pointer_up();
        let camera = globe.camera();
        assert!((camera.rotation.y - 20.0).abs() < 1e-9);
        assert!((camera.rotation.x - (-9.0)).abs() < 1e-9);

        globe.pointer_move(500.0, 500.0);
        assert_eq!(globe.camera(), camera);
    }

    #[test]
    fn selecting_hotspot_centers_it_and_opens_popup() {
        let hotspots = builtin_hotspots();
        let manila = hotspots
            .iter()
            .find(|hotspot| hotspot.id == "manila-earthquake")
            .unwrap();
        let mut globe = GlobeController::new(Viewport::new(1000.0, 1000.0));

        assert!(globe.select_hotspot(manila));
        assert_eq!(globe.selected(), Some("manila-earthquake"));
        assert!(globe.popup().is_none());

        finish(&mut globe, &hotspots);
        assert!(!globe.is_transitioning());

        let point = globe.project(manila.coord);
        assert!(point.visible);
        assert!((point.x - 50.0).abs() < 1e-6);
        assert!((point.y - 50.0).abs() < 1e-6);

        let popup = globe.popup().unwrap();
        assert!((popup.x - 515.0).abs() < 1e-6);
        assert!((popup.y - 460.0).abs() < 1e-6);

        globe.close_popup();
        assert!(globe.selected().is_none());
        assert!(globe.popup().is_none());
    }

    #[test]
    fn refused_flight_still_selects_without_popup() {
        let hotspots = builtin_hotspots();
        let mut globe = GlobeController::new(Viewport::new(1000.0, 1000.0));
        assert!(globe.fly_to_selection(&Selection::new("Somewhere", GeoCoord::new(5.0, 5.0))));

        assert!(!globe.select_hotspot(&hotspots[0]));
        assert_eq!(globe.selected(), Some(hotspots[0].id.as_str()));
        finish(&mut globe, &hotspots);
        assert_eq!(globe.selected(), Some(hotspots[0].id.as_str()));
        assert!(globe.popup().is_none());
    }

    #[test]
    fn popup_follows_latest_selection_only() {
        let hotspots = builtin_hotspots();
        let mut globe = GlobeController::new(Viewport::new(1000.0, 1000.0));
        assert!(globe.select_hotspot(&hotspots[0]));
        assert!(!globe.select_hotspot(&hotspots[1]));
        finish(&mut globe, &hotspots);
        assert_eq!(globe.selected(), Some(hotspots[1].id.as_str()));
        assert!(globe.popup().is_none());
    }

    #[test]
    fn location_flight_closes_open_popup() {
        let hotspots = builtin_hotspots();
        let mut globe = GlobeController::new(Viewport::new(1000.0, 1000.0));
        assert!(globe.select_hotspot(&hotspots[1]));
        finish(&mut globe, &hotspots);
        assert!(globe.popup().is_some());

        assert!(globe.fly_to_selection(&Selection::new("Somewhere", GeoCoord::new(5.0, 5.0))));
        assert!(globe.selected().is_none());
        assert!(globe.popup().is_none());
        finish(&mut globe, &hotspots);
        assert!(globe.popup().is_none());
    }

    #[test]
    fn location_flight_uses_normalized_zoom() {
        let mut globe = GlobeController::default();
        let selection = Selection::new("Somewhere", GeoCoord::new(5.0, 5.0)).with_zoom(18.0);
        assert!(globe.fly_to_selection(&selection));
        finish(&mut globe, &[]);
        assert_eq!(globe.camera().zoom, 8.0);
        assert!(globe.popup().is_none());
    }

    #[test]
    fn day_night_advances_only_when_enabled() {
        let mut globe = GlobeController::default();
        globe.update(1.05, &[]);
        assert!((globe.day_night_phase() - 3.0).abs() < 1e-9);

        globe.toggle_layer(Layer::DayNight);
        globe.update(1.05, &[]);
        assert!((globe.day_night_phase() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn night_side_follows_phase() {
        let greenwich = GeoCoord::new(0.0, 0.0);
        assert!(is_night(greenwich, 0.0));
        assert!(!is_night(greenwich, 180.0));
        assert!(!is_night(GeoCoord::new(30.0, 180.0), 0.0));
        assert!(is_night(GeoCoord::new(30.0, 180.0), 180.0));
    }

    #[test]
    fn layers_toggle_independently() {
        let mut layers = LayerVisibility::default();
        assert!(!layers.toggle(Layer::Grid));
        assert!(!layers.is_visible(Layer::Grid));
        assert!(layers.is_visible(Layer::Hazards));
        assert!(layers.toggle(Layer::Grid));
    }

    #[test]
    fn hit_test_picks_nearest_visible_marker() {
        let hotspots = builtin_hotspots();
        let mut globe = GlobeController::new(Viewport::new(1000.0, 1000.0));
        globe.fly_to(FlyTarget::for_hotspot(&hotspots[1]));
        finish(&mut globe, &hotspots);
        let hit = globe.hit_test(&hotspots, 500.0, 500.0, 12.0).unwrap();
        assert_eq!(hit.id, hotspots[1].id);
        assert!(globe.hit_test(&hotspots, 500.0, 700.0, 12.0).is_none());
    }

    #[test]
    fn reset_restores_initial_camera() {
        let config = DashboardConfig::default();
        let mut globe = GlobeController::from_config(&config, Viewport::default());
        globe.pointer_down(0.0, 0.0);
        globe.pointer_move(50.0, 50.0);
        globe.zoom_in();
        globe.reset(&config);
        assert_eq!(globe.camera(), CameraState::default());
        assert!(!globe.is_dragging());
    }
}
