use crate::coordinates::Rotation;
use serde::{Deserialize, Serialize};

pub const ZOOM_STEP_FACTOR: f64 = 1.3;
pub const PITCH_LIMIT: f64 = 80.0;
pub const DRAG_PITCH_PER_PIXEL: f64 = 0.3;
pub const DRAG_YAW_PER_PIXEL: f64 = 0.5;

pub const DEFAULT_ROTATION: Rotation = Rotation { x: -15.0, y: 0.0 };
pub const DEFAULT_ZOOM: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomBounds {
    pub min: f64,
    pub max: f64,
}

impl ZoomBounds {
    pub const GLOBE: ZoomBounds = ZoomBounds { min: 0.4, max: 8.0 };
    pub const MAP: ZoomBounds = ZoomBounds {
        min: 2.0,
        max: 18.0,
    };

    pub fn clamp(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.min;
        }
        zoom.clamp(self.min, self.max)
    }

    pub fn contains(&self, zoom: f64) -> bool {
        (self.min..=self.max).contains(&zoom)
    }

    fn fraction(&self, zoom: f64) -> f64 {
        (self.clamp(zoom) - self.min) / (self.max - self.min)
    }

    fn at_fraction(&self, fraction: f64) -> f64 {
        self.min + (self.max - self.min) * fraction
    }
}

/// Maps a map-view zoom level (`2..=18`) onto the globe zoom range
/// (`0.4..=8`) so selections carry one zoom meaning across both views.
pub fn map_zoom_to_globe(level: f64) -> f64 {
    ZoomBounds::GLOBE.at_fraction(ZoomBounds::MAP.fraction(level))
}

pub fn globe_zoom_to_map(zoom: f64) -> f64 {
    ZoomBounds::MAP.at_fraction(ZoomBounds::GLOBE.fraction(zoom))
}

pub fn clamp_pitch(pitch: f64) -> f64 {
    if pitch.is_nan() {
        return 0.0;
    }
    pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT)
}

/// Wraps a yaw angle into `[-180, 180)`.
pub fn wrap_degrees(angle: f64) -> f64 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub rotation: Rotation,
    pub zoom: f64,
}

impl CameraState {
    pub fn new(rotation: Rotation, zoom: f64) -> Self {
        Self {
            rotation: Rotation::new(clamp_pitch(rotation.x), rotation.y),
            zoom: ZoomBounds::GLOBE.clamp(zoom),
        }
    }

    pub fn apply_drag(&mut self, delta_x: f64, delta_y: f64) {
        self.rotation.x = clamp_pitch(self.rotation.x + delta_y * DRAG_PITCH_PER_PIXEL);
        self.rotation.y += delta_x * DRAG_YAW_PER_PIXEL;
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(ZOOM_STEP_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / ZOOM_STEP_FACTOR);
    }

    pub fn zoom_by(&mut self, factor: f64) {
        self.set_zoom(self.zoom * factor);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = ZoomBounds::GLOBE.clamp(zoom);
    }

    pub fn normalized_yaw(&self) -> f64 {
        wrap_degrees(self.rotation.y)
    }

    pub fn lerp(&self, target: &CameraState, t: f64) -> CameraState {
        CameraState {
            rotation: Rotation::new(
                self.rotation.x + (target.rotation.x - self.rotation.x) * t,
                self.rotation.y + (target.rotation.y - self.rotation.y) * t,
            ),
            zoom: self.zoom + (target.zoom - self.zoom) * t,
        }
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(DEFAULT_ROTATION, DEFAULT_ZOOM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn drag_tilts_and_spins() {
        let mut camera = CameraState::default();
        camera.apply_drag(10.0, 10.0);
        assert!((camera.rotation.x - (-12.0)).abs() < 1e-9);
        assert!((camera.rotation.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn drag_clamps_pitch_but_not_yaw() {
        let mut camera = CameraState::default();
        camera.apply_drag(2000.0, 1000.0);
        assert_eq!(camera.rotation.x, PITCH_LIMIT);
        assert_eq!(camera.rotation.y, 1000.0);
        assert_eq!(camera.normalized_yaw(), -80.0);
    }

    #[test]
    fn zoom_steps_by_fixed_factor() {
        let mut camera = CameraState::default();
        camera.zoom_in();
        assert!((camera.zoom - 1.3).abs() < 1e-12);
        camera.zoom_out();
        assert!((camera.zoom - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zoom_saturates_at_bounds() {
        let mut camera = CameraState::default();
        for _ in 0..50 {
            camera.zoom_in();
        }
        assert_eq!(camera.zoom, 8.0);
        for _ in 0..50 {
            camera.zoom_out();
        }
        assert_eq!(camera.zoom, 0.4);
    }

    #[test]
    fn map_zoom_normalizes_linearly() {
        assert!((map_zoom_to_globe(2.0) - 0.4).abs() < 1e-12);
        assert!((map_zoom_to_globe(18.0) - 8.0).abs() < 1e-12);
        assert!((map_zoom_to_globe(6.0) - 2.3).abs() < 1e-12);
        assert!((map_zoom_to_globe(40.0) - 8.0).abs() < 1e-12);
        assert!((globe_zoom_to_map(map_zoom_to_globe(11.0)) - 11.0).abs() < 1e-9);
    }

    #[test]
    fn wraps_degrees_into_half_open_range() {
        assert_eq!(wrap_degrees(180.0), -180.0);
        assert_eq!(wrap_degrees(-180.0), -180.0);
        assert_eq!(wrap_degrees(370.0), 10.0);
        assert_eq!(wrap_degrees(-190.0), 170.0);
    }

    #[derive(Debug, Clone, Copy)]
    enum ZoomOp {
        In,
        Out,
        Set(f64),
    }

    fn zoom_op() -> impl Strategy<Value = ZoomOp> {
        prop_oneof![
            Just(ZoomOp::In),
            Just(ZoomOp::Out),
            (-100.0f64..100.0).prop_map(ZoomOp::Set),
        ]
    }

    proptest! {
        #[test]
        fn zoom_stays_in_bounds(ops in proptest::collection::vec(zoom_op(), 0..64)) {
            let mut camera = CameraState::default();
            for op in ops {
                match op {
                    ZoomOp::In => camera.zoom_in(),
                    ZoomOp::Out => camera.zoom_out(),
                    ZoomOp::Set(value) => camera.set_zoom(value),
                }
                prop_assert!(ZoomBounds::GLOBE.contains(camera.zoom));
            }
        }

        #[test]
        fn pitch_stays_in_bounds(drags in proptest::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 0..32)) {
            let mut camera = CameraState::default();
            for (dx, dy) in drags {
                camera.apply_drag(dx, dy);
                prop_assert!(camera.rotation.x.abs() <= PITCH_LIMIT);
            }
        }
    }
}
