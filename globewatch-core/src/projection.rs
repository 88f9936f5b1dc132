//! Orthographic projection of geographic coordinates onto the globe stage.
//!
//! The stage is a square in percent units (`0..=100` on both axes) with the
//! globe centered at `(50, 50)`. At zoom `1.0` the globe radius is half the
//! stage, so every visible point of an unzoomed globe lands inside the stage.
//! Larger zoom levels push the limb outside and positions are clamped to the
//! stage edge.

use crate::coordinates::{GeoCoord, Rotation, ScreenPoint};

/// Rotated points must face the viewer by at least this much to be drawn.
pub const VISIBILITY_EPSILON: f64 = 0.1;

const STAGE_CENTER: f64 = 50.0;
const RADIUS_AT_UNIT_ZOOM: f64 = 50.0;

pub fn unit_sphere(coord: GeoCoord) -> [f64; 3] {
    let phi = (90.0 - coord.lat).to_radians();
    let theta = (coord.lon + 180.0).to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    [sin_phi * cos_theta, cos_phi, sin_phi * sin_theta]
}

/// Applies yaw around the Y axis, then pitch around the X axis.
pub fn rotate(point: [f64; 3], rotation: Rotation) -> [f64; 3] {
    let [x, y, z] = point;
    let (sin_yaw, cos_yaw) = rotation.y.to_radians().sin_cos();
    let (sin_pitch, cos_pitch) = rotation.x.to_radians().sin_cos();

    let x1 = x * cos_yaw + z * sin_yaw;
    let z1 = -x * sin_yaw + z * cos_yaw;

    let y2 = y * cos_pitch - z1 * sin_pitch;
    let z2 = y * sin_pitch + z1 * cos_pitch;

    [x1, y2, z2]
}

pub fn project(coord: GeoCoord, rotation: Rotation, zoom: f64) -> ScreenPoint {
    if !coord.is_finite() || !rotation.is_finite() || !zoom.is_finite() {
        return ScreenPoint::hidden_center();
    }

    let [x, y, z] = rotate(unit_sphere(coord), rotation);
    let radius = globe_radius_percent(zoom);
    let screen_x = STAGE_CENTER + x * radius;
    let screen_y = STAGE_CENTER - y * radius;

    ScreenPoint {
        x: screen_x.clamp(0.0, 100.0),
        y: screen_y.clamp(0.0, 100.0),
        visible: z > VISIBILITY_EPSILON,
    }
}

/// Globe radius in stage percent for a zoom level.
pub fn globe_radius_percent(zoom: f64) -> f64 {
    RADIUS_AT_UNIT_ZOOM * zoom
}

/// Meridian and parallel polylines for the grid overlay.
///
/// Meridians run pole to pole; parallels are spaced evenly between the poles
/// (the poles themselves are skipped since they collapse to a point).
pub fn graticule(meridians: usize, parallels: usize, samples: usize) -> Vec<Vec<GeoCoord>> {
    let samples = samples.max(2);
    let mut lines = Vec::with_capacity(meridians + parallels);

    for index in 0..meridians {
        let lon = -180.0 + index as f64 * 360.0 / meridians as f64;
        let line = (0..samples)
            .map(|step| {
                let lat = -90.0 + step as f64 * 180.0 / (samples - 1) as f64;
                GeoCoord::new(lat, lon)
            })
            .collect();
        lines.push(line);
    }

    for index in 0..parallels {
        let lat = -90.0 + (index + 1) as f64 * 180.0 / (parallels + 1) as f64;
        let line = (0..samples)
            .map(|step| {
                let lon = -180.0 + step as f64 * 360.0 / (samples - 1) as f64;
                GeoCoord::new(lat, lon)
            })
            .collect();
        lines.push(line);
    }

    lines
}
