use d_gen_assets::layout::{self, MarkerStyle};
use globewatch_core::Severity;
use macroquad::prelude::*;
use tracing::warn;

pub const MARKER_ATLAS_PATH: &str = "assets/markers.png";

#[derive(Debug, Clone)]
pub struct MarkerDrawConfig {
    pub radius_px: f32,      // core radius at zoom 1
    pub glow_ratio: f32,     // glow radius as a multiple of the core
    pub ring_ratio: f32,     // selection ring radius as a multiple of the core
    pub ring_thickness: f32,
    pub max_scale: f32,      // markers grow with zoom up to this factor
    pub ring_color: Color,
    pub outline_color: Color,
}

impl Default for MarkerDrawConfig {
    fn default() -> Self {
        Self {
            radius_px: 8.0,
            glow_ratio: 13.0 / 8.0, // matches marker.svg
            ring_ratio: 18.0 / 8.0,
            ring_thickness: 2.0,
            max_scale: 1.6,
            ring_color: WHITE,
            outline_color: Color::from_rgba(255, 255, 255, 200),
        }
    }
}

impl MarkerDrawConfig {
    pub fn radius_at_zoom(&self, zoom: f64) -> f32 {
        let scale = (zoom as f32).sqrt().clamp(1.0, self.max_scale);
        self.radius_px * scale
    }

    /// Click tolerance around a marker center.
    pub fn hit_radius(&self, zoom: f64) -> f32 {
        self.radius_at_zoom(zoom) * self.glow_ratio + 2.0
    }
}

pub fn color_from_rgb(rgb: [u8; 3], alpha: u8) -> Color {
    Color::from_rgba(rgb[0], rgb[1], rgb[2], alpha)
}

pub fn severity_color(severity: Severity) -> Color {
    color_from_rgb(severity.rgb(), 255)
}

pub fn glow_color(severity: Severity, alpha: u8) -> Color {
    color_from_rgb(severity.glow_rgb(), alpha)
}

/// Pre-rendered marker sprites produced by `d-gen-assets`.
pub struct MarkerAtlas {
    texture: Texture2D,
}

impl MarkerAtlas {
    pub async fn load_from_assets() -> Option<Self> {
        let texture = match load_texture(MARKER_ATLAS_PATH).await {
            Ok(texture) => texture,
            Err(err) => {
                warn!(path = MARKER_ATLAS_PATH, error = %err, "marker atlas unavailable, drawing vector markers");
                return None;
            }
        };

        let (expected_w, expected_h) = layout::atlas_pixel_size();
        let (width, height) = (texture.width() as u32, texture.height() as u32);
        if (width, height) != (expected_w, expected_h) {
            warn!(
                width,
                height, expected_w, expected_h, "marker atlas has unexpected size, drawing vector markers"
            );
            return None;
        }

        texture.set_filter(FilterMode::Linear);
        Some(Self { texture })
    }

    fn source_rect(&self, severity: Severity, style: MarkerStyle) -> Rect {
        let (x, y, size) = layout::sprite_rect(severity, style);
        Rect::new(x as f32, y as f32, size as f32, size as f32)
    }
}

/// Draws one marker. Uses the atlas sprite when available, vector circles
/// otherwise.
pub fn draw_marker(
    center: Vec2,
    severity: Severity,
    style: MarkerStyle,
    zoom: f64,
    config: &MarkerDrawConfig,
    atlas: Option<&MarkerAtlas>,
) {
    let radius = config.radius_at_zoom(zoom);

    if let Some(atlas) = atlas {
        // marker.svg spans 44 units for an 8 unit core
        let size = radius * 44.0 / 8.0;
        draw_texture_ex(
            &atlas.texture,
            center.x - size * 0.5,
            center.y - size * 0.5,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(size, size)),
                source: Some(atlas.source_rect(severity, style)),
                ..Default::default()
            },
        );
        return;
    }

    draw_circle(center.x, center.y, radius * config.glow_ratio, glow_color(severity, 72));
    draw_circle(center.x, center.y, radius, severity_color(severity));
    draw_circle_lines(center.x, center.y, radius, 1.5, config.outline_color);
    if style == MarkerStyle::Selected {
        draw_circle_lines(
            center.x,
            center.y,
            radius * config.ring_ratio,
            config.ring_thickness,
            config.ring_color,
        );
    }
}

/// Small translucent dot sized by displaced population.
pub fn draw_population_marker(center: Vec2, severity: Severity, displaced_thousands: f64) {
    let radius = population_radius(displaced_thousands);
    draw_circle(center.x, center.y, radius, glow_color(severity, 90));
    draw_circle_lines(center.x, center.y, radius, 1.0, glow_color(severity, 200));
}

pub fn population_radius(displaced_thousands: f64) -> f32 {
    let scaled = (displaced_thousands.max(0.0) + 1.0).log10() as f32;
    (4.0 + scaled * 4.0).min(24.0)
}

pub fn draw_infrastructure_marker(center: Vec2, severity: Severity, nodes: usize) {
    let half = 3.0 + (nodes as f32).min(8.0) * 0.5;
    draw_rectangle(
        center.x - half,
        center.y - half,
        half * 2.0,
        half * 2.0,
        color_from_rgb(severity.rgb(), 180),
    );
    draw_rectangle_lines(center.x - half, center.y - half, half * 2.0, half * 2.0, 1.0, WHITE);
}
