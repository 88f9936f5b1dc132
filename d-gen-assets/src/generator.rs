use std::error::Error;
use std::fs;
use std::path::Path;

use globewatch_core::Severity;
use image::{GenericImage, Rgba, RgbaImage};
use roxmltree::Document;

use crate::layout::{self, MarkerStyle, SEVERITY_ROWS};

pub const MARKER_SVG: &str = "marker.svg";
const SAMPLE_EPSILON: f32 = 0.25;
const AA_SAMPLES_PER_AXIS: u32 = 4;
const AA_SAMPLE_COUNT: u32 = AA_SAMPLES_PER_AXIS * AA_SAMPLES_PER_AXIS;

#[derive(Clone, Copy, Debug, PartialEq)]
struct SvgViewBox {
    min_x: f32,
    min_y: f32,
    width: f32,
    height: f32,
}

/// Where a circle takes its paint from.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Paint {
    None,
    Fixed([u8; 3]),
    /// `currentColor`: the severity color.
    Severity,
    /// `class="glow"` circles: the severity glow color.
    Glow,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct CircleSpec {
    cx: f32,
    cy: f32,
    r: f32,
    fill: Paint,
    fill_opacity: f32,
    stroke: Paint,
    stroke_width: f32,
    selected_only: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MarkerSpec {
    viewbox: SvgViewBox,
    circles: Vec<CircleSpec>,
}

pub fn load_marker_spec(root: &Path) -> Result<MarkerSpec, Box<dyn Error>> {
    let path = root.join("assets-for-gen").join(MARKER_SVG);
    let xml = fs::read_to_string(&path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    parse_marker_svg(&xml).map_err(|err| format!("{}: {err}", path.display()).into())
}

pub fn parse_marker_svg(xml: &str) -> Result<MarkerSpec, Box<dyn Error>> {
    let doc = Document::parse(xml)?;
    let svg_node = doc
        .descendants()
        .find(|node| node.has_tag_name("svg"))
        .ok_or("no <svg> element found")?;
    let viewbox = parse_viewbox(svg_node.attribute("viewBox").ok_or("missing viewBox")?)?;

    let circles = doc
        .descendants()
        .filter(|node| node.has_tag_name("circle"))
        .map(parse_circle)
        .collect::<Result<Vec<_>, _>>()?;
    if circles.is_empty() {
        return Err("no <circle> found".into());
    }

    Ok(MarkerSpec { viewbox, circles })
}

fn parse_viewbox(raw: &str) -> Result<SvgViewBox, Box<dyn Error>> {
    let parts: Vec<f32> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()?;

    if parts.len() != 4 {
        return Err(format!("expected 4 numbers in viewBox, got {}", parts.len()).into());
    }

    Ok(SvgViewBox {
        min_x: parts[0],
        min_y: parts[1],
        width: parts[2],
        height: parts[3],
    })
}

fn parse_circle(node: roxmltree::Node) -> Result<CircleSpec, Box<dyn Error>> {
    let classes = node.attribute("class").unwrap_or_default();
    let is_glow = classes.split_whitespace().any(|class| class == "glow");
    let selected_only = classes.split_whitespace().any(|class| class == "selected-ring");

    let fill = match node.attribute("fill") {
        Some(raw) if is_glow && raw.trim() == "currentColor" => Paint::Glow,
        Some(raw) => parse_paint(raw),
        None => Paint::Fixed([0, 0, 0]),
    };

    Ok(CircleSpec {
        cx: parse_number(node.attribute("cx"), "circle cx")?,
        cy: parse_number(node.attribute("cy"), "circle cy")?,
        r: parse_number(node.attribute("r"), "circle r")?,
        fill,
        fill_opacity: parse_optional(node.attribute("fill-opacity"), 1.0)?.clamp(0.0, 1.0),
        stroke: node.attribute("stroke").map(parse_paint).unwrap_or(Paint::None),
        stroke_width: parse_optional(node.attribute("stroke-width"), 0.0)?,
        selected_only,
    })
}

fn parse_number(raw: Option<&str>, label: &str) -> Result<f32, Box<dyn Error>> {
    let value = raw.ok_or_else(|| format!("missing {label} attribute"))?;
    Ok(value.trim().parse::<f32>()?)
}

fn parse_optional(raw: Option<&str>, default: f32) -> Result<f32, Box<dyn Error>> {
    match raw {
        Some(value) => Ok(value.trim().parse::<f32>()?),
        None => Ok(default),
    }
}

fn parse_paint(raw: &str) -> Paint {
    let value = raw.trim().to_lowercase();
    match value.as_str() {
        "none" => Paint::None,
        "currentcolor" => Paint::Severity,
        "black" => Paint::Fixed([0, 0, 0]),
        "white" => Paint::Fixed([255, 255, 255]),
        _ if value.starts_with('#') => parse_hex_color(&value).map_or(Paint::None, Paint::Fixed),
        _ => Paint::None,
    }
}

fn parse_hex_color(raw: &str) -> Option<[u8; 3]> {
    let digits = raw.trim_start_matches('#');
    match digits.len() {
        3 => {
            let r = u8::from_str_radix(&digits[0..1], 16).ok()?;
            let g = u8::from_str_radix(&digits[1..2], 16).ok()?;
            let b = u8::from_str_radix(&digits[2..3], 16).ok()?;
            Some([r * 17, g * 17, b * 17])
        }
        6 => {
            let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
            let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
            let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
            Some([r, g, b])
        }
        _ => None,
    }
}

fn resolve_paint(paint: Paint, severity: Severity) -> Option<[u8; 3]> {
    match paint {
        Paint::None => None,
        Paint::Fixed(rgb) => Some(rgb),
        Paint::Severity => Some(severity.rgb()),
        Paint::Glow => Some(severity.glow_rgb()),
    }
}

/// Straight-alpha RGBA in `0..=1`.
type Sample = [f32; 4];

fn over(dst: Sample, rgb: [u8; 3], alpha: f32) -> Sample {
    let out_alpha = alpha + dst[3] * (1.0 - alpha);
    if out_alpha <= 0.0 {
        return [0.0; 4];
    }
    let blend = |src: u8, dst_channel: f32| {
        (src as f32 / 255.0 * alpha + dst_channel * dst[3] * (1.0 - alpha)) / out_alpha
    };
    [
        blend(rgb[0], dst[0]),
        blend(rgb[1], dst[1]),
        blend(rgb[2], dst[2]),
        out_alpha,
    ]
}

fn sample_color(spec: &MarkerSpec, severity: Severity, style: MarkerStyle, x: f32, y: f32) -> Sample {
    let mut color = [0.0f32; 4];

    for circle in &spec.circles {
        if circle.selected_only && style != MarkerStyle::Selected {
            continue;
        }
        let dist = ((x - circle.cx).powi(2) + (y - circle.cy).powi(2)).sqrt();

        if let Some(fill) = resolve_paint(circle.fill, severity) {
            if dist <= circle.r + SAMPLE_EPSILON {
                color = over(color, fill, circle.fill_opacity);
            }
        }

        if let Some(stroke) = resolve_paint(circle.stroke, severity) {
            let half_width = circle.stroke_width * 0.5 + SAMPLE_EPSILON;
            if circle.stroke_width > 0.0
                && dist >= circle.r - half_width
                && dist <= circle.r + half_width
            {
                color = over(color, stroke, 1.0);
            }
        }
    }

    color
}

pub fn render_marker(spec: &MarkerSpec, severity: Severity, style: MarkerStyle, size: u32) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
    let scale_x = size as f32 / spec.viewbox.width;
    let scale_y = size as f32 / spec.viewbox.height;
    let scale = (scale_x + scale_y) * 0.5;
    let samples_per_axis = AA_SAMPLES_PER_AXIS as f32;

    for y in 0..size {
        for x in 0..size {
            let mut premultiplied = [0.0f32; 3];
            let mut alpha_sum = 0.0f32;

            for sy in 0..AA_SAMPLES_PER_AXIS {
                for sx in 0..AA_SAMPLES_PER_AXIS {
                    let sample_x = x as f32 + (sx as f32 + 0.5) / samples_per_axis;
                    let sample_y = y as f32 + (sy as f32 + 0.5) / samples_per_axis;
                    let svg_x = sample_x / scale + spec.viewbox.min_x;
                    let svg_y = sample_y / scale + spec.viewbox.min_y;
                    let sample = sample_color(spec, severity, style, svg_x, svg_y);
                    premultiplied[0] += sample[0] * sample[3];
                    premultiplied[1] += sample[1] * sample[3];
                    premultiplied[2] += sample[2] * sample[3];
                    alpha_sum += sample[3];
                }
            }

            if alpha_sum > 0.0 {
                let channel = |value: f32| ((value / alpha_sum) * 255.0).round().clamp(0.0, 255.0) as u8;
                let alpha = (alpha_sum / AA_SAMPLE_COUNT as f32 * 255.0).round().clamp(0.0, 255.0) as u8;
                image.put_pixel(
                    x,
                    y,
                    Rgba([
                        channel(premultiplied[0]),
                        channel(premultiplied[1]),
                        channel(premultiplied[2]),
                        alpha,
                    ]),
                );
            }
        }
    }

    image
}

fn sprite_to_padded_cell_with_extrusion(sprite: &RgbaImage, sprite_size: u32, pad: u32) -> RgbaImage {
    let stride = sprite_size + pad * 2;
    let mut cell = RgbaImage::from_pixel(stride, stride, Rgba([0, 0, 0, 0]));

    for y in 0..sprite_size {
        for x in 0..sprite_size {
            cell.put_pixel(pad + x, pad + y, *sprite.get_pixel(x, y));
        }
    }

    for x in 0..sprite_size {
        let top = *cell.get_pixel(pad + x, pad);
        let bottom = *cell.get_pixel(pad + x, pad + sprite_size - 1);
        for p in 0..pad {
            cell.put_pixel(pad + x, p, top);
            cell.put_pixel(pad + x, pad + sprite_size + p, bottom);
        }
    }

    for y in 0..sprite_size {
        let left = *cell.get_pixel(pad, pad + y);
        let right = *cell.get_pixel(pad + sprite_size - 1, pad + y);
        for p in 0..pad {
            cell.put_pixel(p, pad + y, left);
            cell.put_pixel(pad + sprite_size + p, pad + y, right);
        }
    }

    let tl = *cell.get_pixel(pad, pad);
    let tr = *cell.get_pixel(pad + sprite_size - 1, pad);
    let bl = *cell.get_pixel(pad, pad + sprite_size - 1);
    let br = *cell.get_pixel(pad + sprite_size - 1, pad + sprite_size - 1);
    for y in 0..pad {
        for x in 0..pad {
            cell.put_pixel(x, y, tl);
            cell.put_pixel(pad + sprite_size + x, y, tr);
            cell.put_pixel(x, pad + sprite_size + y, bl);
            cell.put_pixel(pad + sprite_size + x, pad + sprite_size + y, br);
        }
    }

    cell
}

/// One padded cell per severity (rows) and marker style (columns).
pub fn build_marker_atlas(spec: &MarkerSpec) -> Result<RgbaImage, Box<dyn Error>> {
    let (width, height) = layout::atlas_pixel_size();
    let mut atlas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));

    for severity in SEVERITY_ROWS {
        for style in MarkerStyle::ALL {
            let sprite = render_marker(spec, severity, style, layout::MARKER_PIXEL_SIZE);
            let cell = sprite_to_padded_cell_with_extrusion(
                &sprite,
                layout::MARKER_PIXEL_SIZE,
                layout::MARKER_PADDING,
            );
            let (offset_x, offset_y) = layout::cell_origin(layout::marker_cell(severity, style));
            atlas.copy_from(&cell, offset_x, offset_y)?;
        }
    }

    Ok(atlas)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 44 44">
  <circle class="glow" cx="22" cy="22" r="13" fill="currentColor" fill-opacity="0.28"/>
  <circle cx="22" cy="22" r="8" fill="currentColor"/>
  <circle class="selected-ring" cx="22" cy="22" r="18" fill="none" stroke="#ffffff" stroke-width="2"/>
</svg>"##;

    fn spec() -> MarkerSpec {
        parse_marker_svg(SVG).unwrap()
    }

    #[test]
    fn parses_every_circle() {
        let spec = spec();
        assert_eq!(spec.circles.len(), 3);
        assert_eq!(spec.circles[0].fill, Paint::Glow);
        assert_eq!(spec.circles[1].fill, Paint::Severity);
        assert!(spec.circles[2].selected_only);
        assert_eq!(spec.circles[2].stroke, Paint::Fixed([255, 255, 255]));
    }

    #[test]
    fn rejects_svg_without_circles() {
        let err = parse_marker_svg(r#"<svg viewBox="0 0 10 10"><rect/></svg>"#).unwrap_err();
        assert!(err.to_string().contains("circle"));
    }

    #[test]
    fn core_takes_severity_color() {
        let image = render_marker(&spec(), Severity::Critical, MarkerStyle::Normal, 44);
        let center = image.get_pixel(22, 22);
        assert_eq!(&center.0[..3], &Severity::Critical.rgb());
        assert_eq!(center.0[3], 255);
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn glow_is_translucent() {
        let image = render_marker(&spec(), Severity::Low, MarkerStyle::Normal, 44);
        let glow = image.get_pixel(22, 11);
        assert!(glow.0[3] > 0 && glow.0[3] < 128);
    }

    #[test]
    fn selected_ring_only_in_selected_style() {
        let normal = render_marker(&spec(), Severity::High, MarkerStyle::Normal, 44);
        let selected = render_marker(&spec(), Severity::High, MarkerStyle::Selected, 44);
        assert_eq!(normal.get_pixel(22, 4).0[3], 0);
        assert_eq!(selected.get_pixel(22, 4).0, [255, 255, 255, 255]);
    }

    #[test]
    fn atlas_matches_layout() {
        let atlas = build_marker_atlas(&spec()).unwrap();
        assert_eq!(atlas.dimensions(), layout::atlas_pixel_size());
        let (x, y, size) = layout::sprite_rect(Severity::Medium, MarkerStyle::Normal);
        let center = atlas.get_pixel(x + size / 2, y + size / 2);
        assert_eq!(&center.0[..3], &Severity::Medium.rgb());
    }
}
