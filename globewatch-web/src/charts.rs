use globewatch_core::timeline::DisplacementTimeline;
use globewatch_core::topology::{NetworkTopology, TopologyNode, node_type_rgb};
use globewatch_core::Severity;
use macroquad::prelude::*;

use crate::marker::{color_from_rgb, severity_color};
use crate::panels::{
    ACCENT, PANEL_BORDER, TEXT_MUTED, TEXT_PRIMARY, chip_rects, draw_chip, draw_panel, ellipsize,
    panel_body,
};

pub const TIMELINE_HEIGHT: f32 = 230.0;
const BUTTON_WIDTH: f32 = 72.0;
const ARROW_WIDTH: f32 = 28.0;
const BUTTON_HEIGHT: f32 = 26.0;
const TRACK_HIT_HEIGHT: f32 = 40.0;

pub const TYPE_CHIP_WIDTH: f32 = 92.0;
const NODE_RADIUS: f32 = 9.0;
const NODE_HIT_RADIUS: f32 = 14.0;
const DETAILS_HEIGHT: f32 = 64.0;
const GRID_STEP: f32 = 24.0;

/// `326000` as `326,000`.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

fn projected_color() -> Color {
    severity_color(Severity::Medium)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineLayout {
    pub panel: Rect,
    pub play: Rect,
    pub speed: Rect,
    pub track: Rect,
    pub bars: Rect,
}

impl TimelineLayout {
    pub fn new(panel: Rect) -> Self {
        let body = panel_body(panel);
        let speed = Rect::new(
            panel.x + panel.w - 12.0 - BUTTON_WIDTH,
            panel.y + 10.0,
            BUTTON_WIDTH,
            BUTTON_HEIGHT,
        );
        let play = Rect::new(speed.x - 6.0 - BUTTON_WIDTH, speed.y, BUTTON_WIDTH, BUTTON_HEIGHT);
        let track = Rect::new(body.x + 8.0, body.y + 56.0, (body.w - 16.0).max(0.0), 6.0);
        let bars_top = body.y + 100.0;
        let bars = Rect::new(body.x, bars_top, body.w, (body.y + body.h - bars_top).max(0.0));
        Self {
            panel,
            play,
            speed,
            track,
            bars,
        }
    }

    pub fn marker_x(&self, count: usize, index: usize) -> f32 {
        if count <= 1 {
            return self.track.x + self.track.w * 0.5;
        }
        self.track.x + self.track.w * index as f32 / (count - 1) as f32
    }

    /// Timeline point whose marker is nearest to `point` along the track.
    pub fn marker_at(&self, count: usize, point: Vec2) -> Option<usize> {
        let band = Rect::new(
            self.track.x - 12.0,
            self.track.y - 14.0,
            self.track.w + 24.0,
            TRACK_HIT_HEIGHT,
        );
        if count == 0 || !band.contains(point) {
            return None;
        }
        if count == 1 || self.track.w <= 0.0 {
            return Some(0);
        }
        let spacing = self.track.w / (count - 1) as f32;
        let index = ((point.x - self.track.x) / spacing).round();
        Some(index.clamp(0.0, (count - 1) as f32) as usize)
    }
}

pub fn draw_timeline(layout: &TimelineLayout, timeline: &DisplacementTimeline) {
    let body = draw_panel(layout.panel, "Displacement timeline");
    let playing = timeline.is_playing();
    draw_chip(layout.play, if playing { "Pause" } else { "Play" }, playing);
    draw_chip(layout.speed, &format!("{}x", timeline.speed()), false);

    let Some(current) = timeline.current() else {
        draw_text("No timeline data", body.x, body.y + 18.0, 18.0, TEXT_MUTED);
        return;
    };

    draw_text(&current.label, body.x, body.y + 18.0, 22.0, TEXT_PRIMARY);
    let label_width = measure_text(&current.label, None, 22, 1.0).width;
    if current.projected {
        draw_text("(projected)", body.x + label_width + 8.0, body.y + 18.0, 16.0, projected_color());
    }
    draw_text(&current.date, body.x, body.y + 36.0, 16.0, TEXT_MUTED);

    let displaced = format!("{} displaced", format_thousands(current.displaced));
    let width = measure_text(&displaced, None, 22, 1.0).width;
    draw_text(&displaced, body.x + body.w - width, body.y + 18.0, 22.0, TEXT_PRIMARY);
    let event_width = measure_text(&current.event, None, 16, 1.0).width;
    draw_text(
        &current.event,
        body.x + body.w - event_width,
        body.y + 36.0,
        16.0,
        TEXT_MUTED,
    );

    let track = layout.track;
    draw_rectangle(track.x, track.y, track.w, track.h, PANEL_BORDER);
    draw_rectangle(track.x, track.y, track.w * timeline.progress() as f32, track.h, ACCENT);

    let count = timeline.len();
    let index = timeline.index();
    let marker_color = |position: usize, projected: bool| {
        if position == index {
            ACCENT
        } else if projected {
            projected_color()
        } else {
            TEXT_MUTED
        }
    };

    for (position, point) in timeline.points().iter().enumerate() {
        let x = layout.marker_x(count, position);
        draw_circle(x, track.y + track.h * 0.5, 6.0, marker_color(position, point.projected));
        let label_width = measure_text(&point.label, None, 14, 1.0).width;
        draw_text(&point.label, x - label_width * 0.5, track.y + 28.0, 14.0, TEXT_MUTED);
    }

    let bars = layout.bars;
    let max = timeline.max_displaced().max(1) as f32;
    let gap = 4.0;
    let bar_width = ((bars.w - gap * (count as f32 - 1.0)) / count as f32).max(1.0);
    for (position, point) in timeline.points().iter().enumerate() {
        let height = (point.displaced as f32 / max * bars.h).max(4.0);
        let mut color = marker_color(position, point.projected);
        if position > index {
            color.a = 0.3;
        }
        draw_rectangle(
            bars.x + position as f32 * (bar_width + gap),
            bars.y + bars.h - height,
            bar_width,
            height,
            color,
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopologyLayout {
    pub panel: Rect,
    pub prev: Rect,
    pub next: Rect,
    pub type_chips: Vec<Rect>,
    pub graph: Rect,
    pub details: Rect,
}

impl TopologyLayout {
    pub fn new(panel: Rect, type_chips: usize) -> Self {
        let body = panel_body(panel);
        let next = Rect::new(
            panel.x + panel.w - 12.0 - ARROW_WIDTH,
            panel.y + 10.0,
            ARROW_WIDTH,
            BUTTON_HEIGHT,
        );
        let prev = Rect::new(next.x - 6.0 - ARROW_WIDTH, next.y, ARROW_WIDTH, BUTTON_HEIGHT);
        let chips = chip_rects(type_chips, body.x, body.y, TYPE_CHIP_WIDTH, body.w);
        let chips_bottom = chips.iter().map(|rect| rect.y + rect.h).fold(body.y, f32::max);
        let details_top = (body.y + body.h - DETAILS_HEIGHT).max(chips_bottom);
        let details = Rect::new(body.x, details_top, body.w, body.y + body.h - details_top);
        let graph_top = chips_bottom + 8.0;
        let graph = Rect::new(body.x, graph_top, body.w, (details_top - 8.0 - graph_top).max(0.0));
        Self {
            panel,
            prev,
            next,
            type_chips: chips,
            graph,
            details,
        }
    }

    pub fn node_position(&self, node: &TopologyNode) -> Vec2 {
        vec2(
            self.graph.x + node.position.0 as f32 * self.graph.w,
            self.graph.y + node.position.1 as f32 * self.graph.h,
        )
    }

    pub fn node_at(&self, topology: &NetworkTopology, point: Vec2) -> Option<usize> {
        if !self.graph.contains(point) {
            return None;
        }
        topology.node_at(
            ((point.x - self.graph.x) as f64, (point.y - self.graph.y) as f64),
            (self.graph.w as f64, self.graph.h as f64),
            NODE_HIT_RADIUS as f64,
        )
    }
}

fn draw_graph_grid(graph: Rect) {
    let color = Color::new(PANEL_BORDER.r, PANEL_BORDER.g, PANEL_BORDER.b, 0.4);
    let mut x = graph.x;
    while x <= graph.x + graph.w {
        draw_line(x, graph.y, x, graph.y + graph.h, 1.0, color);
        x += GRID_STEP;
    }
    let mut y = graph.y;
    while y <= graph.y + graph.h {
        draw_line(graph.x, y, graph.x + graph.w, y, 1.0, color);
        y += GRID_STEP;
    }
}

pub fn draw_topology(
    layout: &TopologyLayout,
    city: &str,
    topology: &NetworkTopology,
    type_labels: &[&str],
    active_type: usize,
    selected: Option<usize>,
) {
    let details = layout.details;
    draw_panel(layout.panel, &format!("Network: {}", ellipsize(city, 28)));
    draw_chip(layout.prev, "<", false);
    draw_chip(layout.next, ">", false);
    for (index, (rect, label)) in layout.type_chips.iter().zip(type_labels).enumerate() {
        draw_chip(*rect, label, index == active_type);
    }

    let graph = layout.graph;
    draw_graph_grid(graph);
    if topology.is_empty() {
        draw_text(
            "No infrastructure nodes for this city",
            graph.x + 8.0,
            graph.y + 24.0,
            18.0,
            TEXT_MUTED,
        );
        return;
    }

    for edge in topology.edges() {
        let (Some(source), Some(target)) = (
            topology.nodes().get(edge.source),
            topology.nodes().get(edge.target),
        ) else {
            continue;
        };
        let touches_selection = selected.is_some_and(|index| index == edge.source || index == edge.target);
        let color = if touches_selection { ACCENT } else { TEXT_MUTED };
        let from = layout.node_position(source);
        let to = layout.node_position(target);
        draw_line(from.x, from.y, to.x, to.y, 2.0, color);
    }

    for (index, node) in topology.nodes().iter().enumerate() {
        let center = layout.node_position(node);
        draw_circle(center.x, center.y, NODE_RADIUS, color_from_rgb(node.status.rgb(), 230));
        draw_circle_lines(
            center.x,
            center.y,
            NODE_RADIUS,
            2.0,
            color_from_rgb(node_type_rgb(&node.node_type), 255),
        );
        if selected == Some(index) {
            draw_circle_lines(center.x, center.y, NODE_RADIUS + 4.0, 2.0, WHITE);
        }
    }

    let mut legend_y = graph.y + 14.0;
    for (status, count) in topology.status_counts() {
        draw_circle(graph.x + 8.0, legend_y - 4.0, 4.0, color_from_rgb(status.rgb(), 255));
        draw_text(
            &format!("{} {}", status.label(), count),
            graph.x + 16.0,
            legend_y,
            14.0,
            TEXT_MUTED,
        );
        legend_y += 16.0;
    }

    match selected.and_then(|index| topology.nodes().get(index).map(|node| (index, node))) {
        Some((index, node)) => {
            draw_text(
                &format!("{} ({})", node.id, node.node_type),
                details.x,
                details.y + 20.0,
                18.0,
                TEXT_PRIMARY,
            );
            let links = topology.degree(index);
            draw_text(
                &format!("{} | {} link{}", node.status.label(), links, if links == 1 { "" } else { "s" }),
                details.x,
                details.y + 42.0,
                16.0,
                color_from_rgb(node.status.rgb(), 255),
            );
        }
        None => {
            draw_text(
                "Select a node for details",
                details.x,
                details.y + 20.0,
                16.0,
                TEXT_MUTED,
            );
        }
    }
}
