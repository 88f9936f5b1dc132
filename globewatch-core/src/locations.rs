//! Named places the camera can fly to, and the sidebar tree that lists them.

use crate::camera::{ZoomBounds, map_zoom_to_globe};
use crate::coordinates::GeoCoord;
use crate::hotspot::{Located, Severity};
use std::collections::HashSet;

/// Zoom (map units) used when a selection carries no explicit zoom.
pub const DEFAULT_SELECTION_ZOOM: f64 = 6.0;
/// Zoom (map units) the sidebar assigns to city selections.
pub const SITE_SELECTION_ZOOM: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationPreset {
    pub key: &'static str,
    pub coord: GeoCoord,
    /// Globe zoom.
    pub zoom: f64,
}

const fn preset(key: &'static str, lat: f64, lon: f64, zoom: f64) -> LocationPreset {
    LocationPreset {
        key,
        coord: GeoCoord { lat, lon },
        zoom,
    }
}

pub const GLOBAL_PRESET: LocationPreset = preset("global", 15.0, 0.0, 1.0);

pub const LOCATION_PRESETS: [LocationPreset; 19] = [
    preset("dubai", 25.2048, 55.2708, 4.5),
    preset("abu-dhabi", 24.4539, 54.3773, 4.5),
    preset("riyadh", 24.7136, 46.6753, 4.0),
    preset("jeddah", 21.4858, 39.1925, 4.0),
    preset("manila", 14.5995, 120.9842, 4.2),
    preset("cebu", 10.3157, 123.8854, 4.5),
    preset("jakarta", -6.2088, 106.8456, 4.0),
    preset("surabaya", -7.2575, 112.7521, 4.5),
    preset("uae", 24.5, 54.5, 3.0),
    preset("united arab emirates", 24.5, 54.5, 3.0),
    preset("saudi", 24.0, 45.0, 2.5),
    preset("saudi arabia", 24.0, 45.0, 2.5),
    preset("philippines", 12.8797, 121.7740, 2.8),
    preset("indonesia", -2.5489, 118.0149, 2.2),
    preset("middle-east", 29.0, 47.0, 1.8),
    preset("asia-pacific", 15.0, 120.0, 1.5),
    preset("southeast-asia", 10.0, 110.0, 1.8),
    preset("americas", 25.0, -90.0, 1.5),
    GLOBAL_PRESET,
];

/// Looks a preset up by id or name, ignoring case and treating spaces,
/// dashes and underscores alike.
pub fn preset_for(key: &str) -> Option<&'static LocationPreset> {
    let wanted = normalize_key(key);
    LOCATION_PRESETS
        .iter()
        .find(|preset| normalize_key(preset.key) == wanted)
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            ' ' | '_' => '-',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// A place the user picked, normalized from whatever was clicked.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub name: String,
    pub coord: GeoCoord,
    /// Map-view zoom level, `2..=18`.
    pub zoom: Option<f64>,
}

impl Selection {
    pub fn new(name: impl Into<String>, coord: GeoCoord) -> Self {
        Self {
            name: name.into(),
            coord,
            zoom: None,
        }
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn map_zoom(&self) -> f64 {
        ZoomBounds::MAP.clamp(self.zoom.unwrap_or(DEFAULT_SELECTION_ZOOM))
    }

    /// Globe zoom for this selection: an explicit zoom wins, then a named
    /// preset, then the default selection zoom.
    pub fn globe_zoom(&self) -> f64 {
        if let Some(zoom) = self.zoom {
            return map_zoom_to_globe(ZoomBounds::MAP.clamp(zoom));
        }
        match preset_for(&self.name) {
            Some(preset) => preset.zoom,
            None => map_zoom_to_globe(DEFAULT_SELECTION_ZOOM),
        }
    }

    pub fn from_located<T: Located>(item: &T) -> Self {
        Self::new(item.label(), item.coord()).with_zoom(SITE_SELECTION_ZOOM)
    }

    /// Resolves a name against known records, falling back to the preset
    /// table.
    pub fn resolve_name<T: Located>(name: &str, known: &[T]) -> Option<Self> {
        let lowered = name.trim().to_lowercase();
        if let Some(hit) = known.iter().find(|item| {
            item.label().to_lowercase() == lowered || item.id().to_lowercase() == lowered
        }) {
            return Some(Self::from_located(hit));
        }
        preset_for(name).map(|preset| Self::new(name.trim(), preset.coord))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationKind {
    Group(Vec<LocationNode>),
    Site { coord: GeoCoord, severity: Severity },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationNode {
    pub id: String,
    pub name: String,
    pub kind: LocationKind,
}

impl LocationNode {
    pub fn group(id: &str, name: &str, children: Vec<LocationNode>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: LocationKind::Group(children),
        }
    }

    pub fn site(id: &str, name: &str, lat: f64, lon: f64, severity: Severity) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: LocationKind::Site {
                coord: GeoCoord::new(lat, lon),
                severity,
            },
        }
    }

    pub fn children(&self) -> &[LocationNode] {
        match &self.kind {
            LocationKind::Group(children) => children,
            LocationKind::Site { .. } => &[],
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, LocationKind::Group(_))
    }

    pub fn selection(&self) -> Option<Selection> {
        match self.kind {
            LocationKind::Site { coord, .. } => {
                Some(Selection::new(self.name.clone(), coord).with_zoom(SITE_SELECTION_ZOOM))
            }
            LocationKind::Group(_) => None,
        }
    }

    pub fn find(&self, id: &str) -> Option<&LocationNode> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(id))
    }
}

impl Located for LocationNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn coord(&self) -> GeoCoord {
        match self.kind {
            LocationKind::Site { coord, .. } => coord,
            LocationKind::Group(_) => preset_for(&self.id)
                .or_else(|| preset_for(&self.name))
                .unwrap_or(&GLOBAL_PRESET)
                .coord,
        }
    }

    fn severity(&self) -> Severity {
        match &self.kind {
            LocationKind::Site { severity, .. } => *severity,
            LocationKind::Group(children) => children
                .iter()
                .map(Located::severity)
                .max()
                .unwrap_or(Severity::Low),
        }
    }

    fn label(&self) -> &str {
        &self.name
    }
}

pub fn default_location_tree() -> Vec<LocationNode> {
    vec![
        LocationNode::group(
            "uae",
            "United Arab Emirates",
            vec![
                LocationNode::site("dubai", "Dubai", 25.2048, 55.2708, Severity::Critical),
                LocationNode::site("abu-dhabi", "Abu Dhabi", 24.4539, 54.3773, Severity::High),
            ],
        ),
        LocationNode::group(
            "saudi",
            "Saudi Arabia",
            vec![
                LocationNode::site("riyadh", "Riyadh", 24.7136, 46.6753, Severity::Medium),
                LocationNode::site("jeddah", "Jeddah", 21.4858, 39.1925, Severity::Low),
            ],
        ),
        LocationNode::group(
            "asia-pacific",
            "Asia Pacific",
            vec![
                LocationNode::site("manila", "Manila", 14.5995, 120.9842, Severity::High),
                LocationNode::site("jakarta", "Jakarta", -6.2088, 106.8456, Severity::Medium),
            ],
        ),
        LocationNode::group(
            "americas",
            "Americas",
            vec![LocationNode::group(
                "united-states",
                "United States",
                vec![
                    LocationNode::site("miami", "Miami", 25.7617, -80.1918, Severity::Medium),
                    LocationNode::site("houston", "Houston", 29.7604, -95.3698, Severity::Low),
                ],
            )],
        ),
    ]
}

/// A node as it appears in the flattened, expanded sidebar list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRow<'a> {
    pub node: &'a LocationNode,
    pub depth: usize,
    pub expanded: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LocationTree {
    roots: Vec<LocationNode>,
    expanded: HashSet<String>,
}

impl LocationTree {
    pub fn new(roots: Vec<LocationNode>) -> Self {
        Self {
            roots,
            expanded: HashSet::new(),
        }
    }

    pub fn roots(&self) -> &[LocationNode] {
        &self.roots
    }

    pub fn find(&self, id: &str) -> Option<&LocationNode> {
        self.roots.iter().find_map(|root| root.find(id))
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Returns the new expanded state; sites cannot be expanded.
    pub fn toggle(&mut self, id: &str) -> bool {
        let is_group = self.find(id).is_some_and(LocationNode::is_group);
        if !is_group {
            return false;
        }
        if !self.expanded.remove(id) {
            self.expanded.insert(id.to_string());
            return true;
        }
        false
    }

    pub fn expand_all(&mut self) {
        let mut ids = Vec::new();
        for root in &self.roots {
            collect_group_ids(root, &mut ids);
        }
        self.expanded.extend(ids);
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn visible_rows(&self) -> Vec<VisibleRow<'_>> {
        let mut rows = Vec::new();
        for root in &self.roots {
            self.push_visible(root, 0, &mut rows);
        }
        rows
    }

    fn push_visible<'a>(&'a self, node: &'a LocationNode, depth: usize, rows: &mut Vec<VisibleRow<'a>>) {
        let expanded = self.is_expanded(&node.id);
        rows.push(VisibleRow {
            node,
            depth,
            expanded,
        });
        if expanded {
            for child in node.children() {
                self.push_visible(child, depth + 1, rows);
            }
        }
    }

    pub fn sites(&self) -> Vec<&LocationNode> {
        let mut sites = Vec::new();
        for root in &self.roots {
            collect_sites(root, &mut sites);
        }
        sites
    }
}

fn collect_group_ids(node: &LocationNode, ids: &mut Vec<String>) {
    if node.is_group() {
        ids.push(node.id.clone());
        for child in node.children() {
            collect_group_ids(child, ids);
        }
    }
}

fn collect_sites<'a>(node: &'a LocationNode, sites: &mut Vec<&'a LocationNode>) {
    if node.is_group() {
        for child in node.children() {
            collect_sites(child, sites);
        }
    } else {
        sites.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotspot::builtin_hotspots;

    #[test]
    fn preset_lookup_is_forgiving() {
        assert_eq!(preset_for("Dubai").unwrap().zoom, 4.5);
        assert_eq!(preset_for("abu dhabi").unwrap().key, "abu-dhabi");
        assert_eq!(preset_for("Saudi Arabia").unwrap().coord, GeoCoord::new(24.0, 45.0));
        assert!(preset_for("atlantis").is_none());
    }

    #[test]
    fn selection_zoom_prefers_explicit_then_preset() {
        let explicit = Selection::new("Dubai", GeoCoord::new(25.2, 55.3)).with_zoom(18.0);
        assert_eq!(explicit.globe_zoom(), 8.0);

        let preset = Selection::new("Manila", GeoCoord::new(14.6, 121.0));
        assert_eq!(preset.globe_zoom(), 4.2);

        let unknown = Selection::new("Nowhere", GeoCoord::new(0.0, 0.0));
        assert!((unknown.globe_zoom() - 2.3).abs() < 1e-12);
        assert_eq!(unknown.map_zoom(), DEFAULT_SELECTION_ZOOM);
    }

    #[test]
    fn explicit_zoom_is_clamped_to_map_range() {
        let selection = Selection::new("x", GeoCoord::new(0.0, 0.0)).with_zoom(0.5);
        assert_eq!(selection.map_zoom(), 2.0);
    }

    #[test]
    fn resolves_names_against_records() {
        let hotspots = builtin_hotspots();
        let hit = Selection::resolve_name("manila", &hotspots).unwrap();
        assert_eq!(hit.coord, GeoCoord::new(14.5995, 120.9842));
        assert_eq!(hit.zoom, Some(SITE_SELECTION_ZOOM));

        let by_preset = Selection::resolve_name("Indonesia", &hotspots).unwrap();
        assert_eq!(by_preset.coord, GeoCoord::new(-2.5489, 118.0149));
        assert!(Selection::resolve_name("atlantis", &hotspots).is_none());
    }

    #[test]
    fn tree_starts_collapsed_and_expands_groups_only() {
        let mut tree = LocationTree::new(default_location_tree());
        assert_eq!(tree.visible_rows().len(), 4);

        assert!(tree.toggle("americas"));
        assert!(tree.toggle("united-states"));
        let rows = tree.visible_rows();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[6].node.name, "Houston");
        assert_eq!(rows[6].depth, 2);

        assert!(!tree.toggle("miami"));
        assert!(!tree.toggle("americas"));
        assert_eq!(tree.visible_rows().len(), 4);
    }

    #[test]
    fn expand_all_reveals_every_site() {
        let mut tree = LocationTree::new(default_location_tree());
        tree.expand_all();
        let site_rows = tree
            .visible_rows()
            .into_iter()
            .filter(|row| !row.node.is_group())
            .count();
        assert_eq!(site_rows, tree.sites().len());
        assert_eq!(site_rows, 8);
        tree.collapse_all();
        assert_eq!(tree.visible_rows().len(), 4);
    }

    #[test]
    fn sites_produce_selections_groups_do_not() {
        let tree = LocationTree::new(default_location_tree());
        let dubai = tree.find("dubai").unwrap();
        let selection = dubai.selection().unwrap();
        assert_eq!(selection.name, "Dubai");
        assert_eq!(selection.zoom, Some(SITE_SELECTION_ZOOM));
        assert!(tree.find("uae").unwrap().selection().is_none());
    }

    #[test]
    fn group_severity_is_worst_child() {
        let tree = LocationTree::new(default_location_tree());
        assert_eq!(tree.find("uae").unwrap().severity(), Severity::Critical);
        assert_eq!(tree.find("americas").unwrap().severity(), Severity::Medium);
    }
}
