//! Per-city infrastructure network: nodes laid out in a unit square and the
//! links between them.

use std::collections::HashMap;
use std::f64::consts::TAU;

use crate::coordinates::GeoCoord;
use crate::dataset::{CityRecord, Dataset};

const LAYOUT_PADDING: f64 = 0.1;
const RING_RADIUS: f64 = 0.38;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    Operational,
    Degraded,
    Critical,
    Offline,
    Unknown,
}

impl NodeStatus {
    pub const ALL: [NodeStatus; 5] = [
        NodeStatus::Operational,
        NodeStatus::Degraded,
        NodeStatus::Critical,
        NodeStatus::Offline,
        NodeStatus::Unknown,
    ];

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "operational" => NodeStatus::Operational,
            "degraded" => NodeStatus::Degraded,
            "critical" => NodeStatus::Critical,
            "offline" | "emergency" => NodeStatus::Offline,
            _ => NodeStatus::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NodeStatus::Operational => "Operational",
            NodeStatus::Degraded => "Degraded",
            NodeStatus::Critical => "Critical",
            NodeStatus::Offline => "Offline",
            NodeStatus::Unknown => "Unknown",
        }
    }

    pub fn rgb(self) -> [u8; 3] {
        match self {
            NodeStatus::Operational => [0x10, 0xB9, 0x81],
            NodeStatus::Degraded => [0xF5, 0x9E, 0x0B],
            NodeStatus::Critical => [0xF9, 0x73, 0x16],
            NodeStatus::Offline => [0xDC, 0x26, 0x26],
            NodeStatus::Unknown => [0x64, 0x74, 0x8B],
        }
    }
}

/// Outline color for a node type.
pub fn node_type_rgb(node_type: &str) -> [u8; 3] {
    match node_type.to_ascii_lowercase().as_str() {
        "power" => [0xF5, 0x9E, 0x0B],
        "water" => [0x3B, 0x82, 0xF6],
        "telecom" => [0x8B, 0x5C, 0xF6],
        "transport" => [0x10, 0xB9, 0x81],
        "hospital" | "healthcare" => [0xDC, 0x26, 0x26],
        _ => [0x94, 0xA3, 0xB8],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopologyNode {
    pub id: String,
    pub node_type: String,
    pub status: NodeStatus,
    pub coord: Option<GeoCoord>,
    /// Position in the unit square, y growing downward.
    pub position: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopologyEdge {
    pub id: String,
    pub source: usize,
    pub target: usize,
    pub capacity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkTopology {
    city_id: String,
    nodes: Vec<TopologyNode>,
    edges: Vec<TopologyEdge>,
}

fn node_from_record(record: &CityRecord) -> TopologyNode {
    let coord = match (record.number("lat"), record.number("lon")) {
        (Some(lat), Some(lon)) => Some(GeoCoord::new(lat, lon)).filter(GeoCoord::is_finite),
        _ => None,
    };
    TopologyNode {
        id: record.text("node_id").unwrap_or_default().to_string(),
        node_type: record.text("node_type").unwrap_or("unknown").to_string(),
        status: NodeStatus::parse(record.text("status").unwrap_or_default()),
        coord,
        position: (0.5, 0.5),
    }
}

/// Fits geographic positions into the padded unit square, keeping aspect.
fn geo_layout(nodes: &mut [TopologyNode]) -> bool {
    let coords: Option<Vec<GeoCoord>> = nodes.iter().map(|node| node.coord).collect();
    let Some(coords) = coords else {
        return false;
    };

    let (min_lon, max_lon, min_lat, max_lat) = coords.iter().fold(
        (f64::MAX, f64::MIN, f64::MAX, f64::MIN),
        |(min_lon, max_lon, min_lat, max_lat), coord| {
            (
                min_lon.min(coord.lon),
                max_lon.max(coord.lon),
                min_lat.min(coord.lat),
                max_lat.max(coord.lat),
            )
        },
    );
    let span = (max_lon - min_lon).max(max_lat - min_lat);
    let usable = 1.0 - LAYOUT_PADDING * 2.0;
    let mid_lon = (min_lon + max_lon) * 0.5;
    let mid_lat = (min_lat + max_lat) * 0.5;

    for (node, coord) in nodes.iter_mut().zip(coords) {
        node.position = if span > 0.0 {
            (
                0.5 + (coord.lon - mid_lon) / span * usable,
                0.5 - (coord.lat - mid_lat) / span * usable,
            )
        } else {
            (0.5, 0.5)
        };
    }
    true
}

fn ring_layout(nodes: &mut [TopologyNode]) {
    let count = nodes.len();
    if count == 1 {
        nodes[0].position = (0.5, 0.5);
        return;
    }
    for (index, node) in nodes.iter_mut().enumerate() {
        let angle = TAU * index as f64 / count as f64;
        node.position = (
            0.5 + RING_RADIUS * angle.sin(),
            0.5 - RING_RADIUS * angle.cos(),
        );
    }
}

impl NetworkTopology {
    /// Builds the network of `city_id`, keeping only nodes of `node_type`
    /// when given. Links whose ends are filtered out or unknown are dropped.
    pub fn for_city(dataset: &Dataset, city_id: &str, node_type: Option<&str>) -> Self {
        let mut nodes: Vec<TopologyNode> = dataset
            .nodes_for_city(city_id)
            .map(node_from_record)
            .filter(|node| node_type.is_none_or(|kind| node.node_type.eq_ignore_ascii_case(kind)))
            .collect();
        if !nodes.is_empty() && !geo_layout(&mut nodes) {
            ring_layout(&mut nodes);
        }

        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.id.as_str(), position))
            .collect();
        let edges = dataset
            .edges_for_city(city_id)
            .filter_map(|record| {
                let source = *index.get(record.text("source")?)?;
                let target = *index.get(record.text("target")?)?;
                (source != target).then(|| TopologyEdge {
                    id: record.text("edge_id").unwrap_or_default().to_string(),
                    source,
                    target,
                    capacity: record.number("capacity"),
                })
            })
            .collect();

        Self {
            city_id: city_id.to_string(),
            nodes,
            edges,
        }
    }

    pub fn city_id(&self) -> &str {
        &self.city_id
    }

    pub fn nodes(&self) -> &[TopologyNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[TopologyEdge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Links touching node `index`.
    pub fn degree(&self, index: usize) -> usize {
        self.edges
            .iter()
            .filter(|edge| edge.source == index || edge.target == index)
            .count()
    }

    pub fn status_counts(&self) -> Vec<(NodeStatus, usize)> {
        NodeStatus::ALL
            .into_iter()
            .map(|status| {
                let count = self.nodes.iter().filter(|node| node.status == status).count();
                (status, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// Nearest node within `radius` pixels of `point`, for a drawing area of
    /// `size` pixels.
    pub fn node_at(&self, point: (f64, f64), size: (f64, f64), radius: f64) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let dx = node.position.0 * size.0 - point.0;
                let dy = node.position.1 * size.1 - point.1;
                (index, dx * dx + dy * dy)
            })
            .filter(|(_, distance_sq)| *distance_sq <= radius * radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mockgen::MockDataset;

    const CITIES: &str = "city_id,city,country,lat,lon,severity\nC1,Dubai,UAE,25.2,55.3,high\nC2,Cebu,Philippines,10.3,123.9,low\n";
    const NODES: &str = "city_id,node_id,node_type,status,lat,lon\n\
C1,N1,power,operational,25.0,55.0\n\
C1,N2,water,offline,25.2,55.2\n\
C1,N3,power,degraded,25.1,55.4\n\
C2,M1,hospital,critical,,\n\
C2,M2,telecom,emergency,,\n";
    const EDGES: &str = "city_id,edge_id,source,target,capacity\n\
C1,E1,N1,N2,40\n\
C1,E2,N2,N3,25\n\
C1,E3,N3,N9,10\n\
C2,E4,M1,M2,5\n";

    fn dataset() -> Dataset {
        Dataset::from_csv(CITIES, NODES, EDGES).unwrap()
    }

    #[test]
    fn keeps_links_between_known_nodes() {
        let topology = NetworkTopology::for_city(&dataset(), "C1", None);
        assert_eq!(topology.nodes().len(), 3);
        assert_eq!(topology.edges().len(), 2);
        assert_eq!(topology.edges()[0].capacity, Some(40.0));
        assert_eq!(topology.degree(1), 2);
        assert_eq!(topology.nodes()[1].status, NodeStatus::Offline);
    }

    #[test]
    fn geographic_layout_fits_unit_square() {
        let topology = NetworkTopology::for_city(&dataset(), "C1", None);
        for node in topology.nodes() {
            assert!((0.0..=1.0).contains(&node.position.0));
            assert!((0.0..=1.0).contains(&node.position.1));
        }
        let west = &topology.nodes()[0];
        let east = &topology.nodes()[2];
        assert!(west.position.0 < east.position.0);
        let north = &topology.nodes()[1];
        assert!(north.position.1 < west.position.1);
    }

    #[test]
    fn nodes_without_coordinates_sit_on_a_ring() {
        let topology = NetworkTopology::for_city(&dataset(), "C2", None);
        assert_eq!(topology.nodes().len(), 2);
        let (a, b) = (topology.nodes()[0].position, topology.nodes()[1].position);
        assert!((a.0 - 0.5).abs() < 1e-9 && (a.1 - (0.5 - RING_RADIUS)).abs() < 1e-9);
        assert!((b.1 - (0.5 + RING_RADIUS)).abs() < 1e-9);
        assert_eq!(topology.nodes()[1].status, NodeStatus::Offline);
    }

    #[test]
    fn type_filter_drops_nodes_and_their_links() {
        let topology = NetworkTopology::for_city(&dataset(), "C1", Some("POWER"));
        assert_eq!(topology.nodes().len(), 2);
        assert!(topology.edges().is_empty());
        assert!(NetworkTopology::for_city(&dataset(), "C9", None).is_empty());
    }

    #[test]
    fn status_counts_skip_absent_statuses() {
        let topology = NetworkTopology::for_city(&dataset(), "C1", None);
        assert_eq!(
            topology.status_counts(),
            vec![
                (NodeStatus::Operational, 1),
                (NodeStatus::Degraded, 1),
                (NodeStatus::Offline, 1),
            ]
        );
    }

    #[test]
    fn node_at_picks_nearest_within_radius() {
        let topology = NetworkTopology::for_city(&dataset(), "C2", None);
        let size = (400.0, 200.0);
        let top = topology.nodes()[0].position;
        let point = (top.0 * size.0 + 3.0, top.1 * size.1 - 2.0);
        assert_eq!(topology.node_at(point, size, 10.0), Some(0));
        assert_eq!(topology.node_at((0.0, 0.0), size, 10.0), None);
    }

    #[test]
    fn mock_cities_have_connected_networks() {
        let dataset = MockDataset::new(42).dataset().unwrap();
        for city in dataset.cities() {
            let topology = NetworkTopology::for_city(&dataset, &city.city_id, None);
            assert!(!topology.is_empty());
            assert_eq!(
                topology.edges().len(),
                dataset.edges_for_city(&city.city_id).count()
            );
        }
    }

    #[test]
    fn unknown_statuses_parse_as_unknown() {
        assert_eq!(NodeStatus::parse(" Degraded "), NodeStatus::Degraded);
        assert_eq!(NodeStatus::parse("flooded"), NodeStatus::Unknown);
        assert_eq!(node_type_rgb("Water"), [0x3B, 0x82, 0xF6]);
    }
}
