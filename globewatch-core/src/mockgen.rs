use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use fastrand::Rng;

use crate::csv::{CsvError, write_table};
use crate::dataset::{City, CityRecord, Dataset, DatasetError};
use crate::hotspot::{HazardKind, Severity};
use crate::timeline::TimelinePoint;
use serde_json::{Map, Value};

pub const CITY_COLUMNS: [&str; 9] = [
    "city_id",
    "city",
    "country",
    "lat",
    "lon",
    "severity",
    "displaced_est",
    "confidence",
    "hazard_type",
];
pub const NODE_COLUMNS: [&str; 6] = ["city_id", "node_id", "node_type", "status", "lat", "lon"];
pub const EDGE_COLUMNS: [&str; 5] = ["city_id", "edge_id", "source", "target", "capacity"];

pub const NODE_TYPES: [&str; 5] = ["power", "water", "hospital", "transport", "telecom"];
pub const NODE_STATUSES: [&str; 4] = ["operational", "degraded", "critical", "offline"];

const SEED_CITIES: [(&str, &str, f64, f64); 10] = [
    ("Dubai", "United Arab Emirates", 25.2048, 55.2708),
    ("Abu Dhabi", "United Arab Emirates", 24.4539, 54.3773),
    ("Riyadh", "Saudi Arabia", 24.7136, 46.6753),
    ("Jeddah", "Saudi Arabia", 21.4858, 39.1925),
    ("Manila", "Philippines", 14.5995, 120.9842),
    ("Cebu", "Philippines", 10.3157, 123.8854),
    ("Jakarta", "Indonesia", -6.2088, 106.8456),
    ("Surabaya", "Indonesia", -7.2575, 112.7521),
    ("Miami", "United States", 25.7617, -80.1918),
    ("Houston", "United States", 29.7604, -95.3698),
];

/// Seed of the bundled mock data.
pub const MOCK_SEED: u64 = 42;

/// Milestones of the displacement series, one per day; the last two are
/// projections.
const TIMELINE_EVENTS: [&str; 9] = [
    "Initial evacuation orders",
    "Mass displacement begins",
    "Emergency shelters opened",
    "International aid arrives",
    "Additional shelter capacity",
    "Peak displacement reached",
    "Current situation",
    "Projected increase",
    "Forecast",
];
const TIMELINE_PROJECTED_DAYS: usize = 2;
const TIMELINE_FIRST_DAY: usize = 12;

const MIN_NODES_PER_CITY: usize = 3;
const MAX_NODES_PER_CITY: usize = 8;

/// Deterministic stand-in for the cities / infrastructure tables. The same
/// seed always produces the same rows.
#[derive(Debug, Clone)]
pub struct MockDataset {
    seed: u64,
}

impl MockDataset {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn cities(&self) -> Vec<City> {
        SEED_CITIES
            .iter()
            .enumerate()
            .map(|(index, (name, country, lat, lon))| {
                let mut rng = self.rng_for("city", index);
                City {
                    city_id: city_id(index),
                    city: name.to_string(),
                    country: country.to_string(),
                    lat: round4(lat + rng.f64() * 0.02 - 0.01),
                    lon: round4(lon + rng.f64() * 0.02 - 0.01),
                    severity: Severity::ALL[rng.usize(0..Severity::ALL.len())],
                    displaced_est: rng.u32(10..4000) as f64,
                    confidence: (rng.u32(60..100) as f64) / 100.0,
                    hazard_type: HazardKind::ALL[rng.usize(0..HazardKind::ALL.len())]
                        .as_str()
                        .to_string(),
                }
            })
            .collect()
    }

    pub fn nodes(&self) -> Vec<CityRecord> {
        let mut nodes = Vec::new();
        for city in self.cities() {
            let count = self.node_count(&city.city_id);
            for index in 0..count {
                let mut rng = self.rng_for(&city.city_id, index);
                let mut attributes = Map::new();
                attributes.insert("node_id".into(), Value::from(node_id(&city.city_id, index)));
                attributes.insert(
                    "node_type".into(),
                    Value::from(NODE_TYPES[rng.usize(0..NODE_TYPES.len())]),
                );
                attributes.insert(
                    "status".into(),
                    Value::from(NODE_STATUSES[rng.usize(0..NODE_STATUSES.len())]),
                );
                attributes.insert("lat".into(), Value::from(round4(city.lat + rng.f64() * 0.2 - 0.1)));
                attributes.insert("lon".into(), Value::from(round4(city.lon + rng.f64() * 0.2 - 0.1)));
                nodes.push(CityRecord {
                    city_id: city.city_id.clone(),
                    attributes,
                });
            }
        }
        nodes
    }

    /// Each city's nodes form a chain, plus one extra link back to the first
    /// node when the city has more than two nodes.
    pub fn edges(&self) -> Vec<CityRecord> {
        let mut edges = Vec::new();
        for city in self.cities() {
            let count = self.node_count(&city.city_id);
            let mut links: Vec<(usize, usize)> = (1..count).map(|index| (index - 1, index)).collect();
            if count > 2 {
                links.push((count - 1, 0));
            }
            for (position, (source, target)) in links.into_iter().enumerate() {
                let mut rng = self.rng_for(&format!("{}-edge", city.city_id), position);
                let mut attributes = Map::new();
                attributes.insert(
                    "edge_id".into(),
                    Value::from(format!("{}-E{:02}", city.city_id, position + 1)),
                );
                attributes.insert("source".into(), Value::from(node_id(&city.city_id, source)));
                attributes.insert("target".into(), Value::from(node_id(&city.city_id, target)));
                attributes.insert("capacity".into(), Value::from(rng.u32(10..100)));
                edges.push(CityRecord {
                    city_id: city.city_id.clone(),
                    attributes,
                });
            }
        }
        edges
    }

    pub fn dataset(&self) -> Result<Dataset, DatasetError> {
        Dataset::new(self.cities(), self.nodes(), self.edges())
    }

    pub fn cities_csv(&self) -> Result<String, CsvError> {
        write_table(
            &CITY_COLUMNS,
            self.cities().into_iter().map(|city| {
                vec![
                    city.city_id,
                    city.city,
                    city.country,
                    city.lat.to_string(),
                    city.lon.to_string(),
                    city.severity.label().to_string(),
                    city.displaced_est.to_string(),
                    city.confidence.to_string(),
                    city.hazard_type,
                ]
            }),
        )
    }

    pub fn nodes_csv(&self) -> Result<String, CsvError> {
        records_csv(&NODE_COLUMNS, self.nodes())
    }

    pub fn edges_csv(&self) -> Result<String, CsvError> {
        records_csv(&EDGE_COLUMNS, self.edges())
    }

    /// Cumulative displaced persons per day, October 2024, ending in
    /// projections. Totals never decrease.
    pub fn displacement_timeline(&self) -> Vec<TimelinePoint> {
        let today = TIMELINE_EVENTS.len() - TIMELINE_PROJECTED_DAYS - 1;
        let mut displaced = 0u64;
        TIMELINE_EVENTS
            .iter()
            .enumerate()
            .map(|(index, event)| {
                let mut rng = self.rng_for("timeline", index);
                let projected = index > today;
                displaced += match (index, projected) {
                    (0, _) => rng.u64(30_000..60_000),
                    (_, false) => rng.u64(20_000..70_000),
                    (_, true) => rng.u64(5_000..20_000),
                };
                let day = TIMELINE_FIRST_DAY + index;
                TimelinePoint {
                    date: format!("2024-10-{day:02}"),
                    label: if index == today {
                        "Today".to_string()
                    } else {
                        format!("Oct {day}")
                    },
                    displaced,
                    event: event.to_string(),
                    projected,
                }
            })
            .collect()
    }

    fn node_count(&self, city_id: &str) -> usize {
        self.rng_for(city_id, usize::MAX)
            .usize(MIN_NODES_PER_CITY..=MAX_NODES_PER_CITY)
    }

    fn rng_for(&self, table: &str, index: usize) -> Rng {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        table.hash(&mut hasher);
        index.hash(&mut hasher);
        Rng::with_seed(hasher.finish())
    }
}

fn city_id(index: usize) -> String {
    format!("C{:03}", index + 1)
}

fn node_id(city_id: &str, index: usize) -> String {
    format!("{city_id}-N{:02}", index + 1)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn records_csv(columns: &[&str], records: Vec<CityRecord>) -> Result<String, CsvError> {
    write_table(
        columns,
        records.into_iter().map(|record| {
            columns
                .iter()
                .map(|column| match *column {
                    "city_id" => record.city_id.clone(),
                    other => match record.attributes.get(other) {
                        Some(Value::String(text)) => text.clone(),
                        Some(Value::Null) | None => String::new(),
                        Some(value) => value.to_string(),
                    },
                })
                .collect()
        }),
    )
}
