use crate::coordinates::GeoCoord;
use crate::csv::{CsvError, CsvTable, Parsed};
use crate::hotspot::{Alert, Severity};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("cities table: {0}")]
    Cities(#[source] CsvError),
    #[error("infrastructure nodes table: {0}")]
    Nodes(#[source] CsvError),
    #[error("infrastructure edges table: {0}")]
    Edges(#[source] CsvError),
    #[error("duplicate city id `{0}`")]
    DuplicateCity(String),
}

/// Ids may arrive as text (`C001`) or as numbers (`17`, `17.0`).
fn id_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(whole), _) => whole.to_string(),
            (None, Some(value)) if value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{}", value as i64)
            }
            _ => number.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn id_from_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(id_text)
}

fn severity_from_value<'de, D>(deserializer: D) -> Result<Severity, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(deserialize_with = "id_from_value")]
    pub city_id: String,
    pub city: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(deserialize_with = "severity_from_value")]
    pub severity: Severity,
    #[serde(default)]
    pub displaced_est: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub hazard_type: String,
}

impl City {
    pub fn coord(&self) -> GeoCoord {
        GeoCoord::new(self.lat, self.lon)
    }

    pub fn display_name(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

/// Node or edge row: the owning city plus whatever other columns the table has.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityRecord {
    pub city_id: String,
    pub attributes: Map<String, Value>,
}

impl CityRecord {
    /// Splits `city_id` out of a header-keyed row.
    pub fn from_row(mut attributes: Map<String, Value>) -> Self {
        let city_id = attributes.remove("city_id").map(id_text).unwrap_or_default();
        Self {
            city_id,
            attributes,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    cities: Vec<City>,
    nodes: Vec<CityRecord>,
    edges: Vec<CityRecord>,
    cities_by_id: HashMap<String, usize>,
    nodes_by_city: HashMap<String, Vec<usize>>,
    edges_by_city: HashMap<String, Vec<usize>>,
}

impl Dataset {
    pub fn new(
        cities: Vec<City>,
        nodes: Vec<CityRecord>,
        edges: Vec<CityRecord>,
    ) -> Result<Self, DatasetError> {
        let mut cities_by_id = HashMap::with_capacity(cities.len());
        for (index, city) in cities.iter().enumerate() {
            if cities_by_id.insert(city.city_id.clone(), index).is_some() {
                return Err(DatasetError::DuplicateCity(city.city_id.clone()));
            }
        }

        let nodes_by_city = group_by_city(&nodes);
        let edges_by_city = group_by_city(&edges);

        Ok(Self {
            cities,
            nodes,
            edges,
            cities_by_id,
            nodes_by_city,
            edges_by_city,
        })
    }

    /// Parses and joins the three tables. A table without a header or a
    /// `city_id` column fails; individual bad rows are logged and skipped.
    pub fn from_csv(cities: &str, nodes: &str, edges: &str) -> Result<Self, DatasetError> {
        let cities = read_table::<City>(cities, "cities").map_err(DatasetError::Cities)?;
        let nodes = read_table::<Map<String, Value>>(nodes, "nodes").map_err(DatasetError::Nodes)?;
        let edges = read_table::<Map<String, Value>>(edges, "edges").map_err(DatasetError::Edges)?;
        Self::new(
            cities,
            nodes.into_iter().map(CityRecord::from_row).collect(),
            edges.into_iter().map(CityRecord::from_row).collect(),
        )
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn nodes(&self) -> &[CityRecord] {
        &self.nodes
    }

    pub fn edges(&self) -> &[CityRecord] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn city(&self, city_id: &str) -> Option<&City> {
        self.cities_by_id
            .get(city_id)
            .and_then(|&index| self.cities.get(index))
    }

    pub fn nodes_for_city(&self, city_id: &str) -> impl Iterator<Item = &CityRecord> {
        records_for(&self.nodes, &self.nodes_by_city, city_id)
    }

    pub fn edges_for_city(&self, city_id: &str) -> impl Iterator<Item = &CityRecord> {
        records_for(&self.edges, &self.edges_by_city, city_id)
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.cities
            .iter()
            .map(|city| Alert {
                id: city.city_id.clone(),
                name: city.display_name(),
                coord: city.coord(),
                severity: city.severity,
                displaced: city.displaced_est,
                confidence: city.confidence,
            })
            .collect()
    }
}

fn read_table<T: serde::de::DeserializeOwned>(
    text: &str,
    table: &'static str,
) -> Result<Vec<T>, CsvError> {
    let parsed = CsvTable::parse(text).and_then(|csv| {
        csv.require("city_id")?;
        Ok(csv.deserialize::<T>())
    })?;
    let Parsed { records, rejected } = parsed;
    for err in &rejected {
        warn!(table, error = %err, "skipping malformed row");
    }
    Ok(records)
}

fn group_by_city(records: &[CityRecord]) -> HashMap<String, Vec<usize>> {
    let mut grouped: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        grouped
            .entry(record.city_id.clone())
            .or_default()
            .push(index);
    }
    grouped
}

fn records_for<'a>(
    records: &'a [CityRecord],
    index: &'a HashMap<String, Vec<usize>>,
    city_id: &str,
) -> impl Iterator<Item = &'a CityRecord> + use<'a> {
    index
        .get(city_id)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(move |&position| records.get(position))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CITIES: &str = "city_id,city,country,lat,lon,severity,displaced_est,confidence,hazard_type\n\
C1,Dubai,United Arab Emirates,25.2048,55.2708,Critical,520,0.9,flood\n\
C2,Manila,Philippines,14.5995,120.9842,high,2400,0.94,earthquake\n\
3,Jakarta,Indonesia,-6.2088,106.8456,Medium,3200,0.82,drought\n";

    const NODES: &str = "city_id,node_id,node_type,status\n\
C1,N1,power,offline\n\
C1,N2,water,degraded\n\
C2,N3,hospital,operational\n";

    const EDGES: &str = "city_id,source,target,capacity\n\
C1,N1,N2,40\n";

    fn dataset() -> Dataset {
        Dataset::from_csv(CITIES, NODES, EDGES).unwrap()
    }

    #[test]
    fn indexes_cities_by_id() {
        let dataset = dataset();
        assert_eq!(dataset.cities().len(), 3);
        assert_eq!(dataset.city("C2").unwrap().city, "Manila");
        assert_eq!(dataset.city("3").unwrap().severity, Severity::Medium);
        assert!(dataset.city("C9").is_none());
    }

    #[test]
    fn groups_nodes_and_edges_per_city() {
        let dataset = dataset();
        let dubai_nodes: Vec<_> = dataset.nodes_for_city("C1").collect();
        assert_eq!(dubai_nodes.len(), 2);
        assert_eq!(dubai_nodes[1].text("node_type"), Some("water"));
        assert_eq!(dataset.edges_for_city("C1").count(), 1);
        assert_eq!(dataset.edges_for_city("C1").next().unwrap().number("capacity"), Some(40.0));
        assert_eq!(dataset.nodes_for_city("3").count(), 0);
    }

    #[test]
    fn derives_alerts_from_cities() {
        let alerts = dataset().alerts();
        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].name, "Dubai, United Arab Emirates");
        assert_eq!(alerts[1].displaced, 2400.0);
        assert_eq!(alerts[2].id, "3");
    }

    #[test]
    fn rejects_duplicate_city_ids() {
        let cities = "city_id,city,country,lat,lon,severity\nC1,A,X,0,0,low\nC1,B,Y,1,1,low\n";
        assert!(matches!(
            Dataset::from_csv(cities, "city_id\n", "city_id\n"),
            Err(DatasetError::DuplicateCity(id)) if id == "C1"
        ));
    }

    #[test]
    fn bad_rows_are_skipped_not_fatal() {
        let cities = "city_id,city,country,lat,lon,severity\n\
C1,Dubai,UAE,25,55,high\n\
C2,Manila,Philippines,north,121,high\n\
C3,Jakarta,Indonesia,-6,106,severe\n\
C4,Cebu,Philippines,10,124,low\n";
        let dataset = Dataset::from_csv(cities, NODES, EDGES).unwrap();
        let ids: Vec<&str> = dataset.cities().iter().map(|city| city.city_id.as_str()).collect();
        assert_eq!(ids, ["C1", "C4"]);
    }

    #[test]
    fn numeric_ids_are_normalized() {
        let nodes = "city_id,node_id\n17,N1\n17.0,N2\n";
        let cities = "city_id,city,country,lat,lon,severity\n17,A,X,0,0,low\n";
        let dataset = Dataset::from_csv(cities, nodes, "city_id\n").unwrap();
        assert_eq!(dataset.city("17").unwrap().city, "A");
        assert_eq!(dataset.nodes_for_city("17").count(), 2);
    }

    #[test]
    fn reports_which_table_failed() {
        let bad_nodes = "node_id\nN1\n";
        assert!(matches!(
            Dataset::from_csv(CITIES, bad_nodes, EDGES),
            Err(DatasetError::Nodes(_))
        ));
    }
}
