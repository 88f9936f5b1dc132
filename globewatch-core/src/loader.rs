//! Turns fetched file contents into dashboard data. A failed fetch or an
//! unreadable file is logged and replaced by an empty value; a bad row is
//! logged and skipped.

use crate::config::DashboardConfig;
use crate::csv::parse_alerts;
use crate::dataset::Dataset;
use crate::hotspot::Alert;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to fetch `{path}`: {message}")]
pub struct FetchError {
    pub path: String,
    pub message: String,
}

impl FetchError {
    pub fn new(path: impl Into<String>, message: impl ToString) -> Self {
        Self {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type Fetched = Result<String, FetchError>;

pub fn resolve_alerts(path: &str, fetched: Fetched) -> Vec<Alert> {
    let text = match fetched {
        Ok(text) => text,
        Err(err) => {
            warn!(path, error = %err, "alerts unavailable, showing none");
            return Vec::new();
        }
    };
    match parse_alerts(&text) {
        Ok(parsed) => {
            for err in &parsed.rejected {
                warn!(path, error = %err, "skipping malformed alert row");
            }
            info!(
                path,
                count = parsed.records.len(),
                skipped = parsed.rejected.len(),
                "alerts loaded"
            );
            parsed.records
        }
        Err(err) => {
            error!(path, error = %err, "alerts file is unreadable, showing none");
            Vec::new()
        }
    }
}

/// Joins the three dataset tables; any missing or malformed table yields
/// an empty dataset.
pub fn resolve_dataset(cities: Fetched, nodes: Fetched, edges: Fetched) -> Dataset {
    let tables = cities.and_then(|cities| Ok((cities, nodes?, edges?)));
    let (cities, nodes, edges) = match tables {
        Ok(tables) => tables,
        Err(err) => {
            warn!(path = %err.path, error = %err.message, "dataset unavailable, using empty dataset");
            return Dataset::default();
        }
    };
    match Dataset::from_csv(&cities, &nodes, &edges) {
        Ok(dataset) => {
            info!(
                cities = dataset.cities().len(),
                nodes = dataset.nodes().len(),
                edges = dataset.edges().len(),
                "dataset loaded"
            );
            dataset
        }
        Err(err) => {
            error!(error = %err, "dataset is malformed, using empty dataset");
            Dataset::default()
        }
    }
}

pub fn resolve_config(path: &str, fetched: Fetched) -> DashboardConfig {
    let text = match fetched {
        Ok(text) => text,
        Err(err) => {
            warn!(path, error = %err, "config unavailable, using defaults");
            return DashboardConfig::default();
        }
    };
    match DashboardConfig::from_json(&text) {
        Ok(config) => config,
        Err(err) => {
            warn!(path, error = %err, "config rejected, using defaults");
            DashboardConfig::default()
        }
    }
}
