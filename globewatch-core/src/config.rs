use crate::camera::{DEFAULT_ROTATION, DEFAULT_ZOOM, ZOOM_STEP_FACTOR, ZoomBounds};
use crate::coordinates::Rotation;
use crate::route::View;
use crate::transition::{TRANSITION_DURATION_SECS, TRANSITION_STEPS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_PATH: &str = "assets/dashboard.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse dashboard config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid dashboard config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub alerts: String,
    pub cities: String,
    pub nodes: String,
    pub edges: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            alerts: "data/alerts.csv".to_string(),
            cities: "data/hotspots_cities_dataset.csv".to_string(),
            nodes: "data/hotspots_infrastructure_nodes.csv".to_string(),
            edges: "data/hotspots_infrastructure_edges.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub duration_secs: f64,
    pub steps: u32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration_secs: TRANSITION_DURATION_SECS,
            steps: TRANSITION_STEPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data: DataPaths,
    pub initial_rotation: Rotation,
    pub initial_zoom: f64,
    pub zoom_step_factor: f64,
    pub transition: TransitionConfig,
    pub language: String,
    pub default_view: View,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data: DataPaths::default(),
            initial_rotation: DEFAULT_ROTATION,
            initial_zoom: DEFAULT_ZOOM,
            zoom_step_factor: ZOOM_STEP_FACTOR,
            transition: TransitionConfig::default(),
            language: "en".to_string(),
            default_view: View::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.transition.duration_secs.is_finite() && self.transition.duration_secs > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "transition.duration_secs must be positive, got {}",
                self.transition.duration_secs
            )));
        }
        if self.transition.steps == 0 {
            return Err(ConfigError::Invalid(
                "transition.steps must be at least 1".to_string(),
            ));
        }
        if !(self.zoom_step_factor.is_finite() && self.zoom_step_factor > 1.0) {
            return Err(ConfigError::Invalid(format!(
                "zoom_step_factor must be greater than 1, got {}",
                self.zoom_step_factor
            )));
        }
        if !ZoomBounds::GLOBE.contains(self.initial_zoom) {
            return Err(ConfigError::Invalid(format!(
                "initial_zoom must be within {}..={}, got {}",
                ZoomBounds::GLOBE.min,
                ZoomBounds::GLOBE.max,
                self.initial_zoom
            )));
        }
        if !self.initial_rotation.is_finite() {
            return Err(ConfigError::Invalid(
                "initial_rotation must be finite".to_string(),
            ));
        }
        if self.language.trim().is_empty() {
            return Err(ConfigError::Invalid("language must not be empty".to_string()));
        }
        Ok(())
    }
}
