use crate::coordinates::GeoCoord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown severity `{0}`")]
pub struct ParseSeverityError(pub String);

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    pub fn rgb(self) -> [u8; 3] {
        match self {
            Severity::Critical => [0xD3, 0x2F, 0x2F],
            Severity::High => [0xF5, 0x7C, 0x00],
            Severity::Medium => [0xFB, 0xC0, 0x2D],
            Severity::Low => [0x38, 0x8E, 0x3C],
        }
    }

    pub fn glow_rgb(self) -> [u8; 3] {
        match self {
            Severity::Critical => [0xFF, 0x17, 0x44],
            Severity::High => [0xFF, 0x98, 0x00],
            Severity::Medium => [0xFF, 0xEB, 0x3B],
            Severity::Low => [0x4C, 0xAF, 0x50],
        }
    }
}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(ParseSeverityError(raw.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardKind {
    Flood,
    Earthquake,
    Cyclone,
    Wildfire,
    Drought,
    Infrastructure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown hazard type `{0}`")]
pub struct ParseHazardError(pub String);

impl HazardKind {
    pub const ALL: [HazardKind; 6] = [
        HazardKind::Flood,
        HazardKind::Earthquake,
        HazardKind::Cyclone,
        HazardKind::Wildfire,
        HazardKind::Drought,
        HazardKind::Infrastructure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HazardKind::Flood => "flood",
            HazardKind::Earthquake => "earthquake",
            HazardKind::Cyclone => "cyclone",
            HazardKind::Wildfire => "wildfire",
            HazardKind::Drought => "drought",
            HazardKind::Infrastructure => "infrastructure",
        }
    }
}

impl FromStr for HazardKind {
    type Err = ParseHazardError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lowered = raw.trim().to_ascii_lowercase();
        HazardKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| ParseHazardError(raw.to_string()))
    }
}

/// Anything that can be placed on the globe as a marker.
pub trait Located {
    fn id(&self) -> &str;
    fn coord(&self) -> GeoCoord;
    fn severity(&self) -> Severity;
    fn label(&self) -> &str;
}

impl<T: Located + ?Sized> Located for &T {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn coord(&self) -> GeoCoord {
        (**self).coord()
    }

    fn severity(&self) -> Severity {
        (**self).severity()
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub id: String,
    pub title: String,
    pub name: String,
    pub country: String,
    pub coord: GeoCoord,
    pub severity: Severity,
    pub kind: HazardKind,
    pub magnitude: f64,
    pub affected_population: u64,
    pub infrastructure_at_risk: u32,
    pub events: u32,
    /// Displaced people, in thousands.
    pub displaced: u64,
    pub last_update: String,
    pub description: String,
}

impl Located for Hotspot {
    fn id(&self) -> &str {
        &self.id
    }

    fn coord(&self) -> GeoCoord {
        self.coord
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn label(&self) -> &str {
        &self.name
    }
}

/// One row of the alerts feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub name: String,
    pub coord: GeoCoord,
    pub severity: Severity,
    pub displaced: f64,
    pub confidence: f64,
}

impl Located for Alert {
    fn id(&self) -> &str {
        &self.id
    }

    fn coord(&self) -> GeoCoord {
        self.coord
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn label(&self) -> &str {
        &self.name
    }
}

#[allow(clippy::too_many_arguments)]
fn hotspot(
    id: &str,
    coord: (f64, f64),
    severity: Severity,
    kind: HazardKind,
    magnitude: f64,
    affected_population: u64,
    infrastructure_at_risk: u32,
    title: &str,
    name: &str,
    country: &str,
    events: u32,
    displaced: u64,
    last_update: &str,
    description: &str,
) -> Hotspot {
    Hotspot {
        id: id.to_string(),
        title: title.to_string(),
        name: name.to_string(),
        country: country.to_string(),
        coord: GeoCoord::new(coord.0, coord.1),
        severity,
        kind,
        magnitude,
        affected_population,
        infrastructure_at_risk,
        events,
        displaced,
        last_update: last_update.to_string(),
        description: description.to_string(),
    }
}

/// Hotspots embedded in the dashboard.
pub fn builtin_hotspots() -> Vec<Hotspot> {
    vec![
        hotspot(
            "uae-floods",
            (25.2048, 55.2708),
            Severity::Critical,
            HazardKind::Flood,
            8.5,
            1_250_000,
            4,
            "United Arab Emirates",
            "UAE",
            "United Arab Emirates",
            3,
            1_250,
            "2 min ago",
            "Severe flooding affecting multiple emirates with infrastructure damage",
        ),
        hotspot(
            "manila-earthquake",
            (14.5995, 120.9842),
            Severity::Critical,
            HazardKind::Earthquake,
            7.2,
            2_400_000,
            8,
            "Manila Earthquake Zone",
            "Manila",
            "Philippines",
            5,
            2_400,
            "5 min ago",
            "Major seismic activity with aftershocks continuing",
        ),
        hotspot(
            "dubai-infrastructure",
            (25.0760, 55.0750),
            Severity::High,
            HazardKind::Infrastructure,
            6.8,
            850_000,
            6,
            "Dubai Infrastructure Risk",
            "Dubai",
            "United Arab Emirates",
            2,
            850,
            "8 min ago",
            "Critical infrastructure monitoring for flood damage",
        ),
        hotspot(
            "cebu-cyclone",
            (10.3157, 123.8854),
            Severity::High,
            HazardKind::Cyclone,
            4.0,
            1_200_000,
            5,
            "Cebu Cyclone Path",
            "Cebu",
            "Philippines",
            3,
            1_200,
            "12 min ago",
            "Tropical cyclone approaching with high winds",
        ),
        hotspot(
            "riyadh-wildfire",
            (24.7136, 46.6753),
            Severity::Medium,
            HazardKind::Wildfire,
            6.2,
            450_000,
            3,
            "Riyadh Desert Fire",
            "Riyadh",
            "Saudi Arabia",
            2,
            450,
            "15 min ago",
            "Desert wildfire with moderate containment efforts",
        ),
        hotspot(
            "jakarta-drought",
            (-6.2088, 106.8456),
            Severity::Medium,
            HazardKind::Drought,
            5.1,
            3_200_000,
            7,
            "Jakarta Water Crisis",
            "Jakarta",
            "Indonesia",
            1,
            3_200,
            "1 hour ago",
            "Extended drought conditions affecting water supply",
        ),
    ]
}
