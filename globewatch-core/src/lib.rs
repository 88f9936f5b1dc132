pub mod camera;
pub mod config;
pub mod coordinates;
pub mod csv;
pub mod dataset;
pub mod globe;
pub mod hotspot;
pub mod loader;
pub mod locations;
pub mod mockgen;
pub mod projection;
pub mod route;
pub mod summary;
pub mod timeline;
pub mod topology;
pub mod transition;

pub use camera::{CameraState, ZoomBounds};
pub use config::{ConfigError, DashboardConfig, DataPaths};
pub use coordinates::{GeoCoord, Rotation, ScreenPoint, Viewport};
pub use csv::{CsvError, CsvTable, Parsed, parse_alerts};
pub use dataset::{City, CityRecord, Dataset, DatasetError};
pub use globe::{FlyTarget, GlobeController, GlobeMode, Layer, LayerVisibility, PopupAnchor};
pub use hotspot::{Alert, HazardKind, Hotspot, Located, Severity, builtin_hotspots};
pub use loader::FetchError;
pub use locations::{LocationNode, LocationTree, Selection, default_location_tree};
pub use mockgen::{MOCK_SEED, MockDataset};
pub use projection::project;
pub use route::{Route, View};
pub use timeline::{DisplacementTimeline, TimelinePoint};
pub use topology::{NetworkTopology, NodeStatus};
pub use transition::Transition;
