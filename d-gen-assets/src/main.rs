#![cfg(feature = "generator")]

use std::error::Error;
use std::path::{Path, PathBuf};

use d_gen_assets::generator::{build_marker_atlas, load_marker_spec};
use globewatch_core::csv::write_alerts;
use globewatch_core::mockgen::{MOCK_SEED, MockDataset};

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or(manifest_dir)
}

fn write_file(path: &Path, contents: &str) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    println!("wrote {}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let root = workspace_root();

    let spec = load_marker_spec(&root)?;
    let atlas = build_marker_atlas(&spec)?;
    let atlas_path = root.join("assets").join("markers.png");
    if let Some(parent) = atlas_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    atlas.save(&atlas_path)?;
    println!("wrote {}", atlas_path.display());

    let mock = MockDataset::new(MOCK_SEED);
    let data = root.join("data");
    write_file(&data.join("hotspots_cities_dataset.csv"), &mock.cities_csv()?)?;
    write_file(&data.join("hotspots_infrastructure_nodes.csv"), &mock.nodes_csv()?)?;
    write_file(&data.join("hotspots_infrastructure_edges.csv"), &mock.edges_csv()?)?;
    write_file(&data.join("alerts.csv"), &write_alerts(&mock.dataset()?.alerts())?)?;

    Ok(())
}
