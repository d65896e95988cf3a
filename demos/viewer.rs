use std::env;

use transit_viewer_core::canvas::RecordingCanvas;
use transit_viewer_core::config::ViewerConfig;
use transit_viewer_core::dataset::{self, DataSource, DatasetKey, DirectoryDataSource, HttpDataSource};
use transit_viewer_core::viewer::Viewer;

// cargo run --example viewer -- <dir-or-url> '<page location>' [config.json]
// e.g. cargo run --example viewer -- ./site 'viewer.html#2019-03-20'
async fn show_all<S: DataSource>(
    source: &S,
    location: &str,
    config: &ViewerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = DatasetKey::from_location(location)?;
    let dataset = match dataset::load(source, &key, &config.results_prefix).await {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("{}", e.notification());
            return Err(e.into());
        }
    };

    let mut viewer = Viewer::setup(dataset, RecordingCanvas::new(), config);
    let rows: Vec<_> = viewer
        .rows()
        .iter()
        .flat_map(|row| row.kinds.iter().map(move |kind| (row.id, *kind)))
        .collect();
    for (row, kind) in rows {
        if let Err(e) = viewer.toggle(row, kind) {
            log::warn!("row {row} {kind}: {e}");
        }
    }
    println!("{}", serde_json::to_string_pretty(&viewer.canvas().to_geojson())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <dir-or-url> <location> [config.json]", args[0]);
        std::process::exit(2);
    }
    let config = match args.get(3) {
        Some(path) => ViewerConfig::from_json_file(path)?,
        None => ViewerConfig::default(),
    };

    let root = &args[1];
    if root.starts_with("http://") || root.starts_with("https://") {
        show_all(&HttpDataSource::new(root), &args[2], &config).await
    } else {
        show_all(&DirectoryDataSource::new(root), &args[2], &config).await
    }
}
