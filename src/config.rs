use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use geo_types::{Coord, Rect};
use serde::Deserialize;

use crate::color::{Color, DEFAULT_PALETTE};
use crate::render::ArrowPattern;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Colors handed to rows in order.
    pub palette: Vec<Color>,
    /// Selection area as `[[lat, lng], [lat, lng]]`, drawn on setup and used
    /// as the initial view.
    pub bounding_box: [[f64; 2]; 2],
    pub arrow: ArrowPattern,
    /// Folder the result documents are fetched from.
    pub results_prefix: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            palette: DEFAULT_PALETTE.to_vec(),
            bounding_box: [[52.155610, 0.007896], [52.267842, 0.225048]],
            arrow: ArrowPattern::default(),
            results_prefix: "results".to_owned(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: ViewerConfig = serde_json::from_str(text)?;
        if config.palette.is_empty() {
            bail!("palette must contain at least one color");
        }
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn bounding_rect(&self) -> Rect<f64> {
        let [[lat1, lng1], [lat2, lng2]] = self.bounding_box;
        Rect::new(Coord { x: lng1, y: lat1 }, Coord { x: lng2, y: lat2 })
    }
}
