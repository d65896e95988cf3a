use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;
use uuid::Uuid;

use crate::render::{GeometrySpec, Shape};

/// Something that can draw and remove grouped features, e.g. a Leaflet map
/// behind a bridge. The canvas owns what it draws; callers only hold the
/// handle.
pub trait MapCanvas {
    type Handle;

    fn add_layer(&mut self, layer: GeometrySpec) -> Self::Handle;

    fn remove_layer(&mut self, handle: Self::Handle);
}

/// In-memory canvas. Keeps every layer currently on the map in insertion
/// order and can export them as GeoJSON for a web front end.
#[derive(Default)]
pub struct RecordingCanvas {
    layers: Vec<(Uuid, GeometrySpec)>,
    added: usize,
    removed: usize,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(&self, handle: &Uuid) -> Option<&GeometrySpec> {
        self.layers
            .iter()
            .find(|(id, _)| id == handle)
            .map(|(_, layer)| layer)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn feature_count(&self) -> usize {
        self.layers.iter().map(|(_, layer)| layer.len()).sum()
    }

    /// Number of `add_layer` / `remove_layer` calls seen so far.
    pub fn operations(&self) -> (usize, usize) {
        (self.added, self.removed)
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .layers
            .iter()
            .flat_map(|(id, layer)| {
                layer
                    .features
                    .iter()
                    .map(move |feature| to_geojson_feature(id, feature))
            })
            .collect();
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

fn to_geojson_feature(layer: &Uuid, feature: &crate::render::Feature) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("layer".to_owned(), json!(layer.to_string()));
    properties.insert("shape".to_owned(), json!(feature.shape.name()));
    properties.insert("style".to_owned(), json!(feature.style));
    if let Some(popup) = &feature.popup {
        properties.insert("popup".to_owned(), json!(popup.to_html()));
    }
    let value = match &feature.shape {
        Shape::Polyline(line) => Value::from(line),
        Shape::CircleMarker(point) => Value::from(point),
        Shape::IconMarker { at, icon } => {
            properties.insert("icon".to_owned(), json!(icon));
            Value::from(at)
        }
        Shape::ArrowHeads { along, pattern } => {
            properties.insert("pattern".to_owned(), json!(pattern));
            Value::from(along)
        }
        Shape::Circle { center, radius_m } => {
            properties.insert("radius_m".to_owned(), json!(radius_m));
            Value::from(center)
        }
        Shape::Rectangle(rect) => Value::from(&rect.to_polygon()),
    };
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

impl MapCanvas for RecordingCanvas {
    type Handle = Uuid;

    fn add_layer(&mut self, layer: GeometrySpec) -> Uuid {
        let id = Uuid::new_v4();
        debug!("canvas: add layer {} ({} features)", id, layer.len());
        self.layers.push((id, layer));
        self.added += 1;
        id
    }

    fn remove_layer(&mut self, handle: Uuid) {
        let before = self.layers.len();
        self.layers.retain(|(id, _)| *id != handle);
        if self.layers.len() == before {
            warn!("canvas: layer {handle} is not on the map");
        }
        self.removed += 1;
    }
}
