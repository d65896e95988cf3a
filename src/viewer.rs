use geo_types::Rect;

use crate::canvas::MapCanvas;
use crate::color::{Color, ColorAllocator};
use crate::config::ViewerConfig;
use crate::dataset::Dataset;
use crate::error::ViewerError;
use crate::overlay::{DisplayState, OverlayEntity, OverlayKind, OverlayRegistry};
use crate::render::{Feature, GeometrySpec, PathStyle, RenderContext, Shape};
use crate::table::{RowId, RowIndex, TableBinder};
use crate::utils::{TIME_FORMAT, TIME_WITH_SECONDS_FORMAT};

/// One viewer session over a loaded dataset: the table, the map overlays
/// and the static decorations drawn at setup.
pub struct Viewer<C: MapCanvas> {
    dataset: Dataset,
    index: RowIndex,
    table: TableBinder,
    registry: OverlayRegistry<C>,
    decorations: Option<C::Handle>,
    initial_view: Rect<f64>,
}

fn static_layer(dataset: &Dataset, config: &ViewerConfig) -> GeometrySpec {
    let outline = |color: Color, weight: f32| PathStyle {
        color: Some(color),
        ..PathStyle::line(weight)
    };
    let mut features = vec![Feature {
        shape: Shape::Rectangle(config.bounding_rect()),
        style: outline(Color::BLACK, 1.0),
        popup: None,
    }];
    if let Dataset::Segments(document) = dataset {
        features.push(Feature {
            shape: Shape::Circle {
                center: document.from_stop.point(),
                radius_m: document.origin_threshold,
            },
            style: outline(Color::RED, 3.0),
            popup: None,
        });
        features.push(Feature {
            shape: Shape::Circle {
                center: document.to_stop.point(),
                radius_m: document.destination_threshold,
            },
            style: outline(Color::GREEN, 3.0),
            popup: None,
        });
    }
    GeometrySpec { features }
}

fn entity_for(dataset: &Dataset, row: RowId, kind: OverlayKind) -> Result<OverlayEntity<'_>, ViewerError> {
    let unavailable = || ViewerError::KindUnavailable { row, kind };
    match dataset {
        Dataset::Segments(document) => {
            let segment = document
                .segments
                .get(row.0)
                .ok_or(ViewerError::UnknownRow(row))?;
            match kind {
                OverlayKind::Segment => Ok(OverlayEntity::Segment(segment)),
                _ => Err(unavailable()),
            }
        }
        Dataset::Combined { rows, .. } => {
            let record = rows.rows.get(row.0).ok_or(ViewerError::UnknownRow(row))?;
            match kind {
                OverlayKind::Trip => record
                    .trip
                    .as_ref()
                    .map(OverlayEntity::Trip)
                    .ok_or_else(unavailable),
                OverlayKind::Journey => record
                    .journey
                    .as_ref()
                    .map(OverlayEntity::Journey)
                    .ok_or_else(unavailable),
                OverlayKind::Segment => Err(unavailable()),
            }
        }
    }
}

impl<C: MapCanvas> Viewer<C> {
    /// Draws the static decorations and builds the table. Only call once
    /// every required document has loaded.
    pub fn setup(dataset: Dataset, mut canvas: C, config: &ViewerConfig) -> Self {
        let decorations = Some(canvas.add_layer(static_layer(&dataset, config)));
        let (index, table) = match &dataset {
            Dataset::Segments(document) => {
                let index = RowIndex::for_segments(document);
                let table = TableBinder::for_segments(document, &index);
                (index, table)
            }
            Dataset::Combined { rows, .. } => {
                let index = RowIndex::for_rows(rows);
                let table = TableBinder::for_rows(rows, &index);
                (index, table)
            }
        };
        info!("viewer ready with {} rows", index.len());
        let colors = ColorAllocator::new(config.palette.clone());
        Viewer {
            dataset,
            index,
            table,
            registry: OverlayRegistry::new(canvas, colors, config.arrow),
            decorations,
            initial_view: config.bounding_rect(),
        }
    }

    fn time_format(&self) -> &'static str {
        match self.dataset {
            Dataset::Segments(_) => TIME_WITH_SECONDS_FORMAT,
            Dataset::Combined { .. } => TIME_FORMAT,
        }
    }

    /// The row's toggle control action for `kind`.
    pub fn toggle(&mut self, row: RowId, kind: OverlayKind) -> Result<DisplayState, ViewerError> {
        let time_format = self.time_format();
        let Viewer {
            dataset,
            table,
            registry,
            ..
        } = self;
        table.on_toggle(row, kind, |row, kind| {
            let entity = entity_for(dataset, row, kind)?;
            let ctx = RenderContext::new(dataset.stops(), time_format);
            registry.toggle(row, entity, &ctx)
        })
    }

    /// The global clear action. Returns how many overlays were removed.
    pub fn clear(&mut self) -> usize {
        let hidden = self.registry.clear();
        for (row, kind) in &hidden {
            self.table.set_state(*row, *kind, DisplayState::Hidden);
        }
        hidden.len()
    }

    pub fn state(&self, row: RowId, kind: OverlayKind) -> DisplayState {
        self.registry.state(row, kind)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn rows(&self) -> &RowIndex {
        &self.index
    }

    pub fn table(&self) -> &TableBinder {
        &self.table
    }

    pub fn registry(&self) -> &OverlayRegistry<C> {
        &self.registry
    }

    pub fn canvas(&self) -> &C {
        self.registry.canvas()
    }

    pub fn initial_view(&self) -> Rect<f64> {
        self.initial_view
    }

    /// Removes everything this viewer drew and hands the canvas back.
    pub fn teardown(mut self) -> C {
        self.registry.clear();
        if let Some(handle) = self.decorations.take() {
            self.registry.canvas_mut().remove_layer(handle);
        }
        self.registry.into_canvas()
    }
}
