use std::collections::BTreeMap;

use crate::canvas::MapCanvas;
use crate::color::{Color, ColorAllocator};
use crate::error::ViewerError;
use crate::model::{Journey, Segment, Trip};
use crate::render::{self, ArrowPattern, EntityRef, MissingStop, RenderContext, RenderStyle};
use crate::table::RowId;

/// Which registry slot and renderer an overlay uses. A combined row can
/// show its journey and its trip independently.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
    strum_macros::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum OverlayKind {
    Segment,
    Trip,
    Journey,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayState {
    Hidden,
    Shown,
}

/// The entity behind one overlay.
#[derive(Clone, Copy, Debug)]
pub enum OverlayEntity<'a> {
    Segment(&'a Segment),
    Trip(&'a Trip),
    Journey(&'a Journey),
}

impl OverlayEntity<'_> {
    pub fn kind(&self) -> OverlayKind {
        match self {
            OverlayEntity::Segment(_) => OverlayKind::Segment,
            OverlayEntity::Trip(_) => OverlayKind::Trip,
            OverlayEntity::Journey(_) => OverlayKind::Journey,
        }
    }
}

struct OverlayEntry<H> {
    handle: H,
    color: Color,
}

/// Owns every overlay currently on the canvas, keyed by row and kind, and
/// the color assignment of every row.
pub struct OverlayRegistry<C: MapCanvas> {
    canvas: C,
    colors: ColorAllocator<RowId>,
    arrow: ArrowPattern,
    mapping: BTreeMap<RowId, BTreeMap<OverlayKind, OverlayEntry<C::Handle>>>,
}

impl<C: MapCanvas> OverlayRegistry<C> {
    pub fn new(canvas: C, colors: ColorAllocator<RowId>, arrow: ArrowPattern) -> Self {
        OverlayRegistry {
            canvas,
            colors,
            arrow,
            mapping: BTreeMap::new(),
        }
    }

    pub fn state(&self, row: RowId, kind: OverlayKind) -> DisplayState {
        match self.mapping.get(&row).and_then(|kinds| kinds.get(&kind)) {
            Some(_) => DisplayState::Shown,
            None => DisplayState::Hidden,
        }
    }

    /// Color the overlay was drawn with, if shown.
    pub fn shown_color(&self, row: RowId, kind: OverlayKind) -> Option<Color> {
        self.mapping
            .get(&row)
            .and_then(|kinds| kinds.get(&kind))
            .map(|entry| entry.color)
    }

    /// Every shown `(row, kind)` in row order.
    pub fn shown(&self) -> Vec<(RowId, OverlayKind)> {
        self.mapping
            .iter()
            .flat_map(|(row, kinds)| kinds.keys().map(move |kind| (*row, *kind)))
            .collect()
    }

    /// Hides the overlay for `(row, entity.kind())` if it is shown,
    /// otherwise renders and shows it. A render failure leaves this and every
    /// other overlay as they were.
    pub fn toggle(
        &mut self,
        row: RowId,
        entity: OverlayEntity,
        ctx: &RenderContext,
    ) -> Result<DisplayState, ViewerError> {
        let kind = entity.kind();
        if self.hide(row, kind) {
            return Ok(DisplayState::Hidden);
        }
        self.show(row, entity, ctx)?;
        Ok(DisplayState::Shown)
    }

    fn show(&mut self, row: RowId, entity: OverlayEntity, ctx: &RenderContext) -> Result<(), ViewerError> {
        let kind = entity.kind();
        let color = self.colors.color_for(row);
        let (mut geometry, description) = match entity {
            OverlayEntity::Segment(segment) => {
                let style = RenderStyle::trajectory(color, self.arrow);
                (
                    render::render_trajectory(&segment.positions, &style, ctx),
                    render::describe_entity(EntityRef::Segment(segment), ctx),
                )
            }
            OverlayEntity::Trip(trip) => {
                let style = RenderStyle::trajectory(color, self.arrow);
                (
                    render::render_trip(trip, &style, ctx)?,
                    render::describe_entity(EntityRef::Trip(trip), ctx),
                )
            }
            OverlayEntity::Journey(journey) => {
                let style = RenderStyle::journey(color, self.arrow);
                (
                    render::render_journey_path(&journey.stops, &style, ctx, MissingStop::Skip)?,
                    render::describe_entity(EntityRef::Journey(journey), ctx),
                )
            }
        };
        geometry.attach_popup(description.with_hide_action(row, kind));

        info!("show {kind} for row {row} in {color}");
        let handle = self.canvas.add_layer(geometry);
        self.mapping
            .entry(row)
            .or_default()
            .insert(kind, OverlayEntry { handle, color });
        Ok(())
    }

    /// Removes `(row, kind)` from the canvas. Returns whether it was shown.
    pub fn hide(&mut self, row: RowId, kind: OverlayKind) -> bool {
        let Some(kinds) = self.mapping.get_mut(&row) else {
            return false;
        };
        let Some(entry) = kinds.remove(&kind) else {
            return false;
        };
        if kinds.is_empty() {
            self.mapping.remove(&row);
        }
        info!("hide {kind} for row {row}");
        self.canvas.remove_layer(entry.handle);
        true
    }

    /// Hides everything that is shown and returns what was hidden.
    pub fn hide_all(&mut self) -> Vec<(RowId, OverlayKind)> {
        let shown = self.shown();
        for (row, kind) in &shown {
            self.hide(*row, *kind);
        }
        shown
    }

    /// The global "clear" action: every overlay is removed before the color
    /// assignments are forgotten.
    pub fn clear(&mut self) -> Vec<(RowId, OverlayKind)> {
        let hidden = self.hide_all();
        self.colors.reset();
        info!("cleared {} overlays", hidden.len());
        hidden
    }

    pub fn colors(&self) -> &ColorAllocator<RowId> {
        &self.colors
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    /// Gives the canvas back. Overlays still shown stay drawn on it.
    pub fn into_canvas(self) -> C {
        self.canvas
    }
}
