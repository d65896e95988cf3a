use std::fmt;

use serde::Serialize;

use crate::error::ViewerError;
use crate::model::{RowRecord, RowsDocument, Segment, SegmentDocument};
use crate::overlay::{DisplayState, OverlayKind};
use crate::utils::{
    as_minutes, format_timestamp, minutes_between, DATE_FORMAT, TIME_FORMAT,
    TIME_WITH_SECONDS_FORMAT,
};

/// 0-based position of a row in its dataset, assigned once at load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a combined row's journey and trip were matched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pairing {
    /// "1-1"
    Exact,
    Mismatch(String),
}

impl Pairing {
    pub fn from_type(text: &str) -> Self {
        if text == "1-1" {
            Pairing::Exact
        } else {
            Pairing::Mismatch(text.to_owned())
        }
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, Pairing::Mismatch(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub id: RowId,
    /// Segment rows have no pairing.
    pub pairing: Option<Pairing>,
    pub kinds: Vec<OverlayKind>,
}

impl Row {
    pub fn has(&self, kind: OverlayKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// One row per top-level entity, numbered contiguously from 0.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowIndex {
    rows: Vec<Row>,
}

impl RowIndex {
    pub fn for_segments(document: &SegmentDocument) -> Self {
        let rows = (0..document.segments.len())
            .map(|i| Row {
                id: RowId(i),
                pairing: None,
                kinds: vec![OverlayKind::Segment],
            })
            .collect();
        RowIndex { rows }
    }

    pub fn for_rows(document: &RowsDocument) -> Self {
        let rows = document
            .rows
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let mut kinds = Vec::with_capacity(2);
                if record.journey.is_some() {
                    kinds.push(OverlayKind::Journey);
                }
                if record.trip.is_some() {
                    kinds.push(OverlayKind::Trip);
                }
                Row {
                    id: RowId(i),
                    pairing: Some(Pairing::from_type(&record.pairing)),
                    kinds,
                }
            })
            .collect();
        RowIndex { rows }
    }

    pub fn get(&self, id: RowId) -> Option<&Row> {
        self.rows.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleLabel {
    Show,
    Hide,
}

impl ToggleLabel {
    pub fn as_html(&self) -> &'static str {
        match self {
            ToggleLabel::Show => "Show",
            ToggleLabel::Hide => "<b>Hide</b>",
        }
    }
}

impl From<DisplayState> for ToggleLabel {
    fn from(state: DisplayState) -> Self {
        match state {
            DisplayState::Hidden => ToggleLabel::Show,
            DisplayState::Shown => ToggleLabel::Hide,
        }
    }
}

/// The per-row, per-kind link that shows or hides an overlay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToggleControl {
    pub row: RowId,
    pub kind: OverlayKind,
    pub label: ToggleLabel,
}

impl ToggleControl {
    fn new(row: RowId, kind: OverlayKind) -> Self {
        ToggleControl {
            row,
            kind,
            label: ToggleLabel::Show,
        }
    }

    /// Stable element id, e.g. "trip-3".
    pub fn element_id(&self) -> String {
        format!("{}-{}", self.kind, self.row)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    Heading(String),
    Text(String),
    Toggle(ToggleControl),
}

impl Cell {
    fn text(text: impl Into<String>) -> Self {
        Cell::Text(text.into())
    }

    fn blanks(n: usize) -> impl Iterator<Item = Cell> {
        std::iter::repeat_with(|| Cell::text("")).take(n)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRow {
    pub id: RowId,
    /// Mismatched pairings are highlighted.
    pub flagged: bool,
    pub cells: Vec<Cell>,
}

impl TableRow {
    pub fn toggle(&self, kind: OverlayKind) -> Option<&ToggleControl> {
        self.cells.iter().find_map(|cell| match cell {
            Cell::Toggle(control) if control.kind == kind => Some(control),
            _ => None,
        })
    }

    fn toggle_mut(&mut self, kind: OverlayKind) -> Option<&mut ToggleControl> {
        self.cells.iter_mut().find_map(|cell| match cell {
            Cell::Toggle(control) if control.kind == kind => Some(control),
            _ => None,
        })
    }
}

const SEGMENT_HEADINGS: [&str; 8] = [
    "Row", "Vehicle", "On route", "Start", "End", "Time (m)", "Length", "Show",
];

const COMBINED_HEADINGS: [&str; 19] = [
    "",
    "Type",
    "Date",
    "Time",
    "From",
    "To",
    "Journey: Line",
    "Journey: Direction",
    "Journey: Depart",
    "Journey: Arrive",
    "",
    "",
    "",
    "Trip: Line",
    "Trip: Vehicle",
    "Trip: Depart",
    "Trip: Arrive",
    "Delay (min): Departure",
    "Delay (min): Arrival",
];

/// Display cells for every row plus the toggle controls that drive the
/// overlay registry.
#[derive(Clone, Debug, PartialEq)]
pub struct TableBinder {
    headings: Vec<&'static str>,
    rows: Vec<TableRow>,
}

fn segment_cells(id: RowId, segment: &Segment) -> Vec<Cell> {
    let (start, end, minutes) = match (segment.start(), segment.end()) {
        (Some(start), Some(end)) => (
            format_timestamp(&start.recorded_at, TIME_WITH_SECONDS_FORMAT),
            format_timestamp(&end.recorded_at, TIME_WITH_SECONDS_FORMAT),
            minutes_between(&start.recorded_at, &end.recorded_at).to_string(),
        ),
        _ => Default::default(),
    };
    vec![
        Cell::Heading((id.0 + 1).to_string()),
        Cell::text(segment.vehicle_ref.as_str()),
        Cell::text(segment.on_route.to_string()),
        Cell::text(start),
        Cell::text(end),
        Cell::text(minutes),
        Cell::text(segment.positions.len().to_string()),
        Cell::Toggle(ToggleControl::new(id, OverlayKind::Segment)),
    ]
}

fn combined_cells(id: RowId, record: &RowRecord) -> Vec<Cell> {
    let mut cells = vec![
        Cell::Heading((id.0 + 1).to_string()),
        Cell::text(record.pairing.as_str()),
        Cell::text(format_timestamp(&record.time, DATE_FORMAT)),
        Cell::text(format_timestamp(&record.time, TIME_FORMAT)),
        Cell::text(record.origin_desc.as_str()),
        Cell::text(record.destination_desc.as_str()),
    ];

    match &record.journey {
        Some(journey) => {
            let visit_time = |visit: Option<&crate::model::StopVisit>| {
                visit
                    .map(|visit| format_timestamp(&visit.time, TIME_FORMAT))
                    .unwrap_or_default()
            };
            cells.push(Cell::text(journey.service.line_name.as_str()));
            cells.push(Cell::text(journey.direction.as_str()));
            cells.push(Cell::text(visit_time(journey.first_visit())));
            cells.push(Cell::text(visit_time(journey.last_visit())));
            cells.push(Cell::Toggle(ToggleControl::new(id, OverlayKind::Journey)));
        }
        None => cells.extend(Cell::blanks(5)),
    }

    cells.push(Cell::text(record.separator.as_str()));

    match &record.trip {
        Some(trip) => {
            let event_time = |sample: Option<&crate::model::Sample>| {
                sample
                    .map(|sample| format_timestamp(&sample.recorded_at, TIME_FORMAT))
                    .unwrap_or_default()
            };
            cells.push(Cell::Toggle(ToggleControl::new(id, OverlayKind::Trip)));
            cells.push(Cell::text(trip.line_ref.as_str()));
            cells.push(Cell::text(trip.vehicle_ref.as_str()));
            cells.push(Cell::text(event_time(trip.departure())));
            cells.push(Cell::text(event_time(trip.arrival())));
        }
        None => cells.extend(Cell::blanks(5)),
    }

    cells.push(Cell::text(as_minutes(record.departure_delay)));
    cells.push(Cell::text(as_minutes(record.arrival_delay)));
    cells
}

impl TableBinder {
    pub fn for_segments(document: &SegmentDocument, index: &RowIndex) -> Self {
        let rows = index
            .iter()
            .zip(&document.segments)
            .map(|(row, segment)| TableRow {
                id: row.id,
                flagged: false,
                cells: segment_cells(row.id, segment),
            })
            .collect();
        TableBinder {
            headings: SEGMENT_HEADINGS.to_vec(),
            rows,
        }
    }

    pub fn for_rows(document: &RowsDocument, index: &RowIndex) -> Self {
        let rows = index
            .iter()
            .zip(&document.rows)
            .map(|(row, record)| TableRow {
                id: row.id,
                flagged: row.pairing.as_ref().is_some_and(Pairing::is_mismatch),
                cells: combined_cells(row.id, record),
            })
            .collect();
        TableBinder {
            headings: COMBINED_HEADINGS.to_vec(),
            rows,
        }
    }

    pub fn headings(&self) -> &[&'static str] {
        &self.headings
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn row(&self, id: RowId) -> Option<&TableRow> {
        self.rows.get(id.0)
    }

    pub fn label(&self, row: RowId, kind: OverlayKind) -> Option<ToggleLabel> {
        self.row(row)
            .and_then(|r| r.toggle(kind))
            .map(|control| control.label)
    }

    fn control_mut(&mut self, row: RowId, kind: OverlayKind) -> Result<&mut ToggleControl, ViewerError> {
        self.rows
            .get_mut(row.0)
            .ok_or(ViewerError::UnknownRow(row))?
            .toggle_mut(kind)
            .ok_or(ViewerError::KindUnavailable { row, kind })
    }

    /// Runs `toggle` for the control at `(row, kind)` and relabels the
    /// control with the resulting state. A failed toggle keeps the label.
    pub fn on_toggle<F>(&mut self, row: RowId, kind: OverlayKind, toggle: F) -> Result<DisplayState, ViewerError>
    where
        F: FnOnce(RowId, OverlayKind) -> Result<DisplayState, ViewerError>,
    {
        self.control_mut(row, kind)?;
        let state = toggle(row, kind)?;
        self.control_mut(row, kind)?.label = state.into();
        Ok(state)
    }

    pub fn set_state(&mut self, row: RowId, kind: OverlayKind, state: DisplayState) -> bool {
        match self.control_mut(row, kind) {
            Ok(control) => {
                control.label = state.into();
                true
            }
            Err(_) => false,
        }
    }
}
