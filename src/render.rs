/* Pure transforms from result-file entities to drawable geometry and popup
content. Nothing here keeps state: the same inputs always produce the same
`GeometrySpec` and `Description`.
*/

use std::fmt::Write;

use geo_types::{Coord, LineString, Point, Rect};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::ViewerError;
use crate::model::{Journey, Sample, Segment, Stop, StopTable, StopVisit, Timestamp, Trip};
use crate::overlay::OverlayKind;
use crate::table::RowId;
use crate::utils::{format_timestamp, DATE_FORMAT, TIME_FORMAT};

/// Repeated arrow heads along a line, in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrowPattern {
    pub offset_px: f32,
    pub repeat_px: f32,
    pub pixel_size: f32,
}

impl Default for ArrowPattern {
    fn default() -> Self {
        ArrowPattern {
            offset_px: 25.0,
            repeat_px: 75.0,
            pixel_size: 15.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PathStyle {
    pub color: Option<Color>,
    pub weight: f32,
    pub radius: Option<f32>,
    pub fill: bool,
    pub fill_opacity: Option<f32>,
    pub dash_array: Option<&'static str>,
}

impl PathStyle {
    pub fn line(weight: f32) -> Self {
        PathStyle {
            color: None,
            weight,
            radius: None,
            fill: false,
            fill_opacity: None,
            dash_array: None,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Icon {
    pub prefix: &'static str,
    pub name: &'static str,
    pub marker_color: &'static str,
}

pub const DEPARTURE_ICON: Icon = Icon {
    prefix: "fa",
    name: "play-circle",
    marker_color: "darkblue",
};

pub const ARRIVAL_ICON: Icon = Icon {
    prefix: "fa",
    name: "stop-circle",
    marker_color: "darkblue",
};

/// Line and marker styling for one overlay, already carrying its color.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderStyle {
    pub color: Color,
    pub line: PathStyle,
    pub marker: PathStyle,
    pub arrow: ArrowPattern,
}

impl RenderStyle {
    /// Recorded positions: solid line, small filled dots.
    pub fn trajectory(color: Color, arrow: ArrowPattern) -> Self {
        RenderStyle {
            color,
            line: PathStyle::line(3.0).with_color(color),
            marker: PathStyle {
                color: Some(color),
                weight: 2.0,
                radius: Some(3.0),
                fill: true,
                fill_opacity: Some(0.8),
                dash_array: None,
            },
            arrow,
        }
    }

    /// Timetabled stops: dashed line, hollow circles.
    pub fn journey(color: Color, arrow: ArrowPattern) -> Self {
        RenderStyle {
            color,
            line: PathStyle {
                dash_array: Some("5"),
                ..PathStyle::line(2.0).with_color(color)
            },
            marker: PathStyle {
                color: Some(color),
                weight: 2.0,
                radius: Some(4.0),
                fill: false,
                fill_opacity: None,
                dash_array: None,
            },
            arrow,
        }
    }

    /// Ring around a trip's scheduled origin or destination stop.
    pub fn stop_ring(&self) -> PathStyle {
        PathStyle {
            color: Some(self.color),
            weight: 2.0,
            radius: Some(10.0),
            fill: false,
            fill_opacity: None,
            dash_array: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Polyline(LineString<f64>),
    CircleMarker(Point<f64>),
    IconMarker { at: Point<f64>, icon: Icon },
    ArrowHeads {
        along: LineString<f64>,
        pattern: ArrowPattern,
    },
    /// Circle with a radius in metres.
    Circle { center: Point<f64>, radius_m: f64 },
    Rectangle(Rect<f64>),
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Polyline(_) => "polyline",
            Shape::CircleMarker(_) => "circle_marker",
            Shape::IconMarker { .. } => "icon_marker",
            Shape::ArrowHeads { .. } => "arrow_heads",
            Shape::Circle { .. } => "circle",
            Shape::Rectangle(_) => "rectangle",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub shape: Shape,
    pub style: PathStyle,
    pub popup: Option<Description>,
}

/// A group of features drawn and removed as one unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometrySpec {
    pub features: Vec<Feature>,
}

impl GeometrySpec {
    fn push(&mut self, shape: Shape, style: PathStyle, popup: Option<Description>) {
        self.features.push(Feature {
            shape,
            style,
            popup,
        });
    }

    /// Binds `description` to the main line, as its popup. Without a line
    /// it replaces the popup of the first feature.
    pub fn attach_popup(&mut self, description: Description) {
        let line = self
            .features
            .iter()
            .position(|feature| matches!(feature.shape, Shape::Polyline(_)))
            .unwrap_or(0);
        if let Some(feature) = self.features.get_mut(line) {
            feature.popup = Some(description);
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn count(&self, name: &str) -> usize {
        self.features
            .iter()
            .filter(|feature| feature.shape.name() == name)
            .count()
    }
}

/// Ordered (label, value) pairs shown in a popup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Description {
    pub title: &'static str,
    pub fields: Vec<(String, String)>,
    /// Overlay a "Hide this ..." link in the popup toggles off.
    #[serde(skip)]
    pub hide_action: Option<(RowId, OverlayKind)>,
}

impl Description {
    pub fn new(title: &'static str) -> Self {
        Description {
            title,
            fields: Vec::new(),
            hide_action: None,
        }
    }

    pub fn with_hide_action(mut self, row: RowId, kind: OverlayKind) -> Self {
        self.hide_action = Some((row, kind));
        self
    }

    pub fn field(mut self, label: &str, value: impl Into<String>) -> Self {
        self.fields.push((label.to_owned(), value.into()));
        self
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn labels(&self) -> Vec<&str> {
        self.fields.iter().map(|(l, _)| l.as_str()).collect()
    }

    pub fn to_html(&self) -> String {
        let rows = self
            .fields
            .iter()
            .map(|(label, value)| {
                format!(
                    "<tr><th align=\"right\">{}</th><td>{}</td></tr>",
                    escape_html(label),
                    escape_html(value)
                )
            })
            .join(" ");
        let mut html = format!(
            "<h1>{}</h1> <table class=\"popup\"> {} </table>",
            self.title, rows
        );
        if let Some((row, kind)) = self.hide_action {
            write!(
                html,
                " <p><a href=\"#\" data-toggle=\"{kind}-{row}\">Hide this {kind}</a></p>"
            )
            .ok();
        }
        html
    }
}

fn escape_html(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '&' => "&amp;".to_owned(),
            '<' => "&lt;".to_owned(),
            '>' => "&gt;".to_owned(),
            '"' => "&quot;".to_owned(),
            c => c.to_string(),
        })
        .collect()
}

/// What the renderer needs besides the entity itself.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    pub stops: Option<&'a StopTable>,
    /// Pattern for sample times; the segment viewer shows seconds.
    pub time_format: &'a str,
}

impl<'a> RenderContext<'a> {
    pub fn new(stops: Option<&'a StopTable>, time_format: &'a str) -> Self {
        RenderContext { stops, time_format }
    }

    fn lookup(&self, code: &str) -> Result<&'a Stop, ViewerError> {
        match self.stops {
            Some(stops) => stops.lookup(code),
            None => Err(ViewerError::LookupFailure {
                code: code.to_owned(),
            }),
        }
    }
}

/// What to do with a stop-visit whose stop is missing from the lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingStop {
    Skip,
    Abort,
}

#[derive(Clone, Copy, Debug)]
pub enum EntityRef<'a> {
    Segment(&'a Segment),
    Trip(&'a Trip),
    Journey(&'a Journey),
    /// A sample and its position in its sequence.
    Sample(&'a Sample, usize),
    StopVisit(&'a StopVisit),
    Stop(&'a Stop),
}

fn date_and_time(description: Description, time: Option<&Timestamp>, pattern: &str) -> Description {
    let (date, time) = match time {
        Some(time) => (
            format_timestamp(time, DATE_FORMAT),
            format_timestamp(time, pattern),
        ),
        None => (String::new(), String::new()),
    };
    description.field("Date", date).field("Time", time)
}

fn resolved_label(ctx: &RenderContext, visit: Option<&StopVisit>) -> String {
    match visit {
        None => String::new(),
        Some(visit) => ctx
            .lookup(&visit.stop_point_ref)
            .map(Stop::label)
            .unwrap_or_else(|_| visit.stop_point_ref.clone()),
    }
}

pub fn describe_entity(entity: EntityRef, ctx: &RenderContext) -> Description {
    match entity {
        EntityRef::Trip(trip) => date_and_time(
            Description::new("Trip"),
            trip.origin_aimed_departure_time.as_ref(),
            TIME_FORMAT,
        )
        .field("From", format!("{} ({})", trip.origin_name, trip.origin_ref))
        .field(
            "To",
            format!("{} ({})", trip.destination_name, trip.destination_ref),
        )
        .field("Line", trip.line_ref.as_str())
        .field("Operator", trip.operator_ref.as_str())
        .field("Direction", trip.direction_ref.as_str())
        .field("Vehicle", trip.vehicle_ref.as_str()),
        EntityRef::Journey(journey) => date_and_time(
            Description::new("Journey"),
            Some(&journey.departure_time),
            TIME_FORMAT,
        )
        .field("From", resolved_label(ctx, journey.first_visit()))
        .field("To", resolved_label(ctx, journey.last_visit()))
        .field("Line", journey.service.line_name.as_str())
        .field("Operator", journey.service.operator_code.as_str())
        .field("Direction", journey.direction.as_str()),
        EntityRef::Segment(segment) => Description::new("Segment")
            .field("Vehicle", segment.vehicle_ref.as_str())
            .field("On Route", segment.on_route.to_string()),
        EntityRef::Sample(sample, order) => date_and_time(
            Description::new("Position"),
            Some(&sample.recorded_at),
            ctx.time_format,
        )
        .field("Bearing", sample.bearing.clone().unwrap_or_default())
        .field("Order", order.to_string())
        .field("Delay", sample.delay.clone().unwrap_or_default()),
        EntityRef::StopVisit(visit) => {
            let mut description =
                date_and_time(Description::new("Journey stop"), Some(&visit.time), TIME_FORMAT)
                    .field("Activity", visit.activity.clone().unwrap_or_default())
                    .field("Order", visit.order.clone().unwrap_or_default())
                    .field(
                        "Timing status",
                        visit.timing_status.clone().unwrap_or_default(),
                    )
                    .field("Run time", visit.run_time.clone().unwrap_or_default());
            if let Some(wait_time) = &visit.wait_time {
                description = description.field("Wait time", wait_time.as_str());
            }
            if let Ok(stop) = ctx.lookup(&visit.stop_point_ref) {
                description = description
                    .field("ATCO Code", stop.atco_code.as_str())
                    .field("Common name", stop.common_name.as_str())
                    .field("Indicator", stop.indicator.as_str())
                    .field("Locality name", stop.locality_name.as_str());
            }
            description
        }
        EntityRef::Stop(stop) => Description::new("Stop")
            .field("Indicator", stop.indicator.as_str())
            .field("Common name", stop.common_name.as_str())
            .field("Locality", stop.locality_name.as_str())
            .field("Code", stop.atco_code.as_str()),
    }
}

fn line_with_arrows(geometry: &mut GeometrySpec, coords: Vec<Coord<f64>>, style: &RenderStyle) {
    // a line needs two positions to be drawable
    if coords.len() < 2 {
        return;
    }
    let line = LineString::new(coords);
    geometry.push(
        Shape::ArrowHeads {
            along: line.clone(),
            pattern: style.arrow,
        },
        PathStyle::line(1.0).with_color(style.color),
        None,
    );
    // keep the line first so it is the feature popups bind to
    geometry.features.insert(
        0,
        Feature {
            shape: Shape::Polyline(line),
            style: style.line.clone(),
            popup: None,
        },
    );
}

/// Polyline through every sample, one dot per sample and arrow heads
/// showing the direction of travel.
pub fn render_trajectory(samples: &[Sample], style: &RenderStyle, ctx: &RenderContext) -> GeometrySpec {
    let mut geometry = GeometrySpec::default();
    for (order, sample) in samples.iter().enumerate() {
        geometry.push(
            Shape::CircleMarker(sample.point()),
            style.marker.clone(),
            Some(describe_entity(EntityRef::Sample(sample, order), ctx)),
        );
    }
    let coords = samples.iter().map(|sample| sample.point().0).collect();
    line_with_arrows(&mut geometry, coords, style);
    geometry
}

/// A trajectory plus departure/arrival icons at the observed event indices
/// and rings at the scheduled origin and destination stops. Coincident
/// departure and arrival indices draw both icons on the same sample.
pub fn render_trip(trip: &Trip, style: &RenderStyle, ctx: &RenderContext) -> Result<GeometrySpec, ViewerError> {
    let len = trip.positions.len();
    for index in [trip.departure_position, trip.arrival_position]
        .into_iter()
        .flatten()
    {
        if index >= len {
            return Err(ViewerError::SampleIndexOutOfRange { index, len });
        }
    }

    let mut geometry = render_trajectory(&trip.positions, style, ctx);
    let events = [
        (trip.departure_position, DEPARTURE_ICON),
        (trip.arrival_position, ARRIVAL_ICON),
    ];
    for (index, icon) in events {
        if let Some(index) = index {
            let sample = &trip.positions[index];
            geometry.push(
                Shape::IconMarker {
                    at: sample.point(),
                    icon,
                },
                style.marker.clone(),
                Some(describe_entity(EntityRef::Sample(sample, index), ctx)),
            );
        }
    }

    for code in [&trip.origin_ref, &trip.destination_ref] {
        match ctx.lookup(code) {
            Ok(stop) => geometry.push(
                Shape::CircleMarker(stop.point()),
                style.stop_ring(),
                Some(describe_entity(EntityRef::Stop(stop), ctx)),
            ),
            Err(e) => warn!("trip for vehicle {}: {}", trip.vehicle_ref, e),
        }
    }
    Ok(geometry)
}

/// Polyline and hollow marker through each planned stop. With
/// `MissingStop::Skip` an unknown stop code drops just that visit.
pub fn render_journey_path(
    visits: &[StopVisit],
    style: &RenderStyle,
    ctx: &RenderContext,
    on_missing: MissingStop,
) -> Result<GeometrySpec, ViewerError> {
    let mut geometry = GeometrySpec::default();
    let mut coords = Vec::with_capacity(visits.len());
    for visit in visits {
        let stop = match ctx.lookup(&visit.stop_point_ref) {
            Ok(stop) => stop,
            Err(e) if on_missing == MissingStop::Skip => {
                warn!("skipping journey stop: {e}");
                continue;
            }
            Err(e) => return Err(e),
        };
        coords.push(stop.point().0);
        geometry.push(
            Shape::CircleMarker(stop.point()),
            style.marker.clone(),
            Some(describe_entity(EntityRef::StopVisit(visit), ctx)),
        );
    }
    line_with_arrows(&mut geometry, coords, style);
    Ok(geometry)
}
