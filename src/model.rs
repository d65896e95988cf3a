// Result-file records. Field names are the wire contract of the JSON files
// produced by the extraction scripts and must not be renamed.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use geo_types::Point;
use serde::{Deserialize, Deserializer};

use crate::error::ViewerError;

/// Capture or schedule time. Values without an offset are read as UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub DateTime<FixedOffset>);

impl Timestamp {
    pub fn parse(text: &str) -> Option<Self> {
        if let Ok(time) = DateTime::parse_from_rfc3339(text) {
            return Some(Timestamp(time));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .map(|naive| Timestamp(naive.and_utc().fixed_offset()))
    }

    pub fn seconds_until(&self, later: &Timestamp) -> i64 {
        (later.0 - self.0).num_seconds()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Timestamp::parse(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {text}")))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(f64),
    Text(String),
    Flag(bool),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", n as i64),
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s,
            Scalar::Flag(b) => b.to_string(),
        }
    }
}

// Coordinates arrive as either JSON numbers or decimal strings.
fn de_coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Scalar::deserialize(deserializer)? {
        Scalar::Number(n) => Ok(n),
        Scalar::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid coordinate: {s}"))),
        Scalar::Flag(_) => Err(serde::de::Error::custom("invalid coordinate: boolean")),
    }
}

fn de_opt_coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Number(n)) => Ok(Some(n)),
        Some(Scalar::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid coordinate: {s}"))),
        Some(Scalar::Flag(_)) => Err(serde::de::Error::custom("invalid coordinate: boolean")),
        None => Ok(None),
    }
}

fn de_opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_text))
}

fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(de_opt_text(deserializer)?.unwrap_or_default())
}

// Delays are seconds; the CSV-oriented scripts sometimes leave them as "".
fn de_opt_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Number(n)) => Ok(Some(n)),
        Some(Scalar::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Scalar::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid delay: {s}"))),
        Some(Scalar::Flag(_)) | None => Ok(None),
    }
}

/// One recorded vehicle position.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Sample {
    #[serde(rename = "Latitude", deserialize_with = "de_coordinate")]
    pub latitude: f64,
    #[serde(rename = "Longitude", deserialize_with = "de_coordinate")]
    pub longitude: f64,
    #[serde(rename = "RecordedAtTime")]
    pub recorded_at: Timestamp,
    #[serde(rename = "Bearing", default, deserialize_with = "de_opt_text")]
    pub bearing: Option<String>,
    #[serde(rename = "Delay", default, deserialize_with = "de_opt_text")]
    pub delay: Option<String>,
}

impl Sample {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Stop {
    #[serde(deserialize_with = "de_text")]
    pub atco_code: String,
    #[serde(default, deserialize_with = "de_text")]
    pub common_name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub indicator: String,
    #[serde(default, deserialize_with = "de_text")]
    pub locality_name: String,
    #[serde(deserialize_with = "de_coordinate")]
    pub latitude: f64,
    #[serde(deserialize_with = "de_coordinate")]
    pub longitude: f64,
}

impl Stop {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// "Stop D Drummer Street, Cambridge (0500CCITY144)"
    pub fn label(&self) -> String {
        format!(
            "{} {}, {} ({})",
            self.indicator, self.common_name, self.locality_name, self.atco_code
        )
    }
}

/// The stop-lookup document, keyed by ATCO code.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct StopTable {
    pub stops: HashMap<String, Stop>,
}

impl StopTable {
    pub fn lookup(&self, code: &str) -> Result<&Stop, ViewerError> {
        self.stops
            .get(code)
            .ok_or_else(|| ViewerError::LookupFailure {
                code: code.to_owned(),
            })
    }
}

impl FromIterator<Stop> for StopTable {
    fn from_iter<T: IntoIterator<Item = Stop>>(iter: T) -> Self {
        StopTable {
            stops: iter
                .into_iter()
                .map(|stop| (stop.atco_code.clone(), stop))
                .collect(),
        }
    }
}

/// An observed vehicle trip. `departure_position` and `arrival_position`
/// index into `positions` and are absent when the event was not observed.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Trip {
    pub positions: Vec<Sample>,
    #[serde(default)]
    pub departure_position: Option<usize>,
    #[serde(default)]
    pub arrival_position: Option<usize>,
    #[serde(rename = "VehicleRef", default, deserialize_with = "de_text")]
    pub vehicle_ref: String,
    #[serde(rename = "LineRef", default, deserialize_with = "de_text")]
    pub line_ref: String,
    #[serde(rename = "OperatorRef", default, deserialize_with = "de_text")]
    pub operator_ref: String,
    #[serde(rename = "DirectionRef", default, deserialize_with = "de_text")]
    pub direction_ref: String,
    #[serde(rename = "OriginRef", default, deserialize_with = "de_text")]
    pub origin_ref: String,
    #[serde(rename = "OriginName", default, deserialize_with = "de_text")]
    pub origin_name: String,
    #[serde(rename = "DestinationRef", default, deserialize_with = "de_text")]
    pub destination_ref: String,
    #[serde(rename = "DestinationName", default, deserialize_with = "de_text")]
    pub destination_name: String,
    #[serde(rename = "OriginAimedDepartureTime", default)]
    pub origin_aimed_departure_time: Option<Timestamp>,
}

impl Trip {
    pub fn departure(&self) -> Option<&Sample> {
        self.departure_position.and_then(|i| self.positions.get(i))
    }

    pub fn arrival(&self) -> Option<&Sample> {
        self.arrival_position.and_then(|i| self.positions.get(i))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Service {
    #[serde(rename = "LineName", default, deserialize_with = "de_text")]
    pub line_name: String,
    #[serde(rename = "OperatorCode", default, deserialize_with = "de_text")]
    pub operator_code: String,
    #[serde(rename = "ServiceCode", default, deserialize_with = "de_text")]
    pub service_code: String,
    #[serde(rename = "Description", default, deserialize_with = "de_text")]
    pub description: String,
}

/// One planned call of a journey at a stop.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StopVisit {
    #[serde(rename = "StopPointRef", deserialize_with = "de_text")]
    pub stop_point_ref: String,
    #[serde(rename = "Order", default, deserialize_with = "de_opt_text")]
    pub order: Option<String>,
    #[serde(rename = "Activity", default, deserialize_with = "de_opt_text")]
    pub activity: Option<String>,
    #[serde(rename = "TimingStatus", default, deserialize_with = "de_opt_text")]
    pub timing_status: Option<String>,
    pub time: Timestamp,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub run_time: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub wait_time: Option<String>,
}

/// A timetabled journey.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Journey {
    #[serde(rename = "DepartureTime")]
    pub departure_time: Timestamp,
    #[serde(rename = "Direction", default, deserialize_with = "de_text")]
    pub direction: String,
    #[serde(rename = "Service", default)]
    pub service: Service,
    pub stops: Vec<StopVisit>,
}

impl Journey {
    pub fn first_visit(&self) -> Option<&StopVisit> {
        self.stops.first()
    }

    pub fn last_visit(&self) -> Option<&StopVisit> {
        self.stops.last()
    }
}

/// Part of a vehicle track between the two configured stops.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Segment {
    #[serde(rename = "VehicleRef", default, deserialize_with = "de_text")]
    pub vehicle_ref: String,
    #[serde(default)]
    pub on_route: bool,
    pub positions: Vec<Sample>,
}

impl Segment {
    pub fn start(&self) -> Option<&Sample> {
        self.positions.first()
    }

    pub fn end(&self) -> Option<&Sample> {
        self.positions.last()
    }
}

/// Segment end points. Stop records carry both `lat`/`lng` and
/// `latitude`/`longitude`; either spelling is enough.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
struct RawGeoPoint {
    #[serde(default, deserialize_with = "de_opt_coordinate")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_coordinate")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_coordinate")]
    lng: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_coordinate")]
    longitude: Option<f64>,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = String;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        let lat = raw.lat.or(raw.latitude).ok_or("missing field `lat`")?;
        let lng = raw.lng.or(raw.longitude).ok_or("missing field `lng`")?;
        Ok(GeoPoint { lat, lng })
    }
}

impl GeoPoint {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SegmentDocument {
    pub segments: Vec<Segment>,
    pub from_stop: GeoPoint,
    pub to_stop: GeoPoint,
    /// Metres.
    pub origin_threshold: f64,
    /// Metres.
    pub destination_threshold: f64,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub line: Option<String>,
}

/// A journey/trip pairing from the merge step. `type` is "1-1" for an
/// exact pairing; anything else is a mismatch.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RowRecord {
    #[serde(rename = "type", deserialize_with = "de_text")]
    pub pairing: String,
    pub time: Timestamp,
    #[serde(default, deserialize_with = "de_text")]
    pub origin: String,
    #[serde(default, deserialize_with = "de_text")]
    pub origin_desc: String,
    #[serde(default, deserialize_with = "de_text")]
    pub destination: String,
    #[serde(default, deserialize_with = "de_text")]
    pub destination_desc: String,
    #[serde(default)]
    pub journey: Option<Journey>,
    #[serde(default)]
    pub trip: Option<Trip>,
    #[serde(default, deserialize_with = "de_text")]
    pub separator: String,
    #[serde(default, deserialize_with = "de_opt_seconds")]
    pub departure_delay: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_seconds")]
    pub arrival_delay: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RowsDocument {
    pub rows: Vec<RowRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_with_and_without_offset() {
        let with_offset = Timestamp::parse("2019-03-20T06:45:57+00:00").unwrap();
        let naive = Timestamp::parse("2019-03-20T06:45:57").unwrap();
        assert_eq!(with_offset, naive);
        assert!(Timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn sample_from_string_coordinates() {
        let sample: Sample = serde_json::from_str(
            r#"{"Bearing": "0", "Delay": "PT0S", "Latitude": "52.2308846",
                "Longitude": "0.1594450", "RecordedAtTime": "2019-03-20T06:45:57+00:00",
                "trip": 3}"#,
        )
        .unwrap();
        assert_eq!(sample.latitude, 52.2308846);
        assert_eq!(sample.longitude, 0.159445);
        assert_eq!(sample.bearing.as_deref(), Some("0"));
        assert_eq!(sample.delay.as_deref(), Some("PT0S"));
    }

    #[test]
    fn numeric_bearing_is_text() {
        let sample: Sample = serde_json::from_str(
            r#"{"Bearing": 270, "Latitude": 52.2, "Longitude": 0.1,
                "RecordedAtTime": "2019-03-20T06:45:57Z"}"#,
        )
        .unwrap();
        assert_eq!(sample.bearing.as_deref(), Some("270"));
        assert_eq!(sample.delay, None);
    }

    #[test]
    fn stop_lookup_miss_is_lookup_failure() {
        let table = StopTable::default();
        match table.lookup("0500XXXX") {
            Err(ViewerError::LookupFailure { code }) => assert_eq!(code, "0500XXXX"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_delay_is_absent() {
        let row: RowRecord = serde_json::from_str(
            r#"{"type": "1-0", "time": "2019-03-20T06:45:00", "journey": null,
                "trip": null, "departure_delay": "", "arrival_delay": 90}"#,
        )
        .unwrap();
        assert_eq!(row.departure_delay, None);
        assert_eq!(row.arrival_delay, Some(90.0));
    }

    #[test]
    fn stop_point_with_both_spellings() {
        let point: GeoPoint = serde_json::from_str(
            r#"{"atco_code": "0500CCITY144", "common_name": "Drummer Street",
                "id": 3, "indicator": "Stop D3", "lat": 52.2052, "latitude": "52.2052",
                "lng": 0.1245, "longitude": "0.1245", "locality_name": "Cambridge",
                "naptan_code": "CMBDGJWT", "stop_id": 3}"#,
        )
        .unwrap();
        assert_eq!(point, GeoPoint { lat: 52.2052, lng: 0.1245 });

        let long_names: GeoPoint =
            serde_json::from_str(r#"{"latitude": 52.2633, "longitude": "0.0076"}"#).unwrap();
        assert_eq!(long_names.point(), Point::new(0.0076, 52.2633));

        let missing = serde_json::from_str::<GeoPoint>(r#"{"lat": 52.2}"#).unwrap_err();
        assert!(missing.to_string().contains("missing field `lng`"));
    }
}
