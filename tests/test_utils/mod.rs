use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use transit_viewer_core::dataset::{DataSource, Dataset};
use transit_viewer_core::error::ViewerError;
use transit_viewer_core::model::{
    GeoPoint, Journey, RowRecord, RowsDocument, Sample, Segment, SegmentDocument, Service, Stop, StopTable,
    StopVisit, Timestamp, Trip,
};

pub const DAY: &str = "2019-03-20";

// Cambridge, Drummer Street towards Barhill
pub const START_LAT: f64 = 52.2052;
pub const START_LNG: f64 = 0.1245;
pub const END_LAT: f64 = 52.2633;
pub const END_LNG: f64 = 0.0076;

pub const ORIGIN_CODE: &str = "0500CCITY144";
pub const MIDDLE_CODE: &str = "0500CCITY523";
pub const DESTINATION_CODE: &str = "0500SBARH011";

pub fn time_at(hour: u32, minute: u32, second: u32) -> Timestamp {
    let naive = NaiveDate::from_ymd_opt(2019, 3, 20)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap();
    Timestamp(naive.and_utc().fixed_offset())
}

/// `n` samples evenly spaced between the start and end points, 30s apart
/// from 06:45:00.
pub fn samples(n: usize) -> Vec<Sample> {
    let start = time_at(6, 45, 0);
    (0..n)
        .map(|i| {
            let f = if n > 1 {
                i as f64 / (n - 1) as f64
            } else {
                0.0
            };
            Sample {
                latitude: START_LAT + (END_LAT - START_LAT) * f,
                longitude: START_LNG + (END_LNG - START_LNG) * f,
                recorded_at: Timestamp(start.0 + Duration::seconds(30 * i as i64)),
                bearing: Some(format!("{}", 300 + i)),
                delay: Some("PT0S".to_owned()),
            }
        })
        .collect()
}

pub fn stop(code: &str, name: &str, lat: f64, lng: f64) -> Stop {
    Stop {
        atco_code: code.to_owned(),
        common_name: name.to_owned(),
        indicator: "Stop".to_owned(),
        locality_name: "Cambridge".to_owned(),
        latitude: lat,
        longitude: lng,
    }
}

pub fn stop_table() -> StopTable {
    [
        stop(ORIGIN_CODE, "Drummer Street", START_LAT, START_LNG),
        stop(
            MIDDLE_CODE,
            "Madingley Road",
            (START_LAT + END_LAT) / 2.0,
            (START_LNG + END_LNG) / 2.0,
        ),
        stop(DESTINATION_CODE, "Barhill Church", END_LAT, END_LNG),
    ]
    .into_iter()
    .collect()
}

pub fn trip(n: usize, departure: Option<usize>, arrival: Option<usize>) -> Trip {
    Trip {
        positions: samples(n),
        departure_position: departure,
        arrival_position: arrival,
        vehicle_ref: "WP-106".to_owned(),
        line_ref: "U".to_owned(),
        operator_ref: "WP".to_owned(),
        direction_ref: "OUTBOUND".to_owned(),
        origin_ref: ORIGIN_CODE.to_owned(),
        origin_name: "Drummer Street".to_owned(),
        destination_ref: DESTINATION_CODE.to_owned(),
        destination_name: "Barhill Church".to_owned(),
        origin_aimed_departure_time: Some(time_at(6, 45, 0)),
    }
}

pub fn visit(code: &str, order: usize, time: Timestamp) -> StopVisit {
    StopVisit {
        stop_point_ref: code.to_owned(),
        order: Some(order.to_string()),
        activity: Some("pickUpAndSetDown".to_owned()),
        timing_status: Some("PTP".to_owned()),
        time,
        run_time: Some("PT5M".to_owned()),
        wait_time: None,
    }
}

/// A journey calling at `codes` in order, five minutes apart.
pub fn journey(codes: &[&str]) -> Journey {
    Journey {
        departure_time: time_at(6, 45, 0),
        direction: "outbound".to_owned(),
        service: Service {
            line_name: "U".to_owned(),
            operator_code: "WP".to_owned(),
            service_code: "WP_U".to_owned(),
            description: "Drummer Street - Barhill".to_owned(),
        },
        stops: codes
            .iter()
            .enumerate()
            .map(|(i, code)| visit(code, i, time_at(6, 45 + 5 * i as u32, 0)))
            .collect(),
    }
}

pub fn row(pairing: &str, journey: Option<Journey>, trip: Option<Trip>) -> RowRecord {
    RowRecord {
        pairing: pairing.to_owned(),
        time: time_at(6, 45, 0),
        origin: ORIGIN_CODE.to_owned(),
        origin_desc: "Drummer Street".to_owned(),
        destination: DESTINATION_CODE.to_owned(),
        destination_desc: "Barhill Church".to_owned(),
        journey,
        trip,
        separator: "=".to_owned(),
        departure_delay: Some(30.0),
        arrival_delay: None,
    }
}

/// Row 0 is an exact pairing of a 3-stop journey and a 5-sample trip, row
/// 1 a trip with no matching journey.
pub fn combined_dataset() -> Dataset {
    Dataset::Combined {
        rows: RowsDocument {
            rows: vec![
                row(
                    "1-1",
                    Some(journey(&[ORIGIN_CODE, MIDDLE_CODE, DESTINATION_CODE])),
                    Some(trip(5, Some(0), Some(4))),
                ),
                row("0-1", None, Some(trip(4, Some(1), None))),
            ],
        },
        stops: stop_table(),
    }
}

pub fn segment(n: usize, vehicle: &str, on_route: bool) -> Segment {
    Segment {
        vehicle_ref: vehicle.to_owned(),
        on_route,
        positions: samples(n),
    }
}

pub fn segment_dataset(count: usize) -> Dataset {
    Dataset::Segments(SegmentDocument {
        segments: (0..count)
            .map(|i| segment(3 + i, &format!("WP-{}", 100 + i), i % 2 == 0))
            .collect(),
        from_stop: GeoPoint {
            lat: START_LAT,
            lng: START_LNG,
        },
        to_stop: GeoPoint {
            lat: END_LAT,
            lng: END_LNG,
        },
        origin_threshold: 50.0,
        destination_threshold: 75.0,
        day: Some(DAY.to_owned()),
        line: Some("U".to_owned()),
    })
}

fn sample_json(i: usize) -> Value {
    json!({
        "Bearing": "300",
        "Delay": "PT0S",
        "Latitude": format!("{:.7}", START_LAT + 0.01 * i as f64),
        "Longitude": format!("{:.7}", START_LNG - 0.02 * i as f64),
        "RecordedAtTime": format!("{DAY}T06:4{}:00+00:00", 5 + i),
    })
}

pub fn rows_json() -> Value {
    json!({
        "day": DAY,
        "rows": [
            {
                "type": "1-1",
                "time": format!("{DAY}T06:45:00"),
                "origin": ORIGIN_CODE,
                "origin_desc": "Drummer Street",
                "destination": DESTINATION_CODE,
                "destination_desc": "Barhill Church",
                "separator": "=",
                "departure_delay": 30,
                "arrival_delay": "",
                "journey": {
                    "DepartureTime": format!("{DAY}T06:45:00"),
                    "Direction": "outbound",
                    "Service": {"LineName": "U", "OperatorCode": "WP"},
                    "stops": [
                        {"StopPointRef": ORIGIN_CODE, "Order": 0, "time": format!("{DAY}T06:45:00")},
                        {"StopPointRef": "0500XXXX999", "Order": 1, "time": format!("{DAY}T06:50:00")},
                        {"StopPointRef": DESTINATION_CODE, "Order": 2, "time": format!("{DAY}T06:55:00"),
                         "run_time": "PT5M", "wait_time": "PT1M"},
                    ]
                },
                "trip": {
                    "VehicleRef": "WP-106",
                    "LineRef": "U",
                    "OriginRef": ORIGIN_CODE,
                    "DestinationRef": DESTINATION_CODE,
                    "OriginAimedDepartureTime": format!("{DAY}T06:45:00+00:00"),
                    "departure_position": 0,
                    "arrival_position": 2,
                    "positions": [sample_json(0), sample_json(1), sample_json(2)],
                }
            },
            {
                "type": "1-0",
                "time": format!("{DAY}T07:15:00"),
                "separator": "",
                "journey": null,
                "trip": null,
            }
        ]
    })
}

pub fn stops_json() -> Value {
    json!({
        "day": DAY,
        "stops": {
            ORIGIN_CODE: {
                "atco_code": ORIGIN_CODE,
                "common_name": "Drummer Street",
                "indicator": "Stop D3",
                "locality_name": "Cambridge",
                "latitude": "52.2052",
                "longitude": "0.1245",
            },
            DESTINATION_CODE: {
                "atco_code": DESTINATION_CODE,
                "common_name": "Church",
                "indicator": "opp",
                "locality_name": "Bar Hill",
                "latitude": 52.2633,
                "longitude": 0.0076,
            }
        }
    })
}

pub fn segments_json() -> Value {
    json!({
        "day": DAY,
        "line": "U",
        "from_stop": {"lat": START_LAT, "lng": START_LNG},
        "to_stop": {"latitude": END_LAT, "longitude": END_LNG},
        "origin_threshold": 50,
        "destination_threshold": 75,
        "segments": [
            {"VehicleRef": "WP-106", "on_route": true, "positions": [sample_json(0), sample_json(1)]},
            {"VehicleRef": "WP-107", "on_route": false, "positions": [sample_json(2)]},
        ]
    })
}

pub fn write_json(root: &Path, resource: &str, value: &Value) {
    let path = root.join(resource);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

/// Serves canned payloads; anything else is a 404.
#[derive(Default)]
pub struct MemoryDataSource {
    documents: HashMap<String, Result<Vec<u8>, u16>>,
}

impl MemoryDataSource {
    pub fn with(mut self, resource: &str, body: impl Into<Vec<u8>>) -> Self {
        self.documents.insert(resource.to_owned(), Ok(body.into()));
        self
    }

    pub fn with_status(mut self, resource: &str, status: u16) -> Self {
        self.documents.insert(resource.to_owned(), Err(status));
        self
    }
}

impl DataSource for MemoryDataSource {
    async fn fetch(&self, resource: &str) -> Result<Vec<u8>, ViewerError> {
        match self.documents.get(resource) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(ViewerError::FetchFailure {
                resource: resource.to_owned(),
                status: Some(*status),
                message: "canned failure".to_owned(),
            }),
            None => Err(ViewerError::FetchFailure {
                resource: resource.to_owned(),
                status: Some(404),
                message: "Not Found".to_owned(),
            }),
        }
    }
}
