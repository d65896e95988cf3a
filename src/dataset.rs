/* Fetching the result documents a viewer is built from. Every required
document must arrive and parse before anything is drawn; the first failure
aborts setup as a whole.
*/

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::de::DeserializeOwned;

use crate::error::ViewerError;
use crate::model::{RowsDocument, SegmentDocument, StopTable};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatasetKey {
    /// `{FROM-STOP}-{TO-STOP}-{YYYY}-{MM}-{DD}`, from the query string.
    Segments(String),
    /// `{YYYY}-{MM}-{DD}`, from the fragment.
    Day(String),
}

impl DatasetKey {
    /// Derives the dataset from a page location such as
    /// `viewer.html#2019-03-20` or `segment-viewer.html?A-B-2019-03-20`.
    pub fn from_location(location: &str) -> Result<Self, ViewerError> {
        let (rest, fragment) = match location.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (location, None),
        };
        if let Some(day) = fragment.filter(|f| !f.is_empty()) {
            return Ok(DatasetKey::Day(day.to_owned()));
        }
        match rest.split_once('?') {
            Some((_, query)) if !query.is_empty() => Ok(DatasetKey::Segments(query.to_owned())),
            _ => Err(ViewerError::InvalidLocation(location.to_owned())),
        }
    }

    /// Documents that must all load, in order.
    pub fn resources(&self, prefix: &str) -> Vec<String> {
        match self {
            DatasetKey::Segments(name) => vec![format!("{prefix}/segments-{name}.json")],
            DatasetKey::Day(day) => vec![
                format!("{prefix}/rows-{day}.json"),
                format!("{prefix}/stops-{day}.json"),
            ],
        }
    }
}

/// A fully loaded dataset.
#[derive(Clone, Debug, PartialEq)]
pub enum Dataset {
    Segments(SegmentDocument),
    Combined { rows: RowsDocument, stops: StopTable },
}

impl Dataset {
    pub fn stops(&self) -> Option<&StopTable> {
        match self {
            Dataset::Segments(_) => None,
            Dataset::Combined { stops, .. } => Some(stops),
        }
    }
}

pub trait DataSource {
    fn fetch(&self, resource: &str) -> impl Future<Output = Result<Vec<u8>, ViewerError>>;
}

/// Reads documents from a local directory. A missing file reports as
/// status 404.
pub struct DirectoryDataSource {
    root: PathBuf,
}

impl DirectoryDataSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        DirectoryDataSource { root: root.into() }
    }
}

impl DataSource for DirectoryDataSource {
    async fn fetch(&self, resource: &str) -> Result<Vec<u8>, ViewerError> {
        let path = self.root.join(resource);
        std::fs::read(&path).map_err(|e| ViewerError::FetchFailure {
            resource: resource.to_owned(),
            status: (e.kind() == ErrorKind::NotFound).then_some(404),
            message: e.to_string(),
        })
    }
}

/// Fetches documents over HTTP relative to `base_url`. Needs a tokio
/// runtime.
pub struct HttpDataSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDataSource {
    pub fn new(base_url: &str) -> Self {
        HttpDataSource {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }
}

impl DataSource for HttpDataSource {
    async fn fetch(&self, resource: &str) -> Result<Vec<u8>, ViewerError> {
        let url = format!("{}/{}", self.base_url, resource);
        let transport = |e: reqwest::Error| ViewerError::FetchFailure {
            resource: resource.to_owned(),
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        };
        let response = self.client.get(&url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ViewerError::FetchFailure {
                resource: resource.to_owned(),
                status: Some(status.as_u16()),
                message: status.to_string(),
            });
        }
        Ok(response.bytes().await.map_err(transport)?.to_vec())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    Pending,
    Ready,
    Aborted,
}

/// Join-count gate over the required fetches: ready once every required
/// resource has signalled success, aborted for good on the first failure.
pub struct SetupGate {
    required: Vec<String>,
    received: HashMap<String, Vec<u8>>,
    failure: Option<ViewerError>,
}

impl SetupGate {
    pub fn new(required: Vec<String>) -> Self {
        SetupGate {
            required,
            received: HashMap::new(),
            failure: None,
        }
    }

    pub fn state(&self) -> GateState {
        if self.failure.is_some() {
            GateState::Aborted
        } else if self.required.iter().all(|r| self.received.contains_key(r)) {
            GateState::Ready
        } else {
            GateState::Pending
        }
    }

    pub fn signal(&mut self, resource: &str, result: Result<Vec<u8>, ViewerError>) -> GateState {
        if self.failure.is_some() {
            return GateState::Aborted;
        }
        if !self.required.iter().any(|r| r == resource) {
            warn!("ignoring unexpected resource {resource}");
            return self.state();
        }
        match result {
            Ok(bytes) => {
                debug!("{resource}: {} bytes", bytes.len());
                self.received.insert(resource.to_owned(), bytes);
            }
            Err(e) => {
                warn!("setup aborted: {e}");
                self.failure = Some(e);
            }
        }
        self.state()
    }

    /// The payloads once ready, or the failure that aborted setup.
    pub fn finish(mut self) -> Result<HashMap<String, Vec<u8>>, ViewerError> {
        if let Some(failure) = self.failure.take() {
            return Err(failure);
        }
        if let Some(missing) = self.required.iter().find(|r| !self.received.contains_key(*r)) {
            return Err(ViewerError::FetchFailure {
                resource: missing.clone(),
                status: None,
                message: "not fetched".to_owned(),
            });
        }
        Ok(self.received)
    }
}

fn parse<T: DeserializeOwned>(payloads: &HashMap<String, Vec<u8>>, resource: &str) -> Result<T, ViewerError> {
    let bytes = payloads
        .get(resource)
        .ok_or_else(|| ViewerError::FetchFailure {
            resource: resource.to_owned(),
            status: None,
            message: "not fetched".to_owned(),
        })?;
    serde_json::from_slice(bytes).map_err(|e| ViewerError::MalformedInput {
        resource: resource.to_owned(),
        message: e.to_string(),
    })
}

/// Fetches every document `key` needs concurrently and parses them.
pub async fn load<S: DataSource>(source: &S, key: &DatasetKey, prefix: &str) -> Result<Dataset, ViewerError> {
    let resources = key.resources(prefix);
    info!("loading {:?}", resources);
    let mut gate = SetupGate::new(resources.clone());

    let dataset = match key {
        DatasetKey::Segments(_) => {
            let segments = &resources[0];
            gate.signal(segments, source.fetch(segments).await);
            let payloads = gate.finish()?;
            let document: SegmentDocument = parse(&payloads, segments)?;
            info!("loaded {} segments", document.segments.len());
            Dataset::Segments(document)
        }
        DatasetKey::Day(_) => {
            let (rows, stops) = (&resources[0], &resources[1]);
            let (rows_result, stops_result) = tokio::join!(source.fetch(rows), source.fetch(stops));
            gate.signal(rows, rows_result);
            gate.signal(stops, stops_result);
            let payloads = gate.finish()?;
            let rows: RowsDocument = parse(&payloads, rows)?;
            let stops: StopTable = parse(&payloads, stops)?;
            info!("loaded {} rows and {} stops", rows.rows.len(), stops.stops.len());
            Dataset::Combined { rows, stops }
        }
    };
    Ok(dataset)
}

/// `load` driven to completion on the current thread. Only for sources
/// that do not need a runtime, such as `DirectoryDataSource`.
pub fn load_blocking<S: DataSource>(source: &S, key: &DatasetKey, prefix: &str) -> Result<Dataset, ViewerError> {
    pollster::block_on(load(source, key, prefix))
}
