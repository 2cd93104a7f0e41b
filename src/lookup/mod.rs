mod response;
mod transport;

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::collector::FileRecord;
use crate::error::ScanResult;

pub use response::{LookupResult, parse_results};
pub use transport::{HttpTransport, RetryPolicy, Transport};

pub const DEFAULT_ENDPOINT: &str = "https://www.virustotal.com/vtapi/v2/file/report";

#[derive(Debug, Clone)]
pub struct LookupSettings {
    pub endpoint: String,
    pub api_key: String,
}

impl LookupSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Unique SHA-256 digests in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestSet {
    digests: Vec<String>,
}

impl DigestSet {
    pub fn from_records(records: &[FileRecord]) -> Self {
        let mut seen = HashSet::new();
        let digests = records
            .iter()
            .map(|record| record.sha256.to_ascii_lowercase())
            .filter(|digest| seen.insert(digest.clone()))
            .collect();
        Self { digests }
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.digests.iter().map(String::as_str)
    }

    /// The `resource` form field.
    pub fn joined(&self) -> String {
        self.digests.join(",")
    }
}

/// A verdict together with every local path that has its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub paths: Vec<PathBuf>,
    #[serde(flatten)]
    pub result: LookupResult,
}

pub struct LookupClient<T: Transport> {
    settings: LookupSettings,
    transport: T,
}

impl<T: Transport> LookupClient<T> {
    pub fn new(settings: LookupSettings, transport: T) -> Self {
        Self {
            settings,
            transport,
        }
    }

    pub fn settings(&self) -> &LookupSettings {
        &self.settings
    }

    /// Queries every unique digest in a single request.
    pub fn lookup(&self, records: &[FileRecord]) -> ScanResult<Vec<ReportEntry>> {
        let digests = DigestSet::from_records(records);
        if digests.is_empty() {
            log::info!("nothing to look up");
            return Ok(Vec::new());
        }
        log::debug!(
            "querying {} unique digest(s) for {} file(s)",
            digests.len(),
            records.len()
        );
        let resource = digests.joined();
        let body = self.transport.post_form(
            &self.settings.endpoint,
            &[
                ("resource", resource.as_str()),
                ("apikey", self.settings.api_key.as_str()),
            ],
        )?;
        let results = parse_results(&body)?;
        log::debug!("service returned {} result(s)", results.len());
        Ok(remap(records, &digests, results))
    }
}

/// Pairs each result with its paths. Queried digests the service left out
/// are reported as not found; results for digests nobody asked about are
/// dropped.
pub fn remap(
    records: &[FileRecord],
    digests: &DigestSet,
    results: Vec<LookupResult>,
) -> Vec<ReportEntry> {
    let mut answered = HashSet::new();
    let mut entries = Vec::with_capacity(digests.len());
    for result in results {
        let paths = paths_for(records, &result.digest);
        if paths.is_empty() {
            log::warn!("ignoring result for unrequested digest {}", result.digest);
            continue;
        }
        if !answered.insert(result.digest.to_ascii_lowercase()) {
            log::warn!("ignoring duplicate result for {}", result.digest);
            continue;
        }
        entries.push(ReportEntry { paths, result });
    }
    for digest in digests.iter().filter(|digest| !answered.contains(*digest)) {
        log::debug!("{} missing from response, reporting as not found", digest);
        entries.push(ReportEntry {
            paths: paths_for(records, digest),
            result: LookupResult::not_found(digest),
        });
    }
    entries
}

fn paths_for(records: &[FileRecord], digest: &str) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for record in records {
        if record.sha256.eq_ignore_ascii_case(digest) && !paths.contains(&record.path) {
            paths.push(record.path.clone());
        }
    }
    paths
}
