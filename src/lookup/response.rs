use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Verdict for one queried digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupResult {
    pub digest: String,
    pub found: bool,
    pub positives: u32,
    pub total: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_date: Option<String>,
    pub signatures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LookupResult {
    pub fn not_found(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            found: false,
            positives: 0,
            total: 0,
            scan_date: None,
            signatures: Vec::new(),
            permalink: None,
            message: None,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.found && self.positives > 0
    }
}

#[derive(Debug, Deserialize)]
struct RawReport {
    resource: String,
    response_code: i64,
    #[serde(default)]
    positives: u32,
    #[serde(default)]
    total: u32,
    #[serde(default)]
    scan_date: Option<String>,
    #[serde(default)]
    scans: BTreeMap<String, RawScan>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    verbose_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawScan {
    #[serde(default)]
    result: Option<String>,
}

impl From<RawReport> for LookupResult {
    fn from(raw: RawReport) -> Self {
        if raw.response_code == 0 {
            let mut result = LookupResult::not_found(raw.resource);
            result.message = raw.verbose_msg;
            return result;
        }
        let signatures = raw
            .scans
            .into_values()
            .filter_map(|scan| scan.result)
            .filter(|result| !result.is_empty())
            .collect();
        Self {
            digest: raw.resource,
            found: true,
            positives: raw.positives,
            total: raw.total,
            scan_date: raw.scan_date,
            signatures,
            permalink: raw.permalink,
            message: raw.verbose_msg,
        }
    }
}

/// The service answers a one-digest query with a bare object and a
/// multi-digest query with an array; both become a list here.
pub fn parse_results(body: &str) -> Result<Vec<LookupResult>, serde_json::Error> {
    let value: Value = serde_json::from_str(body)?;
    let raw: Vec<RawReport> = match value {
        Value::Array(_) => serde_json::from_value(value)?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(raw.into_iter().map(LookupResult::from).collect())
}
