use std::path::Path;

use crate::collector::Collector;
use crate::config::ConfigError;
use crate::error::{ScanError, ScanResult};
use crate::lookup::{LookupClient, ReportEntry, Transport};

/// Collects every file first, then issues the single lookup.
pub struct Scanner<T: Transport> {
    collector: Collector,
    client: LookupClient<T>,
}

impl<T: Transport> Scanner<T> {
    pub fn new(collector: Collector, client: LookupClient<T>) -> Self {
        Self { collector, client }
    }

    pub fn run(&self, path: &Path) -> ScanResult<Vec<ReportEntry>> {
        if self.client.settings().api_key.trim().is_empty() {
            return Err(ConfigError::NoApiKey.into());
        }
        if !path.exists() {
            return Err(ScanError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let records = self.collector.collect(path)?;
        log::info!("hashed {} file(s) under {:?}", records.len(), path);
        self.client.lookup(&records)
    }
}
