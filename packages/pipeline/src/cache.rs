//! Caller-owned cache of whole pipeline reports.
//!
//! Nothing inside the stages caches. A [`PipelineCache`] holds at most one
//! report per config id, tagged with a SHA-256 fingerprint of the
//! serialized config, the bytes of every local input file, and the
//! config's optional `cache_key`. A changed fingerprint replaces the
//! entry. Remote inputs are not hashed; bump `cache_key` (for example to a
//! data release date) to force a refresh.

use std::collections::BTreeMap;
use std::sync::Arc;

use seoul_transit_source::progress::ProgressCallback;
use seoul_transit_source_models::{PipelineConfig, SourceLocation};
use sha2::{Digest, Sha256};

use crate::{PipelineError, PipelineReport, run_pipeline};

/// A report together with the fingerprint it was computed under.
#[derive(Debug)]
struct CacheEntry {
    fingerprint: String,
    report: Arc<PipelineReport>,
}

/// Memoized pipeline reports keyed by config id.
#[derive(Debug, Default)]
pub struct PipelineCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl PipelineCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Returns the cached report for `config`, running the pipeline on a
    /// miss. A miss replaces any stale report for the same config id.
    /// Failed runs are not cached and leave the stale entry in place.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the pipeline fails on a miss.
    pub fn get_or_run(
        &mut self,
        config: &PipelineConfig,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<Arc<PipelineReport>, PipelineError> {
        let key = fingerprint(config);

        if let Some(entry) = self.entries.get(&config.id)
            && entry.fingerprint == key
        {
            log::info!("Cache hit for '{}' ({})", config.id, &key[..12]);
            return Ok(Arc::clone(&entry.report));
        }

        log::debug!("Cache miss for '{}' ({})", config.id, &key[..12]);
        let report = Arc::new(run_pipeline(config, progress)?);
        self.entries.insert(
            config.id.clone(),
            CacheEntry {
                fingerprint: key,
                report: Arc::clone(&report),
            },
        );
        Ok(report)
    }

    /// Drops every cached report.
    pub fn invalidate(&mut self) {
        log::debug!("Invalidating {} cached reports", self.entries.len());
        self.entries.clear();
    }

    /// Number of cached reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Computes the hex SHA-256 fingerprint of a config and its local inputs.
///
/// A local file that cannot be read hashes as a fixed marker, so the key
/// changes once the file appears.
#[must_use]
pub fn fingerprint(config: &PipelineConfig) -> String {
    let mut hasher = Sha256::new();

    // PipelineConfig contains only strings, numbers, and enums, which
    // always serialize.
    hasher.update(serde_json::to_vec(config).unwrap_or_default());

    for location in config.locations() {
        hasher.update(location.to_string().as_bytes());
        if let SourceLocation::Path { path } = location {
            match std::fs::read(path) {
                Ok(bytes) => {
                    hasher.update((bytes.len() as u64).to_le_bytes());
                    hasher.update(&bytes);
                }
                Err(_) => hasher.update(b"\0missing"),
            }
        }
    }

    if let Some(cache_key) = &config.cache_key {
        hasher.update(cache_key.as_bytes());
    }

    hex::encode(hasher.finalize())
}
