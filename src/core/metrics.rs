use log::error;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

use crate::core::error::{LibraryError, LibraryResult};

/// Counters describing chapter traffic, exported in Prometheus text format
#[derive(Debug, Clone)]
pub struct LibraryMetrics {
    registry: Registry,
    /// Chapter bodies served to readers
    pub chapter_reads: IntCounter,
    /// Chapter bodies created or rewritten
    pub chapters_written: IntCounter,
    /// Compressed bytes sent to the blob store
    pub compressed_bytes_written: IntCounter,
    /// Body lookups answered from the cache
    pub cache_hits: IntCounter,
    /// Body lookups that went to the blob store
    pub cache_misses: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> LibraryResult<IntCounter> {
    let counter = IntCounter::new(name, help)
        .map_err(|e| LibraryError::DatabaseError(format!("metric {}: {}", name, e)))?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|e| LibraryError::DatabaseError(format!("metric {}: {}", name, e)))?;
    Ok(counter)
}

impl LibraryMetrics {
    pub fn new() -> LibraryResult<Self> {
        let registry = Registry::new();
        Ok(Self {
            chapter_reads: counter(&registry, "novel_chapter_reads_total", "Chapter bodies served")?,
            chapters_written: counter(
                &registry,
                "novel_chapters_written_total",
                "Chapter bodies created or updated",
            )?,
            compressed_bytes_written: counter(
                &registry,
                "novel_compressed_bytes_written_total",
                "Gzip bytes written to the blob store",
            )?,
            cache_hits: counter(&registry, "novel_chapter_cache_hits_total", "Chapter cache hits")?,
            cache_misses: counter(
                &registry,
                "novel_chapter_cache_misses_total",
                "Chapter cache misses",
            )?,
            registry,
        })
    }

    /// Render every registered metric in the Prometheus text exposition format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            error!("Failed to encode metrics: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
