use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::cache::MedicationCache;
use super::merge::{absorb, is_complete};
use super::sources::{build_sources, ExternalSourceClient};
use crate::config::EnrichmentConfig;
use crate::error::Result;
use crate::models::{MedicationCandidate, MedicationInfo};

/// How a candidate's record was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    FromCache(MedicationInfo),
    /// At least one source contributed a field.
    Enriched(MedicationInfo),
    /// Every source failed or had no answer.
    Fallback(MedicationInfo),
}

impl Resolution {
    pub fn info(&self) -> &MedicationInfo {
        match self {
            Self::FromCache(info) | Self::Enriched(info) | Self::Fallback(info) => info,
        }
    }

    pub fn into_info(self) -> MedicationInfo {
        match self {
            Self::FromCache(info) | Self::Enriched(info) | Self::Fallback(info) => info,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::FromCache(_))
    }
}

/// Resolves candidates against an ordered list of external sources, with a
/// TTL cache in front. Cloning shares the cache.
#[derive(Clone)]
pub struct EnrichmentService {
    sources: Vec<Arc<dyn ExternalSourceClient>>,
    cache: MedicationCache,
    ttl: Duration,
    source_timeout: Duration,
    concurrency: usize,
}

impl EnrichmentService {
    pub fn new(
        sources: Vec<Arc<dyn ExternalSourceClient>>,
        cache: MedicationCache,
        config: &EnrichmentConfig,
    ) -> Self {
        Self {
            sources,
            cache,
            ttl: Duration::from_secs(config.cache_ttl_secs),
            source_timeout: Duration::from_secs(config.timeout_secs),
            concurrency: config.concurrency.max(1),
        }
    }

    /// Production wiring: HTTP clients for the configured sources.
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self> {
        let sources = build_sources(config)?;
        let cache = MedicationCache::new(config.cache_size);
        Ok(Self::new(sources, cache, config))
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache(&self) -> &MedicationCache {
        &self.cache
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id().to_string()).collect()
    }

    /// Resolve one candidate. Always terminates with a record named after
    /// the candidate; source failures never escape.
    pub async fn enrich(&self, candidate: &MedicationCandidate) -> Resolution {
        let key = candidate.key();
        let name = candidate.corrected_name.as_str();

        if let Some(mut cached) = self.cache.get(&key) {
            debug!(medication = %name, "Enrichment cache hit");
            cached.name = name.to_string();
            return Resolution::FromCache(cached);
        }

        let mut info = MedicationInfo::fallback(name);

        for source in &self.sources {
            match tokio::time::timeout(self.source_timeout, source.lookup(name)).await {
                Ok(Ok(Some(record))) => {
                    if absorb(&mut info, record) {
                        debug!(medication = %name, source = source.id(), "Source contributed fields");
                    }
                    if is_complete(&info) {
                        break;
                    }
                }
                Ok(Ok(None)) => {
                    debug!(medication = %name, source = source.id(), "Source has no match");
                }
                Ok(Err(e)) => {
                    warn!(medication = %name, source = source.id(), error = %e, "Source unavailable");
                }
                Err(_) => {
                    warn!(
                        medication = %name,
                        source = source.id(),
                        timeout_ms = self.source_timeout.as_millis() as u64,
                        "Source timed out"
                    );
                }
            }
        }

        self.cache.put(key, info.clone(), self.ttl);

        if info.sources.is_empty() {
            Resolution::Fallback(info)
        } else {
            Resolution::Enriched(info)
        }
    }

    /// Resolve candidates concurrently; results keep candidate order.
    pub async fn enrich_all(&self, candidates: &[MedicationCandidate]) -> Vec<MedicationInfo> {
        stream::iter(candidates.iter().cloned())
            .map(|candidate| {
                let service = self.clone();
                async move { service.enrich(&candidate).await.into_info() }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
