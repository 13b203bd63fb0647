use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::client::{JobIdSource, MetadataClient};
use crate::clock::{Clock, SystemClock};
use crate::config::MetadataConfig;
use crate::error::Result;
use crate::memoize::Memoized;

type Lookup = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// Cached accessor for the ID of the job this process belongs to.
///
/// The first [`job_id`](Self::job_id) call asks the source; the answer
/// (including "no job ID") is then served for `ttl`. Concurrent callers
/// that hit an empty or expired cache share a single lookup.
///
/// Clone is a cheap Arc refcount bump; clones share one cache.
#[derive(Clone)]
pub struct JobMetadata {
    cache: Arc<Memoized<Option<String>, Lookup>>,
}

impl JobMetadata {
    /// Build an accessor backed by the metadata server described by `config`.
    pub fn create(config: &MetadataConfig) -> Result<Self> {
        let client = MetadataClient::new(config)?;
        Ok(Self::new(client, config.ttl()))
    }

    pub fn new(source: impl JobIdSource + 'static, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: impl JobIdSource + 'static,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let lookup: Lookup = Box::new(move || lookup_job_id(&source));
        Self {
            cache: Arc::new(Memoized::with_clock(lookup, ttl, clock)),
        }
    }

    /// Current job ID, or `None` when it is unknown.
    ///
    /// Never fails: lookup errors are logged and reported as `None`, and
    /// that `None` is cached like any other answer.
    pub fn job_id(&self) -> Option<String> {
        self.cache.get()
    }

    /// Forget the cached answer so the next call asks the source again.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    pub fn ttl(&self) -> Duration {
        self.cache.ttl()
    }

    /// How long ago the cached answer was looked up.
    pub fn age(&self) -> Option<Duration> {
        self.cache.age()
    }
}

fn lookup_job_id(source: &impl JobIdSource) -> Option<String> {
    match source.fetch_job_id() {
        Ok(raw) => {
            let job_id = normalize(&raw);
            debug!(job_id = job_id.as_deref().unwrap_or("<none>"), "job id refreshed");
            job_id
        }
        Err(e) => {
            warn!(error = %e, "job id lookup failed, treating as unknown");
            None
        }
    }
}

fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
