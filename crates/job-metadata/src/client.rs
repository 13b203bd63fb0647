//! Blocking client for the GCE instance metadata server.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::MetadataConfig;
use crate::error::{MetadataError, Result};

const ATTRIBUTES_PATH: &str = "/computeMetadata/v1/instance/attributes";

/// Produces the current job ID. An empty string means "no job ID here".
pub trait JobIdSource: Send + Sync {
    fn fetch_job_id(&self) -> Result<String>;
}

impl<F> JobIdSource for F
where
    F: Fn() -> Result<String> + Send + Sync,
{
    fn fetch_job_id(&self) -> Result<String> {
        self()
    }
}

/// Metadata server client. Clone is a cheap Arc refcount bump.
#[derive(Clone)]
pub struct MetadataClient {
    inner: Arc<Inner>,
}

struct Inner {
    agent: ureq::Agent,
    base_url: String,
    attribute: String,
}

impl MetadataClient {
    pub fn new(config: &MetadataConfig) -> Result<Self> {
        config.validate()?;

        // The metadata server is link-local; never route it through a proxy.
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .proxy(None)
            .build()
            .new_agent();

        let base_url = format!("http://{}{ATTRIBUTES_PATH}", config.metadata_host);

        info!(
            base_url = %base_url,
            attribute = %config.attribute,
            "metadata client initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                agent,
                base_url,
                attribute: config.attribute.clone(),
            }),
        })
    }

    /// Fetch a custom instance attribute.
    ///
    /// Returns an empty string when the attribute is not set (HTTP 404).
    pub fn fetch_attribute(&self, key: &str) -> Result<String> {
        let url = format!("{}/{key}", self.inner.base_url);

        let mut resp = match self
            .inner
            .agent
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .call()
        {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(404)) => {
                debug!(key, "metadata attribute not set");
                return Ok(String::new());
            }
            Err(ureq::Error::StatusCode(code)) => return Err(MetadataError::Status(code)),
            Err(e) => return Err(MetadataError::Http(format!("GET {url}: {e}"))),
        };

        resp.body_mut()
            .read_to_string()
            .map_err(|e| MetadataError::Http(format!("read {url}: {e}")))
    }

    pub fn attribute(&self) -> &str {
        &self.inner.attribute
    }
}

impl JobIdSource for MetadataClient {
    fn fetch_job_id(&self) -> Result<String> {
        self.fetch_attribute(&self.inner.attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_sources() {
        let source = || Ok::<_, MetadataError>("job-123".to_string());
        assert_eq!(source.fetch_job_id().unwrap(), "job-123");
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = MetadataConfig {
            timeout_ms: 0,
            ..MetadataConfig::default()
        };
        assert!(matches!(
            MetadataClient::new(&config),
            Err(MetadataError::Config(_))
        ));
    }

    #[test]
    fn base_url_targets_instance_attributes() {
        let config = MetadataConfig {
            metadata_host: "10.0.0.1:8080".into(),
            ..MetadataConfig::default()
        };
        let client = MetadataClient::new(&config).unwrap();
        assert_eq!(
            client.inner.base_url,
            "http://10.0.0.1:8080/computeMetadata/v1/instance/attributes"
        );
        assert_eq!(client.attribute(), "job_id");
    }

    #[test]
    fn unreachable_server_is_an_error() {
        // Port 9 (discard) on loopback is closed on any sane test host.
        let config = MetadataConfig {
            metadata_host: "127.0.0.1:9".into(),
            timeout_ms: 500,
            ..MetadataConfig::default()
        };
        let client = MetadataClient::new(&config).unwrap();
        assert!(matches!(
            client.fetch_job_id(),
            Err(MetadataError::Http(_))
        ));
    }
}
