//! Time-bounded cache for the ID of the job running this process.
//!
//! Data-processing workers tag records and diagnostics with the ID of the
//! job that owns them. On GCE that ID lives in the instance metadata
//! server, which is too slow to ask on every record. [`JobMetadata`] asks
//! once, serves the answer for a TTL (five minutes by default) and then
//! asks again on the next access.
//!
//! # Example
//! ```no_run
//! # fn example() -> job_metadata::Result<()> {
//! use job_metadata::{JobMetadata, MetadataConfig};
//!
//! let metadata = JobMetadata::create(&MetadataConfig::from_env()?)?;
//! match metadata.job_id() {
//!     Some(id) => println!("running as job {id}"),
//!     None => println!("not running under a managed job"),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod clock;
mod config;
mod error;
mod job;
mod memoize;

pub use client::{JobIdSource, MetadataClient};
pub use clock::{Clock, SystemClock};
pub use config::{
    DEFAULT_JOB_ID_ATTRIBUTE, DEFAULT_METADATA_HOST, ENV_METADATA_HOST, ENV_TIMEOUT_MS,
    ENV_TTL_SECS, MetadataConfig,
};
pub use error::{MetadataError, Result};
pub use job::JobMetadata;
pub use memoize::Memoized;
