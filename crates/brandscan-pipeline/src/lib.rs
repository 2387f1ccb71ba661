//! Brand scan pipeline.
//!
//! Ties the collectors, the pillar aggregator and the analysis client to a
//! persistent job store, and delivers completion callbacks.

pub mod error;
pub mod notify;
pub mod pipeline;
pub mod store;

pub use error::{PipelineError, StoreError};
pub use notify::{Notification, Notifier};
pub use pipeline::{PipelineSettings, ScanPipeline};
pub use store::{CachedScan, JobRecord, MemoryStore, PgStore, ScanStore};
