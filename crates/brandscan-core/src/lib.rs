//! Domain model for brand health scans.
//!
//! Holds the request and result types, the cache fingerprint, the eight-pillar
//! data model with its aggregator, the analysis job state machine, and the
//! environment-driven application configuration.

pub mod app_config;
pub mod config;
pub mod fingerprint;
pub mod job;
pub mod pillars;
pub mod request;
pub mod sources;

use thiserror::Error;

pub use app_config::{AnalysisMode, AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use fingerprint::{fingerprint, normalize_brand_name, registrable_domain};
pub use job::{JobEvent, JobHandle, JobState, JobStatus, PillarScores, ScanResult, Transition};
pub use pillars::{aggregate, parse_follower_count, PillarBundle};
pub use request::{Platform, ScanRequest, SocialHandles};
pub use sources::{CollaboratorResult, CollectedSources, SourceOutcome};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid scan request: {0}")]
    InvalidRequest(String),

    #[error("invalid website URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}
