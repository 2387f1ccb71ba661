//! Client for the external analysis service.
//!
//! Builds the scan payload from a pillar bundle, submits it as an
//! assistants-style run, and reads the scored report back once the run
//! completes.

pub mod client;
pub mod error;
pub mod output;
pub mod payload;
pub(crate) mod retry;
pub mod types;

pub use client::AnalysisClient;
pub use error::AnalysisError;
pub use output::parse_output;
pub use payload::{AnalysisPayload, DataSources};
pub use types::RunStatus;
