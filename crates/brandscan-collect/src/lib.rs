//! Source collection for brand scans.
//!
//! A [`Collector`] fans out over every external source for one
//! [`brandscan_core::ScanRequest`]: the homepage and its feed, Wikipedia,
//! the Wayback Machine, RDAP, an HTTPS probe, Hacker News, six web searches,
//! and any social profiles supplied. All traffic goes through one
//! [`FetchClient`] with bounded retry, and every source settles to a
//! [`brandscan_core::CollaboratorResult`] rather than an error.

pub mod collector;
pub mod cookies;
pub mod endpoints;
pub mod error;
pub mod fetch;
pub(crate) mod html;
pub(crate) mod outcome;
pub(crate) mod retry;
pub mod sources;

pub use collector::{Collection, Collector, SourceReport};
pub use cookies::CookieJar;
pub use endpoints::SourceEndpoints;
pub use error::CollectError;
pub use fetch::{FetchClient, FetchOptions, FetchedPage};
