//! One adapter per external source. Each returns a typed result and leaves
//! outcome classification to the collector.

pub mod feed;
pub mod hackernews;
pub mod https_probe;
pub mod rdap;
pub mod search;
pub mod social;
pub mod wayback;
pub mod website;
pub mod wikipedia;
