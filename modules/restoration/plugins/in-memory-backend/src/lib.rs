//! In-memory restoration service.
//!
//! Stands in for the remote service in development and tests. A single
//! [`Service`] holds all state; [`InMemoryConnector`] hands out handles bound
//! to one caller each, so authorization decisions see the right principal.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;

pub use config::InMemoryBackendConfig;
pub use domain::{CallerBound, InMemoryConnector, Service};
