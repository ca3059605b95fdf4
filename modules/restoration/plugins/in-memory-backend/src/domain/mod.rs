//! Domain layer for the in-memory restoration service.

pub mod client;
pub mod connector;
pub mod service;

pub use client::CallerBound;
pub use connector::InMemoryConnector;
pub use service::Service;
