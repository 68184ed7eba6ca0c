//! Extractors guarding the HTTP surface.

pub mod auth;

pub use auth::{Publisher, SubscriberUser};
