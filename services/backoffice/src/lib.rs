//! Back-office service library crate.
//!
//! # Purpose
//! Exposes the roles and profile-mapping API, the daily business-key
//! allocator, configuration, and storage backends for use by the binary and
//! tests.
pub mod api;
pub mod app;
pub mod clock;
pub mod config;
pub mod model;
pub mod observability;
pub mod sequence;
pub mod store;
