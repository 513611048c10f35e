//! Boxcutter - MP4 to Annex-B extraction tool
//!
//! This library crate exposes the configuration layer for integration testing.

pub mod config;
