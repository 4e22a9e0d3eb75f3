//! HTTP surface of the medication tracker.

pub mod config;
pub mod server;
