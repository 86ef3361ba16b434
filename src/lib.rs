//! debridflow - debrid to library automation
//!
//! This library crate exposes the core functionality for integration testing.

pub mod arr;
pub mod config;
pub mod debrid;
pub mod download;
pub mod handoff;
pub mod notifications;
pub mod pipeline;
pub mod poll;
pub mod upload;
