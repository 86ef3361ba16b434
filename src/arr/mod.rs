//! Sonarr / Radarr integration.

mod client;

pub use client::*;
