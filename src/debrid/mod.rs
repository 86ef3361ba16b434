//! Debrid service integration (Real-Debrid compatible REST API).

mod client;
mod types;

pub use client::{classify_file_listing, classify_torrent_status, video_file_ids, DebridClient};
pub use types::*;
