//! Media file probing module.
//!
//! Probing is split in two halves: running ffprobe, and turning its JSON into
//! [`StreamDescriptor`]s. The second half is a pure transform so the decision
//! engine can be exercised without any media files.

mod ffprobe;
mod types;

pub use ffprobe::{parse_ffprobe_json, probe_with_ffprobe};
pub use types::*;
