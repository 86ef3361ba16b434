//! Debridflow-Common: Shared types and path utilities.
//!
//! - **Core Types**: the release [`Category`] that decides which PVR and
//!   library folder a download belongs to
//! - **Path Utilities**: functions to detect file types by extension
//!
//! # Examples
//!
//! ```
//! use debridflow_common::Category;
//! use debridflow_common::paths::is_video_file;
//! use std::path::Path;
//!
//! assert_eq!(Category::Movie.pvr_name(), "radarr");
//! assert!(is_video_file(Path::new("movie.mkv")));
//! ```

pub mod paths;
pub mod types;

pub use types::*;
