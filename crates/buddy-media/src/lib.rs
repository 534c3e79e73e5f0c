//! # buddy-media
//!
//! Turns chat attachments into inline images a vision model can read:
//! classification, media-group aggregation, GIF and video frame sampling.

pub mod classify;
pub mod frames;
pub mod gif;
pub mod group;
pub mod materialize;
pub mod sniff;

pub use classify::{extract_media_items, has_supported_media, MediaDescriptor, MediaKind};
pub use frames::{FfmpegExtractor, FrameExtractor};
pub use group::MediaGroupCache;
pub use materialize::{Materializer, MediaLimits};

#[cfg(test)]
pub(crate) mod test_support;
