//! Replay byte assembly
//!
//! A match arrives as numbered frame buffers. [`ReplayBytes`] concatenates them
//! into one logical byte sequence and maps offsets back to frames; the
//! [`Timeline`] maps offsets to elapsed match time.

mod frames;
mod timeline;

pub use frames::{Frame, FramePosition, FrameSpan, ReplayBytes};
pub use timeline::Timeline;
