use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// One numbered frame buffer as supplied by the extraction stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(index: u32, data: Vec<u8>) -> Self {
        Self { index, data }
    }
}

/// Where a frame sits in the logical byte sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSpan {
    pub index: u32,
    pub start: usize,
    pub len: usize,
}

impl FrameSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramePosition {
    pub frame_index: u32,
    pub offset: usize,
}

/// Concatenated frames of one match
///
/// Frame indices are kept as supplied: a missing frame leaves a gap in the
/// index sequence, never zero bytes in the data.
#[derive(Debug, Clone)]
pub struct ReplayBytes {
    bytes: Vec<u8>,
    spans: Vec<FrameSpan>,
}

impl ReplayBytes {
    pub fn from_frames(mut frames: Vec<Frame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::NoFrameData);
        }

        // Stable sort: among equal indices the first supplied buffer stays first
        frames.sort_by_key(|frame| frame.index);

        let total: usize = frames.iter().map(|f| f.data.len()).sum();
        if total == 0 {
            return Err(Error::NoFrameData);
        }

        let mut bytes = Vec::with_capacity(total);
        let mut spans: Vec<FrameSpan> = Vec::with_capacity(frames.len());
        for frame in frames {
            if spans.last().is_some_and(|last| last.index == frame.index) {
                warn!("Duplicate frame index {}, keeping the first", frame.index);
                continue;
            }
            spans.push(FrameSpan {
                index: frame.index,
                start: bytes.len(),
                len: frame.data.len(),
            });
            bytes.extend_from_slice(&frame.data);
        }

        debug!("Sequenced {} frames, {} bytes", spans.len(), bytes.len());
        Ok(Self { bytes, spans })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn spans(&self) -> &[FrameSpan] {
        &self.spans
    }

    /// Map a logical offset to its frame and intra-frame offset
    pub fn locate(&self, offset: usize) -> Option<FramePosition> {
        if offset >= self.bytes.len() {
            return None;
        }
        // Last span starting at or before `offset`; empty frames share a start with their successor
        let after = self.spans.partition_point(|span| span.start <= offset);
        let span = self.spans.get(after.checked_sub(1)?)?;
        Some(FramePosition {
            frame_index: span.index,
            offset: offset - span.start,
        })
    }

    /// Inverse of [`locate`](Self::locate)
    pub fn logical_offset(&self, position: FramePosition) -> Option<usize> {
        let span = self.span(position.frame_index)?;
        (position.offset < span.len).then_some(span.start + position.offset)
    }

    pub fn frame_bytes(&self, frame_index: u32) -> Option<&[u8]> {
        let span = self.span(frame_index)?;
        self.bytes.get(span.start..span.end())
    }

    /// Bytes of the lowest-numbered frame
    pub fn first_frame(&self) -> &[u8] {
        self.spans
            .first()
            .and_then(|span| self.bytes.get(span.start..span.end()))
            .unwrap_or_default()
    }

    fn span(&self, frame_index: u32) -> Option<&FrameSpan> {
        self.spans
            .binary_search_by_key(&frame_index, |span| span.index)
            .ok()
            .map(|i| &self.spans[i])
    }
}
