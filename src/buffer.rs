//! Per-object frame buffer sets.
//!
//! One [`FrameBufferSet`] holds every frame's vertex data for a single
//! object: `frame_count` zero-filled byte buffers of
//! `stride * vertex_count` bytes, indexed by position in the export's
//! frame sequence. Buffers are allocated once before traversal and
//! mutated in place; there is no incremental resize, a different frame
//! count or stride means a fresh allocation.

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// What to do with a `frame_offset == 1` write while visiting frame 0,
/// whose target frame index would be -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstFramePolicy {
    /// Discard the write. The slot reserved for "next frame's value"
    /// before the first frame simply keeps its zero fill.
    #[default]
    Drop,
    /// Redirect the write into frame 0's own buffer.
    Clamp,
    /// Redirect the write into the last frame's buffer. This reproduces
    /// the historical `ba[-1]` behavior of older exporters; it corrupts
    /// the last frame's slot unless the animation actually loops.
    Wrap,
}

impl FirstFramePolicy {
    /// Resolve the target frame for a write made while visiting `frame`
    /// with the given attribute frame offset. `None` means the write is
    /// dropped.
    pub fn target_frame(&self, frame: usize, frame_offset: u8, frame_count: usize) -> Option<usize> {
        let offset = frame_offset as usize;
        if frame >= offset {
            return Some(frame - offset);
        }
        match self {
            FirstFramePolicy::Drop => None,
            FirstFramePolicy::Clamp => Some(0),
            FirstFramePolicy::Wrap => frame_count.checked_sub(1),
        }
    }
}

/// Zero-initialized per-frame byte buffers for one object.
#[derive(Debug, Clone)]
pub struct FrameBufferSet {
    frames: Vec<Vec<u8>>,
    stride: usize,
    vertex_count: usize,
}

impl FrameBufferSet {
    /// Allocate `frame_count` zero-filled buffers of
    /// `stride * vertex_count` bytes.
    pub fn allocate(vertex_count: usize, frame_count: usize, stride: usize) -> Self {
        let frames = (0..frame_count)
            .map(|_| vec![0u8; stride * vertex_count])
            .collect();
        Self {
            frames,
            stride,
            vertex_count,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// One frame's buffer.
    pub fn frame(&self, index: usize) -> Result<&[u8]> {
        self.frames
            .get(index)
            .map(Vec::as_slice)
            .ok_or(Error::FrameOutOfBounds {
                index,
                count: self.frames.len(),
            })
    }

    /// Frame buffers in frame order.
    pub fn frames(&self) -> impl Iterator<Item = &[u8]> {
        self.frames.iter().map(Vec::as_slice)
    }

    /// Copy `bytes` into frame `frame` at `slot * stride + offset`.
    ///
    /// Every bound is checked; writing past an allocated buffer's end is
    /// a capacity error, never silently tolerated.
    pub fn write(&mut self, frame: usize, slot: usize, offset: usize, bytes: &[u8]) -> Result<()> {
        if slot >= self.vertex_count {
            return Err(Error::VertexOverflow {
                slot,
                vertex_count: self.vertex_count,
            });
        }
        if offset + bytes.len() > self.stride {
            return Err(Error::StrideOverflow {
                offset,
                len: bytes.len(),
                stride: self.stride,
            });
        }
        let count = self.frames.len();
        let buffer = self
            .frames
            .get_mut(frame)
            .ok_or(Error::FrameOutOfBounds {
                index: frame,
                count,
            })?;
        let start = slot * self.stride + offset;
        buffer[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_is_zero_filled() {
        let ba = FrameBufferSet::allocate(3, 2, 20);
        assert_eq!(ba.frame_count(), 2);
        assert_eq!(ba.vertex_count(), 3);
        assert_eq!(ba.stride(), 20);
        for frame in ba.frames() {
            assert_eq!(frame.len(), 60);
            assert!(frame.iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_write_places_bytes() {
        let mut ba = FrameBufferSet::allocate(3, 1, 20);
        ba.write(0, 1, 12, &[0xAA, 0xBB]).unwrap();
        let frame = ba.frame(0).unwrap();
        assert_eq!(&frame[32..34], &[0xAA, 0xBB]);
        // Neighbouring bytes stay zero.
        assert_eq!(frame[31], 0);
        assert_eq!(frame[34], 0);
    }

    #[test]
    fn test_write_bounds() {
        let mut ba = FrameBufferSet::allocate(3, 1, 20);
        assert!(matches!(
            ba.write(0, 3, 0, &[0]),
            Err(Error::VertexOverflow { .. })
        ));
        assert!(matches!(
            ba.write(0, 0, 18, &[0, 0, 0]),
            Err(Error::StrideOverflow { .. })
        ));
        assert!(matches!(
            ba.write(1, 0, 0, &[0]),
            Err(Error::FrameOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_first_frame_policy() {
        // Past frame 0 every policy behaves identically.
        for policy in [
            FirstFramePolicy::Drop,
            FirstFramePolicy::Clamp,
            FirstFramePolicy::Wrap,
        ] {
            assert_eq!(policy.target_frame(3, 0, 5), Some(3));
            assert_eq!(policy.target_frame(3, 1, 5), Some(2));
            assert_eq!(policy.target_frame(1, 1, 5), Some(0));
        }
        // At frame 0 they diverge.
        assert_eq!(FirstFramePolicy::Drop.target_frame(0, 1, 5), None);
        assert_eq!(FirstFramePolicy::Clamp.target_frame(0, 1, 5), Some(0));
        assert_eq!(FirstFramePolicy::Wrap.target_frame(0, 1, 5), Some(4));
        assert_eq!(FirstFramePolicy::Wrap.target_frame(0, 1, 0), None);
    }
}
