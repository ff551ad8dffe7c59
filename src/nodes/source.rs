//! Source node - accepts externally supplied frames.

use std::collections::VecDeque;

use crate::error::RuntimeError;
use crate::frame::{Frame, FrameShape};
use crate::node::PushStatus;

/// Frames a source queues before pushes start bouncing.
pub const SOURCE_QUEUE_FRAMES: usize = 4;

/// Graph entry point: a bounded FIFO of frames waiting to be mixed.
///
/// The declared shape is fixed at construction and every pushed frame
/// must match it exactly. A full queue answers with
/// [`PushStatus::Rejected`] - backpressure, not failure - and the caller
/// gets the frame back to retry after draining the sink.
#[derive(Debug)]
pub struct SourceNode {
    shape: FrameShape,
    queue: VecDeque<Frame>,
    capacity: usize,
    ended: bool,
}

impl SourceNode {
    pub(crate) fn new(shape: FrameShape) -> Self {
        Self {
            shape,
            queue: VecDeque::with_capacity(SOURCE_QUEUE_FRAMES),
            capacity: SOURCE_QUEUE_FRAMES,
            ended: false,
        }
    }

    #[inline]
    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    /// Queue a frame. Never blocks; a full queue returns the frame with
    /// `Rejected`. Pushing after end-of-data or with a mismatched shape
    /// is a caller bug and reported as a runtime error.
    pub(crate) fn push(&mut self, frame: Frame) -> Result<PushStatus, RuntimeError> {
        if self.ended {
            return Err(RuntimeError::PushAfterEnd);
        }
        if frame.shape() != self.shape {
            return Err(RuntimeError::ShapeMismatch {
                expected: self.shape,
                got: frame.shape(),
            });
        }
        if self.queue.len() >= self.capacity {
            return Ok(PushStatus::Rejected(frame));
        }
        self.queue.push_back(frame);
        Ok(PushStatus::Accepted)
    }

    /// Mark the external stream behind this source as exhausted.
    pub(crate) fn mark_ended(&mut self) {
        self.ended = true;
    }

    #[inline]
    pub(crate) fn is_ended(&self) -> bool {
        self.ended
    }

    pub(crate) fn pop_frame(&mut self) -> Option<Frame> {
        self.queue.pop_front()
    }

    #[inline]
    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }
}
