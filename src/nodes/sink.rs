//! Sink node - exposes finished frames for retrieval.

use std::collections::VecDeque;

use crate::frame::{Frame, FrameShape};
use crate::node::Pull;

/// Graph exit point: a FIFO of mixed frames at the target shape.
///
/// `pull` distinguishes "nothing buffered *yet*" ([`Pull::NotReady`])
/// from "nothing will ever come again" ([`Pull::Ended`]); queued frames
/// are always delivered before the ended status is reported.
#[derive(Debug)]
pub struct SinkNode {
    target: FrameShape,
    queue: VecDeque<Frame>,
    ended: bool,
}

impl SinkNode {
    pub(crate) fn new(target: FrameShape) -> Self {
        Self {
            target,
            queue: VecDeque::new(),
            ended: false,
        }
    }

    #[inline]
    pub(crate) fn target(&self) -> FrameShape {
        self.target
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) {
        self.queue.push_back(frame);
    }

    pub(crate) fn mark_ended(&mut self) {
        self.ended = true;
    }

    pub(crate) fn pull(&mut self) -> Pull {
        match self.queue.pop_front() {
            Some(frame) => Pull::Frame(frame),
            None if self.ended => Pull::Ended,
            None => Pull::NotReady,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_queue_before_reporting_ended() {
        let target = FrameShape::s16(44100, 2, 4);
        let mut sink = SinkNode::new(target);
        assert!(matches!(sink.pull(), Pull::NotReady));

        sink.push_frame(Frame::allocate(target));
        sink.mark_ended();
        assert!(matches!(sink.pull(), Pull::Frame(_)));
        assert!(sink.pull().is_ended());
        assert!(sink.pull().is_ended());
    }
}
