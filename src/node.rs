//! Node statuses and the heterogeneous node storage type.

use crate::frame::Frame;
use crate::nodes::{ConvertNode, MixerNode, SinkNode, SourceNode};

/// Result of pushing a frame into a source node.
///
/// `Rejected` is backpressure, not an error: the node's bounded queue is
/// momentarily full and the caller must drain the sink before retrying.
/// The frame travels back with the status so the retry needs no copy.
#[derive(Debug)]
pub enum PushStatus {
    /// The node took ownership of the frame.
    Accepted,
    /// Queue full - here's your frame back, drain and retry.
    Rejected(Frame),
}

impl PushStatus {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, PushStatus::Accepted)
    }
}

/// Result of pulling from the sink.
#[derive(Debug)]
pub enum Pull {
    /// A finished output frame, owned by the caller.
    Frame(Frame),
    /// Not enough buffered input to emit a frame yet. Push more and retry.
    NotReady,
    /// Terminal: no input can ever produce another output frame.
    Ended,
}

impl Pull {
    #[inline]
    pub fn is_ended(&self) -> bool {
        matches!(self, Pull::Ended)
    }
}

/// All node roles, stored as one enum so the graph arena stays homogeneous.
#[derive(Debug)]
pub(crate) enum NodeKind {
    Source(SourceNode),
    Convert(ConvertNode),
    Mixer(MixerNode),
    Sink(SinkNode),
}

impl NodeKind {
    pub(crate) fn role_name(&self) -> &'static str {
        match self {
            NodeKind::Source(_) => "source",
            NodeKind::Convert(_) => "convert",
            NodeKind::Mixer(_) => "mixer",
            NodeKind::Sink(_) => "sink",
        }
    }
}
