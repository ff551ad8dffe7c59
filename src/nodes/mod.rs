//! The node implementations behind each graph role.
//!
//! - [`SourceNode`]: graph entry point, queues externally pushed frames
//! - [`ConvertNode`]: implicit rate/layout normalizer inserted at build
//! - [`MixerNode`]: gain + sum + dropout fade-out
//! - [`SinkNode`]: graph exit point, queues finished frames

mod convert;
mod mixer;
mod sink;
mod source;

pub use convert::ConvertNode;
pub use mixer::{MixerNode, DROPOUT_TRANSITION_FRAMES};
pub use sink::SinkNode;
pub use source::{SourceNode, SOURCE_QUEUE_FRAMES};
