//! Build and runtime error values.
//!
//! Build errors are all fatal before any data flows; runtime errors are
//! fatal mid-run. Backpressure (`Rejected`, `NotReady`) is deliberately
//! *not* here - those are ordinary statuses on the push/pull surface.

use std::io;

use thiserror::Error;

use crate::frame::FrameShape;
use crate::graph::MAX_STREAMS;

/// A graph description that cannot be built. Construction is fail-fast:
/// any of these aborts the whole build and no partial graph exists.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("at most {MAX_STREAMS} input streams are supported, got {0}")]
    TooManyStreams(usize),
    #[error("graph has no source nodes")]
    NoSources,
    #[error("graph needs exactly one mixer")]
    NoMixer,
    #[error("graph has more than one mixer")]
    MultipleMixers,
    #[error("graph needs exactly one sink")]
    NoSink,
    #[error("graph has more than one sink")]
    MultipleSinks,
    #[error("duplicate node name {0:?}")]
    DuplicateName(String),
    #[error("edge references unknown node {0:?}")]
    UnknownNode(String),
    #[error("graph contains a cycle")]
    NotADag,
    #[error("node {0:?} has an edge that the node's role does not allow")]
    BadEdge(String),
    #[error("mixer declares {declared} inputs but {connected} are connected")]
    MixerArityMismatch { declared: usize, connected: usize },
    #[error("sink is not reachable from source {0:?}")]
    UnreachableSink(String),
    #[error("node {0:?} has a zero-valued shape field")]
    InvalidShape(String),
    #[error("node {0:?} does not share the graph's sample format")]
    FormatMismatch(String),
}

/// A failure while the graph is running. The pump loop has no retry or
/// recovery policy: any of these terminates the run, leaving whatever
/// output was already written.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("pushed frame shape {got} does not match declared {expected}")]
    ShapeMismatch {
        expected: FrameShape,
        got: FrameShape,
    },
    #[error("push on a source already past end-of-data")]
    PushAfterEnd,
    #[error("no input stream with index {0}")]
    NoSuchInput(usize),
    #[error("graph has {expected} inputs but {got} readers were supplied")]
    WrongInputCount { expected: usize, got: usize },
    #[error("graph rejected a frame and draining produced no output")]
    Stalled,
}
