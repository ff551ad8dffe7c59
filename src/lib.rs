//! mischt - a push/pull PCM mixing graph.
//!
//! Design principles:
//! - The graph is described as data and validated before any node exists
//! - Formats are negotiated at build time; converters are inserted, not
//!   demanded of the caller
//! - Every operation is non-blocking: "not now" is a status
//!   ([`PushStatus::Rejected`], [`Pull::NotReady`]), never a blocked call
//! - Errors are values returned to the driver; the library never exits
//!
//! # Example
//!
//! ```
//! use mischt::{Frame, FrameShape, GraphSpec, Pull};
//!
//! let shape = FrameShape::s16(44100, 1, 1152);
//! let mut graph = GraphSpec::mix(&[shape, shape], &[5.0, 15.0], 3, shape)
//!     .build()
//!     .unwrap();
//!
//! let frame = Frame::allocate(shape);
//! graph.push(0, frame.clone()).unwrap();
//! graph.push(1, frame).unwrap();
//!
//! match graph.pull() {
//!     Pull::Frame(mixed) => drop(mixed),
//!     Pull::NotReady => {} // push more first
//!     Pull::Ended => unreachable!(),
//! }
//! ```

mod error;
mod frame;
mod graph;
mod node;
pub mod nodes;
mod pump;

pub use error::{BuildError, RuntimeError};
pub use frame::{Frame, FrameShape, SampleFormat};
pub use graph::{EdgeSpec, GraphSpec, MixGraph, NodeSpec, RoleSpec, FRAME_LEN, MAX_STREAMS};
pub use node::{Pull, PushStatus};
pub use nodes::DROPOUT_TRANSITION_FRAMES;
pub use pump::{Pump, PumpReport, PumpState};
