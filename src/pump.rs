//! The steady-state frame pump: read, push, drain, repeat.
//!
//! One iteration is atomic: a push phase (one frame per live input) and
//! a full drain of the sink. The sink must be drained to `NotReady`
//! before more input goes in, because a single push can surface zero,
//! one, or several output frames once conversion shifts frame
//! boundaries.

use std::io::{Read, Write};

use tracing::{debug, trace};

use crate::error::RuntimeError;
use crate::frame::{Frame, FrameShape};
use crate::graph::MixGraph;
use crate::node::{Pull, PushStatus};

/// Pump loop phase.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PumpState {
    /// Every input still has data.
    Running,
    /// At least one input has ended; finishing the remaining mix.
    Draining,
    /// Terminal.
    Done,
}

/// What a completed run moved: frames pushed per input, frames written.
#[derive(Clone, Debug)]
pub struct PumpReport {
    pub frames_in: Vec<u64>,
    pub frames_out: u64,
}

#[derive(Debug)]
struct StreamInput<R> {
    reader: R,
    shape: FrameShape,
    chunk: Vec<u8>,
    /// A frame the graph rejected, waiting to be retried - never dropped.
    pending: Option<Frame>,
    ended: bool,
    frames_in: u64,
}

/// Drives a [`MixGraph`] from per-input byte readers to an output byte
/// writer, consuming input in exact [`FrameShape::byte_size`] chunks.
///
/// A final read shorter than one chunk ends that input and its trailing
/// bytes are dropped - there is no partial-frame flush. Termination is
/// eager: as soon as *any* input ends, the loop makes one more drain
/// pass and stops, so the mix length follows the shortest stream.
#[derive(Debug)]
pub struct Pump<'g, R, W> {
    graph: &'g mut MixGraph,
    inputs: Vec<StreamInput<R>>,
    writer: W,
    state: PumpState,
    frames_out: u64,
}

impl<'g, R: Read, W: Write> Pump<'g, R, W> {
    /// Attach readers (one per graph input, in stream order) and a writer.
    pub fn new(graph: &'g mut MixGraph, readers: Vec<R>, writer: W) -> Result<Self, RuntimeError> {
        if readers.len() != graph.input_count() {
            return Err(RuntimeError::WrongInputCount {
                expected: graph.input_count(),
                got: readers.len(),
            });
        }
        let inputs = readers
            .into_iter()
            .enumerate()
            .map(|(i, reader)| {
                // input_count was just checked, every index resolves
                let shape = match graph.input_shape(i) {
                    Some(shape) => shape,
                    None => unreachable!(),
                };
                StreamInput {
                    reader,
                    shape,
                    chunk: vec![0; shape.byte_size()],
                    pending: None,
                    ended: false,
                    frames_in: 0,
                }
            })
            .collect();
        Ok(Self {
            graph,
            inputs,
            writer,
            state: PumpState::Running,
            frames_out: 0,
        })
    }

    #[inline]
    pub fn state(&self) -> PumpState {
        self.state
    }

    /// Run to completion.
    pub fn run(mut self) -> Result<PumpReport, RuntimeError> {
        while self.state != PumpState::Done {
            let pushed = self.push_phase()?;
            if self.state == PumpState::Draining {
                // Shortest stream wins: the whole mix stops with the
                // first ended input, so the still-live inputs get their
                // fade-out now rather than playing on.
                for stream in 0..self.inputs.len() {
                    if !self.inputs[stream].ended {
                        self.inputs[stream].ended = true;
                        self.inputs[stream].pending = None;
                        self.graph.end_input(stream)?;
                    }
                }
            }
            let before = self.frames_out;
            let sink_ended = self.drain()?;
            // One drain pass after the first end-of-data, then stop.
            if self.state == PumpState::Draining || sink_ended {
                self.state = PumpState::Done;
                debug!(frames_out = self.frames_out, "pump done");
            } else if !pushed && self.frames_out == before {
                // A full iteration moved nothing in or out; another one
                // would not either. Fail fast rather than spin.
                return Err(RuntimeError::Stalled);
            }
        }
        self.writer.flush()?;
        Ok(PumpReport {
            frames_in: self.inputs.iter().map(|i| i.frames_in).collect(),
            frames_out: self.frames_out,
        })
    }

    /// Offer one frame to each live input: a retried pending frame if one
    /// is waiting, otherwise the next chunk from the reader. Returns
    /// whether any push was accepted.
    fn push_phase(&mut self) -> Result<bool, RuntimeError> {
        let mut accepted_any = false;
        for stream in 0..self.inputs.len() {
            if self.inputs[stream].ended {
                continue;
            }
            let frame = match self.inputs[stream].pending.take() {
                Some(frame) => {
                    trace!(stream, "retrying rejected frame");
                    frame
                }
                None => {
                    let input = &mut self.inputs[stream];
                    let wanted = input.chunk.len();
                    let got = read_full(&mut input.reader, &mut input.chunk)?;
                    if got < wanted {
                        // Short trailing chunks are dropped, not flushed.
                        if got > 0 {
                            debug!(stream, bytes = got, "dropping short trailing chunk");
                        }
                        input.ended = true;
                        self.graph.end_input(stream)?;
                        if self.state == PumpState::Running {
                            self.state = PumpState::Draining;
                            debug!(stream, "entering draining state");
                        }
                        continue;
                    }
                    let mut frame = Frame::allocate(input.shape);
                    frame.copy_from_le_bytes(&input.chunk);
                    frame
                }
            };
            match self.graph.push(stream, frame)? {
                PushStatus::Accepted => {
                    self.inputs[stream].frames_in += 1;
                    accepted_any = true;
                }
                PushStatus::Rejected(frame) => {
                    // Backpressure: hold the frame and retry next
                    // iteration, after the drain phase has freed space.
                    trace!(stream, "push rejected, holding frame");
                    self.inputs[stream].pending = Some(frame);
                }
            }
        }
        Ok(accepted_any)
    }

    /// Pull until `NotReady` or `Ended`, writing every frame out.
    /// Returns whether the sink reported `Ended`.
    fn drain(&mut self) -> Result<bool, RuntimeError> {
        loop {
            match self.graph.pull() {
                Pull::Frame(frame) => {
                    self.writer.write_all(&frame.to_le_bytes())?;
                    self.frames_out += 1;
                }
                Pull::NotReady => return Ok(false),
                Pull::Ended => return Ok(true),
            }
        }
    }
}

/// Read until `buf` is full or the stream ends; returns bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
