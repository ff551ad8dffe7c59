//! Mixer node - per-input gain, summation, and dropout fade-out.

use std::collections::VecDeque;

use itertools::izip;
use tracing::debug;

use crate::frame::{Frame, FrameShape};

/// Output frames over which an ended input's last contribution fades out.
pub const DROPOUT_TRANSITION_FRAMES: usize = 3;

/// How an input lane participates in the sum.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum LaneState {
    /// Contributing normally
    Live,
    /// Buffered data exhausted; last contribution fading over `frames_left` frames
    Fading { frames_left: usize },
    /// Permanently out of the mix
    Excluded,
}

/// One mixer input: gain, normalized sample buffer, dropout bookkeeping.
#[derive(Debug)]
struct Lane {
    /// Linear gain, converted from dB at construction
    gain: f32,
    /// Interleaved samples at the output shape, waiting to be mixed
    buf: VecDeque<i16>,
    /// Most recently mixed contribution (pre-gain), kept for the fade
    last: Vec<i16>,
    /// End-of-data signalled; the lane fades once `buf` runs dry
    no_more_input: bool,
    state: LaneState,
}

/// Combines K gain-scaled input lanes into one S16 output stream.
///
/// Mix duration tracks the *first* lane: once lane 0 has faded out, the
/// mixer is ended no matter how much data other lanes still hold. A lane
/// that reaches end-of-data keeps mixing its buffered full frames; after
/// that its last-known frame fades linearly to silence over
/// [`DROPOUT_TRANSITION_FRAMES`] output frames (sub-frame leftovers are
/// dropped) and the lane is permanently excluded. Live lanes continue
/// uninterrupted.
#[derive(Debug)]
pub struct MixerNode {
    out_shape: FrameShape,
    transition: usize,
    lanes: Vec<Lane>,
}

fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

impl MixerNode {
    pub(crate) fn new(gains_db: &[f32], transition: usize, out_shape: FrameShape) -> Self {
        Self {
            out_shape,
            transition,
            lanes: gains_db
                .iter()
                .map(|&db| Lane {
                    gain: db_to_linear(db),
                    buf: VecDeque::new(),
                    last: Vec::new(),
                    no_more_input: false,
                    state: LaneState::Live,
                })
                .collect(),
        }
    }

    /// Whether a lane has room for more normalized samples.
    ///
    /// Lanes hold at most two frames ahead; anything beyond stays queued
    /// in the source, which is what makes source backpressure real.
    pub(crate) fn wants_input(&self, lane: usize) -> bool {
        let lane = &self.lanes[lane];
        lane.state == LaneState::Live
            && !lane.no_more_input
            && lane.buf.len() < 2 * self.out_shape.samples_per_frame()
    }

    pub(crate) fn feed(&mut self, lane: usize, samples: &[i16]) {
        self.lanes[lane].buf.extend(samples.iter().copied());
    }

    /// Signal end-of-data on a lane. Already-buffered full frames are
    /// still mixed; the fade starts once the lane's buffer runs dry.
    pub(crate) fn input_ended(&mut self, lane: usize) {
        self.lanes[lane].no_more_input = true;
    }

    /// Terminal once lane 0 is fully excluded (duration = first).
    pub(crate) fn ended(&self) -> bool {
        self.lanes[0].state == LaneState::Excluded
            || self.lanes.iter().all(|l| l.state == LaneState::Excluded)
    }

    /// Move ended lanes whose buffers have run dry into their fade.
    fn settle(&mut self) {
        let needed = self.out_shape.samples_per_frame();
        let transition = self.transition;
        for lane in &mut self.lanes {
            if lane.state == LaneState::Live && lane.no_more_input && lane.buf.len() < needed {
                // No partial-frame flush: trailing samples are dropped.
                lane.buf.clear();
                lane.state = if transition == 0 {
                    LaneState::Excluded
                } else {
                    LaneState::Fading {
                        frames_left: transition,
                    }
                };
                debug!(transition, "mixer lane entered dropout fade");
            }
        }
    }

    /// A frame can be mixed once every live lane has a full frame of
    /// samples buffered. Fading lanes need no data; excluded lanes are
    /// skipped entirely.
    fn can_mix(&self) -> bool {
        let needed = self.out_shape.samples_per_frame();
        !self.ended()
            && self
                .lanes
                .iter()
                .all(|l| l.state != LaneState::Live || l.buf.len() >= needed)
    }

    /// Mix one output frame, or `None` if not enough input is buffered.
    pub(crate) fn mix_frame(&mut self) -> Option<Frame> {
        self.settle();
        if !self.can_mix() {
            return None;
        }
        let needed = self.out_shape.samples_per_frame();
        let transition = self.transition;
        let mut acc = vec![0f32; needed];

        for lane in &mut self.lanes {
            match lane.state {
                LaneState::Live => {
                    let taken: Vec<i16> = lane.buf.drain(..needed).collect();
                    izip!(&mut acc, &taken).for_each(|(a, &s)| *a += s as f32 * lane.gain);
                    lane.last = taken;
                }
                LaneState::Fading { frames_left } => {
                    // Stepped fade: 3/4, 2/4, 1/4 of the last frame, then out.
                    let fade = frames_left as f32 / (transition + 1) as f32;
                    for (a, &s) in acc.iter_mut().zip(lane.last.iter()) {
                        *a += s as f32 * lane.gain * fade;
                    }
                    lane.state = if frames_left <= 1 {
                        debug!("mixer lane faded out");
                        LaneState::Excluded
                    } else {
                        LaneState::Fading {
                            frames_left: frames_left - 1,
                        }
                    };
                }
                LaneState::Excluded => {}
            }
        }

        let samples = acc
            .iter()
            .map(|a| a.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
            .collect();
        Some(Frame::from_samples(self.out_shape, samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn shape() -> FrameShape {
        FrameShape::s16(44100, 1, 4)
    }

    #[test]
    fn db_conversion() {
        assert_relative_eq!(db_to_linear(0.0), 1.0);
        assert_relative_eq!(db_to_linear(5.0), 10f32.powf(0.25));
        assert_relative_eq!(db_to_linear(15.0), 10f32.powf(0.75));
    }

    #[test]
    fn needs_every_live_lane_before_mixing() {
        let mut mixer = MixerNode::new(&[0.0, 0.0], 3, shape());
        mixer.feed(0, &[1, 2, 3, 4]);
        assert!(mixer.mix_frame().is_none());
        mixer.feed(1, &[10, 20, 30, 40]);
        let frame = mixer.mix_frame().unwrap();
        assert_eq!(frame.samples(), &[11, 22, 33, 44]);
    }

    #[test]
    fn gains_scale_each_lane_independently() {
        let mut mixer = MixerNode::new(&[5.0, 15.0], 3, shape());
        mixer.feed(0, &[100, 100, 100, 100]);
        mixer.feed(1, &[100, 100, 100, 100]);
        let frame = mixer.mix_frame().unwrap();
        let expected = (100.0 * 10f32.powf(0.25) + 100.0 * 10f32.powf(0.75)).round() as i16;
        assert!(frame.samples().iter().all(|&s| s == expected));
    }

    #[test]
    fn sum_saturates_at_i16_range() {
        let mut mixer = MixerNode::new(&[0.0, 0.0], 3, shape());
        mixer.feed(0, &[i16::MAX; 4]);
        mixer.feed(1, &[i16::MAX; 4]);
        let frame = mixer.mix_frame().unwrap();
        assert!(frame.samples().iter().all(|&s| s == i16::MAX));
    }

    #[test]
    fn ended_lane_mixes_buffered_frames_before_fading() {
        let mut mixer = MixerNode::new(&[0.0, 0.0], 3, shape());
        mixer.feed(0, &[1000; 24]);
        mixer.feed(1, &[400; 8]);
        mixer.input_ended(1);

        // Both of lane 1's buffered frames still count.
        assert_eq!(mixer.mix_frame().unwrap().samples(), &[1400; 4]);
        assert_eq!(mixer.mix_frame().unwrap().samples(), &[1400; 4]);
        // Then the last frame fades at 3/4, 2/4, 1/4 while lane 0 plays on.
        assert_eq!(mixer.mix_frame().unwrap().samples(), &[1300; 4]);
        assert_eq!(mixer.mix_frame().unwrap().samples(), &[1200; 4]);
        assert_eq!(mixer.mix_frame().unwrap().samples(), &[1100; 4]);
        // Transition over: lane 1 contributes nothing.
        assert_eq!(mixer.mix_frame().unwrap().samples(), &[1000; 4]);
        assert!(!mixer.ended());
    }

    #[test]
    fn trailing_sub_frame_samples_are_dropped() {
        let mut mixer = MixerNode::new(&[0.0, 0.0], 1, shape());
        mixer.feed(0, &[1000; 12]);
        mixer.feed(1, &[400, 400, 400, 400, 7, 7]);
        mixer.input_ended(1);

        assert_eq!(mixer.mix_frame().unwrap().samples(), &[1400; 4]);
        // The two leftover samples never reach the output; the fade uses
        // the last full frame.
        assert_eq!(mixer.mix_frame().unwrap().samples(), &[1200; 4]);
        assert_eq!(mixer.mix_frame().unwrap().samples(), &[1000; 4]);
    }

    #[test]
    fn lane_zero_dropout_ends_the_mix() {
        let mut mixer = MixerNode::new(&[0.0, 0.0], 2, shape());
        mixer.feed(0, &[500; 4]);
        mixer.feed(1, &[100; 12]);
        mixer.input_ended(0);

        assert!(mixer.mix_frame().is_some());
        assert!(!mixer.ended());
        // Fade frames governed by lane 0's last contribution.
        assert!(mixer.mix_frame().is_some());
        assert!(mixer.mix_frame().is_some());
        assert!(mixer.ended());
        assert!(mixer.mix_frame().is_none());
    }

    #[test]
    fn single_lane_mixer_applies_gain() {
        let mut mixer = MixerNode::new(&[5.0], 3, shape());
        mixer.feed(0, &[1000, -1000, 500, -500]);
        let frame = mixer.mix_frame().unwrap();
        let g = 10f32.powf(0.25);
        let expected: Vec<i16> = [1000f32, -1000.0, 500.0, -500.0]
            .iter()
            .map(|s| (s * g).round() as i16)
            .collect();
        assert_eq!(frame.samples(), expected.as_slice());
    }
}
