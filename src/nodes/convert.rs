//! Implicit format converter - channel remap plus linear resampling.
//!
//! Build-time negotiation inserts one of these on any source-to-mixer
//! edge whose rate or layout differs from the negotiated output shape.
//! Linear interpolation is deliberate: conversion here exists to make
//! shapes agree, not to be a high-quality resampler.

use crate::frame::{Frame, FrameShape};

/// Normalizes a source's frames to the mixer's rate and channel count.
///
/// Keeps a fractional read position across frames so the interpolation
/// is continuous over the whole stream, not per-frame. Output length
/// varies per call; the mixer buffers whatever comes out.
#[derive(Debug)]
pub struct ConvertNode {
    in_shape: FrameShape,
    out_rate: u32,
    out_channels: usize,
    /// Input sample-groups consumed per output sample-group
    step: f64,
    /// Fractional position into `window`, in sample-groups
    pos: f64,
    /// Remapped sample-groups awaiting interpolation
    window: Vec<i16>,
}

impl ConvertNode {
    pub(crate) fn new(in_shape: FrameShape, out_rate: u32, out_channels: usize) -> Self {
        Self {
            in_shape,
            out_rate,
            out_channels,
            step: in_shape.sample_rate as f64 / out_rate as f64,
            pos: 0.0,
            window: Vec::new(),
        }
    }

    /// Map one input sample-group onto the output channel count.
    ///
    /// Mono fans out to every output channel; otherwise each output
    /// channel reads the nearest input channel, extra inputs ignored.
    fn remap_group(&self, group: &[i16], out: &mut Vec<i16>) {
        let in_channels = self.in_shape.channels;
        for out_ch in 0..self.out_channels {
            let in_ch = if in_channels == 1 {
                0
            } else {
                out_ch.min(in_channels - 1)
            };
            out.push(group[in_ch]);
        }
    }

    /// Convert one frame, returning normalized interleaved samples.
    ///
    /// May return zero samples (upsampling priming) or more than one
    /// frame's worth (downsampling) - the caller must not assume frame
    /// boundaries survive conversion.
    pub(crate) fn convert(&mut self, frame: &Frame) -> Vec<i16> {
        let mut remapped = Vec::with_capacity(frame.shape().frame_len * self.out_channels);
        for group in frame.samples().chunks_exact(self.in_shape.channels) {
            self.remap_group(group, &mut remapped);
        }

        // Same rate: layout change only, nothing to interpolate.
        if self.in_shape.sample_rate == self.out_rate {
            return remapped;
        }

        self.window.extend_from_slice(&remapped);
        let channels = self.out_channels;
        let groups = self.window.len() / channels;

        let mut out = Vec::new();
        // Linear interpolation needs the group at pos and the one after it.
        while self.pos + 1.0 < groups as f64 {
            let base = self.pos as usize;
            let t = self.pos - base as f64;
            for ch in 0..channels {
                let a = self.window[base * channels + ch] as f64;
                let b = self.window[(base + 1) * channels + ch] as f64;
                out.push((a + (b - a) * t).round() as i16);
            }
            self.pos += self.step;
        }

        // Drop fully consumed groups, keeping the pair still referenced.
        let consumed = self.pos as usize;
        if consumed > 0 {
            self.window.drain(..consumed * channels);
            self.pos -= consumed as f64;
        }
        out
    }
}
