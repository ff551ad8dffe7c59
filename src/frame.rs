//! PCM frames and their shape metadata.

use core::fmt;

/// Raw sample encoding of a frame.
///
/// Exactly one format is supported: 16-bit signed interleaved PCM.
/// The enum exists so that shape comparisons and the byte-size formula
/// stay format-driven rather than hardcoding `2` at every call site.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SampleFormat {
    /// 16-bit signed little-endian, channels interleaved
    S16,
}

impl SampleFormat {
    #[inline]
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::S16 => 2,
        }
    }
}

/// The fixed shape of a [`Frame`]: rate, layout, format, and length.
///
/// `frame_len` counts *sample-groups* - one sample per channel - so a
/// stereo shape with `frame_len = 1152` holds 2304 samples.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FrameShape {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: usize,
    /// Sample encoding
    pub format: SampleFormat,
    /// Number of sample-groups per frame
    pub frame_len: usize,
}

impl FrameShape {
    /// Create an S16 shape.
    pub fn s16(sample_rate: u32, channels: usize, frame_len: usize) -> Self {
        Self {
            sample_rate,
            channels,
            format: SampleFormat::S16,
            frame_len,
        }
    }

    /// Total samples held by one frame of this shape.
    #[inline]
    pub fn samples_per_frame(&self) -> usize {
        self.frame_len * self.channels
    }

    /// Exact byte length of one frame of this shape.
    ///
    /// Every caller that touches raw bytes - the pump loop, the demo
    /// driver, tests - goes through this one formula, so the graph and
    /// the I/O side can never disagree on layout.
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.frame_len * self.channels * self.format.bytes_per_sample()
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Hz/{}ch/{:?}/{}",
            self.sample_rate, self.channels, self.format, self.frame_len
        )
    }
}

/// A full-sized buffer of interleaved PCM samples plus its shape.
///
/// Frames are always exactly `shape.samples_per_frame()` samples long;
/// no partially sized frames exist anywhere in the graph. A caller with
/// fewer bytes than [`FrameShape::byte_size`] must either pad or treat
/// its stream as ended.
#[derive(Clone, Debug)]
pub struct Frame {
    shape: FrameShape,
    samples: Vec<i16>,
}

impl Frame {
    /// Allocate a zeroed, fully-owned frame of the given shape.
    pub fn allocate(shape: FrameShape) -> Self {
        Self {
            shape,
            samples: vec![0; shape.samples_per_frame()],
        }
    }

    /// Wrap existing interleaved samples in a frame.
    ///
    /// # Panics
    ///
    /// Panics if `samples.len()` does not match the shape.
    pub fn from_samples(shape: FrameShape, samples: Vec<i16>) -> Self {
        assert_eq!(
            samples.len(),
            shape.samples_per_frame(),
            "sample count does not match frame shape {}",
            shape
        );
        Self { shape, samples }
    }

    #[inline]
    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    #[inline]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    #[inline]
    pub fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }

    /// Fill the frame from one chunk of little-endian PCM bytes.
    ///
    /// # Panics
    ///
    /// Panics if `bytes.len() != self.shape().byte_size()`.
    pub fn copy_from_le_bytes(&mut self, bytes: &[u8]) {
        assert_eq!(bytes.len(), self.shape.byte_size());
        for (sample, pair) in self.samples.iter_mut().zip(bytes.chunks_exact(2)) {
            *sample = i16::from_le_bytes([pair[0], pair[1]]);
        }
    }

    /// Serialize the frame as little-endian PCM bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.shape.byte_size());
        for sample in &self.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_size_matches_shape_fields() {
        let shape = FrameShape::s16(44100, 2, 1152);
        assert_eq!(shape.byte_size(), 1152 * 2 * 2);
        assert_eq!(shape.samples_per_frame(), 2304);

        let mono = FrameShape::s16(8000, 1, 64);
        assert_eq!(mono.byte_size(), 128);
    }

    #[test]
    fn allocate_is_zeroed_and_full_sized() {
        let frame = Frame::allocate(FrameShape::s16(48000, 2, 16));
        assert_eq!(frame.samples().len(), 32);
        assert!(frame.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn le_byte_round_trip() {
        let shape = FrameShape::s16(44100, 1, 4);
        let frame = Frame::from_samples(shape, vec![0, 1, -1, i16::MIN]);
        let bytes = frame.to_le_bytes();
        assert_eq!(bytes.len(), shape.byte_size());

        let mut back = Frame::allocate(shape);
        back.copy_from_le_bytes(&bytes);
        assert_eq!(back.samples(), frame.samples());
    }

    #[test]
    #[should_panic]
    fn from_samples_rejects_wrong_length() {
        Frame::from_samples(FrameShape::s16(44100, 2, 4), vec![0; 7]);
    }
}
