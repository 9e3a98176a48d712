// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::fmt;

use super::error::DecodeError;

/// Immutable planar PCM audio. Buffers are shared behind an `Arc` once decoded and are never
/// mutated afterwards, so voices that hold one keep playing it even after a pad's buffer is
/// replaced.
#[derive(Clone, PartialEq)]
pub struct DecodedBuffer {
    /// One vector of samples per channel. All channels have the same length.
    channels: Vec<Vec<f32>>,
    /// The sample rate of the buffer in Hz.
    sample_rate: u32,
}

impl DecodedBuffer {
    /// Creates a buffer from planar channel data.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<DecodedBuffer, DecodeError> {
        if channels.is_empty() {
            return Err(DecodeError::InvalidBuffer(
                "buffer must have at least one channel".into(),
            ));
        }
        if sample_rate == 0 {
            return Err(DecodeError::InvalidBuffer(
                "sample rate must be greater than zero".into(),
            ));
        }
        let frames = channels[0].len();
        if channels.iter().any(|channel| channel.len() != frames) {
            return Err(DecodeError::InvalidBuffer(
                "all channels must have the same number of frames".into(),
            ));
        }

        Ok(DecodedBuffer {
            channels,
            sample_rate,
        })
    }

    /// Creates a buffer from interleaved samples.
    pub fn from_interleaved(
        samples: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<DecodedBuffer, DecodeError> {
        if channel_count == 0 {
            return Err(DecodeError::InvalidBuffer(
                "buffer must have at least one channel".into(),
            ));
        }

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }

        DecodedBuffer::new(channels, sample_rate)
    }

    /// The number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// The sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    /// The duration of the buffer in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// The samples of the given channel.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Approximate memory held by the sample data in bytes.
    pub fn memory_size(&self) -> usize {
        self.channel_count() * self.frames() * std::mem::size_of::<f32>()
    }
}

impl fmt::Debug for DecodedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedBuffer")
            .field("channels", &self.channel_count())
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}
