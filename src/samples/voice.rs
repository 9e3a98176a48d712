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
//! A single playing instance of a decoded buffer.
//!
//! Voices are rendered by the mixer against the absolute output frame counter, so a voice
//! scheduled in the future stays silent until its start time and stops itself at its stop time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::audio::DecodedBuffer;

use super::player::VoicePlan;

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Represents an active voice playing a sample.
pub struct Voice {
    /// Unique ID for this voice.
    id: u64,
    /// The buffer being played. Replacing a pad's buffer doesn't affect this one.
    buffer: Arc<DecodedBuffer>,
    /// The resolved timing of this voice.
    plan: VoicePlan,
    /// Read position in buffer frames. None until the voice reaches its start time.
    position: Option<f64>,
    /// Set once the voice has stopped.
    finished: bool,
}

impl Voice {
    /// Creates a new voice.
    pub fn new(buffer: Arc<DecodedBuffer>, plan: VoicePlan) -> Voice {
        Voice {
            id: NEXT_VOICE_ID.fetch_add(1, Ordering::SeqCst),
            buffer,
            plan,
            position: None,
            finished: false,
        }
    }

    /// The unique ID of this voice.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The resolved timing of this voice.
    pub fn plan(&self) -> &VoicePlan {
        &self.plan
    }

    /// Returns true once the voice has stopped.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wraps a read position into the loop window.
    fn wrap(&self, position: f64) -> f64 {
        if !self.plan.looping {
            return position;
        }

        let rate = self.buffer.sample_rate() as f64;
        let loop_start = self.plan.loop_start * rate;
        let loop_end = (self.plan.loop_end * rate).min(self.buffer.frames() as f64);
        let loop_length = loop_end - loop_start;
        if loop_length <= 0.0 || position < loop_end {
            return position;
        }

        loop_start + (position - loop_start) % loop_length
    }

    /// Mixes this voice into an interleaved output block whose first frame is the absolute
    /// output frame `first_frame`. Returns false once the voice has finished.
    pub fn render(
        &mut self,
        output: &mut [f32],
        num_channels: usize,
        first_frame: u64,
        output_rate: u32,
    ) -> bool {
        if self.finished || num_channels == 0 {
            return !self.finished;
        }

        let output_rate = output_rate as f64;
        let buffer_rate = self.buffer.sample_rate() as f64;
        let step = buffer_rate / output_rate;
        let frames = self.buffer.frames();
        let buffer_channels = self.buffer.channel_count();

        for (offset, frame) in output.chunks_exact_mut(num_channels).enumerate() {
            let time = (first_frame + offset as u64) as f64 / output_rate;
            if time < self.plan.when {
                continue;
            }
            if time >= self.plan.stop_at {
                self.finished = true;
                break;
            }

            // A voice first seen after its start time still plays from the trim start.
            let position = self.wrap(self.position.unwrap_or(self.plan.start * buffer_rate));
            if position.is_nan() || position < 0.0 || position >= frames as f64 {
                self.finished = true;
                break;
            }

            let index = position as usize;
            let fraction = (position - index as f64) as f32;
            let gain = self.plan.envelope.value_at(time);
            let read = |channel: usize| {
                let samples = self.buffer.channel(channel);
                let s0 = samples[index];
                let s1 = samples.get(index + 1).copied().unwrap_or(s0);
                lerp(s0, s1, fraction) * gain
            };

            if buffer_channels == 1 {
                let sample = read(0);
                for out in frame.iter_mut() {
                    *out += sample;
                }
            } else if num_channels == 1 {
                let sum: f32 = (0..buffer_channels).map(read).sum();
                frame[0] += sum / buffer_channels as f32;
            } else {
                for (channel, out) in frame.iter_mut().enumerate().take(buffer_channels) {
                    *out += read(channel);
                }
            }

            self.position = Some(position + step);
        }

        !self.finished
    }
}
