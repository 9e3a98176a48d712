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
//! Turns a decoded buffer, a start time and playback options into a scheduled voice.
use std::sync::Arc;

use tracing::{debug, warn};

use crate::audio::{mixer::VoiceSender, DecodedBuffer};

use super::{envelope::Envelope, voice::Voice};

/// The smallest audible window between the trim start and end, in seconds.
pub const MIN_TRIM_WINDOW: f64 = 0.01;

/// Extra time a voice keeps running after its envelope reaches the floor, in seconds.
pub const STOP_TAIL: f64 = 0.05;

/// Per-trigger playback shaping.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackOptions {
    /// Peak gain of the envelope (0 to 1.2).
    pub gain: f32,
    /// Attack time in seconds.
    pub attack: f64,
    /// Decay time in seconds.
    pub decay: f64,
    /// Where playback starts in the buffer, in seconds.
    pub start_offset: f64,
    /// Where playback ends in the buffer, in seconds. Defaults to the end of the buffer.
    pub end_offset: Option<f64>,
    /// Whether the trim window loops.
    pub looping: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        PlaybackOptions {
            gain: 1.0,
            attack: 0.0,
            decay: 0.25,
            start_offset: 0.0,
            end_offset: None,
            looping: false,
        }
    }
}

/// The resolved timing of one voice: trim window, loop window, envelope and stop time.
#[derive(Clone, Debug, PartialEq)]
pub struct VoicePlan {
    /// Clock time at which the voice starts.
    pub when: f64,
    /// Offset into the buffer where playback starts, in seconds.
    pub start: f64,
    /// End of the trim window, in seconds.
    pub end: f64,
    /// Whether the loop window repeats.
    pub looping: bool,
    /// Start of the loop window, in seconds.
    pub loop_start: f64,
    /// End of the loop window, in seconds.
    pub loop_end: f64,
    /// The amplitude envelope.
    pub envelope: Envelope,
    /// Clock time at which the voice is stopped.
    pub stop_at: f64,
}

impl VoicePlan {
    /// Resolves playback options against a buffer of the given duration.
    pub fn new(duration: f64, when: f64, options: &PlaybackOptions) -> VoicePlan {
        // max/min rather than clamp so that NaN offsets land on the bounds.
        let start = options.start_offset.max(0.0).min(duration);
        let requested_end = options.end_offset.unwrap_or(duration);
        let end = requested_end.min(duration).max(start + MIN_TRIM_WINDOW);

        let (loop_start, loop_end) = if options.looping {
            (start, end)
        } else {
            (0.0, duration)
        };

        let natural_stop = when + options.attack + options.decay + STOP_TAIL;
        let stop_at = if options.looping {
            natural_stop
        } else {
            let trimmed_stop = when + (end - start).max(MIN_TRIM_WINDOW);
            natural_stop.min(trimmed_stop)
        };

        VoicePlan {
            when,
            start,
            end,
            looping: options.looping,
            loop_start,
            loop_end,
            envelope: Envelope::new(when, options.attack, options.decay, options.gain),
            stop_at,
        }
    }
}

/// Something that can play a decoded buffer at a clock time.
pub trait Renderer: Send + Sync {
    /// Schedules one independent voice. Each call creates a new voice.
    fn play_buffer(&self, buffer: &Arc<DecodedBuffer>, when: f64, options: &PlaybackOptions);
}

/// Renders voices through a device's mixer.
pub struct SamplePlayer {
    voices: VoiceSender,
}

impl SamplePlayer {
    /// Creates a player that sends voices to the given mixer queue.
    pub fn new(voices: VoiceSender) -> SamplePlayer {
        SamplePlayer { voices }
    }
}

impl Renderer for SamplePlayer {
    fn play_buffer(&self, buffer: &Arc<DecodedBuffer>, when: f64, options: &PlaybackOptions) {
        let plan = VoicePlan::new(buffer.duration(), when, options);
        let voice = Voice::new(buffer.clone(), plan);
        debug!(
            voice = voice.id(),
            when,
            stop_at = voice.plan().stop_at,
            "Scheduling voice"
        );
        if self.voices.send(voice).is_err() {
            warn!("Mixer is gone, dropping voice");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio::mixer::VoiceMixer;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_clamps_out_of_range_offsets() {
        let options = PlaybackOptions {
            start_offset: -1.0,
            end_offset: Some(1000.0),
            ..Default::default()
        };
        let plan = VoicePlan::new(2.0, 0.0, &options);
        assert_close(plan.start, 0.0);
        assert_close(plan.end, 2.0);
    }

    #[test]
    fn test_enforces_minimum_window() {
        let options = PlaybackOptions {
            start_offset: 1.0,
            end_offset: Some(1.005),
            ..Default::default()
        };
        let plan = VoicePlan::new(2.0, 0.0, &options);
        assert_close(plan.start, 1.0);
        assert_close(plan.end, 1.01);
    }

    #[test]
    fn test_nan_offsets_are_clamped() {
        let options = PlaybackOptions {
            start_offset: f64::NAN,
            ..Default::default()
        };
        let plan = VoicePlan::new(2.0, 0.0, &options);
        assert_close(plan.start, 0.0);
        assert_close(plan.end, 2.0);
    }

    #[test]
    fn test_loop_window() {
        let options = PlaybackOptions {
            start_offset: 0.5,
            end_offset: Some(1.5),
            looping: true,
            ..Default::default()
        };
        let plan = VoicePlan::new(2.0, 0.0, &options);
        assert!(plan.looping);
        assert_close(plan.loop_start, 0.5);
        assert_close(plan.loop_end, 1.5);

        let plan = VoicePlan::new(
            2.0,
            0.0,
            &PlaybackOptions {
                looping: false,
                ..options
            },
        );
        assert!(!plan.looping);
        assert_close(plan.loop_start, 0.0);
        assert_close(plan.loop_end, 2.0);
    }

    #[test]
    fn test_stop_time() {
        // The envelope ends before the trim window does.
        let options = PlaybackOptions {
            attack: 0.01,
            decay: 0.2,
            ..Default::default()
        };
        let plan = VoicePlan::new(2.0, 10.0, &options);
        assert_close(plan.stop_at, 10.0 + 0.01 + 0.2 + STOP_TAIL);

        // The trim window ends before the envelope does.
        let options = PlaybackOptions {
            attack: 0.01,
            decay: 2.0,
            start_offset: 0.5,
            end_offset: Some(0.6),
            ..Default::default()
        };
        let plan = VoicePlan::new(2.0, 10.0, &options);
        assert_close(plan.stop_at, 10.1);

        // Looping ignores the trim window.
        let plan = VoicePlan::new(
            2.0,
            10.0,
            &PlaybackOptions {
                looping: true,
                ..options
            },
        );
        assert_close(plan.stop_at, 10.0 + 0.01 + 2.0 + STOP_TAIL);
    }

    #[test]
    fn test_envelope_anchored_at_when() {
        let options = PlaybackOptions {
            gain: 0.85,
            attack: 0.002,
            decay: 0.2,
            ..Default::default()
        };
        let plan = VoicePlan::new(1.0, 3.0, &options);
        assert_eq!(plan.envelope.value_at(2.999), 0.0);
        assert!((plan.envelope.value_at(3.002) - 0.85).abs() < 1e-4);
    }

    #[test]
    fn test_sample_player_sends_voice() {
        let mixer = VoiceMixer::new(2, 44100, 1.0);
        let player = SamplePlayer::new(mixer.sender());
        let buffer = Arc::new(DecodedBuffer::new(vec![vec![0.5; 441]], 44100).unwrap());

        player.play_buffer(&buffer, 0.0, &PlaybackOptions::default());
        player.play_buffer(&buffer, 0.0, &PlaybackOptions::default());

        mixer.process_frames(1);
        assert_eq!(mixer.active_voice_count(), 2);
    }
}
