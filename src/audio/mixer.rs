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
// Core voice mixing logic shared by the cpal and mock devices. The mixer's frame counter is the
// audio clock: nothing else advances time.
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::samples::voice::Voice;

/// The queue voices travel on from the renderer to the mixer.
pub type VoiceSender = Sender<Voice>;

/// Default gain applied to the mixed output.
pub const DEFAULT_MASTER_GAIN: f32 = 0.9;

/// Mixes scheduled voices into interleaved output blocks and counts rendered frames.
pub struct VoiceMixer {
    /// Voices currently playing or waiting for their start time.
    voices: Mutex<Vec<Voice>>,
    /// New voices from the renderer.
    voice_rx: Receiver<Voice>,
    /// Handed out to renderers.
    voice_tx: VoiceSender,
    /// Number of output channels.
    num_channels: u16,
    /// Output sample rate.
    sample_rate: u32,
    /// Frames rendered so far.
    frames_rendered: AtomicU64,
    /// Master gain, stored as f32 bits.
    master_gain: AtomicU32,
}

impl VoiceMixer {
    /// Creates a new voice mixer.
    pub fn new(num_channels: u16, sample_rate: u32, master_gain: f32) -> Self {
        let (voice_tx, voice_rx) = crossbeam_channel::unbounded();
        Self {
            voices: Mutex::new(Vec::new()),
            voice_rx,
            voice_tx,
            num_channels,
            sample_rate,
            frames_rendered: AtomicU64::new(0),
            master_gain: AtomicU32::new(master_gain.to_bits()),
        }
    }

    /// Returns a sender that can queue voices on this mixer.
    pub fn sender(&self) -> VoiceSender {
        self.voice_tx.clone()
    }

    /// The current clock time in seconds: rendered frames over the sample rate.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    /// The number of frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Acquire)
    }

    /// Renders the next block into the interleaved output buffer, replacing its contents.
    pub fn process_into_output(&self, output: &mut [f32]) {
        let num_channels = self.num_channels as usize;
        output.fill(0.0);
        if num_channels == 0 {
            return;
        }

        let first_frame = self.frames_rendered.load(Ordering::Acquire);
        let num_frames = output.len() / num_channels;
        {
            let mut voices = self.voices.lock();
            voices.extend(self.voice_rx.try_iter());
            voices.retain_mut(|voice| {
                voice.render(output, num_channels, first_frame, self.sample_rate)
            });
        }

        let master_gain = self.master_gain();
        if master_gain != 1.0 {
            output.iter_mut().for_each(|sample| *sample *= master_gain);
        }

        self.frames_rendered
            .fetch_add(num_frames as u64, Ordering::AcqRel);
    }

    /// Processes multiple frames of audio mixing.
    pub fn process_frames(&self, num_frames: usize) -> Vec<f32> {
        let mut output = vec![0.0f32; num_frames * self.num_channels as usize];
        self.process_into_output(&mut output);
        output
    }

    /// Gets the number of output channels.
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Gets the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Gets the master gain.
    pub fn master_gain(&self) -> f32 {
        f32::from_bits(self.master_gain.load(Ordering::Relaxed))
    }

    /// Sets the master gain.
    pub fn set_master_gain(&self, gain: f32) {
        self.master_gain.store(gain.to_bits(), Ordering::Relaxed);
    }

    /// The number of voices the mixer is holding, including ones that haven't started yet.
    pub fn active_voice_count(&self) -> usize {
        self.voices.lock().len()
    }
}
