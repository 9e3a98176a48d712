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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use parking_lot::Mutex;
use tracing::{info, span, Level};

use crate::playsync::CancelHandle;

use super::{
    error::AudioError,
    mixer::{VoiceMixer, VoiceSender},
    Clock,
};

/// Frames rendered per block by the paced render thread.
const BLOCK_FRAMES: usize = 256;

/// Sample rate of a mock device when none is configured.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Number of output channels of a mock device.
const MOCK_CHANNELS: u16 = 2;

/// A mock device. Renders voices without playing them anywhere.
///
/// A paced mock renders in real time on a background thread once resumed, which makes it useful
/// for dry runs. An offline mock only renders when [Device::render_frames] or [Device::advance]
/// is called, which gives tests full control over the clock.
pub struct Device {
    name: String,
    mixer: Arc<VoiceMixer>,
    running: AtomicBool,
    paced: bool,
    cancel_handle: CancelHandle,
    render_thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Device {
    /// Gets a paced mock device with the given name.
    pub fn get(name: &str, sample_rate: u32, master_gain: f32) -> Device {
        Device::new(name, sample_rate, MOCK_CHANNELS, master_gain, true)
    }

    /// Gets an offline mock device whose clock only moves when frames are rendered explicitly.
    pub fn offline(name: &str, sample_rate: u32, num_channels: u16, master_gain: f32) -> Device {
        Device::new(name, sample_rate, num_channels, master_gain, false)
    }

    fn new(name: &str, sample_rate: u32, num_channels: u16, master_gain: f32, paced: bool) -> Device {
        Device {
            name: name.to_string(),
            mixer: Arc::new(VoiceMixer::new(num_channels, sample_rate, master_gain)),
            running: AtomicBool::new(false),
            paced,
            cancel_handle: CancelHandle::new(),
            render_thread: Mutex::new(None),
        }
    }

    /// Renders the given number of frames and returns them interleaved. A device that hasn't
    /// been resumed renders nothing and its clock stays put.
    pub fn render_frames(&self, num_frames: usize) -> Vec<f32> {
        if !self.running.load(Ordering::Acquire) {
            return Vec::new();
        }
        self.mixer.process_frames(num_frames)
    }

    /// Renders the given duration of audio and returns it interleaved.
    pub fn advance(&self, duration: Duration) -> Vec<f32> {
        let num_frames = (duration.as_secs_f64() * self.mixer.sample_rate() as f64).round();
        self.render_frames(num_frames as usize)
    }

    /// The number of voices the mixer is holding.
    pub fn active_voice_count(&self) -> usize {
        self.mixer.active_voice_count()
    }

    /// The number of output channels.
    pub fn num_channels(&self) -> u16 {
        self.mixer.num_channels()
    }

    fn start_render_thread(&self) -> Result<(), AudioError> {
        let mixer = self.mixer.clone();
        let cancel_handle = self.cancel_handle.clone();
        let block_duration =
            Duration::from_secs_f64(BLOCK_FRAMES as f64 / mixer.sample_rate() as f64);

        let join = thread::Builder::new()
            .name("padseq-mock-output".into())
            .spawn(move || {
                let mut block = vec![0.0f32; BLOCK_FRAMES * mixer.num_channels() as usize];
                while !cancel_handle.wait_timeout(block_duration) {
                    mixer.process_into_output(&mut block);
                }
            })?;
        *self.render_thread.lock() = Some(join);
        Ok(())
    }
}

impl Clock for Device {
    fn current_time(&self) -> f64 {
        self.mixer.current_time()
    }
}

impl super::Device for Device {
    fn resume(&self) -> Result<(), AudioError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let span = span!(Level::INFO, "resume (mock)");
        let _enter = span.enter();
        info!(device = self.name, paced = self.paced, "Mock output running");

        if self.paced {
            if let Err(e) = self.start_render_thread() {
                self.running.store(false, Ordering::Release);
                return Err(e);
            }
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn voices(&self) -> VoiceSender {
        self.mixer.sender()
    }

    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    fn set_master_gain(&self, gain: f32) {
        self.mixer.set_master_gain(gain);
    }

    #[cfg(test)]
    fn to_mock(&self) -> Option<&Device> {
        Some(self)
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.cancel_handle.cancel();
        if let Some(join) = self.render_thread.lock().take() {
            let _ = join.join();
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
