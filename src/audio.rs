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
//! Audio output: the shared clock, output devices and the voice mixer behind them.
use std::{fmt, sync::Arc};

use crate::config;

pub mod buffer;
pub mod cpal;
pub mod decode;
pub mod error;
pub mod mixer;
pub mod mock;
mod thread_priority;

pub use buffer::DecodedBuffer;
pub use error::{AudioError, DecodeError};

/// A monotonic clock in seconds. The scheduler and the renderer read the same one.
pub trait Clock: Send + Sync {
    /// The current time in seconds.
    fn current_time(&self) -> f64;
}

/// An output device. Its clock only advances while output is running, so nothing is audible
/// (and no time passes) until [Device::resume] has been called.
pub trait Device: Clock + fmt::Display {
    /// Activates audio output. Calling it again is a no-op.
    fn resume(&self) -> Result<(), AudioError>;

    /// Returns true once output has been resumed.
    fn is_running(&self) -> bool;

    /// Returns the queue that feeds voices to this device's mixer.
    fn voices(&self) -> mixer::VoiceSender;

    /// The output sample rate.
    fn sample_rate(&self) -> u32;

    /// Sets the master output gain.
    fn set_master_gain(&self, gain: f32);

    #[cfg(test)]
    fn to_mock(&self) -> Option<&mock::Device> {
        None
    }
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<cpal::DeviceInfo>, AudioError> {
    cpal::list_devices()
}

/// Gets a device for the given audio configuration. Names starting with "mock" produce a mock
/// device that renders in real time without playing anything.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, AudioError> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(
            device,
            config.sample_rate().unwrap_or(mock::DEFAULT_SAMPLE_RATE),
            config.master_gain(),
        )));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
