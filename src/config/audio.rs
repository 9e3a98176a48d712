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
use serde::{Deserialize, Serialize};

use crate::audio::mixer::DEFAULT_MASTER_GAIN;

/// The audio output configuration.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Audio {
    /// The output device. "default" is the host default, names starting with "mock" are mocks.
    device: String,

    /// Output sample rate in Hz (default: the device's own rate).
    sample_rate: Option<u32>,

    /// Master output gain (default: 0.9).
    master_gain: Option<f32>,

    /// Stream buffer size in frames (default: the backend's choice).
    buffer_size: Option<u32>,
}

impl Default for Audio {
    fn default() -> Self {
        Audio::new("default")
    }
}

impl Audio {
    /// New will create a new Audio configuration.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: device.to_string(),
            sample_rate: None,
            master_gain: None,
            buffer_size: None,
        }
    }

    /// Returns a copy of this configuration for a different device.
    pub fn with_device(&self, device: &str) -> Audio {
        Audio {
            device: device.to_string(),
            ..self.clone()
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Returns the configured sample rate, if any.
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    /// Returns the master gain (default: 0.9). Negative gains are treated as silence.
    pub fn master_gain(&self) -> f32 {
        self.master_gain.unwrap_or(DEFAULT_MASTER_GAIN).max(0.0)
    }

    /// Returns the configured stream buffer size, if any.
    pub fn buffer_size(&self) -> Option<u32> {
        self.buffer_size
    }
}

#[cfg(test)]
mod test {
    use config::{Config, File, FileFormat};

    use super::*;

    #[test]
    fn test_defaults() {
        let audio = Audio::default();
        assert_eq!(audio.device(), "default");
        assert_eq!(audio.sample_rate(), None);
        assert_eq!(audio.master_gain(), 0.9);
        assert_eq!(audio.buffer_size(), None);
    }

    #[test]
    fn test_parse() {
        let yaml = r#"
            device: mock-output
            sample_rate: 48000
            master_gain: 0.5
            buffer_size: 256
        "#;
        let audio: Audio = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(audio.device(), "mock-output");
        assert_eq!(audio.sample_rate(), Some(48000));
        assert_eq!(audio.master_gain(), 0.5);
        assert_eq!(audio.buffer_size(), Some(256));

        let other = audio.with_device("default");
        assert_eq!(other.device(), "default");
        assert_eq!(other.sample_rate(), Some(48000));
    }
}
