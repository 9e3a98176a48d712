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
use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::sequencer::SchedulerSettings;

use super::{audio::Audio, error::ConfigError, scheduler::Scheduler};

/// Prefix of environment variables that override the engine configuration, e.g.
/// `PADSEQ__AUDIO__DEVICE=mock`.
const ENV_PREFIX: &str = "PADSEQ";

/// The engine configuration: which device to play through and how the scheduler is timed.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Engine {
    /// The audio output configuration.
    #[serde(default)]
    audio: Audio,

    /// The scheduler timing.
    #[serde(default)]
    scheduler: Scheduler,
}

impl Engine {
    /// Loads the engine configuration from the given file, if any, with environment overrides
    /// applied on top.
    pub fn deserialize(path: Option<&Path>) -> Result<Engine, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        Ok(builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Engine>()?)
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// Replaces the output device.
    pub fn set_device(&mut self, device: &str) {
        self.audio = self.audio.with_device(device);
    }

    /// Returns the scheduler settings.
    pub fn scheduler(&self) -> Result<SchedulerSettings, ConfigError> {
        self.scheduler.settings()
    }
}

#[cfg(test)]
mod test {
    use std::{fs, time::Duration};

    use super::*;

    #[test]
    fn test_load_file() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("padseq.yaml");
        fs::write(
            &path,
            r#"
            audio:
              device: mock-output
              sample_rate: 22050
            scheduler:
              horizon: 150ms
              poll_interval: 10ms
            "#,
        )
        .unwrap();

        let mut engine = Engine::deserialize(Some(&path)).unwrap();
        assert_eq!(engine.audio().device(), "mock-output");
        assert_eq!(engine.audio().sample_rate(), Some(22050));
        assert_eq!(engine.audio().master_gain(), 0.9);

        let settings = engine.scheduler().unwrap();
        assert!((settings.horizon - 0.15).abs() < 1e-9);
        assert_eq!(settings.start_delay, 0.06);
        assert_eq!(settings.poll_interval, Duration::from_millis(10));

        engine.set_device("mock-other");
        assert_eq!(engine.audio().device(), "mock-other");
        assert_eq!(engine.audio().sample_rate(), Some(22050));
    }

    #[test]
    fn test_missing_file() {
        let tempdir = tempfile::tempdir().unwrap();
        let result = Engine::deserialize(Some(&tempdir.path().join("missing.yaml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
