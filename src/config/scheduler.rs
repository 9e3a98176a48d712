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
use std::time::Duration;

use duration_string::DurationString;
use serde::{Deserialize, Serialize};

use crate::sequencer::SchedulerSettings;

use super::error::ConfigError;

/// Scheduler timing, with durations written as strings such as "100ms".
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Scheduler {
    /// How far ahead of the clock steps are committed (default: 100ms).
    horizon: Option<String>,

    /// Delay between starting the transport and the first step (default: 60ms).
    start_delay: Option<String>,

    /// How often the clock is polled (default: 16ms).
    poll_interval: Option<String>,
}

/// Parses an optional duration string, naming the field on failure.
fn parse_duration(field: &'static str, value: &Option<String>) -> Result<Option<Duration>, ConfigError> {
    value
        .as_ref()
        .map(|value| {
            DurationString::from_string(value.clone())
                .map(Duration::from)
                .map_err(|e| ConfigError::InvalidDuration {
                    field,
                    reason: e.to_string(),
                })
        })
        .transpose()
}

impl Scheduler {
    /// Returns the scheduler settings, with defaults for anything unset.
    pub fn settings(&self) -> Result<SchedulerSettings, ConfigError> {
        let defaults = SchedulerSettings::default();
        let poll_interval =
            parse_duration("poll_interval", &self.poll_interval)?.unwrap_or(defaults.poll_interval);
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidDuration {
                field: "poll_interval",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(SchedulerSettings {
            horizon: parse_duration("horizon", &self.horizon)?
                .map_or(defaults.horizon, |horizon| horizon.as_secs_f64()),
            start_delay: parse_duration("start_delay", &self.start_delay)?
                .map_or(defaults.start_delay, |delay| delay.as_secs_f64()),
            poll_interval,
        })
    }
}
