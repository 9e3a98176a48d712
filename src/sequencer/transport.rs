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

/// Slowest supported tempo.
pub const MIN_BPM: f64 = 60.0;
/// Fastest supported tempo.
pub const MAX_BPM: f64 = 200.0;
/// Fewest bars in a pattern.
pub const MIN_BARS: usize = 1;
/// Most bars in a pattern.
pub const MAX_BARS: usize = 8;

/// Tempo and pattern resolution.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transport {
    /// Whether the sequencer is running.
    #[serde(default)]
    pub playing: bool,
    /// Tempo in beats per minute.
    pub bpm: f64,
    /// Steps in one bar, four beats to the bar.
    pub steps_per_bar: usize,
    /// Bars in the pattern.
    pub bars: usize,
    /// Swing amount (0 to 1). Stored only; step timing ignores it.
    #[serde(default)]
    pub swing: f64,
}

impl Default for Transport {
    fn default() -> Self {
        Transport {
            playing: false,
            bpm: 120.0,
            steps_per_bar: 16,
            bars: 1,
            swing: 0.0,
        }
    }
}

impl Transport {
    /// The number of steps the pattern should have: steps per bar times bars.
    pub fn pattern_length(&self) -> usize {
        self.steps_per_bar.saturating_mul(self.bars)
    }

    /// This transport with the tempo and bar count clamped into the supported ranges, as a
    /// session plays it.
    pub fn clamped(&self) -> Transport {
        Transport {
            bpm: clamp_bpm(self.bpm),
            bars: clamp_bars(self.bars),
            ..self.clone()
        }
    }
}

/// Clamps a tempo into the supported range. NaN falls back to the default tempo.
pub fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_nan() {
        return Transport::default().bpm;
    }
    bpm.clamp(MIN_BPM, MAX_BPM)
}

/// Clamps a bar count into the supported range.
pub fn clamp_bars(bars: usize) -> usize {
    bars.clamp(MIN_BARS, MAX_BARS)
}
