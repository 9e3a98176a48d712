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
//! The pad model: what a pad plays and how it shapes playback.
//!
//! Reverb, noise gate and EQ settings are carried with the pad and saved with the project, but
//! they are never applied to the audio.
use serde::{Deserialize, Serialize};

use crate::samples::player::{PlaybackOptions, MIN_TRIM_WINDOW};

/// The number of pads in a new project.
pub const DEFAULT_PAD_COUNT: usize = 8;

/// Pad colors, cycled through by pad index.
const PAD_COLORS: [&str; 8] = [
    "#ef4444", "#f59e0b", "#10b981", "#3b82f6", "#a855f7", "#ec4899", "#22d3ee", "#84cc16",
];

/// The highest gain a pad accepts.
pub const MAX_PAD_GAIN: f32 = 1.2;

/// Center frequencies of the equalizer bands in Hz.
pub const EQ_BANDS: [u32; 10] = [31, 62, 125, 250, 500, 1000, 2000, 4000, 8000, 16000];

/// Metadata about the sample loaded into a pad.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SampleMeta {
    /// Identifier of the sample, usually the pad id.
    pub id: String,
    /// Display name, usually the file name.
    pub name: String,
    /// Duration in seconds.
    pub duration: f64,
    /// Sample rate of the decoded buffer.
    pub sample_rate: u32,
    /// Where the sample came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Reverb presets a pad can select.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReverbPreset {
    #[default]
    Off,
    Room,
    Hall,
    Plate,
    Spring,
    Shimmer,
}

/// Noise gate settings.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoiseGate {
    pub enabled: bool,
    /// Threshold in dB.
    pub threshold: f32,
    /// Attack in milliseconds.
    pub attack: f32,
    /// Release in milliseconds.
    pub release: f32,
}

impl Default for NoiseGate {
    fn default() -> Self {
        NoiseGate {
            enabled: false,
            threshold: -50.0,
            attack: 5.0,
            release: 50.0,
        }
    }
}

/// One equalizer band.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EqBand {
    /// Center frequency in Hz.
    pub frequency: u32,
    /// Gain in dB.
    pub gain: f32,
}

/// A ten band graphic equalizer. Flat by default.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Equalizer {
    pub bands: Vec<EqBand>,
}

impl Default for Equalizer {
    fn default() -> Self {
        Equalizer {
            bands: EQ_BANDS
                .iter()
                .map(|frequency| EqBand {
                    frequency: *frequency,
                    gain: 0.0,
                })
                .collect(),
        }
    }
}

/// A pad: a sample slot with playback shaping.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pad {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<SampleMeta>,
    pub gain: f32,
    pub attack: f64,
    pub decay: f64,
    #[serde(default)]
    pub start_offset: f64,
    #[serde(default)]
    pub trim_start: f64,
    /// None plays to the end of the sample.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_end: Option<f64>,
    #[serde(default, rename = "loop")]
    pub looping: bool,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub reverb_preset: ReverbPreset,
    #[serde(default)]
    pub reverb_mix: f32,
    #[serde(default)]
    pub noise_gate: NoiseGate,
    #[serde(default)]
    pub eq: Equalizer,
}

impl Pad {
    /// Creates the pad at the given index of the default roster.
    pub fn new(index: usize) -> Pad {
        Pad {
            id: format!("pad-{}", index),
            name: format!("Pad {}", index + 1),
            color: PAD_COLORS[index % PAD_COLORS.len()].to_string(),
            sample: None,
            gain: 0.85,
            attack: 0.002,
            decay: 0.2,
            start_offset: 0.0,
            trim_start: 0.0,
            trim_end: None,
            looping: false,
            muted: false,
            reverb_preset: ReverbPreset::Off,
            reverb_mix: 0.0,
            noise_gate: NoiseGate::default(),
            eq: Equalizer::default(),
        }
    }

    /// The playback options a trigger of this pad uses.
    pub fn playback_options(&self) -> PlaybackOptions {
        PlaybackOptions {
            gain: self.gain,
            attack: self.attack,
            decay: self.decay,
            start_offset: self.start_offset,
            end_offset: self.trim_end,
            looping: self.looping,
        }
    }

    /// Sets the trim window, keeping it inside the sample and at least the minimum window wide.
    /// Playback starts at the trim start.
    pub fn set_trim(&mut self, start: f64, end: f64) {
        let duration = self.sample.as_ref().map(|sample| sample.duration).unwrap_or(0.0);
        let start = start.min((duration - MIN_TRIM_WINDOW).max(0.0)).max(0.0);
        let end = end.min(duration.max(MIN_TRIM_WINDOW)).max(start + MIN_TRIM_WINDOW);
        self.trim_start = start;
        self.trim_end = Some(end);
        self.start_offset = start;
    }

    /// Applies a partial update. Gains and times are kept in range.
    pub fn apply(&mut self, patch: PadPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(gain) = patch.gain {
            self.gain = gain.clamp(0.0, MAX_PAD_GAIN);
        }
        if let Some(attack) = patch.attack {
            self.attack = attack.max(0.0);
        }
        if let Some(decay) = patch.decay {
            self.decay = decay.max(0.0);
        }
        if let Some(start_offset) = patch.start_offset {
            self.start_offset = start_offset.max(0.0);
        }
        if let Some(trim_start) = patch.trim_start {
            self.trim_start = trim_start.max(0.0);
        }
        if let Some(trim_end) = patch.trim_end {
            self.trim_end = trim_end;
        }
        if let Some(looping) = patch.looping {
            self.looping = looping;
        }
        if let Some(muted) = patch.muted {
            self.muted = muted;
        }
        if let Some(reverb_preset) = patch.reverb_preset {
            self.reverb_preset = reverb_preset;
        }
        if let Some(reverb_mix) = patch.reverb_mix {
            self.reverb_mix = reverb_mix.clamp(0.0, 1.0);
        }
        if let Some(noise_gate) = patch.noise_gate {
            self.noise_gate = noise_gate;
        }
        if let Some(eq) = patch.eq {
            self.eq = eq;
        }
    }
}

/// A partial pad update. Unset fields are left alone.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PadPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub gain: Option<f32>,
    pub attack: Option<f64>,
    pub decay: Option<f64>,
    pub start_offset: Option<f64>,
    pub trim_start: Option<f64>,
    /// Some(None) clears the trim end.
    pub trim_end: Option<Option<f64>>,
    #[serde(rename = "loop")]
    pub looping: Option<bool>,
    pub muted: Option<bool>,
    pub reverb_preset: Option<ReverbPreset>,
    pub reverb_mix: Option<f32>,
    pub noise_gate: Option<NoiseGate>,
    pub eq: Option<Equalizer>,
}

/// The default roster of pads.
pub fn default_pads() -> Vec<Pad> {
    (0..DEFAULT_PAD_COUNT).map(Pad::new).collect()
}
