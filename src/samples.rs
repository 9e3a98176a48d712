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
//! Sample playback: decoded buffers per pad, and the voices that play them.
//!
//! A trigger resolves a pad's playback options against its buffer into a [player::VoicePlan]
//! (trim window, loop window, envelope and stop time) and hands the resulting [voice::Voice] to
//! the device's mixer, which renders it sample accurately.

pub mod envelope;
pub mod player;
pub mod store;
pub mod voice;

pub use player::{PlaybackOptions, Renderer, SamplePlayer};
pub use store::BufferStore;
pub use voice::Voice;
