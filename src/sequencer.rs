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
//! The step sequencer: pattern and transport data, the look-ahead scheduler and the session that
//! binds them to the audio clock and the renderer.
use thiserror::Error;

use crate::audio::{AudioError, DecodeError};

pub mod pattern;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use pattern::Pattern;
pub use scheduler::{Scheduler, SchedulerSettings, Step};
pub use session::{Session, SessionState};
pub use transport::Transport;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("unable to decode sample: {0}")]
    Decode(#[from] DecodeError),

    #[error("no pad with id {0}")]
    UnknownPad(String),

    #[error("step {step} is outside the pattern (length {length})")]
    StepOutOfRange { step: usize, length: usize },

    #[error("unable to start the scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}
