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
//! Offline rendering of a project's pattern to a mono 16-bit WAV file.
//!
//! The session plays against an offline mock device, so the scheduler, the renderer and the
//! mixer all run exactly as they do live, only faster than real time.
use std::{path::Path, sync::Arc, time::Duration};

use hound::{SampleFormat, WavSpec, WavWriter};
use thiserror::Error;
use tracing::{debug, info, span, warn, Level};

use crate::{
    audio::{decode, mock, DecodeError, DecodedBuffer, Device},
    config::Project,
    samples::player::{PlaybackOptions, Renderer, SamplePlayer},
    sequencer::{scheduler::step_duration, SchedulerSettings, Session, SessionError},
    util::filename_display,
};

/// Frames rendered between scheduler polls.
const BLOCK_FRAMES: usize = 256;

/// The longest ring out rendered after the last cycle, in seconds.
const MAX_TAIL: f64 = 30.0;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cycles must be at least 1")]
    NoCycles,

    #[error("steps per bar is zero, there are no steps to render")]
    NoSteps,

    #[error("no samples available to export")]
    NoSamples,

    #[error("unable to load the sample for pad {pad}: {source}")]
    Sample {
        pad: String,
        #[source]
        source: DecodeError,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("unable to write WAV: {0}")]
    Wav(#[from] hound::Error),
}

/// How to render a loop.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
    /// How many times the pattern plays.
    pub cycles: u32,
    /// Output sample rate. Defaults to the highest rate among the loaded samples.
    pub sample_rate: Option<u32>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            cycles: 1,
            sample_rate: None,
        }
    }
}

/// A rendered loop: mono samples, the loop itself followed by the ring out of its last voices.
#[derive(Clone, Debug)]
pub struct RenderedLoop {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Frames covered by the cycles themselves.
    pub loop_frames: usize,
}

impl RenderedLoop {
    /// The rendered length in seconds.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Plays through a sample player, dropping voices that start at or after the end of the last
/// cycle.
struct LoopRenderer {
    player: SamplePlayer,
    loop_end: f64,
}

impl Renderer for LoopRenderer {
    fn play_buffer(&self, buffer: &Arc<DecodedBuffer>, when: f64, options: &PlaybackOptions) {
        if when < self.loop_end {
            self.player.play_buffer(buffer, when, options);
        }
    }
}

/// Renders the project's pattern for the given number of cycles.
pub fn render_loop(project: &Project, options: &ExportOptions) -> Result<RenderedLoop, ExportError> {
    let span = span!(Level::INFO, "export", project = project.name());
    let _enter = span.enter();

    if options.cycles == 0 {
        return Err(ExportError::NoCycles);
    }
    let state = project.session_state();
    let transport = state.transport.clone();
    if transport.steps_per_bar == 0 {
        return Err(ExportError::NoSteps);
    }

    let mut loaded = Vec::new();
    for (pad_id, path) in project.sample_paths() {
        if state.pad(&pad_id).is_none() {
            warn!(pad = pad_id, "Sample assigned to an unknown pad, skipping");
            continue;
        }
        let buffer = decode::decode_file(&path).map_err(|source| ExportError::Sample {
            pad: pad_id.clone(),
            source,
        })?;
        let name = filename_display(&path).to_string();
        loaded.push((pad_id, name, buffer));
    }

    let playable = loaded
        .iter()
        .any(|(id, _, _)| state.pad(id).is_some_and(|pad| !pad.muted));
    if !playable {
        return Err(ExportError::NoSamples);
    }
    let sample_rate = match options.sample_rate {
        Some(sample_rate) => sample_rate,
        None => loaded
            .iter()
            .map(|(_, _, buffer)| buffer.sample_rate())
            .max()
            .ok_or(ExportError::NoSamples)?,
    };

    let step = step_duration(transport.bpm, transport.steps_per_bar);
    let total_steps = transport
        .pattern_length()
        .saturating_mul(options.cycles as usize);
    let loop_seconds = step * total_steps as f64;
    let loop_frames = (loop_seconds * sample_rate as f64).round() as usize;

    let device = Arc::new(mock::Device::offline("export", sample_rate, 1, 1.0));
    let output: Arc<dyn Device> = device.clone();
    let renderer = Arc::new(LoopRenderer {
        player: SamplePlayer::new(output.voices()),
        // Step times accumulate, so the first step after the loop may land a hair early.
        loop_end: loop_seconds - step / 2.0,
    });
    let settings = SchedulerSettings {
        horizon: BLOCK_FRAMES as f64 / sample_rate as f64,
        start_delay: 0.0,
        poll_interval: Duration::from_secs(3600),
    };
    let session = Session::with_renderer(output, renderer, settings, state);
    for (pad_id, name, buffer) in loaded {
        session.set_buffer(&pad_id, &name, buffer)?;
    }

    info!(
        cycles = options.cycles,
        sample_rate,
        steps = total_steps,
        "Rendering loop"
    );

    session.start()?;
    let mut samples = Vec::with_capacity(loop_frames);
    while samples.len() < loop_frames {
        session.tick();
        let frames = BLOCK_FRAMES.min(loop_frames - samples.len());
        samples.extend(device.render_frames(frames));
    }
    session.stop();

    let max_tail = (MAX_TAIL * sample_rate as f64) as usize;
    let mut tail = 0;
    while device.active_voice_count() > 0 && tail < max_tail {
        samples.extend(device.render_frames(BLOCK_FRAMES));
        tail += BLOCK_FRAMES;
    }
    debug!(loop_frames, tail_frames = tail, "Loop rendered");

    Ok(RenderedLoop {
        samples,
        sample_rate,
        loop_frames,
    })
}

/// Writes a rendered loop as a mono 16-bit WAV file. Samples outside -1 to 1 are clipped.
pub fn write_wav(path: &Path, rendered: &RenderedLoop) -> Result<(), ExportError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: rendered.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for sample in rendered.samples.iter() {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Renders the project's pattern and writes it to the given path.
pub fn export_loop(
    project: &Project,
    options: &ExportOptions,
    path: &Path,
) -> Result<RenderedLoop, ExportError> {
    let rendered = render_loop(project, options)?;
    write_wav(path, &rendered)?;
    info!(
        path = %path.display(),
        frames = rendered.samples.len(),
        "Loop exported"
    );
    Ok(rendered)
}
