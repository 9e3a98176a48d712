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
//! Binds the scheduler to the pattern, the pads and the renderer.
use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, span, warn, Level, Span};

use crate::{
    audio::{decode, Clock, DecodedBuffer, Device},
    pads::{default_pads, Pad, PadPatch, SampleMeta},
    samples::{
        player::{Renderer, SamplePlayer},
        BufferStore,
    },
};

use super::{
    pattern::Pattern,
    scheduler::{Scheduler, SchedulerSettings, Step},
    transport::{clamp_bars, clamp_bpm, Transport},
    SessionError,
};

/// Everything a session plays: the pads, the pattern and the transport.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub pads: Vec<Pad>,
    pub pattern: Pattern,
    pub transport: Transport,
}

impl Default for SessionState {
    fn default() -> Self {
        let transport = Transport::default();
        SessionState {
            pads: default_pads(),
            pattern: Pattern::new(transport.pattern_length()),
            transport,
        }
    }
}

impl SessionState {
    /// Gets the pad with the given id.
    pub fn pad(&self, id: &str) -> Option<&Pad> {
        self.pads.iter().find(|pad| pad.id == id)
    }

    fn pad_mut(&mut self, id: &str) -> Result<&mut Pad, SessionError> {
        self.pads
            .iter_mut()
            .find(|pad| pad.id == id)
            .ok_or_else(|| SessionError::UnknownPad(id.to_string()))
    }
}

/// Reads the device clock for the scheduler.
struct DeviceClock(Arc<dyn Device>);

impl Clock for DeviceClock {
    fn current_time(&self) -> f64 {
        self.0.current_time()
    }
}

/// A running sampler: pads, pattern, transport and their buffers, played through one device.
///
/// The scheduler callback locks the scheduler state first and the session state second, so
/// nothing here calls into the scheduler while holding the session state.
pub struct Session {
    device: Arc<dyn Device>,
    renderer: Arc<dyn Renderer>,
    state: Arc<RwLock<SessionState>>,
    buffers: Arc<RwLock<BufferStore>>,
    current_step: Arc<AtomicUsize>,
    scheduler: Mutex<Scheduler>,
    span: Span,
}

impl Session {
    /// Creates a session that plays through the device's own mixer.
    pub fn new(device: Arc<dyn Device>, settings: SchedulerSettings, state: SessionState) -> Session {
        let renderer = Arc::new(SamplePlayer::new(device.voices()));
        Session::with_renderer(device, renderer, settings, state)
    }

    /// Creates a session that plays through the given renderer. The transport is clamped into
    /// range, stopped, and the pattern length made to match it.
    pub fn with_renderer(
        device: Arc<dyn Device>,
        renderer: Arc<dyn Renderer>,
        settings: SchedulerSettings,
        mut state: SessionState,
    ) -> Session {
        state.transport.playing = false;
        state.transport.bpm = clamp_bpm(state.transport.bpm);
        state.transport.bars = clamp_bars(state.transport.bars);
        let length = state.transport.pattern_length();
        if state.pattern.length() != length {
            warn!(
                pattern_length = state.pattern.length(),
                length, "Pattern length doesn't match the transport, resizing"
            );
            state.pattern.set_length(length);
        }
        let transport = state.transport.clone();

        let state = Arc::new(RwLock::new(state));
        let buffers = Arc::new(RwLock::new(BufferStore::new()));
        let current_step = Arc::new(AtomicUsize::new(0));

        let scheduler = {
            let state = state.clone();
            let buffers = buffers.clone();
            let renderer = renderer.clone();
            let current_step = current_step.clone();
            Scheduler::new(
                Arc::new(DeviceClock(device.clone())),
                settings,
                move |step| trigger_step(step, &state, &buffers, renderer.as_ref(), &current_step),
            )
        };
        scheduler.set(transport.bpm, transport.steps_per_bar, transport.bars);

        Session {
            device,
            renderer,
            state,
            buffers,
            current_step,
            scheduler: Mutex::new(scheduler),
            span: span!(Level::INFO, "session"),
        }
    }

    /// Resumes the device and starts the transport from the first step.
    pub fn start(&self) -> Result<(), SessionError> {
        let _enter = self.span.enter();
        self.device.resume()?;
        self.scheduler.lock().start()?;

        let mut state = self.state.write();
        state.transport.playing = true;
        info!(
            bpm = state.transport.bpm,
            steps_per_bar = state.transport.steps_per_bar,
            bars = state.transport.bars,
            "Transport started"
        );
        Ok(())
    }

    /// Stops the transport. Voices already scheduled keep playing.
    pub fn stop(&self) {
        let _enter = self.span.enter();
        self.scheduler.lock().stop();
        self.state.write().transport.playing = false;
        info!("Transport stopped");
    }

    /// Starts the transport if it's stopped, stops it otherwise. Returns true if it's now
    /// playing.
    pub fn toggle_playback(&self) -> Result<bool, SessionError> {
        if self.is_playing() {
            self.stop();
            Ok(false)
        } else {
            self.start()?;
            Ok(true)
        }
    }

    /// Runs one scheduler poll now. Returns the number of steps committed.
    pub fn tick(&self) -> usize {
        self.scheduler.lock().tick()
    }

    /// Sets the tempo, clamped into the supported range. Returns the tempo in effect.
    pub fn set_tempo(&self, bpm: f64) -> f64 {
        let bpm = clamp_bpm(bpm);
        let transport = {
            let mut state = self.state.write();
            state.transport.bpm = bpm;
            state.transport.clone()
        };
        self.apply_timing(&transport);
        bpm
    }

    /// Sets the bar count, clamped into the supported range, and resizes the pattern to match.
    /// Returns the bar count in effect.
    pub fn set_bars(&self, bars: usize) -> usize {
        let bars = clamp_bars(bars);
        let transport = {
            let mut state = self.state.write();
            state.transport.bars = bars;
            let length = state.transport.pattern_length();
            state.pattern.set_length(length);
            state.transport.clone()
        };
        self.apply_timing(&transport);
        bars
    }

    /// Sets the number of steps in a bar and resizes the pattern to match. Zero is accepted and
    /// leaves a single silent step.
    pub fn set_steps_per_bar(&self, steps_per_bar: usize) {
        let transport = {
            let mut state = self.state.write();
            state.transport.steps_per_bar = steps_per_bar;
            let length = state.transport.pattern_length();
            state.pattern.set_length(length);
            state.transport.clone()
        };
        self.apply_timing(&transport);
    }

    /// Stores the swing amount, clamped to 0 to 1. Step timing ignores it.
    pub fn set_swing(&self, swing: f64) {
        self.state.write().transport.swing = if swing.is_nan() {
            0.0
        } else {
            swing.clamp(0.0, 1.0)
        };
    }

    fn apply_timing(&self, transport: &Transport) {
        self.scheduler
            .lock()
            .set(transport.bpm, transport.steps_per_bar, transport.bars);
    }

    /// Toggles a pad at a step. Returns true if the pad now triggers there.
    pub fn toggle_step(&self, step: usize, pad_id: &str) -> Result<bool, SessionError> {
        let mut state = self.state.write();
        let length = state.pattern.length();
        if step >= length {
            return Err(SessionError::StepOutOfRange { step, length });
        }
        state.pad(pad_id).ok_or_else(|| SessionError::UnknownPad(pad_id.to_string()))?;
        Ok(state.pattern.toggle(step, pad_id))
    }

    /// Replaces the pattern. Its length is forced to match the transport.
    pub fn set_pattern(&self, mut pattern: Pattern) {
        let mut state = self.state.write();
        let length = state.transport.pattern_length();
        if pattern.length() != length {
            warn!(
                pattern_length = pattern.length(),
                length, "Pattern length doesn't match the transport, resizing"
            );
            pattern.set_length(length);
        }
        state.pattern = pattern;
    }

    /// Applies a partial update to a pad.
    pub fn update_pad(&self, id: &str, patch: PadPatch) -> Result<(), SessionError> {
        let mut state = self.state.write();
        state.pad_mut(id)?.apply(patch);
        debug!(pad = id, "Pad updated");
        Ok(())
    }

    /// Sets a pad's trim window. Playback starts at the trim start.
    pub fn set_trim(&self, id: &str, start: f64, end: f64) -> Result<(), SessionError> {
        let mut state = self.state.write();
        state.pad_mut(id)?.set_trim(start, end);
        Ok(())
    }

    /// Plays a pad now, whether or not it's muted. Returns false if the pad has no sample.
    pub fn trigger_pad(&self, id: &str) -> Result<bool, SessionError> {
        let _enter = self.span.enter();
        let options = self
            .state
            .read()
            .pad(id)
            .map(Pad::playback_options)
            .ok_or_else(|| SessionError::UnknownPad(id.to_string()))?;
        let Some(buffer) = self.buffers.read().get(id) else {
            debug!(pad = id, "Pad has no sample, not triggering");
            return Ok(false);
        };

        self.device.resume()?;
        self.renderer
            .play_buffer(&buffer, self.device.current_time(), &options);
        Ok(true)
    }

    /// Decodes the given bytes and loads them into a pad. The file name is used as the sample
    /// name and as a format hint. A pad without a trim end gets one at the end of the sample.
    pub async fn load_sample(
        &self,
        id: &str,
        bytes: Vec<u8>,
        name: &str,
    ) -> Result<SampleMeta, SessionError> {
        if self.state.read().pad(id).is_none() {
            return Err(SessionError::UnknownPad(id.to_string()));
        }

        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string);
        let buffer = decode::decode(bytes, extension).await?;
        self.set_buffer(id, name, buffer)
    }

    /// Loads an already decoded buffer into a pad.
    pub fn set_buffer(
        &self,
        id: &str,
        name: &str,
        buffer: DecodedBuffer,
    ) -> Result<SampleMeta, SessionError> {
        let meta = SampleMeta {
            id: id.to_string(),
            name: name.to_string(),
            duration: buffer.duration(),
            sample_rate: buffer.sample_rate(),
            url: None,
        };

        {
            let mut state = self.state.write();
            let pad = state.pad_mut(id)?;
            pad.sample = Some(meta.clone());
            if pad.trim_end.is_none() {
                pad.trim_end = Some(meta.duration);
            }
        }
        self.buffers.write().insert(id, Arc::new(buffer));

        info!(
            pad = id,
            sample = name,
            duration = meta.duration,
            sample_rate = meta.sample_rate,
            "Sample loaded"
        );
        Ok(meta)
    }

    /// Removes a pad's sample. Voices already playing it are unaffected.
    pub fn clear_sample(&self, id: &str) -> Result<(), SessionError> {
        self.state.write().pad_mut(id)?.sample = None;
        self.buffers.write().clear(id);
        Ok(())
    }

    /// The position of the most recently committed step within its bar.
    pub fn current_step(&self) -> usize {
        self.current_step.load(Ordering::Acquire)
    }

    /// Returns true while the transport is running.
    pub fn is_playing(&self) -> bool {
        self.state.read().transport.playing
    }

    /// A copy of the pads, pattern and transport.
    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    /// A copy of the pads.
    pub fn pads(&self) -> Vec<Pad> {
        self.state.read().pads.clone()
    }

    /// A copy of the pattern.
    pub fn pattern(&self) -> Pattern {
        self.state.read().pattern.clone()
    }

    /// A copy of the transport.
    pub fn transport(&self) -> Transport {
        self.state.read().transport.clone()
    }

    /// Returns true if the pad has a decoded buffer.
    pub fn has_buffer(&self, id: &str) -> bool {
        self.buffers.read().contains(id)
    }

    /// The device this session plays through.
    pub fn device(&self) -> Arc<dyn Device> {
        self.device.clone()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.scheduler.lock().stop();
    }
}

/// Plays every pad active at a committed step.
fn trigger_step(
    step: Step,
    state: &RwLock<SessionState>,
    buffers: &RwLock<BufferStore>,
    renderer: &dyn Renderer,
    current_step: &AtomicUsize,
) {
    current_step.store(step.step_in_bar, Ordering::Release);

    let state = state.read();
    for id in state.pattern.pads_at(step.index) {
        let Some(pad) = state.pad(id) else {
            debug!(pad = id, step = step.index, "Unknown pad in pattern, skipping");
            continue;
        };
        if pad.muted {
            debug!(pad = id, step = step.index, "Pad is muted, skipping");
            continue;
        }
        let Some(buffer) = buffers.read().get(id) else {
            debug!(pad = id, step = step.index, "Pad has no sample, skipping");
            continue;
        };
        renderer.play_buffer(&buffer, step.when, &pad.playback_options());
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::{audio::mock, samples::player::PlaybackOptions};

    use super::*;

    #[derive(Default)]
    struct RecordingRenderer {
        calls: Mutex<Vec<(usize, f64, PlaybackOptions)>>,
    }

    impl Renderer for RecordingRenderer {
        fn play_buffer(&self, buffer: &Arc<DecodedBuffer>, when: f64, options: &PlaybackOptions) {
            self.calls.lock().push((buffer.frames(), when, options.clone()));
        }
    }

    struct Fixture {
        device: Arc<mock::Device>,
        renderer: Arc<RecordingRenderer>,
        session: Session,
    }

    fn fixture() -> Fixture {
        let device = Arc::new(mock::Device::offline("mock", 1000, 2, 1.0));
        let renderer = Arc::new(RecordingRenderer::default());
        let settings = SchedulerSettings {
            poll_interval: Duration::from_secs(3600),
            ..Default::default()
        };
        let session = Session::with_renderer(
            device.clone(),
            renderer.clone(),
            settings,
            SessionState::default(),
        );
        Fixture {
            device,
            renderer,
            session,
        }
    }

    fn buffer(frames: usize) -> DecodedBuffer {
        DecodedBuffer::new(vec![vec![0.5; frames]], 1000).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_steps_trigger_renderer() {
        let f = fixture();
        f.session.set_buffer("pad-0", "kick.wav", buffer(500)).unwrap();
        f.session.set_buffer("pad-1", "snare.wav", buffer(300)).unwrap();
        f.session.toggle_step(0, "pad-0").unwrap();
        f.session.toggle_step(4, "pad-1").unwrap();
        f.session.toggle_step(4, "pad-0").unwrap();

        f.session.start().unwrap();
        assert!(f.session.is_playing());
        f.session.tick();
        f.device.advance(Duration::from_millis(500));
        f.session.tick();

        let calls = f.renderer.calls.lock();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, 500);
        assert_close(calls[0].1, 0.06);
        // Pads at one step trigger in pattern order.
        assert_eq!(calls[1].0, 300);
        assert_eq!(calls[2].0, 500);
        assert_close(calls[1].1, 0.06 + 4.0 * 0.125);
        assert_close(calls[2].1, 0.06 + 4.0 * 0.125);

        assert_eq!(calls[0].2.gain, 0.85);
        assert_eq!(calls[0].2.attack, 0.002);
        assert_eq!(calls[0].2.decay, 0.2);
        assert_eq!(calls[0].2.end_offset, Some(0.5));
        assert!(!calls[0].2.looping);
        drop(calls);

        assert_eq!(f.session.current_step(), 4);
        f.session.stop();
        assert!(!f.session.is_playing());
    }

    #[test]
    fn test_muted_and_missing_buffers_are_skipped() {
        let f = fixture();
        f.session.set_buffer("pad-0", "kick.wav", buffer(500)).unwrap();
        f.session
            .update_pad(
                "pad-0",
                PadPatch {
                    muted: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        f.session.toggle_step(0, "pad-0").unwrap();
        f.session.toggle_step(1, "pad-2").unwrap();

        f.session.start().unwrap();
        f.device.advance(Duration::from_secs(2));
        assert!(f.session.tick() > 0);
        assert!(f.renderer.calls.lock().is_empty());
        f.session.stop();
    }

    #[test]
    fn test_unknown_pads_in_pattern_are_skipped() {
        let f = fixture();
        let mut pattern = Pattern::new(16);
        pattern.toggle(0, "pad-99");
        f.session.set_pattern(pattern);

        f.session.start().unwrap();
        f.session.tick();
        assert!(f.renderer.calls.lock().is_empty());
        f.session.stop();
    }

    #[test]
    fn test_stop_stops_triggering() {
        let f = fixture();
        f.session.set_buffer("pad-0", "kick.wav", buffer(100)).unwrap();
        f.session.toggle_step(0, "pad-0").unwrap();
        f.session.start().unwrap();
        f.session.tick();
        assert_eq!(f.renderer.calls.lock().len(), 1);

        f.session.stop();
        f.device.advance(Duration::from_secs(5));
        assert_eq!(f.session.tick(), 0);
        assert_eq!(f.renderer.calls.lock().len(), 1);

        assert!(f.session.toggle_playback().unwrap());
        f.session.tick();
        assert_eq!(f.renderer.calls.lock().len(), 2);
        assert!(!f.session.toggle_playback().unwrap());
    }

    #[test]
    fn test_set_bars_keeps_pattern_length() {
        let f = fixture();
        assert_eq!(f.session.set_bars(4), 4);
        assert_eq!(f.session.pattern().length(), 64);
        assert_eq!(f.session.transport().bars, 4);

        assert_eq!(f.session.set_bars(0), 1);
        assert_eq!(f.session.pattern().length(), 16);
        assert_eq!(f.session.set_bars(20), 8);
        assert_eq!(f.session.pattern().length(), 128);

        f.session.set_steps_per_bar(8);
        assert_eq!(f.session.pattern().length(), 64);
        assert_eq!(f.session.scheduler.lock().total_steps(), 64);
    }

    #[test]
    fn test_tempo_and_swing() {
        let f = fixture();
        assert_eq!(f.session.set_tempo(90.0), 90.0);
        assert_close(f.session.scheduler.lock().step_duration(), 60.0 / 90.0 / 4.0);
        assert_eq!(f.session.set_tempo(10.0), 60.0);
        assert_eq!(f.session.set_tempo(500.0), 200.0);

        f.session.set_swing(0.3);
        assert_eq!(f.session.transport().swing, 0.3);
        f.session.set_swing(4.0);
        assert_eq!(f.session.transport().swing, 1.0);
    }

    #[test]
    fn test_toggle_step_rejects_bad_input() {
        let f = fixture();
        assert!(matches!(
            f.session.toggle_step(16, "pad-0"),
            Err(SessionError::StepOutOfRange {
                step: 16,
                length: 16
            })
        ));
        assert!(matches!(
            f.session.toggle_step(0, "pad-42"),
            Err(SessionError::UnknownPad(_))
        ));
        assert!(f.session.toggle_step(3, "pad-1").unwrap());
        assert!(!f.session.toggle_step(3, "pad-1").unwrap());
    }

    #[test]
    fn test_set_pattern_forces_length() {
        let f = fixture();
        let mut pattern = Pattern::new(32);
        pattern.toggle(2, "pad-3");
        pattern.toggle(20, "pad-3");
        f.session.set_pattern(pattern);

        let pattern = f.session.pattern();
        assert_eq!(pattern.length(), 16);
        assert!(pattern.is_active(2, "pad-3"));
        assert!(pattern.pads_at(20).is_empty());
    }

    #[test]
    fn test_trigger_pad() {
        let f = fixture();
        assert!(!f.session.trigger_pad("pad-0").unwrap());
        assert!(matches!(
            f.session.trigger_pad("nope"),
            Err(SessionError::UnknownPad(_))
        ));

        f.session.set_buffer("pad-0", "kick.wav", buffer(200)).unwrap();
        f.session
            .update_pad(
                "pad-0",
                PadPatch {
                    muted: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(f.session.trigger_pad("pad-0").unwrap());
        assert!(f.device.is_running());

        f.device.advance(Duration::from_millis(100));
        assert!(f.session.trigger_pad("pad-0").unwrap());

        let calls = f.renderer.calls.lock();
        assert_eq!(calls.len(), 2);
        assert_close(calls[0].1, 0.0);
        assert_close(calls[1].1, 0.1);
    }

    #[test]
    fn test_set_buffer_records_sample() {
        let f = fixture();
        let meta = f.session.set_buffer("pad-2", "hat.wav", buffer(250)).unwrap();
        assert_eq!(meta.name, "hat.wav");
        assert_close(meta.duration, 0.25);
        assert_eq!(meta.sample_rate, 1000);
        assert!(f.session.has_buffer("pad-2"));

        let pads = f.session.pads();
        assert_eq!(pads[2].sample, Some(meta));
        assert_eq!(pads[2].trim_end, Some(0.25));

        f.session.set_trim("pad-2", 0.05, 0.1).unwrap();
        f.session.set_buffer("pad-2", "hat2.wav", buffer(500)).unwrap();
        assert_eq!(f.session.pads()[2].trim_end, Some(0.1));

        f.session.clear_sample("pad-2").unwrap();
        assert!(!f.session.has_buffer("pad-2"));
        assert!(f.session.pads()[2].sample.is_none());
        assert!(matches!(
            f.session.clear_sample("pad-9"),
            Err(SessionError::UnknownPad(_))
        ));
    }

    #[tokio::test]
    async fn test_load_sample() {
        let f = fixture();
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("clap.wav");
        crate::testutil::write_wav(path.clone(), vec![vec![0.25f32; 4410]], 44100).unwrap();
        let bytes = std::fs::read(&path).unwrap();

        let meta = f.session.load_sample("pad-5", bytes, "clap.wav").await.unwrap();
        assert_eq!(meta.sample_rate, 44100);
        assert!((meta.duration - 0.1).abs() < 1e-6);
        assert!(f.session.has_buffer("pad-5"));
        assert_eq!(f.session.pads()[5].trim_end, Some(meta.duration));

        assert!(matches!(
            f.session.load_sample("pad-5", vec![1, 2, 3], "junk.wav").await,
            Err(SessionError::Decode(_))
        ));
        assert!(matches!(
            f.session.load_sample("pad-77", Vec::new(), "none.wav").await,
            Err(SessionError::UnknownPad(_))
        ));
    }

    #[test]
    fn test_new_normalizes_state() {
        let device = Arc::new(mock::Device::offline("mock", 1000, 2, 1.0));
        let mut state = SessionState::default();
        state.transport.playing = true;
        state.transport.bpm = 400.0;
        state.transport.bars = 2;
        let session = Session::new(device, SchedulerSettings::default(), state);

        let transport = session.transport();
        assert!(!transport.playing);
        assert_eq!(transport.bpm, 200.0);
        assert_eq!(session.pattern().length(), 32);
        assert_eq!(session.snapshot().pads.len(), 8);
    }
}
