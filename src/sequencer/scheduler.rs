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
//! Look-ahead step scheduler.
//!
//! A timer thread polls the audio clock at a coarse interval and, on every poll, commits every
//! step whose start time falls inside a short window ahead of the clock. Each committed step is
//! handed to the callback with its exact clock time, so playback is sample accurate even though
//! the polling is not. If polling falls behind, the next poll fires every overdue step in order.
use std::{sync::Arc, thread, time::Duration};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{audio::Clock, playsync::CancelHandle};

use super::SessionError;

/// How far ahead of the clock steps are committed, in seconds.
pub const DEFAULT_HORIZON: f64 = 0.10;

/// Delay between starting the scheduler and the first step, in seconds.
pub const DEFAULT_START_DELAY: f64 = 0.06;

/// How often the timer thread polls the clock.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Timing knobs for the scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerSettings {
    /// Look-ahead window in seconds.
    pub horizon: f64,
    /// Delay before the first step in seconds.
    pub start_delay: f64,
    /// Interval between polls.
    pub poll_interval: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        SchedulerSettings {
            horizon: DEFAULT_HORIZON,
            start_delay: DEFAULT_START_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// A committed step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    /// Clock time at which the step plays.
    pub when: f64,
    /// Position within the bar, for the step cursor.
    pub step_in_bar: usize,
    /// Absolute step index within the pattern.
    pub index: usize,
}

/// The duration of one step. Four steps per bar is one step per beat. Tempos or resolutions
/// that don't produce a positive duration never advance.
pub fn step_duration(bpm: f64, steps_per_bar: usize) -> f64 {
    let duration = 60.0 / bpm / (steps_per_bar as f64 / 4.0);
    if duration.is_nan() || duration <= 0.0 {
        return f64::INFINITY;
    }
    duration
}

/// The scheduler's timing state, independent of any thread or clock.
#[derive(Clone, Debug)]
pub struct StepClock {
    bpm: f64,
    steps_per_bar: usize,
    bars: usize,
    total_steps: usize,
    next_time: f64,
    step_index: usize,
    horizon: f64,
}

impl StepClock {
    /// Creates a step clock at 120 bpm, 16 steps, 1 bar.
    pub fn new(horizon: f64) -> StepClock {
        StepClock {
            bpm: 120.0,
            steps_per_bar: 16,
            bars: 1,
            total_steps: 16,
            next_time: 0.0,
            step_index: 0,
            horizon,
        }
    }

    /// Updates tempo and resolution. The step index wraps into the new pattern length.
    pub fn set(&mut self, bpm: f64, steps_per_bar: usize, bars: usize) {
        self.bpm = bpm;
        self.steps_per_bar = steps_per_bar;
        self.bars = bars;
        self.total_steps = steps_per_bar.saturating_mul(bars).max(1);
        self.step_index %= self.total_steps;
    }

    /// Rewinds to the first step, which plays `start_delay` after `now`.
    pub fn reset(&mut self, now: f64, start_delay: f64) {
        self.step_index = 0;
        self.next_time = now + start_delay;
    }

    /// Rewinds to the first step.
    pub fn rewind(&mut self) {
        self.step_index = 0;
    }

    /// Commits every step that starts before `now + horizon`. Returns the number committed.
    pub fn poll(&mut self, now: f64, callback: &mut dyn FnMut(Step)) -> usize {
        let step_duration = self.step_duration();
        let mut fired = 0;
        while self.next_time < now + self.horizon {
            callback(Step {
                when: self.next_time,
                step_in_bar: self.step_index % self.steps_per_bar.max(1),
                index: self.step_index,
            });
            self.next_time += step_duration;
            self.step_index = (self.step_index + 1) % self.total_steps;
            fired += 1;
        }
        fired
    }

    /// The duration of one step at the current tempo.
    pub fn step_duration(&self) -> f64 {
        step_duration(self.bpm, self.steps_per_bar)
    }

    /// Steps in the pattern, at least one.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// The next step to be committed.
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// Clock time of the next step.
    pub fn next_time(&self) -> f64 {
        self.next_time
    }
}

/// The step callback.
pub type StepCallback = Box<dyn FnMut(Step) + Send>;

struct Inner {
    steps: StepClock,
    running: bool,
    callback: StepCallback,
}

/// The timer thread and its cancel handle.
struct Poller {
    cancel_handle: CancelHandle,
    join: thread::JoinHandle<()>,
}

/// Drives a [StepClock] from a timer thread against an audio clock.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    inner: Arc<Mutex<Inner>>,
    poller: Option<Poller>,
}

/// Runs one poll if the scheduler is running. The callback runs with the state locked.
fn poll_once(inner: &Mutex<Inner>, clock: &dyn Clock) -> usize {
    let mut inner = inner.lock();
    if !inner.running {
        return 0;
    }
    let now = clock.current_time();
    let Inner {
        steps, callback, ..
    } = &mut *inner;
    steps.poll(now, &mut **callback)
}

impl Scheduler {
    /// Creates a stopped scheduler. The callback runs on the timer thread with the scheduler
    /// state locked, so it must not call back into the scheduler.
    pub fn new<F>(clock: Arc<dyn Clock>, settings: SchedulerSettings, callback: F) -> Scheduler
    where
        F: FnMut(Step) + Send + 'static,
    {
        Scheduler {
            clock,
            settings,
            inner: Arc::new(Mutex::new(Inner {
                steps: StepClock::new(settings.horizon),
                running: false,
                callback: Box::new(callback),
            })),
            poller: None,
        }
    }

    /// Updates tempo and resolution. Valid whether running or not.
    pub fn set(&self, bpm: f64, steps_per_bar: usize, bars: usize) {
        let mut inner = self.inner.lock();
        inner.steps.set(bpm, steps_per_bar, bars);
        debug!(
            bpm,
            steps_per_bar,
            bars,
            total_steps = inner.steps.total_steps(),
            "Scheduler timing updated"
        );
    }

    /// Starts from the first step, `start_delay` from now, and begins polling. Starting a
    /// running scheduler restarts it.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.stop_poller();
        {
            let mut inner = self.inner.lock();
            inner
                .steps
                .reset(self.clock.current_time(), self.settings.start_delay);
            inner.running = true;
        }

        let cancel_handle = CancelHandle::new();
        let spawned = {
            let inner = self.inner.clone();
            let clock = self.clock.clone();
            let cancel_handle = cancel_handle.clone();
            let poll_interval = self.settings.poll_interval;
            thread::Builder::new()
                .name("padseq-scheduler".into())
                .spawn(move || loop {
                    poll_once(&inner, clock.as_ref());
                    if cancel_handle.wait_timeout(poll_interval) {
                        break;
                    }
                })
        };
        let join = match spawned {
            Ok(join) => join,
            Err(e) => {
                self.inner.lock().running = false;
                return Err(e.into());
            }
        };
        self.poller = Some(Poller {
            cancel_handle,
            join,
        });

        let inner = self.inner.lock();
        info!(
            next_time = inner.steps.next_time(),
            step_duration = inner.steps.step_duration(),
            total_steps = inner.steps.total_steps(),
            "Scheduler started"
        );
        Ok(())
    }

    /// Stops polling and rewinds to the first step. No callback fires after this returns.
    pub fn stop(&mut self) {
        self.stop_poller();
        let mut inner = self.inner.lock();
        if inner.running {
            info!("Scheduler stopped");
        }
        inner.running = false;
        inner.steps.rewind();
    }

    fn stop_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel_handle.cancel();
            let _ = poller.join.join();
        }
    }

    /// Runs one poll now. Returns the number of steps committed.
    pub fn tick(&self) -> usize {
        poll_once(&self.inner, self.clock.as_ref())
    }

    /// Returns true while the scheduler is running.
    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    /// The next step to be committed.
    pub fn step_index(&self) -> usize {
        self.inner.lock().steps.step_index()
    }

    /// Clock time of the next step.
    pub fn next_time(&self) -> f64 {
        self.inner.lock().steps.next_time()
    }

    /// The duration of one step at the current tempo.
    pub fn step_duration(&self) -> f64 {
        self.inner.lock().steps.step_duration()
    }

    /// Steps in the pattern, at least one.
    pub fn total_steps(&self) -> usize {
        self.inner.lock().steps.total_steps()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop_poller();
    }
}
