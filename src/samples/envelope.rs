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
//! Attack/decay amplitude envelope for a single voice.

/// The level a decay ramps down to. The envelope is held here until the voice stops.
pub const ENVELOPE_FLOOR: f32 = 0.0001;

/// A linear attack/decay envelope anchored at an absolute clock time: 0 at `start`, a linear
/// ramp to `peak` at `start + attack`, a linear ramp down to [ENVELOPE_FLOOR] at
/// `start + attack + decay`, then held at the floor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    start: f64,
    attack: f64,
    decay: f64,
    peak: f32,
}

impl Envelope {
    /// Creates a new envelope.
    pub fn new(start: f64, attack: f64, decay: f64, peak: f32) -> Envelope {
        Envelope {
            start,
            attack,
            decay,
            peak,
        }
    }

    /// The time at which the envelope reaches its peak.
    pub fn peak_time(&self) -> f64 {
        self.start + self.attack
    }

    /// The time at which the envelope reaches the floor.
    pub fn end_time(&self) -> f64 {
        self.start + self.attack + self.decay
    }

    /// The gain at the given clock time.
    pub fn value_at(&self, time: f64) -> f32 {
        if time < self.start {
            return 0.0;
        }

        let elapsed = time - self.start;
        if elapsed < self.attack {
            return self.peak * (elapsed / self.attack) as f32;
        }

        let decaying = elapsed - self.attack;
        if decaying < self.decay {
            let progress = (decaying / self.decay) as f32;
            return self.peak + (ENVELOPE_FLOOR - self.peak) * progress;
        }

        ENVELOPE_FLOOR
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_shape() {
        let envelope = Envelope::new(1.0, 0.1, 0.4, 0.8);

        assert_eq!(envelope.value_at(0.5), 0.0);
        assert_eq!(envelope.value_at(1.0), 0.0);
        assert_close(envelope.value_at(1.05), 0.4);
        assert_close(envelope.value_at(1.1), 0.8);
        assert_close(envelope.value_at(1.3), 0.8 + (ENVELOPE_FLOOR - 0.8) * 0.5);
        assert_close(envelope.value_at(1.5), ENVELOPE_FLOOR);
        assert_close(envelope.value_at(30.0), ENVELOPE_FLOOR);

        assert!((envelope.peak_time() - 1.1).abs() < 1e-12);
        assert!((envelope.end_time() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_attack_starts_at_peak() {
        let envelope = Envelope::new(2.0, 0.0, 0.2, 1.0);
        assert_eq!(envelope.value_at(1.999), 0.0);
        assert_close(envelope.value_at(2.0), 1.0);
        assert_close(envelope.value_at(2.1), 0.5 + ENVELOPE_FLOOR * 0.5);
    }

    #[test]
    fn test_zero_attack_and_decay() {
        let envelope = Envelope::new(0.0, 0.0, 0.0, 1.0);
        assert_close(envelope.value_at(0.0), ENVELOPE_FLOOR);
        assert_close(envelope.value_at(1.0), ENVELOPE_FLOOR);
    }
}
