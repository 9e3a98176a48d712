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
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A step pattern: which pads trigger at which absolute step. Steps at or beyond the length are
/// kept but never scheduled.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    /// Absolute step index to pad ids, in trigger order.
    #[serde(default)]
    steps: BTreeMap<usize, Vec<String>>,
    /// Length of the pattern in steps.
    length: usize,
}

impl Pattern {
    /// Creates an empty pattern of the given length.
    pub fn new(length: usize) -> Pattern {
        Pattern {
            steps: BTreeMap::new(),
            length,
        }
    }

    /// The length of the pattern in steps.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Changes the length. Steps beyond the new length are kept so that growing the pattern
    /// again brings them back.
    pub fn set_length(&mut self, length: usize) {
        self.length = length;
    }

    /// The pad ids that trigger at the given step, in order.
    pub fn pads_at(&self, step: usize) -> &[String] {
        if step >= self.length {
            return &[];
        }
        self.steps.get(&step).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if the pad triggers at the given step.
    pub fn is_active(&self, step: usize, pad_id: &str) -> bool {
        self.pads_at(step).iter().any(|id| id == pad_id)
    }

    /// Toggles the pad at the given step. Returns true if the pad is now active.
    pub fn toggle(&mut self, step: usize, pad_id: &str) -> bool {
        let pads = self.steps.entry(step).or_default();
        let active = match pads.iter().position(|id| id == pad_id) {
            Some(index) => {
                pads.remove(index);
                false
            }
            None => {
                pads.push(pad_id.to_string());
                true
            }
        };
        if pads.is_empty() {
            self.steps.remove(&step);
        }
        active
    }

    /// Removes the pad from every step.
    pub fn remove_pad(&mut self, pad_id: &str) {
        self.steps.retain(|_, pads| {
            pads.retain(|id| id != pad_id);
            !pads.is_empty()
        });
    }

    /// Iterates over every step that triggers at least one pad, including steps beyond the
    /// length.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.steps.iter().map(|(step, pads)| (*step, pads.as_slice()))
    }

    /// Iterates over the schedulable steps that trigger at least one pad.
    pub fn active_steps(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.steps
            .range(..self.length)
            .map(|(step, pads)| (*step, pads.as_slice()))
    }
}
