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
use std::{collections::HashMap, sync::Arc};

use crate::audio::DecodedBuffer;

/// Decoded buffers keyed by pad id. Inserting replaces; there is no automatic eviction.
#[derive(Default)]
pub struct BufferStore {
    buffers: HashMap<String, Arc<DecodedBuffer>>,
}

impl BufferStore {
    /// Creates an empty store.
    pub fn new() -> BufferStore {
        BufferStore::default()
    }

    /// Stores the buffer for the given pad, returning the buffer it replaced.
    pub fn insert(&mut self, pad_id: &str, buffer: Arc<DecodedBuffer>) -> Option<Arc<DecodedBuffer>> {
        self.buffers.insert(pad_id.to_string(), buffer)
    }

    /// Gets the buffer for the given pad.
    pub fn get(&self, pad_id: &str) -> Option<Arc<DecodedBuffer>> {
        self.buffers.get(pad_id).cloned()
    }

    /// Returns true if the pad has a buffer.
    pub fn contains(&self, pad_id: &str) -> bool {
        self.buffers.contains_key(pad_id)
    }

    /// Removes the buffer for the given pad.
    pub fn clear(&mut self, pad_id: &str) -> Option<Arc<DecodedBuffer>> {
        self.buffers.remove(pad_id)
    }

    /// The number of stored buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns true if no buffers are stored.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Approximate memory held by all stored buffers in bytes.
    pub fn memory_usage(&self) -> usize {
        self.buffers.values().map(|buffer| buffer.memory_size()).sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn buffer(frames: usize) -> Arc<DecodedBuffer> {
        Arc::new(DecodedBuffer::new(vec![vec![0.0; frames]], 44100).unwrap())
    }

    #[test]
    fn test_insert_replace_clear() {
        let mut store = BufferStore::new();
        assert!(store.is_empty());
        assert!(store.get("pad-0").is_none());

        assert!(store.insert("pad-0", buffer(10)).is_none());
        assert!(store.contains("pad-0"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.memory_usage(), 40);

        let replaced = store.insert("pad-0", buffer(20)).unwrap();
        assert_eq!(replaced.frames(), 10);
        assert_eq!(store.get("pad-0").unwrap().frames(), 20);

        assert!(store.clear("pad-0").is_some());
        assert!(!store.contains("pad-0"));
        assert!(store.clear("pad-0").is_none());
    }

    #[test]
    fn test_replacing_keeps_existing_handles() {
        let mut store = BufferStore::new();
        store.insert("pad-1", buffer(10));
        let held = store.get("pad-1").unwrap();

        store.insert("pad-1", buffer(30));
        assert_eq!(held.frames(), 10);
        assert_eq!(store.get("pad-1").unwrap().frames(), 30);
    }
}
