use std::collections::VecDeque;

use crate::settings::RenderSettings;

/// Bounded undo/redo over settings snapshots.
///
/// Every entry is its own copy, so nothing handed out by the history can change
/// what it holds, and the oldest entries fall off once `capacity` is reached.
#[derive(Clone, Debug)]
pub struct SettingsHistory {
    past: VecDeque<RenderSettings>,
    future: Vec<RenderSettings>,
    current: RenderSettings,
    capacity: usize,
}

impl SettingsHistory {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new(initial: RenderSettings) -> Self {
        Self::with_capacity(initial, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(initial: RenderSettings, capacity: usize) -> Self {
        SettingsHistory {
            past: VecDeque::with_capacity(capacity),
            future: Vec::new(),
            current: initial,
            capacity,
        }
    }

    pub fn current(&self) -> &RenderSettings {
        &self.current
    }

    /// Makes `next` current. Drops the redo stack.
    pub fn push(&mut self, next: RenderSettings) {
        if next == self.current {
            return;
        }
        let previous = std::mem::replace(&mut self.current, next);
        self.past.push_back(previous);
        while self.past.len() > self.capacity {
            self.past.pop_front();
        }
        self.future.clear();
    }

    /// Steps back, returning a copy of the new current settings.
    pub fn undo(&mut self) -> Option<RenderSettings> {
        let previous = self.past.pop_back()?;
        let current = std::mem::replace(&mut self.current, previous);
        self.future.push(current);
        Some(self.current.clone())
    }

    /// Steps forward again after an undo.
    pub fn redo(&mut self) -> Option<RenderSettings> {
        let next = self.future.pop()?;
        let current = std::mem::replace(&mut self.current, next);
        self.past.push_back(current);
        Some(self.current.clone())
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_iters(iters: usize) -> RenderSettings {
        RenderSettings {
            max_iterations: iters,
            ..Default::default()
        }
    }

    #[test]
    fn test_undo_redo() {
        let mut h = SettingsHistory::new(with_iters(1));
        h.push(with_iters(2));
        h.push(with_iters(3));
        assert_eq!(h.undo().unwrap().max_iterations, 2);
        assert_eq!(h.undo().unwrap().max_iterations, 1);
        assert!(h.undo().is_none());
        assert_eq!(h.redo().unwrap().max_iterations, 2);
        // A new entry forgets what could be redone.
        h.push(with_iters(9));
        assert!(!h.can_redo());
        assert_eq!(h.undo().unwrap().max_iterations, 2);
    }

    #[test]
    fn test_bounded() {
        let mut h = SettingsHistory::with_capacity(with_iters(0), 3);
        for i in 1..=10 {
            h.push(with_iters(i));
        }
        let mut seen = Vec::new();
        while let Some(s) = h.undo() {
            seen.push(s.max_iterations);
        }
        assert_eq!(seen, vec![9, 8, 7]);
    }

    #[test]
    fn test_copies_are_independent() {
        let mut h = SettingsHistory::new(with_iters(1));
        h.push(with_iters(2));
        let mut taken = h.undo().unwrap();
        taken.max_chunk_sizes[0] = 1;
        taken.max_iterations = 77;
        assert_eq!(h.current(), &with_iters(1));
        assert_eq!(h.redo().unwrap(), with_iters(2));
    }

    #[test]
    fn test_identical_push_is_ignored() {
        let mut h = SettingsHistory::new(with_iters(1));
        h.push(with_iters(1));
        assert!(!h.can_undo());
    }
}
