//! Slot arithmetic for a story grid that interleaves non-story slots.
//!
//! With `interval = n` and `initial_offset = k`, positions `k, k + n + 1,
//! k + 2(n + 1), ...` hold non-story slots and every other position maps back
//! to a story index in the local store. An interval of zero disables
//! interleaving entirely.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedLayout {
    interval: u32,
    initial_offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Story(usize),
    Filler,
}

fn div_ceil(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

impl FeedLayout {
    pub fn new(interval: u32, initial_offset: u32) -> Self {
        Self {
            interval,
            initial_offset,
        }
    }

    fn enabled(&self) -> bool {
        self.interval > 0
    }

    /// Total number of grid positions needed to show `stories` stories.
    pub fn slot_count(&self, stories: usize) -> usize {
        let offset = self.initial_offset as usize;
        if !self.enabled() || stories <= offset {
            return stories;
        }
        stories + div_ceil(stories - offset, self.interval as usize)
    }

    pub fn is_story_slot(&self, position: usize) -> bool {
        let offset = self.initial_offset as usize;
        !(self.enabled()
            && position >= offset
            && (position - offset) % (self.interval as usize + 1) == 0)
    }

    /// Index into the story listing for a grid position, or `None` for a filler slot.
    pub fn story_index(&self, position: usize) -> Option<usize> {
        if !self.is_story_slot(position) {
            return None;
        }
        let offset = self.initial_offset as usize;
        if !self.enabled() || position < offset {
            return Some(position);
        }
        Some(position - div_ceil(position - offset, self.interval as usize + 1))
    }

    pub fn slot(&self, position: usize) -> Slot {
        match self.story_index(position) {
            Some(i) => Slot::Story(i),
            None => Slot::Filler,
        }
    }
}
