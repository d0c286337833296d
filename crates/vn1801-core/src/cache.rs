//! The unified L1 cache: 16 lines of 8 words, tag-matched, random eviction
//! among clean lines.

use rand::Rng;

use crate::memory::BLOCK_SIZE;
use crate::word::{word, Word};

/// Number of lines the cache holds.
pub const LINE_COUNT: usize = 16;

/// One cache line: an 8-word block plus its base address and dirty count.
#[derive(Debug, Clone, Copy)]
pub struct L1CacheLine {
    /// Base address of the cached block (`addr & !7`).
    pub tag: i32,
    pub words: [Word; BLOCK_SIZE],
    /// Count of writes to this line not yet confirmed durable by the
    /// memory controller. `writes > 0` means the line is dirty.
    pub writes: u8,
}

impl L1CacheLine {
    #[must_use]
    pub fn dirty(&self) -> bool {
        self.writes > 0
    }
}

/// The L1 cache.
pub struct L1Cache {
    lines: Vec<Option<L1CacheLine>>,
}

impl L1Cache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self { lines: vec![None; LINE_COUNT] }
    }

    fn find(&self, addr: i32) -> Option<usize> {
        self.lines.iter().position(|slot| match slot {
            Some(line) => addr >= line.tag && addr < line.tag + BLOCK_SIZE as i32,
            None => false,
        })
    }

    /// Read the word at `addr` if it is cached.
    #[must_use]
    pub fn read(&self, addr: i32) -> Option<Word> {
        let idx = self.find(addr)?;
        let line = self.lines[idx].as_ref().unwrap();
        Some(line.words[(addr - line.tag) as usize])
    }

    /// Write `w` to `addr` if it is cached: updates the word in place,
    /// increments the line's dirty counter, and reports the line's tag so
    /// the caller can enqueue a `WriteBufferElement`.
    ///
    /// Returns `None` on a miss (the caller must fill the line and retry).
    pub fn write(&mut self, w: Word, addr: i32) -> Option<i32> {
        let idx = self.find(addr)?;
        let line = self.lines[idx].as_mut().unwrap();
        line.words[(addr - line.tag) as usize] = w;
        line.writes += 1;
        Some(line.tag)
    }

    /// Insert a freshly-fetched line, evicting a clean line at random if the
    /// cache is full.
    ///
    /// Returns `false` if the cache is full and every line is dirty (the
    /// caller must wait for the memory controller to drain at least one
    /// dirty line before retrying).
    pub fn add(&mut self, line: L1CacheLine) -> bool {
        if let Some(empty) = self.lines.iter().position(Option::is_none) {
            self.lines[empty] = Some(line);
            return true;
        }

        let clean: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().filter(|l| !l.dirty()).map(|_| i))
            .collect();

        if clean.is_empty() {
            return false;
        }

        let pick = clean[rand::rng().random_range(0..clean.len())];
        self.lines[pick] = Some(line);
        true
    }

    /// Adjust a line's dirty counter by `delta` (the memory controller calls
    /// this with `-1` once a queued write is durable).
    pub fn update_writes(&mut self, addr: i32, delta: i32) {
        if let Some(idx) = self.find(addr) {
            let line = self.lines[idx].as_mut().unwrap();
            line.writes = (i32::from(line.writes) + delta).max(0) as u8;
        }
    }

    /// True if no cache line is dirty (used by tests to assert full drain).
    #[must_use]
    pub fn all_clean(&self) -> bool {
        self.lines.iter().flatten().all(|l| !l.dirty())
    }

    /// Whether there is a clean slot available for eviction right now
    /// (either an empty slot or a non-dirty occupied one).
    #[must_use]
    pub fn has_room(&self) -> bool {
        self.lines.iter().any(|slot| match slot {
            None => true,
            Some(l) => !l.dirty(),
        })
    }
}

impl Default for L1Cache {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a fresh, clean cache line from a memory block.
#[must_use]
pub fn fill_line(tag: i32, block: [Word; BLOCK_SIZE]) -> L1CacheLine {
    L1CacheLine { tag, words: block, writes: 0 }
}
