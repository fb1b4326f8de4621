//! Transposition Table
//!
//! A fixed-size, direct-mapped hash table that stores previously searched
//! positions to avoid redundant work and improve move ordering.

use shakmaty::Move;

/// Entry type in the transposition table
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum TTFlag {
    /// Exact score
    Exact = 0,
    /// Lower bound (beta cutoff)
    LowerBound = 1,
    /// Upper bound (failed low)
    UpperBound = 2,
}

/// A single entry in the transposition table
#[derive(Clone)]
pub struct TTEntry {
    /// Zobrist hash key (for verification; 0 marks an empty slot)
    pub key: u64,
    /// Best move found, if any
    pub best_move: Option<Move>,
    /// Search depth the score was obtained at
    pub depth: u8,
    /// Score, already mate-adjusted by the caller
    pub score: i16,
    /// Entry type
    pub flag: TTFlag,
    /// Generation of the search that wrote the entry
    pub generation: u8,
}

impl TTEntry {
    pub const EMPTY: TTEntry = TTEntry {
        key: 0,
        best_move: None,
        depth: 0,
        score: 0,
        flag: TTFlag::Exact,
        generation: 0,
    };
}

/// Transposition table
pub struct TranspositionTable {
    entries: Vec<TTEntry>,
    size: usize,
    generation: u8,
}

impl TranspositionTable {
    /// Create a new transposition table with the given size in MB
    pub fn new(size_mb: usize) -> Self {
        let size = Self::slot_count(size_mb);
        TranspositionTable {
            entries: vec![TTEntry::EMPTY; size],
            size,
            generation: 0,
        }
    }

    /// Like [`new`](Self::new), but reports allocation failure instead of
    /// aborting, so a caller can keep its previous table.
    pub fn try_new(size_mb: usize) -> Option<Self> {
        let size = Self::slot_count(size_mb);
        let mut entries = Vec::new();
        entries.try_reserve_exact(size).ok()?;
        entries.resize(size, TTEntry::EMPTY);
        Some(TranspositionTable {
            entries,
            size,
            generation: 0,
        })
    }

    fn slot_count(size_mb: usize) -> usize {
        let entry_size = std::mem::size_of::<TTEntry>();
        let num_entries = (size_mb.max(1) * 1024 * 1024) / entry_size;
        // Round down to power of 2 for efficient indexing
        num_entries.next_power_of_two() / 2
    }

    /// Number of slots in the table
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Get the index for a hash key
    #[inline]
    fn index(&self, key: u64) -> usize {
        (key as usize) & (self.size - 1)
    }

    /// Probe the table for an entry
    pub fn probe(&self, key: u64) -> Option<&TTEntry> {
        let entry = &self.entries[self.index(key)];
        if entry.key == key {
            Some(entry)
        } else {
            None
        }
    }

    /// Store an entry in the table.
    ///
    /// The slot is overwritten if it is empty, belongs to an earlier search
    /// (stale generation), or the new entry was searched at least as deep.
    /// Mate scores must be adjusted to distance-from-node by the caller
    /// before storing.
    pub fn store(
        &mut self,
        key: u64,
        best_move: Option<Move>,
        depth: u8,
        score: i16,
        flag: TTFlag,
    ) {
        let idx = self.index(key);
        let entry = &mut self.entries[idx];

        let should_replace =
            entry.key == 0 || entry.generation != self.generation || depth >= entry.depth;

        if should_replace {
            *entry = TTEntry {
                key,
                best_move,
                depth,
                score,
                flag,
                generation: self.generation,
            };
        }
    }

    /// Clear the table
    pub fn clear(&mut self) {
        self.entries.fill(TTEntry::EMPTY);
        self.generation = 0;
    }

    /// Increment the generation counter (call at the start of each search)
    pub fn new_search(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Hint the CPU to pull the slot for `key` into cache ahead of a probe.
    #[inline]
    pub fn prefetch(&self, key: u64) {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
            let ptr = self.entries.as_ptr().add(self.index(key));
            _mm_prefetch::<_MM_HINT_T0>(ptr as *const i8);
        }
        #[cfg(not(target_arch = "x86_64"))]
        let _ = key;
    }

    /// Get the fill rate in permille, sampled over the first slots
    pub fn hashfull(&self) -> usize {
        let sample_size = 1000.min(self.size);
        let used = self.entries[..sample_size]
            .iter()
            .filter(|e| e.key != 0)
            .count();
        (used * 1000) / sample_size
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new(64)
    }
}
