//! PolyGlot opening book.
//!
//! A book file is a sequence of 16-byte big-endian records `{key, move,
//! weight, learn}` sorted by key. The whole file is loaded up front,
//! byte-swapped, and probed with a binary search on the position key; among
//! the entries for a position, one move is drawn with probability
//! proportional to its weight.
//!
//! The key is the engine's regular zobrist hash: shakmaty hashes with the
//! PolyGlot constants, including the conditional en-passant rule (the file
//! is only hashed when an enemy pawn can actually capture).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shakmaty::{Chess, Move, Position, Role, Square};
use std::fs;
use std::path::Path;

use crate::engine::position_hash;

#[derive(Debug, thiserror::Error)]
pub enum BookError {
    /// The book file could not be read.
    #[error("could not read book file: {0}")]
    Io(#[from] std::io::Error),

    /// The file length is not a multiple of the 16-byte record size.
    #[error("book file is truncated: {len} bytes is not a multiple of 16")]
    Truncated { len: usize },
}

/// One 16-byte book record, in host byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookEntry {
    pub key: u64,
    pub mv: u16,
    pub weight: u16,
    pub learn: u32,
}

impl BookEntry {
    pub const SIZE: usize = 16;

    /// Decode one record from its big-endian on-disk form.
    pub fn from_bytes(buf: &[u8; Self::SIZE]) -> Self {
        BookEntry {
            key: u64::from_be_bytes(buf[0..8].try_into().unwrap()),
            mv: u16::from_be_bytes(buf[8..10].try_into().unwrap()),
            weight: u16::from_be_bytes(buf[10..12].try_into().unwrap()),
            learn: u32::from_be_bytes(buf[12..16].try_into().unwrap()),
        }
    }

    /// Encode the record back to its on-disk form.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..8].copy_from_slice(&self.key.to_be_bytes());
        buf[8..10].copy_from_slice(&self.mv.to_be_bytes());
        buf[10..12].copy_from_slice(&self.weight.to_be_bytes());
        buf[12..16].copy_from_slice(&self.learn.to_be_bytes());
        buf
    }
}

pub struct OpeningBook {
    entries: Vec<BookEntry>,
    rng: StdRng,
}

impl OpeningBook {
    /// Load a book from a PolyGlot file, with a random selection seed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BookError> {
        Self::load(path, StdRng::from_entropy())
    }

    /// Load a book with a fixed selection seed, for reproducible play.
    pub fn with_seed<P: AsRef<Path>>(path: P, seed: u64) -> Result<Self, BookError> {
        Self::load(path, StdRng::seed_from_u64(seed))
    }

    fn load<P: AsRef<Path>>(path: P, rng: StdRng) -> Result<Self, BookError> {
        let data = fs::read(path)?;
        if data.len() % BookEntry::SIZE != 0 {
            return Err(BookError::Truncated { len: data.len() });
        }

        let mut entries: Vec<BookEntry> = data
            .chunks_exact(BookEntry::SIZE)
            .map(|chunk| BookEntry::from_bytes(chunk.try_into().unwrap()))
            .collect();
        // The format requires sorted keys; sort anyway so a sloppy book
        // still probes correctly.
        entries.sort_by_key(|e| e.key);

        Ok(OpeningBook { entries, rng })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Probe the book for the current position.
    ///
    /// Returns a weighted-random legal book move, or `None` when the
    /// position is not in the book or its entries do not survive the
    /// legality check (book lines can be stale after transpositions).
    pub fn probe(&mut self, pos: &Chess) -> Option<Move> {
        let key = position_hash(pos);

        let start = self.entries.partition_point(|e| e.key < key);
        let count = self.entries[start..]
            .iter()
            .take_while(|e| e.key == key)
            .count();
        let matches = &self.entries[start..start + count];
        if matches.is_empty() {
            return None;
        }

        let total: u64 = matches.iter().map(|e| u64::from(e.weight)).sum();
        if total == 0 {
            return None;
        }

        let mut pick = self.rng.gen_range(0..total);
        for entry in matches {
            let weight = u64::from(entry.weight);
            if pick < weight {
                return decode_move(entry.mv, pos);
            }
            pick -= weight;
        }
        None
    }
}

/// Resolve a 16-bit PolyGlot move against the current legal moves.
///
/// Bits 0-5 hold the to-square, bits 6-11 the from-square, bits 12-14 the
/// promotion piece (0 none, then N, B, R, Q). Castling is encoded as the
/// king moving onto its own rook's square. Entries that match no legal move
/// are rejected.
fn decode_move(raw: u16, pos: &Chess) -> Option<Move> {
    let to = Square::new(u32::from(raw) & 0x3F);
    let from = Square::new((u32::from(raw) >> 6) & 0x3F);
    let promotion = match (raw >> 12) & 0x7 {
        1 => Some(Role::Knight),
        2 => Some(Role::Bishop),
        3 => Some(Role::Rook),
        4 => Some(Role::Queen),
        _ => None,
    };

    pos.legal_moves()
        .iter()
        .find(|mv| match mv {
            Move::Castle { king, rook } => {
                promotion.is_none() && *king == from && *rook == to
            }
            _ => mv.from() == Some(from) && mv.to() == to && mv.promotion() == promotion,
        })
        .cloned()
}
