//! Syzygy endgame tablebase probing.
//!
//! Thin wrapper around shakmaty-syzygy. WDL answers the value question
//! after the last zeroing move; the root probe picks a DTZ-optimal move
//! directly. Probe failures are treated as "no tablebase", never as errors.

use anyhow::Result;
use shakmaty::{Chess, Move, Position};
use shakmaty_syzygy::{Tablebase, Wdl};
use std::path::Path;

/// Result of a WDL probe, from the side to move's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TbWdl {
    Win,
    /// Win that the 50-move rule turns into a draw.
    CursedWin,
    Draw,
    /// Loss that the 50-move rule saves.
    BlessedLoss,
    Loss,
}

pub struct SyzygyTablebase {
    tb: Tablebase<Chess>,
    max_pieces: usize,
    table_count: usize,
}

impl SyzygyTablebase {
    /// Load all tables found in a directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut tb = Tablebase::new();
        let table_count = tb.add_directory(path.as_ref())?;
        let max_pieces = tb.max_pieces();
        Ok(SyzygyTablebase {
            tb,
            max_pieces,
            table_count,
        })
    }

    /// Largest piece count the loaded tables cover.
    pub fn max_pieces(&self) -> usize {
        self.max_pieces
    }

    pub fn table_count(&self) -> usize {
        self.table_count
    }

    /// Whether the position is small enough for the loaded tables.
    pub fn can_probe(&self, pos: &Chess) -> bool {
        pos.board().occupied().count() <= self.max_pieces
    }

    /// Probe WDL for the side to move.
    pub fn probe_wdl(&self, pos: &Chess) -> Option<TbWdl> {
        if !self.can_probe(pos) {
            return None;
        }
        match self.tb.probe_wdl_after_zeroing(pos) {
            Ok(wdl) => Some(match wdl {
                Wdl::Win => TbWdl::Win,
                Wdl::CursedWin => TbWdl::CursedWin,
                Wdl::Draw => TbWdl::Draw,
                Wdl::BlessedLoss => TbWdl::BlessedLoss,
                Wdl::Loss => TbWdl::Loss,
            }),
            Err(_) => None,
        }
    }

    /// Probe DTZ (distance to the next zeroing move) for the side to move.
    pub fn probe_dtz(&self, pos: &Chess) -> Option<i32> {
        if !self.can_probe(pos) {
            return None;
        }
        match self.tb.probe_dtz(pos) {
            Ok(dtz) => Some(dtz.ignore_rounding().0),
            Err(_) => None,
        }
    }

    /// Pick a DTZ-optimal move for the root position, if the tables cover it.
    pub fn probe_root(&self, pos: &Chess) -> Option<Move> {
        if !self.can_probe(pos) {
            return None;
        }
        match self.tb.best_move(pos) {
            Ok(Some((mv, _dtz))) => Some(mv),
            _ => None,
        }
    }
}

/// Map a WDL outcome to a search score. Tablebase wins stay below the mate
/// range so real mate scores always outrank them.
pub fn wdl_to_score(wdl: TbWdl, ply: usize) -> i32 {
    match wdl {
        TbWdl::Win => 20000 - ply as i32,
        TbWdl::CursedWin => 50,
        TbWdl::Draw => 0,
        TbWdl::BlessedLoss => -50,
        TbWdl::Loss => -20000 + ply as i32,
    }
}
