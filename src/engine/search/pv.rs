//! Principal variation tracking, score formatting and UCI info reporting.

use shakmaty::{CastlingMode, Move};
use std::io::Write;
use std::time::Instant;

use crate::engine::tt::TranspositionTable;

use super::types::{SearchStats, MATE_IN_MAX, MATE_SCORE, MAX_PLY};

/// An ordered line of moves, filled bottom-up as the search finds new best
/// lines: each node prepends its move to the child's line.
#[derive(Clone, Debug, Default)]
pub struct PVLine {
    moves: Vec<Move>,
}

impl PVLine {
    pub fn new() -> Self {
        PVLine { moves: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.moves.clear();
    }

    /// Replace this line with `mv` followed by the child's line.
    pub fn load(&mut self, mv: Move, child: &PVLine) {
        self.moves.clear();
        self.moves.push(mv);
        self.moves.extend(child.moves.iter().cloned());
        self.moves.truncate(MAX_PLY);
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn first(&self) -> Option<&Move> {
        self.moves.first()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// The line in coordinate notation, space separated.
    pub fn to_uci(&self) -> String {
        self.moves
            .iter()
            .map(|m| m.to_uci(CastlingMode::Standard).to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Format a score for UCI output: `cp <x>` or `mate <moves>`.
pub(super) fn format_score(score: i32) -> String {
    if score.abs() >= MATE_IN_MAX {
        let mate_in = if score > 0 {
            (MATE_SCORE - score + 1) / 2
        } else {
            -(MATE_SCORE + score) / 2
        };
        format!("mate {}", mate_in)
    } else {
        format!("cp {}", score)
    }
}

pub(super) fn report_info(
    tt: &TranspositionTable,
    stats: &SearchStats,
    start_time: Instant,
    depth: i32,
    score: i32,
    pv: &PVLine,
) {
    let elapsed = start_time.elapsed();
    let nps = if elapsed.as_millis() > 0 {
        (stats.nodes as u128 * 1000) / elapsed.as_millis()
    } else {
        0
    };
    println!(
        "info depth {} seldepth {} score {} nodes {} nps {} time {} hashfull {} pv {}",
        depth,
        stats.seldepth,
        format_score(score),
        stats.nodes,
        nps,
        elapsed.as_millis(),
        tt.hashfull(),
        pv.to_uci()
    );
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::format_score;
    use super::super::types::MATE_SCORE;

    #[test]
    fn mate_scores_format_in_moves() {
        assert_eq!(format_score(MATE_SCORE - 1), "mate 1");
        assert_eq!(format_score(MATE_SCORE - 3), "mate 2");
        assert_eq!(format_score(-(MATE_SCORE - 2)), "mate -1");
        assert_eq!(format_score(42), "cp 42");
    }
}
