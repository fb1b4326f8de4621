//! Searcher: iterative deepening driver, time budget, and search entry point.

use shakmaty::{Chess, Color, Move, MoveList, Position};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::position_hash;
use crate::engine::tt::{TTFlag, TranspositionTable};

use super::ordering::{self, HistoryTable, KillerMoves};
use super::pv::{self, PVLine};
use super::types::{
    SearchLimits, SearchResult, SearchStats, DRAW_SCORE, INFINITY, MATE_SCORE, MAX_DEPTH,
};

pub struct Searcher {
    pub(super) tt: TranspositionTable,
    pub(super) killers: KillerMoves,
    pub(super) history: HistoryTable,
    pub(super) stats: SearchStats,
    pub(super) stop: Arc<AtomicBool>,
    pub(super) stopped: bool,
    pub(super) start_time: Instant,
    pub(super) time_limit: Option<Duration>,
    pub(super) node_limit: Option<u64>,
    /// Zobrist keys of the positions played in the game so far.
    pub(super) game_history: Vec<u64>,
    /// Zobrist keys of the positions on the current search path.
    pub(super) path_history: Vec<u64>,
}

impl Searcher {
    pub fn new() -> Self {
        Searcher {
            tt: TranspositionTable::default(),
            killers: KillerMoves::new(),
            history: HistoryTable::new(),
            stats: SearchStats::default(),
            stop: Arc::new(AtomicBool::new(false)),
            stopped: false,
            start_time: Instant::now(),
            time_limit: None,
            node_limit: None,
            game_history: Vec::new(),
            path_history: Vec::with_capacity(64),
        }
    }

    /// Shared flag that cooperatively aborts a running search when set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Rebuild the transposition table at the requested size. On allocation
    /// failure the previous table is kept and `false` is returned.
    pub fn set_hash_size(&mut self, size_mb: usize) -> bool {
        match TranspositionTable::try_new(size_mb) {
            Some(tt) => {
                self.tt = tt;
                true
            }
            None => false,
        }
    }

    /// Forget everything learned so far. Called on `ucinewgame`.
    pub fn clear(&mut self) {
        self.tt.clear();
        self.killers.clear();
        self.history.clear();
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// True once the search should unwind: the stop flag is set, the node
    /// budget is spent, or the deadline has passed. The clock is only
    /// sampled every 1024 nodes; the answer is latched so every frame above
    /// agrees.
    pub(super) fn should_stop(&mut self) -> bool {
        if self.stopped {
            return true;
        }
        if self.stop.load(Ordering::Relaxed) {
            self.stopped = true;
            return true;
        }
        if let Some(limit) = self.node_limit {
            if self.stats.nodes >= limit {
                self.stopped = true;
                return true;
            }
        }
        if self.stats.nodes % 1024 == 0 {
            if let Some(limit) = self.time_limit {
                if self.start_time.elapsed() >= limit {
                    self.stopped = true;
                    return true;
                }
            }
        }
        false
    }

    /// Draw by twofold repetition within the search path, or threefold
    /// against the game history.
    pub(super) fn is_repetition(&self, hash: u64) -> bool {
        if self.path_history.iter().any(|&h| h == hash) {
            return true;
        }
        self.game_history.iter().filter(|&&h| h == hash).count() >= 2
    }

    pub(super) fn order_moves(
        &self,
        pos: &Chess,
        moves: &MoveList,
        tt_move: Option<&Move>,
        ply: usize,
    ) -> Vec<Move> {
        ordering::order_moves(pos, moves, tt_move, ply, &self.killers, &self.history)
    }

    /// Wall-clock budget for this search, if any.
    pub fn calculate_time(&self, limits: &SearchLimits, side: Color) -> Option<Duration> {
        if limits.infinite {
            return None;
        }
        if let Some(mt) = limits.movetime {
            return Some(Duration::from_millis(mt));
        }
        let (time, inc) = match side {
            Color::White => (limits.wtime?, limits.winc.unwrap_or(0)),
            Color::Black => (limits.btime?, limits.binc.unwrap_or(0)),
        };
        let moves_to_go = limits.movestogo.unwrap_or(30).max(1) as u64;
        let budget = (time / moves_to_go + inc / 2).max(100);
        // Never budget more than what is actually on the clock.
        Some(Duration::from_millis(
            budget.min(time.saturating_sub(50).max(1)),
        ))
    }

    /// Root move loop: first move with a full window, the rest scouted with
    /// a zero window and re-searched on a fail-high.
    fn search_root(
        &mut self,
        pos: &Chess,
        depth: i32,
        mut alpha: i32,
        beta: i32,
    ) -> (i32, Option<Move>, PVLine) {
        let hash = position_hash(pos);
        let legals = pos.legal_moves();
        if legals.is_empty() {
            let score = if pos.is_check() {
                -MATE_SCORE
            } else {
                DRAW_SCORE
            };
            return (score, None, PVLine::new());
        }

        let tt_move = self.tt.probe(hash).and_then(|e| e.best_move.clone());
        let ordered = self.order_moves(pos, &legals, tt_move.as_ref(), 0);

        let mut best_score = -INFINITY;
        let mut best_move: Option<Move> = None;
        let mut pv = PVLine::new();
        let mut child_pv = PVLine::new();

        self.path_history.clear();
        self.path_history.push(hash);

        for (i, mv) in ordered.iter().enumerate() {
            let new_pos = match pos.clone().play(mv) {
                Ok(p) => p,
                Err(_) => continue,
            };

            let score = if i == 0 {
                -self.alpha_beta(&new_pos, depth - 1, 1, -beta, -alpha, &mut child_pv, true)
            } else {
                let mut s =
                    -self.alpha_beta(&new_pos, depth - 1, 1, -alpha - 1, -alpha, &mut child_pv, true);
                if s > alpha && s < beta && !self.stopped {
                    s = -self.alpha_beta(&new_pos, depth - 1, 1, -beta, -alpha, &mut child_pv, true);
                }
                s
            };

            if self.stopped {
                break;
            }

            if score > best_score {
                best_score = score;
                best_move = Some(mv.clone());
            }

            if score > alpha {
                alpha = score;
                pv.load(mv.clone(), &child_pv);
                self.tt
                    .store(hash, Some(mv.clone()), depth as u8, score as i16, TTFlag::Exact);
                if alpha >= beta {
                    break;
                }
            }
        }

        self.path_history.pop();
        (best_score, best_move, pv)
    }

    /// Iterative deepening entry point.
    ///
    /// `game_history` holds the zobrist keys of the game so far, used for
    /// repetition detection. An interrupted iteration never replaces the
    /// move from the last completed one.
    pub fn search(
        &mut self,
        pos: &Chess,
        limits: SearchLimits,
        game_history: &[u64],
    ) -> SearchResult {
        self.stop.store(false, Ordering::Relaxed);
        self.stopped = false;
        self.start_time = Instant::now();
        self.stats = SearchStats::default();
        self.tt.new_search();
        self.time_limit = self.calculate_time(&limits, pos.turn());
        self.node_limit = limits.nodes;
        self.game_history = game_history.to_vec();

        let max_depth = limits.depth.unwrap_or(MAX_DEPTH).clamp(1, MAX_DEPTH);
        let mut result = SearchResult::default();
        let mut best_score = -INFINITY;

        if pos.legal_moves().is_empty() {
            result.score = if pos.is_check() { -MATE_SCORE } else { DRAW_SCORE };
            return result;
        }

        for depth in 1..=max_depth {
            if self.should_stop() {
                break;
            }

            // Aspiration window around the previous score, widened to the
            // full window when the search lands outside it.
            let (mut alpha, mut beta) = if depth >= 4 {
                (best_score - 50, best_score + 50)
            } else {
                (-INFINITY, INFINITY)
            };

            let mut iteration = None;
            loop {
                let (score, mv, pv) = self.search_root(pos, depth, alpha, beta);
                if self.stopped {
                    break;
                }
                if score <= alpha {
                    alpha = -INFINITY;
                } else if score >= beta {
                    beta = INFINITY;
                } else {
                    iteration = Some((score, mv, pv));
                    break;
                }
            }

            if self.stopped {
                break;
            }

            if let Some((score, Some(mv), pv)) = iteration {
                best_score = score;
                result = SearchResult {
                    best_move: Some(mv),
                    score,
                    depth,
                    pv: pv.clone(),
                };
                self.report_info(depth, score, &pv);

                // A forced mate within the horizon cannot be improved on.
                if score.abs() >= MATE_SCORE - depth {
                    break;
                }
            }
        }

        if result.best_move.is_none() {
            let legals = pos.legal_moves();
            if !legals.is_empty() {
                result.best_move = Some(legals[0].clone());
            }
        }

        result
    }

    pub(super) fn report_info(&self, depth: i32, score: i32, pv: &PVLine) {
        pv::report_info(&self.tt, &self.stats, self.start_time, depth, score, pv);
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new()
    }
}
