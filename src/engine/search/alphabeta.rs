//! Alpha-beta search and quiescence.

use shakmaty::{Chess, Move, Position, Role};

use crate::engine::eval::{evaluate, piece_value};
use crate::engine::position_hash;
use crate::engine::tt::TTFlag;

use super::pv::PVLine;
use super::searcher::Searcher;
use super::types::{DRAW_SCORE, INFINITY, MATE_IN_MAX, MATE_SCORE, MAX_PLY};

/// Shift a mate score from root-relative to node-relative before it goes
/// into the transposition table.
fn score_to_tt(score: i32, ply: usize) -> i32 {
    if score > MATE_IN_MAX {
        score + ply as i32
    } else if score < -MATE_IN_MAX {
        score - ply as i32
    } else {
        score
    }
}

/// Inverse of [`score_to_tt`], applied when a stored score is retrieved.
fn score_from_tt(score: i32, ply: usize) -> i32 {
    if score > MATE_IN_MAX {
        score - ply as i32
    } else if score < -MATE_IN_MAX {
        score + ply as i32
    } else {
        score
    }
}

fn lmr_reduction(depth: i32, index: usize, is_pv: bool) -> i32 {
    let index = index as i32;
    if is_pv {
        (depth / 6 + index / 8 - 1).max(0)
    } else {
        (depth / 4 + index / 6).max(0)
    }
}

fn has_non_pawn_material(pos: &Chess) -> bool {
    let board = pos.board();
    let pieces = board.knights() | board.bishops() | board.rooks() | board.queens();
    (pieces & pos.us()).any()
}

impl Searcher {
    /// Fail-soft negamax with alpha-beta, PVS, null move pruning and LMR.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn alpha_beta(
        &mut self,
        pos: &Chess,
        depth: i32,
        ply: usize,
        mut alpha: i32,
        mut beta: i32,
        pv: &mut PVLine,
        allow_null: bool,
    ) -> i32 {
        pv.clear();

        if self.should_stop() {
            return 0;
        }
        self.stats.nodes += 1;
        if ply > self.stats.seldepth {
            self.stats.seldepth = ply;
        }

        // Mate distance pruning: neither bound can be better than the
        // fastest mate reachable from this ply.
        alpha = alpha.max(-MATE_SCORE + ply as i32);
        beta = beta.min(MATE_SCORE - ply as i32 - 1);
        if alpha >= beta {
            return alpha;
        }

        let hash = position_hash(pos);
        if ply > 0
            && (self.is_repetition(hash)
                || pos.halfmoves() >= 100
                || pos.is_insufficient_material())
        {
            return DRAW_SCORE;
        }

        if ply >= MAX_PLY {
            return evaluate(pos);
        }

        if depth <= 0 {
            return self.quiescence(pos, ply, alpha, beta);
        }

        let in_check = pos.is_check();
        let is_pv = beta - alpha > 1;

        let mut tt_move: Option<Move> = None;
        if let Some(entry) = self.tt.probe(hash) {
            self.stats.tt_hits += 1;
            tt_move = entry.best_move.clone();
            if !is_pv && entry.depth as i32 >= depth {
                let score = score_from_tt(entry.score as i32, ply);
                let cutoff = match entry.flag {
                    TTFlag::Exact => true,
                    TTFlag::LowerBound => score >= beta,
                    TTFlag::UpperBound => score <= alpha,
                };
                if cutoff {
                    self.stats.tt_cutoffs += 1;
                    return score;
                }
            }
        }

        // Null move pruning: hand the opponent a free move and see whether
        // the position still fails high. Not in zugzwang-prone positions
        // (no non-pawn material) and never twice in a row.
        if allow_null && !is_pv && !in_check && depth >= 3 && has_non_pawn_material(pos) {
            if let Ok(null_pos) = pos.clone().swap_turn() {
                let r = 3 + depth / 6;
                let mut null_pv = PVLine::new();
                let null_score = -self.alpha_beta(
                    &null_pos,
                    depth - r - 1,
                    ply + 1,
                    -beta,
                    -beta + 1,
                    &mut null_pv,
                    false,
                );
                if self.stopped {
                    return 0;
                }
                if null_score >= beta {
                    return null_score;
                }
            }
        }

        let legals = pos.legal_moves();
        if legals.is_empty() {
            return if in_check {
                -MATE_SCORE + ply as i32
            } else {
                DRAW_SCORE
            };
        }

        let ordered = self.order_moves(pos, &legals, tt_move.as_ref(), ply);

        let mut best_score = -INFINITY;
        let mut best_move: Option<Move> = None;
        let mut flag = TTFlag::UpperBound;
        let mut child_pv = PVLine::new();

        self.path_history.push(hash);

        for (i, mv) in ordered.iter().enumerate() {
            let new_pos = match pos.clone().play(mv) {
                Ok(p) => p,
                Err(_) => continue,
            };
            self.tt.prefetch(position_hash(&new_pos));

            let gives_check = new_pos.is_check();
            let extension = i32::from(gives_check || mv.is_promotion());
            let new_depth = depth - 1 + extension;
            let quiet = !mv.is_capture() && !mv.is_promotion() && !mv.is_castle();

            let score = if i == 0 {
                -self.alpha_beta(&new_pos, new_depth, ply + 1, -beta, -alpha, &mut child_pv, true)
            } else if i >= 4 && depth >= 3 && !in_check && !gives_check && quiet {
                // Late move reduction: a reduced zero-window probe first,
                // re-searched at full depth (and full window at PV nodes)
                // only when it beats alpha.
                let r = lmr_reduction(depth, i, is_pv);
                let mut s = -self.alpha_beta(
                    &new_pos,
                    new_depth - r,
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                    &mut child_pv,
                    true,
                );
                if s > alpha && r > 0 && !self.stopped {
                    s = -self.alpha_beta(
                        &new_pos,
                        new_depth,
                        ply + 1,
                        -alpha - 1,
                        -alpha,
                        &mut child_pv,
                        true,
                    );
                }
                if s > alpha && is_pv && !self.stopped {
                    s = -self.alpha_beta(
                        &new_pos,
                        new_depth,
                        ply + 1,
                        -beta,
                        -alpha,
                        &mut child_pv,
                        true,
                    );
                }
                s
            } else {
                // Scout the remaining moves with a zero window.
                let mut s = -self.alpha_beta(
                    &new_pos,
                    new_depth,
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                    &mut child_pv,
                    true,
                );
                if s > alpha && s < beta && !self.stopped {
                    s = -self.alpha_beta(
                        &new_pos,
                        new_depth,
                        ply + 1,
                        -beta,
                        -alpha,
                        &mut child_pv,
                        true,
                    );
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
                flag = TTFlag::Exact;
                pv.load(mv.clone(), &child_pv);

                if score >= beta {
                    flag = TTFlag::LowerBound;
                    if !mv.is_capture() {
                        self.killers.add(mv.clone(), ply);
                        self.history.add(pos.turn(), mv, depth);
                    }
                    break;
                }
            }
        }

        self.path_history.pop();

        if !self.stopped {
            let stored = score_to_tt(best_score, ply);
            self.tt.store(hash, best_move, depth as u8, stored as i16, flag);
        }

        best_score
    }

    /// Capture-only extension of the horizon. Evasions are searched in full
    /// when the side to move is in check.
    pub(super) fn quiescence(&mut self, pos: &Chess, ply: usize, mut alpha: i32, beta: i32) -> i32 {
        if self.should_stop() {
            return 0;
        }
        self.stats.nodes += 1;
        self.stats.qnodes += 1;
        if ply > self.stats.seldepth {
            self.stats.seldepth = ply;
        }

        let in_check = pos.is_check();
        let stand_pat = evaluate(pos);
        if !in_check {
            if stand_pat >= beta {
                return beta;
            }
            if stand_pat > alpha {
                alpha = stand_pat;
            }
        }
        if ply >= MAX_PLY {
            return stand_pat;
        }

        let legals = pos.legal_moves();
        if in_check && legals.is_empty() {
            return -MATE_SCORE + ply as i32;
        }

        let mut moves: Vec<(Move, i32)> = legals
            .iter()
            .filter(|mv| in_check || mv.is_capture() || mv.is_promotion())
            .map(|mv| (mv.clone(), super::ordering::mvv_lva(pos, mv)))
            .collect();
        moves.sort_by(|a, b| b.1.cmp(&a.1));

        for (mv, _) in moves {
            // Delta pruning: the capture cannot lift the score back to alpha
            // even with a generous margin.
            if !in_check && !mv.is_promotion() {
                let victim = if mv.is_en_passant() {
                    Role::Pawn
                } else {
                    pos.board().role_at(mv.to()).unwrap_or(Role::Pawn)
                };
                if stand_pat + piece_value(victim) + 200 < alpha {
                    continue;
                }
            }

            let new_pos = match pos.clone().play(&mv) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let score = -self.quiescence(&new_pos, ply + 1, -beta, -alpha);
            if self.stopped {
                break;
            }
            if score >= beta {
                return score;
            }
            if score > alpha {
                alpha = score;
            }
        }

        alpha
    }
}
