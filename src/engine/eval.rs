//! Tapered static evaluation.
//!
//! Two scores are accumulated in parallel, one weighted for the middlegame
//! and one for the endgame, then blended by the game phase. Terms: material,
//! piece-square tables, pawn structure, king safety and mobility. The result
//! is from the side to move's perspective.

use shakmaty::{attacks, Bitboard, Board, Chess, Color, Position, Rank, Role, Square};

/// Phase of a full starting-position material set.
///
/// Weights: Knight=1, Bishop=1, Rook=2, Queen=4; 4*1 + 4*1 + 4*2 + 2*4 = 24.
pub const TOTAL_PHASE: i32 = 24;

/// Standard piece values in centipawns.
pub fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 100,
        Role::Knight => 320,
        Role::Bishop => 330,
        Role::Rook => 500,
        Role::Queen => 900,
        Role::King => 20000,
    }
}

/// Game phase from remaining non-pawn material, in `0..=TOTAL_PHASE`.
///
/// `TOTAL_PHASE` is a full middlegame complement; 0 is a pure pawn ending.
/// Promoted pieces are clamped so they cannot push the phase past the top.
pub fn game_phase(board: &Board) -> i32 {
    let phase = board.knights().count() as i32
        + board.bishops().count() as i32
        + 2 * board.rooks().count() as i32
        + 4 * board.queens().count() as i32;
    phase.min(TOTAL_PHASE)
}

/// Static evaluation of a position, side-to-move relative.
pub fn evaluate(pos: &Chess) -> i32 {
    let board = pos.board();
    let phase = game_phase(board);

    let mut mg = 0i32;
    let mut eg = 0i32;
    for color in [Color::White, Color::Black] {
        let (side_mg, side_eg) = evaluate_side(board, color, phase);
        if color == Color::White {
            mg += side_mg;
            eg += side_eg;
        } else {
            mg -= side_mg;
            eg -= side_eg;
        }
    }

    let score = (mg * phase + eg * (TOTAL_PHASE - phase)) / TOTAL_PHASE;

    if pos.turn() == Color::White {
        score
    } else {
        -score
    }
}

fn evaluate_side(board: &Board, color: Color, phase: i32) -> (i32, i32) {
    let mut mg = 0i32;
    let mut eg = 0i32;

    for sq in board.by_color(color) {
        let Some(role) = board.role_at(sq) else {
            continue;
        };
        if role != Role::King {
            let value = piece_value(role);
            mg += value;
            eg += value;
        }
        mg += pst_value(role, sq, color, false);
        eg += pst_value(role, sq, color, true);
    }

    let pawns = pawn_structure(board, color);
    mg += pawns;
    eg += pawns;

    // King safety only matters while there is attacking material around.
    if phase > TOTAL_PHASE / 3 {
        mg += king_safety(board, color);
    }

    let mob = mobility(board, color);
    mg += mob;
    eg += mob;

    (mg, eg)
}

/// Doubled, isolated and passed pawns for one side.
fn pawn_structure(board: &Board, color: Color) -> i32 {
    let own_pawns = board.pawns() & board.by_color(color);
    let enemy_pawns = board.pawns() & board.by_color(!color);
    let mut score = 0i32;

    for sq in own_pawns {
        let file = sq.file();
        let file_bb = Bitboard::from(file);

        if (own_pawns & file_bb).count() > 1 {
            score -= 20;
        }

        let mut adjacent = Bitboard::EMPTY;
        if let Some(f) = file.offset(-1) {
            adjacent |= Bitboard::from(f);
        }
        if let Some(f) = file.offset(1) {
            adjacent |= Bitboard::from(f);
        }

        if (own_pawns & adjacent).is_empty() {
            score -= 15;
        }

        // Passed: no enemy pawn strictly ahead on this or an adjacent file.
        let span = file_bb | adjacent;
        let blocked = (enemy_pawns & span).into_iter().any(|esq| match color {
            Color::White => esq.rank() > sq.rank(),
            Color::Black => esq.rank() < sq.rank(),
        });
        if !blocked {
            let advanced = match color {
                Color::White => sq.rank() as i32,
                Color::Black => 7 - sq.rank() as i32,
            };
            score += 10 + advanced * advanced;
        }
    }

    score
}

/// Back-rank shelter and pawn shield, middlegame only.
fn king_safety(board: &Board, color: Color) -> i32 {
    let Some(king_sq) = board.king_of(color) else {
        return 0;
    };
    let mut score = 0i32;

    let back_rank = match color {
        Color::White => Rank::First,
        Color::Black => Rank::Eighth,
    };
    if king_sq.rank() == back_rank {
        score += 10;
    }

    let shield = attacks::king_attacks(king_sq) & board.pawns() & board.by_color(color);
    score += shield.count() as i32 * 5;

    score
}

/// Attack counts to non-friendly squares, weighted per piece type.
fn mobility(board: &Board, color: Color) -> i32 {
    let occupied = board.occupied();
    let own = board.by_color(color);
    let mut score = 0i32;

    for sq in board.knights() & own {
        score += (attacks::knight_attacks(sq) & !own).count() as i32 * 2;
    }
    for sq in board.bishops() & own {
        score += (attacks::bishop_attacks(sq, occupied) & !own).count() as i32 * 3;
    }
    for sq in board.rooks() & own {
        score += (attacks::rook_attacks(sq, occupied) & !own).count() as i32 * 2;
    }
    for sq in board.queens() & own {
        score += (attacks::queen_attacks(sq, occupied) & !own).count() as i32;
    }

    score
}

/// Piece-square table lookup. Tables are from White's perspective with
/// index 0 = a1; Black mirrors the square vertically.
fn pst_value(role: Role, sq: Square, color: Color, endgame: bool) -> i32 {
    let idx = match color {
        Color::White => sq as usize,
        Color::Black => sq.flip_vertical() as usize,
    };
    let (mg_table, eg_table) = match role {
        Role::Pawn => (&PAWN_MG, &PAWN_EG),
        Role::Knight => (&KNIGHT_MG, &KNIGHT_EG),
        Role::Bishop => (&BISHOP_MG, &BISHOP_EG),
        Role::Rook => (&ROOK_MG, &ROOK_EG),
        Role::Queen => (&QUEEN_MG, &QUEEN_EG),
        Role::King => (&KING_MG, &KING_EG),
    };
    if endgame {
        eg_table[idx]
    } else {
        mg_table[idx]
    }
}

// Piece-square tables, rank 1 at the top of each literal.

#[rustfmt::skip]
const PAWN_MG: [i32; 64] = [
      0,   0,   0,   0,   0,   0,   0,   0,
      5,  10,  10, -20, -20,  10,  10,   5,
      5,  -5, -10,   0,   0, -10,  -5,   5,
      0,   0,   0,  20,  20,   0,   0,   0,
      5,   5,  10,  25,  25,  10,   5,   5,
     10,  10,  20,  30,  30,  20,  10,  10,
     50,  50,  50,  50,  50,  50,  50,  50,
      0,   0,   0,   0,   0,   0,   0,   0,
];

#[rustfmt::skip]
const PAWN_EG: [i32; 64] = [
      0,   0,   0,   0,   0,   0,   0,   0,
      5,   5,   5,   5,   5,   5,   5,   5,
     10,  10,  10,  10,  10,  10,  10,  10,
     20,  20,  20,  20,  20,  20,  20,  20,
     40,  40,  40,  40,  40,  40,  40,  40,
     70,  70,  70,  70,  70,  70,  70,  70,
    120, 120, 120, 120, 120, 120, 120, 120,
      0,   0,   0,   0,   0,   0,   0,   0,
];

#[rustfmt::skip]
const KNIGHT_MG: [i32; 64] = [
    -50, -40, -30, -30, -30, -30, -40, -50,
    -40, -20,   0,   5,   5,   0, -20, -40,
    -30,   0,  10,  15,  15,  10,   0, -30,
    -30,   5,  15,  20,  20,  15,   5, -30,
    -30,   0,  15,  20,  20,  15,   0, -30,
    -30,   5,  10,  15,  15,  10,   5, -30,
    -40, -20,   0,   0,   0,   0, -20, -40,
    -50, -40, -30, -30, -30, -30, -40, -50,
];

#[rustfmt::skip]
const KNIGHT_EG: [i32; 64] = [
    -40, -30, -20, -20, -20, -20, -30, -40,
    -30, -15,  -5,   0,   0,  -5, -15, -30,
    -20,  -5,  10,  15,  15,  10,  -5, -20,
    -20,   0,  15,  20,  20,  15,   0, -20,
    -20,   0,  15,  20,  20,  15,   0, -20,
    -20,  -5,  10,  15,  15,  10,  -5, -20,
    -30, -15,  -5,   0,   0,  -5, -15, -30,
    -40, -30, -20, -20, -20, -20, -30, -40,
];

#[rustfmt::skip]
const BISHOP_MG: [i32; 64] = [
    -20, -10, -10, -10, -10, -10, -10, -20,
    -10,   5,   0,   0,   0,   0,   5, -10,
    -10,  10,  10,  10,  10,  10,  10, -10,
    -10,   0,  10,  10,  10,  10,   0, -10,
    -10,   5,   5,  10,  10,   5,   5, -10,
    -10,   0,   5,  10,  10,   5,   0, -10,
    -10,   0,   0,   0,   0,   0,   0, -10,
    -20, -10, -10, -10, -10, -10, -10, -20,
];

#[rustfmt::skip]
const BISHOP_EG: [i32; 64] = [
    -20, -10, -10, -10, -10, -10, -10, -20,
    -10,   0,   0,   0,   0,   0,   0, -10,
    -10,   0,   5,   5,   5,   5,   0, -10,
    -10,   5,   5,  10,  10,   5,   5, -10,
    -10,   5,   5,  10,  10,   5,   5, -10,
    -10,   0,   5,   5,   5,   5,   0, -10,
    -10,   0,   0,   0,   0,   0,   0, -10,
    -20, -10, -10, -10, -10, -10, -10, -20,
];

#[rustfmt::skip]
const ROOK_MG: [i32; 64] = [
      0,   0,   0,   5,   5,   0,   0,   0,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
      5,  10,  10,  10,  10,  10,  10,   5,
      0,   0,   0,   0,   0,   0,   0,   0,
];

#[rustfmt::skip]
const ROOK_EG: [i32; 64] = [
      0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,
      5,   5,   5,   5,   5,   5,   5,   5,
      0,   0,   0,   0,   0,   0,   0,   0,
];

#[rustfmt::skip]
const QUEEN_MG: [i32; 64] = [
    -20, -10, -10,  -5,  -5, -10, -10, -20,
    -10,   0,   5,   0,   0,   0,   0, -10,
    -10,   5,   5,   5,   5,   5,   0, -10,
      0,   0,   5,   5,   5,   5,   0,  -5,
     -5,   0,   5,   5,   5,   5,   0,  -5,
    -10,   0,   5,   5,   5,   5,   0, -10,
    -10,   0,   0,   0,   0,   0,   0, -10,
    -20, -10, -10,  -5,  -5, -10, -10, -20,
];

#[rustfmt::skip]
const QUEEN_EG: [i32; 64] = [
    -10,  -5,  -5,  -5,  -5,  -5,  -5, -10,
     -5,   0,   0,   5,   5,   0,   0,  -5,
     -5,   0,   5,  10,  10,   5,   0,  -5,
     -5,   5,  10,  10,  10,  10,   5,  -5,
     -5,   5,  10,  10,  10,  10,   5,  -5,
     -5,   0,   5,  10,  10,   5,   0,  -5,
     -5,   0,   0,   5,   5,   0,   0,  -5,
    -10,  -5,  -5,  -5,  -5,  -5,  -5, -10,
];

#[rustfmt::skip]
const KING_MG: [i32; 64] = [
     20,  30,  10,   0,   0,  10,  30,  20,
     20,  20,   0,   0,   0,   0,  20,  20,
    -10, -20, -20, -20, -20, -20, -20, -10,
    -20, -30, -30, -40, -40, -30, -30, -20,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
];

#[rustfmt::skip]
const KING_EG: [i32; 64] = [
    -50, -30, -30, -30, -30, -30, -30, -50,
    -30, -20, -10,   0,   0, -10, -20, -30,
    -30, -10,  20,  30,  30,  20, -10, -30,
    -30, -10,  30,  40,  40,  30, -10, -30,
    -30, -10,  30,  40,  40,  30, -10, -30,
    -30, -10,  20,  30,  30,  20, -10, -30,
    -30, -30,   0,   0,   0,   0, -30, -30,
    -50, -40, -30, -20, -20, -30, -40, -50,
];
