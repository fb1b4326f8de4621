use shakmaty::{fen::Fen, CastlingMode, Chess, Position};

use heron_chess::evaluate;

fn from_fen(fen: &str) -> Chess {
    let f: Fen = fen.parse().unwrap();
    f.into_position(CastlingMode::Standard).unwrap()
}

#[test]
fn test_startpos_is_balanced() {
    let score = evaluate(&Chess::default());
    assert!(score.abs() < 20, "startpos scored {}", score);
}

#[test]
fn test_material_advantage_dominates() {
    // Black is missing the queen.
    let pos = from_fen("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    let score = evaluate(&pos);
    assert!(score > 700, "queen up scored only {}", score);
}

#[test]
fn test_side_to_move_negation() {
    let pos = from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 3");
    let flipped = pos.clone().swap_turn().unwrap();
    assert_eq!(evaluate(&pos), -evaluate(&flipped));
}

#[test]
fn test_color_mirror_symmetry() {
    // 1.e4 with Black to move, against its color-mirror 1...e5 with White
    // to move. The mover's perspective score must match.
    let after_e4 = from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");
    let mirror = from_fen("rnbqkbnr/pppp1ppp/8/4p3/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    assert_eq!(evaluate(&after_e4), evaluate(&mirror));
}

#[test]
fn test_doubled_isolated_pawns_penalized() {
    // Connected pawns a2+b2 versus doubled isolated pawns a2+a4.
    let healthy = from_fen("k7/8/8/8/8/8/PP6/K7 w - - 0 1");
    let crippled = from_fen("k7/8/8/8/P7/8/P7/K7 w - - 0 1");
    assert!(evaluate(&healthy) > evaluate(&crippled));
}

#[test]
fn test_passed_pawn_on_seventh() {
    // A protected passer one step from promotion is worth far more than a
    // pawn's material alone in the endgame.
    let pos = from_fen("4k3/4P3/8/8/8/8/8/4K3 w - - 0 1");
    let score = evaluate(&pos);
    assert!(score > 200, "seventh-rank passer scored {}", score);
}

#[test]
fn test_passed_pawn_beats_blocked_pawn() {
    // Same material: a passer on a5 versus a pawn stopped by an enemy pawn
    // directly ahead on the same file.
    let passer = from_fen("k7/8/8/P7/8/8/8/K7 w - - 0 1");
    let blocked = from_fen("k7/p7/8/P7/8/8/8/K7 w - - 0 1");
    assert!(evaluate(&passer) > evaluate(&blocked));
}
