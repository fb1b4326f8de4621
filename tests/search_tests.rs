use shakmaty::{fen::Fen, CastlingMode, Chess, Position};

use heron_chess::engine::position_hash;
use heron_chess::engine::search::{SearchLimits, Searcher, MATE_SCORE};
use heron_chess::evaluate;

fn from_fen(fen: &str) -> Chess {
    let f: Fen = fen.parse().unwrap();
    f.into_position(CastlingMode::Standard).unwrap()
}

#[test]
fn test_search_startpos() {
    let pos = Chess::default();
    let mut searcher = Searcher::new();
    let limits = SearchLimits {
        depth: Some(4),
        ..Default::default()
    };
    let result = searcher.search(&pos, limits, &[]);
    assert!(result.best_move.is_some());
    assert_eq!(result.depth, 4);
}

#[test]
fn test_mate_in_one_back_rank() {
    // Ra8 is the only mate: the black king is boxed in by its own pawns.
    let pos = from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
    let mut searcher = Searcher::new();
    let limits = SearchLimits {
        depth: Some(3),
        ..Default::default()
    };
    let result = searcher.search(&pos, limits, &[]);
    assert_eq!(result.score, MATE_SCORE - 1);
    let mv = result.best_move.unwrap();
    assert_eq!(mv.to_uci(CastlingMode::Standard).to_string(), "a1a8");
}

#[test]
fn test_mate_in_one_black() {
    // Fool's mate: after 1.f3 e5 2.g4, Black mates with Qh4.
    let pos = from_fen("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq g3 0 2");
    let mut searcher = Searcher::new();
    let limits = SearchLimits {
        depth: Some(3),
        ..Default::default()
    };
    let result = searcher.search(&pos, limits, &[]);
    assert_eq!(result.score, MATE_SCORE - 1);
    let mv = result.best_move.unwrap();
    assert_eq!(mv.to_uci(CastlingMode::Standard).to_string(), "d8h4");
}

#[test]
fn test_shortest_mate_is_stable_at_higher_depth() {
    // A deeper search must not report a longer mate than the one in reach.
    let pos = from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
    let mut searcher = Searcher::new();
    let limits = SearchLimits {
        depth: Some(6),
        ..Default::default()
    };
    let result = searcher.search(&pos, limits, &[]);
    assert_eq!(result.score, MATE_SCORE - 1);
}

#[test]
fn test_avoids_stalemate_finds_mate() {
    // Qf7 here would stalemate; the winning plan is Qd4+ followed by mate.
    let pos = from_fen("7k/8/6K1/8/8/8/8/6Q1 w - - 0 1");
    let mut searcher = Searcher::new();
    let limits = SearchLimits {
        depth: Some(5),
        ..Default::default()
    };
    let result = searcher.search(&pos, limits, &[]);
    assert!(result.score >= MATE_SCORE - 5, "score was {}", result.score);
}

#[test]
fn test_depth_one_equals_shallow_minimax() {
    // From the starting position no capture is available at ply 1, so a
    // depth-1 search must agree exactly with a one-ply minimax over the
    // static evaluation.
    let pos = Chess::default();
    let mut searcher = Searcher::new();
    let limits = SearchLimits {
        depth: Some(1),
        ..Default::default()
    };
    let result = searcher.search(&pos, limits, &[]);

    let reference = pos
        .legal_moves()
        .iter()
        .map(|mv| -evaluate(&pos.clone().play(mv).unwrap()))
        .max()
        .unwrap();

    assert_eq!(result.score, reference);
}

#[test]
fn test_fixed_depth_determinism() {
    let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
    let limits = SearchLimits {
        depth: Some(4),
        ..Default::default()
    };

    let mut first = Searcher::new();
    let a = first.search(&from_fen(fen), limits.clone(), &[]);
    let mut second = Searcher::new();
    let b = second.search(&from_fen(fen), limits, &[]);

    assert_eq!(a.score, b.score);
    assert_eq!(a.pv.to_uci(), b.pv.to_uci());
}

#[test]
fn test_pv_moves_are_legal() {
    let pos = from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
    let mut searcher = Searcher::new();
    let limits = SearchLimits {
        depth: Some(5),
        ..Default::default()
    };
    let result = searcher.search(&pos, limits, &[]);

    assert!(!result.pv.is_empty());
    let mut cur = pos;
    for mv in result.pv.moves() {
        assert!(cur.is_legal(mv), "illegal pv move {:?}", mv);
        cur = cur.play(mv).unwrap();
    }
}

#[test]
fn test_warm_tt_reduces_nodes() {
    let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
    let limits = SearchLimits {
        depth: Some(5),
        ..Default::default()
    };

    let mut searcher = Searcher::new();
    searcher.search(&from_fen(fen), limits.clone(), &[]);
    let cold_nodes = searcher.stats().nodes;
    searcher.search(&from_fen(fen), limits, &[]);
    let warm_nodes = searcher.stats().nodes;

    assert!(
        warm_nodes < cold_nodes,
        "warm {} vs cold {}",
        warm_nodes,
        cold_nodes
    );
}

#[test]
fn test_movetime_deadline() {
    let pos = Chess::default();
    let mut searcher = Searcher::new();
    let limits = SearchLimits {
        movetime: Some(200),
        ..Default::default()
    };

    let start = std::time::Instant::now();
    let result = searcher.search(&pos, limits, &[]);
    let elapsed = start.elapsed();

    assert!(result.best_move.is_some());
    assert!(elapsed.as_millis() < 600, "took {:?}", elapsed);
}

#[test]
fn test_node_limit() {
    let pos = Chess::default();
    let mut searcher = Searcher::new();
    let limits = SearchLimits {
        nodes: Some(5_000),
        ..Default::default()
    };
    let result = searcher.search(&pos, limits, &[]);
    assert!(result.best_move.is_some());
    assert!(searcher.stats().nodes <= 5_100);
}

#[test]
fn test_halfmove_clock_draw() {
    // One reversible move from the 50-move rule: every line scores zero.
    let pos = from_fen("7k/8/8/8/8/8/8/R6K w - - 99 80");
    let mut searcher = Searcher::new();
    let limits = SearchLimits {
        depth: Some(5),
        ..Default::default()
    };
    let result = searcher.search(&pos, limits, &[]);
    assert_eq!(result.score, 0);
}

#[test]
fn test_mated_position_returns_no_move() {
    // Back-rank mate already delivered; Black has no legal move.
    let pos = from_fen("R5k1/5ppp/8/8/8/8/8/6K1 b - - 0 1");
    let mut searcher = Searcher::new();
    let limits = SearchLimits {
        depth: Some(3),
        ..Default::default()
    };
    let result = searcher.search(&pos, limits, &[]);
    assert!(result.best_move.is_none());
    assert_eq!(result.score, -MATE_SCORE);
}

#[test]
fn test_position_hash_is_stable_across_clone_play() {
    let pos = from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
    let before = position_hash(&pos);
    for mv in pos.legal_moves() {
        let child = pos.clone().play(&mv).unwrap();
        assert_ne!(position_hash(&child), before);
        assert_eq!(position_hash(&pos), before);
    }
}
