use shakmaty::{fen::Fen, CastlingMode, Chess};
use std::path::PathBuf;

use heron_chess::engine::book::{BookEntry, BookError, OpeningBook};
use heron_chess::engine::position_hash;

fn from_fen(fen: &str) -> Chess {
    let f: Fen = fen.parse().unwrap();
    f.into_position(CastlingMode::Standard).unwrap()
}

/// Write a throwaway book file and return its path.
fn write_book(name: &str, entries: &[BookEntry]) -> PathBuf {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| e.key);
    let mut bytes = Vec::with_capacity(sorted.len() * BookEntry::SIZE);
    for entry in &sorted {
        bytes.extend_from_slice(&entry.to_bytes());
    }
    let path = std::env::temp_dir().join(format!("heron_{}_{}.bin", name, std::process::id()));
    std::fs::write(&path, bytes).unwrap();
    path
}

/// PolyGlot move encoding: to in bits 0-5, from in bits 6-11, promo 12-14.
fn encode(from: u32, to: u32, promo: u16) -> u16 {
    (promo << 12) | ((from as u16) << 6) | to as u16
}

#[test]
fn test_startpos_key_matches_polyglot_reference() {
    // The published PolyGlot key for the starting position.
    assert_eq!(position_hash(&Chess::default()), 0x463B96181691FC9C);
}

#[test]
fn test_entry_codec_round_trip() {
    let entry = BookEntry {
        key: 0x0123456789ABCDEF,
        mv: 0x1A2B,
        weight: 77,
        learn: 0xDEADBEEF,
    };
    assert_eq!(BookEntry::from_bytes(&entry.to_bytes()), entry);
}

#[test]
fn test_probe_returns_the_book_move() {
    let pos = Chess::default();
    let key = position_hash(&pos);
    // e2 = 12, e4 = 28
    let path = write_book(
        "single",
        &[BookEntry {
            key,
            mv: encode(12, 28, 0),
            weight: 100,
            learn: 0,
        }],
    );
    let mut book = OpeningBook::with_seed(&path, 1).unwrap();
    let mv = book.probe(&pos).unwrap();
    assert_eq!(mv.to_uci(CastlingMode::Standard).to_string(), "e2e4");
    std::fs::remove_file(path).ok();
}

#[test]
fn test_probe_unknown_position_misses() {
    let pos = Chess::default();
    let path = write_book(
        "miss",
        &[BookEntry {
            key: 0x1234,
            mv: encode(12, 28, 0),
            weight: 100,
            learn: 0,
        }],
    );
    let mut book = OpeningBook::with_seed(&path, 1).unwrap();
    assert!(book.probe(&pos).is_none());
    std::fs::remove_file(path).ok();
}

#[test]
fn test_weighted_selection_is_seed_deterministic() {
    let pos = Chess::default();
    let key = position_hash(&pos);
    let entries = [
        BookEntry {
            key,
            mv: encode(12, 28, 0), // e2e4
            weight: 10,
            learn: 0,
        },
        BookEntry {
            key,
            mv: encode(11, 27, 0), // d2d4
            weight: 10,
            learn: 0,
        },
    ];
    let path = write_book("seeded", &entries);

    let mut first = OpeningBook::with_seed(&path, 42).unwrap();
    let mut second = OpeningBook::with_seed(&path, 42).unwrap();
    let a = first.probe(&pos).unwrap();
    let b = second.probe(&pos).unwrap();
    assert_eq!(a, b);
    std::fs::remove_file(path).ok();
}

#[test]
fn test_both_weighted_moves_are_reachable() {
    let pos = Chess::default();
    let key = position_hash(&pos);
    let entries = [
        BookEntry {
            key,
            mv: encode(12, 28, 0),
            weight: 1,
            learn: 0,
        },
        BookEntry {
            key,
            mv: encode(11, 27, 0),
            weight: 1,
            learn: 0,
        },
    ];
    let path = write_book("spread", &entries);

    let mut seen = std::collections::HashSet::new();
    for seed in 0..32 {
        let mut book = OpeningBook::with_seed(&path, seed).unwrap();
        let mv = book.probe(&pos).unwrap();
        seen.insert(mv.to_uci(CastlingMode::Standard).to_string());
    }
    assert!(seen.contains("e2e4"));
    assert!(seen.contains("d2d4"));
    std::fs::remove_file(path).ok();
}

#[test]
fn test_zero_weight_entries_decline() {
    let pos = Chess::default();
    let key = position_hash(&pos);
    let path = write_book(
        "zeroweight",
        &[BookEntry {
            key,
            mv: encode(12, 28, 0),
            weight: 0,
            learn: 0,
        }],
    );
    let mut book = OpeningBook::with_seed(&path, 1).unwrap();
    assert!(book.probe(&pos).is_none());
    std::fs::remove_file(path).ok();
}

#[test]
fn test_illegal_book_move_is_rejected() {
    let pos = Chess::default();
    let key = position_hash(&pos);
    // e7e5 is Black's move; illegal with White to play.
    let path = write_book(
        "illegal",
        &[BookEntry {
            key,
            mv: encode(52, 36, 0),
            weight: 100,
            learn: 0,
        }],
    );
    let mut book = OpeningBook::with_seed(&path, 1).unwrap();
    assert!(book.probe(&pos).is_none());
    std::fs::remove_file(path).ok();
}

#[test]
fn test_promotion_decoding() {
    let pos = from_fen("8/P7/8/8/8/8/8/k6K w - - 0 1");
    let key = position_hash(&pos);
    // a7 = 48, a8 = 56, promotion code 4 = queen
    let path = write_book(
        "promo",
        &[BookEntry {
            key,
            mv: encode(48, 56, 4),
            weight: 1,
            learn: 0,
        }],
    );
    let mut book = OpeningBook::with_seed(&path, 1).unwrap();
    let mv = book.probe(&pos).unwrap();
    assert_eq!(mv.to_uci(CastlingMode::Standard).to_string(), "a7a8q");
    std::fs::remove_file(path).ok();
}

#[test]
fn test_castling_decoding() {
    // PolyGlot encodes castling as the king moving onto its own rook.
    let pos = from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
    let key = position_hash(&pos);
    // e1 = 4, h1 = 7
    let path = write_book(
        "castle",
        &[BookEntry {
            key,
            mv: encode(4, 7, 0),
            weight: 1,
            learn: 0,
        }],
    );
    let mut book = OpeningBook::with_seed(&path, 1).unwrap();
    let mv = book.probe(&pos).unwrap();
    assert!(mv.is_castle());
    assert_eq!(mv.to_uci(CastlingMode::Standard).to_string(), "e1g1");
    std::fs::remove_file(path).ok();
}

#[test]
fn test_truncated_file_is_rejected() {
    let path = std::env::temp_dir().join(format!("heron_truncated_{}.bin", std::process::id()));
    std::fs::write(&path, [0u8; 15]).unwrap();
    match OpeningBook::open(&path) {
        Err(BookError::Truncated { len }) => assert_eq!(len, 15),
        other => panic!("expected truncation error, got {:?}", other.map(|b| b.len())),
    }
    std::fs::remove_file(path).ok();
}

#[test]
fn test_missing_file_is_io_error() {
    match OpeningBook::open("/definitely/not/a/real/book.bin") {
        Err(BookError::Io(_)) => {}
        other => panic!("expected io error, got {:?}", other.map(|b| b.len())),
    }
}
