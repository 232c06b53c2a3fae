//! Engine component tests
//!
//! Attack tables, move generation subsets, evaluation and the opening book.

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::PathBuf;

use kestrel::core::bitboard::Bitboard;
use kestrel::core::board::{Color, PieceType, Square};
use kestrel::core::moves::MoveList;
use kestrel::core::position::Position;
use kestrel::engine::attacks::{AttackTables, Slider};
use kestrel::engine::book::PolyglotBook;
use kestrel::engine::eval::{Evaluator, MaterialEvaluator};
use kestrel::engine::movegen::{GenType, LegalMoveGenerator, MoveGenerator, PseudoLegalGenerator, legal_moves};
use kestrel::error::BookError;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn generate(pos: &mut Position, kind: GenType) -> Vec<String> {
    let mut moves = MoveList::new();
    LegalMoveGenerator::<PseudoLegalGenerator>::default().generate(pos, kind, &mut moves);
    let mut uci: Vec<String> = moves.iter().map(|m| m.to_uci()).collect();
    uci.sort();
    uci
}

/// Flip the board vertically and swap colours
fn mirror_fen(fen: &str) -> String {
    let parts: Vec<&str> = fen.split_whitespace().collect();
    let board: Vec<String> = parts[0]
        .split('/')
        .rev()
        .map(|rank| {
            rank.chars()
                .map(|c| if c.is_ascii_uppercase() { c.to_ascii_lowercase() } else { c.to_ascii_uppercase() })
                .collect()
        })
        .collect();
    let side = if parts[1] == "w" { "b" } else { "w" };
    format!("{} {} - - 0 1", board.join("/"), side)
}

// ============================================================================
// Attack tables
// ============================================================================

#[test]
fn test_magic_attacks_match_ray_tracing_on_random_boards() {
    let tables = AttackTables::instance();
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..2000 {
        let occupied = Bitboard(rng.random::<u64>() & rng.random::<u64>());
        let sq = Square(rng.random_range(0..64));
        let rook = Slider::Rook.sliding_attacks(sq, occupied);
        let bishop = Slider::Bishop.sliding_attacks(sq, occupied);
        assert_eq!(tables.rook(sq, occupied), rook);
        assert_eq!(tables.bishop(sq, occupied), bishop);
        assert_eq!(tables.queen(sq, occupied), rook | bishop);
    }
}

#[test]
fn test_attacks_dispatch_by_piece() {
    let tables = AttackTables::instance();
    let e4 = Square::from_algebraic("e4").unwrap();
    let empty = Bitboard::EMPTY;
    assert_eq!(tables.attacks(PieceType::Knight, Color::White, e4, empty).count(), 8);
    assert_eq!(tables.attacks(PieceType::King, Color::Black, e4, empty).count(), 8);
    assert_eq!(tables.attacks(PieceType::Rook, Color::White, e4, empty).count(), 14);
    assert_eq!(tables.attacks(PieceType::Bishop, Color::White, e4, empty).count(), 13);
    assert_eq!(tables.attacks(PieceType::Pawn, Color::White, e4, empty), tables.pawn(Color::White, e4));
}

// ============================================================================
// Move generation
// ============================================================================

#[test]
fn test_tactical_moves_are_subset_of_all() {
    for fen in [KIWIPETE, "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1"] {
        let mut pos = Position::from_fen(fen).unwrap();
        let all = generate(&mut pos, GenType::All);
        let tactical = generate(&mut pos, GenType::Tactical);
        assert!(!tactical.is_empty());
        assert!(tactical.iter().all(|m| all.contains(m)));
    }
}

#[test]
fn test_checks_generation_includes_every_check() {
    let mut pos = Position::from_fen(KIWIPETE).unwrap();
    let mut all = MoveList::new();
    LegalMoveGenerator::<PseudoLegalGenerator>::default().generate(&mut pos, GenType::All, &mut all);
    let with_checks = generate(&mut pos, GenType::TacticalAndChecks);
    let tactical = generate(&mut pos, GenType::Tactical);

    for mv in all.iter() {
        let in_list = with_checks.contains(&mv.to_uci());
        assert_eq!(in_list, mv.is_tactical() || mv.gives_check(), "{}", mv);
    }
    assert!(with_checks.len() >= tactical.len());
}

#[test]
fn test_generation_is_deterministic() {
    let mut pos = Position::from_fen(KIWIPETE).unwrap();
    let first: Vec<u32> = legal_moves(&mut pos).iter().map(|m| m.raw()).collect();
    let second: Vec<u32> = legal_moves(&mut pos).iter().map(|m| m.raw()).collect();
    assert_eq!(first, second);
}

#[test]
fn test_checkmate_and_stalemate_have_no_moves() {
    let mut mate = Position::from_fen("R5k1/5ppp/8/8/8/8/8/6K1 b - - 1 1").unwrap();
    assert!(mate.in_check());
    assert!(legal_moves(&mut mate).is_empty());

    let mut stalemate = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    assert!(!stalemate.in_check());
    assert!(legal_moves(&mut stalemate).is_empty());
}

// ============================================================================
// Evaluation
// ============================================================================

#[test]
fn test_evaluation_is_colour_symmetric() {
    let eval = MaterialEvaluator;
    for fen in [
        KIWIPETE,
        "rnbqkbnr/pp3ppp/8/2ppp3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 0 4",
        "8/5k2/3p4/8/2P5/8/2P2K2/8 b - - 0 1",
    ] {
        let pos = Position::from_fen(fen).unwrap();
        let mirrored = Position::from_fen(&mirror_fen(fen)).unwrap();
        assert_eq!(eval.evaluate(&pos), eval.evaluate(&mirrored), "{fen}");
        assert_eq!(eval.evaluate_white(&pos), -eval.evaluate_white(&mirrored), "{fen}");
    }
}

#[test]
fn test_evaluator_as_trait_object() {
    let eval: Box<dyn Evaluator> = Box::new(MaterialEvaluator);
    let up_a_rook = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
    assert!(eval.evaluate(&up_a_rook) > 400);
}

// ============================================================================
// Opening book
// ============================================================================

fn temp_book(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("kestrel-{}-{}.bin", name, std::process::id()));
    fs::write(&path, bytes).unwrap();
    path
}

fn record(key: u64, raw_move: u16, weight: u16) -> Vec<u8> {
    let mut bytes = key.to_be_bytes().to_vec();
    bytes.extend_from_slice(&raw_move.to_be_bytes());
    bytes.extend_from_slice(&weight.to_be_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes
}

/// e2e4 in Polyglot move encoding
const BOOK_E2E4: u16 = 4 | 3 << 3 | 4 << 6 | 1 << 9;

#[test]
fn test_book_file_round_trip() {
    let start = Position::startpos();
    let path = temp_book("start", &record(start.key(), BOOK_E2E4, 10));
    let book = PolyglotBook::open(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let mut pos = Position::startpos();
    assert_eq!(book.len(), 1);
    assert_eq!(book.probe(&mut pos).map(|m| m.to_uci()), Some("e2e4".to_string()));

    let mut other = Position::from_fen(KIWIPETE).unwrap();
    assert!(book.probe(&mut other).is_none());
}

#[test]
fn test_book_errors() {
    let missing = std::env::temp_dir().join("kestrel-no-such-book.bin");
    assert!(matches!(PolyglotBook::open(&missing), Err(BookError::Io { .. })));

    let path = temp_book("short", &[0; 10]);
    let result = PolyglotBook::open(&path);
    fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(BookError::Empty(_))));
}
