//! Core board tests
//!
//! FEN handling, make/unmake and hashing, cross-checked against shakmaty
//! along random games.

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shakmaty::fen::Fen;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position as _};

use kestrel::core::position::{Position, START_FEN};
use kestrel::engine::movegen::{legal_moves, parse_uci_move};
use kestrel::error::{FenError, MoveParseError};

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn shakmaty_from_fen(fen: &str) -> Chess {
    let f: Fen = fen.parse().unwrap();
    f.into_position(CastlingMode::Standard).unwrap()
}

fn sorted_uci(pos: &mut Position) -> Vec<String> {
    let mut moves: Vec<String> = legal_moves(pos).iter().map(|m| m.to_uci()).collect();
    moves.sort();
    moves
}

fn shakmaty_sorted_uci(pos: &Chess) -> Vec<String> {
    let mut moves: Vec<String> = pos
        .legal_moves()
        .iter()
        .map(|m| m.to_uci(CastlingMode::Standard).to_string())
        .collect();
    moves.sort();
    moves
}

fn shakmaty_key(pos: &Chess) -> u64 {
    let z: Zobrist64 = pos.zobrist_hash(EnPassantMode::PseudoLegal);
    z.0
}

// ============================================================================
// FEN
// ============================================================================

#[test]
fn test_fen_round_trips() {
    for fen in [
        START_FEN,
        KIWIPETE,
        "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w Kq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "4k3/8/8/8/8/8/8/4K3 b - - 37 80",
    ] {
        assert_eq!(Position::from_fen(fen).unwrap().to_fen(), fen);
    }
}

#[test]
fn test_fen_without_clocks_defaults() {
    let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - -").unwrap();
    assert_eq!(pos.halfmove_clock(), 0);
    assert_eq!(pos.fullmove_number(), 1);
}

#[test]
fn test_malformed_fen_is_rejected() {
    assert_eq!(Position::from_fen("8/8/8 w"), Err(FenError::FieldCount(2)));
    assert!(matches!(
        Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNX w KQkq - 0 1"),
        Err(FenError::Piece('X'))
    ));
    assert!(Position::from_fen("8/8/8/8/8/8/8/8 w - - 0 1").is_err());
    assert!(Position::from_fen("4k3/8/8/8/8/8/8/4K3 x - - 0 1").is_err());
}

#[test]
fn test_fen_after_e4() {
    let mut pos = Position::startpos();
    let mv = parse_uci_move(&mut pos, "e2e4").unwrap();
    pos.make_move(mv);
    assert_eq!(pos.to_fen(), "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1");
}

#[test]
fn test_fen_counters_are_bounded() {
    assert_eq!(
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 40000"),
        Err(FenError::Counter("40000".to_string()))
    );
    assert_eq!(
        Position::from_fen("4k3/8/8/8/8/8/8/4K2R w - - 65535 1"),
        Err(FenError::Counter("65535".to_string()))
    );

    let fen = "4k3/8/8/8/8/8/8/4K2R b - - 1000 10000";
    let mut pos = Position::from_fen(fen).unwrap();
    assert_eq!(pos.to_fen(), fen);
    assert_eq!(pos.move_number(), 19_999);
    let mv = parse_uci_move(&mut pos, "e8d8").unwrap();
    pos.make_move(mv);
    assert_eq!(pos.halfmove_clock(), 1001);
    assert_eq!(pos.fullmove_number(), 10_001);
    pos.unmake_move();
    assert_eq!(pos.to_fen(), fen);
}

#[test]
fn test_inconsistent_fen_is_rejected() {
    assert_eq!(
        Position::from_fen("4k2P/8/8/8/8/8/8/4K3 w - - 0 1"),
        Err(FenError::PawnOnBackRank)
    );
    assert_eq!(
        Position::from_fen("4k3/8/8/8/8/8/8/p3K3 w - - 0 1"),
        Err(FenError::PawnOnBackRank)
    );
    // No black pawn on d5 to capture
    assert_eq!(
        Position::from_fen("4k3/8/8/4P3/8/8/8/4K3 w - d6 0 1"),
        Err(FenError::EnPassant("d6".to_string()))
    );
    // The pawn cannot have come from d7 while d7 is occupied
    assert_eq!(
        Position::from_fen("4k3/3n4/8/3pP3/8/8/8/4K3 w - d6 0 1"),
        Err(FenError::EnPassant("d6".to_string()))
    );
}

#[test]
fn test_unsupported_castling_rights_are_dropped() {
    let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K2R w KQkq - 0 1").unwrap();
    let expected = Position::from_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
    assert_eq!(pos.to_fen(), "4k3/8/8/8/8/8/8/4K2R w K - 0 1");
    assert_eq!(pos.key(), expected.key());
    assert_eq!(pos.hash(), expected.hash());

    let moved_king = Position::from_fen("r3k2r/8/8/8/8/8/8/R4K1R w KQkq - 0 1").unwrap();
    assert_eq!(moved_king.to_fen(), "r3k2r/8/8/8/8/8/8/R4K1R w kq - 0 1");
}

// ============================================================================
// Move parsing
// ============================================================================

#[test]
fn test_parse_uci_move_errors() {
    let mut pos = Position::startpos();
    assert_eq!(parse_uci_move(&mut pos, "e2"), Err(MoveParseError::Syntax("e2".to_string())));
    assert_eq!(parse_uci_move(&mut pos, "e2e5"), Err(MoveParseError::Illegal("e2e5".to_string())));
    assert_eq!(parse_uci_move(&mut pos, "e2e4k"), Err(MoveParseError::Syntax("e2e4k".to_string())));
    assert!(parse_uci_move(&mut pos, "g1f3").is_ok());
}

#[test]
fn test_parse_promotion() {
    let mut pos = Position::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
    let mv = parse_uci_move(&mut pos, "a7a8n").unwrap();
    assert!(mv.is_promotion());
    assert_eq!(mv.to_uci(), "a7a8n");
}

// ============================================================================
// Cross-checks against shakmaty
// ============================================================================

#[test]
fn test_legal_moves_match_reference_on_known_positions() {
    for fen in [
        START_FEN,
        KIWIPETE,
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        "8/8/8/2k5/3Pp3/8/8/4K3 b - d3 0 1",
    ] {
        let mut ours = Position::from_fen(fen).unwrap();
        let theirs = shakmaty_from_fen(fen);
        assert_eq!(sorted_uci(&mut ours), shakmaty_sorted_uci(&theirs), "{fen}");
        assert_eq!(ours.key(), shakmaty_key(&theirs), "{fen}");
    }
}

#[test]
fn test_random_games_match_reference() {
    for seed in 0..24 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ours = Position::startpos();
        let mut theirs = Chess::default();

        for ply in 0..120 {
            let moves = sorted_uci(&mut ours);
            assert_eq!(moves, shakmaty_sorted_uci(&theirs), "seed {seed} ply {ply}");
            assert_eq!(ours.key(), shakmaty_key(&theirs), "seed {seed} ply {ply}");
            assert_eq!(ours.hash(), ours.compute_hash(), "seed {seed} ply {ply}");
            assert_eq!(ours.in_check(), theirs.is_check());
            if moves.is_empty() {
                break;
            }

            let text = &moves[rng.random_range(0..moves.len())];
            let mv = parse_uci_move(&mut ours, text).unwrap();
            ours.make_move(mv);
            let reference = theirs
                .legal_moves()
                .into_iter()
                .find(|m| m.to_uci(CastlingMode::Standard).to_string() == *text)
                .unwrap();
            theirs = theirs.play(&reference).unwrap();
        }
    }
}

#[test]
fn test_unmake_restores_random_games() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut pos = Position::from_fen(KIWIPETE).unwrap();
    let start = pos.clone();
    let mut played = 0;
    for _ in 0..60 {
        let moves = legal_moves(&mut pos);
        if moves.is_empty() {
            break;
        }
        let mv = moves.as_slice()[rng.random_range(0..moves.len())];
        pos.make_move(mv);
        played += 1;
    }
    for _ in 0..played {
        pos.unmake_move();
    }
    assert_eq!(pos, start);
}

// ============================================================================
// Draws
// ============================================================================

#[test]
fn test_threefold_repetition_by_knight_shuffle() {
    let mut pos = Position::startpos();
    for (i, text) in ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"]
        .iter()
        .enumerate()
    {
        assert!(!pos.is_draw(), "drawn too early at move {i}");
        let mv = parse_uci_move(&mut pos, text).unwrap();
        pos.make_move(mv);
    }
    assert!(pos.is_draw());
}

#[test]
fn test_insufficient_material_cases() {
    for (fen, drawn) in [
        ("4k3/8/8/8/8/8/8/4K3 w - - 0 1", true),
        ("4k3/8/8/8/8/8/8/4KN2 w - - 0 1", true),
        ("4k3/8/8/8/8/8/8/4KB2 w - - 0 1", true),
        ("4k3/8/8/8/8/8/8/3NKN2 w - - 0 1", true),
        ("4k3/8/8/8/8/8/8/4KR2 w - - 0 1", false),
        ("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1", false),
        ("3nk3/8/8/8/8/8/8/4KN2 w - - 0 1", false),
    ] {
        assert_eq!(Position::from_fen(fen).unwrap().is_insufficient_material(), drawn, "{fen}");
    }
}
