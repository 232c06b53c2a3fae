//! Perft tests
//!
//! Leaf counts of the legal move tree for the standard test positions.
//! Deep counts are ignored by default; run them with `--ignored` in release.

use kestrel::core::position::Position;
use kestrel::engine::movegen::{divide, perft};

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const POSITION_3: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
const POSITION_4: &str = "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1";
const POSITION_5: &str = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8";
const POSITION_6: &str = "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10";

fn perft_fen(fen: &str, depth: u32) -> u64 {
    let mut pos = Position::from_fen(fen).unwrap();
    perft(&mut pos, depth)
}

// ============================================================================
// Start position
// ============================================================================

#[test]
fn test_perft_startpos_shallow() {
    let mut pos = Position::startpos();
    assert_eq!(perft(&mut pos, 0), 1);
    assert_eq!(perft(&mut pos, 1), 20);
    assert_eq!(perft(&mut pos, 2), 400);
    assert_eq!(perft(&mut pos, 3), 8902);
}

#[test]
fn test_perft_startpos_depth_4() {
    let mut pos = Position::startpos();
    assert_eq!(perft(&mut pos, 4), 197_281);
}

#[test]
#[ignore]
fn test_perft_startpos_depth_5() {
    let mut pos = Position::startpos();
    assert_eq!(perft(&mut pos, 5), 4_865_609);
}

#[test]
fn test_perft_leaves_position_unchanged() {
    let mut pos = Position::from_fen(KIWIPETE).unwrap();
    let before = pos.clone();
    perft(&mut pos, 3);
    assert_eq!(pos, before);
}

// ============================================================================
// Kiwipete: castling, pins, en passant, promotions
// ============================================================================

#[test]
fn test_perft_kiwipete_shallow() {
    assert_eq!(perft_fen(KIWIPETE, 1), 48);
    assert_eq!(perft_fen(KIWIPETE, 2), 2039);
    assert_eq!(perft_fen(KIWIPETE, 3), 97_862);
}

#[test]
#[ignore]
fn test_perft_kiwipete_depth_4() {
    assert_eq!(perft_fen(KIWIPETE, 4), 4_085_603);
}

// ============================================================================
// Other standard positions
// ============================================================================

#[test]
fn test_perft_position_3() {
    assert_eq!(perft_fen(POSITION_3, 1), 14);
    assert_eq!(perft_fen(POSITION_3, 2), 191);
    assert_eq!(perft_fen(POSITION_3, 3), 2812);
    assert_eq!(perft_fen(POSITION_3, 4), 43_238);
}

#[test]
#[ignore]
fn test_perft_position_3_depth_5() {
    assert_eq!(perft_fen(POSITION_3, 5), 674_624);
}

#[test]
fn test_perft_position_4() {
    assert_eq!(perft_fen(POSITION_4, 1), 6);
    assert_eq!(perft_fen(POSITION_4, 2), 264);
    assert_eq!(perft_fen(POSITION_4, 3), 9467);
}

#[test]
fn test_perft_position_5() {
    assert_eq!(perft_fen(POSITION_5, 1), 44);
    assert_eq!(perft_fen(POSITION_5, 2), 1486);
    assert_eq!(perft_fen(POSITION_5, 3), 62_379);
}

#[test]
fn test_perft_position_6() {
    assert_eq!(perft_fen(POSITION_6, 1), 46);
    assert_eq!(perft_fen(POSITION_6, 2), 2079);
    assert_eq!(perft_fen(POSITION_6, 3), 89_890);
}

// ============================================================================
// Divide
// ============================================================================

#[test]
fn test_divide_sums_to_perft() {
    let mut pos = Position::from_fen(KIWIPETE).unwrap();
    let split = divide(&mut pos, 2);
    assert_eq!(split.len(), 48);
    assert_eq!(split.iter().map(|&(_, n)| n).sum::<u64>(), 2039);
}

#[test]
fn test_divide_startpos_depth_1() {
    let mut pos = Position::startpos();
    let split = divide(&mut pos, 1);
    assert_eq!(split.len(), 20);
    assert!(split.iter().all(|&(_, n)| n == 1));
}
