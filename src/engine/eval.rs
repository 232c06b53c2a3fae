//! Static evaluation
//!
//! The search only depends on the [`Evaluator`] trait. `MaterialEvaluator`
//! is the built-in scorer: material, centralisation, pawn advancement, a
//! bishop pair bonus and a doubled pawn penalty.

use crate::core::bitboard::Bitboard;
use crate::core::board::{Color, PieceType};
use crate::core::position::Position;

/// A position scorer. Scores are centipawns from the side to move's point
/// of view and must be deterministic for a given position.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, position: &Position) -> i32;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MaterialEvaluator;

const PIECE_VALUES: [i32; 6] = [100, 325, 325, 500, 975, 0];
const BISHOP_PAIR: i32 = 30;
const DOUBLED_PAWN: i32 = 15;

/// Twice the Manhattan distance from the board centre, 2..=14
#[inline]
fn centre_distance2(file: i32, rank: i32) -> i32 {
    (7 - 2 * file).abs() + (7 - 2 * rank).abs()
}

impl MaterialEvaluator {
    fn piece_bonus(position: &Position, piece: PieceType, color: Color, file: i32, rank: i32) -> i32 {
        match piece {
            PieceType::Knight | PieceType::Bishop => 15 - centre_distance2(file, rank) * 3 / 2,
            PieceType::Pawn => {
                let advancement = match color {
                    Color::White => rank,
                    Color::Black => 7 - rank,
                };
                advancement * 5
            }
            PieceType::King => {
                if position.pieces(PieceType::Queen).is_not_empty() {
                    // Keep the king tucked away while queens are on
                    let edge = file.min(7 - file).min(rank.min(7 - rank));
                    -edge * 5
                } else {
                    15 - centre_distance2(file, rank) * 3 / 2
                }
            }
            _ => 0,
        }
    }

    /// Score from white's point of view
    pub fn evaluate_white(&self, position: &Position) -> i32 {
        let mut score = 0;

        for sq in position.occupied() {
            let Some(piece) = position.piece_at(sq) else {
                continue;
            };
            let sign = match piece.color {
                Color::White => 1,
                Color::Black => -1,
            };
            let value = PIECE_VALUES[piece.piece_type.index()]
                + Self::piece_bonus(position, piece.piece_type, piece.color, sq.file() as i32, sq.rank() as i32);
            score += sign * value;
        }

        for (color, sign) in [(Color::White, 1), (Color::Black, -1)] {
            if position.pieces_of(PieceType::Bishop, color).count() >= 2 {
                score += sign * BISHOP_PAIR;
            }
            let pawns = position.pieces_of(PieceType::Pawn, color);
            for file in 0..8 {
                let on_file = (pawns & Bitboard::file_mask(file)).count() as i32;
                if on_file > 1 {
                    score -= sign * (on_file - 1) * DOUBLED_PAWN;
                }
            }
        }

        score
    }
}

impl Evaluator for MaterialEvaluator {
    fn evaluate(&self, position: &Position) -> i32 {
        let score = self.evaluate_white(position);
        match position.side_to_move() {
            Color::White => score,
            Color::Black => -score,
        }
    }
}
