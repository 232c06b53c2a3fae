//! Core chess types and representations
//!
//! - Bitboard representation
//! - Squares, colors, pieces and castling rights
//! - Move encoding
//! - Zobrist hashing
//! - Position state with make/unmake

pub mod bitboard;
pub mod board;
pub mod moves;
pub mod position;
pub mod zobrist;

pub use bitboard::{Bitboard, BitboardIter};
pub use board::{CastlingRights, Color, Piece, PieceType, Square};
pub use moves::{Move, MoveList, MoveType};
pub use position::{Position, START_FEN};
pub use zobrist::{ZobristHash, ZobristKeys};
