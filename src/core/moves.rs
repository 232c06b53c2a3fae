//! Move representation
//!
//! Moves are packed into a `u32`:
//! - bits 0-5: destination square
//! - bits 6-11: origin square
//! - bits 12-14: moved piece (1 pawn, 2 knight, 3 bishop, 4 rook, 5 queen, 6 king)
//! - bit 15: capture
//! - bits 16-19: special move type, see [`MoveType`]
//! - bit 21: gives check (set by the legal generator)
//!
//! The transposition table keeps bits 0-20, so the check marker never reaches
//! it and two moves that differ only in that marker compare equal.

use super::board::{PieceType, Square};
use std::fmt;

/// Special move types
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum MoveType {
    Normal = 0,
    KingsideCastle = 1,
    QueensideCastle = 2,
    EnPassant = 3,
    PromotionQueen = 4,
    PromotionKnight = 5,
    PromotionBishop = 6,
    PromotionRook = 7,
    DoublePawnPush = 8,
}

impl MoveType {
    const fn from_bits(bits: u32) -> Self {
        match bits {
            1 => MoveType::KingsideCastle,
            2 => MoveType::QueensideCastle,
            3 => MoveType::EnPassant,
            4 => MoveType::PromotionQueen,
            5 => MoveType::PromotionKnight,
            6 => MoveType::PromotionBishop,
            7 => MoveType::PromotionRook,
            8 => MoveType::DoublePawnPush,
            _ => MoveType::Normal,
        }
    }

    pub const fn promotion(piece: PieceType) -> Option<Self> {
        match piece {
            PieceType::Queen => Some(MoveType::PromotionQueen),
            PieceType::Knight => Some(MoveType::PromotionKnight),
            PieceType::Bishop => Some(MoveType::PromotionBishop),
            PieceType::Rook => Some(MoveType::PromotionRook),
            _ => None,
        }
    }
}

/// A chess move packed into 32 bits
#[derive(Clone, Copy, Default)]
pub struct Move(u32);

impl Move {
    pub const NONE: Move = Move(0);

    /// Bits that identify a move in the transposition table
    pub const TT_MASK: u32 = 0x1F_FFFF;

    const SQUARE_MASK: u32 = 0x3F;
    const FROM_SHIFT: u32 = 6;
    const PIECE_SHIFT: u32 = 12;
    const CAPTURE_FLAG: u32 = 1 << 15;
    const TYPE_SHIFT: u32 = 16;
    const TYPE_MASK: u32 = 0xF;
    const CHECK_FLAG: u32 = 1 << 21;

    #[inline]
    pub const fn new(from: Square, to: Square, piece: PieceType, capture: bool, move_type: MoveType) -> Self {
        let mut bits = (to.0 as u32)
            | ((from.0 as u32) << Self::FROM_SHIFT)
            | ((piece as u32 + 1) << Self::PIECE_SHIFT)
            | ((move_type as u32) << Self::TYPE_SHIFT);
        if capture {
            bits |= Self::CAPTURE_FLAG;
        }
        Move(bits)
    }

    /// Rebuild a move from its packed form (e.g. read back from the table)
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Move(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Packed form without the check marker
    #[inline]
    pub const fn tt_bits(self) -> u32 {
        self.0 & Self::TT_MASK
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.tt_bits() == 0
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub const fn from(self) -> Square {
        Square(((self.0 >> Self::FROM_SHIFT) & Self::SQUARE_MASK) as u8)
    }

    #[inline]
    pub const fn to(self) -> Square {
        Square((self.0 & Self::SQUARE_MASK) as u8)
    }

    /// Piece that moves; a null move reports a pawn
    #[inline]
    pub const fn piece(self) -> PieceType {
        match (self.0 >> Self::PIECE_SHIFT) & 0x7 {
            2 => PieceType::Knight,
            3 => PieceType::Bishop,
            4 => PieceType::Rook,
            5 => PieceType::Queen,
            6 => PieceType::King,
            _ => PieceType::Pawn,
        }
    }

    #[inline]
    pub const fn move_type(self) -> MoveType {
        MoveType::from_bits((self.0 >> Self::TYPE_SHIFT) & Self::TYPE_MASK)
    }

    #[inline]
    pub const fn is_capture(self) -> bool {
        self.0 & Self::CAPTURE_FLAG != 0
    }

    #[inline]
    pub const fn is_en_passant(self) -> bool {
        matches!(self.move_type(), MoveType::EnPassant)
    }

    #[inline]
    pub const fn is_castling(self) -> bool {
        matches!(self.move_type(), MoveType::KingsideCastle | MoveType::QueensideCastle)
    }

    #[inline]
    pub const fn is_promotion(self) -> bool {
        let t = (self.0 >> Self::TYPE_SHIFT) & Self::TYPE_MASK;
        t >= MoveType::PromotionQueen as u32 && t <= MoveType::PromotionRook as u32
    }

    #[inline]
    pub const fn is_double_push(self) -> bool {
        matches!(self.move_type(), MoveType::DoublePawnPush)
    }

    pub const fn promotion_piece(self) -> Option<PieceType> {
        match self.move_type() {
            MoveType::PromotionQueen => Some(PieceType::Queen),
            MoveType::PromotionKnight => Some(PieceType::Knight),
            MoveType::PromotionBishop => Some(PieceType::Bishop),
            MoveType::PromotionRook => Some(PieceType::Rook),
            _ => None,
        }
    }

    /// Captures and promotions: what quiescence looks at
    #[inline]
    pub const fn is_tactical(self) -> bool {
        self.is_capture() || self.is_promotion()
    }

    #[inline]
    pub const fn gives_check(self) -> bool {
        self.0 & Self::CHECK_FLAG != 0
    }

    #[inline]
    pub const fn with_check(self) -> Self {
        Move(self.0 | Self::CHECK_FLAG)
    }

    /// Pawn move landing on the 6th, 7th or 8th rank from the mover's side
    pub const fn is_pawn_push_678(self) -> bool {
        if !matches!(self.piece(), PieceType::Pawn) {
            return false;
        }
        let to = self.to().0;
        // White pushes land at 40+, black pushes at 23 or below
        if self.from().0 < to { to >= 40 } else { to < 24 }
    }

    /// UCI long algebraic notation ("e2e4", "e7e8q", "0000" for none)
    pub fn to_uci(self) -> String {
        if self.is_none() {
            return "0000".to_string();
        }
        match self.promotion_piece() {
            Some(p) => format!("{}{}{}", self.from(), self.to(), p.to_char()),
            None => format!("{}{}", self.from(), self.to()),
        }
    }
}

impl PartialEq for Move {
    fn eq(&self, other: &Self) -> bool {
        self.tt_bits() == other.tt_bits()
    }
}

impl Eq for Move {}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())?;
        if self.gives_check() {
            write!(f, "+")?;
        }
        Ok(())
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

pub const MAX_MOVES: usize = 256;

/// Fixed-capacity move list living on the stack
#[derive(Clone)]
pub struct MoveList {
    moves: [Move; MAX_MOVES],
    len: usize,
}

impl MoveList {
    pub fn new() -> Self {
        MoveList {
            moves: [Move::NONE; MAX_MOVES],
            len: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, mv: Move) {
        if self.len < MAX_MOVES {
            self.moves[self.len] = mv;
            self.len += 1;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Move> {
        self.as_slice().get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.as_slice().iter()
    }

    pub fn as_slice(&self) -> &[Move] {
        &self.moves[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [Move] {
        &mut self.moves[..self.len]
    }

    pub fn contains(&self, mv: Move) -> bool {
        self.iter().any(|&m| m == mv)
    }

    /// Keep only moves matching `keep`, preserving order
    pub fn retain(&mut self, mut keep: impl FnMut(Move) -> bool) {
        let mut kept = 0;
        for i in 0..self.len {
            let mv = self.moves[i];
            if keep(mv) {
                self.moves[kept] = mv;
                kept += 1;
            }
        }
        self.len = kept;
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<usize> for MoveList {
    type Output = Move;
    fn index(&self, index: usize) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl fmt::Debug for MoveList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
