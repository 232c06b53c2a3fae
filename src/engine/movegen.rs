//! Move generation
//!
//! `PseudoLegalGenerator` walks the side to move's pieces and looks their
//! destinations up in the attack tables. `LegalMoveGenerator` wraps any
//! generator and keeps only the moves that do not leave the mover's king
//! attacked, tagging the ones that give check on the way.

use crate::core::bitboard::Bitboard;
use crate::core::board::{CastlingRights, Color, PieceType, Square};
use crate::core::moves::{Move, MoveList, MoveType};
use crate::core::position::Position;
use crate::engine::attacks::AttackTables;
use crate::error::MoveParseError;

/// Which subset of moves to produce
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GenType {
    /// Every move
    All,
    /// Captures and promotions
    Tactical,
    /// Captures, promotions and quiet moves that give check
    TacticalAndChecks,
}

/// Anything that can fill a move list for a position.
///
/// Generation takes `&mut Position` so that filters can make and unmake
/// moves; the position is always left as it was found.
pub trait MoveGenerator {
    fn generate(&self, position: &mut Position, kind: GenType, moves: &mut MoveList);
}

const PROMOTIONS: [PieceType; 4] = [PieceType::Queen, PieceType::Knight, PieceType::Rook, PieceType::Bishop];

/// Generates moves by piece movement rules alone, ignoring pins and checks
/// (castling excepted: it is never produced through or out of check).
#[derive(Clone, Copy, Debug, Default)]
pub struct PseudoLegalGenerator;

impl MoveGenerator for PseudoLegalGenerator {
    fn generate(&self, position: &mut Position, kind: GenType, moves: &mut MoveList) {
        let tactical_only = kind == GenType::Tactical;
        let us = position.side_to_move();
        let their_pieces = position.color(us.opposite());
        let targets = if tactical_only {
            their_pieces
        } else {
            !position.color(us)
        };

        generate_pawn_moves(position, moves, tactical_only);

        let tables = AttackTables::instance();
        let occupied = position.occupied();
        for piece in [PieceType::Knight, PieceType::Bishop, PieceType::Rook, PieceType::Queen, PieceType::King] {
            for from in position.pieces_of(piece, us) {
                let attacks = tables.attacks(piece, us, from, occupied) & targets;
                for to in attacks {
                    let capture = their_pieces.contains(to);
                    moves.push(Move::new(from, to, piece, capture, MoveType::Normal));
                }
            }
        }

        if !tactical_only {
            generate_castling_moves(position, moves);
        }
    }
}

fn push_promotions(moves: &mut MoveList, from: Square, to: Square, capture: bool) {
    for promoted in PROMOTIONS {
        if let Some(move_type) = MoveType::promotion(promoted) {
            moves.push(Move::new(from, to, PieceType::Pawn, capture, move_type));
        }
    }
}

fn generate_pawn_moves(position: &Position, moves: &mut MoveList, tactical_only: bool) {
    let tables = AttackTables::instance();
    let us = position.side_to_move();
    let their_pieces = position.color(us.opposite());
    let empty = !position.occupied();
    let pawns = position.pieces_of(PieceType::Pawn, us);
    let back = -us.pawn_direction();

    let (push, promo_rank, double_rank): (fn(Bitboard) -> Bitboard, Bitboard, Bitboard) = match us {
        Color::White => (Bitboard::north, Bitboard::RANK_8, Bitboard::RANK_3),
        Color::Black => (Bitboard::south, Bitboard::RANK_1, Bitboard::RANK_6),
    };

    let single = push(pawns) & empty;
    for to in single & promo_rank {
        push_promotions(moves, to.offset(back), to, false);
    }
    if !tactical_only {
        for to in single & !promo_rank {
            moves.push(Move::new(to.offset(back), to, PieceType::Pawn, false, MoveType::Normal));
        }
        for to in push(single & double_rank) & empty {
            moves.push(Move::new(to.offset(2 * back), to, PieceType::Pawn, false, MoveType::DoublePawnPush));
        }
    }

    for from in pawns {
        let attacks = tables.pawn(us, from);
        for to in attacks & their_pieces {
            if promo_rank.contains(to) {
                push_promotions(moves, from, to, true);
            } else {
                moves.push(Move::new(from, to, PieceType::Pawn, true, MoveType::Normal));
            }
        }
        if let Some(ep) = position.en_passant() {
            if attacks.contains(ep) {
                moves.push(Move::new(from, ep, PieceType::Pawn, true, MoveType::EnPassant));
            }
        }
    }
}

fn generate_castling_moves(position: &Position, moves: &mut MoveList) {
    let us = position.side_to_move();
    let them = us.opposite();
    let castling = position.castling();
    if !castling.has(CastlingRights::kingside(us)) && !castling.has(CastlingRights::queenside(us)) {
        return;
    }

    let king_sq = match us {
        Color::White => Square::E1,
        Color::Black => Square::E8,
    };
    if position.piece_at(king_sq).map(|p| p.piece_type) != Some(PieceType::King) || position.in_check() {
        return;
    }
    let occupied = position.occupied();
    let rook_on = |sq: Square| position.pieces_of(PieceType::Rook, us).contains(sq);

    // f and g files must be empty, and neither may be attacked
    if castling.has(CastlingRights::kingside(us))
        && rook_on(king_sq.offset(3))
        && !occupied.contains(king_sq.offset(1))
        && !occupied.contains(king_sq.offset(2))
        && !position.is_attacked(king_sq.offset(1), them)
        && !position.is_attacked(king_sq.offset(2), them)
    {
        moves.push(Move::new(king_sq, king_sq.offset(2), PieceType::King, false, MoveType::KingsideCastle));
    }

    // b, c and d files must be empty; only c and d need to be safe
    if castling.has(CastlingRights::queenside(us))
        && rook_on(king_sq.offset(-4))
        && !occupied.contains(king_sq.offset(-1))
        && !occupied.contains(king_sq.offset(-2))
        && !occupied.contains(king_sq.offset(-3))
        && !position.is_attacked(king_sq.offset(-1), them)
        && !position.is_attacked(king_sq.offset(-2), them)
    {
        moves.push(Move::new(king_sq, king_sq.offset(-2), PieceType::King, false, MoveType::QueensideCastle));
    }
}

/// Filters another generator's output down to legal moves by making each
/// candidate and testing whether the mover's king is attacked.
#[derive(Clone, Copy, Debug, Default)]
pub struct LegalMoveGenerator<G = PseudoLegalGenerator> {
    inner: G,
}

impl<G: MoveGenerator> LegalMoveGenerator<G> {
    pub fn new(inner: G) -> Self {
        LegalMoveGenerator { inner }
    }
}

impl<G: MoveGenerator> MoveGenerator for LegalMoveGenerator<G> {
    fn generate(&self, position: &mut Position, kind: GenType, moves: &mut MoveList) {
        let mut candidates = MoveList::new();
        let inner_kind = match kind {
            GenType::TacticalAndChecks => GenType::All,
            other => other,
        };
        self.inner.generate(position, inner_kind, &mut candidates);

        for &mv in candidates.iter() {
            position.make_move(mv);
            let legal = !position.mover_in_check();
            let gives_check = legal && position.in_check();
            position.unmake_move();

            if !legal || (kind == GenType::TacticalAndChecks && !mv.is_tactical() && !gives_check) {
                continue;
            }
            moves.push(if gives_check { mv.with_check() } else { mv });
        }
    }
}

/// All legal moves in `position`
pub fn legal_moves(position: &mut Position) -> MoveList {
    let mut moves = MoveList::new();
    LegalMoveGenerator::<PseudoLegalGenerator>::default().generate(position, GenType::All, &mut moves);
    moves
}

/// Resolve UCI move text ("e2e4", "a7a8q") against the legal moves
pub fn parse_uci_move(position: &mut Position, text: &str) -> Result<Move, MoveParseError> {
    let syntax = || MoveParseError::Syntax(text.to_string());
    if !(4..=5).contains(&text.len()) || !text.is_ascii() {
        return Err(syntax());
    }
    let from = Square::from_algebraic(&text[0..2]).ok_or_else(syntax)?;
    let to = Square::from_algebraic(&text[2..4]).ok_or_else(syntax)?;
    let promotion = match text.chars().nth(4) {
        Some(c) => match PieceType::from_char(c) {
            Some(pt) if PROMOTIONS.contains(&pt) => Some(pt),
            _ => return Err(syntax()),
        },
        None => None,
    };

    legal_moves(position)
        .iter()
        .copied()
        .find(|mv| mv.from() == from && mv.to() == to && mv.promotion_piece() == promotion)
        .ok_or_else(|| MoveParseError::Illegal(text.to_string()))
}

/// Count leaf nodes of the legal move tree
pub fn perft(position: &mut Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = legal_moves(position);
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0;
    for &mv in moves.iter() {
        position.make_move(mv);
        nodes += perft(position, depth - 1);
        position.unmake_move();
    }
    nodes
}

/// Per-root-move perft counts
pub fn divide(position: &mut Position, depth: u32) -> Vec<(Move, u64)> {
    let moves = legal_moves(position);
    moves
        .iter()
        .map(|&mv| {
            position.make_move(mv);
            let nodes = perft(position, depth.saturating_sub(1));
            position.unmake_move();
            (mv, nodes)
        })
        .collect()
}
