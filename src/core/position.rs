//! Position state with make/unmake
//!
//! A `Position` is mutated in place along the search path. Every make pushes
//! an undo record and every unmake pops one, so the board, both hash keys and
//! the counters return exactly to their previous values.

use super::bitboard::Bitboard;
use super::board::{CastlingRights, Color, Piece, PieceType, Square};
use super::moves::{Move, MoveType};
use super::zobrist::{EXCLUSION_SALT, ZobristHash, ZobristKeys};
use crate::engine::attacks::AttackTables;
use crate::error::FenError;
use std::fmt;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Largest move counters accepted from FEN
pub const MAX_HALFMOVE_CLOCK: u16 = 1000;
pub const MAX_FULLMOVE_NUMBER: u16 = 10000;

fn parse_counter(text: &str, max: u16) -> Result<u16, FenError> {
    text.parse::<u16>()
        .ok()
        .filter(|&n| n <= max)
        .ok_or_else(|| FenError::Counter(text.to_string()))
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Undo {
    mv: Move,
    captured: Option<Piece>,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u16,
    hash: ZobristHash,
}

/// The chess board state
#[derive(Clone, PartialEq, Eq)]
pub struct Position {
    pieces: [Bitboard; 6],
    colors: [Bitboard; 2],
    occupied: Bitboard,
    piece_at: [Option<Piece>; 64],
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u16,
    fullmove_number: u16,
    /// Plies since the game started
    move_number: u16,
    hash: ZobristHash,
    history: Vec<Undo>,
}

impl Position {
    fn empty() -> Self {
        Position {
            pieces: [Bitboard::EMPTY; 6],
            colors: [Bitboard::EMPTY; 2],
            occupied: Bitboard::EMPTY,
            piece_at: [None; 64],
            side_to_move: Color::White,
            castling: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            move_number: 0,
            hash: ZobristHash::ZERO,
            history: Vec::with_capacity(256),
        }
    }

    /// The standard starting position
    pub fn startpos() -> Self {
        let mut pos = Position::empty();
        pos.load_start();
        pos
    }

    fn load_start(&mut self) {
        const BACK_RANK: [PieceType; 8] = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];
        for (file, &piece_type) in BACK_RANK.iter().enumerate() {
            let file = file as u8;
            self.put_piece(Piece::new(piece_type, Color::White), Square::from_file_rank(file, 0));
            self.put_piece(Piece::new(PieceType::Pawn, Color::White), Square::from_file_rank(file, 1));
            self.put_piece(Piece::new(PieceType::Pawn, Color::Black), Square::from_file_rank(file, 6));
            self.put_piece(Piece::new(piece_type, Color::Black), Square::from_file_rank(file, 7));
        }
        self.castling = CastlingRights::ALL;
        self.hash = self.compute_hash();
    }

    /// Parse a position from FEN. Missing clocks default to "0 1".
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let mut pos = Position::empty();
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(FenError::FieldCount(parts.len()));
        }

        let ranks: Vec<&str> = parts[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::Placement);
        }
        for (i, rank_text) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for c in rank_text.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(FenError::Placement);
                    }
                    file += skip as u8;
                } else {
                    let piece = Piece::from_char(c).ok_or(FenError::Piece(c))?;
                    if file >= 8 {
                        return Err(FenError::Placement);
                    }
                    pos.put_piece(piece, Square::from_file_rank(file, rank));
                    file += 1;
                }
                if file > 8 {
                    return Err(FenError::Placement);
                }
            }
            if file != 8 {
                return Err(FenError::Placement);
            }
        }

        pos.side_to_move = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::Side(other.to_string())),
        };

        let mut castling = 0u8;
        if parts[2] != "-" {
            for c in parts[2].chars() {
                castling |= match c {
                    'K' => CastlingRights::WHITE_KINGSIDE,
                    'Q' => CastlingRights::WHITE_QUEENSIDE,
                    'k' => CastlingRights::BLACK_KINGSIDE,
                    'q' => CastlingRights::BLACK_QUEENSIDE,
                    _ => return Err(FenError::Castling(parts[2].to_string())),
                };
            }
        }
        pos.castling = CastlingRights::new(castling);

        pos.en_passant = if parts[3] == "-" {
            None
        } else {
            let sq = Square::from_algebraic(parts[3])
                .ok_or_else(|| FenError::EnPassant(parts[3].to_string()))?;
            let expected_rank = match pos.side_to_move {
                Color::White => 5,
                Color::Black => 2,
            };
            if sq.rank() != expected_rank {
                return Err(FenError::EnPassant(parts[3].to_string()));
            }
            // The pawn that just advanced two squares must be in front of
            // the target, with the target and its origin empty
            let us = pos.side_to_move;
            let pushed = sq.offset(-us.pawn_direction());
            let origin = sq.offset(us.pawn_direction());
            if pos.piece_at(pushed) != Some(Piece::new(PieceType::Pawn, us.opposite()))
                || pos.piece_at(sq).is_some()
                || pos.piece_at(origin).is_some()
            {
                return Err(FenError::EnPassant(parts[3].to_string()));
            }
            Some(sq)
        };

        if let Some(text) = parts.get(4) {
            pos.halfmove_clock = parse_counter(text, MAX_HALFMOVE_CLOCK)?;
        }
        if let Some(text) = parts.get(5) {
            pos.fullmove_number = parse_counter(text, MAX_FULLMOVE_NUMBER)?.max(1);
        }
        pos.move_number = (pos.fullmove_number - 1) * 2
            + match pos.side_to_move {
                Color::White => 0,
                Color::Black => 1,
            };

        for color in Color::BOTH {
            if pos.pieces_of(PieceType::King, color).count() != 1 {
                return Err(FenError::KingCount);
            }
        }
        if (pos.pieces(PieceType::Pawn) & (Bitboard::RANK_1 | Bitboard::RANK_8)).is_not_empty() {
            return Err(FenError::PawnOnBackRank);
        }
        pos.castling = pos.supported_castling(pos.castling);
        let them = pos.side_to_move.opposite();
        if pos.is_attacked(pos.king_square(them), pos.side_to_move) {
            return Err(FenError::OpponentInCheck);
        }

        pos.hash = pos.compute_hash();
        Ok(pos)
    }

    /// Keep only the rights whose king and rook still stand on their home squares
    fn supported_castling(&self, rights: CastlingRights) -> CastlingRights {
        let mut rights = rights;
        for (color, home_rank) in [(Color::White, 0), (Color::Black, 7)] {
            let king = Piece::new(PieceType::King, color);
            let rook = Piece::new(PieceType::Rook, color);
            let at = |file| self.piece_at(Square::from_file_rank(file, home_rank));
            if at(4) != Some(king) {
                rights.remove(CastlingRights::kingside(color) | CastlingRights::queenside(color));
                continue;
            }
            if at(7) != Some(rook) {
                rights.remove(CastlingRights::kingside(color));
            }
            if at(0) != Some(rook) {
                rights.remove(CastlingRights::queenside(color));
            }
        }
        rights
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();

        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.piece_at(Square::from_file_rank(file, rank)) {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push_str(&empty.to_string());
                            empty = 0;
                        }
                        fen.push(piece.to_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });
        fen.push(' ');
        fen.push_str(&self.castling.to_string());
        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&sq.to_algebraic()),
            None => fen.push('-'),
        }
        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        fen
    }

    fn put_piece(&mut self, piece: Piece, sq: Square) {
        let bb = sq.bitboard();
        self.pieces[piece.piece_type.index()] |= bb;
        self.colors[piece.color.index()] |= bb;
        self.occupied |= bb;
        self.piece_at[sq.index()] = Some(piece);
    }

    fn remove_piece(&mut self, sq: Square) -> Option<Piece> {
        let piece = self.piece_at[sq.index()]?;
        let bb = !sq.bitboard();
        self.pieces[piece.piece_type.index()] &= bb;
        self.colors[piece.color.index()] &= bb;
        self.occupied &= bb;
        self.piece_at[sq.index()] = None;
        Some(piece)
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.piece_at[sq.index()]
    }

    #[inline]
    pub fn pieces(&self, piece_type: PieceType) -> Bitboard {
        self.pieces[piece_type.index()]
    }

    #[inline]
    pub fn color(&self, color: Color) -> Bitboard {
        self.colors[color.index()]
    }

    #[inline]
    pub fn pieces_of(&self, piece_type: PieceType, color: Color) -> Bitboard {
        self.pieces[piece_type.index()] & self.colors[color.index()]
    }

    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.occupied
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    #[inline]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    #[inline]
    pub fn move_number(&self) -> u16 {
        self.move_number
    }

    #[inline]
    pub fn hash(&self) -> ZobristHash {
        self.hash
    }

    /// Primary key, also the Polyglot book key
    #[inline]
    pub fn key(&self) -> u64 {
        self.hash.primary
    }

    /// Key addressing the slots used by singular-extension exclusion searches
    #[inline]
    pub fn exclusion_key(&self) -> u64 {
        self.hash.primary ^ EXCLUSION_SALT
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.pieces_of(PieceType::King, color).lsb()
    }

    /// The move that produced this position, if any
    pub fn last_move(&self) -> Option<Move> {
        self.history.last().map(|undo| undo.mv).filter(|mv| mv.is_some())
    }

    /// The piece captured by the last move, if any
    pub fn last_captured(&self) -> Option<Piece> {
        self.history.last().and_then(|undo| undo.captured)
    }

    /// True if `color` owns anything besides pawns and the king
    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        let kings_and_pawns = self.pieces(PieceType::King) | self.pieces(PieceType::Pawn);
        (self.color(color) & !kings_and_pawns).is_not_empty()
    }

    /// Both sides' pieces attacking `sq` given `occupied` as the blockers
    pub fn attackers_to_with(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        let tables = AttackTables::instance();
        let diagonal = self.pieces(PieceType::Bishop) | self.pieces(PieceType::Queen);
        let straight = self.pieces(PieceType::Rook) | self.pieces(PieceType::Queen);

        (tables.pawn(Color::White, sq) & self.pieces_of(PieceType::Pawn, Color::Black))
            | (tables.pawn(Color::Black, sq) & self.pieces_of(PieceType::Pawn, Color::White))
            | (tables.knight(sq) & self.pieces(PieceType::Knight))
            | (tables.king(sq) & self.pieces(PieceType::King))
            | (tables.bishop(sq, occupied) & diagonal)
            | (tables.rook(sq, occupied) & straight)
    }

    /// Pieces of `attacker_color` attacking `sq`
    #[inline]
    pub fn attackers_to(&self, sq: Square, attacker_color: Color) -> Bitboard {
        self.attackers_to_with(sq, self.occupied) & self.color(attacker_color)
    }

    /// Check if a square is attacked by a specific color
    pub fn is_attacked(&self, sq: Square, by_color: Color) -> bool {
        let tables = AttackTables::instance();
        let them = self.color(by_color);
        if (tables.pawn(by_color.opposite(), sq) & self.pieces(PieceType::Pawn) & them).is_not_empty()
            || (tables.knight(sq) & self.pieces(PieceType::Knight) & them).is_not_empty()
            || (tables.king(sq) & self.pieces(PieceType::King) & them).is_not_empty()
        {
            return true;
        }
        let diagonal = (self.pieces(PieceType::Bishop) | self.pieces(PieceType::Queen)) & them;
        let straight = (self.pieces(PieceType::Rook) | self.pieces(PieceType::Queen)) & them;
        (tables.bishop(sq, self.occupied) & diagonal).is_not_empty()
            || (tables.rook(sq, self.occupied) & straight).is_not_empty()
    }

    /// Check if the side to move is in check
    #[inline]
    pub fn in_check(&self) -> bool {
        self.is_attacked(self.king_square(self.side_to_move), self.side_to_move.opposite())
    }

    /// Whether the side that just moved left its own king attacked
    #[inline]
    pub fn mover_in_check(&self) -> bool {
        let mover = self.side_to_move.opposite();
        self.is_attacked(self.king_square(mover), self.side_to_move)
    }

    /// En passant file that enters the hash: only when a pawn of the side to
    /// move could actually capture
    fn hashed_en_passant(&self) -> Option<u8> {
        let ep = self.en_passant?;
        let capturers = AttackTables::instance().pawn(self.side_to_move.opposite(), ep)
            & self.pieces_of(PieceType::Pawn, self.side_to_move);
        capturers.is_not_empty().then_some(ep.file())
    }

    /// Compute both keys from the board contents
    pub fn compute_hash(&self) -> ZobristHash {
        let keys = ZobristKeys::instance();
        let mut hash = ZobristHash::ZERO;
        for sq in self.occupied {
            if let Some(piece) = self.piece_at(sq) {
                hash ^= keys.piece(piece, sq);
            }
        }
        hash ^= keys.castling(self.castling);
        if let Some(file) = self.hashed_en_passant() {
            hash ^= keys.en_passant(file);
        }
        if self.side_to_move == Color::White {
            hash ^= keys.white_to_move();
        }
        hash
    }

    /// Apply a pseudo-legal move generated for this position. The caller
    /// checks `mover_in_check` afterwards if legality is unknown.
    pub fn make_move(&mut self, mv: Move) {
        let keys = ZobristKeys::instance();
        let us = self.side_to_move;
        let them = us.opposite();
        let from = mv.from();
        let to = mv.to();

        let mut undo = Undo {
            mv,
            captured: None,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            hash: self.hash,
        };

        let mut hash = self.hash;
        if let Some(file) = self.hashed_en_passant() {
            hash ^= keys.en_passant(file);
        }
        self.en_passant = None;

        let Some(piece) = self.remove_piece(from) else {
            // Nothing to move; keep the stack balanced for unmake
            self.history.push(undo);
            return;
        };
        hash ^= keys.piece(piece, from);

        if mv.is_capture() {
            let capture_sq = if mv.is_en_passant() {
                to.offset(-us.pawn_direction())
            } else {
                to
            };
            if let Some(captured) = self.remove_piece(capture_sq) {
                hash ^= keys.piece(captured, capture_sq);
                undo.captured = Some(captured);
            }
        }

        if piece.piece_type == PieceType::Pawn || mv.is_capture() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }

        if let Some((rook_from, rook_to)) = castling_rook_squares(mv) {
            if let Some(rook) = self.remove_piece(rook_from) {
                hash ^= keys.piece(rook, rook_from) ^ keys.piece(rook, rook_to);
                self.put_piece(rook, rook_to);
            }
        }

        let placed = match mv.promotion_piece() {
            Some(promoted) => Piece::new(promoted, us),
            None => piece,
        };
        hash ^= keys.piece(placed, to);
        self.put_piece(placed, to);

        let old_castling = self.castling;
        self.castling.remove(CastlingRights::rights_for_square(from));
        self.castling.remove(CastlingRights::rights_for_square(to));
        if old_castling != self.castling {
            hash ^= keys.castling(old_castling) ^ keys.castling(self.castling);
        }

        if mv.move_type() == MoveType::DoublePawnPush {
            self.en_passant = Some(from.offset(us.pawn_direction()));
        }

        self.side_to_move = them;
        hash ^= keys.white_to_move();
        if let Some(file) = self.hashed_en_passant() {
            hash ^= keys.en_passant(file);
        }
        if us == Color::Black {
            self.fullmove_number += 1;
        }
        self.move_number += 1;
        self.hash = hash;
        self.history.push(undo);
    }

    /// Revert the last `make_move`
    pub fn unmake_move(&mut self) {
        let Some(undo) = self.history.pop() else {
            return;
        };
        let mv = undo.mv;
        let them = self.side_to_move;
        let us = them.opposite();
        let from = mv.from();
        let to = mv.to();

        self.side_to_move = us;
        if us == Color::Black {
            self.fullmove_number -= 1;
        }
        self.move_number -= 1;

        if let Some(placed) = self.remove_piece(to) {
            let original = if mv.is_promotion() {
                Piece::new(PieceType::Pawn, us)
            } else {
                placed
            };
            self.put_piece(original, from);
        }

        if let Some((rook_from, rook_to)) = castling_rook_squares(mv) {
            if let Some(rook) = self.remove_piece(rook_to) {
                self.put_piece(rook, rook_from);
            }
        }

        if let Some(captured) = undo.captured {
            let capture_sq = if mv.is_en_passant() {
                to.offset(-us.pawn_direction())
            } else {
                to
            };
            self.put_piece(captured, capture_sq);
        }

        self.castling = undo.castling;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        self.hash = undo.hash;
    }

    /// Pass the turn (null move pruning)
    pub fn make_null_move(&mut self) {
        let keys = ZobristKeys::instance();
        self.history.push(Undo {
            mv: Move::NONE,
            captured: None,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            hash: self.hash,
        });
        if let Some(file) = self.hashed_en_passant() {
            self.hash ^= keys.en_passant(file);
        }
        self.en_passant = None;
        self.side_to_move = self.side_to_move.opposite();
        self.hash ^= keys.white_to_move();
        self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        self.move_number += 1;
    }

    pub fn unmake_null_move(&mut self) {
        if let Some(undo) = self.history.pop() {
            self.side_to_move = self.side_to_move.opposite();
            self.en_passant = undo.en_passant;
            self.halfmove_clock = undo.halfmove_clock;
            self.hash = undo.hash;
            self.move_number -= 1;
        }
    }

    /// Number of moves (including null moves) on the undo stack
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Fifty-move rule, threefold repetition or insufficient material
    pub fn is_draw(&self) -> bool {
        self.halfmove_clock >= 100 || self.is_repetition() || self.is_insufficient_material()
    }

    /// The current position occurred at least twice before
    pub fn is_repetition(&self) -> bool {
        let reversible = (self.halfmove_clock as usize).min(self.history.len());
        let mut seen = 0;
        // Positions with the same side to move sit two, four, ... plies back
        for undo in self.history.iter().rev().take(reversible).skip(1).step_by(2) {
            if undo.hash == self.hash {
                seen += 1;
                if seen >= 2 {
                    return true;
                }
            }
        }
        false
    }

    /// K v K, KN v K, KB v K and KNN v K
    pub fn is_insufficient_material(&self) -> bool {
        let heavy = self.pieces(PieceType::Pawn) | self.pieces(PieceType::Rook) | self.pieces(PieceType::Queen);
        if heavy.is_not_empty() {
            return false;
        }
        let knights = self.pieces(PieceType::Knight);
        let bishops = self.pieces(PieceType::Bishop);
        match (knights | bishops).count() {
            0 | 1 => true,
            2 => {
                bishops.is_empty()
                    && (knights == (knights & self.color(Color::White))
                        || knights == (knights & self.color(Color::Black)))
            }
            _ => false,
        }
    }

    /// No enemy pawn ahead of `sq` on its own or an adjacent file
    pub fn is_passed_pawn(&self, sq: Square, color: Color) -> bool {
        let files = Bitboard::file_mask(sq.file()) | Bitboard::adjacent_files(sq.file());
        let ahead = match color {
            Color::White if sq.rank() >= 7 => Bitboard::EMPTY,
            Color::White => Bitboard(!0u64 << (8 * (sq.rank() as u32 + 1))),
            Color::Black => Bitboard((1u64 << (8 * sq.rank() as u32)) - 1),
        };
        (files & ahead & self.pieces_of(PieceType::Pawn, color.opposite())).is_empty()
    }

    /// Static exchange evaluation of `mv`: material won or lost by the
    /// capture sequence on its destination, each side taking with its least
    /// valuable attacker and free to stop at any point.
    pub fn see(&self, mv: Move) -> i32 {
        let to = mv.to();
        let mut gain = [0i32; 32];
        let mut occupied = self.occupied;

        gain[0] = if mv.is_en_passant() {
            occupied.clear(to.offset(-self.side_to_move.pawn_direction()));
            PieceType::Pawn.value()
        } else {
            self.piece_at(to).map_or(0, |p| p.piece_type.value())
        };
        let mut attacker_value = match self.piece_at(mv.from()) {
            Some(p) => p.piece_type.value(),
            None => mv.piece().value(),
        };
        if let Some(promoted) = mv.promotion_piece() {
            gain[0] += promoted.value() - PieceType::Pawn.value();
            attacker_value = promoted.value();
        }

        let mut from = mv.from().bitboard();
        let mut side = self.side_to_move;
        let mut depth = 0;
        loop {
            depth += 1;
            gain[depth] = attacker_value - gain[depth - 1];
            if depth == gain.len() - 1 {
                break;
            }
            occupied ^= from;
            side = side.opposite();
            let attackers = self.attackers_to_with(to, occupied) & occupied & self.color(side);
            let Some(next) = PieceType::ALL
                .into_iter()
                .find(|&pt| (attackers & self.pieces(pt)).is_not_empty())
            else {
                break;
            };
            from = (attackers & self.pieces(next)).lsb_bit();
            attacker_value = next.value();
        }
        while depth > 1 {
            depth -= 1;
            gain[depth - 1] = -(-gain[depth - 1]).max(gain[depth]);
        }
        gain[0]
    }
}

/// Rook origin and destination for a castling move
fn castling_rook_squares(mv: Move) -> Option<(Square, Square)> {
    let to = mv.to();
    match mv.move_type() {
        MoveType::KingsideCastle => Some((to.offset(1), to.offset(-1))),
        MoveType::QueensideCastle => Some((to.offset(-2), to.offset(1))),
        _ => None,
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::startpos()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        for rank in (0..8).rev() {
            write!(f, "  {} ", rank + 1)?;
            for file in 0..8 {
                match self.piece_at(Square::from_file_rank(file, rank)) {
                    Some(piece) => write!(f, "{} ", piece.to_char())?,
                    None => write!(f, ". ")?,
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "    a b c d e f g h")?;
        writeln!(f)?;
        writeln!(f, "  FEN: {}", self.to_fen())?;
        writeln!(f, "  Key: {:016x} / {:016x}", self.hash.primary, self.hash.secondary)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
