//! Opening book: Polyglot `.bin` files, probed by the position's primary key.
//!
//! Each record is 16 big-endian bytes: key (8), move (2), weight (2) and a
//! learn field (4) that is ignored. Move bits: to file 0-2, to rank 3-5,
//! from file 6-8, from rank 9-11, promotion 12-14 (none, n, b, r, q).

use log::{debug, info, warn};
use rand::Rng;
use std::fs;
use std::path::Path;

use crate::core::board::{PieceType, Square};
use crate::core::moves::Move;
use crate::core::position::Position;
use crate::engine::movegen::legal_moves;
use crate::error::BookError;

const RECORD_SIZE: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookEntry {
    pub key: u64,
    pub raw_move: u16,
    pub weight: u16,
}

impl BookEntry {
    fn parse(record: &[u8]) -> Option<Self> {
        let key = u64::from_be_bytes(record.get(0..8)?.try_into().ok()?);
        let raw_move = u16::from_be_bytes(record.get(8..10)?.try_into().ok()?);
        let weight = u16::from_be_bytes(record.get(10..12)?.try_into().ok()?);
        Some(BookEntry { key, raw_move, weight })
    }

    /// Origin, destination and promotion piece, or None for a malformed move
    pub fn decode_move(&self) -> Option<(Square, Square, Option<PieceType>)> {
        let m = self.raw_move;
        let to = Square::from_file_rank((m & 0x7) as u8, ((m >> 3) & 0x7) as u8);
        let from = Square::from_file_rank(((m >> 6) & 0x7) as u8, ((m >> 9) & 0x7) as u8);
        let promotion = match (m >> 12) & 0x7 {
            0 => None,
            1 => Some(PieceType::Knight),
            2 => Some(PieceType::Bishop),
            3 => Some(PieceType::Rook),
            4 => Some(PieceType::Queen),
            _ => return None,
        };
        if from == to || m >> 15 != 0 {
            return None;
        }
        Some((from, to, promotion))
    }
}

/// An in-memory Polyglot book sorted by key
#[derive(Clone, Debug, Default)]
pub struct PolyglotBook {
    entries: Vec<BookEntry>,
}

impl PolyglotBook {
    pub fn open(path: &Path) -> Result<Self, BookError> {
        let bytes = fs::read(path).map_err(|source| BookError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let book = Self::from_bytes(&bytes);
        if book.is_empty() {
            return Err(BookError::Empty(path.display().to_string()));
        }
        info!(target: "kestrel::book", "loaded {} book entries from {}", book.len(), path.display());
        Ok(book)
    }

    /// Parse records, skipping a truncated tail
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let chunks = bytes.chunks_exact(RECORD_SIZE);
        if !chunks.remainder().is_empty() {
            warn!(
                target: "kestrel::book",
                "ignoring {} trailing bytes of a truncated book record",
                chunks.remainder().len()
            );
        }
        let mut entries: Vec<BookEntry> = chunks.filter_map(BookEntry::parse).collect();
        entries.sort_by_key(|e| e.key);
        PolyglotBook { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw records for a key
    pub fn lookup(&self, key: u64) -> &[BookEntry] {
        let start = self.entries.partition_point(|e| e.key < key);
        let end = self.entries.partition_point(|e| e.key <= key);
        &self.entries[start..end]
    }

    /// Legal book moves for `position` with their weights. Records that do
    /// not decode to a legal move are skipped.
    pub fn moves(&self, position: &mut Position) -> Vec<(Move, u16)> {
        let records = self.lookup(position.key());
        if records.is_empty() {
            return Vec::new();
        }
        let legal = legal_moves(position);
        let mut found = Vec::with_capacity(records.len());
        for record in records {
            let Some((from, to, promotion)) = record.decode_move() else {
                debug!(target: "kestrel::book", "skipping corrupt book move {:#06x}", record.raw_move);
                continue;
            };
            let to = castling_destination(position, from, to);
            match legal
                .iter()
                .copied()
                .find(|mv| mv.from() == from && mv.to() == to && mv.promotion_piece() == promotion)
            {
                Some(mv) => found.push((mv, record.weight)),
                None => debug!(target: "kestrel::book", "skipping illegal book move {}{}", from, to),
            }
        }
        found
    }

    /// Weighted random choice among the legal book moves
    pub fn pick<R: Rng>(&self, position: &mut Position, rng: &mut R) -> Option<Move> {
        let moves = self.moves(position);
        let total: u32 = moves.iter().map(|&(_, w)| w as u32).sum();
        if total == 0 {
            return moves.first().map(|&(mv, _)| mv);
        }
        let mut target = rng.random_range(0..total);
        for (mv, weight) in moves {
            if target < weight as u32 {
                return Some(mv);
            }
            target -= weight as u32;
        }
        None
    }

    pub fn probe(&self, position: &mut Position) -> Option<Move> {
        let mv = self.pick(position, &mut rand::rng());
        match mv {
            Some(mv) => debug!(target: "kestrel::book", "book move {}", mv),
            None => debug!(target: "kestrel::book", "no book move"),
        }
        mv
    }
}

/// Polyglot writes castling as king takes own rook (e1h1)
fn castling_destination(position: &Position, from: Square, to: Square) -> Square {
    let king_on_start = position
        .piece_at(from)
        .is_some_and(|p| p.piece_type == PieceType::King && from.file() == 4);
    if !king_on_start || from.rank() != to.rank() {
        return to;
    }
    match to.file() {
        7 => Square::from_file_rank(6, to.rank()),
        0 => Square::from_file_rank(2, to.rank()),
        _ => to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn encode(from: &str, to: &str, promotion: u16) -> u16 {
        let from = Square::from_algebraic(from).unwrap();
        let to = Square::from_algebraic(to).unwrap();
        (to.file() as u16)
            | (to.rank() as u16) << 3
            | (from.file() as u16) << 6
            | (from.rank() as u16) << 9
            | promotion << 12
    }

    fn record(key: u64, mv: u16, weight: u16) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(RECORD_SIZE);
        bytes.extend_from_slice(&key.to_be_bytes());
        bytes.extend_from_slice(&mv.to_be_bytes());
        bytes.extend_from_slice(&weight.to_be_bytes());
        bytes.extend_from_slice(&[0; 4]);
        bytes
    }

    const START_KEY: u64 = 0x463b_9618_1691_fc9c;

    #[test]
    fn test_decode_move() {
        let entry = BookEntry { key: 0, raw_move: encode("e7", "e8", 4), weight: 1 };
        let (from, to, promo) = entry.decode_move().unwrap();
        assert_eq!(from.to_algebraic(), "e7");
        assert_eq!(to.to_algebraic(), "e8");
        assert_eq!(promo, Some(PieceType::Queen));

        let bad = BookEntry { key: 0, raw_move: encode("e2", "e4", 6), weight: 1 };
        assert!(bad.decode_move().is_none());
    }

    #[test]
    fn test_moves_filters_illegal_and_truncated() {
        let mut bytes = record(START_KEY, encode("e2", "e4", 0), 10);
        bytes.extend(record(START_KEY, encode("e2", "e5", 0), 50));
        bytes.extend(record(START_KEY, encode("d2", "d4", 0), 5));
        bytes.extend(record(1, encode("a2", "a3", 0), 5));
        bytes.extend_from_slice(&[1, 2, 3]);

        let book = PolyglotBook::from_bytes(&bytes);
        assert_eq!(book.len(), 4);
        assert_eq!(book.lookup(START_KEY).len(), 3);

        let mut pos = Position::startpos();
        let moves: Vec<(String, u16)> = book.moves(&mut pos).into_iter().map(|(m, w)| (m.to_uci(), w)).collect();
        assert_eq!(moves, vec![("e2e4".to_string(), 10), ("d2d4".to_string(), 5)]);
    }

    #[test]
    fn test_weighted_pick() {
        let mut bytes = record(START_KEY, encode("e2", "e4", 0), 1);
        bytes.extend(record(START_KEY, encode("g1", "f3", 0), 0));
        let book = PolyglotBook::from_bytes(&bytes);
        let mut pos = Position::startpos();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(book.pick(&mut pos, &mut rng).map(|m| m.to_uci()), Some("e2e4".to_string()));
        }
    }

    #[test]
    fn test_castling_translation() {
        let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let bytes = record(pos.key(), encode("e1", "h1", 0), 1);
        let book = PolyglotBook::from_bytes(&bytes);
        let moves = book.moves(&mut pos);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].0.to_uci(), "e1g1");
        assert!(moves[0].0.is_castling());
    }

    #[test]
    fn test_no_entry() {
        let book = PolyglotBook::default();
        let mut pos = Position::startpos();
        assert!(book.probe(&mut pos).is_none());
    }
}
