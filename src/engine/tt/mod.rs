//! Transposition table
//!
//! A fixed-size cache from position keys to search results. The primary key
//! picks the slot (its top bits are the index), and the secondary key is
//! stored next to the packed entry to verify a hit. Each slot is a pair of
//! `AtomicU64`s so one table can be shared across threads; a torn pair can
//! only ever surface a wrong move, which callers check against the legal
//! move list before playing it.
//!
//! Entry layout, one 64-bit word:
//! - bits 0-20: best move (packed move without its check marker)
//! - bits 21-23: node type
//! - bits 32-39: generation
//! - bits 40-47: depth searched, in half plies
//! - bits 48-63: score as `i16`

mod multiprobe;
mod multiprobe_v2;
mod two_tier;

pub use multiprobe::MultiprobeTable;
pub use multiprobe_v2::MultiprobeV2Table;
pub use two_tier::TwoTierTable;

use crate::core::moves::Move;
use crate::core::zobrist::EXCLUSION_SALT;
use crate::engine::search::types::VALUE_IS_MATE;
use log::debug;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// What a stored score means relative to the window it was searched with
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum NodeType {
    /// Exact score
    Exact = 1,
    /// Upper bound (every move failed low)
    FailLow = 2,
    /// Lower bound (beta cutoff)
    FailHigh = 3,
    /// Static evaluation only
    Eval = 4,
}

impl NodeType {
    fn from_bits(bits: u64) -> Option<Self> {
        match bits {
            1 => Some(NodeType::Exact),
            2 => Some(NodeType::FailLow),
            3 => Some(NodeType::FailHigh),
            4 => Some(NodeType::Eval),
            _ => None,
        }
    }

    /// Bound type of a score searched in `(alpha, beta)`
    pub fn from_window(score: i32, alpha: i32, beta: i32) -> Self {
        if score <= alpha {
            NodeType::FailLow
        } else if score >= beta {
            NodeType::FailHigh
        } else {
            NodeType::Exact
        }
    }
}

/// A decoded table entry
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TTEntry {
    pub best_move: Move,
    pub node_type: NodeType,
    pub generation: u8,
    pub depth: u8,
    pub score: i16,
}

impl TTEntry {
    const MOVE_MASK: u64 = 0x1F_FFFF;

    pub fn pack(&self) -> u64 {
        (self.best_move.tt_bits() as u64 & Self::MOVE_MASK)
            | ((self.node_type as u64) << 21)
            | ((self.generation as u64) << 32)
            | ((self.depth as u64) << 40)
            | ((self.score as u16 as u64) << 48)
    }

    pub fn unpack(info: u64) -> Option<Self> {
        Some(TTEntry {
            best_move: Move::from_raw((info & Self::MOVE_MASK) as u32),
            node_type: NodeType::from_bits((info >> 21) & 0x7)?,
            generation: (info >> 32) as u8,
            depth: (info >> 40) as u8,
            score: (info >> 48) as u16 as i16,
        })
    }
}

/// Turn a root-relative mate score into a node-relative one for storage
pub fn score_to_tt(score: i32, ply: usize) -> i16 {
    let ply = ply as i32;
    let adjusted = if score >= VALUE_IS_MATE {
        score + ply
    } else if score <= -VALUE_IS_MATE {
        score - ply
    } else {
        score
    };
    adjusted.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Inverse of [`score_to_tt`]
pub fn score_from_tt(score: i16, ply: usize) -> i32 {
    let score = score as i32;
    let ply = ply as i32;
    if score >= VALUE_IS_MATE {
        score - ply
    } else if score <= -VALUE_IS_MATE {
        score + ply
    } else {
        score
    }
}

/// Replacement policy selector
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TableKind {
    #[default]
    Multiprobe,
    MultiprobeV2,
    TwoTier,
}

impl TableKind {
    pub const NAMES: [&'static str; 3] = ["Multiprobe", "MultiprobeV2", "TwoTier"];

    pub fn name(self) -> &'static str {
        match self {
            TableKind::Multiprobe => Self::NAMES[0],
            TableKind::MultiprobeV2 => Self::NAMES[1],
            TableKind::TwoTier => Self::NAMES[2],
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TableKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "multiprobe" => Ok(TableKind::Multiprobe),
            "multiprobev2" => Ok(TableKind::MultiprobeV2),
            "twotier" => Ok(TableKind::TwoTier),
            _ => Err(format!("unknown transposition table '{s}'")),
        }
    }
}

/// Contract shared by every replacement policy. All methods take `&self`.
pub trait TranspositionTable: Send + Sync {
    /// Look a position up. `ply` converts stored mate scores back to root
    /// distance. `exclusion` addresses the singular-extension slots.
    fn probe(&self, primary: u64, secondary: u64, exclusion: bool, ply: usize) -> Option<TTEntry>;

    /// Offer a result to the table; returns false when the policy declines.
    #[allow(clippy::too_many_arguments)]
    fn store(
        &self,
        primary: u64,
        secondary: u64,
        node_type: NodeType,
        best_move: Move,
        score: i32,
        depth: u8,
        exclusion: bool,
        ply: usize,
    ) -> bool;

    /// Start a new search; older entries become preferred victims
    fn advance_generation(&self);

    fn generation(&self) -> u8;

    fn clear(&self);

    /// Permille of sampled slots written in the current generation
    fn hashfull(&self) -> u32;

    fn kind(&self) -> TableKind;

    /// Convenience wrapper deriving the node type from the search window
    #[allow(clippy::too_many_arguments)]
    fn save(
        &self,
        primary: u64,
        secondary: u64,
        depth: u8,
        best_move: Move,
        score: i32,
        alpha: i32,
        beta: i32,
        exclusion: bool,
        ply: usize,
    ) -> bool {
        let node_type = NodeType::from_window(score, alpha, beta);
        self.store(primary, secondary, node_type, best_move, score, depth, exclusion, ply)
    }
}

/// Build a table of the chosen kind. `size_mb` is rounded down to a power
/// of two; each megabyte holds 65536 slots of 16 bytes.
pub fn new_table(kind: TableKind, size_mb: usize) -> Arc<dyn TranspositionTable> {
    match kind {
        TableKind::Multiprobe => Arc::new(MultiprobeTable::new(size_mb)),
        TableKind::MultiprobeV2 => Arc::new(MultiprobeV2Table::new(size_mb)),
        TableKind::TwoTier => Arc::new(TwoTierTable::new(size_mb)),
    }
}

/// Slot storage shared by the three policies
pub(crate) struct Slots {
    keys: Box<[AtomicU64]>,
    infos: Box<[AtomicU64]>,
    size_bits: u32,
    generation: AtomicU8,
}

impl Slots {
    pub(crate) fn with_megabytes(size_mb: usize, kind: TableKind) -> Self {
        let mb = size_mb.max(1);
        let mb_bits = usize::BITS - 1 - mb.leading_zeros();
        let size_bits = mb_bits + 16;
        let slots = Self::with_bits(size_bits);
        debug!(
            target: "kestrel::tt",
            "created {} transposition table, {} entries, {} MB",
            kind,
            slots.len(),
            slots.len() * 16 / (1024 * 1024)
        );
        slots
    }

    pub(crate) fn with_bits(size_bits: u32) -> Self {
        let size = 1usize << size_bits;
        Slots {
            keys: (0..size).map(|_| AtomicU64::new(0)).collect(),
            infos: (0..size).map(|_| AtomicU64::new(0)).collect(),
            size_bits,
            generation: AtomicU8::new(0),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    /// First slot for a key: its top `size_bits` bits
    #[inline]
    pub(crate) fn start_index(&self, primary: u64, exclusion: bool) -> usize {
        let key = if exclusion { primary ^ EXCLUSION_SALT } else { primary };
        (key >> (64 - self.size_bits)) as usize
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> u64 {
        self.keys[index].load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn info(&self, index: usize) -> u64 {
        self.infos[index].load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn write(&self, index: usize, key: u64, info: u64) {
        self.keys[index].store(key, Ordering::Relaxed);
        self.infos[index].store(info, Ordering::Relaxed);
    }

    /// Decoded entry at `index` if its verification key is `secondary`
    pub(crate) fn read_if(&self, index: usize, secondary: u64, ply: usize) -> Option<TTEntry> {
        if self.key(index) != secondary {
            return None;
        }
        let mut entry = TTEntry::unpack(self.info(index))?;
        entry.score = score_from_tt(entry.score, ply).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        Some(entry)
    }

    pub(crate) fn entry_info(
        &self,
        node_type: NodeType,
        best_move: Move,
        score: i32,
        depth: u8,
        ply: usize,
    ) -> u64 {
        TTEntry {
            best_move,
            node_type,
            generation: self.generation(),
            depth,
            score: score_to_tt(score, ply),
        }
        .pack()
    }

    #[inline]
    pub(crate) fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    pub(crate) fn advance_generation(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn clear(&self) {
        for (key, info) in self.keys.iter().zip(self.infos.iter()) {
            key.store(0, Ordering::Relaxed);
            info.store(0, Ordering::Relaxed);
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    pub(crate) fn hashfull(&self) -> u32 {
        let sample = self.len().min(1000);
        let generation = self.generation();
        let used = (0..sample)
            .filter(|&i| {
                self.key(i) != 0 && TTEntry::unpack(self.info(i)).is_some_and(|e| e.generation == generation)
            })
            .count();
        (used * 1000 / sample) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::board::{PieceType, Square};
    use crate::core::moves::MoveType;

    #[test]
    fn test_entry_packing() {
        let entry = TTEntry {
            best_move: Move::new(Square::E2, Square::E4, PieceType::Pawn, false, MoveType::DoublePawnPush),
            node_type: NodeType::FailHigh,
            generation: 7,
            depth: 12,
            score: -345,
        };
        let info = entry.pack();
        assert_eq!((info >> 21) & 0xF, 3);
        assert_eq!((info >> 40) & 0xFF, 12);
        assert_eq!(TTEntry::unpack(info), Some(entry));
    }

    #[test]
    fn test_check_marker_not_stored() {
        let mv = Move::new(Square::D1, Square::D8, PieceType::Queen, true, MoveType::Normal).with_check();
        let entry = TTEntry { best_move: mv, node_type: NodeType::Exact, generation: 0, depth: 1, score: 0 };
        let back = TTEntry::unpack(entry.pack()).unwrap();
        assert!(!back.best_move.gives_check());
        assert_eq!(back.best_move, mv);
    }

    #[test]
    fn test_mate_score_adjustment() {
        let mate_in_3 = VALUE_IS_MATE + 40;
        assert_eq!(score_from_tt(score_to_tt(mate_in_3, 5), 5), mate_in_3);
        assert_eq!(score_from_tt(score_to_tt(mate_in_3, 5), 7), mate_in_3 - 2);
        assert_eq!(score_from_tt(score_to_tt(-mate_in_3, 2), 6), -mate_in_3 + 4);
        assert_eq!(score_to_tt(150, 9), 150);
    }

    #[test]
    fn test_node_type_from_window() {
        assert_eq!(NodeType::from_window(10, 10, 20), NodeType::FailLow);
        assert_eq!(NodeType::from_window(20, 10, 20), NodeType::FailHigh);
        assert_eq!(NodeType::from_window(15, 10, 20), NodeType::Exact);
    }

    #[test]
    fn test_table_kind_parse() {
        assert_eq!("twotier".parse::<TableKind>(), Ok(TableKind::TwoTier));
        assert_eq!("Multiprobe-V2".parse::<TableKind>(), Ok(TableKind::MultiprobeV2));
        assert!("cuckoo".parse::<TableKind>().is_err());
    }

    #[test]
    fn test_size_from_megabytes() {
        assert_eq!(Slots::with_megabytes(1, TableKind::Multiprobe).len(), 1 << 16);
        assert_eq!(Slots::with_megabytes(3, TableKind::Multiprobe).len(), 1 << 17);
    }
}
