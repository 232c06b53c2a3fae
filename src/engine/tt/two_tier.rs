//! Two-tier table.
//!
//! Each key owns an aligned pair of slots. The first keeps the deepest
//! result of the current generation; whatever it rejects goes to the
//! second, which is always overwritten.

use super::{NodeType, Slots, TTEntry, TableKind, TranspositionTable};
use crate::core::moves::Move;

pub struct TwoTierTable {
    slots: Slots,
}

impl TwoTierTable {
    pub fn new(size_mb: usize) -> Self {
        TwoTierTable {
            slots: Slots::with_megabytes(size_mb, TableKind::TwoTier),
        }
    }

    /// Table with `2^size_bits` slots (at least two)
    pub fn with_bits(size_bits: u32) -> Self {
        TwoTierTable {
            slots: Slots::with_bits(size_bits.max(1)),
        }
    }

    #[inline]
    fn pair(&self, primary: u64, exclusion: bool) -> usize {
        self.slots.start_index(primary, exclusion) & !1
    }
}

impl TranspositionTable for TwoTierTable {
    fn probe(&self, primary: u64, secondary: u64, exclusion: bool, ply: usize) -> Option<TTEntry> {
        let first = self.pair(primary, exclusion);
        self.slots
            .read_if(first, secondary, ply)
            .or_else(|| self.slots.read_if(first + 1, secondary, ply))
    }

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
    ) -> bool {
        let first = self.pair(primary, exclusion);
        let protected_ok = self.slots.key(first) == 0
            || TTEntry::unpack(self.slots.info(first))
                .is_none_or(|old| old.depth <= depth || old.generation != self.slots.generation());
        let index = if protected_ok { first } else { first + 1 };

        let info = self.slots.entry_info(node_type, best_move, score, depth, ply);
        self.slots.write(index, secondary, info);
        true
    }

    fn advance_generation(&self) {
        self.slots.advance_generation();
    }

    fn generation(&self) -> u8 {
        self.slots.generation()
    }

    fn clear(&self) {
        self.slots.clear();
    }

    fn hashfull(&self) -> u32 {
        self.slots.hashfull()
    }

    fn kind(&self) -> TableKind {
        TableKind::TwoTier
    }
}
