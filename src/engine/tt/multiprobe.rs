//! Four-slot multiprobe table.
//!
//! A key probes the four slots starting at its index (clipped at the end of
//! the table). A store takes the first empty or matching slot, then the
//! first stale-generation slot, then the first slot not holding an exact
//! score. When all four hold current exact scores the store is refused, so
//! principal variation nodes are never evicted by the current search.

use super::{NodeType, Slots, TTEntry, TableKind, TranspositionTable};
use crate::core::moves::Move;

const MAX_PROBES: usize = 4;

pub struct MultiprobeTable {
    slots: Slots,
}

impl MultiprobeTable {
    pub fn new(size_mb: usize) -> Self {
        MultiprobeTable {
            slots: Slots::with_megabytes(size_mb, TableKind::Multiprobe),
        }
    }

    /// Table with `2^size_bits` slots
    pub fn with_bits(size_bits: u32) -> Self {
        MultiprobeTable {
            slots: Slots::with_bits(size_bits),
        }
    }

    fn bucket(&self, primary: u64, exclusion: bool) -> std::ops::Range<usize> {
        let start = self.slots.start_index(primary, exclusion);
        start..(start + MAX_PROBES).min(self.slots.len())
    }
}

impl TranspositionTable for MultiprobeTable {
    fn probe(&self, primary: u64, secondary: u64, exclusion: bool, ply: usize) -> Option<TTEntry> {
        self.bucket(primary, exclusion)
            .find_map(|i| self.slots.read_if(i, secondary, ply))
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
        let generation = self.slots.generation();
        let mut old_generation = None;
        let mut not_exact = None;
        let mut target = None;

        for i in self.bucket(primary, exclusion) {
            let key = self.slots.key(i);
            if key == 0 || key == secondary {
                target = Some(i);
                break;
            }
            let existing = TTEntry::unpack(self.slots.info(i));
            if old_generation.is_none() && existing.is_none_or(|e| e.generation != generation) {
                old_generation = Some(i);
            }
            if not_exact.is_none() && existing.is_none_or(|e| e.node_type != NodeType::Exact) {
                not_exact = Some(i);
            }
        }

        let Some(index) = target.or(old_generation).or(not_exact) else {
            return false;
        };
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
        TableKind::Multiprobe
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // With 4 index bits every key whose top nibble is 0x3 starts at slot 3
    const BUCKET: u64 = 0x3000_0000_0000_0000;

    fn fill_exact(table: &MultiprobeTable) {
        for k in 1..=4u64 {
            assert!(table.store(BUCKET | k, 100 + k, NodeType::Exact, Move::NONE, 0, 4, false, 0));
        }
    }

    #[test]
    fn test_refuses_when_bucket_holds_current_exact_scores() {
        let table = MultiprobeTable::with_bits(4);
        fill_exact(&table);
        assert!(!table.store(BUCKET | 9, 999, NodeType::FailHigh, Move::NONE, 0, 9, false, 0));
        assert!(table.probe(BUCKET, 101, false, 0).is_some());
    }

    #[test]
    fn test_prefers_stale_generation() {
        let table = MultiprobeTable::with_bits(4);
        fill_exact(&table);
        table.advance_generation();
        assert!(table.store(BUCKET | 9, 999, NodeType::FailHigh, Move::NONE, 0, 1, false, 0));
        assert!(table.probe(BUCKET, 999, false, 0).is_some());
        assert!(table.probe(BUCKET, 101, false, 0).is_none());
        assert!(table.probe(BUCKET, 102, false, 0).is_some());
    }

    #[test]
    fn test_prefers_non_exact_slot() {
        let table = MultiprobeTable::with_bits(4);
        table.store(BUCKET | 1, 101, NodeType::Exact, Move::NONE, 0, 4, false, 0);
        table.store(BUCKET | 2, 102, NodeType::FailLow, Move::NONE, 0, 4, false, 0);
        table.store(BUCKET | 3, 103, NodeType::Exact, Move::NONE, 0, 4, false, 0);
        table.store(BUCKET | 4, 104, NodeType::Exact, Move::NONE, 0, 4, false, 0);
        assert!(table.store(BUCKET | 5, 105, NodeType::Exact, Move::NONE, 0, 4, false, 0));
        assert!(table.probe(BUCKET, 102, false, 0).is_none());
        assert!(table.probe(BUCKET, 105, false, 0).is_some());
    }

    #[test]
    fn test_bucket_clipped_at_table_end() {
        let table = MultiprobeTable::with_bits(4);
        let last = 0xF000_0000_0000_0000;
        assert!(table.store(last, 1, NodeType::Exact, Move::NONE, 0, 1, false, 0));
        // Only one slot exists past index 15
        assert!(!table.store(last, 2, NodeType::FailLow, Move::NONE, 0, 1, false, 0));
    }
}
