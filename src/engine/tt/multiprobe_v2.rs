//! Aligned four-slot multiprobe table with depth-preferred replacement.
//!
//! Buckets are aligned to four slots. Within the current generation an entry
//! is only overwritten by a strictly deeper result, and an existing entry is
//! never replaced by a depth-zero one (quiescence or static eval). When the
//! same position is rewritten without a best move, the old move is kept.

use super::{NodeType, Slots, TTEntry, TableKind, TranspositionTable};
use crate::core::moves::Move;

const MAX_PROBES: usize = 4;

pub struct MultiprobeV2Table {
    slots: Slots,
}

impl MultiprobeV2Table {
    pub fn new(size_mb: usize) -> Self {
        MultiprobeV2Table {
            slots: Slots::with_megabytes(size_mb, TableKind::MultiprobeV2),
        }
    }

    /// Table with `2^size_bits` slots (at least four)
    pub fn with_bits(size_bits: u32) -> Self {
        MultiprobeV2Table {
            slots: Slots::with_bits(size_bits.max(2)),
        }
    }

    fn bucket(&self, primary: u64, exclusion: bool) -> std::ops::Range<usize> {
        let start = self.slots.start_index(primary, exclusion) & !(MAX_PROBES - 1);
        start..start + MAX_PROBES
    }
}

impl TranspositionTable for MultiprobeV2Table {
    fn probe(&self, primary: u64, secondary: u64, exclusion: bool, ply: usize) -> Option<TTEntry> {
        self.bucket(primary, exclusion)
            .find_map(|i| self.slots.read_if(i, secondary, ply))
    }

    fn store(
        &self,
        primary: u64,
        secondary: u64,
        node_type: NodeType,
        mut best_move: Move,
        score: i32,
        depth: u8,
        exclusion: bool,
        ply: usize,
    ) -> bool {
        let generation = self.slots.generation();
        let mut target = None;

        for i in self.bucket(primary, exclusion) {
            let key = self.slots.key(i);
            let existing = TTEntry::unpack(self.slots.info(i));

            if key == 0 || key == secondary {
                if let Some(old) = existing.filter(|_| key != 0) {
                    if old.generation == generation && (depth == 0 || old.depth > depth) {
                        return false;
                    }
                    if key == secondary && best_move.is_none() {
                        best_move = old.best_move;
                    }
                }
                target = Some(i);
                break;
            }

            // A different position: take it if stale or shallower
            if existing.is_none_or(|old| old.generation != generation || old.depth < depth) {
                target = Some(i);
                break;
            }
        }

        let Some(index) = target else {
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
        TableKind::MultiprobeV2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::board::{PieceType, Square};
    use crate::core::moves::MoveType;

    // Index 6 with 4 bits, aligned down to bucket 4..8
    const KEY: u64 = 0x6000_0000_0000_0000;

    fn e2e4() -> Move {
        Move::new(Square::E2, Square::E4, PieceType::Pawn, false, MoveType::DoublePawnPush)
    }

    #[test]
    fn test_same_generation_keeps_deeper_entry() {
        let table = MultiprobeV2Table::with_bits(4);
        assert!(table.store(KEY, 7, NodeType::Exact, e2e4(), 30, 10, false, 0));
        assert!(!table.store(KEY, 7, NodeType::FailHigh, Move::NONE, 50, 6, false, 0));
        assert!(!table.store(KEY, 7, NodeType::Eval, Move::NONE, 50, 0, false, 0));
        let entry = table.probe(KEY, 7, false, 0).unwrap();
        assert_eq!(entry.depth, 10);
        assert_eq!(entry.score, 30);
    }

    #[test]
    fn test_deeper_result_keeps_old_move_when_none_given() {
        let table = MultiprobeV2Table::with_bits(4);
        table.store(KEY, 7, NodeType::Exact, e2e4(), 30, 4, false, 0);
        assert!(table.store(KEY, 7, NodeType::FailLow, Move::NONE, -20, 8, false, 0));
        let entry = table.probe(KEY, 7, false, 0).unwrap();
        assert_eq!(entry.best_move, e2e4());
        assert_eq!(entry.node_type, NodeType::FailLow);
    }

    #[test]
    fn test_new_generation_overwrites_shallower() {
        let table = MultiprobeV2Table::with_bits(4);
        table.store(KEY, 7, NodeType::Exact, e2e4(), 30, 10, false, 0);
        table.advance_generation();
        assert!(table.store(KEY, 7, NodeType::FailHigh, Move::NONE, 90, 2, false, 0));
        assert_eq!(table.probe(KEY, 7, false, 0).unwrap().depth, 2);
    }

    #[test]
    fn test_bucket_is_aligned() {
        let table = MultiprobeV2Table::with_bits(4);
        table.store(0x4000_0000_0000_0000, 11, NodeType::Exact, Move::NONE, 0, 1, false, 0);
        // Index 7 shares the bucket starting at 4
        assert!(table.probe(0x7000_0000_0000_0000, 11, false, 0).is_some());
        assert!(table.probe(0x8000_0000_0000_0000, 11, false, 0).is_none());
    }

    #[test]
    fn test_refuses_when_bucket_is_current_and_deep() {
        let table = MultiprobeV2Table::with_bits(4);
        for k in 1..=4 {
            assert!(table.store(KEY, k, NodeType::FailLow, Move::NONE, 0, 20, false, 0));
        }
        assert!(!table.store(KEY, 99, NodeType::Exact, Move::NONE, 0, 5, false, 0));
        assert!(table.store(KEY, 99, NodeType::Exact, Move::NONE, 0, 21, false, 0));
    }
}
