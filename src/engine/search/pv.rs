//! Principal variation reconstruction from the transposition table.

use crate::core::moves::Move;
use crate::core::position::Position;
use crate::engine::movegen::legal_moves;
use crate::engine::tt::TranspositionTable;

/// The TT's stored move for `position` if it is legal there. Stored moves
/// lack the check marker, so the legal list supplies the full move.
pub(super) fn tt_move_in(tt: &dyn TranspositionTable, position: &mut Position, ply: usize) -> Option<Move> {
    let entry = tt.probe(position.key(), position.hash().secondary, false, ply)?;
    if entry.best_move.is_none() {
        return None;
    }
    legal_moves(position).iter().copied().find(|&mv| mv == entry.best_move)
}

/// Follow best moves from the table starting with `first`. Stops at a
/// missing or illegal move, a repeated position or a finished game.
/// The position is restored before returning.
pub(super) fn principal_variation(
    tt: &dyn TranspositionTable,
    position: &mut Position,
    first: Move,
    max_len: usize,
) -> Vec<Move> {
    let mut pv = vec![first];
    let mut seen = Vec::new();
    position.make_move(first);

    while pv.len() < max_len {
        if seen.contains(&position.key()) {
            break;
        }
        seen.push(position.key());
        let Some(mv) = tt_move_in(tt, position, pv.len()) else {
            break;
        };
        pv.push(mv);
        position.make_move(mv);
        if legal_moves(position).is_empty() {
            break;
        }
    }

    for _ in 0..pv.len() {
        position.unmake_move();
    }
    pv
}

pub fn format_pv(pv: &[Move]) -> String {
    pv.iter().map(|m| m.to_uci()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::movegen::parse_uci_move;
    use crate::engine::tt::{new_table, NodeType, TableKind};

    fn store_best(tt: &dyn TranspositionTable, pos: &mut Position, uci: &str) -> Move {
        let mv = parse_uci_move(pos, uci).unwrap();
        tt.store(pos.key(), pos.hash().secondary, NodeType::Exact, mv, 0, 4, false, 0);
        mv
    }

    #[test]
    fn test_pv_follows_table() {
        let tt = new_table(TableKind::Multiprobe, 1);
        let mut pos = Position::startpos();
        let before = pos.clone();

        let first = parse_uci_move(&mut pos, "e2e4").unwrap();
        pos.make_move(first);
        let reply = store_best(tt.as_ref(), &mut pos, "e7e5");
        pos.make_move(reply);
        let third = store_best(tt.as_ref(), &mut pos, "g1f3");
        pos.unmake_move();
        pos.unmake_move();

        let pv = principal_variation(tt.as_ref(), &mut pos, first, 10);
        assert_eq!(pv, vec![first, reply, third]);
        assert_eq!(format_pv(&pv), "e2e4 e7e5 g1f3");
        assert_eq!(pos, before);
    }

    #[test]
    fn test_pv_stops_on_repetition() {
        let tt = new_table(TableKind::Multiprobe, 1);
        let mut pos = Position::startpos();
        let first = parse_uci_move(&mut pos, "g1f3").unwrap();
        pos.make_move(first);
        let a = store_best(tt.as_ref(), &mut pos, "g8f6");
        pos.make_move(a);
        let b = store_best(tt.as_ref(), &mut pos, "f3g1");
        pos.make_move(b);
        let c = store_best(tt.as_ref(), &mut pos, "f6g8");
        pos.make_move(c);
        store_best(tt.as_ref(), &mut pos, "g1f3");
        for _ in 0..4 {
            pos.unmake_move();
        }

        let pv = principal_variation(tt.as_ref(), &mut pos, first, 64);
        assert!(pv.len() <= 6, "pv kept cycling: {}", format_pv(&pv));
        assert_eq!(pos, Position::startpos());
    }
}
