//! Move ordering: killer moves, history heuristic, MVV-LVA and SEE buckets.

use crate::core::board::PieceType;
use crate::core::moves::{Move, MoveList, MoveType};
use crate::core::position::Position;
use crate::engine::movegen::{GenType, LegalMoveGenerator, MoveGenerator, PseudoLegalGenerator};

use super::types::MAX_DEPTH;

const HISTORY_MAX: u32 = 1 << 20;

/// Killers and history, shared by every node of a search
pub(super) struct SortInfo {
    killers: [[Move; 2]; MAX_DEPTH as usize],
    /// By moved piece and destination square
    history: [[u32; 64]; 6],
}

impl SortInfo {
    pub(super) fn new() -> Self {
        SortInfo {
            killers: [[Move::NONE; 2]; MAX_DEPTH as usize],
            history: [[0; 64]; 6],
        }
    }

    pub(super) fn clear(&mut self) {
        self.killers = [[Move::NONE; 2]; MAX_DEPTH as usize];
        self.history = [[0; 64]; 6];
    }

    /// Record a quiet move that caused a beta cutoff at `ply`
    pub(super) fn beta_cutoff(&mut self, mv: Move, ply: usize) {
        if mv.is_none() || mv.is_tactical() || ply >= MAX_DEPTH as usize {
            return;
        }

        let slot = &mut self.killers[ply];
        if slot[0] != mv {
            slot[1] = slot[0];
            slot[0] = mv;
        }

        let entry = &mut self.history[mv.piece().index()][mv.to().index()];
        *entry += 1;
        if *entry >= HISTORY_MAX {
            for row in self.history.iter_mut() {
                for value in row.iter_mut() {
                    *value >>= 1;
                }
            }
        }
    }

    pub(super) fn is_killer(&self, mv: Move, ply: usize) -> bool {
        ply < MAX_DEPTH as usize && (self.killers[ply][0] == mv || self.killers[ply][1] == mv)
    }

    fn killer_rank(&self, mv: Move, ply: usize) -> Option<i32> {
        if ply >= MAX_DEPTH as usize {
            return None;
        }
        if self.killers[ply][0] == mv {
            Some(1)
        } else if self.killers[ply][1] == mv {
            Some(0)
        } else {
            None
        }
    }

    pub(super) fn history(&self, mv: Move) -> u32 {
        self.history[mv.piece().index()][mv.to().index()]
    }
}

const SCORE_TT_MOVE: i32 = i32::MAX;
const SCORE_GOOD_CAPTURE: i32 = 300_000_000;
const SCORE_EQUAL_CAPTURE: i32 = 200_000_000;
const SCORE_KILLER: i32 = 100_000_000;
const SCORE_BAD_CAPTURE: i32 = -100_000_000;
const SCORE_UNDERPROMOTION: i32 = -200_000_000;

pub(super) fn mvv_lva(position: &Position, mv: Move) -> i32 {
    let victim = if mv.is_en_passant() {
        PieceType::Pawn.value()
    } else {
        position.piece_at(mv.to()).map_or(0, |p| p.piece_type.value())
    };
    victim * 10 - mv.piece().value()
}

#[derive(Clone, Copy)]
struct ScoredMove {
    mv: Move,
    score: i32,
    see: i32,
}

/// Legal moves of one node, handed out best first
pub(super) struct MovePicker {
    moves: Vec<ScoredMove>,
    next: usize,
    /// The side to move was in check when the picker was built
    pub(super) check_evasion: bool,
}

impl MovePicker {
    /// `kind` other than `All` drops losing captures unless evading check
    pub(super) fn new(position: &mut Position, tt_move: Move, kind: GenType, sort: &SortInfo, ply: usize) -> Self {
        let check_evasion = position.in_check();
        let kind = if check_evasion { GenType::All } else { kind };

        let mut list = MoveList::new();
        LegalMoveGenerator::<PseudoLegalGenerator>::default().generate(position, kind, &mut list);

        let mut moves = Vec::with_capacity(list.len());
        for &mv in list.iter() {
            let see = position.see(mv);
            if kind != GenType::All && see < 0 && mv != tt_move {
                continue;
            }
            let score = if mv == tt_move {
                SCORE_TT_MOVE
            } else {
                Self::score(position, mv, see, sort, ply)
            };
            moves.push(ScoredMove { mv, score, see });
        }

        MovePicker {
            moves,
            next: 0,
            check_evasion,
        }
    }

    fn score(position: &Position, mv: Move, see: i32, sort: &SortInfo, ply: usize) -> i32 {
        let under_promotion = mv.is_promotion() && mv.move_type() != MoveType::PromotionQueen;
        if mv.is_tactical() && !under_promotion {
            let mut value = if mv.is_capture() { mvv_lva(position, mv) } else { 0 };
            if mv.move_type() == MoveType::PromotionQueen {
                value += PieceType::Queen.value();
            }
            return if see > 0 || mv.move_type() == MoveType::PromotionQueen {
                SCORE_GOOD_CAPTURE + value
            } else if see == 0 {
                SCORE_EQUAL_CAPTURE + value
            } else {
                SCORE_BAD_CAPTURE + see
            };
        }
        if under_promotion {
            return if mv.is_capture() && see < 0 {
                SCORE_BAD_CAPTURE + see
            } else {
                SCORE_UNDERPROMOTION
            };
        }
        if let Some(rank) = sort.killer_rank(mv, ply) {
            return SCORE_KILLER + rank;
        }
        sort.history(mv) as i32
    }

    pub(super) fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Next best move and its static exchange value
    pub(super) fn next(&mut self) -> Option<(Move, i32)> {
        if self.next >= self.moves.len() {
            return None;
        }
        let mut best = self.next;
        for i in self.next + 1..self.moves.len() {
            if self.moves[i].score > self.moves[best].score {
                best = i;
            }
        }
        self.moves.swap(self.next, best);
        let picked = self.moves[self.next];
        self.next += 1;
        Some((picked.mv, picked.see))
    }
}
