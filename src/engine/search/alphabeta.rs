//! Alpha-beta search and quiescence.
//!
//! Depths are in half plies so extensions and reductions can be fractional.
//! Every `make_move` is paired with its `unmake_move` before an abort is
//! propagated, so the position is intact when the search unwinds.

use crate::core::bitboard::Bitboard;
use crate::core::board::{Color, PieceType};
use crate::core::moves::Move;
use crate::core::position::Position;
use crate::engine::movegen::GenType;
use crate::engine::tt::NodeType;

use super::ordering::MovePicker;
use super::searcher::{Aborted, NodeKind, Searcher, mate_in, mated_in};
use super::types::{KNOWN_WIN, MATE_SCORE, MAX_DEPTH, PLY, VALUE_IS_MATE};

const LMR_DEPTHS_NOT_REDUCED: i32 = 3 * PLY;
const RAZOR_DEPTH: i32 = 4 * PLY;
/// Indexed by `NodeKind`
const SINGULAR_MOVE_DEPTH: [i32; 3] = [6 * PLY, 6 * PLY, 8 * PLY];
const IID_DEPTH: [i32; 3] = [5 * PLY, 5 * PLY, 8 * PLY];

/// Quiescence table depths
const DEPTH_QS_CHECKS: i32 = 1;
const DEPTH_QS_NO_CHECKS: i32 = 0;

fn tt_depth(depth: i32) -> u8 {
    depth.clamp(0, u8::MAX as i32) as u8
}

impl Searcher {
    /// Extension for `mv` before it is made, capped at one ply
    fn extensions(&self, position: &Position, mv: Move, mate_threat: bool, see: i32) -> i32 {
        let params = &self.params;
        let mut ext = 0;

        if mv.gives_check() && see >= 0 {
            ext += params.extension_check;
            if ext >= PLY {
                return PLY;
            }
        }
        if mv.piece() == PieceType::Pawn {
            if params.extension_pawn_push != 0 && mv.is_pawn_push_678() {
                ext += params.extension_pawn_push;
            }
            if params.extension_passed_pawn != 0 && position.is_passed_pawn(mv.to(), position.side_to_move()) {
                ext += params.extension_passed_pawn;
            }
            if ext >= PLY {
                return PLY;
            }
        }
        if params.extension_recapture != 0
            && mv.is_capture()
            && position.last_move().is_some_and(|last| last.is_capture() && last.to() == mv.to())
        {
            ext += params.extension_recapture;
            if ext >= PLY {
                return PLY;
            }
        }
        if mate_threat {
            ext += params.extension_mate_threat;
            if ext >= PLY {
                return PLY;
            }
        }
        ext
    }

    /// Search the child reached by the move just made, dropping into
    /// quiescence below one ply
    fn child(
        &mut self,
        position: &mut Position,
        kind: NodeKind,
        depth: i32,
        alpha: i32,
        beta: i32,
    ) -> Result<i32, Aborted> {
        if depth < PLY {
            self.quiescence(position, 0, alpha, beta)
        } else {
            self.search_node(position, kind, depth, alpha, beta, true, Move::NONE)
        }
    }

    pub(super) fn quiescence(
        &mut self,
        position: &mut Position,
        qs_depth: i32,
        mut alpha: i32,
        mut beta: i32,
    ) -> Result<i32, Aborted> {
        self.check_limits()?;
        self.stats.qnodes += 1;

        let ply = self.ply(position);

        if position.is_draw() {
            return Ok(self.draw_score(ply));
        }

        // Mate distance pruning
        alpha = alpha.max(mated_in(ply));
        beta = beta.min(mate_in(ply + 1));
        if alpha >= beta {
            return Ok(alpha);
        }

        let is_pv = beta - alpha > 1;
        // Quiet checks only on the first quiescence ply of PV nodes
        let generate_checks = is_pv && qs_depth == 0;
        let depth = if generate_checks { DEPTH_QS_CHECKS } else { DEPTH_QS_NO_CHECKS };
        let key = position.key();
        let secondary = position.hash().secondary;

        self.stats.tt_probes += 1;
        let entry = self.tt.probe(key, secondary, false, ply);
        let mut tt_move = Move::NONE;
        if let Some(e) = entry {
            if !is_pv && self.can_use_tt(&e, depth, alpha, beta) {
                return Ok(e.score as i32);
            }
            tt_move = e.best_move;
        }

        let in_check = position.in_check();
        let mut best_score = alpha;
        let mut best_move = Move::NONE;
        let mut eval = -MATE_SCORE;
        let mut futility_base = -MATE_SCORE;

        // No standing pat while in check
        if !in_check {
            let static_eval = self.static_eval(position, entry, ply);
            eval = Self::refine_eval(entry, static_eval);

            best_score = best_score.max(eval);
            if best_score >= beta {
                if entry.is_none() {
                    self.tt.store(
                        key,
                        secondary,
                        NodeType::FailHigh,
                        Move::NONE,
                        best_score,
                        tt_depth(DEPTH_QS_CHECKS),
                        false,
                        ply,
                    );
                }
                return Ok(best_score);
            }
            futility_base = eval + self.params.futility_margin_qs;
        }

        if ply as i32 >= MAX_DEPTH - 1 {
            return Ok(if in_check { self.draw_score(ply) } else { eval });
        }

        let kind = if generate_checks { GenType::TacticalAndChecks } else { GenType::Tactical };
        let mut picker = MovePicker::new(position, tt_move, kind, &self.sort, ply);
        let any_move = !picker.is_empty();

        while let Some((mv, see)) = picker.next() {
            if self.params.futility
                && !picker.check_evasion
                && !mv.gives_check()
                && !is_pv
                && mv != tt_move
                && !mv.is_pawn_push_678()
                && futility_base > -KNOWN_WIN
            {
                let captured = if mv.is_en_passant() {
                    PieceType::Pawn.value()
                } else {
                    position.piece_at(mv.to()).map_or(0, |p| p.piece_type.value())
                };
                let futility_value = futility_base + captured;
                if futility_value < beta {
                    best_score = best_score.max(futility_value);
                    continue;
                }
                if futility_base < beta && see <= 0 {
                    best_score = best_score.max(futility_base);
                    continue;
                }
            }

            position.make_move(mv);
            let result = self.quiescence(position, qs_depth + 1, -beta, -best_score);
            position.unmake_move();
            let score = -result?;

            if score > best_score {
                best_score = score;
                best_move = mv;
                if score >= beta {
                    break;
                }
            }
        }

        if in_check && !any_move {
            return Ok(mated_in(ply));
        }

        self.tt.save(key, secondary, tt_depth(depth), best_move, best_score, alpha, beta, false, ply);
        Ok(best_score)
    }

    /// Root, PV and zero-window search. `excluded` is the move skipped by a
    /// singular extension verification search; such searches use the
    /// exclusion slots of the table.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn search_node(
        &mut self,
        position: &mut Position,
        kind: NodeKind,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
        allow_null: bool,
        excluded: Move,
    ) -> Result<i32, Aborted> {
        if kind != NodeKind::Root {
            self.check_limits()?;
        }

        let ply = self.ply(position);
        if kind.is_pv() {
            self.stats.pv_nodes += 1;
            self.sel_depth = self.sel_depth.max(ply as i32);
        } else {
            self.stats.nodes += 1;
        }

        if kind != NodeKind::Root && position.is_draw() {
            return Ok(self.draw_score(ply));
        }

        // Mate distance pruning
        alpha = alpha.max(mated_in(ply));
        beta = beta.min(mate_in(ply + 1));
        if alpha >= beta {
            return Ok(alpha);
        }

        let key = position.key();
        let secondary = position.hash().secondary;
        let exclusion = excluded.is_some();

        let mut tt_move = Move::NONE;
        let mut tt_score = 0;
        let mut tt_node_type = None;
        let mut tt_depth_analyzed = 0;

        self.stats.tt_probes += 1;
        let entry = self.tt.probe(key, secondary, exclusion, ply);
        if let Some(e) = entry {
            if kind != NodeKind::Root && self.can_use_tt(&e, depth, alpha, beta) {
                return Ok(e.score as i32);
            }
            tt_move = e.best_move;
            tt_score = e.score as i32;
            tt_node_type = Some(e.node_type);
            tt_depth_analyzed = e.depth as i32;
        }

        let in_check = position.in_check();
        let us: Color = position.side_to_move();
        let mut mate_threat = false;
        let mut futility_prune = false;
        let mut futility_value = -MATE_SCORE;
        let mut static_eval = -MATE_SCORE;
        let mut eval = -MATE_SCORE;

        if !in_check {
            // An exclusion miss can still find the cached eval under the normal key
            let eval_entry = if !exclusion || entry.is_some() {
                entry
            } else {
                self.tt.probe(key, secondary, false, ply)
            };
            static_eval = self.static_eval(position, eval_entry, ply);
            eval = Self::refine_eval(entry, static_eval);
        }

        if ply as i32 >= MAX_DEPTH - 1 {
            return Ok(if in_check { self.draw_score(ply) } else { eval });
        }

        if !in_check {
            let params = &self.params;

            // Razoring
            let pawns_on_seventh = (position.pieces_of(PieceType::Pawn, Color::White) & Bitboard::RANK_7)
                | (position.pieces_of(PieceType::Pawn, Color::Black) & Bitboard::RANK_2);
            if kind == NodeKind::NonPv
                && params.razoring
                && tt_move.is_none()
                && allow_null
                && depth < RAZOR_DEPTH
                && beta.abs() < VALUE_IS_MATE
                && eval + params.razoring_margin < beta
                && pawns_on_seventh.is_empty()
            {
                self.stats.razoring_probes += 1;
                if depth <= PLY {
                    self.stats.razoring_hits += 1;
                    return self.quiescence(position, 0, alpha, beta);
                }
                let razor_beta = beta - self.params.razoring_margin;
                let v = self.quiescence(position, 0, razor_beta - 1, razor_beta)?;
                if v < razor_beta {
                    self.stats.razoring_hits += 1;
                    return Ok(v);
                }
            }

            // Static null move
            let params = &self.params;
            if kind == NodeKind::NonPv
                && params.static_null_move
                && allow_null
                && depth < RAZOR_DEPTH
                && beta.abs() < VALUE_IS_MATE
                && eval.abs() < KNOWN_WIN
                && eval - params.futility_margin >= beta
                && position.has_non_pawn_material(us)
            {
                return Ok(eval - params.futility_margin);
            }

            // Null move pruning and mate threat detection
            if kind == NodeKind::NonPv
                && params.null_move
                && allow_null
                && depth >= 2 * PLY
                && beta.abs() < VALUE_IS_MATE
                && eval >= beta
                && position.has_non_pawn_material(us)
            {
                self.stats.null_move_probes += 1;
                let r = 3 * PLY + (depth >> 2);

                position.make_null_move();
                let result = if depth - r < PLY {
                    self.quiescence(position, 0, -beta, -beta + 1)
                } else {
                    self.search_node(position, NodeKind::NonPv, depth - r, -beta, -beta + 1, false, Move::NONE)
                };
                position.unmake_null_move();
                let mut score = -result?;

                if score >= beta {
                    if score >= VALUE_IS_MATE {
                        score = beta;
                    }
                    // Verify on deep nodes where zugzwang would cost the most
                    let verified = depth < 12 * PLY || {
                        let v = if depth - r < PLY {
                            self.quiescence(position, 0, beta - 1, beta)?
                        } else {
                            self.search_node(position, NodeKind::NonPv, depth - r, beta - 1, beta, false, Move::NONE)?
                        };
                        v >= beta
                    };
                    if verified {
                        self.stats.null_move_hits += 1;
                        return Ok(score);
                    }
                } else if score <= -VALUE_IS_MATE {
                    mate_threat = true;
                }
            }

            // Internal iterative deepening
            let params = &self.params;
            if params.iid
                && tt_move.is_none()
                && depth >= IID_DEPTH[kind as usize]
                && allow_null
                && (kind != NodeKind::NonPv || static_eval + params.iid_margin > beta)
                && !exclusion
            {
                let d = if kind == NodeKind::Pv { depth - 2 * PLY } else { depth >> 1 };
                self.search_node(position, kind, d, alpha, beta, false, Move::NONE)?;
                if let Some(e) = self.tt.probe(key, secondary, false, ply) {
                    tt_move = e.best_move;
                }
            }

            // Futility pruning
            let params = &self.params;
            if kind == NodeKind::NonPv && params.futility {
                if depth <= PLY {
                    futility_value = static_eval + params.futility_margin;
                    if futility_value < beta {
                        self.stats.futility_hits += 1;
                        futility_prune = true;
                    }
                } else if depth <= 2 * PLY {
                    futility_value = static_eval + params.futility_margin_aggressive;
                    if futility_value < beta {
                        self.stats.aggressive_futility_hits += 1;
                        futility_prune = true;
                    }
                }
            }
        }

        let mut picker = MovePicker::new(position, tt_move, GenType::All, &self.sort, ply);
        let any_move = !picker.is_empty();

        let mut moves_done = 0;
        let mut best_score = -MATE_SCORE;
        let mut best_move = Move::NONE;

        while let Some((mv, see)) = picker.next() {
            if mv == excluded {
                continue;
            }

            let mut extension = self.extensions(position, mv, mate_threat, see);

            // Singular extension, which also catches singular replies
            if kind != NodeKind::Root
                && mv == tt_move
                && extension < PLY
                && !exclusion
                && self.params.extension_singular > 0
                && depth >= SINGULAR_MOVE_DEPTH[kind as usize]
                && tt_node_type == Some(NodeType::FailHigh)
                && tt_depth_analyzed >= depth - 3 * PLY
                && tt_score.abs() < KNOWN_WIN
            {
                self.stats.singular_probes += 1;
                let se_beta = tt_score - self.params.singular_margin;
                let excluded_score = self.search_node(position, kind, depth >> 1, se_beta - 1, se_beta, false, mv)?;
                if excluded_score < se_beta {
                    self.stats.singular_hits += 1;
                    extension = (extension + self.params.extension_singular).min(PLY);
                }
            }

            let important = kind == NodeKind::Root
                || extension != 0
                || picker.check_evasion
                || mv.gives_check()
                || mv.is_capture()
                || mv.is_pawn_push_678()
                || mv.is_castling()
                || mv == tt_move
                || self.sort.is_killer(mv, ply);

            if futility_prune && best_score > -KNOWN_WIN && !important {
                if futility_value <= alpha && futility_value > best_score {
                    best_score = futility_value;
                }
                continue;
            }

            moves_done += 1;
            let low_bound = alpha.max(best_score);
            let next_depth = depth + extension - PLY;

            position.make_move(mv);
            let result = if kind.is_pv() && moves_done == 1 {
                self.child(position, NodeKind::Pv, next_depth, -beta, -low_bound).map(|s| -s)
            } else {
                self.zero_window_then_pv(position, kind, depth, next_depth, moves_done, important, low_bound, beta)
            };
            position.unmake_move();
            let score = result?;

            if score > best_score {
                best_score = score;
                best_move = mv;

                if kind == NodeKind::Root {
                    self.root_best = mv;
                    self.root_best_score = score;
                    if depth > 6 * PLY {
                        self.notify(position, mv, score, alpha, beta);
                    }
                }
            }

            if score >= beta {
                break;
            }
        }

        // Checkmate or stalemate
        if !exclusion && !any_move {
            best_score = self.endgame_score(position, ply);
        }
        // Every move was excluded or pruned
        if best_score == -MATE_SCORE {
            best_score = mated_in(ply);
        }

        if best_score >= beta {
            if !exclusion && any_move {
                self.sort.beta_cutoff(best_move, ply);
            }
            if kind == NodeKind::NonPv {
                self.stats.null_cut += 1;
            } else {
                self.stats.pv_cut += 1;
            }
        } else if kind == NodeKind::NonPv {
            self.stats.null_all += 1;
        } else {
            self.stats.pv_all += 1;
        }

        self.tt.save(key, secondary, tt_depth(depth), best_move, best_score, alpha, beta, exclusion, ply);
        Ok(best_score)
    }

    /// Late move: reduced zero-window search, full-depth zero-window
    /// search if it beats the bound, then a PV re-search inside the window.
    /// Called with the move made; returns the score from the parent's view.
    #[allow(clippy::too_many_arguments)]
    fn zero_window_then_pv(
        &mut self,
        position: &mut Position,
        kind: NodeKind,
        depth: i32,
        next_depth: i32,
        moves_done: usize,
        important: bool,
        low_bound: i32,
        beta: i32,
    ) -> Result<i32, Aborted> {
        let mut full_search = true;
        let mut score = low_bound;

        if self.params.lmr && depth >= LMR_DEPTHS_NOT_REDUCED && !important {
            let reduction = self.reduction(kind, depth, moves_done);
            if reduction > 0 {
                score = -self.child(position, NodeKind::NonPv, depth - reduction - PLY, -low_bound - 1, -low_bound)?;
                full_search = score > low_bound;
            }
        }

        if full_search {
            score = -self.child(position, NodeKind::NonPv, next_depth, -low_bound - 1, -low_bound)?;
            if kind.is_pv() && score > low_bound && (kind == NodeKind::Root || score < beta) {
                score = -self.child(position, NodeKind::Pv, next_depth, -beta, -low_bound)?;
            }
        }
        Ok(score)
    }
}
