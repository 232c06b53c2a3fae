//! UCI front-end.
//!
//! Commands are read line by line and parsed with `vampirc-uci`. Searches
//! run on the [`SearchEngine`] worker thread, so `stop`, `isready` and
//! `quit` are answered while a search is in progress. Everything the engine
//! prints goes through one shared writer, which the search thread also uses
//! for `info` and `bestmove` lines.

use log::{debug, error, info, warn};
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use vampirc_uci::uci::{UciSearchControl, UciTimeControl};
use vampirc_uci::{UciMessage, parser};

use crate::core::moves::Move;
use crate::core::position::Position;
use crate::engine::book::PolyglotBook;
use crate::engine::eval::{Evaluator, MaterialEvaluator};
use crate::engine::movegen::{divide, parse_uci_move};
use crate::engine::search::{
    EngineState, ScoreBound, SearchEngine, SearchInfo, SearchLimits, SearchObserver, Searcher, format_pv,
};
use crate::engine::tt::new_table;

use super::options::{EngineOptions, OptionChange};

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

fn send(out: &SharedWriter, text: &str) {
    let mut out = out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Err(e) = writeln!(out, "{text}").and_then(|_| out.flush()) {
        error!(target: "kestrel::uci", "failed to write output: {}", e);
    }
}

/// Prints search progress as `info` lines and the result as `bestmove`
struct UciObserver {
    out: SharedWriter,
}

impl SearchObserver for UciObserver {
    fn info(&mut self, info: &SearchInfo) {
        let bound = match info.bound {
            ScoreBound::Exact => "",
            ScoreBound::Lower => " lowerbound",
            ScoreBound::Upper => " upperbound",
        };
        let mut line = format!(
            "info depth {} seldepth {} score {}{} nodes {} nps {} time {} hashfull {}",
            info.depth, info.seldepth, info.score, bound, info.nodes, info.nps, info.time_ms, info.hashfull
        );
        if !info.pv.is_empty() {
            line.push_str(" pv ");
            line.push_str(&format_pv(&info.pv));
        }
        send(&self.out, &line);
    }

    fn best_move(&mut self, best: Option<Move>, ponder: Option<Move>) {
        let line = match (best, ponder) {
            (Some(best), Some(ponder)) => format!("bestmove {} ponder {}", best, ponder),
            (Some(best), None) => format!("bestmove {}", best),
            (None, _) => "bestmove 0000".to_string(),
        };
        send(&self.out, &line);
    }
}

pub struct UCI {
    position: Position,
    options: EngineOptions,
    evaluator: Arc<dyn Evaluator>,
    engine: SearchEngine,
    book: Option<PolyglotBook>,
    out: SharedWriter,
}

impl UCI {
    /// Default options, writing to stdout
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default(), Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self::with_options(EngineOptions::default(), out)
    }

    pub fn with_options(options: EngineOptions, out: Box<dyn Write + Send>) -> Self {
        let evaluator: Arc<dyn Evaluator> = Arc::new(MaterialEvaluator);
        let tt = new_table(options.tt_kind, options.hash_mb);
        let searcher = Searcher::new(tt, Arc::clone(&evaluator), options.search.clone());
        let mut uci = UCI {
            position: Position::startpos(),
            options,
            evaluator,
            engine: SearchEngine::new(searcher),
            book: None,
            out: Arc::new(Mutex::new(out)),
        };
        uci.load_book();
        uci
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }

    /// Block until a running search finishes on its own
    pub fn wait(&mut self) {
        self.engine.wait();
    }

    /// Read commands from stdin until `quit` or end of input
    pub fn run(&mut self) {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    error!(target: "kestrel::uci", "failed to read input: {}", e);
                    break;
                }
            };
            if !self.handle_line(&line) {
                return;
            }
        }
        self.engine.stop();
    }

    /// Execute one command line. Returns false on `quit`.
    pub fn handle_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return true;
        }
        debug!(target: "kestrel::uci", "<< {}", line);

        match parser::parse_one(line) {
            UciMessage::Uci => self.cmd_uci(),
            UciMessage::IsReady => self.send("readyok"),
            UciMessage::SetOption { name, value } => self.cmd_setoption(name.trim(), value.as_deref()),
            UciMessage::UciNewGame => self.cmd_ucinewgame(),
            UciMessage::Position { startpos, fen, moves } => {
                let moves: Vec<String> = moves.iter().map(|m| m.to_string()).collect();
                self.apply_position(startpos, fen.as_ref().map(|f| f.as_str()), &moves);
            }
            UciMessage::Go {
                time_control,
                search_control,
            } => {
                let limits = go_to_limits(time_control.as_ref(), search_control.as_ref());
                self.cmd_go(limits);
            }
            UciMessage::Stop => self.engine.stop(),
            UciMessage::Quit => {
                self.engine.stop();
                return false;
            }
            UciMessage::Unknown(text, _) => {
                let parts: Vec<&str> = text.split_whitespace().collect();
                match parts.first().copied() {
                    Some("d") | Some("display") => self.cmd_display(),
                    Some("eval") => self.cmd_eval(),
                    Some("perft") => self.cmd_perft(&parts),
                    _ => debug!(target: "kestrel::uci", "ignoring unknown command '{}'", line),
                }
            }
            other => debug!(target: "kestrel::uci", "ignoring {:?}", other),
        }
        true
    }

    fn send(&self, text: &str) {
        send(&self.out, text);
    }

    fn cmd_uci(&self) {
        self.send(&format!("id name Kestrel {}", env!("CARGO_PKG_VERSION")));
        self.send("id author the Kestrel developers");
        for line in self.options.uci_lines() {
            self.send(&line);
        }
        self.send("uciok");
    }

    fn cmd_setoption(&mut self, name: &str, value: Option<&str>) {
        if self.engine.is_searching() {
            warn!(target: "kestrel::uci", "setoption {} ignored during search", name);
            return;
        }
        match self.options.apply(name, value) {
            Ok(change) => self.apply_change(change),
            Err(e) => warn!(target: "kestrel::uci", "{}", e),
        }
    }

    fn apply_change(&mut self, change: OptionChange) {
        match change {
            OptionChange::Table => {
                let tt = new_table(self.options.tt_kind, self.options.hash_mb);
                self.engine.with_searcher(|s| s.set_tt(tt));
            }
            OptionChange::Search => {
                let params = self.options.search.clone();
                self.engine.with_searcher(|s| s.set_params(params));
            }
            OptionChange::ClearHash => self.engine.with_searcher(|s| s.clear()),
            OptionChange::Book => self.load_book(),
            OptionChange::Stored => {}
        }
    }

    fn load_book(&mut self) {
        self.book = match &self.options.book_file {
            Some(path) => match PolyglotBook::open(path) {
                Ok(book) => Some(book),
                Err(e) => {
                    warn!(target: "kestrel::book", "{}", e);
                    None
                }
            },
            None => None,
        };
    }

    fn cmd_ucinewgame(&mut self) {
        self.engine.stop();
        self.engine.with_searcher(|s| s.clear());
        self.position = Position::startpos();
    }

    /// Set up a position. A malformed FEN keeps the previous position; the
    /// move list is applied up to the first move that is not legal.
    fn apply_position(&mut self, startpos: bool, fen: Option<&str>, moves: &[String]) {
        let mut position = if startpos {
            Position::startpos()
        } else if let Some(fen) = fen {
            match Position::from_fen(fen) {
                Ok(position) => position,
                Err(e) => {
                    warn!(target: "kestrel::uci", "rejected FEN '{}': {}", fen, e);
                    return;
                }
            }
        } else {
            warn!(target: "kestrel::uci", "position command without startpos or fen");
            return;
        };

        for text in moves {
            match parse_uci_move(&mut position, text) {
                Ok(mv) => position.make_move(mv),
                Err(e) => {
                    warn!(target: "kestrel::uci", "{}; ignoring the remaining moves", e);
                    break;
                }
            }
        }
        self.position = position;
    }

    fn cmd_go(&mut self, limits: SearchLimits) {
        if self.engine.is_searching() {
            debug!(target: "kestrel::uci", "go ignored, search already running");
            return;
        }
        if self.options.own_book {
            if let Some(mv) = self.book.as_ref().and_then(|book| book.probe(&mut self.position)) {
                info!(target: "kestrel::uci", "playing book move {}", mv);
                self.send(&format!("bestmove {}", mv));
                return;
            }
        }
        let observer = Box::new(UciObserver {
            out: Arc::clone(&self.out),
        });
        self.engine.go(&self.position, limits, observer);
    }

    fn cmd_display(&self) {
        self.send(&self.position.to_string());
    }

    fn cmd_eval(&self) {
        let score = self.evaluator.evaluate(&self.position);
        self.send(&format!(
            "Evaluation: {} cp (side to move: {:?})",
            score,
            self.position.side_to_move()
        ));
    }

    fn cmd_perft(&self, parts: &[&str]) {
        let depth: u32 = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);
        let mut position = self.position.clone();
        let start = Instant::now();
        let counts = divide(&mut position, depth);
        let total: u64 = counts.iter().map(|&(_, n)| n).sum();
        for (mv, nodes) in counts {
            self.send(&format!("{}: {}", mv, nodes));
        }
        let elapsed = start.elapsed().as_millis();
        self.send("");
        self.send(&format!("Nodes searched: {}", total));
        debug!(target: "kestrel::uci", "perft {} took {} ms", depth, elapsed);
    }
}

impl Default for UCI {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate a parsed `go` into search limits. `go ponder` searches until
/// stopped.
fn go_to_limits(time_control: Option<&UciTimeControl>, search_control: Option<&UciSearchControl>) -> SearchLimits {
    let mut limits = SearchLimits::default();

    if let Some(sc) = search_control {
        limits.depth = sc.depth.map(i32::from);
        limits.nodes = sc.nodes;
    }

    if let Some(tc) = time_control {
        match tc {
            UciTimeControl::Infinite | UciTimeControl::Ponder => limits.infinite = true,
            UciTimeControl::MoveTime(d) => limits.movetime = Some(duration_to_millis(d)),
            UciTimeControl::TimeLeft {
                white_time,
                black_time,
                white_increment,
                black_increment,
                moves_to_go,
            } => {
                limits.wtime = white_time.as_ref().map(duration_to_millis);
                limits.btime = black_time.as_ref().map(duration_to_millis);
                limits.winc = white_increment.as_ref().map(duration_to_millis);
                limits.binc = black_increment.as_ref().map(duration_to_millis);
                limits.movestogo = moves_to_go.map(u32::from);
            }
        }
    }

    limits
}

fn duration_to_millis(d: &chrono::Duration) -> u64 {
    d.num_milliseconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_go_to_limits_time_left() {
        let tc = UciTimeControl::TimeLeft {
            white_time: Some(Duration::milliseconds(60_000)),
            black_time: Some(Duration::milliseconds(55_000)),
            white_increment: Some(Duration::milliseconds(1_000)),
            black_increment: None,
            moves_to_go: Some(20),
        };
        let limits = go_to_limits(Some(&tc), None);
        assert_eq!(limits.wtime, Some(60_000));
        assert_eq!(limits.btime, Some(55_000));
        assert_eq!(limits.winc, Some(1_000));
        assert_eq!(limits.binc, None);
        assert_eq!(limits.movestogo, Some(20));
        assert!(limits.manages_time());
    }

    #[test]
    fn test_go_to_limits_ponder_is_infinite() {
        let limits = go_to_limits(Some(&UciTimeControl::Ponder), None);
        assert!(limits.infinite);
        let limits = go_to_limits(Some(&UciTimeControl::MoveTime(Duration::milliseconds(250))), None);
        assert_eq!(limits.movetime, Some(250));
    }

    #[test]
    fn test_duration_never_negative() {
        assert_eq!(duration_to_millis(&Duration::milliseconds(-5)), 0);
    }
}
