//! UCI protocol tests
//!
//! Drive the front-end line by line and inspect what it writes.

use std::fs;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use kestrel::core::position::Position;
use kestrel::engine::movegen::legal_moves;
use kestrel::engine::search::EngineState;
use kestrel::engine::tt::TableKind;
use kestrel::uci::{EngineOptions, UCI};

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn take(&self) -> Vec<String> {
        let lines = self.lines();
        self.0.lock().unwrap().clear();
        lines
    }
}

fn engine() -> (UCI, SharedBuffer) {
    let out = SharedBuffer::default();
    let options = EngineOptions {
        hash_mb: 4,
        ..EngineOptions::default()
    };
    (UCI::with_options(options, Box::new(out.clone())), out)
}

fn bestmove(lines: &[String]) -> Option<String> {
    lines
        .iter()
        .find_map(|l| l.strip_prefix("bestmove "))
        .map(|rest| rest.split_whitespace().next().unwrap_or("").to_string())
}

// ============================================================================
// Handshake and options
// ============================================================================

#[test]
fn test_uci_handshake() {
    let (mut uci, out) = engine();
    assert!(uci.handle_line("uci"));
    let lines = out.take();
    assert!(lines[0].starts_with("id name Kestrel"));
    assert!(lines[1].starts_with("id author"));
    assert!(lines.iter().any(|l| l == "option name Hash type spin default 4 min 1 max 4096"));
    assert!(lines.iter().any(|l| l.starts_with("option name TranspositionTable type combo")));
    assert!(lines.iter().any(|l| l == "option name Clear Hash type button"));
    assert_eq!(lines.last().map(String::as_str), Some("uciok"));

    uci.handle_line("isready");
    assert_eq!(out.take(), vec!["readyok".to_string()]);
}

#[test]
fn test_setoption_updates_options() {
    let (mut uci, _out) = engine();
    uci.handle_line("setoption name Hash value 8");
    uci.handle_line("setoption name TranspositionTable value TwoTier");
    uci.handle_line("setoption name NullMove value false");
    uci.handle_line("setoption name Contempt value 25");
    uci.handle_line("setoption name Clear Hash");

    assert_eq!(uci.options().hash_mb, 8);
    assert_eq!(uci.options().tt_kind, TableKind::TwoTier);
    assert!(!uci.options().search.null_move);
    assert_eq!(uci.options().contempt(), 25);
}

#[test]
fn test_invalid_setoption_is_ignored() {
    let (mut uci, _out) = engine();
    uci.handle_line("setoption name Hash value lots");
    uci.handle_line("setoption name NoSuchOption value 1");
    assert_eq!(uci.options().hash_mb, 4);
}

// ============================================================================
// Positions
// ============================================================================

#[test]
fn test_position_with_moves() {
    let (mut uci, _out) = engine();
    uci.handle_line("position startpos moves e2e4 e7e5 g1f3");
    assert_eq!(
        uci.position().to_fen(),
        "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
    );
}

#[test]
fn test_position_stops_at_illegal_move() {
    let (mut uci, _out) = engine();
    uci.handle_line("position startpos moves e2e4 e2e4 d7d5");
    assert_eq!(
        uci.position().to_fen(),
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
    );
}

#[test]
fn test_invalid_fen_keeps_previous_position() {
    let (mut uci, _out) = engine();
    uci.handle_line("position startpos moves d2d4");
    let before = uci.position().to_fen();
    uci.handle_line("position fen 8/8/8/8/8/8/8/8 w - - 0 1");
    assert_eq!(uci.position().to_fen(), before);
}

#[test]
fn test_position_fen_with_moves() {
    let (mut uci, _out) = engine();
    uci.handle_line("position fen 4k3/8/8/8/8/8/4P3/4K3 w - - 0 1 moves e2e4");
    assert_eq!(uci.position().to_fen(), "4k3/8/8/8/4P3/8/8/4K3 b - e3 0 1");
}

#[test]
fn test_ucinewgame_resets_position() {
    let (mut uci, _out) = engine();
    uci.handle_line("position startpos moves e2e4");
    uci.handle_line("ucinewgame");
    assert_eq!(*uci.position(), Position::startpos());
}

// ============================================================================
// Searching
// ============================================================================

#[test]
fn test_go_depth_one_from_startpos() {
    let (mut uci, out) = engine();
    uci.handle_line("position startpos");
    uci.handle_line("go depth 1");
    uci.wait();

    let lines = out.take();
    let best = bestmove(&lines).unwrap();
    let mut start = Position::startpos();
    let legal: Vec<String> = legal_moves(&mut start).iter().map(|m| m.to_uci()).collect();
    assert!(legal.contains(&best), "{best} is not a legal first move");
    assert!(lines.iter().any(|l| l.starts_with("info depth 1 ") && l.contains(" pv ")));
}

#[test]
fn test_go_on_checkmate_reports_null_move() {
    let (mut uci, out) = engine();
    uci.handle_line("position fen R5k1/5ppp/8/8/8/8/8/6K1 b - - 1 1");
    uci.handle_line("go depth 3");
    uci.wait();
    assert_eq!(out.take(), vec!["bestmove 0000".to_string()]);
}

#[test]
fn test_mate_score_is_reported() {
    let (mut uci, out) = engine();
    uci.handle_line("position fen r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5Q2/PPPP1PPP/RNB1K1NR w KQkq - 4 4");
    uci.handle_line("go depth 2");
    uci.wait();
    let lines = out.take();
    assert!(lines.iter().any(|l| l.contains(" score mate 1 ")));
    assert_eq!(bestmove(&lines).as_deref(), Some("f3f7"));
}

#[test]
fn test_stop_ends_infinite_search() {
    let (mut uci, out) = engine();
    uci.handle_line("position startpos");
    uci.handle_line("go infinite");
    std::thread::sleep(std::time::Duration::from_millis(100));
    uci.handle_line("stop");
    assert_eq!(uci.engine_state(), EngineState::Idle);
    assert!(bestmove(&out.take()).is_some());
}

#[test]
fn test_quit_stops_search() {
    let (mut uci, out) = engine();
    uci.handle_line("go infinite");
    assert!(!uci.handle_line("quit"));
    assert!(bestmove(&out.lines()).is_some());
}

#[test]
fn test_book_move_is_played_first() {
    let start = Position::startpos();
    let mut record = start.key().to_be_bytes().to_vec();
    let e2e4: u16 = 4 | 3 << 3 | 4 << 6 | 1 << 9;
    record.extend_from_slice(&e2e4.to_be_bytes());
    record.extend_from_slice(&1u16.to_be_bytes());
    record.extend_from_slice(&[0; 4]);
    let path = std::env::temp_dir().join(format!("kestrel-uci-book-{}.bin", std::process::id()));
    fs::write(&path, &record).unwrap();

    let (mut uci, out) = engine();
    uci.handle_line(&format!("setoption name BookFile value {}", path.display()));
    fs::remove_file(&path).unwrap();

    uci.handle_line("position startpos");
    uci.handle_line("go depth 3");
    assert_eq!(out.take(), vec!["bestmove e2e4".to_string()]);

    // Out of book the search takes over
    uci.handle_line("position startpos moves e2e4");
    uci.handle_line("go depth 1");
    uci.wait();
    assert!(bestmove(&out.take()).is_some());

    uci.handle_line("setoption name OwnBook value false");
    uci.handle_line("position startpos");
    uci.handle_line("go depth 1");
    uci.wait();
    assert!(out.take().iter().any(|l| l.starts_with("info ")));
}

// ============================================================================
// Debug commands
// ============================================================================

#[test]
fn test_display_and_perft() {
    let (mut uci, out) = engine();
    uci.handle_line("d");
    let shown = out.take().join("\n");
    assert!(shown.contains("FEN: rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"));

    uci.handle_line("perft 2");
    let lines = out.take();
    assert_eq!(lines.iter().filter(|l| l.contains(": ")).count(), 21);
    assert_eq!(lines.last().map(String::as_str), Some("Nodes searched: 400"));
}

#[test]
fn test_eval_command() {
    let (mut uci, out) = engine();
    uci.handle_line("eval");
    assert_eq!(out.take(), vec!["Evaluation: 0 cp (side to move: White)".to_string()]);
}

#[test]
fn test_unknown_and_blank_lines_are_ignored() {
    let (mut uci, out) = engine();
    assert!(uci.handle_line(""));
    assert!(uci.handle_line("   "));
    assert!(uci.handle_line("xyzzy"));
    assert!(out.take().is_empty());
}
