//! Kestrel UCI chess engine

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::io;
use std::path::PathBuf;

use kestrel::engine::tt::TableKind;
use kestrel::uci::{EngineOptions, UCI};

#[derive(Parser, Debug)]
#[command(author, version, about = "Kestrel UCI chess engine", long_about = None)]
struct Args {
    /// Transposition table size in megabytes
    #[arg(long, default_value_t = 64)]
    hash: usize,

    /// Replacement policy: multiprobe, multiprobe-v2 or two-tier
    #[arg(long, default_value_t = TableKind::Multiprobe)]
    tt: TableKind,

    /// Polyglot opening book
    #[arg(long)]
    book: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    debug: bool,

    /// Disable logging
    #[arg(short, long, conflicts_with = "debug")]
    quiet: bool,
}

fn init_logging(args: &Args) {
    let level = if args.quiet {
        LevelFilter::Off
    } else if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    // stdout carries the protocol
    env_logger::Builder::new()
        .target(env_logger::Target::Stderr)
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    if let Some(book) = &args.book {
        anyhow::ensure!(book.is_file(), "book file {} does not exist", book.display());
    }
    let hash_mb = args.hash;
    anyhow::ensure!(
        (kestrel::uci::options::MIN_HASH_MB..=kestrel::uci::options::MAX_HASH_MB).contains(&hash_mb),
        "hash size {} MB is out of range",
        hash_mb
    );

    let options = EngineOptions {
        hash_mb,
        tt_kind: args.tt,
        book_file: args.book.clone(),
        ..EngineOptions::default()
    };
    log::info!(target: "kestrel::uci", "starting with {} MB {} table", options.hash_mb, options.tt_kind);

    let mut uci = UCI::with_options(options, Box::new(io::stdout()));
    uci.run();
    io::Write::flush(&mut io::stdout()).context("flushing stdout")?;
    Ok(())
}
