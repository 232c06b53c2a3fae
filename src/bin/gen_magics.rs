//! Regenerate the rook and bishop magic multipliers and print them as Rust
//! constants ready to paste into `engine/attacks.rs`.

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;

use kestrel::core::board::Square;
use kestrel::engine::attacks::{Slider, find_magic};

#[derive(Parser, Debug)]
#[command(name = "gen_magics", about = "Generate magic bitboard multipliers")]
struct Args {
    /// RNG seed; the same seed reproduces the same tables
    #[arg(long, default_value_t = 0x4b65_7374)]
    seed: u64,

    /// Candidates tried per square before giving up
    #[arg(long, default_value_t = 100_000_000)]
    attempts: u64,
}

fn generate(slider: Slider, rng: &mut StdRng, attempts: u64) -> Result<Vec<u64>> {
    (0..64u8)
        .map(|sq| {
            find_magic(slider, Square(sq), rng, attempts)
                .with_context(|| format!("generating {} magics", slider.name()))
        })
        .collect()
}

fn print_table(name: &str, magics: &[u64]) {
    println!("#[rustfmt::skip]");
    println!("pub const {name}: [u64; 64] = [");
    for row in magics.chunks(4) {
        let row: Vec<String> = row.iter().map(|m| format!("0x{m:016X}")).collect();
        println!("    {},", row.join(", "));
    }
    println!("];");
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let rook = generate(Slider::Rook, &mut rng, args.attempts)?;
    let bishop = generate(Slider::Bishop, &mut rng, args.attempts)?;
    log::info!("found {} magics with seed {:#x}", rook.len() + bishop.len(), args.seed);

    print_table("ROOK_MAGICS", &rook);
    println!();
    print_table("BISHOP_MAGICS", &bishop);
    Ok(())
}
