#![allow(clippy::cast_precision_loss)]

use std::time::Instant;

fn main() -> std::io::Result<()> {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: bench_file <path.scad>");
        std::process::exit(2);
    };
    let bytes = std::fs::read(&path)?;
    let source = String::from_utf8_lossy(&bytes);
    let size = source.len();

    // Warmup
    for _ in 0..3 {
        let _ = openscad_syntax::parse(&source);
    }

    let iters: i32 = if size > 1_000_000 { 10 } else { 100 };
    let start = Instant::now();
    let mut diagnostics = 0;
    for _ in 0..iters {
        diagnostics = openscad_syntax::parse(&source).diagnostics().len();
    }
    let elapsed = start.elapsed();
    let per_iter_us = elapsed.as_secs_f64() * 1_000_000.0 / f64::from(iters);
    let mbps = size as f64 / (per_iter_us / 1_000_000.0) / 1_048_576.0;

    println!("{per_iter_us:.1}us {mbps:.1}MB/s {size}B {diagnostics} diagnostics");
    Ok(())
}
