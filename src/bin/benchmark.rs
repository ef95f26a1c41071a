//! Performance benchmark comparing the generation engines

use std::time::Instant;

use gridlife::pattern::presets;
use gridlife::{Engine, LargerThanLife, QuickLife};

/// Life in LtL syntax so both engines run the same rule.
const LTL_LIFE: &str = "R1,C0,M0,S2..3,B3..3,NM";

fn benchmark_quicklife_soup(size: i32, generations: u64) -> f64 {
    let mut engine = QuickLife::new();
    presets::random_block(size, size, 0.25, 1)
        .place(&mut engine, -size / 2, -size / 2)
        .expect("soup fits");

    let start = Instant::now();
    engine.set_increment(generations);
    engine.step().expect("step succeeds");
    start.elapsed().as_secs_f64() * 1000.0 / generations as f64
}

fn benchmark_ltl_soup(rule: &str, size: i32, generations: u64) -> f64 {
    let mut engine = LargerThanLife::new();
    engine.set_rule(rule).expect("valid rule");
    presets::random_block(size, size, 0.25, 1)
        .place(&mut engine, -size / 2, -size / 2)
        .expect("soup fits");

    let start = Instant::now();
    engine.set_increment(generations);
    engine.step().expect("step succeeds");
    start.elapsed().as_secs_f64() * 1000.0 / generations as f64
}

fn benchmark_quicklife_glider(generations: u64) -> f64 {
    let mut engine = QuickLife::new();
    presets::glider().place(&mut engine, 0, 0).expect("glider fits");

    let start = Instant::now();
    engine.set_increment(generations);
    engine.step().expect("step succeeds");
    start.elapsed().as_secs_f64() * 1000.0 / generations as f64
}

fn main() {
    println!("=== Cellular Automaton Engine Benchmark ===\n");

    let generations = 100;
    let sizes = [64, 128, 256, 512];

    println!(
        "{:>10} {:>14} {:>14} {:>10}",
        "Soup", "QuickLife", "LtL (R1)", "Ratio"
    );
    println!("{:-<52}", "");

    for size in sizes {
        let ql_ms = benchmark_quicklife_soup(size, generations);
        let ltl_ms = benchmark_ltl_soup(LTL_LIFE, size, generations);
        println!(
            "{:>10} {:>11.3} ms {:>11.3} ms {:>9.1}x",
            format!("{size}x{size}"),
            ql_ms,
            ltl_ms,
            ltl_ms / ql_ms
        );
    }

    println!("\n=== Sparse pattern (glider, change tracking) ===\n");
    let glider_ms = benchmark_quicklife_glider(10_000);
    println!("QuickLife: {glider_ms:.4} ms/gen over 10000 generations");

    println!("\n=== Larger neighbourhoods (100x100 soup, 20 gens) ===\n");
    for rule in [
        "R5,C0,M1,S33..57,B34..45,NM",
        "R5,C0,M1,S33..57,B34..45,NN",
        "R5,C0,M1,S33..57,B34..45,NC",
        "R10,C0,M1,S123..212,B123..170,NM",
    ] {
        let ms = benchmark_ltl_soup(rule, 100, 20);
        println!("{rule:<36} {ms:>9.3} ms/gen");
    }
}
