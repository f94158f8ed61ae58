#![allow(dead_code, non_snake_case, non_upper_case_globals)]

use num_complex::Complex64 as C64;
use qcard_sim::StateVector;
use rand::{ rngs::StdRng, SeedableRng };
use rayon::iter::{ IntoParallelIterator, ParallelIterator };
use tracing::info;
use tracing_subscriber::EnvFilter;

// fraction of `trials` measurements of qubit 1 in √(1-p)∣0⟩ + √p∣1⟩ (behind
// an ancilla) that come out 1
fn empirical_p1(p: f64, trials: usize) -> f64 {
    let state
        = match StateVector::new([C64::from((1.0 - p).sqrt()), C64::from(p.sqrt())]) {
            Ok(s) => s.with_ancilla(),
            Err(_) => return f64::NAN,
        };
    let ones: usize
        = (0..trials).into_par_iter()
        .map(|k| {
            let mut rng = StdRng::seed_from_u64(k as u64);
            match state.measure_and_remove(1, &mut rng) {
                Ok((1, _)) => 1,
                _ => 0,
            }
        })
        .sum();
    ones as f64 / trials as f64
}

fn main() {
    const TRIALS: usize = 100_000;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    println!("{:>6} {:>10} {:>10} {:>8}", "p", "measured", "std err", "z");
    for k in 0..=10 {
        let p = k as f64 / 10.0;
        let p1 = empirical_p1(p, TRIALS);
        let err = (p * (1.0 - p) / TRIALS as f64).sqrt();
        let z = if err > 0.0 { (p1 - p) / err } else { 0.0 };
        info!(p, p1, "measured");
        println!("{:>6.2} {:>10.5} {:>10.5} {:>8.3}", p, p1, err, z);
    }
}
