#![allow(dead_code, non_snake_case, non_upper_case_globals)]

use itertools::iproduct;
use qcard_sim::{ state::StateVector, target, GameError };
use rand::{ rngs::StdRng, SeedableRng };
use rayon::iter::{ IntoParallelIterator, ParallelIterator };
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, Default)]
struct Tally {
    runs: usize,
    restarts: usize,
    failed: usize,
    too_many: usize,
}

impl std::ops::Add for Tally {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            runs: self.runs + rhs.runs,
            restarts: self.restarts + rhs.restarts,
            failed: self.failed + rhs.failed,
            too_many: self.too_many + rhs.too_many,
        }
    }
}

fn tally(n: usize, decks: usize, players: usize, runs: usize, retry_limit: usize)
    -> Tally
{
    let initial = StateVector::zero(n);
    (0..runs).into_par_iter()
        .map(|k| {
            let mut rng = StdRng::seed_from_u64(k as u64);
            let mut t = Tally { runs: 1, ..Tally::default() };
            match target::generate(&initial, decks, players, retry_limit, &mut rng) {
                Ok(run) => { t.restarts = run.restarts; },
                Err(GameError::TargetGenerationFailed { .. }) => { t.failed = 1; },
                Err(_) => { t.too_many = 1; },
            }
            t
        })
        .reduce(Tally::default, |a, b| a + b)
}

fn main() {
    const RUNS: usize = 2000;
    const RETRY_LIMIT: usize = 64;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn"))
        )
        .init();

    println!(
        "{:>2} {:>5} {:>7} {:>12} {:>7} {:>8}",
        "n", "decks", "players", "mean restart", "failed", "too many",
    );
    for (n, decks, players) in iproduct!(1..=3_usize, 1..=3_usize, [2_usize, 4, 8]) {
        let t = tally(n, decks, players, RUNS, RETRY_LIMIT);
        let mean = t.restarts as f64 / t.runs as f64;
        info!(n, decks, players, mean, failed = t.failed, "tallied");
        println!(
            "{:>2} {:>5} {:>7} {:>12.4} {:>7} {:>8}",
            n, decks, players, mean, t.failed, t.too_many,
        );
    }
}
