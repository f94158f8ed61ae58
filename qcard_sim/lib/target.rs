//! Generation of private target states for the players of a game.
//!
//! With a finite deck count, targets are snapshots taken along a random walk
//! through the gate catalog starting from the game's initial state, so every
//! target is reachable with the cards in play. Snapshots that coincide (up to
//! global phase) with an earlier one would give two players the same goal; if
//! that happens the whole walk is thrown away and regenerated, up to a fixed
//! number of times.
//!
//! Without a deck count, every player simply receives an independent random
//! state.

use rand::{ seq::{ index, SliceRandom }, Rng };
use tracing::{ debug, warn };
use crate::{
    error::{ GameError, GameResult },
    gate::{ Angle, GateKind },
    state::{ EPSILON, StateVector },
};

/// A single gate of a replayed sequence, with the angle and qubits it was
/// given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceStep {
    pub gate: GateKind,
    pub angle: Option<Angle>,
    pub qubits: Vec<usize>,
}

/// The record of a successful run of [`generate`].
#[derive(Clone, Debug, PartialEq)]
pub struct TargetRun {
    /// Every gate applied during the walk, in order.
    pub sequence: Vec<SequenceStep>,
    /// Positions in `sequence` after which a target was taken, ascending.
    pub checkpoints: Vec<usize>,
    /// Number of walks discarded because of a collision.
    pub restarts: usize,
    /// The accepted targets, shuffled.
    pub targets: Vec<StateVector>,
}

/// Gates that may appear in the walk for a register of `num_qubits` qubits.
fn candidate_gates(num_qubits: usize) -> Vec<GateKind> {
    GateKind::ALL.into_iter()
        .filter(|g| g.arity() <= num_qubits)
        .collect()
}

/// Length of the walk used by [`generate`].
pub fn sequence_len(num_qubits: usize, decks: usize) -> usize {
    candidate_gates(num_qubits).len() * decks
}

/// Produce `players` pairwise-distinct targets reachable from `initial`.
///
/// The walk contains every catalog gate `decks` times in a random order
/// (two-qubit gates are left out for a single-qubit register). After a run
/// in which two snapshots have fidelity 1, generation restarts from scratch;
/// after `retry_limit` restarts the call gives up with
/// [`TargetGenerationFailed`][GameError::TargetGenerationFailed].
///
/// Fails with [`InsufficientCards`][GameError::InsufficientCards] if there
/// are more players than positions in the walk.
pub fn generate<R>(
    initial: &StateVector,
    decks: usize,
    players: usize,
    retry_limit: usize,
    rng: &mut R,
) -> GameResult<TargetRun>
where R: Rng + ?Sized
{
    let len = sequence_len(initial.num_qubits(), decks);
    if players > len {
        return Err(GameError::InsufficientCards { needed: players, available: len });
    }
    for attempt in 0..=retry_limit {
        match walk(initial, decks, players, rng)? {
            Some(mut run) => {
                run.restarts = attempt;
                debug!(players, decks, restarts = attempt, "target states generated");
                return Ok(run);
            },
            None => {
                warn!(attempt, "target collision; regenerating gate sequence");
            },
        }
    }
    Err(GameError::TargetGenerationFailed { attempts: retry_limit + 1 })
}

// a single attempt; `None` on collision
fn walk<R>(initial: &StateVector, decks: usize, players: usize, rng: &mut R)
    -> GameResult<Option<TargetRun>>
where R: Rng + ?Sized
{
    let n = initial.num_qubits();
    let mut gates: Vec<GateKind>
        = (0..decks)
        .flat_map(|_| candidate_gates(n))
        .collect();
    gates.shuffle(rng);

    let mut checkpoints: Vec<usize>
        = index::sample(rng, gates.len(), players).into_vec();
    checkpoints.sort_unstable();

    let mut state = initial.clone();
    let mut sequence: Vec<SequenceStep> = Vec::with_capacity(gates.len());
    let mut targets: Vec<StateVector> = Vec::with_capacity(players);
    let mut next = checkpoints.iter().peekable();
    for (k, gate) in gates.into_iter().enumerate() {
        let angle = gate.is_rotation().then(|| Angle::sample(rng));
        let qubits = index::sample(rng, n, gate.arity()).into_vec();
        let matrix = gate.matrix_at(angle.unwrap_or(Angle::Pi0));
        state = state.apply_gate(&matrix, &qubits)?;
        sequence.push(SequenceStep { gate, angle, qubits });
        if next.next_if_eq(&&k).is_some() {
            if targets.iter()
                .any(|t| (t.fidelity(&state) - 1.0).abs() < EPSILON)
            {
                return Ok(None);
            }
            targets.push(state.clone());
        }
    }
    targets.shuffle(rng);
    Ok(Some(TargetRun { sequence, checkpoints, restarts: 0, targets }))
}

/// Independent random targets on `num_qubits` qubits, with no distinctness
/// guarantee.
pub fn random_targets<R>(num_qubits: usize, players: usize, rng: &mut R)
    -> Vec<StateVector>
where R: Rng + ?Sized
{
    (0..players).map(|_| StateVector::random(num_qubits, rng)).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use itertools::Itertools;
    use rand::{ rngs::StdRng, SeedableRng };

    #[test]
    fn targets_are_distinct() {
        let mut rng = StdRng::seed_from_u64(10546);
        for seed_run in 0..25 {
            let n = 1 + seed_run % 3;
            let initial = StateVector::zero(n);
            let run = generate(&initial, 2, 4, 256, &mut rng).unwrap();
            assert_eq!(run.targets.len(), 4);
            assert_eq!(run.checkpoints.len(), 4);
            assert_eq!(run.sequence.len(), sequence_len(n, 2));
            assert!(run.checkpoints.windows(2).all(|w| w[0] < w[1]));
            for (a, b) in run.targets.iter().tuple_combinations() {
                assert!((a.fidelity(b) - 1.0).abs() >= EPSILON);
            }
            assert!(run.targets.iter().all(|t| t.num_qubits() == n));
        }
    }

    #[test]
    fn sequence_is_recorded() {
        let mut rng = StdRng::seed_from_u64(10546);
        let run = generate(&StateVector::zero(2), 1, 2, 256, &mut rng).unwrap();
        let mut counts = run.sequence.iter().map(|s| s.gate).counts();
        assert_eq!(counts.len(), 14);
        assert!(counts.drain().all(|(_, c)| c == 1));
        for step in run.sequence.iter() {
            assert_eq!(step.angle.is_some(), step.gate.is_rotation());
            assert_eq!(step.qubits.len(), step.gate.arity());
            assert!(step.qubits.iter().all(|q| *q < 2));
            assert!(step.qubits.iter().all_unique());
        }
        // replaying the record reproduces the targets
        let mut state = StateVector::zero(2);
        let mut replayed: Vec<StateVector> = Vec::new();
        for (k, step) in run.sequence.iter().enumerate() {
            let m = step.gate.matrix_at(step.angle.unwrap_or(Angle::Pi0));
            state = state.apply_gate(&m, &step.qubits).unwrap();
            if run.checkpoints.contains(&k) { replayed.push(state.clone()); }
        }
        for target in run.targets.iter() {
            assert!(replayed.iter().any(|r| r.is_close(target)));
        }
    }

    #[test]
    fn single_qubit_walk_skips_two_qubit_gates() {
        let mut rng = StdRng::seed_from_u64(10546);
        assert_eq!(sequence_len(1, 3), 36);
        let run = generate(&StateVector::zero(1), 3, 2, 256, &mut rng).unwrap();
        assert!(run.sequence.iter().all(|s| s.gate.arity() == 1));
    }

    #[test]
    fn collisions_exhaust_retries() {
        // with a checkpoint after every gate, at least one of the two
        // identities follows another checkpoint and collides with it
        let mut rng = StdRng::seed_from_u64(10546);
        let initial = StateVector::zero(1);
        let players = sequence_len(1, 2);
        assert_eq!(
            generate(&initial, 2, players, 3, &mut rng),
            Err(GameError::TargetGenerationFailed { attempts: 4 }),
        );
    }

    #[test]
    fn too_many_players() {
        let mut rng = StdRng::seed_from_u64(10546);
        assert_eq!(
            generate(&StateVector::zero(2), 1, 15, 8, &mut rng),
            Err(GameError::InsufficientCards { needed: 15, available: 14 }),
        );
    }

    #[test]
    fn seeded_runs_repeat() {
        let a = generate(
            &StateVector::zero(2), 2, 3, 64, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = generate(
            &StateVector::zero(2), 2, 3, 64, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn random_targets_are_valid() {
        let mut rng = StdRng::seed_from_u64(10546);
        let targets = random_targets(3, 5, &mut rng);
        assert_eq!(targets.len(), 5);
        assert!(targets.iter()
            .all(|t| crate::state::is_valid_statevector(t.amplitudes())));
    }
}
