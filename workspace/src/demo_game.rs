#![allow(dead_code, non_snake_case, non_upper_case_globals)]

use num_complex::Complex64 as C64;
use qcard_sim::{
    deck::{ Action, Card },
    game::{ Game, Phase },
    gate::{ Angle, GateKind },
    EngineConfig,
    QuantumCardService,
};
use tracing::{ info, warn };
use tracing_subscriber::EnvFilter;

const PLAYERS: [&str; 3] = ["alice", "bob", "carol"];
const MAX_ROUNDS: usize = 12;
const SHOW_THRESHOLD: f64 = 0.95;

// every way `card` could be played on an `n`-qubit register
fn candidate_plays(card: Card, n: usize) -> Vec<(Vec<usize>, Option<f64>)> {
    match card {
        Card::Gate(kind) if kind.arity() == 2 => {
            if n < 2 { return Vec::new(); }
            (0..n).flat_map(|a| (0..n).filter(move |b| *b != a).map(move |b| vec![a, b]))
                .map(|q| (q, None))
                .collect()
        },
        Card::Gate(kind) if kind.is_rotation() => {
            (0..n).flat_map(|q| {
                Angle::ALL.into_iter().map(move |a| (vec![q], Some(a.radians())))
            })
            .collect()
        },
        Card::Gate(_) => (0..n).map(|q| (vec![q], None)).collect(),
        Card::Action(Action::AddQubit) => vec![(Vec::new(), None)],
        Card::Action(Action::RemoveQubit) => (0..n).map(|q| (vec![q], None)).collect(),
    }
}

// try every legal play on a copy of the game and keep the one that leaves
// `player` with the highest fidelity
fn best_play(game: &Game, player: &str) -> Option<(Card, Vec<usize>, Option<f64>)> {
    let seat = game.seat(player)?;
    let n = game.num_qubits();
    let mut best: Option<(f64, Card, Vec<usize>, Option<f64>)> = None;
    for card in seat.hand.cards().into_iter().filter(|c| *c != Card::Gate(GateKind::I)) {
        for (qubits, angle) in candidate_plays(card, n) {
            let mut trial = game.clone();
            let Ok(outcome) = trial.play_card(player, card, &qubits, angle)
                else { continue; };
            let f = outcome.fidelities.iter()
                .find(|(name, _)| name == player)
                .map(|(_, f)| *f)
                .unwrap_or(0.0);
            if best.as_ref().map(|b| f > b.0).unwrap_or(true) {
                best = Some((f, card, qubits, angle));
            }
        }
    }
    best.map(|(_, card, qubits, angle)| (card, qubits, angle))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let svc = QuantumCardService::new(EngineConfig::default().with_seed(10546));
    let initial = [C64::from(1.0), C64::from(0.0), C64::from(0.0), C64::from(0.0)];
    let id = match svc.create_game(initial, Some(2)) {
        Ok(id) => id,
        Err(err) => { warn!(%err, "could not create game"); return; },
    };
    let setup
        = PLAYERS.iter().try_for_each(|name| svc.register_player(name))
        .and_then(|_| svc.distribute_cards(id, &PLAYERS, None))
        .and_then(|_| svc.set_target_states(id, None::<&[&str]>));
    if let Err(err) = setup {
        warn!(%err, "could not set up game");
        return;
    }

    'rounds: for round in 0..MAX_ROUNDS {
        for player in PLAYERS {
            let Ok(game) = svc.game(id) else { break 'rounds; };
            let snapshot = game.lock().clone();
            if snapshot.phase() == Phase::Ended { break 'rounds; }
            if snapshot.seat(player).map(|s| !s.is_active()).unwrap_or(true) {
                continue;
            }
            if let Ok(f) = snapshot.fidelity(player) {
                if f > SHOW_THRESHOLD
                    && svc.check_top_fidelity(id, player).unwrap_or(false)
                {
                    match svc.show(id, player) {
                        Ok(out) => info!(round, player, verdict = ?out.verdict, "show"),
                        Err(err) => warn!(%err, player, "show failed"),
                    }
                    continue;
                }
            }
            let Some((card, qubits, angle)) = best_play(&snapshot, player)
                else { continue; };
            match svc.play_card(id, player, card, &qubits, angle) {
                Ok(out) => {
                    info!(round, player, %card, ?qubits, state = %out.state, "played");
                },
                Err(err) => {
                    warn!(%err, player, "play failed; adding a deck");
                    let _ = svc.add_deck(id);
                },
            }
        }
    }
    if svc.phase(id).map(|p| p != Phase::Ended).unwrap_or(false) {
        let _ = svc.end_game(id);
    }

    if let Ok(standings) = svc.standings(id) {
        println!("standings:");
        standings.iter().enumerate()
            .for_each(|(k, name)| { println!("  {}. {}", k + 1, name); });
    }
    if let Ok(moves) = svc.moves(id) {
        println!("{} cards played", moves.len());
    }
}
