//! Rules of a single game: dealing, card play, scoring, and elimination.
//!
//! A [`Game`] owns the shared statevector, the card pool, and a seat for every
//! player dealt in. It moves through [`Phase::Created`] → [`Phase::Started`]
//! (cards dealt) → [`Phase::InProgress`] (targets assigned or a card played) →
//! [`Phase::Ended`]; each seat goes from [`SeatStatus::Active`] to either
//! [`SeatStatus::Winner`] or [`SeatStatus::Ejected`] and stays there.
//!
//! A player's score is the fidelity between their private target and the
//! shared state. Any player may *show* at any time: if nobody still in the game
//! scores higher they win, otherwise they are ejected. Once at most one player
//! remains, everyone left is ranked by score and the game ends.

use itertools::Itertools;
use rand::rngs::StdRng;
use tracing::{ debug, info };
use crate::{
    deck::{ Action, Card, CardPool, Hand },
    error::{ GameError, GameResult },
    gate::Angle,
    state::{ EPSILON, StateVector },
    target::{ self, TargetRun },
};

/// Index of a game in creation order.
pub type GameId = usize;

/// Lifecycle of a game.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Created, no cards dealt.
    Created,
    /// Cards dealt.
    Started,
    /// Targets assigned or at least one card played.
    InProgress,
    /// Every player has won or been ejected.
    Ended,
}

/// Standing of a single player within a game.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SeatStatus {
    Active,
    Ejected,
    Winner,
}

/// Result of a player's show.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    Win,
    Lose,
}

/// A player's place at the table.
#[derive(Clone, Debug, PartialEq)]
pub struct Seat {
    pub name: String,
    pub target: Option<StateVector>,
    pub hand: Hand,
    pub status: SeatStatus,
}

impl Seat {
    fn new(name: String, hand: Hand) -> Self {
        Self { name, target: None, hand, status: SeatStatus::Active }
    }

    pub fn is_active(&self) -> bool { self.status == SeatStatus::Active }
}

/// A card that was successfully played.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Move {
    pub player: String,
    pub card: Card,
    pub qubits: Vec<usize>,
    pub angle: Option<Angle>,
    pub measurement: Option<u8>,
}

/// Everything that changed as a result of [`Game::play_card`].
#[derive(Clone, Debug, PartialEq)]
pub struct PlayOutcome {
    /// Outcome of the measurement made by a `remove_qubit` card.
    pub measurement: Option<u8>,
    /// The new shared state.
    pub state: StateVector,
    /// Card dealt to the player in place of the one played.
    pub replacement: Card,
    /// Score of every active player with a target, in seat order.
    pub fidelities: Vec<(String, f64)>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShowOutcome {
    pub verdict: Verdict,
    pub game_ended: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DropOutcome {
    pub game_ended: bool,
}

/// A single game.
#[derive(Clone, Debug)]
pub struct Game {
    id: GameId,
    initial: StateVector,
    state: StateVector,
    pool: CardPool,
    seats: Vec<Seat>,
    ejected: Vec<String>,
    winners: Vec<String>,
    phase: Phase,
    discarded: usize,
    moves: Vec<Move>,
    target_run: Option<TargetRun>,
    rng: StdRng,
}

impl Game {
    /// Create a new game whose shared state starts at `initial`.
    ///
    /// `decks` is the number of copies of the card catalog in play; `None`
    /// deals from an infinite supply. All randomness in the game is drawn from
    /// `rng`.
    pub fn new(id: GameId, initial: StateVector, decks: Option<usize>, rng: StdRng)
        -> Self
    {
        Self {
            id,
            state: initial.clone(),
            initial,
            pool: CardPool::new(decks),
            seats: Vec::new(),
            ejected: Vec::new(),
            winners: Vec::new(),
            phase: Phase::Created,
            discarded: 0,
            moves: Vec::new(),
            target_run: None,
            rng,
        }
    }

    pub fn id(&self) -> GameId { self.id }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn is_started(&self) -> bool { self.phase != Phase::Created }

    pub fn initial_state(&self) -> &StateVector { &self.initial }

    /// The shared state.
    pub fn state(&self) -> &StateVector { &self.state }

    pub fn num_qubits(&self) -> usize { self.state.num_qubits() }

    pub fn decks(&self) -> Option<usize> { self.pool.decks() }

    /// Cards left in a finite pool.
    pub fn remaining_cards(&self) -> Option<usize> { self.pool.remaining() }

    /// Number of cards that have left play, either by being played or by
    /// being held when their player left the game.
    pub fn discarded(&self) -> usize { self.discarded }

    pub fn seats(&self) -> &[Seat] { &self.seats }

    pub fn seat(&self, name: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.name == name)
    }

    /// Names of players still in the game, in seat order.
    pub fn active_players(&self) -> impl Iterator<Item = &str> + '_ {
        self.seats.iter().filter(|s| s.is_active()).map(|s| s.name.as_str())
    }

    /// Ejected players, most recently failed show first; voluntary drops are
    /// appended at the back.
    pub fn ejected(&self) -> &[String] { &self.ejected }

    /// Winners in the order they won.
    pub fn winners(&self) -> &[String] { &self.winners }

    /// Every card played so far.
    pub fn moves(&self) -> &[Move] { &self.moves }

    /// The walk that produced the current targets, if they came from a finite
    /// deck.
    pub fn target_run(&self) -> Option<&TargetRun> { self.target_run.as_ref() }

    fn active_seat(&self, name: &str) -> GameResult<usize> {
        self.seats.iter()
            .position(|s| s.name == name && s.is_active())
            .ok_or_else(|| GameError::PlayerNotInGame(name.to_string()))
    }

    fn fidelity_at(&self, k: usize) -> Option<f64> {
        self.seats[k].target.as_ref().map(|t| t.fidelity(&self.state))
    }

    /// Deal a hand to each of `players` and start the game.
    ///
    /// Duplicate names are dealt in once. Fails with
    /// [`GameAlreadyStarted`][GameError::GameAlreadyStarted] if cards have
    /// already been dealt, and with
    /// [`InsufficientCards`][GameError::InsufficientCards] if a finite pool
    /// cannot cover every hand; in either case no cards are dealt.
    pub fn distribute_cards<S>(&mut self, players: &[S], hand_size: usize)
        -> GameResult<()>
    where S: AsRef<str>
    {
        if self.is_started() { return Err(GameError::GameAlreadyStarted); }
        let names: Vec<String>
            = players.iter()
            .map(|s| s.as_ref().to_string())
            .unique()
            .collect();
        if names.is_empty() { return Err(GameError::NoPlayers); }
        let hands = self.pool.deal(hand_size, names.len(), &mut self.rng)?;
        self.seats
            = names.into_iter().zip(hands)
            .map(|(name, hand)| Seat::new(name, hand))
            .collect();
        self.phase = Phase::Started;
        info!(
            game = self.id,
            players = self.seats.len(),
            hand_size,
            remaining = ?self.pool.remaining(),
            "cards distributed",
        );
        Ok(())
    }

    /// Assign a private target to each of `players`, or to every active player
    /// if `None`.
    ///
    /// With a finite deck, targets come from [`target::generate`] and are
    /// guaranteed pairwise distinct; otherwise each is an independent random
    /// state on the current number of qubits. Nothing is assigned unless every
    /// player gets a target.
    ///
    /// Each player's target is assigned once per game: fails with
    /// [`TargetAlreadyAssigned`][GameError::TargetAlreadyAssigned] if any
    /// selected player already has one, and with
    /// [`GameEnded`][GameError::GameEnded] once the game is over.
    pub fn set_target_states<S>(&mut self, players: Option<&[S]>, retry_limit: usize)
        -> GameResult<()>
    where S: AsRef<str>
    {
        match self.phase {
            Phase::Created => { return Err(GameError::GameNotStarted); },
            Phase::Ended => { return Err(GameError::GameEnded); },
            _ => { },
        }
        let seats: Vec<usize>
            = match players {
                Some(names) => names.iter()
                    .map(|s| self.active_seat(s.as_ref()))
                    .collect::<GameResult<Vec<usize>>>()?
                    .into_iter()
                    .unique()
                    .collect(),
                None => (0..self.seats.len())
                    .filter(|k| self.seats[*k].is_active())
                    .collect(),
            };
        if let Some(k) = seats.iter().find(|k| self.seats[**k].target.is_some()) {
            return Err(GameError::TargetAlreadyAssigned(self.seats[*k].name.clone()));
        }
        let targets
            = match self.pool.decks() {
                Some(decks) => {
                    let run = target::generate(
                        &self.initial, decks, seats.len(), retry_limit, &mut self.rng)?;
                    let targets = run.targets.clone();
                    self.target_run = Some(run);
                    targets
                },
                None => target::random_targets(
                    self.state.num_qubits(), seats.len(), &mut self.rng),
            };
        seats.iter().zip(targets)
            .for_each(|(k, t)| { self.seats[*k].target = Some(t); });
        if self.phase == Phase::Started { self.phase = Phase::InProgress; }
        info!(game = self.id, players = seats.len(), "target states assigned");
        Ok(())
    }

    /// Score of a single active player.
    pub fn fidelity(&self, player: &str) -> GameResult<f64> {
        let k = self.active_seat(player)?;
        self.fidelity_at(k)
            .ok_or_else(|| GameError::TargetNotAssigned(player.to_string()))
    }

    /// Scores of every active player with a target, in seat order.
    pub fn fidelities(&self) -> Vec<(String, f64)> {
        (0..self.seats.len())
            .filter(|k| self.seats[*k].is_active())
            .filter_map(|k| {
                self.fidelity_at(k).map(|f| (self.seats[k].name.clone(), f))
            })
            .collect()
    }

    /// Play `card` from `player`'s hand.
    ///
    /// Gate cards act on `qubits`, which must match the gate's arity; rotation
    /// gates also need an allowed `angle`. `add_qubit` ignores `qubits`, and
    /// `remove_qubit` measures and removes `qubits[0]`. On success the card is
    /// discarded and replaced from the pool.
    ///
    /// Every check happens before anything is changed: on error the shared
    /// state, the player's hand, and the pool are exactly as they were.
    pub fn play_card(
        &mut self,
        player: &str,
        card: Card,
        qubits: &[usize],
        angle: Option<f64>,
    ) -> GameResult<PlayOutcome>
    {
        let k = self.active_seat(player)?;
        if !self.seats[k].hand.contains(card) {
            return Err(GameError::CardNotOwned {
                player: player.to_string(),
                card: card.to_string(),
            });
        }
        self.pool.check_available(1)?;

        let mut angle_used: Option<Angle> = None;
        let (next, measurement)
            = match card {
                Card::Gate(kind) => {
                    let matrix = kind.matrix(angle)?;
                    if kind.is_rotation() {
                        angle_used = angle.map(Angle::from_radians).transpose()?;
                    }
                    (self.state.apply_gate(&matrix, qubits)?, None)
                },
                Card::Action(Action::AddQubit) => (self.state.with_ancilla(), None),
                Card::Action(Action::RemoveQubit) => {
                    if self.state.num_qubits() <= 1 {
                        return Err(GameError::CannotShrinkBelowOneQubit);
                    }
                    let &q = qubits.first()
                        .ok_or(GameError::GateArityMismatch { expected: 1, got: 0 })?;
                    let (outcome, reduced)
                        = self.state.measure_and_remove(q, &mut self.rng)?;
                    (reduced, Some(outcome))
                },
            };

        self.seats[k].hand.remove(card);
        self.discarded += 1;
        self.state = next;
        let replacement = self.pool.draw(&mut self.rng)?;
        self.seats[k].hand.add(replacement);
        self.moves.push(Move {
            player: player.to_string(),
            card,
            qubits: qubits.to_vec(),
            angle: angle_used,
            measurement,
        });
        if self.phase == Phase::Started { self.phase = Phase::InProgress; }
        debug!(
            game = self.id,
            player,
            %card,
            ?qubits,
            ?measurement,
            %replacement,
            num_qubits = self.state.num_qubits(),
            "card played",
        );

        Ok(PlayOutcome {
            measurement,
            state: self.state.clone(),
            replacement,
            fidelities: self.fidelities(),
        })
    }

    /// Return `true` if no other active player scores higher than `player`, or
    /// if `player`'s score is 1.
    pub fn check_top_fidelity(&self, player: &str) -> GameResult<bool> {
        let k = self.active_seat(player)?;
        let f = self.fidelity_at(k)
            .ok_or_else(|| GameError::TargetNotAssigned(player.to_string()))?;
        let best_other: f64
            = (0..self.seats.len())
            .filter(|j| *j != k && self.seats[*j].is_active())
            .filter_map(|j| self.fidelity_at(j))
            .fold(0.0, f64::max);
        Ok(f + EPSILON >= best_other || (1.0 - f).abs() < EPSILON)
    }

    // take a player out of play, discarding their hand
    fn release(&mut self, k: usize, status: SeatStatus) {
        let seat = &mut self.seats[k];
        seat.status = status;
        seat.target = None;
        self.discarded += seat.hand.clear();
    }

    fn end_if_decided(&mut self) -> bool {
        if self.phase != Phase::Ended && self.active_players().count() <= 1 {
            self.end_game();
            true
        } else {
            false
        }
    }

    /// `player` declares they are done.
    ///
    /// If [`Self::check_top_fidelity`] holds they join the winners, otherwise
    /// they go to the front of the ejected list. Either way their target and
    /// hand are cleared, and the game ends if at most one player is left.
    pub fn show(&mut self, player: &str) -> GameResult<ShowOutcome> {
        let k = self.active_seat(player)?;
        let verdict
            = if self.check_top_fidelity(player)? { Verdict::Win } else { Verdict::Lose };
        match verdict {
            Verdict::Win => {
                self.release(k, SeatStatus::Winner);
                self.winners.push(player.to_string());
            },
            Verdict::Lose => {
                self.release(k, SeatStatus::Ejected);
                self.ejected.insert(0, player.to_string());
            },
        }
        info!(game = self.id, player, ?verdict, "show");
        let game_ended = self.end_if_decided();
        Ok(ShowOutcome { verdict, game_ended })
    }

    /// `player` leaves the game voluntarily and is appended to the ejected
    /// list.
    pub fn drop_out(&mut self, player: &str) -> GameResult<DropOutcome> {
        let k = self.active_seat(player)?;
        self.release(k, SeatStatus::Ejected);
        self.ejected.push(player.to_string());
        info!(game = self.id, player, "dropped out");
        let game_ended = self.end_if_decided();
        Ok(DropOutcome { game_ended })
    }

    /// Active players ordered by ascending score, with ties kept in seat
    /// order. Players without a target score 0.
    pub fn ranked_active(&self) -> Vec<(String, f64)> {
        (0..self.seats.len())
            .filter(|k| self.seats[*k].is_active())
            .map(|k| (self.seats[k].name.clone(), self.fidelity_at(k).unwrap_or(0.0)))
            .sorted_by(|a, b| a.1.total_cmp(&b.1))
            .collect()
    }

    /// Move every remaining player to the winners, lowest score first, and end
    /// the game. Returns the names moved.
    pub fn end_game(&mut self) -> Vec<String> {
        let ranked: Vec<String>
            = self.ranked_active().into_iter()
            .map(|(name, _)| name)
            .collect();
        for name in ranked.iter() {
            if let Some(k) = self.seats.iter().position(|s| &s.name == name) {
                self.release(k, SeatStatus::Winner);
            }
            self.winners.push(name.clone());
        }
        self.phase = Phase::Ended;
        info!(game = self.id, winners = ?self.winners, ejected = ?self.ejected, "game ended");
        ranked
    }

    /// Full ranking: declared winners in order, then remaining players by
    /// ascending score, then ejected players.
    pub fn standings(&self) -> Vec<String> {
        self.winners.iter().cloned()
            .chain(self.ranked_active().into_iter().map(|(name, _)| name))
            .chain(self.ejected.iter().cloned())
            .collect()
    }

    /// Add one copy of the catalog to a finite pool, returning the number of
    /// cards now remaining.
    pub fn add_deck(&mut self) -> Option<usize> {
        let remaining = self.pool.add_deck()?;
        info!(game = self.id, decks = ?self.pool.decks(), remaining, "deck added");
        Some(remaining)
    }

    /// Number of cards currently held by all seats.
    pub fn cards_in_hands(&self) -> usize {
        self.seats.iter().map(|s| s.hand.len()).sum()
    }
}

#[cfg(test)]
impl Game {
    // hand a player a specific card outside of the pool
    pub(crate) fn give_card(&mut self, player: &str, card: Card) {
        if let Some(seat) = self.seats.iter_mut().find(|s| s.name == player) {
            seat.hand.add(card);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use num_complex::Complex64 as C64;
    use rand::{ Rng, SeedableRng };
    use crate::gate::GateKind;

    const X: Card = Card::Gate(GateKind::X);

    fn game(n: usize, decks: Option<usize>, players: &[&str]) -> Game {
        let mut g = Game::new(
            0, StateVector::zero(n), decks, StdRng::seed_from_u64(10546));
        g.distribute_cards(players, 7).unwrap();
        g
    }

    fn give(g: &mut Game, k: usize, cards: &[Card]) {
        g.discarded += g.seats[k].hand.clear();
        cards.iter().for_each(|c| { g.seats[k].hand.add(*c); });
    }

    #[test]
    fn x_twice_round_trips() {
        let mut g = game(2, Some(1), &["alice", "bob"]);
        give(&mut g, 0, &[X, X]);
        let out = g.play_card("alice", X, &[0], None).unwrap();
        assert!(out.state.is_close(&StateVector::basis(2, 0b10)));
        assert_eq!(out.measurement, None);
        assert_eq!(g.phase(), Phase::InProgress);
        let out = g.play_card("alice", X, &[0], None).unwrap();
        assert!(out.state.is_close(&StateVector::zero(2)));
        assert_eq!(g.moves().len(), 2);
    }

    #[test]
    fn rejected_plays_change_nothing() {
        let mut g = game(2, Some(1), &["alice", "bob"]);
        give(&mut g, 0, &[X, Card::Gate(GateKind::CNOT), Card::Gate(GateKind::Rx)]);
        let before = g.clone();
        let unchanged = |g: &Game| {
            g.state().is_close(before.state())
                && g.seats() == before.seats()
                && g.remaining_cards() == before.remaining_cards()
                && g.moves().is_empty()
        };

        let err = g.play_card("alice", Card::Gate(GateKind::H), &[0], None);
        assert!(matches!(err, Err(GameError::CardNotOwned { .. })));
        assert!(unchanged(&g));

        let err = g.play_card("alice", X, &[2], None);
        assert_eq!(err, Err(GameError::QubitIndexOutOfRange { index: 2, num_qubits: 2 }));
        assert!(unchanged(&g));

        let err = g.play_card("alice", Card::Gate(GateKind::CNOT), &[0], None);
        assert_eq!(err, Err(GameError::GateArityMismatch { expected: 2, got: 1 }));
        assert!(unchanged(&g));

        let err = g.play_card("alice", Card::Gate(GateKind::Rx), &[0], Some(1.0));
        assert_eq!(err, Err(GameError::InvalidAngle(Some(1.0))));
        assert!(unchanged(&g));

        let err = g.play_card("carol", X, &[0], None);
        assert_eq!(err, Err(GameError::PlayerNotInGame("carol".to_string())));
        assert!(unchanged(&g));
    }

    #[test]
    fn structural_cards() {
        let mut g = game(1, None, &["alice", "bob"]);
        let add = Card::Action(Action::AddQubit);
        let remove = Card::Action(Action::RemoveQubit);
        give(&mut g, 0, &[remove, add, remove]);
        assert_eq!(
            g.play_card("alice", remove, &[0], None),
            Err(GameError::CannotShrinkBelowOneQubit),
        );
        assert_eq!(g.seats()[0].hand.count(remove), 2);

        let out = g.play_card("alice", add, &[], None).unwrap();
        assert_eq!(out.state.num_qubits(), 2);
        let out = g.play_card("alice", remove, &[0], None).unwrap();
        assert_eq!(out.measurement, Some(0));
        assert!(out.state.is_close(&StateVector::zero(1)));
        assert_eq!(g.moves()[1].measurement, Some(0));
    }

    #[test]
    fn exhausted_pool_rejects_play() {
        let mut g = Game::new(
            0, StateVector::zero(1), Some(1), StdRng::seed_from_u64(10546));
        g.distribute_cards(&["alice", "bob"], 8).unwrap();
        assert_eq!(g.remaining_cards(), Some(0));
        let card = g.seats()[0].hand.cards()[0];
        let qubits: Vec<usize> = match card {
            Card::Gate(kind) if kind.arity() == 2 => vec![0, 1],
            _ => vec![0],
        };
        assert_eq!(
            g.play_card("alice", card, &qubits, None),
            Err(GameError::DeckExhausted),
        );
        assert_eq!(g.add_deck(), Some(16));
    }

    #[test]
    fn distribution_rules() {
        let mut g = Game::new(
            0, StateVector::zero(2), Some(1), StdRng::seed_from_u64(10546));
        assert_eq!(
            g.set_target_states(None::<&[&str]>, 8),
            Err(GameError::GameNotStarted),
        );
        assert_eq!(
            g.distribute_cards(&["a", "b", "c"], 7),
            Err(GameError::InsufficientCards { needed: 21, available: 16 }),
        );
        assert!(!g.is_started());
        assert_eq!(g.distribute_cards::<&str>(&[], 7), Err(GameError::NoPlayers));
        g.distribute_cards(&["a", "b", "a"], 7).unwrap();
        assert_eq!(g.seats().len(), 2);
        let seats = g.seats().to_vec();
        assert_eq!(g.distribute_cards(&["a", "b"], 7), Err(GameError::GameAlreadyStarted));
        assert_eq!(g.seats(), &seats[..]);

        let mut g = Game::new(
            0, StateVector::zero(2), Some(1), StdRng::seed_from_u64(10546));
        assert_eq!(
            g.distribute_cards(&["a", "b"], usize::MAX / 2 + 1),
            Err(GameError::InsufficientCards { needed: usize::MAX, available: 16 }),
        );
        assert_eq!(g.remaining_cards(), Some(16));
        assert!(!g.is_started());
    }

    #[test]
    fn targets_assigned() {
        let mut g = game(2, Some(2), &["alice", "bob", "carol"]);
        g.set_target_states(None::<&[&str]>, 64).unwrap();
        assert!(g.seats().iter().all(|s| s.target.is_some()));
        assert_eq!(g.target_run().unwrap().targets.len(), 3);
        assert_eq!(g.fidelities().len(), 3);

        let mut g = game(3, None, &["alice", "bob"]);
        g.set_target_states(Some(&["bob"][..]), 64).unwrap();
        assert!(g.seat("alice").unwrap().target.is_none());
        assert_eq!(g.seat("bob").unwrap().target.as_ref().unwrap().num_qubits(), 3);
        assert!(g.target_run().is_none());
        assert_eq!(
            g.fidelity("alice"),
            Err(GameError::TargetNotAssigned("alice".to_string())),
        );
    }

    #[test]
    fn targets_are_assigned_once() {
        let mut g = game(1, None, &["a", "b"]);
        g.set_target_states(None::<&[&str]>, 64).unwrap();
        let targets: Vec<Option<StateVector>>
            = g.seats().iter().map(|s| s.target.clone()).collect();
        assert_eq!(
            g.set_target_states(None::<&[&str]>, 64),
            Err(GameError::TargetAlreadyAssigned("a".to_string())),
        );
        assert_eq!(
            g.set_target_states(Some(&["b"][..]), 64),
            Err(GameError::TargetAlreadyAssigned("b".to_string())),
        );
        let after: Vec<Option<StateVector>>
            = g.seats().iter().map(|s| s.target.clone()).collect();
        assert_eq!(after, targets);

        // finite games keep their walk record too
        let mut g = game(2, Some(2), &["a", "b"]);
        g.set_target_states(Some(&["a"][..]), 64).unwrap();
        let run = g.target_run().cloned();
        assert!(g.set_target_states(None::<&[&str]>, 64).is_err());
        assert_eq!(g.target_run().cloned(), run);
        assert!(g.seat("b").unwrap().target.is_none());
        g.set_target_states(Some(&["b"][..]), 64).unwrap();
        assert!(g.seat("b").unwrap().target.is_some());

        g.end_game();
        assert_eq!(g.set_target_states(None::<&[&str]>, 64), Err(GameError::GameEnded));
    }

    #[test]
    fn top_fidelity() {
        let mut g = game(1, None, &["a", "b", "c"]);
        let s = |re: f64, im: f64| StateVector::normalized([C64::new(re, 0.0), C64::new(im, 0.0)]).unwrap();
        g.seats[0].target = Some(s(1.0, 0.0)); // fidelity 1
        g.seats[1].target = Some(s(1.0, 1.0)); // 1/√2
        g.seats[2].target = Some(s(1.0, 1.0)); // tie with b
        assert!(g.check_top_fidelity("a").unwrap());
        assert!(!g.check_top_fidelity("b").unwrap());
        g.seats[0].target = Some(s(0.0, 1.0)); // fidelity 0
        assert!(g.check_top_fidelity("b").unwrap());
        assert!(g.check_top_fidelity("c").unwrap());
        assert!(!g.check_top_fidelity("a").unwrap());
    }

    #[test]
    fn show_drop_and_end() {
        let mut g = game(1, None, &["a", "b", "c", "d", "e"]);
        let s = |re: f64, im: f64| StateVector::normalized([C64::new(re, 0.0), C64::new(im, 0.0)]).unwrap();
        g.seats[0].target = Some(s(0.0, 1.0)); // 0
        g.seats[1].target = Some(s(1.0, 1.0)); // 0.707
        g.seats[2].target = Some(s(1.0, 0.0)); // 1
        g.seats[3].target = Some(s(1.0, 2.0)); // 0.447
        g.seats[4].target = Some(s(1.0, 2.0)); // 0.447

        let out = g.show("b").unwrap();
        assert_eq!(out, ShowOutcome { verdict: Verdict::Lose, game_ended: false });
        let out = g.show("a").unwrap();
        assert_eq!(out.verdict, Verdict::Lose);
        assert_eq!(g.ejected(), &["a".to_string(), "b".to_string()]);
        let seat = g.seat("a").unwrap();
        assert!(seat.target.is_none() && seat.hand.is_empty());
        assert_eq!(seat.status, SeatStatus::Ejected);
        assert_eq!(g.show("a"), Err(GameError::PlayerNotInGame("a".to_string())));

        assert_eq!(g.show("c").unwrap().verdict, Verdict::Win);
        assert_eq!(g.winners(), &["c".to_string()]);
        assert_eq!(g.standings(), ["c", "d", "e", "a", "b"]);

        let out = g.drop_out("d").unwrap();
        assert!(out.game_ended);
        assert_eq!(g.phase(), Phase::Ended);
        assert_eq!(g.winners(), &["c".to_string(), "e".to_string()]);
        assert_eq!(g.ejected(), &["a".to_string(), "b".to_string(), "d".to_string()]);
        assert_eq!(g.active_players().count(), 0);
    }

    #[test]
    fn end_game_ties_keep_seat_order() {
        let mut g = game(1, None, &["a", "b", "c"]);
        let t = StateVector::normalized([C64::new(1.0, 0.0), C64::new(1.0, 0.0)]).unwrap();
        g.seats[0].target = Some(StateVector::zero(1));
        g.seats[1].target = Some(t.clone());
        g.seats[2].target = Some(t);
        assert_eq!(g.end_game(), ["b", "c", "a"]);
        assert_eq!(g.winners(), &["b".to_string(), "c".to_string(), "a".to_string()]);
    }

    #[test]
    fn cards_are_conserved() {
        let mut rng = StdRng::seed_from_u64(10546);
        let mut g = game(2, Some(3), &["a", "b", "c"]);
        g.set_target_states(None::<&[&str]>, 64).unwrap();
        let total = |g: &Game| {
            g.cards_in_hands() + g.remaining_cards().unwrap() + g.discarded()
        };
        let expected = |g: &Game| g.decks().unwrap() * Card::CATALOG_SIZE;
        let remove = Card::Action(Action::RemoveQubit);
        assert_eq!(total(&g), 3 * Card::CATALOG_SIZE);

        let mut played: usize = 0;
        let mut removed: usize = 0;
        let mut refills: usize = 0;
        for step in 0..200 {
            let names: Vec<String> = g.active_players().map(String::from).collect();
            let name = &names[step % names.len()];
            let n = g.num_qubits();
            // only cards that are legal on the current register
            let playable: Vec<Card>
                = g.seat(name).unwrap().hand.cards().into_iter()
                .filter(|card| match card {
                    Card::Gate(kind) => kind.arity() <= n,
                    Card::Action(Action::AddQubit) => n < 4,
                    Card::Action(Action::RemoveQubit) => n >= 2,
                })
                .collect();
            if playable.is_empty() { continue; }
            let card
                = if playable.contains(&remove) {
                    remove
                } else {
                    playable[rng.gen_range(0..playable.len())]
                };
            let qubits: Vec<usize>
                = match card {
                    Card::Gate(kind) if kind.arity() == 2 => vec![0, 1],
                    Card::Action(Action::AddQubit) => Vec::new(),
                    _ => vec![rng.gen_range(0..n)],
                };
            let angle = match card {
                Card::Gate(kind) if kind.is_rotation() => Some(Angle::Pi1q.radians()),
                _ => None,
            };
            match g.play_card(name, card, &qubits, angle) {
                Ok(out) => {
                    played += 1;
                    if card == remove {
                        removed += 1;
                        assert!(out.measurement.is_some());
                        assert_eq!(out.state.num_qubits(), n - 1);
                    }
                },
                Err(GameError::DeckExhausted) => {
                    g.add_deck();
                    refills += 1;
                },
                Err(err) => panic!("legal play rejected: {}", err),
            }
            assert_eq!(total(&g), expected(&g));
            if step == 20 {
                g.drop_out(name).unwrap();
                assert_eq!(total(&g), expected(&g));
            }
            if step >= 60 && removed > 0 { break; }
        }
        assert!(played >= 40);
        assert!(removed >= 1);
        assert_eq!(g.moves().len(), played);
        assert_eq!(expected(&g), (3 + refills) * Card::CATALOG_SIZE);
    }
}
