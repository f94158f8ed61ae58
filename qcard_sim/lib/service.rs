//! Top-level store of games and players, and the operations exposed to a
//! transport layer.
//!
//! Every game sits behind its own mutex, so operations on one game are
//! serialized while different games proceed in parallel. The player registry
//! maps names to the game each player is currently bound to. When both are
//! needed, the game is always locked before the registry.

use std::sync::Arc;
use num_complex::Complex64 as C64;
use parking_lot::{ Mutex, RwLock };
use rand::{ rngs::StdRng, Rng, SeedableRng };
use rustc_hash::FxHashMap;
use tracing::info;
use crate::{
    config::EngineConfig,
    deck::{ Card, Hand },
    error::{ GameError, GameResult },
    game::{ DropOutcome, Game, GameId, Move, Phase, PlayOutcome, ShowOutcome },
    state::StateVector,
    target::TargetRun,
};

/// A registered player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    /// The game the player is currently dealt into, if any.
    pub game: Option<GameId>,
}

/// Owner of all games and players.
#[derive(Debug)]
pub struct QuantumCardService {
    config: EngineConfig,
    games: RwLock<Vec<Arc<Mutex<Game>>>>,
    players: RwLock<FxHashMap<String, Player>>,
    rng: Mutex<StdRng>,
}

impl Default for QuantumCardService {
    fn default() -> Self { Self::new(EngineConfig::default()) }
}

impl QuantumCardService {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            rng: Mutex::new(config.rng()),
            config,
            games: RwLock::new(Vec::new()),
            players: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn num_games(&self) -> usize { self.games.read().len() }

    /// Create a game from raw amplitudes.
    ///
    /// Fails with [`InvalidStatevector`][GameError::InvalidStatevector] if the
    /// amplitudes are not a normalized vector of length 2<sup>*n*</sup>.
    pub fn create_game<I>(&self, initial: I, decks: Option<usize>)
        -> GameResult<GameId>
    where I: IntoIterator<Item = C64>
    {
        let initial = StateVector::new(initial)?;
        Ok(self.create_game_with_state(initial, decks))
    }

    /// Create a game from an already validated state.
    pub fn create_game_with_state(&self, initial: StateVector, decks: Option<usize>)
        -> GameId
    {
        let rng = StdRng::seed_from_u64(self.rng.lock().gen());
        let mut games = self.games.write();
        let id = games.len();
        info!(game = id, num_qubits = initial.num_qubits(), ?decks, "game created");
        games.push(Arc::new(Mutex::new(Game::new(id, initial, decks, rng))));
        id
    }

    /// Handle to a single game.
    pub fn game(&self, id: GameId) -> GameResult<Arc<Mutex<Game>>> {
        self.games.read()
            .get(id)
            .cloned()
            .ok_or(GameError::UnknownGame(id))
    }

    fn with_game<F, T>(&self, id: GameId, f: F) -> GameResult<T>
    where F: FnOnce(&mut Game) -> GameResult<T>
    {
        let game = self.game(id)?;
        let mut guard = game.lock();
        f(&mut guard)
    }

    pub fn register_player(&self, name: &str) -> GameResult<()> {
        let mut players = self.players.write();
        if players.contains_key(name) {
            return Err(GameError::NameTaken(name.to_string()));
        }
        players.insert(name.to_string(), Player { name: name.to_string(), game: None });
        info!(player = name, "player registered");
        Ok(())
    }

    pub fn player(&self, name: &str) -> Option<Player> {
        self.players.read().get(name).cloned()
    }

    /// Deal cards to registered players and bind them to game `id`.
    ///
    /// `hand_size` defaults to the configured hand size. Fails with
    /// [`UnknownPlayer`][GameError::UnknownPlayer] for an unregistered name and
    /// with [`PlayerBelongsToOtherGame`][GameError::PlayerBelongsToOtherGame]
    /// if a player is bound elsewhere; no player is bound and no card is dealt
    /// unless the whole call succeeds.
    pub fn distribute_cards<S>(&self, id: GameId, names: &[S], hand_size: Option<usize>)
        -> GameResult<()>
    where S: AsRef<str>
    {
        let hand_size = hand_size.unwrap_or(self.config.hand_size);
        self.with_game(id, |game| {
            if game.is_started() { return Err(GameError::GameAlreadyStarted); }
            let mut players = self.players.write();
            for name in names.iter().map(|s| s.as_ref()) {
                match players.get(name) {
                    None => return Err(GameError::UnknownPlayer(name.to_string())),
                    Some(Player { game: Some(other), .. }) if *other != id
                        => return Err(GameError::PlayerBelongsToOtherGame(name.to_string())),
                    _ => { },
                }
            }
            game.distribute_cards(names, hand_size)?;
            for name in names.iter() {
                if let Some(p) = players.get_mut(name.as_ref()) { p.game = Some(id); }
            }
            Ok(())
        })
    }

    /// Assign targets to `names`, or to every active player of game `id`.
    pub fn set_target_states<S>(&self, id: GameId, names: Option<&[S]>)
        -> GameResult<()>
    where S: AsRef<str>
    {
        let limit = self.config.target_retry_limit;
        self.with_game(id, |game| game.set_target_states(names, limit))
    }

    /// Play a card; see [`Game::play_card`].
    pub fn play_card(
        &self,
        id: GameId,
        player: &str,
        card: Card,
        qubits: &[usize],
        angle: Option<f64>,
    ) -> GameResult<PlayOutcome>
    {
        self.with_game(id, |game| game.play_card(player, card, qubits, angle))
    }

    // unbind every player of `game` who is no longer active
    fn release_players(&self, game: &Game) {
        let mut players = self.players.write();
        for seat in game.seats().iter().filter(|s| !s.is_active()) {
            match players.get_mut(&seat.name) {
                Some(p) if p.game == Some(game.id()) => { p.game = None; },
                _ => { },
            }
        }
    }

    /// `player` declares they are done; see [`Game::show`].
    pub fn show(&self, id: GameId, player: &str) -> GameResult<ShowOutcome> {
        self.with_game(id, |game| {
            let outcome = game.show(player)?;
            self.release_players(game);
            Ok(outcome)
        })
    }

    /// `player` leaves the game; see [`Game::drop_out`].
    pub fn drop_player(&self, id: GameId, player: &str) -> GameResult<DropOutcome> {
        self.with_game(id, |game| {
            let outcome = game.drop_out(player)?;
            self.release_players(game);
            Ok(outcome)
        })
    }

    /// Rank the remaining players and end game `id`, returning the players
    /// moved to the winners.
    pub fn end_game(&self, id: GameId) -> GameResult<Vec<String>> {
        self.with_game(id, |game| {
            let ranked = game.end_game();
            self.release_players(game);
            Ok(ranked)
        })
    }

    /// Add a deck to game `id`, returning the number of cards now in its pool,
    /// or `None` if the game deals from an infinite supply.
    pub fn add_deck(&self, id: GameId) -> GameResult<Option<usize>> {
        self.with_game(id, |game| Ok(game.add_deck()))
    }

    pub fn phase(&self, id: GameId) -> GameResult<Phase> {
        self.with_game(id, |game| Ok(game.phase()))
    }

    pub fn shared_state(&self, id: GameId) -> GameResult<StateVector> {
        self.with_game(id, |game| Ok(game.state().clone()))
    }

    pub fn hand(&self, id: GameId, player: &str) -> GameResult<Hand> {
        self.with_game(id, |game| {
            game.seat(player)
                .map(|s| s.hand.clone())
                .ok_or_else(|| GameError::PlayerNotInGame(player.to_string()))
        })
    }

    pub fn fidelities(&self, id: GameId) -> GameResult<Vec<(String, f64)>> {
        self.with_game(id, |game| Ok(game.fidelities()))
    }

    pub fn check_top_fidelity(&self, id: GameId, player: &str) -> GameResult<bool> {
        self.with_game(id, |game| game.check_top_fidelity(player))
    }

    pub fn remaining_cards(&self, id: GameId) -> GameResult<Option<usize>> {
        self.with_game(id, |game| Ok(game.remaining_cards()))
    }

    /// The walk that generated game `id`'s targets.
    pub fn target_sequence(&self, id: GameId) -> GameResult<Option<TargetRun>> {
        self.with_game(id, |game| Ok(game.target_run().cloned()))
    }

    pub fn moves(&self, id: GameId) -> GameResult<Vec<Move>> {
        self.with_game(id, |game| Ok(game.moves().to_vec()))
    }

    pub fn winners(&self, id: GameId) -> GameResult<Vec<String>> {
        self.with_game(id, |game| Ok(game.winners().to_vec()))
    }

    pub fn ejected(&self, id: GameId) -> GameResult<Vec<String>> {
        self.with_game(id, |game| Ok(game.ejected().to_vec()))
    }

    /// See [`Game::standings`].
    pub fn standings(&self, id: GameId) -> GameResult<Vec<String>> {
        self.with_game(id, |game| Ok(game.standings()))
    }
}
