//! Card tokens, player hands, and the pool new cards are dealt from.
//!
//! A card is either a gate from the catalog in [`gate`][crate::gate] or one of
//! two structural [`Action`]s that grow or shrink the register. One *deck* is
//! one copy of every card in [`Card::catalog`].

use std::{ fmt, str::FromStr };
use itertools::Itertools;
use rand::Rng;
use rustc_hash::FxHashMap;
use crate::{
    error::{ GameError, GameResult },
    gate::GateKind,
};

/// A card that changes the number of qubits rather than applying a gate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    /// Append an ancilla qubit in ∣0⟩.
    AddQubit,
    /// Measure a qubit and remove it from the register.
    RemoveQubit,
}

impl Action {
    pub const ALL: [Self; 2] = [Self::AddQubit, Self::RemoveQubit];

    pub fn name(self) -> &'static str {
        match self {
            Self::AddQubit => "add_qubit",
            Self::RemoveQubit => "remove_qubit",
        }
    }
}

/// A single playable token.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Card {
    Gate(GateKind),
    Action(Action),
}

impl From<GateKind> for Card {
    fn from(kind: GateKind) -> Self { Self::Gate(kind) }
}

impl From<Action> for Card {
    fn from(action: Action) -> Self { Self::Action(action) }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Card {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL.into_iter()
            .find(|a| a.name() == s)
            .map(Self::Action)
            .map_or_else(|| s.parse::<GateKind>().map(Self::Gate), Ok)
    }
}

impl Card {
    /// Number of cards in one deck.
    pub const CATALOG_SIZE: usize = GateKind::ALL.len() + Action::ALL.len();

    /// One of each card: every gate in catalog order, then the two actions.
    pub fn catalog() -> impl Iterator<Item = Self> {
        GateKind::ALL.into_iter().map(Self::Gate)
            .chain(Action::ALL.into_iter().map(Self::Action))
    }

    /// The `k`-th card of [`Self::catalog`].
    ///
    /// *Panics if `k` ≥ [`Self::CATALOG_SIZE`].*
    pub fn nth(k: usize) -> Self {
        if k < GateKind::ALL.len() {
            Self::Gate(GateKind::ALL[k])
        } else {
            Self::Action(Action::ALL[k - GateKind::ALL.len()])
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Gate(kind) => kind.name(),
            Self::Action(action) => action.name(),
        }
    }

    /// Return `true` if `self` is a gate.
    pub fn is_gate(self) -> bool { matches!(self, Self::Gate(..)) }
}

/// The cards held by one player, as a multiset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hand(FxHashMap<Card, usize>);

impl FromIterator<Card> for Hand {
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = Card>
    {
        let mut hand = Self::default();
        iter.into_iter().for_each(|card| { hand.add(card); });
        hand
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.cards().into_iter().join(", "))
    }
}

impl Hand {
    pub fn new() -> Self { Self::default() }

    /// Total number of cards, counting duplicates.
    pub fn len(&self) -> usize { self.0.values().sum() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn count(&self, card: Card) -> usize {
        self.0.get(&card).copied().unwrap_or(0)
    }

    pub fn contains(&self, card: Card) -> bool { self.0.contains_key(&card) }

    pub fn add(&mut self, card: Card) -> &mut Self {
        *self.0.entry(card).or_insert(0) += 1;
        self
    }

    /// Remove one copy of `card`, returning `false` if there was none.
    pub fn remove(&mut self, card: Card) -> bool {
        match self.0.get_mut(&card) {
            None => false,
            Some(n) if *n > 1 => { *n -= 1; true },
            Some(_) => { self.0.remove(&card); true },
        }
    }

    /// Discard everything, returning the number of cards that were held.
    pub fn clear(&mut self) -> usize {
        let n = self.len();
        self.0.clear();
        n
    }

    /// All held cards with duplicates, in catalog order.
    pub fn cards(&self) -> Vec<Card> {
        self.0.iter()
            .sorted()
            .flat_map(|(card, n)| std::iter::repeat(*card).take(*n))
            .collect()
    }
}

/// Largest hand an infinite pool will deal: one copy of the catalog.
pub const MAX_INFINITE_HAND: usize = Card::CATALOG_SIZE;

/// Source of new cards for a game.
///
/// With a deck count, the pool holds that many copies of the catalog and cards
/// are drawn without replacement; without one, cards are drawn from the
/// catalog with replacement and the pool never runs out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardPool {
    decks: Option<usize>,
    pool: Vec<Card>,
}

impl CardPool {
    /// A pool of `decks` full copies of the catalog.
    pub fn finite(decks: usize) -> Self {
        let pool
            = (0..decks)
            .flat_map(|_| Card::catalog())
            .collect();
        Self { decks: Some(decks), pool }
    }

    /// An inexhaustible pool.
    pub fn infinite() -> Self { Self { decks: None, pool: Vec::new() } }

    pub fn new(decks: Option<usize>) -> Self {
        decks.map(Self::finite).unwrap_or_else(Self::infinite)
    }

    pub fn decks(&self) -> Option<usize> { self.decks }

    pub fn is_finite(&self) -> bool { self.decks.is_some() }

    /// Cards left to draw, or `None` for an infinite pool.
    pub fn remaining(&self) -> Option<usize> {
        self.decks.map(|_| self.pool.len())
    }

    /// Check that `n` cards could be drawn right now.
    pub fn check_available(&self, n: usize) -> GameResult<()> {
        match self.remaining() {
            Some(available) if n > available => {
                if available == 0 {
                    Err(GameError::DeckExhausted)
                } else {
                    Err(GameError::InsufficientCards { needed: n, available })
                }
            },
            _ => Ok(()),
        }
    }

    /// Draw a single card uniformly at random.
    pub fn draw<R>(&mut self, rng: &mut R) -> GameResult<Card>
    where R: Rng + ?Sized
    {
        if self.decks.is_none() {
            return Ok(Card::nth(rng.gen_range(0..Card::CATALOG_SIZE)));
        }
        if self.pool.is_empty() { return Err(GameError::DeckExhausted); }
        let k = rng.gen_range(0..self.pool.len());
        Ok(self.pool.swap_remove(k))
    }

    /// Deal `hand_size` cards to each of `players` hands, one card per player
    /// per round.
    ///
    /// Either every hand is dealt in full or, with
    /// [`InsufficientCards`][GameError::InsufficientCards], nothing is drawn.
    /// An infinite pool deals at most [`MAX_INFINITE_HAND`] cards per hand.
    pub fn deal<R>(&mut self, hand_size: usize, players: usize, rng: &mut R)
        -> GameResult<Vec<Hand>>
    where R: Rng + ?Sized
    {
        let available
            = self.remaining()
            .unwrap_or_else(|| MAX_INFINITE_HAND.saturating_mul(players));
        let needed
            = hand_size.checked_mul(players)
            .ok_or(GameError::InsufficientCards { needed: usize::MAX, available })?;
        if needed > available {
            return Err(GameError::InsufficientCards { needed, available });
        }
        let mut hands: Vec<Hand> = vec![Hand::new(); players];
        for _ in 0..hand_size {
            for hand in hands.iter_mut() {
                hand.add(self.draw(rng)?);
            }
        }
        Ok(hands)
    }

    /// Add one copy of the catalog to a finite pool, returning the new number
    /// of remaining cards. Does nothing to an infinite pool.
    pub fn add_deck(&mut self) -> Option<usize> {
        let decks = self.decks.as_mut()?;
        *decks += 1;
        self.pool.extend(Card::catalog());
        Some(self.pool.len())
    }
}
