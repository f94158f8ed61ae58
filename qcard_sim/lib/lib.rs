//! Engine for a turn-based card game played on a shared quantum register.
//!
//! Players hold cards naming quantum gates (plus two cards that grow or shrink
//! the register) and take turns applying them to a single shared statevector,
//! each trying to steer it toward a private target state. Score is the
//! fidelity between a player's target and the shared state.
//!
//! - [`gate`]: the gate catalog and its matrices.
//! - [`state`]: statevectors, gate embedding, and measurement.
//! - [`target`]: generation of private target states.
//! - [`deck`]: cards, hands, and the pool they are dealt from.
//! - [`game`]: rules of a single game.
//! - [`service`]: the store of games and players behind a thread-safe API.

pub mod error;
pub mod config;
pub mod gate;
pub mod state;
pub mod target;
pub mod deck;
pub mod game;
pub mod service;

pub use error::{ GameError, GameResult };
pub use config::EngineConfig;
pub use deck::{ Action, Card };
pub use gate::{ Angle, GateKind };
pub use state::StateVector;
pub use game::{ Game, GameId, Verdict };
pub use service::QuantumCardService;
