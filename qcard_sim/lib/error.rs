//! Error kinds surfaced by every fallible operation in the crate.

use thiserror::Error;

/// Convenience alias for results carrying a [`GameError`].
pub type GameResult<T> = Result<T, GameError>;

/// All the ways an operation on a state, a card pool, or a game can fail.
///
/// Every variant is detected before any mutation takes place, so receiving
/// one of these means nothing was changed.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GameError {
    #[error("amplitudes do not form a normalized statevector of length 2^n")]
    InvalidStatevector,

    #[error("unknown gate: {0:?}")]
    UnknownGate(String),

    /// The angle given, or `None` if a rotation was given no angle.
    #[error("{}", angle_message(.0))]
    InvalidAngle(Option<f64>),

    #[error("qubit index {index} out of range for a {num_qubits}-qubit state")]
    QubitIndexOutOfRange { index: usize, num_qubits: usize },

    #[error("gate acts on {expected} qubit(s) but {got} target(s) were given")]
    GateArityMismatch { expected: usize, got: usize },

    #[error("matrix has {cols} columns but the state has {len} amplitudes")]
    DimensionMismatch { cols: usize, len: usize },

    #[error("gates act on 2x2 or 4x4 matrices, got {0}x{0}")]
    UnsupportedGateSize(usize),

    #[error("matrix is not unitary")]
    NotUnitary,

    #[error("cannot remove the last remaining qubit")]
    CannotShrinkBelowOneQubit,

    #[error("player {player:?} does not hold card {card}")]
    CardNotOwned { player: String, card: String },

    #[error("player {0:?} is not active in this game")]
    PlayerNotInGame(String),

    #[error("player {0:?} already belongs to another game")]
    PlayerBelongsToOtherGame(String),

    #[error("unknown player {0:?}")]
    UnknownPlayer(String),

    #[error("player {0:?} has no target state")]
    TargetNotAssigned(String),

    #[error("no players given")]
    NoPlayers,

    #[error("game {0} does not exist")]
    UnknownGame(usize),

    #[error("game has already started")]
    GameAlreadyStarted,

    #[error("game has not started; distribute cards first")]
    GameNotStarted,

    #[error("{needed} cards needed but only {available} available")]
    InsufficientCards { needed: usize, available: usize },

    #[error("card pool is exhausted; add a deck")]
    DeckExhausted,

    #[error("player name {0:?} is already taken")]
    NameTaken(String),

    #[error("could not generate distinct target states after {attempts} attempts")]
    TargetGenerationFailed { attempts: usize },

    #[error("player {0:?} already has a target state")]
    TargetAlreadyAssigned(String),

    #[error("game has already ended")]
    GameEnded,
}

fn angle_message(angle: &Option<f64>) -> String {
    match angle {
        Some(theta) => format!("angle {} is not allowed for this gate", theta),
        None => "rotation gates need an angle".to_string(),
    }
}
