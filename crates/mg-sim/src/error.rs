use mg_core::TypeId;
use thiserror::Error;

/// Construction-time failures.  Every class of configuration error surfaces
/// here; nothing about a bad config is recoverable at runtime.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("map cell ({row}, {col}) holds unknown symbol {symbol:?}")]
    UnknownMapSymbol { symbol: String, row: usize, col: usize },

    #[error("type id {type_id} claimed by both {first:?} and {second:?}")]
    DuplicateTypeId {
        type_id: TypeId,
        first: String,
        second: String,
    },

    #[error("observation window {height}x{width} must be odd-sized and at most 15 per axis")]
    BadObsWindow { height: u16, width: u16 },

    #[error("map places {found} agents but config declares {expected}")]
    AgentCountMismatch { expected: usize, found: usize },

    #[error("collectives must be supplied sorted by name ({first:?} before {second:?})")]
    CollectivesNotSorted { first: String, second: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    World(#[from] mg_world::WorldError),
}

/// Runtime failures — all of them host-contract violations around buffers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("step() called before set_buffers()")]
    BuffersNotAttached,

    #[error("{what} has {got} elements, expected {expected}")]
    BufferShape {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

pub type EnvResult<T> = Result<T, EnvError>;
