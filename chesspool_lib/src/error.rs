use crate::board::Color;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
   /// Malformed UCI move text
   #[error("invalid move: {0}")]
   InvalidMove(String),

   #[error("malformed FEN; {0}")]
   InvalidFen(String),

   /// A board needs exactly one king per color
   #[error("invalid setup: {color:?} has {kings} kings, expected exactly 1")]
   InvalidSetup { color: Color, kings: usize },

   /// The promise backing a search future was dropped before being fulfilled
   #[error("search work item was cancelled before it was evaluated")]
   Cancelled,

   #[error("failed to spawn {name} thread: {message}")]
   Spawn { name: String, message: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
