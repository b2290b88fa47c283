//! Chess move legality and a parallel one-ply best move search.
//!
//! A [`engine::Coordinator`] owns the live [`board::Board`], fans the legal moves of the side to
//! move out to a pool of [`worker::SearchWorker`]s and plays one of the best scoring moves.

pub mod board;
pub mod engine;
pub mod error;
pub mod eval;
pub mod messages;
pub mod tables;
pub mod validator;
pub mod worker;

pub use board::{Board, Color, Coord, Kind, Move, Piece};
pub use engine::{Coordinator, SearchConfig, SearchState};
pub use error::{EngineError, EngineResult};
pub use messages::{ChannelPlayer, EngineMessage, Player};
pub use tables::MoveTables;
