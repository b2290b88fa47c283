use crate::board::{Board, Move};
use crate::error::{EngineError, EngineResult};
use crate::messages::{InterfaceMessage, Player};
use crate::tables::MoveTables;
use crate::validator::{can_move, in_check, legal_moves};
use crate::worker::{BestMove, WorkerPool};
use log::{debug, info, trace, warn};
use noisy_float::prelude::*;
use parking_lot::{Mutex, ReentrantMutex};
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::cmp::Reverse;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
   /// Number of search workers; 0 is treated as 1
   pub threads: usize,
   /// How often the coordinator looks for work when nobody wakes it
   pub poll_interval: Duration,
   /// Fixed seed for the move selection, for reproducible games
   pub seed: Option<u64>,
}

impl Default for SearchConfig {
   fn default() -> SearchConfig {
      SearchConfig {
         threads: thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
         poll_interval: Duration::from_secs(1),
         seed: None,
      }
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
   Idle,
   Searching,
   Shutdown,
}

/// Scale applied to scores before comparing them to the best one. Grows with the game, so the
/// same raw difference separates moves more often later on.
pub fn decimator(plies: usize) -> f64 {
   0.125 * (plies + 1) as f64
}

/// Sorts `results` best first (stable, ties keep their order) and returns the moves whose
/// truncated `value * decimator` matches the best one's
pub fn best_candidates(results: &mut [BestMove], plies: usize) -> &[BestMove] {
   results.sort_by_key(|result| Reverse(n64(result.value)));
   let decimator = decimator(plies);
   let bucket = |result: &BestMove| (result.value * decimator).floor();
   let best = match results.first() {
      Some(result) => bucket(result),
      None => return results,
   };
   let count = results.iter().take_while(|result| bucket(result) == best).count();
   &results[..count]
}

/// Uniform pick among [`best_candidates`]
pub fn select_move<R: Rng + ?Sized>(results: &mut [BestMove], plies: usize, rng: &mut R) -> Option<BestMove> {
   best_candidates(results, plies).choose(rng).copied()
}

/// Scores every legal move of the side to move on the pool and picks one. `None` when there is
/// no legal move.
pub fn search<R: Rng + ?Sized>(
   tables: &MoveTables,
   pool: &mut WorkerPool,
   board: &Board,
   rng: &mut R,
) -> Option<BestMove> {
   let search_time_start = Instant::now();
   let turn = board.to_move();
   let moves = legal_moves(tables, turn, board);
   if moves.is_empty() {
      return None;
   }

   let futures = pool.submit_all(board, &moves);
   let mut results = Vec::with_capacity(futures.len());
   for future in futures {
      let a_move = future.a_move();
      match future.wait() {
         Ok(result) => results.push(result),
         Err(e) => warn!("no score for {}: {}", a_move, e),
      }
   }

   let plies = board.ply_count();
   trace!(
      "{} candidates within the window out of {} legal moves",
      best_candidates(&mut results, plies).len(),
      moves.len()
   );
   let choice = select_move(&mut results, plies, rng);
   if let Some(best) = choice {
      debug!(
         "search over {} moves on {} workers took {}. chose {} ({})",
         moves.len(),
         pool.len(),
         search_time_start.elapsed().as_secs_f64(),
         best.a_move,
         best.value
      );
   }
   choice
}

struct Shared {
   tables: Arc<MoveTables>,
   board: ReentrantMutex<RefCell<Board>>,
   state: Mutex<SearchState>,
   player: Arc<dyn Player>,
}

impl Shared {
   fn play(&self, a_move: Move) -> bool {
      let guard = self.board.lock();
      let legal = {
         let board = guard.borrow();
         can_move(&self.tables, board.to_move(), &board, a_move)
      };
      if !legal {
         debug!("rejected illegal move {}", a_move);
         return false;
      }
      guard.borrow_mut().apply(a_move);
      debug!("played {}", a_move);
      self.player.move_played(a_move);
      true
   }

   fn search_and_play(&self, pool: &mut WorkerPool, rng: &mut StdRng) {
      let snapshot = self.board.lock().borrow().clone();
      let choice = search(&self.tables, pool, &snapshot, rng);
      self.finish_search(&snapshot, choice);
   }

   /// Plays and reports the outcome of a search over `snapshot`, unless the live board has moved
   /// on or the coordinator shut down in the meantime
   fn finish_search(&self, snapshot: &Board, choice: Option<BestMove>) {
      let guard = self.board.lock();
      {
         let mut state = self.state.lock();
         if *state != SearchState::Searching {
            // shut down while we were thinking
            return;
         }
         *state = SearchState::Idle;
      }

      if *guard.borrow() != *snapshot {
         warn!("board changed during the search, discarding its result");
         return;
      }

      match choice {
         None => {
            let turn = snapshot.to_move();
            let in_check = in_check(&self.tables, turn, snapshot);
            info!("no legal move for {:?} (in check: {})", turn, in_check);
            self.player.no_move(in_check);
         }
         Some(best) => {
            guard.borrow_mut().apply(best.a_move);
            info!("decided on {} ({})", best.a_move, best.value);
            self.player.move_decided(best.a_move);
         }
      }
   }
}

/// Owns the live board and runs searches for it on a background thread
pub struct Coordinator {
   shared: Arc<Shared>,
   sender: Mutex<mpsc::Sender<InterfaceMessage>>,
   thread: Option<JoinHandle<()>>,
}

impl Coordinator {
   pub fn start(
      tables: Arc<MoveTables>,
      board: Board,
      config: SearchConfig,
      player: Arc<dyn Player>,
   ) -> EngineResult<Coordinator> {
      let pool = WorkerPool::new(config.threads, tables.clone())?;
      let rng = match config.seed {
         Some(seed) => StdRng::seed_from_u64(seed),
         None => StdRng::from_entropy(),
      };
      let shared = Arc::new(Shared {
         tables,
         board: ReentrantMutex::new(RefCell::new(board)),
         state: Mutex::new(SearchState::Idle),
         player,
      });

      let (sender, receiver) = mpsc::channel();
      let thread_shared = shared.clone();
      let poll_interval = config.poll_interval;
      let thread = thread::Builder::new()
         .name("search-coordinator".into())
         .spawn(move || run(&thread_shared, receiver, pool, rng, poll_interval))
         .map_err(|e| EngineError::Spawn {
            name: "search-coordinator".into(),
            message: e.to_string(),
         })?;

      Ok(Coordinator {
         shared,
         sender: Mutex::new(sender),
         thread: Some(thread),
      })
   }

   pub fn state(&self) -> SearchState {
      *self.shared.state.lock()
   }

   /// Starts a search for the side to move. Returns false if one is already running or the
   /// coordinator has shut down.
   pub fn request_search(&self) -> bool {
      {
         let mut state = self.shared.state.lock();
         if *state != SearchState::Idle {
            return false;
         }
         *state = SearchState::Searching;
      }
      // if this fails the poll picks the request up anyway
      let _ = self.sender.lock().send(InterfaceMessage::Search);
      true
   }

   /// Plays `a_move` for the side to move. Returns false, leaving the board alone, if it is
   /// illegal.
   pub fn play(&self, a_move: Move) -> bool {
      self.shared.play(a_move)
   }

   /// Keeps the board in step with a move the other side made
   pub fn opponent_moved(&self, a_move: Move) -> bool {
      self.shared.play(a_move)
   }

   pub fn undo(&self) -> Option<Move> {
      let guard = self.shared.board.lock();
      let undone = guard.borrow_mut().undo();
      if let Some(a_move) = undone {
         debug!("took back {}", a_move);
      }
      undone
   }

   /// A copy of the live board
   pub fn board(&self) -> Board {
      self.shared.board.lock().borrow().clone()
   }

   /// Replaces the live board, e.g. after editing the position
   pub fn set_board(&self, board: Board) {
      let guard = self.shared.board.lock();
      *guard.borrow_mut() = board;
   }

   pub fn legal_moves(&self) -> Vec<Move> {
      let guard = self.shared.board.lock();
      let board = guard.borrow();
      legal_moves(&self.shared.tables, board.to_move(), &board)
   }

   /// Stops the coordinator and its workers. An in-flight search runs to completion but its
   /// result is dropped.
   pub fn shutdown(&mut self) {
      *self.shared.state.lock() = SearchState::Shutdown;
      let _ = self.sender.lock().send(InterfaceMessage::Shutdown);
      if let Some(thread) = self.thread.take() {
         if thread.join().is_err() {
            warn!("search coordinator panicked");
         }
      }
   }
}

impl Drop for Coordinator {
   fn drop(&mut self) {
      self.shutdown();
   }
}

fn run(
   shared: &Shared,
   receiver: mpsc::Receiver<InterfaceMessage>,
   mut pool: WorkerPool,
   mut rng: StdRng,
   poll_interval: Duration,
) {
   trace!("search coordinator started");
   loop {
      match receiver.recv_timeout(poll_interval) {
         Ok(InterfaceMessage::Search) | Err(mpsc::RecvTimeoutError::Timeout) => (),
         Ok(InterfaceMessage::Shutdown) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
      }
      if *shared.state.lock() != SearchState::Searching {
         continue;
      }
      shared.search_and_play(&mut pool, &mut rng);
   }
   *shared.state.lock() = SearchState::Shutdown;
   pool.shutdown();
   trace!("search coordinator stopped");
}
