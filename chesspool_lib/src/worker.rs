use crate::board::{Board, Move};
use crate::error::{EngineError, EngineResult};
use crate::eval::evaluate;
use crate::tables::MoveTables;
use log::{debug, trace, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// The score of one candidate move, from the point of view of the side that plays it
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BestMove {
   pub value: f64,
   pub a_move: Move,
}

/// Write side of a single result. Dropping it unfulfilled cancels the paired future.
pub struct Promise {
   sender: mpsc::SyncSender<BestMove>,
}

impl Promise {
   fn fulfill(self, result: BestMove) {
      // the coordinator may have stopped waiting; nothing left to do then
      let _ = self.sender.send(result);
   }
}

/// Read side of a single result
pub struct SearchFuture {
   a_move: Move,
   receiver: mpsc::Receiver<BestMove>,
}

impl SearchFuture {
   pub fn a_move(&self) -> Move {
      self.a_move
   }

   /// Blocks until the worker fulfills or drops the promise
   pub fn wait(self) -> EngineResult<BestMove> {
      self.receiver.recv().map_err(|_| EngineError::Cancelled)
   }

   /// `Ok(None)` when the timeout elapsed first
   pub fn wait_timeout(&self, timeout: Duration) -> EngineResult<Option<BestMove>> {
      match self.receiver.recv_timeout(timeout) {
         Ok(result) => Ok(Some(result)),
         Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
         Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineError::Cancelled),
      }
   }
}

fn promise(a_move: Move) -> (Promise, SearchFuture) {
   let (sender, receiver) = mpsc::sync_channel(1);
   (Promise { sender }, SearchFuture { a_move, receiver })
}

struct WorkItem {
   board: Board,
   a_move: Move,
   promise: Promise,
}

struct Queue {
   items: VecDeque<WorkItem>,
   finished: bool,
}

struct Shared {
   queue: Mutex<Queue>,
   wake: Condvar,
}

/// Plays `a_move` on a copy of `board` and scores the result for the mover
pub fn score_move(tables: &MoveTables, board: &Board, a_move: Move) -> BestMove {
   let mover = board
      .position()
      .get(a_move.from)
      .map(|piece| piece.color)
      .unwrap_or_else(|| board.to_move());
   let after = board.with_move(a_move);
   BestMove {
      value: evaluate(tables, mover, &after),
      a_move,
   }
}

/// A thread with a FIFO queue of candidate moves to score
pub struct SearchWorker {
   id: usize,
   shared: Arc<Shared>,
   thread: Option<JoinHandle<()>>,
}

impl SearchWorker {
   pub fn spawn(id: usize, tables: Arc<MoveTables>) -> EngineResult<SearchWorker> {
      let shared = Arc::new(Shared {
         queue: Mutex::new(Queue {
            items: VecDeque::new(),
            finished: false,
         }),
         wake: Condvar::new(),
      });
      let name = format!("search-worker-{}", id);
      let thread_shared = shared.clone();
      let thread = thread::Builder::new()
         .name(name.clone())
         .spawn(move || run(id, &thread_shared, &tables))
         .map_err(|e| EngineError::Spawn {
            name,
            message: e.to_string(),
         })?;
      Ok(SearchWorker {
         id,
         shared,
         thread: Some(thread),
      })
   }

   pub fn id(&self) -> usize {
      self.id
   }

   /// Queues `a_move` for scoring against `board`. Never blocks on the evaluation itself.
   pub fn submit(&self, board: Board, a_move: Move) -> SearchFuture {
      let (promise, future) = promise(a_move);
      let mut queue = self.shared.queue.lock();
      if queue.finished {
         // the promise drops here, so the future reports cancellation
         return future;
      }
      queue.items.push_back(WorkItem { board, a_move, promise });
      drop(queue);
      self.shared.wake.notify_one();
      future
   }

   pub fn pending(&self) -> usize {
      self.shared.queue.lock().items.len()
   }

   /// Stops the thread after its current item. Queued items are cancelled.
   pub fn shutdown(&mut self) {
      {
         let mut queue = self.shared.queue.lock();
         queue.finished = true;
      }
      self.shared.wake.notify_all();
      if let Some(thread) = self.thread.take() {
         if thread.join().is_err() {
            warn!("search worker {} panicked", self.id);
         }
      }
   }
}

impl Drop for SearchWorker {
   fn drop(&mut self) {
      self.shutdown();
   }
}

/// Marks the queue finished and cancels whatever is left in it, also when the worker unwinds
struct CancelOnExit<'a> {
   id: usize,
   shared: &'a Shared,
}

impl Drop for CancelOnExit<'_> {
   fn drop(&mut self) {
      let mut queue = self.shared.queue.lock();
      queue.finished = true;
      let cancelled = queue.items.len();
      queue.items.clear();
      if cancelled > 0 {
         debug!("search worker {} cancelled {} queued items", self.id, cancelled);
      }
   }
}

fn run(id: usize, shared: &Shared, tables: &MoveTables) {
   trace!("search worker {} started", id);
   let _cancel = CancelOnExit { id, shared };
   loop {
      let item = {
         let mut queue = shared.queue.lock();
         while queue.items.is_empty() && !queue.finished {
            shared.wake.wait(&mut queue);
         }
         if queue.finished {
            break;
         }
         queue.items.pop_front()
      };
      if let Some(item) = item {
         let result = score_move(tables, &item.board, item.a_move);
         trace!("worker {} scored {} at {}", id, item.a_move, result.value);
         item.promise.fulfill(result);
      }
   }
   trace!("search worker {} stopped", id);
}

/// A fixed set of workers fed round-robin
pub struct WorkerPool {
   workers: Vec<SearchWorker>,
   next: usize,
}

impl WorkerPool {
   /// `threads` is clamped to at least one
   pub fn new(threads: usize, tables: Arc<MoveTables>) -> EngineResult<WorkerPool> {
      let workers = (0..threads.max(1))
         .map(|id| SearchWorker::spawn(id, tables.clone()))
         .collect::<EngineResult<Vec<_>>>()?;
      debug!("started {} search workers", workers.len());
      Ok(WorkerPool { workers, next: 0 })
   }

   pub fn len(&self) -> usize {
      self.workers.len()
   }

   pub fn is_empty(&self) -> bool {
      self.workers.is_empty()
   }

   pub fn submit(&mut self, board: Board, a_move: Move) -> SearchFuture {
      let worker = &self.workers[self.next];
      self.next = (self.next + 1) % self.workers.len();
      worker.submit(board, a_move)
   }

   /// One work item per move, each with its own copy of `board`
   pub fn submit_all(&mut self, board: &Board, moves: &[Move]) -> Vec<SearchFuture> {
      moves.iter().map(|a_move| self.submit(board.clone(), *a_move)).collect()
   }

   pub fn shutdown(&mut self) {
      for worker in self.workers.iter_mut() {
         worker.shutdown();
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::board::Color;
   use crate::validator::legal_moves;
   use fxhash::FxHashSet;
   use rand::seq::SliceRandom;
   use rand::Rng;

   #[test]
   fn worker_scores_in_order() {
      let tables = Arc::new(MoveTables::new());
      let worker = SearchWorker::spawn(0, tables.clone()).unwrap();
      let board = Board::from_start();
      let moves = legal_moves(&tables, Color::White, &board);
      let futures: Vec<_> = moves.iter().map(|m| worker.submit(board.clone(), *m)).collect();
      for (future, a_move) in futures.into_iter().zip(moves.iter()) {
         assert_eq!(future.a_move(), *a_move);
         let result = future.wait().unwrap();
         assert_eq!(result.a_move, *a_move);
         assert_eq!(result, score_move(&tables, &board, *a_move));
      }
      assert_eq!(worker.pending(), 0);
   }

   #[test]
   fn work_runs_on_a_board_copy() {
      let tables = Arc::new(MoveTables::new());
      let mut pool = WorkerPool::new(2, tables).unwrap();
      let board = Board::from_start();
      let futures = pool.submit_all(&board, &["e2e4".parse().unwrap(), "d2d4".parse().unwrap()]);
      for future in futures {
         future.wait().unwrap();
      }
      assert_eq!(board, Board::from_start());
   }

   #[test]
   fn pool_of_zero_is_one() {
      let tables = Arc::new(MoveTables::new());
      let pool = WorkerPool::new(0, tables).unwrap();
      assert_eq!(pool.len(), 1);
   }

   #[test]
   fn every_item_is_answered_once() {
      let tables = Arc::new(MoveTables::new());
      let mut rng = rand::thread_rng();
      let board = Board::from_moves("e2e4 e7e5 g1f3").unwrap();
      let mut moves = legal_moves(&tables, Color::Black, &board);
      for threads in 1..=4 {
         let mut pool = WorkerPool::new(threads, tables.clone()).unwrap();
         for _ in 0..10 {
            moves.shuffle(&mut rng);
            let n = rng.gen_range(1..=moves.len());
            let mut futures = pool.submit_all(&board, &moves[..n]);
            // collect in a random order; results are tied to their future, not to queue order
            futures.shuffle(&mut rng);
            let mut seen = FxHashSet::default();
            for future in futures {
               let expected = future.a_move();
               let result = future.wait().unwrap();
               assert_eq!(result.a_move, expected);
               assert!(seen.insert(result.a_move));
            }
            let submitted: FxHashSet<Move> = moves[..n].iter().copied().collect();
            assert_eq!(seen, submitted);
         }
      }
   }

   #[test]
   fn shutdown_never_leaves_futures_hanging() {
      let tables = Arc::new(MoveTables::new());
      let mut worker = SearchWorker::spawn(7, tables.clone()).unwrap();
      let board = Board::from_start();
      let moves = legal_moves(&tables, Color::White, &board);
      let futures: Vec<_> = moves.iter().map(|m| worker.submit(board.clone(), *m)).collect();
      worker.shutdown();
      for future in futures {
         match future.wait_timeout(Duration::from_secs(10)) {
            Ok(Some(_)) | Err(EngineError::Cancelled) => (),
            other => panic!("future not resolved: {:?}", other),
         }
      }
      let late = worker.submit(board, moves[0]);
      assert_eq!(late.wait(), Err(EngineError::Cancelled));
   }
}
