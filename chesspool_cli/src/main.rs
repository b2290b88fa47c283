mod console;

use chesspool_lib::{Board, ChannelPlayer, Coordinator, EngineMessage, EngineResult, MoveTables, SearchConfig};
use log::{error, info};
use std::error::Error;
use std::process;
use std::sync::Arc;
use structopt::StructOpt;

/// A chess engine that scores every legal move in parallel
#[derive(StructOpt, Debug)]
#[structopt(name = "chesspool")]
struct Opt {
   /// Number of search workers, 0 picks one per core
   #[structopt(short = "t", long = "threads", default_value = "0")]
   threads: usize,
   /// The engine plays both sides for up to this many plies, then exits
   #[structopt(long = "selfplay")]
   selfplay: Option<usize>,
   /// Start from this FEN instead of the standard setup
   #[structopt(long = "fen")]
   fen: Option<String>,
   /// Seed for choosing among equally good moves
   #[structopt(long = "seed")]
   seed: Option<u64>,
}

fn main() {
   pretty_env_logger::init();
   let opt = Opt::from_args();

   if let Err(e) = run(opt) {
      error!("{}", e);
      process::exit(1);
   }
}

fn run(opt: Opt) -> Result<(), Box<dyn Error>> {
   let mut config = SearchConfig::default();
   if opt.threads > 0 {
      config.threads = opt.threads;
   }
   config.seed = opt.seed;

   let board = match opt.fen {
      Some(fen) => Board::from_fen(&fen)?,
      None => Board::from_start(),
   };
   let tables = Arc::new(MoveTables::new());
   info!("using {} search workers", config.threads);

   if let Some(plies) = opt.selfplay {
      selfplay(tables, board, config, plies)?;
      return Ok(());
   }

   let coordinator = Coordinator::start(tables, board, config, Arc::new(console::ConsolePlayer))?;
   console::main_loop(&coordinator)?;
   Ok(())
}

fn selfplay(tables: Arc<MoveTables>, board: Board, config: SearchConfig, plies: usize) -> EngineResult<()> {
   let (player, receiver) = ChannelPlayer::new();
   let mut coordinator = Coordinator::start(tables, board, config, Arc::new(player))?;

   for ply in 0..plies {
      if !coordinator.request_search() {
         break;
      }
      match receiver.recv() {
         Ok(EngineMessage::Decided(a_move)) => println!("{}. {}", ply + 1, a_move),
         Ok(EngineMessage::NoMove { in_check }) => {
            println!("{}", if in_check { "checkmate" } else { "stalemate" });
            break;
         }
         Ok(EngineMessage::Played(_)) => (),
         Err(_) => break,
      }
   }

   print!("{}", coordinator.board().position());
   coordinator.shutdown();
   Ok(())
}
