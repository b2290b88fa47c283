use chesspool_lib::{Board, Coordinator, Move, Player};
use log::{debug, warn};
use std::io::{self, BufRead, Write};

/// Prints the engine's side of the game to stdout
pub(crate) struct ConsolePlayer;

impl Player for ConsolePlayer {
   fn move_decided(&self, a_move: Move) {
      println!("bestmove {}", a_move);
   }

   fn move_played(&self, a_move: Move) {
      debug!("board now has {}", a_move);
   }

   fn no_move(&self, in_check: bool) {
      println!("{}", if in_check { "checkmate" } else { "stalemate" });
   }
}

pub(crate) fn main_loop(coordinator: &Coordinator) -> io::Result<()> {
   let stdin = io::stdin();
   let mut in_handle = stdin.lock();
   let mut line_buf = String::new();

   loop {
      line_buf.clear();
      if in_handle.read_line(&mut line_buf)? == 0 {
         break;
      }
      // the player prints from the coordinator thread, so stdout is locked per write only
      let mut out_handle = io::stdout();
      let args: Vec<&str> = line_buf.split_whitespace().collect();

      match args.as_slice() {
         [] => continue,
         ["quit"] => break,
         ["go"] => {
            if !coordinator.request_search() {
               writeln!(out_handle, "busy")?;
            }
         }
         ["undo"] => match coordinator.undo() {
            Some(a_move) => writeln!(out_handle, "took back {}", a_move)?,
            None => writeln!(out_handle, "nothing to take back")?,
         },
         ["moves"] => {
            let moves: Vec<String> = coordinator.legal_moves().iter().map(Move::to_string).collect();
            writeln!(out_handle, "{}", moves.join(" "))?;
         }
         ["board"] => write!(out_handle, "{}", coordinator.board().position())?,
         ["fen", fen @ ..] => match Board::from_fen(&fen.join(" ")) {
            Ok(board) => coordinator.set_board(board),
            Err(e) => writeln!(out_handle, "{}", e)?,
         },
         [text] => match text.parse::<Move>() {
            Ok(a_move) => {
               if !coordinator.opponent_moved(a_move) {
                  writeln!(out_handle, "illegal move {}", a_move)?;
               }
            }
            Err(e) => writeln!(out_handle, "{}", e)?,
         },
         _ => warn!("unexpected input {}", line_buf.trim()),
      }
   }
   Ok(())
}
