use crate::board::{Color, Coord, Kind, Piece};
use log::debug;
use smallvec::SmallVec;
use std::time::Instant;

pub type Offsets = SmallVec<[(i8, i8); 8]>;

/// `[from_rank][from_file][to_rank][to_file]`
type SquareTable = [[[[bool; 8]; 8]; 8]; 8];
type PieceTables = [[SquareTable; 6]; 2];

const ORTHOGONAL: [(i8, i8); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_JUMPS: [(i8, i8); 8] = [(1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2)];

/// Geometry of every piece on an empty board. Built once, then shared read-only between the
/// validator and every search worker.
pub struct MoveTables {
   move_offsets: [[Offsets; 6]; 2],
   capture_offsets: [[Offsets; 6]; 2],
   multi_square: [bool; 6],
   valid_moves: Box<PieceTables>,
   valid_captures: Box<PieceTables>,
}

impl MoveTables {
   pub fn new() -> MoveTables {
      let start = Instant::now();

      let mut multi_square = [false; 6];
      for kind in [Kind::Bishop, Kind::Rook, Kind::Queen] {
         multi_square[kind.index()] = true;
      }

      let mut move_offsets: [[Offsets; 6]; 2] = Default::default();
      let mut capture_offsets: [[Offsets; 6]; 2] = Default::default();
      for color in [Color::White, Color::Black] {
         for kind in Kind::ALL {
            let (moves, captures): (Offsets, Offsets) = match kind {
               Kind::Pawn => (
                  SmallVec::from_slice(&[(0, color.forward())]),
                  SmallVec::from_slice(&[(-1, color.forward()), (1, color.forward())]),
               ),
               Kind::Knight => (SmallVec::from_slice(&KNIGHT_JUMPS), SmallVec::from_slice(&KNIGHT_JUMPS)),
               Kind::Bishop => (SmallVec::from_slice(&DIAGONAL), SmallVec::from_slice(&DIAGONAL)),
               Kind::Rook => (SmallVec::from_slice(&ORTHOGONAL), SmallVec::from_slice(&ORTHOGONAL)),
               Kind::Queen | Kind::King => {
                  let all: Offsets = ORTHOGONAL.iter().chain(DIAGONAL.iter()).copied().collect();
                  (all.clone(), all)
               }
            };
            move_offsets[color.index()][kind.index()] = moves;
            capture_offsets[color.index()][kind.index()] = captures;
         }
      }

      let mut valid_moves: Box<PieceTables> = Box::new([[[[[[false; 8]; 8]; 8]; 8]; 6]; 2]);
      let mut valid_captures: Box<PieceTables> = Box::new([[[[[[false; 8]; 8]; 8]; 8]; 6]; 2]);
      for color in [Color::White, Color::Black] {
         for kind in Kind::ALL {
            let multi = multi_square[kind.index()];
            for from in Coord::all() {
               let moves = &mut valid_moves[color.index()][kind.index()][from.rank as usize][from.file as usize];
               mark(moves, from, &move_offsets[color.index()][kind.index()], multi);
               if kind == Kind::Pawn && from.rank == color.pawn_rank() {
                  mark(moves, from, &[(0, 2 * color.forward())], false);
               }
               let captures = &mut valid_captures[color.index()][kind.index()][from.rank as usize][from.file as usize];
               mark(captures, from, &capture_offsets[color.index()][kind.index()], multi);
            }
         }
      }

      debug!("built move tables in {:?}", start.elapsed());

      MoveTables {
         move_offsets,
         capture_offsets,
         multi_square,
         valid_moves,
         valid_captures,
      }
   }

   /// Whether `piece` could go from `from` to an empty `to` on an otherwise empty board
   pub fn is_move(&self, piece: Piece, from: Coord, to: Coord) -> bool {
      self.valid_moves[piece.color.index()][piece.kind.index()][from.rank as usize][from.file as usize]
         [to.rank as usize][to.file as usize]
   }

   /// Whether `piece` could capture on `to` from `from` on an otherwise empty board
   pub fn is_capture(&self, piece: Piece, from: Coord, to: Coord) -> bool {
      self.valid_captures[piece.color.index()][piece.kind.index()][from.rank as usize][from.file as usize]
         [to.rank as usize][to.file as usize]
   }

   /// Sliding pieces, which need the squares in between checked
   pub fn multi_square(&self, kind: Kind) -> bool {
      self.multi_square[kind.index()]
   }

   pub fn move_offsets(&self, piece: Piece) -> &[(i8, i8)] {
      &self.move_offsets[piece.color.index()][piece.kind.index()]
   }

   pub fn capture_offsets(&self, piece: Piece) -> &[(i8, i8)] {
      &self.capture_offsets[piece.color.index()][piece.kind.index()]
   }
}

impl Default for MoveTables {
   fn default() -> MoveTables {
      MoveTables::new()
   }
}

fn mark(targets: &mut [[bool; 8]; 8], from: Coord, offsets: &[(i8, i8)], multi: bool) {
   for &(file_delta, rank_delta) in offsets {
      let mut cur = from;
      while let Some(next) = cur.offset(file_delta, rank_delta) {
         targets[next.rank as usize][next.file as usize] = true;
         if !multi {
            break;
         }
         cur = next;
      }
   }
}
