//! Move legality over a board snapshot.
//!
//! Nothing here mutates the board: hypothetical positions ("would my king be in check after
//! this?") are built as copies with [`Position::after`].

use crate::board::{castle_rook_squares, Board, Color, Coord, Kind, Move, Piece, Position};
use crate::tables::MoveTables;
use rayon::prelude::*;

/// Whether `turn` may play `a_move` on `board`, under the full rules: ownership, piece geometry,
/// blocking pieces, en passant, castling, promotion and not leaving the own king in check.
pub fn can_move(tables: &MoveTables, turn: Color, board: &Board, a_move: Move) -> bool {
   check_move(tables, turn, board.position(), Some(board), a_move, false)
}

/// A check-probe: whether `turn` could move as `a_move` if own-king safety is ignored. Capturing
/// a king is allowed, so this answers "is this square attacked from there".
pub fn can_attack(tables: &MoveTables, turn: Color, board: &Board, a_move: Move) -> bool {
   check_move(tables, turn, board.position(), Some(board), a_move, true)
}

pub fn in_check(tables: &MoveTables, turn: Color, board: &Board) -> bool {
   king_attacked(tables, turn, board.position())
}

/// Every legal move for `turn`. Pawn moves to the last rank come out as queen promotions.
pub fn legal_moves(tables: &MoveTables, turn: Color, board: &Board) -> Vec<Move> {
   (0..64usize)
      .into_par_iter()
      .flat_map_iter(|from_index| {
         let from = Coord::from_index(from_index);
         let piece = board.position().get(from).filter(|p| p.color == turn);
         Coord::all()
            .filter(move |_| piece.is_some())
            .map(move |to| match piece {
               Some(p) if p.kind == Kind::Pawn && to.rank == turn.promotion_rank() => {
                  Move::promoting(from, to, Kind::Queen)
               }
               _ => Move::new(from, to),
            })
            .filter(|a_move| can_move(tables, turn, board, *a_move))
      })
      .collect()
}

pub(crate) fn king_attacked(tables: &MoveTables, turn: Color, position: &Position) -> bool {
   let king = match position.king(turn) {
      Some(k) => k,
      None => return false,
   };
   Coord::all().any(|from| check_move(tables, !turn, position, None, Move::new(from, king), true))
}

/// `history` supplies the last move and castling rights. Without it (hypothetical positions) en
/// passant and castling are never legal, which is all a check-probe needs.
fn check_move(
   tables: &MoveTables,
   turn: Color,
   position: &Position,
   history: Option<&Board>,
   a_move: Move,
   probe: bool,
) -> bool {
   let piece = match position.get(a_move.from) {
      Some(p) if p.color == turn => p,
      _ => return false,
   };
   let target = position.get(a_move.to);
   match target {
      Some(t) if t.color == turn => return false,
      Some(t) if t.kind == Kind::King && !probe => return false,
      _ => (),
   }
   if let Some(promotion) = a_move.promotion {
      if piece.kind != Kind::Pawn || a_move.to.rank != turn.promotion_rank() || !promotion.is_promotion_target() {
         return false;
      }
   }

   let mut castle = false;
   if target.is_none() {
      if !tables.is_move(piece, a_move.from, a_move.to) {
         match history {
            Some(board) if en_passant(tables, board, piece, a_move) => (),
            Some(board) if castle_rights(tables, board, piece, a_move) => castle = true,
            _ => return false,
         }
      }
   } else if !tables.is_capture(piece, a_move.from, a_move.to) {
      return false;
   }

   let double_step = piece.kind == Kind::Pawn && (a_move.to.rank as i8 - a_move.from.rank as i8).abs() == 2;
   if (tables.multi_square(piece.kind) || double_step) && !path_clear(position, a_move.from, a_move.to) {
      return false;
   }

   if castle {
      let (rook_from, _) = match castle_rook_squares(a_move) {
         Some(squares) => squares,
         None => return false,
      };
      if !path_clear(position, a_move.from, rook_from) {
         return false;
      }
      // the king may not pass through check; the landing square is covered below
      let step = if a_move.to.file > a_move.from.file { 1 } else { -1 };
      let mut cur = a_move.from;
      while let Some(next) = cur.offset(step, 0) {
         if next == a_move.to {
            break;
         }
         if king_attacked(tables, turn, &position.after(Move::new(a_move.from, next))) {
            return false;
         }
         cur = next;
      }
   }

   if !probe && king_attacked(tables, turn, &position.after(a_move)) {
      return false;
   }

   true
}

fn en_passant(tables: &MoveTables, board: &Board, piece: Piece, a_move: Move) -> bool {
   if piece.kind != Kind::Pawn || !tables.is_capture(piece, a_move.from, a_move.to) {
      return false;
   }
   let last = match board.last_move() {
      Some(l) => l,
      None => return false,
   };
   let passed_over = (last.a_move.from.rank + last.a_move.to.rank) / 2;
   last.piece == Piece::new(!piece.color, Kind::Pawn)
      && last.is_pawn_double_step()
      && last.a_move.to.rank == a_move.from.rank
      && (last.a_move.to.file as i8 - a_move.from.file as i8).abs() == 1
      && a_move.to.file == last.a_move.to.file
      && a_move.to.rank == passed_over
}

/// The part of castling legality that doesn't depend on the squares in between
fn castle_rights(tables: &MoveTables, board: &Board, piece: Piece, a_move: Move) -> bool {
   let color = piece.color;
   let home = color.home_rank();
   if piece.kind != Kind::King || a_move.from != (Coord { file: 4, rank: home }) || a_move.to.rank != home {
      return false;
   }
   let rights = board.castling(color);
   let allowed = match a_move.to.file {
      6 => rights.king_side(),
      2 => rights.queen_side(),
      _ => false,
   };
   if !allowed {
      return false;
   }
   let rook_present = castle_rook_squares(a_move)
      .map(|(rook_from, _)| board.position().get(rook_from) == Some(Piece::new(color, Kind::Rook)))
      .unwrap_or(false);
   rook_present && !king_attacked(tables, color, board.position())
}

/// Whether every square strictly between `from` and `to` is empty. Both must share a rank, file
/// or diagonal.
pub(crate) fn path_clear(position: &Position, from: Coord, to: Coord) -> bool {
   let file_step = (to.file as i8 - from.file as i8).signum();
   let rank_step = (to.rank as i8 - from.rank as i8).signum();
   let mut cur = from;
   while let Some(next) = cur.offset(file_step, rank_step) {
      if next == to {
         return true;
      }
      if position.get(next).is_some() {
         return false;
      }
      cur = next;
   }
   true
}
