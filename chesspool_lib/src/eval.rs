use crate::board::{Board, Color, Coord, Kind, Move, Piece};
use crate::tables::MoveTables;
use crate::validator::{can_attack, can_move, in_check, path_clear};

const MATERIAL_WEIGHT: f64 = 10.0;
const MOBILITY_WEIGHT: f64 = 1.0;
const ATTACK_WEIGHT: f64 = 1.0;
const DEFEND_WEIGHT: f64 = 1.0;
const CHECK_WEIGHT: f64 = 1000.0;

fn mat_val(kind: Kind) -> f64 {
   match kind {
      Kind::Pawn => 1.0,
      Kind::Knight => 3.0,
      Kind::Bishop => 3.0,
      Kind::Rook => 5.0,
      Kind::Queen => 10.0,
      Kind::King => 0.0,
   }
}

/// The unweighted parts of an evaluation, all from one side's point of view
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Terms {
   material: f64,
   mobility: f64,
   attack: f64,
   defend: f64,
   check: f64,
}

impl Terms {
   fn weighted(&self) -> f64 {
      self.material * MATERIAL_WEIGHT
         + self.mobility * MOBILITY_WEIGHT
         + self.attack * ATTACK_WEIGHT
         + self.defend * DEFEND_WEIGHT
         + self.check * CHECK_WEIGHT
   }
}

/// Scores `board` for `perspective`; positive is good for `perspective`. This looks at the
/// current position only, it does not search.
///
/// Returns negative infinity when `perspective` is in check with no king move out of it, and
/// positive infinity in the mirrored case.
pub fn evaluate(tables: &MoveTables, perspective: Color, board: &Board) -> f64 {
   let opponent = !perspective;
   let perspective_in_check = in_check(tables, perspective, board);
   let opponent_in_check = in_check(tables, opponent, board);
   if perspective_in_check && !king_can_escape(tables, perspective, board) {
      return f64::NEG_INFINITY;
   }
   if opponent_in_check && !king_can_escape(tables, opponent, board) {
      return f64::INFINITY;
   }

   let mut terms = terms(tables, perspective, board);
   terms.check = match (perspective_in_check, opponent_in_check) {
      (true, false) => -1.0,
      (false, true) => 1.0,
      _ => 0.0,
   };
   terms.weighted()
}

fn terms(tables: &MoveTables, perspective: Color, board: &Board) -> Terms {
   let position = board.position();
   let mut terms = Terms::default();

   for (from, piece) in position.pieces() {
      let sign = if piece.color == perspective { 1.0 } else { -1.0 };
      terms.material += sign * mat_val(piece.kind);
      let mut promotes = false;

      for to in Coord::all() {
         if to == from {
            continue;
         }
         match position.get(to) {
            Some(friend) if friend.color == piece.color => {
               if covers(tables, board, piece, from, to) {
                  terms.defend += sign * mat_val(friend.kind);
               }
            }
            target => {
               if !can_attack(tables, piece.color, board, Move::new(from, to)) {
                  continue;
               }
               terms.mobility += sign;
               // a capture available to a side counts against that side
               if let Some(victim) = target {
                  terms.attack -= sign * mat_val(victim.kind);
               }
               if piece.kind == Kind::Pawn && to.rank == piece.color.promotion_rank() {
                  promotes = true;
               }
            }
         }
      }

      if promotes {
         terms.material += sign * (mat_val(Kind::Queen) - mat_val(Kind::Pawn));
      }
   }

   terms
}

/// Whether `piece` on `from` protects its own piece on `to`
fn covers(tables: &MoveTables, board: &Board, piece: Piece, from: Coord, to: Coord) -> bool {
   tables.is_capture(piece, from, to)
      && (!tables.multi_square(piece.kind) || path_clear(board.position(), from, to))
}

fn king_can_escape(tables: &MoveTables, color: Color, board: &Board) -> bool {
   let king = Piece::new(color, Kind::King);
   let from = match board.position().king(color) {
      Some(k) => k,
      None => return false,
   };
   tables
      .move_offsets(king)
      .iter()
      .filter_map(|&(file_delta, rank_delta)| from.offset(file_delta, rank_delta))
      .any(|to| can_move(tables, color, board, Move::new(from, to)))
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn start_position_is_even() {
      let tables = MoveTables::new();
      let board = Board::from_start();
      assert_eq!(evaluate(&tables, Color::White, &board), 0.0);
      assert_eq!(evaluate(&tables, Color::Black, &board), 0.0);
   }

   #[test]
   fn evaluation_is_antisymmetric() {
      let tables = MoveTables::new();
      for moves in ["e2e4", "e2e4 d7d5", "g1f3 b8c6 e2e4", "e2e4 d7d5 e4d5 d8d5"] {
         let board = Board::from_moves(moves).unwrap();
         let white = evaluate(&tables, Color::White, &board);
         let black = evaluate(&tables, Color::Black, &board);
         assert_eq!(white, -black, "{}", moves);
      }
   }

   #[test]
   fn material_counts() {
      let tables = MoveTables::new();
      let board = Board::from_fen("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
      assert!(evaluate(&tables, Color::White, &board) > 50.0);
      assert!(evaluate(&tables, Color::Black, &board) < -50.0);
   }

   #[test]
   fn mate_is_infinite() {
      let tables = MoveTables::new();
      let board = Board::from_moves("f2f3 e7e5 g2g4 d8h4").unwrap();
      assert_eq!(evaluate(&tables, Color::White, &board), f64::NEG_INFINITY);
      assert_eq!(evaluate(&tables, Color::Black, &board), f64::INFINITY);
   }

   #[test]
   fn escapable_check_is_penalized() {
      let tables = MoveTables::new();
      let checked = Board::from_fen("4k3/8/8/8/8/8/8/r3K3 w - - 0 1").unwrap();
      let value = evaluate(&tables, Color::White, &checked);
      assert!(value.is_finite());
      assert!(value < -500.0);
   }

   #[test]
   fn promotion_bonus_is_per_pawn() {
      let tables = MoveTables::new();
      // the pawn can push to a8 and take on b8; one bonus of 9 either way
      let two_ways = Board::from_fen("1n5k/P7/8/8/8/8/8/K7 w - - 0 1").unwrap();
      assert_eq!(terms(&tables, Color::White, &two_ways).material, 1.0 + 9.0 - 3.0);
      assert_eq!(terms(&tables, Color::Black, &two_ways).material, -(1.0 + 9.0 - 3.0));
      let one_way = Board::from_fen("7k/P7/8/8/8/8/8/K7 w - - 0 1").unwrap();
      assert_eq!(terms(&tables, Color::White, &one_way).material, 1.0 + 9.0);
      let blocked = Board::from_fen("n6k/P7/8/8/8/8/8/K7 w - - 0 1").unwrap();
      assert_eq!(terms(&tables, Color::White, &blocked).material, 1.0 - 3.0);
      assert!(evaluate(&tables, Color::White, &two_ways) < evaluate(&tables, Color::White, &one_way));
   }

   #[test]
   fn own_captures_lower_the_attack_term() {
      let tables = MoveTables::new();
      let board = Board::from_fen("1n5k/P7/8/8/8/8/8/K7 w - - 0 1").unwrap();
      assert_eq!(terms(&tables, Color::White, &board).attack, -3.0);
      assert_eq!(terms(&tables, Color::Black, &board).attack, 3.0);
      // the king may take the rook; the rook taking the king is worth nothing
      let board = Board::from_fen("7k/8/8/8/8/8/r7/K7 w - - 0 1").unwrap();
      assert_eq!(terms(&tables, Color::White, &board).attack, -5.0);
   }

   #[test]
   fn near_promotion_is_rewarded() {
      let tables = MoveTables::new();
      let far = Board::from_fen("7k/8/8/8/8/P7/8/K7 w - - 0 1").unwrap();
      let near = Board::from_fen("7k/P7/8/8/8/8/8/K7 w - - 0 1").unwrap();
      assert!(evaluate(&tables, Color::White, &near) > evaluate(&tables, Color::White, &far));
   }
}
