use crate::error::{EngineError, EngineResult};
use std::fmt::{self, Write};
use std::str::FromStr;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
   White,
   Black,
}

impl Color {
   pub(crate) fn index(self) -> usize {
      match self {
         Color::White => 0,
         Color::Black => 1,
      }
   }

   /// Rank the back-row pieces start on
   pub fn home_rank(self) -> u8 {
      match self {
         Color::White => 0,
         Color::Black => 7,
      }
   }

   /// Rank pawns of this color start on
   pub fn pawn_rank(self) -> u8 {
      match self {
         Color::White => 1,
         Color::Black => 6,
      }
   }

   /// Rank a pawn of this color promotes on
   pub fn promotion_rank(self) -> u8 {
      (!self).home_rank()
   }

   /// Direction pawns of this color advance in, as a rank delta
   pub fn forward(self) -> i8 {
      match self {
         Color::White => 1,
         Color::Black => -1,
      }
   }
}

impl std::ops::Not for Color {
   type Output = Color;
   fn not(self) -> Color {
      match self {
         Color::Black => Color::White,
         Color::White => Color::Black,
      }
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
   Pawn,
   Knight,
   Bishop,
   Rook,
   Queen,
   King,
}

impl Kind {
   pub const ALL: [Kind; 6] = [Kind::Pawn, Kind::Knight, Kind::Bishop, Kind::Rook, Kind::Queen, Kind::King];

   pub(crate) fn index(self) -> usize {
      match self {
         Kind::Pawn => 0,
         Kind::Knight => 1,
         Kind::Bishop => 2,
         Kind::Rook => 3,
         Kind::Queen => 4,
         Kind::King => 5,
      }
   }

   pub fn symbol(self) -> char {
      match self {
         Kind::Pawn => 'p',
         Kind::Knight => 'n',
         Kind::Bishop => 'b',
         Kind::Rook => 'r',
         Kind::Queen => 'q',
         Kind::King => 'k',
      }
   }

   pub fn from_symbol(symbol: char) -> Option<Kind> {
      match symbol.to_ascii_lowercase() {
         'p' => Some(Kind::Pawn),
         'n' => Some(Kind::Knight),
         'b' => Some(Kind::Bishop),
         'r' => Some(Kind::Rook),
         'q' => Some(Kind::Queen),
         'k' => Some(Kind::King),
         _ => None,
      }
   }

   /// Kinds a pawn may promote to
   pub fn is_promotion_target(self) -> bool {
      matches!(self, Kind::Knight | Kind::Bishop | Kind::Rook | Kind::Queen)
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
   pub color: Color,
   pub kind: Kind,
}

impl Piece {
   pub const fn new(color: Color, kind: Kind) -> Piece {
      Piece { color, kind }
   }

   /// FEN letter: uppercase for white, lowercase for black
   pub fn symbol(self) -> char {
      match self.color {
         Color::White => self.kind.symbol().to_ascii_uppercase(),
         Color::Black => self.kind.symbol(),
      }
   }

   pub fn from_symbol(symbol: char) -> Option<Piece> {
      let kind = Kind::from_symbol(symbol)?;
      let color = if symbol.is_ascii_uppercase() {
         Color::White
      } else {
         Color::Black
      };
      Some(Piece::new(color, kind))
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
   pub file: u8,
   pub rank: u8,
}

impl Coord {
   pub fn new(file: u8, rank: u8) -> Option<Coord> {
      if file < 8 && rank < 8 {
         Some(Coord { file, rank })
      } else {
         None
      }
   }

   pub(crate) fn from_index(index: usize) -> Coord {
      Coord {
         file: (index % 8) as u8,
         rank: (index / 8) as u8,
      }
   }

   /// All 64 squares, a1 first, h8 last
   pub fn all() -> impl Iterator<Item = Coord> {
      (0..64).map(Coord::from_index)
   }

   pub fn offset(self, file_delta: i8, rank_delta: i8) -> Option<Coord> {
      let file = self.file as i8 + file_delta;
      let rank = self.rank as i8 + rank_delta;
      if (0..8).contains(&file) && (0..8).contains(&rank) {
         Some(Coord {
            file: file as u8,
            rank: rank as u8,
         })
      } else {
         None
      }
   }
}

impl fmt::Display for Coord {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      f.write_char((b'a' + self.file) as char)?;
      f.write_char((b'1' + self.rank) as char)
   }
}

impl FromStr for Coord {
   type Err = EngineError;

   fn from_str(s: &str) -> EngineResult<Coord> {
      let bytes = s.as_bytes();
      if bytes.len() != 2 {
         return Err(EngineError::InvalidMove(format!(
            "a square has to be 2 bytes long, got {} ({} bytes)",
            s,
            bytes.len()
         )));
      }
      let file = match bytes[0] {
         b @ b'a'..=b'h' => b - b'a',
         other => {
            return Err(EngineError::InvalidMove(format!(
               "expected file in a-h, got {}",
               other as char
            )))
         }
      };
      let rank = match bytes[1] {
         b @ b'1'..=b'8' => b - b'1',
         other => {
            return Err(EngineError::InvalidMove(format!(
               "expected rank in 1-8, got {}",
               other as char
            )))
         }
      };
      Ok(Coord { file, rank })
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
   pub from: Coord,
   pub to: Coord,
   pub promotion: Option<Kind>,
}

impl Move {
   pub fn new(from: Coord, to: Coord) -> Move {
      Move {
         from,
         to,
         promotion: None,
      }
   }

   pub fn promoting(from: Coord, to: Coord, kind: Kind) -> Move {
      Move {
         from,
         to,
         promotion: Some(kind),
      }
   }
}

impl fmt::Display for Move {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      write!(f, "{}{}", self.from, self.to)?;
      if let Some(promotion) = self.promotion {
         f.write_char(promotion.symbol())?;
      }
      Ok(())
   }
}

impl FromStr for Move {
   type Err = EngineError;

   fn from_str(s: &str) -> EngineResult<Move> {
      if !s.is_ascii() || s.len() < 4 || s.len() > 5 {
         return Err(EngineError::InvalidMove(format!(
            "a full move has to be 4-5 ASCII bytes long, got a move ({}) that was {} bytes long",
            s,
            s.len()
         )));
      }
      let from: Coord = s[..2].parse()?;
      let to: Coord = s[2..4].parse()?;
      let promotion = match s[4..].chars().next() {
         None => None,
         Some(symbol) => match Kind::from_symbol(symbol) {
            Some(kind) if kind.is_promotion_target() && symbol.is_ascii_lowercase() => Some(kind),
            _ => {
               return Err(EngineError::InvalidMove(format!(
                  "expected one of ASCII nbrq for promotion target, got {}",
                  symbol
               )))
            }
         },
      };
      Ok(Move { from, to, promotion })
   }
}

/// Castling rights of one color, as flags that only ever go from false to true
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CastlingState {
   pub king_moved: bool,
   pub king_rook_moved: bool,
   pub queen_rook_moved: bool,
}

impl CastlingState {
   pub fn king_side(self) -> bool {
      !self.king_moved && !self.king_rook_moved
   }

   pub fn queen_side(self) -> bool {
      !self.king_moved && !self.queen_rook_moved
   }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
   squares: [[Option<Piece>; 8]; 8],
}

impl Position {
   pub fn empty() -> Position {
      Position {
         squares: [[None; 8]; 8],
      }
   }

   /// The standard initial setup
   pub fn standard() -> Position {
      const BACK_RANK: [Kind; 8] = [
         Kind::Rook,
         Kind::Knight,
         Kind::Bishop,
         Kind::Queen,
         Kind::King,
         Kind::Bishop,
         Kind::Knight,
         Kind::Rook,
      ];
      let mut position = Position::empty();
      for color in [Color::White, Color::Black] {
         let home = color.home_rank() as usize;
         let pawns = color.pawn_rank() as usize;
         for (file, kind) in BACK_RANK.iter().enumerate() {
            position.squares[home][file] = Some(Piece::new(color, *kind));
            position.squares[pawns][file] = Some(Piece::new(color, Kind::Pawn));
         }
      }
      position
   }

   pub fn get(&self, at: Coord) -> Option<Piece> {
      self.squares[at.rank as usize][at.file as usize]
   }

   pub fn set(&mut self, at: Coord, piece: Option<Piece>) {
      self.squares[at.rank as usize][at.file as usize] = piece;
   }

   /// Every occupied square
   pub fn pieces(&self) -> impl Iterator<Item = (Coord, Piece)> + '_ {
      Coord::all().filter_map(move |at| self.get(at).map(|piece| (at, piece)))
   }

   pub fn king(&self, color: Color) -> Option<Coord> {
      let king = Piece::new(color, Kind::King);
      self.pieces().find(|(_, piece)| *piece == king).map(|(at, _)| at)
   }

   pub fn count(&self, piece: Piece) -> usize {
      self.pieces().filter(|(_, p)| *p == piece).count()
   }

   /// The position after `a_move`, with no legality checking. Handles the castling rook,
   /// the en passant victim and promotion (to a queen unless the move says otherwise).
   #[must_use]
   pub fn after(&self, a_move: Move) -> Position {
      let mut next = *self;
      let piece = match self.get(a_move.from) {
         Some(p) => p,
         None => return next,
      };
      next.set(a_move.from, None);

      match piece.kind {
         Kind::Pawn => {
            if a_move.from.file != a_move.to.file && self.get(a_move.to).is_none() {
               // en passant; the victim sits beside the origin
               next.set(
                  Coord {
                     file: a_move.to.file,
                     rank: a_move.from.rank,
                  },
                  None,
               );
            }
         }
         Kind::King => {
            if let Some((rook_from, rook_to)) = castle_rook_squares(a_move) {
               let rook = next.get(rook_from);
               next.set(rook_from, None);
               next.set(rook_to, rook);
            }
         }
         _ => (),
      }

      let landed = if piece.kind == Kind::Pawn && a_move.to.rank == piece.color.promotion_rank() {
         Piece::new(piece.color, a_move.promotion.unwrap_or(Kind::Queen))
      } else {
         piece
      };
      next.set(a_move.to, Some(landed));
      next
   }
}

/// For a king move of two files, where the rook comes from and goes to
pub(crate) fn castle_rook_squares(a_move: Move) -> Option<(Coord, Coord)> {
   if a_move.from.rank != a_move.to.rank {
      return None;
   }
   let rank = a_move.from.rank;
   match a_move.to.file as i8 - a_move.from.file as i8 {
      2 => Some((Coord { file: 7, rank }, Coord { file: 5, rank })),
      -2 => Some((Coord { file: 0, rank }, Coord { file: 3, rank })),
      _ => None,
   }
}

impl fmt::Debug for Position {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      fmt::Display::fmt(self, f)
   }
}

impl fmt::Display for Position {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      for rank in (0..8).rev() {
         for file in 0..8 {
            let symbol = self.squares[rank][file].map(Piece::symbol).unwrap_or('.');
            f.write_char(symbol)?;
         }
         f.write_char('\n')?;
      }
      Ok(())
   }
}

/// One played move, with everything needed to check en passant, read castling rights and undo it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
   pub a_move: Move,
   pub piece: Piece,
   pub captured: Option<Piece>,
   /// Castling rights for both colors as of this move
   pub castling: [CastlingState; 2],
   before: Position,
}

impl HistoryEntry {
   pub fn is_pawn_double_step(&self) -> bool {
      self.piece.kind == Kind::Pawn && (self.a_move.to.rank as i8 - self.a_move.from.rank as i8).abs() == 2
   }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
   position: Position,
   history: Vec<HistoryEntry>,
   initial_castling: [CastlingState; 2],
   initial_to_move: Color,
   /// Plies played before the recorded history starts, known from a FEN move number
   plies_before: usize,
}

impl Board {
   pub fn from_start() -> Board {
      Board {
         position: Position::standard(),
         history: Vec::new(),
         initial_castling: [CastlingState::default(); 2],
         initial_to_move: Color::White,
         plies_before: 0,
      }
   }

   /// Arbitrary setup, bypassing legality checks. Castling rights are granted for every king and
   /// rook still on its home square. Rejects boards without exactly one king per color.
   pub fn setup(position: Position, to_move: Color) -> EngineResult<Board> {
      for color in [Color::White, Color::Black] {
         let kings = position.count(Piece::new(color, Kind::King));
         if kings != 1 {
            return Err(EngineError::InvalidSetup { color, kings });
         }
      }
      let mut initial_castling = [CastlingState::default(); 2];
      for color in [Color::White, Color::Black] {
         let home = color.home_rank();
         let holds = |file: u8, kind: Kind| position.get(Coord { file, rank: home }) == Some(Piece::new(color, kind));
         initial_castling[color.index()] = CastlingState {
            king_moved: !holds(4, Kind::King),
            king_rook_moved: !holds(7, Kind::Rook),
            queen_rook_moved: !holds(0, Kind::Rook),
         };
      }
      Ok(Board {
         position,
         history: Vec::new(),
         initial_castling,
         initial_to_move: to_move,
         plies_before: 0,
      })
   }

   /// Plays a whitespace separated list of UCI moves from the standard setup, unchecked
   #[cfg(test)]
   pub(crate) fn from_moves(moves: &str) -> EngineResult<Board> {
      let mut board = Board::from_start();
      for a_str_move in moves.split_whitespace() {
         board.apply(a_str_move.parse()?);
      }
      Ok(board)
   }

   pub fn from_fen(fen: &str) -> EngineResult<Board> {
      let fen_sections: Vec<&str> = fen.split_whitespace().collect();
      if fen_sections.len() < 3 {
         return Err(EngineError::InvalidFen(format!(
            "expected at least 3 sections (placement, side to move, castling), found {}",
            fen_sections.len()
         )));
      }

      let mut position = Position::empty();
      let ranks: Vec<&str> = fen_sections[0].split('/').collect();
      if ranks.len() != 8 {
         return Err(EngineError::InvalidFen(format!("expected 8 ranks, found {}", ranks.len())));
      }
      for (i, rank_str) in ranks.iter().enumerate() {
         let rank = 7 - i as u8;
         let mut file: u8 = 0;
         for ascii_char in rank_str.chars() {
            if let Some(skip) = ascii_char.to_digit(10).filter(|d| (1..=8).contains(d)) {
               file += skip as u8;
            } else if let Some(piece) = Piece::from_symbol(ascii_char) {
               if file < 8 {
                  position.set(Coord { file, rank }, Some(piece));
               }
               file += 1;
            } else {
               return Err(EngineError::InvalidFen(format!(
                  "got unexpected character {} during piece placement, expecting one of pbnrqkPBNRQK12345678/",
                  ascii_char
               )));
            }
            if file > 8 {
               return Err(EngineError::InvalidFen(format!("rank {} has more than 8 squares", rank + 1)));
            }
         }
         if file != 8 {
            return Err(EngineError::InvalidFen(format!(
               "got to end of rank {} without all squares in rank accounted for",
               rank + 1
            )));
         }
      }

      let to_move = match fen_sections[1] {
         "w" => Color::White,
         "b" => Color::Black,
         other => {
            return Err(EngineError::InvalidFen(format!(
               "got unexpected {} parsing player to move, expecting one of wb",
               other
            )));
         }
      };

      let mut board = Board::setup(position, to_move)?;

      let castling = fen_sections[2];
      if castling.is_empty() || castling.len() > 4 {
         return Err(EngineError::InvalidFen(format!(
            "castling rights section shouldn't be longer than 4 bytes or less than 1, found {}",
            castling.len()
         )));
      }
      let mut granted = [[false; 2]; 2];
      if castling != "-" {
         for ascii_char in castling.chars() {
            let (color, side) = match ascii_char {
               'K' => (Color::White, 0),
               'Q' => (Color::White, 1),
               'k' => (Color::Black, 0),
               'q' => (Color::Black, 1),
               _ => {
                  return Err(EngineError::InvalidFen(format!(
                     "found {} when parsing castling rights, expected one of KQkq",
                     ascii_char
                  )));
               }
            };
            if granted[color.index()][side] {
               return Err(EngineError::InvalidFen(format!(
                  "encountered castling right {} twice",
                  ascii_char
               )));
            }
            granted[color.index()][side] = true;
         }
      }
      for color in [Color::White, Color::Black] {
         let rights = &mut board.initial_castling[color.index()];
         rights.king_rook_moved |= !granted[color.index()][0];
         rights.queen_rook_moved |= !granted[color.index()][1];
      }

      if let Some(&en_passant) = fen_sections.get(3) {
         if en_passant != "-" {
            let target: Coord = en_passant
               .parse()
               .map_err(|e| EngineError::InvalidFen(format!("en passant square was not a valid square: {}", e)))?;
            board.record_double_step(target)?;
         }
      }

      // the halfmove clock, the fifth field, has no use here
      if let Some(&fullmove) = fen_sections.get(5) {
         let fullmove: usize = fullmove
            .parse()
            .map_err(|e| EngineError::InvalidFen(format!("fullmove number {} is not a number: {}", fullmove, e)))?;
         let plies = fullmove.saturating_sub(1) * 2 + usize::from(to_move == Color::Black);
         board.plies_before = plies.saturating_sub(board.history.len());
      }

      Ok(board)
   }

   /// Materializes a FEN en passant target as the double step that produced it
   fn record_double_step(&mut self, target: Coord) -> EngineResult<()> {
      let mover = !self.initial_to_move;
      let landed = target.offset(0, mover.forward());
      let origin = target.offset(0, -mover.forward());
      let (landed, origin) = match (landed, origin) {
         (Some(l), Some(o)) if o.rank == mover.pawn_rank() => (l, o),
         _ => {
            return Err(EngineError::InvalidFen(format!(
               "en passant square {} is not behind a double stepped pawn",
               target
            )))
         }
      };
      let pawn = Piece::new(mover, Kind::Pawn);
      if self.position.get(landed) != Some(pawn)
         || self.position.get(target).is_some()
         || self.position.get(origin).is_some()
      {
         return Err(EngineError::InvalidFen(format!(
            "en passant square {} is not behind a double stepped pawn",
            target
         )));
      }
      let mut before = self.position;
      before.set(landed, None);
      before.set(origin, Some(pawn));
      self.history.push(HistoryEntry {
         a_move: Move::new(origin, landed),
         piece: pawn,
         captured: None,
         castling: self.initial_castling,
         before,
      });
      self.initial_to_move = mover;
      Ok(())
   }

   pub fn position(&self) -> &Position {
      &self.position
   }

   pub fn history(&self) -> &[HistoryEntry] {
      &self.history
   }

   /// Plies played in the game so far, including those before a FEN setup
   pub fn ply_count(&self) -> usize {
      self.plies_before + self.history.len()
   }

   pub fn last_move(&self) -> Option<&HistoryEntry> {
      self.history.last()
   }

   pub fn to_move(&self) -> Color {
      if self.history.len() % 2 == 0 {
         self.initial_to_move
      } else {
         !self.initial_to_move
      }
   }

   /// Castling rights as recorded by the last move (or the setup, before any move)
   pub fn castling(&self, color: Color) -> CastlingState {
      self.last_move()
         .map(|entry| entry.castling)
         .unwrap_or(self.initial_castling)[color.index()]
   }

   /// Plays `a_move` without checking legality
   pub fn apply(&mut self, a_move: Move) {
      let piece = match self.position.get(a_move.from) {
         Some(p) => p,
         None => return,
      };

      let mut castling = self
         .last_move()
         .map(|entry| entry.castling)
         .unwrap_or(self.initial_castling);
      if piece.kind == Kind::King {
         castling[piece.color.index()].king_moved = true;
      }
      // A rook leaving or being captured on its corner revokes that side
      for color in [Color::White, Color::Black] {
         let home = color.home_rank();
         for touched in [a_move.from, a_move.to] {
            if touched.rank != home {
               continue;
            }
            match touched.file {
               0 => castling[color.index()].queen_rook_moved = true,
               7 => castling[color.index()].king_rook_moved = true,
               _ => (),
            }
         }
      }

      let captured = match self.position.get(a_move.to) {
         Some(p) => Some(p),
         None if piece.kind == Kind::Pawn && a_move.from.file != a_move.to.file => self.position.get(Coord {
            file: a_move.to.file,
            rank: a_move.from.rank,
         }),
         None => None,
      };

      let before = self.position;
      self.position = before.after(a_move);
      self.history.push(HistoryEntry {
         a_move,
         piece,
         captured,
         castling,
         before,
      });
   }

   /// A copy of this board with `a_move` played
   #[must_use]
   pub fn with_move(&self, a_move: Move) -> Board {
      let mut board = self.clone();
      board.apply(a_move);
      board
   }

   /// Takes back the last move, returning it
   pub fn undo(&mut self) -> Option<Move> {
      let entry = self.history.pop()?;
      self.position = entry.before;
      Some(entry.a_move)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn sq(s: &str) -> Coord {
      s.parse().unwrap()
   }

   #[test]
   fn algebraic_to_coord_conversions() {
      assert_eq!(sq("a8"), Coord { file: 0, rank: 7 });
      assert_eq!(sq("e4"), Coord { file: 4, rank: 3 });
      assert_eq!(sq("h1"), Coord { file: 7, rank: 0 });
      assert!("i1".parse::<Coord>().is_err());
      assert!("a9".parse::<Coord>().is_err());
      assert!("a".parse::<Coord>().is_err());
   }

   #[test]
   fn algebraic_to_moves() {
      assert_eq!("e2e4".parse::<Move>(), Ok(Move::new(sq("e2"), sq("e4"))));
      assert_eq!(
         "a7a8q".parse::<Move>(),
         Ok(Move::promoting(sq("a7"), sq("a8"), Kind::Queen))
      );
      assert_eq!(
         "a7a8n".parse::<Move>(),
         Ok(Move::promoting(sq("a7"), sq("a8"), Kind::Knight))
      );
      assert_eq!(
         "a7a8b".parse::<Move>(),
         Ok(Move::promoting(sq("a7"), sq("a8"), Kind::Bishop))
      );
      assert_eq!(
         "a7a8r".parse::<Move>(),
         Ok(Move::promoting(sq("a7"), sq("a8"), Kind::Rook))
      );
   }

   #[test]
   fn malformed_moves_are_errors() {
      for bad in ["", "e2", "e2e", "e2e4qq", "i2e4", "e0e4", "e2e9", "e2e4k", "e2e4p", "e2e4x", "é2e4", "e7e8Q", "e7e8N"] {
         match bad.parse::<Move>() {
            Err(EngineError::InvalidMove(_)) => (),
            other => panic!("{:?} parsed as {:?}", bad, other),
         }
      }
   }

   #[test]
   fn moves_to_algebraic() {
      let letters = ["a", "b", "c", "d", "e", "f", "g", "h"];
      for letter in letters.iter() {
         for i in 1..=8 {
            for letter_2 in letters.iter() {
               for j in 1..=8 {
                  let t_move = format!("{}{}{}{}", letter, i, letter_2, j);
                  assert_eq!(format!("{}", t_move.parse::<Move>().unwrap()), t_move);
               }
            }
         }
      }
      assert_eq!("b7b8r".parse::<Move>().unwrap().to_string(), "b7b8r");
   }

   #[test]
   fn standard_setup() {
      let position = Position::standard();
      assert_eq!(position.get(sq("e1")), Some(Piece::new(Color::White, Kind::King)));
      assert_eq!(position.get(sq("d8")), Some(Piece::new(Color::Black, Kind::Queen)));
      assert_eq!(position.get(sq("g2")), Some(Piece::new(Color::White, Kind::Pawn)));
      assert_eq!(position.get(sq("e4")), None);
      assert_eq!(position.pieces().count(), 32);
      assert_eq!(Board::from_fen(START_FEN).unwrap(), Board::from_start());
   }

   #[test]
   fn setup_rejects_bad_king_counts() {
      let mut position = Position::standard();
      position.set(sq("e8"), None);
      assert_eq!(
         Board::setup(position, Color::White),
         Err(EngineError::InvalidSetup {
            color: Color::Black,
            kings: 0
         })
      );
      position.set(sq("e8"), Some(Piece::new(Color::Black, Kind::King)));
      position.set(sq("e4"), Some(Piece::new(Color::White, Kind::King)));
      assert_eq!(
         Board::setup(position, Color::White),
         Err(EngineError::InvalidSetup {
            color: Color::White,
            kings: 2
         })
      );
      assert!(Board::from_fen("8/8/8/8/8/8/8/4K3 w - -").is_err());
   }

   #[test]
   fn malformed_fen() {
      assert!(matches!(Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq -"), Err(EngineError::InvalidFen(_))));
      assert!(matches!(Board::from_fen("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"), Err(EngineError::InvalidFen(_))));
      assert!(matches!(Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq -"), Err(EngineError::InvalidFen(_))));
      assert!(matches!(Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KKkq -"), Err(EngineError::InvalidFen(_))));
      assert!(matches!(Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e3"), Err(EngineError::InvalidFen(_))));
   }

   #[test]
   fn fen_castling_rights() {
      let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w Kq - 0 1").unwrap();
      assert!(board.castling(Color::White).king_side());
      assert!(!board.castling(Color::White).queen_side());
      assert!(!board.castling(Color::Black).king_side());
      assert!(board.castling(Color::Black).queen_side());
   }

   #[test]
   fn fen_en_passant_becomes_last_move() {
      let board = Board::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1").unwrap();
      let last = board.last_move().unwrap();
      assert_eq!(last.a_move, "e2e4".parse().unwrap());
      assert!(last.is_pawn_double_step());
      assert_eq!(board.to_move(), Color::Black);
      assert_eq!(board.position(), Board::from_moves("e2e4").unwrap().position());
   }

   #[test]
   fn fen_move_number_counts_as_played_plies() {
      let board = Board::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1").unwrap();
      assert_eq!(board.ply_count(), 1);

      let mut board =
         Board::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3").unwrap();
      assert_eq!(board.ply_count(), 4);
      assert!(board.history().is_empty());
      board.apply("f1c4".parse().unwrap());
      assert_eq!(board.ply_count(), 5);

      let board = Board::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 40").unwrap();
      assert_eq!(board.ply_count(), 79);
      assert_eq!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - -").unwrap().ply_count(), 0);
      assert_eq!(Board::from_moves("e2e4 e7e5").unwrap().ply_count(), 2);
      assert!(matches!(
         Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 x"),
         Err(EngineError::InvalidFen(_))
      ));
   }

   #[test]
   fn apply_and_undo() {
      let mut board = Board::from_moves("e2e4 d7d5 e4d5").unwrap();
      assert_eq!(board.to_move(), Color::Black);
      assert_eq!(board.last_move().unwrap().captured, Some(Piece::new(Color::Black, Kind::Pawn)));
      assert_eq!(board.undo(), Some("e4d5".parse().unwrap()));
      assert_eq!(board.undo(), Some("d7d5".parse().unwrap()));
      assert_eq!(board.undo(), Some("e2e4".parse().unwrap()));
      assert_eq!(board.undo(), None);
      assert_eq!(board, Board::from_start());
   }

   #[test]
   fn en_passant_removes_victim() {
      let board = Board::from_moves("e2e4 a7a6 e4e5 d7d5 e5d6").unwrap();
      assert_eq!(board.position().get(sq("d5")), None);
      assert_eq!(board.position().get(sq("d6")), Some(Piece::new(Color::White, Kind::Pawn)));
      assert_eq!(board.last_move().unwrap().captured, Some(Piece::new(Color::Black, Kind::Pawn)));
   }

   #[test]
   fn castling_moves_rook_and_revokes_rights() {
      let board = Board::from_moves("e2e4 e7e5 g1f3 b8c6 f1c4 g8f6 e1g1").unwrap();
      assert_eq!(board.position().get(sq("g1")), Some(Piece::new(Color::White, Kind::King)));
      assert_eq!(board.position().get(sq("f1")), Some(Piece::new(Color::White, Kind::Rook)));
      assert_eq!(board.position().get(sq("h1")), None);
      assert!(!board.castling(Color::White).king_side());
      assert!(!board.castling(Color::White).queen_side());
      assert!(board.castling(Color::Black).king_side());

      let board = Board::from_moves("a2a4 e7e5 a1a3").unwrap();
      assert!(board.castling(Color::White).king_side());
      assert!(!board.castling(Color::White).queen_side());
   }

   #[test]
   fn promotion_defaults_to_queen() {
      let mut board = Board::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
      board.apply("a7a8".parse().unwrap());
      assert_eq!(board.position().get(sq("a8")), Some(Piece::new(Color::White, Kind::Queen)));
      board.undo();
      board.apply("a7a8n".parse().unwrap());
      assert_eq!(board.position().get(sq("a8")), Some(Piece::new(Color::White, Kind::Knight)));
   }
}
