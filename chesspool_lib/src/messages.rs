use crate::board::Move;
use log::trace;
use parking_lot::Mutex;
use std::sync::mpsc;

// Intraprocess Communication Messages

// Interface to Engine
pub(crate) enum InterfaceMessage {
   Search, // Wake up and look at the search state now rather than at the next poll
   Shutdown,
}

// Engine to Interface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineMessage {
   Decided(Move), // The engine picked and played this move
   Played(Move),  // A move from outside the engine was played
   NoMove { in_check: bool }, // A search found no legal move; checkmate if in check, stalemate otherwise
}

/// Whoever sits on the other side of the board. Called on engine threads, possibly with the
/// board lock held; calling back into the coordinator from here is allowed.
pub trait Player: Send + Sync {
   fn move_decided(&self, a_move: Move);

   fn move_played(&self, a_move: Move);

   fn no_move(&self, _in_check: bool) {}
}

/// Forwards every notification over a channel
pub struct ChannelPlayer {
   sender: Mutex<mpsc::Sender<EngineMessage>>,
}

impl ChannelPlayer {
   pub fn new() -> (ChannelPlayer, mpsc::Receiver<EngineMessage>) {
      let (sender, receiver) = mpsc::channel();
      (
         ChannelPlayer {
            sender: Mutex::new(sender),
         },
         receiver,
      )
   }

   fn send(&self, message: EngineMessage) {
      if self.sender.lock().send(message).is_err() {
         trace!("dropping {:?}, nobody is listening", message);
      }
   }
}

impl Player for ChannelPlayer {
   fn move_decided(&self, a_move: Move) {
      self.send(EngineMessage::Decided(a_move));
   }

   fn move_played(&self, a_move: Move) {
      self.send(EngineMessage::Played(a_move));
   }

   fn no_move(&self, in_check: bool) {
      self.send(EngineMessage::NoMove { in_check });
   }
}
