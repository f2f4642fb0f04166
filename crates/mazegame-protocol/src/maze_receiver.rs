//! Client-side reassembly of a multi-line maze transfer.
//!
//! A maze arrives as a `MAZE;w;h` header followed by `h` row lines. Rows
//! carry no verb, so the receiver must know whether it is inside a transfer
//! to interpret them. The states are:
//!
//! ```text
//! NoMaze ──MAZE;w;h──► ReceivingMaze ──h rows──► ReceivedMaze
//! ```
//!
//! Anything out of order is a protocol violation: a row while not receiving,
//! a second header, or a regular command before all rows arrived.

use crate::server_message::ServerMessage;
use crate::ProtocolError;

/// The phase of a maze transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    NoMaze,
    ReceivingMaze,
    ReceivedMaze,
}

/// A completely received maze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MazeData {
    pub width: usize,
    pub height: usize,
    pub rows: Vec<String>,
}

/// What the receiver produced for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// The last row arrived; here is the whole maze.
    Maze(MazeData),
    /// Any line that is not part of a maze transfer.
    Message(ServerMessage),
}

/// Turns a stream of decoded server lines into messages and whole mazes.
#[derive(Debug)]
pub struct MazeReceiver {
    state: ReceiverState,
    width: usize,
    height: usize,
    rows: Vec<String>,
}

impl Default for MazeReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl MazeReceiver {
    pub fn new() -> Self {
        Self {
            state: ReceiverState::NoMaze,
            width: 0,
            height: 0,
            rows: Vec::new(),
        }
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Feeds one decoded line.
    ///
    /// Returns `Ok(None)` while rows are being buffered.
    ///
    /// # Errors
    /// Returns `ProtocolError::MazeTransfer` when the line is out of order.
    pub fn accept(&mut self, message: ServerMessage) -> Result<Option<Received>, ProtocolError> {
        match message {
            ServerMessage::MazeHeader { width, height } => {
                if self.state != ReceiverState::NoMaze {
                    return Err(ProtocolError::MazeTransfer(format!(
                        "received MAZE header while in state {:?}",
                        self.state
                    )));
                }
                self.width = width;
                self.height = height;
                self.state = ReceiverState::ReceivingMaze;
                if height == 0 {
                    return Ok(Some(self.finish()));
                }
                Ok(None)
            }
            ServerMessage::MazeRow(row) => {
                if self.state != ReceiverState::ReceivingMaze {
                    return Err(ProtocolError::MazeTransfer(format!(
                        "received maze row while in state {:?}",
                        self.state
                    )));
                }
                self.rows.push(row.trim().to_string());
                if self.rows.len() == self.height {
                    return Ok(Some(self.finish()));
                }
                Ok(None)
            }
            ServerMessage::Empty => Ok(None),
            other => {
                if self.state == ReceiverState::ReceivingMaze {
                    return Err(ProtocolError::MazeTransfer(format!(
                        "maze incomplete: {} of {} rows before next command",
                        self.rows.len(),
                        self.height
                    )));
                }
                Ok(Some(Received::Message(other)))
            }
        }
    }

    fn finish(&mut self) -> Received {
        self.state = ReceiverState::ReceivedMaze;
        Received::Maze(MazeData {
            width: self.width,
            height: self.height,
            rows: std::mem::take(&mut self.rows),
        })
    }
}
