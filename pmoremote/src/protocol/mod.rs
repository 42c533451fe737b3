//! Wire-level vocabulary shared with the music server.

mod message;
pub mod names;

pub use message::{MessageType, SocketMessage};
