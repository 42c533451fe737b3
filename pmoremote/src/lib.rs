//! # PMORemote
//!
//! Client-side core of a music server remote control:
//!
//! - [`playback`]: keeps a coherent snapshot of the server's playback state
//!   from overview pushes and replies, with a local position estimate
//!   between periodic time syncs.
//! - [`window`]: lazily paged, bounded views over arbitrarily large remote
//!   track lists, parameterized by a [`QuerySource`].
//! - [`output`]: process-wide volume, mute and ducking for local players.
//!
//! The socket is not part of this crate: components talk to the server
//! through the [`Transport`] trait. [`LoopbackTransport`] is an in-process
//! implementation driven by a responder closure.
//!
//! ```
//! use pmoremote::{ConnectionState, LoopbackTransport, SocketMessage, Transport};
//!
//! # tokio_test::block_on(async {
//! let transport = LoopbackTransport::new();
//! transport.set_state(ConnectionState::Connected);
//! transport.set_responder(|request| Some(request.response_to().with_option("count", 3)));
//!
//! let reply = transport
//!     .request(SocketMessage::request("query_tracks"))
//!     .await
//!     .unwrap();
//! assert_eq!(reply.usize_option("count"), Some(3));
//! # });
//! ```

mod config_ext;
mod observers;

pub mod debounce;
pub mod errors;
pub mod model;
pub mod output;
pub mod playback;
pub mod position;
pub mod protocol;
pub mod transport;
pub mod window;

pub use config_ext::RemoteConfigExt;
pub use debounce::Debouncer;
pub use errors::{RemoteError, Result};
pub use model::{PlaybackSnapshot, PlaybackState, RepeatMode, Track, TrackMetadata};
pub use observers::ObserverToken;
pub use output::{AudioOutputCoordinator, SinkId, VolumeSink};
pub use playback::{PlaybackHandle, PlaybackService, PlaybackSettings, PlaybackSubscription};
pub use position::EstimatedPosition;
pub use protocol::{MessageType, SocketMessage};
pub use transport::{ConnectionState, LoopbackTransport, Transport, TransportEvent};
pub use window::{
    AllTracksQuery, CategoryTracksQuery, OfflineTracksQuery, Page, PlayQueueTracksQuery,
    PlaylistTracksQuery, QuerySource, TrackWindow, WindowEvent, WindowSettings,
};
