use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    // Message de forme inattendue : fatal pour ce message seulement
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Message '{0}' is not a playback overview")]
    UnexpectedMessage(String),
    #[error("Unknown playback state '{0}'")]
    UnknownPlaybackState(String),
    #[error("Unknown repeat mode '{0}'")]
    UnknownRepeatMode(String),
    #[error("Invalid track object: {0}")]
    InvalidTrack(String),
    #[error("Transport is not connected")]
    NotConnected,
    #[error("No response received for request '{0}'")]
    NoResponse(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Playback actor is no longer running")]
    ActorStopped,
}

impl RemoteError {
    pub fn protocol(message: &str) -> Self {
        RemoteError::Protocol(message.to_string())
    }

    pub fn missing_option(key: &str) -> Self {
        RemoteError::Protocol(format!("missing option '{key}'"))
    }

    pub fn transport(message: &str) -> Self {
        RemoteError::Transport(message.to_string())
    }

    /// True for errors that only mean "the work was abandoned".
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RemoteError::Cancelled | RemoteError::ActorStopped)
    }
}

pub type Result<T> = std::result::Result<T, RemoteError>;
