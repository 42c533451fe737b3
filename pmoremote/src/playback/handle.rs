use tokio::sync::{mpsc, oneshot};

use crate::errors::{RemoteError, Result};
use crate::model::PlaybackSnapshot;
use crate::observers::ObserverToken;

use super::SEEK_STEP_SECONDS;
use super::service::{Control, PlaybackCommand};

/// Registration returned by [`PlaybackHandle::connect`]. Every change of the
/// snapshot is delivered on `updates`.
#[derive(Debug)]
pub struct PlaybackSubscription {
    pub token: ObserverToken,
    pub updates: mpsc::UnboundedReceiver<PlaybackSnapshot>,
}

/// Cloneable front end of the playback task.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    tx: mpsc::Sender<PlaybackCommand>,
}

impl PlaybackHandle {
    pub(super) fn new(tx: mpsc::Sender<PlaybackCommand>) -> Self {
        Self { tx }
    }

    async fn call<R>(&self, command: impl FnOnce(oneshot::Sender<R>) -> PlaybackCommand) -> Result<R> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| RemoteError::ActorStopped)?;
        rx.await.map_err(|_| RemoteError::ActorStopped)
    }

    async fn control(&self, action: Control) -> Result<()> {
        self.call(|reply| PlaybackCommand::Control { action, reply })
            .await?
    }

    /// Registers an observer. The first one attaches the service to the
    /// transport.
    pub async fn connect(&self) -> Result<PlaybackSubscription> {
        self.call(|reply| PlaybackCommand::Connect { reply }).await
    }

    /// Unregisters an observer. Removing the last one detaches the service
    /// from the transport and stops the time sync.
    pub async fn disconnect(&self, token: ObserverToken) -> Result<bool> {
        self.call(|reply| PlaybackCommand::Disconnect { token, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<PlaybackSnapshot> {
        self.call(|reply| PlaybackCommand::Snapshot { reply }).await
    }

    /// Estimated position of the current track, in seconds.
    pub async fn current_time(&self) -> Result<f64> {
        self.call(|reply| PlaybackCommand::CurrentTime { reply }).await
    }

    pub async fn pause_or_resume(&self) -> Result<()> {
        self.control(Control::PauseOrResume).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.control(Control::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.control(Control::Resume).await
    }

    pub async fn next(&self) -> Result<()> {
        self.control(Control::Next).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.control(Control::Previous).await
    }

    pub async fn play_at(&self, index: usize) -> Result<()> {
        self.control(Control::PlayAt { index }).await
    }

    pub async fn play_all(&self, index: usize, filter: &str) -> Result<()> {
        self.control(Control::PlayAll {
            index,
            filter: filter.to_string(),
        })
        .await
    }

    pub async fn play_category(&self, category: &str, id: i64, index: usize, filter: &str) -> Result<()> {
        self.control(Control::PlayCategory {
            category: category.to_string(),
            id,
            index,
            filter: filter.to_string(),
        })
        .await
    }

    /// Seeks and re-anchors the local estimate at `seconds`.
    pub async fn seek_to(&self, seconds: f64) -> Result<()> {
        self.control(Control::SeekTo { seconds }).await
    }

    pub async fn seek_relative(&self, delta: f64) -> Result<()> {
        self.control(Control::SeekRelative { delta }).await
    }

    pub async fn seek_forward(&self) -> Result<()> {
        self.seek_relative(SEEK_STEP_SECONDS).await
    }

    pub async fn seek_backward(&self) -> Result<()> {
        self.seek_relative(-SEEK_STEP_SECONDS).await
    }

    pub async fn volume_up(&self) -> Result<()> {
        self.control(Control::VolumeUp).await
    }

    pub async fn volume_down(&self) -> Result<()> {
        self.control(Control::VolumeDown).await
    }

    pub async fn toggle_shuffle(&self) -> Result<()> {
        self.control(Control::ToggleShuffle).await
    }

    pub async fn toggle_mute(&self) -> Result<()> {
        self.control(Control::ToggleMute).await
    }

    pub async fn toggle_repeat(&self) -> Result<()> {
        self.control(Control::ToggleRepeat).await
    }

    /// Stops the task. Later calls fail with [`RemoteError::ActorStopped`].
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(PlaybackCommand::Shutdown)
            .await
            .map_err(|_| RemoteError::ActorStopped)
    }
}
