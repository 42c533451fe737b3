//! Background task reconciling server pushes and pulls into one snapshot.

use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Sleep, sleep};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::model::{PlaybackSnapshot, PlaybackState};
use crate::observers::{ObserverSet, ObserverToken};
use crate::position::EstimatedPosition;
use crate::protocol::SocketMessage;
use crate::protocol::names::{key, request, value};
use crate::transport::{ConnectionState, Transport, TransportEvent};

use super::PlaybackSettings;
use super::handle::{PlaybackHandle, PlaybackSubscription};

#[derive(Debug)]
pub(super) enum Control {
    PauseOrResume,
    Pause,
    Resume,
    Next,
    Previous,
    PlayAt {
        index: usize,
    },
    PlayAll {
        index: usize,
        filter: String,
    },
    PlayCategory {
        category: String,
        id: i64,
        index: usize,
        filter: String,
    },
    SeekTo {
        seconds: f64,
    },
    SeekRelative {
        delta: f64,
    },
    VolumeUp,
    VolumeDown,
    ToggleShuffle,
    ToggleMute,
    ToggleRepeat,
}

#[derive(Debug)]
pub(super) enum PlaybackCommand {
    Connect {
        reply: oneshot::Sender<PlaybackSubscription>,
    },
    Disconnect {
        token: ObserverToken,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<PlaybackSnapshot>,
    },
    CurrentTime {
        reply: oneshot::Sender<f64>,
    },
    Control {
        action: Control,
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown,
}

/// Handle to the spawned playback task.
#[derive(Debug)]
pub struct PlaybackService {
    join_handle: JoinHandle<()>,
}

impl PlaybackService {
    pub fn spawn(transport: Arc<dyn Transport>, settings: PlaybackSettings) -> (Self, PlaybackHandle) {
        let (tx, mut rx) = mpsc::channel(settings.command_buffer.max(1));

        let join_handle = tokio::spawn(async move {
            info!("Starting playback service");
            let mut state = ServiceState::new(transport, settings);

            loop {
                let step = tokio::select! {
                    cmd = rx.recv() => Step::Command(cmd),
                    event = next_event(&mut state.events) => Step::Transport(event),
                    _ = sync_due(&mut state.sync_timer) => Step::SyncDue,
                };

                match step {
                    Step::Command(Some(cmd)) => {
                        state.handle_command(cmd);
                        if state.shutdown {
                            break;
                        }
                    }
                    // every handle dropped
                    Step::Command(None) => break,
                    Step::Transport(Ok(event)) => state.handle_event(event),
                    Step::Transport(Err(RecvError::Lagged(skipped))) => {
                        warn!(skipped, "Playback service lagged behind transport events");
                    }
                    Step::Transport(Err(RecvError::Closed)) => {
                        warn!("Transport event stream closed");
                        state.events = None;
                    }
                    Step::SyncDue => {
                        state.sync_timer = None;
                        state.sync_time();
                    }
                }
            }

            info!("Playback service stopped");
        });

        (Self { join_handle }, PlaybackHandle::new(tx))
    }

    /// Waits for the task to finish after `shutdown`.
    pub async fn wait(self) {
        if let Err(err) = self.join_handle.await {
            if err.is_cancelled() {
                warn!("Playback service task cancelled: {err}");
            } else {
                warn!("Playback service join error: {err}");
            }
        }
    }
}

enum Step {
    Command(Option<PlaybackCommand>),
    Transport(std::result::Result<TransportEvent, RecvError>),
    SyncDue,
}

async fn next_event(
    events: &mut Option<broadcast::Receiver<TransportEvent>>,
) -> std::result::Result<TransportEvent, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sync_due(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(deadline) => deadline.as_mut().await,
        None => std::future::pending().await,
    }
}

struct ServiceState {
    transport: Arc<dyn Transport>,
    settings: PlaybackSettings,
    snapshot: PlaybackSnapshot,
    position: EstimatedPosition,
    observers: ObserverSet<PlaybackSnapshot>,
    events: Option<broadcast::Receiver<TransportEvent>>,
    sync_timer: Option<Pin<Box<Sleep>>>,
    shutdown: bool,
}

impl ServiceState {
    fn new(transport: Arc<dyn Transport>, settings: PlaybackSettings) -> Self {
        Self {
            transport,
            settings,
            snapshot: PlaybackSnapshot::disconnected(),
            position: EstimatedPosition::new(),
            observers: ObserverSet::new(),
            events: None,
            sync_timer: None,
            shutdown: false,
        }
    }

    fn handle_command(&mut self, cmd: PlaybackCommand) {
        match cmd {
            PlaybackCommand::Connect { reply } => {
                let subscription = self.connect();
                let _ = reply.send(subscription);
            }
            PlaybackCommand::Disconnect { token, reply } => {
                let removed = self.disconnect(token);
                let _ = reply.send(removed);
            }
            PlaybackCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot.clone());
            }
            PlaybackCommand::CurrentTime { reply } => {
                let _ = reply.send(self.current_time());
            }
            PlaybackCommand::Control { action, reply } => {
                let result = self.control(action);
                if let Err(err) = &result {
                    debug!("Playback command not sent: {err}");
                }
                let _ = reply.send(result);
            }
            PlaybackCommand::Shutdown => {
                self.observers.clear();
                self.events = None;
                self.cancel_time_sync();
                self.shutdown = true;
            }
        }
    }

    fn connect(&mut self) -> PlaybackSubscription {
        let (token, updates) = self.observers.subscribe();

        if self.observers.len() == 1 {
            debug!("First playback observer; attaching to transport");
            self.events = Some(self.transport.subscribe());
            if self.transport.is_connected() {
                self.request_overview();
            }
            if self.snapshot.state == PlaybackState::Playing {
                self.schedule_time_sync();
            }
        }

        PlaybackSubscription { token, updates }
    }

    fn disconnect(&mut self, token: ObserverToken) -> bool {
        let removed = self.observers.unsubscribe(token);
        if removed && self.observers.is_empty() {
            debug!("Last playback observer gone; detaching from transport");
            self.events = None;
            self.cancel_time_sync();
        }
        removed
    }

    fn current_time(&self) -> f64 {
        self.position.estimate(self.snapshot.track_id())
    }

    fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::StateChanged { new, old } => {
                debug!(?old, ?new, "Transport state changed");
                match new {
                    ConnectionState::Connected => self.request_overview(),
                    ConnectionState::Disconnected => self.reset(),
                    ConnectionState::Connecting => {}
                }
            }
            TransportEvent::Message(message) => {
                if PlaybackSnapshot::is_overview(&message) {
                    self.apply_overview(&message);
                } else if message.is(request::GET_CURRENT_TIME) && !message.is_broadcast() {
                    self.apply_time_sync(&message);
                }
            }
        }
    }

    fn apply_overview(&mut self, message: &SocketMessage) {
        let snapshot = match PlaybackSnapshot::from_overview(message) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(name = %message.name, "Ignoring playback overview: {err}");
                return;
            }
        };

        if let Some(seconds) = snapshot.raw_current_time {
            self.position.update(seconds, snapshot.track_id());
        }

        match snapshot.state {
            PlaybackState::Paused => {
                self.position.pause();
                self.cancel_time_sync();
            }
            PlaybackState::Playing => {
                self.position.resume();
                self.schedule_time_sync();
            }
            PlaybackState::Stopped | PlaybackState::Buffering => self.cancel_time_sync(),
        }

        debug!(
            state = %snapshot.state,
            queue_position = snapshot.queue_position,
            queue_count = snapshot.queue_count,
            "Playback overview applied"
        );
        self.snapshot = snapshot;
        self.notify();
    }

    fn apply_time_sync(&mut self, message: &SocketMessage) {
        self.position.update_from_sync(message);
        if self.snapshot.state == PlaybackState::Playing {
            self.schedule_time_sync();
        }
    }

    fn reset(&mut self) {
        info!("Transport disconnected; resetting playback state");
        self.snapshot = PlaybackSnapshot::disconnected();
        self.position.reset();
        self.cancel_time_sync();
        self.notify();
    }

    fn notify(&mut self) {
        self.observers.broadcast(self.snapshot.clone());
    }

    fn request_overview(&self) {
        if let Err(err) = self
            .transport
            .send(SocketMessage::request(request::GET_PLAYBACK_OVERVIEW))
        {
            warn!("Could not request playback overview: {err}");
        }
    }

    fn sync_time(&mut self) {
        if !self.transport.is_connected() {
            return;
        }
        if let Err(err) = self
            .transport
            .send(SocketMessage::request(request::GET_CURRENT_TIME))
        {
            warn!("Could not request current time: {err}");
        }
    }

    fn schedule_time_sync(&mut self) {
        self.sync_timer = Some(Box::pin(sleep(self.settings.time_sync_interval)));
    }

    fn cancel_time_sync(&mut self) {
        self.sync_timer = None;
    }

    fn control(&mut self, action: Control) -> Result<()> {
        let message = match action {
            Control::PauseOrResume => SocketMessage::request(request::PAUSE_OR_RESUME),
            Control::Pause => {
                if self.snapshot.state == PlaybackState::Paused {
                    return Ok(());
                }
                SocketMessage::request(request::PAUSE_OR_RESUME)
            }
            Control::Resume => {
                if self.snapshot.state == PlaybackState::Playing {
                    return Ok(());
                }
                SocketMessage::request(request::PAUSE_OR_RESUME)
            }
            Control::Next => SocketMessage::request(request::NEXT),
            Control::Previous => SocketMessage::request(request::PREVIOUS),
            Control::PlayAt { index } => {
                SocketMessage::request(request::PLAY_AT_INDEX).with_option(key::INDEX, index)
            }
            Control::PlayAll { index, filter } => SocketMessage::request(request::PLAY_ALL_TRACKS)
                .with_option(key::INDEX, index)
                .with_option(key::FILTER, filter),
            Control::PlayCategory {
                category,
                id,
                index,
                filter,
            } => SocketMessage::request(request::PLAY_TRACKS_BY_CATEGORY)
                .with_option(key::CATEGORY, category)
                .with_option(key::ID, id)
                .with_option(key::INDEX, index)
                .with_option(key::FILTER, filter),
            Control::SeekTo { seconds } => {
                self.transport
                    .send(SocketMessage::request(request::SEEK_TO).with_option(key::POSITION, seconds))?;
                self.position.update(seconds, self.snapshot.track_id());
                return Ok(());
            }
            Control::SeekRelative { delta } => {
                SocketMessage::request(request::SEEK_RELATIVE).with_option(key::DELTA, delta)
            }
            Control::VolumeUp => {
                SocketMessage::request(request::SET_VOLUME).with_option(key::RELATIVE, value::UP)
            }
            Control::VolumeDown => {
                SocketMessage::request(request::SET_VOLUME).with_option(key::RELATIVE, value::DOWN)
            }
            Control::ToggleShuffle => SocketMessage::request(request::TOGGLE_SHUFFLE),
            Control::ToggleMute => SocketMessage::request(request::TOGGLE_MUTE),
            Control::ToggleRepeat => SocketMessage::request(request::TOGGLE_REPEAT),
        };

        self.transport.send(message)
    }
}
