//! # Player Service
//!
//! Runs a [`PlaybackSession`] on its own task and hands out a cloneable
//! [`PlayerHandle`].
//!
//! The task is the only owner of the session. It waits on three sources at
//! once and processes whichever fires first, one at a time:
//! - commands from handles, each answered over a oneshot reply
//! - media element events (stale generations are dropped by the session)
//! - the checkpoint tick, which samples progress while playing
//!
//! After every step the current [`PlaybackSnapshot`] is published through a
//! `watch` channel, waking observers only when something changed.

use bridge_traits::media::MediaEventReceiver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::keyboard::{KeyCommand, KeyPress};
use crate::session::PlaybackSession;
use crate::types::{Episode, EpisodeId, PlaybackSnapshot};

const COMMAND_BUFFER: usize = 32;

/// Commands accepted by the player task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum PlayerCommand {
    PlayEpisode(Episode),
    TogglePlayPause,
    SeekTo(f64),
    SkipForward(f64),
    SkipBackward(f64),
    SetVolume(f64),
    ToggleMute,
    SetPlaybackRate(f64),
    ToggleLoop,
    ToggleShuffle,
    AddToQueue(Episode),
    RemoveFromQueue(EpisodeId),
    ClearQueue,
    PlayNext,
    PlayPrevious,
    Key(KeyCommand),
}

struct Request {
    command: PlayerCommand,
    reply: oneshot::Sender<Result<()>>,
}

pub struct PlayerService;

impl PlayerService {
    /// Spawn the player task. Must be called from within a Tokio runtime.
    ///
    /// Stored preferences are applied before the first command is handled.
    /// The task ends when every handle has been dropped.
    pub fn spawn(session: PlaybackSession, media_events: MediaEventReceiver) -> PlayerHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots_tx, snapshots_rx) = watch::channel(session.snapshot());
        let config = Arc::new(session.config().clone());

        let task = tokio::spawn(run(session, commands_rx, media_events, snapshots_tx));

        PlayerHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
            config,
            task: Arc::new(task),
        }
    }
}

async fn run(
    mut session: PlaybackSession,
    mut commands: mpsc::Receiver<Request>,
    mut media_events: MediaEventReceiver,
    snapshots: watch::Sender<PlaybackSnapshot>,
) {
    if let Err(e) = session.restore_preferences().await {
        warn!(error = %e, "Failed to restore player preferences");
    }
    publish_snapshot(&snapshots, &session);

    let mut tick = interval(session.config().checkpoint_tick);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Player service started");
    loop {
        tokio::select! {
            request = commands.recv() => {
                let Some(Request { command, reply }) = request else {
                    break;
                };
                debug!(?command, "Player command");
                let result = apply(&mut session, command).await;
                match &result {
                    Err(e) if e.is_invalid_input() => debug!(error = %e, "Command rejected"),
                    Err(e) => warn!(error = %e, "Command failed"),
                    Ok(()) => {}
                }
                publish_snapshot(&snapshots, &session);
                if reply.send(result).is_err() {
                    debug!("Command caller went away before the reply");
                }
            }
            Some(envelope) = media_events.recv() => {
                if let Err(e) = session.handle_media_event(envelope).await {
                    warn!(error = %e, "Failed to apply media event");
                }
            }
            _ = tick.tick() => {
                session.checkpoint().await;
            }
        }

        publish_snapshot(&snapshots, &session);
    }
    info!("Player service stopped");
}

fn publish_snapshot(snapshots: &watch::Sender<PlaybackSnapshot>, session: &PlaybackSession) {
    let next = session.snapshot();
    snapshots.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

async fn apply(session: &mut PlaybackSession, command: PlayerCommand) -> Result<()> {
    match command {
        PlayerCommand::PlayEpisode(episode) => session.play_episode(episode).await,
        PlayerCommand::TogglePlayPause => session.toggle_play_pause().await,
        PlayerCommand::SeekTo(secs) => session.seek_to(secs).await,
        PlayerCommand::SkipForward(secs) => session.skip_forward(secs).await,
        PlayerCommand::SkipBackward(secs) => session.skip_backward(secs).await,
        PlayerCommand::SetVolume(volume) => session.set_volume(volume).await,
        PlayerCommand::ToggleMute => session.toggle_mute().await,
        PlayerCommand::SetPlaybackRate(rate) => session.set_playback_rate(rate).await,
        PlayerCommand::ToggleLoop => {
            session.toggle_loop();
            Ok(())
        }
        PlayerCommand::ToggleShuffle => {
            session.toggle_shuffle();
            Ok(())
        }
        PlayerCommand::AddToQueue(episode) => {
            session.add_to_queue(episode);
            Ok(())
        }
        PlayerCommand::RemoveFromQueue(id) => {
            session.remove_from_queue(&id);
            Ok(())
        }
        PlayerCommand::ClearQueue => {
            session.clear_queue();
            Ok(())
        }
        PlayerCommand::PlayNext => session.play_next().await,
        PlayerCommand::PlayPrevious => session.play_previous().await,
        PlayerCommand::Key(key) => session.handle_key(key).await,
    }
}

/// Cloneable handle to a running player task.
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<Request>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
    config: Arc<PlayerConfig>,
    task: Arc<JoinHandle<()>>,
}

impl PlayerHandle {
    /// Send a command and wait for the session to apply it.
    pub async fn send(&self, command: PlayerCommand) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Request { command, reply })
            .await
            .map_err(|_| PlaybackError::ServiceStopped)?;
        response.await.map_err(|_| PlaybackError::ServiceStopped)?
    }

    pub async fn play_episode(&self, episode: Episode) -> Result<()> {
        self.send(PlayerCommand::PlayEpisode(episode)).await
    }

    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.send(PlayerCommand::TogglePlayPause).await
    }

    pub async fn seek_to(&self, secs: f64) -> Result<()> {
        self.send(PlayerCommand::SeekTo(secs)).await
    }

    pub async fn skip_forward(&self) -> Result<()> {
        self.send(PlayerCommand::SkipForward(self.config.skip_secs))
            .await
    }

    pub async fn skip_backward(&self) -> Result<()> {
        self.send(PlayerCommand::SkipBackward(self.config.skip_secs))
            .await
    }

    pub async fn set_volume(&self, volume: f64) -> Result<()> {
        self.send(PlayerCommand::SetVolume(volume)).await
    }

    pub async fn set_playback_rate(&self, rate: f64) -> Result<()> {
        self.send(PlayerCommand::SetPlaybackRate(rate)).await
    }

    pub async fn add_to_queue(&self, episode: Episode) -> Result<()> {
        self.send(PlayerCommand::AddToQueue(episode)).await
    }

    pub async fn remove_from_queue(&self, id: EpisodeId) -> Result<()> {
        self.send(PlayerCommand::RemoveFromQueue(id)).await
    }

    pub async fn play_next(&self) -> Result<()> {
        self.send(PlayerCommand::PlayNext).await
    }

    pub async fn play_previous(&self) -> Result<()> {
        self.send(PlayerCommand::PlayPrevious).await
    }

    /// Translate and run a key press. Returns whether the press was a
    /// shortcut (the host should then suppress its default action).
    pub async fn handle_key_press(&self, press: &KeyPress) -> Result<bool> {
        match KeyCommand::from_key_press(press, &self.config) {
            Some(command) => {
                self.send(PlayerCommand::Key(command)).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that wakes whenever the snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}
