use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog identifier of an episode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeId(String);

impl EpisodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EpisodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EpisodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A playable episode as handed to the player by the catalog.
///
/// The session keeps its own clone; later catalog edits do not reach a
/// loaded episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub title: String,
    pub audio_url: String,
    /// Declared duration, used until (or when) the media element cannot
    /// report one.
    #[serde(default)]
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub podcast_title: Option<String>,
    #[serde(default)]
    pub cover_art: Option<String>,
}

impl Episode {
    pub fn new(
        id: impl Into<EpisodeId>,
        title: impl Into<String>,
        audio_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            audio_url: audio_url.into(),
            duration_secs: None,
            podcast_title: None,
            cover_art: None,
        }
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }

    pub fn with_podcast_title(mut self, title: impl Into<String>) -> Self {
        self.podcast_title = Some(title.into());
        self
    }
}

/// Transport state of the session.
///
/// Loading is not a state of its own: a session that is fetching a new
/// resource reports `Stopped` with [`PlaybackSnapshot::is_loading`] set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }
}

/// Read-only view of the session for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub episode: Option<Episode>,
    pub transport: TransportState,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub volume: f64,
    pub playback_rate: f64,
    pub looping: bool,
    pub shuffling: bool,
    pub queue: Vec<Episode>,
    pub is_loading: bool,
}

impl PlaybackSnapshot {
    pub fn episode_id(&self) -> Option<&EpisodeId> {
        self.episode.as_ref().map(|e| &e.id)
    }

    /// Fraction of the episode played, 0 when the duration is unknown.
    pub fn progress_ratio(&self) -> f64 {
        if self.duration_secs > 0.0 {
            (self.position_secs / self.duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_deserializes_with_optional_fields_missing() {
        let episode: Episode = serde_json::from_str(
            r#"{"id": "ep-1", "title": "Pilot", "audio_url": "/api/audio/ep-1.mp3"}"#,
        )
        .unwrap();
        assert_eq!(episode.id, EpisodeId::from("ep-1"));
        assert!(episode.duration_secs.is_none());
    }

    #[test]
    fn test_transport_state_serializes_snake_case() {
        let json = serde_json::to_string(&TransportState::Playing).unwrap();
        assert_eq!(json, r#""playing""#);
    }

    #[test]
    fn test_progress_ratio_handles_unknown_duration() {
        let mut snapshot = PlaybackSnapshot {
            episode: None,
            transport: TransportState::Stopped,
            position_secs: 30.0,
            duration_secs: 0.0,
            volume: 0.8,
            playback_rate: 1.0,
            looping: false,
            shuffling: false,
            queue: Vec::new(),
            is_loading: false,
        };
        assert_eq!(snapshot.progress_ratio(), 0.0);

        snapshot.duration_secs = 120.0;
        assert_eq!(snapshot.progress_ratio(), 0.25);
    }
}
