//! Directory-backed audio object store

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{AudioObject, AudioStore},
};
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Content type served when the key's extension is unknown.
pub const DEFAULT_AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Audio store rooted at a local directory.
///
/// Object keys map to relative paths under the root. The content type is
/// derived from the key's extension on read, so `put_object` only stores the
/// bytes.
#[derive(Debug, Clone)]
pub struct FsAudioStore {
    root: PathBuf,
}

impl FsAudioStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `key` under the root, refusing anything that would escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && !key.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !is_plain {
            return Err(BridgeError::OperationFailed(format!(
                "Invalid object key: {}",
                key
            )));
        }

        Ok(self.root.join(relative))
    }
}

/// MIME type for an audio object key, by extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    let extension = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("opus") => "audio/opus",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("webm") => "audio/webm",
        _ => DEFAULT_AUDIO_CONTENT_TYPE,
    }
}

#[async_trait]
impl AudioStore for FsAudioStore {
    async fn get_object(&self, key: &str) -> Result<Option<AudioObject>> {
        let path = self.resolve(key)?;

        match fs::read(&path).await {
            Ok(bytes) => {
                debug!(key, size = bytes.len(), "Read audio object");
                Ok(Some(AudioObject::new(
                    Bytes::from(bytes),
                    content_type_for_key(key),
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key, "Audio object not found");
                Ok(None)
            }
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn put_object(&self, key: &str, object: AudioObject) -> Result<()> {
        let path = self.resolve(key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &object.body).await?;

        debug!(key, size = object.size, "Stored audio object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAudioStore::new(dir.path());

        let object = AudioObject::new(Bytes::from_static(b"OggS\0\0"), "audio/ogg");
        store.put_object("shows/ep-1.ogg", object).await.unwrap();

        let fetched = store.get_object("shows/ep-1.ogg").await.unwrap().unwrap();
        assert_eq!(fetched.body, Bytes::from_static(b"OggS\0\0"));
        assert_eq!(fetched.content_type, "audio/ogg");
        assert_eq!(fetched.size, 6);
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAudioStore::new(dir.path());
        assert!(store.get_object("nope.mp3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAudioStore::new(dir.path().join("audio"));

        for key in ["../secret.mp3", "/etc/passwd", "a/../../b.mp3", "", "a\\b.mp3"] {
            assert!(store.get_object(key).await.is_err(), "key {key:?} accepted");
        }
    }

    #[test]
    fn test_content_type_defaults_to_mpeg() {
        assert_eq!(content_type_for_key("ep.MP3"), "audio/mpeg");
        assert_eq!(content_type_for_key("ep.m4a"), "audio/mp4");
        assert_eq!(content_type_for_key("ep"), DEFAULT_AUDIO_CONTENT_TYPE);
        assert_eq!(content_type_for_key("ep.bin"), DEFAULT_AUDIO_CONTENT_TYPE);
    }
}
