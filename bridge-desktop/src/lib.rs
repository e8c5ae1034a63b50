//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for desktop and server hosts
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `SettingsStore` as a JSON document in the user's config directory
//! - `AudioStore` as a directory of audio files
//! - `MediaElement` as a headless, clock-driven element with no audio output
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FsAudioStore, JsonSettingsStore, ReqwestHttpClient};
//!
//! let http = ReqwestHttpClient::new()?;
//! let settings = JsonSettingsStore::open("/home/me/.config/podcast-core/settings.json")?;
//! let audio = FsAudioStore::new("/srv/podcast/audio");
//! ```

mod audio_store;
mod http;
mod media;
mod settings;

pub use audio_store::{content_type_for_key, FsAudioStore, DEFAULT_AUDIO_CONTENT_TYPE};
pub use http::ReqwestHttpClient;
pub use media::HeadlessMediaElement;
pub use settings::JsonSettingsStore;
