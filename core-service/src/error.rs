use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Runtime error: {0}")]
    Runtime(core_runtime::Error),

    #[error("Access error: {0}")]
    Access(#[from] core_auth::AccessError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),
}

impl From<core_runtime::Error> for CoreError {
    fn from(error: core_runtime::Error) -> Self {
        match error {
            core_runtime::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            other => CoreError::Runtime(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
