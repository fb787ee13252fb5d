use std::{io, path::PathBuf};

use thiserror::Error;

/// The destination file could not be opened for appending.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("timed out opening {}", .path.display())]
    TimedOut { path: PathBuf },
}

/// A line could not be appended. The session stays open.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to append to record: {0}")]
    Io(#[from] io::Error),

    /// The sink was closed before the line reached the writer.
    #[error("record is closed")]
    Closed,

    /// The writer did not acknowledge in time; the line may still land.
    #[error("timed out appending to record")]
    TimedOut,
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("channel is already being recorded")]
    AlreadyRecording,

    #[error(transparent)]
    Open(#[from] OpenError),

    #[error("recorder is shutting down")]
    ShuttingDown,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StopError {
    #[error("channel is not being recorded")]
    NotRecording,
}
