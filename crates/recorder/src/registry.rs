//! Which channels are recorded, and where.
//!
//! The registry is the only owner of recording sessions. A channel is either
//! absent (idle), reserved while its file is being opened, or active. Starts
//! and stops for one channel are serialized by the map shard lock; different
//! channels never wait on each other for I/O.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use {
    chrono::{DateTime, Local},
    dashmap::{DashMap, mapref::entry::Entry},
    recordbot_common::ChannelId,
    tracing::{debug, info, warn},
};

use crate::{
    destination::DestinationName,
    error::{StartError, StopError, WriteError},
    line::LogLine,
    sink::{LogSink, SinkOptions},
};

/// Shared handle to an active recording.
pub type SessionHandle = Arc<RecordingSession>;

/// A channel being recorded into one destination file.
#[derive(Debug)]
pub struct RecordingSession {
    channel: ChannelId,
    destination: DestinationName,
    started_at: DateTime<Local>,
    sink: LogSink,
}

impl RecordingSession {
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn destination(&self) -> &DestinationName {
        &self.destination
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn path(&self) -> &Path {
        self.sink.path()
    }

    pub fn lines_written(&self) -> u64 {
        self.sink.lines_written()
    }

    /// `true` once the session has been stopped or shut down.
    pub fn is_closed(&self) -> bool {
        self.sink.is_closed()
    }

    pub async fn append(&self, line: &LogLine) -> Result<(), WriteError> {
        self.sink.append(line).await
    }
}

enum Slot {
    /// A `start` for this channel is opening its file.
    Opening,
    Active(SessionHandle),
}

/// Owner of all recording sessions, keyed by channel.
pub struct SessionRegistry {
    records_dir: PathBuf,
    options: SinkOptions,
    slots: DashMap<ChannelId, Slot>,
    shutting_down: AtomicBool,
}

impl SessionRegistry {
    pub fn new(records_dir: impl Into<PathBuf>, options: SinkOptions) -> Self {
        Self {
            records_dir: records_dir.into(),
            options,
            slots: DashMap::new(),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    /// Start recording `channel` into `destination`.
    ///
    /// Fails with [`StartError::AlreadyRecording`] when the channel already
    /// has a session or another start for it is in progress; no second file
    /// is opened in that case. When the file cannot be opened nothing is
    /// registered.
    pub async fn start(
        &self,
        channel: ChannelId,
        destination: DestinationName,
    ) -> Result<SessionHandle, StartError> {
        if self.is_shutting_down() {
            return Err(StartError::ShuttingDown);
        }

        let reservation = self.reserve(&channel)?;
        let sink = LogSink::open(&self.records_dir, &destination, &self.options).await?;

        let session = Arc::new(RecordingSession {
            channel: channel.clone(),
            destination,
            started_at: Local::now(),
            sink,
        });

        if let Err(session) = reservation.commit(Arc::clone(&session)) {
            // shutdown_all cleared the reservation while the file was opening.
            session.sink.close().await;
            return Err(StartError::ShuttingDown);
        }

        info!(
            channel_id = %channel,
            destination = %session.destination,
            path = %session.path().display(),
            "recording started"
        );
        Ok(session)
    }

    /// Stop recording `channel`.
    ///
    /// The session is removed and its file flushed and closed before this
    /// returns; nothing more is written to it afterwards. The one exception
    /// is a write the disk has blocked past the close grace and write
    /// timeout: that line still completes when the disk lets it, the session
    /// reports [`is_closed`](RecordingSession::is_closed) `false` until
    /// then, and a warning is logged.
    pub async fn stop(&self, channel: &ChannelId) -> Result<(), StopError> {
        let removed = self
            .slots
            .remove_if(channel, |_, slot| matches!(slot, Slot::Active(_)));
        let Some((_, Slot::Active(session))) = removed else {
            return Err(StopError::NotRecording);
        };

        if session.sink.close().await {
            info!(
                channel_id = %channel,
                destination = %session.destination,
                lines = session.lines_written(),
                "recording stopped"
            );
        } else {
            warn!(
                channel_id = %channel,
                destination = %session.destination,
                "recording stopped, but its file is held by a stuck write"
            );
        }
        Ok(())
    }

    /// Active session for `channel`, if any. Never waits on I/O.
    pub fn lookup(&self, channel: &ChannelId) -> Option<SessionHandle> {
        match self.slots.get(channel)?.value() {
            Slot::Active(session) => Some(Arc::clone(session)),
            Slot::Opening => None,
        }
    }

    pub fn is_recording(&self, channel: &ChannelId) -> bool {
        self.lookup(channel).is_some()
    }

    /// Snapshot of every active session.
    pub fn active(&self) -> Vec<SessionHandle> {
        self.slots
            .iter()
            .filter_map(|entry| match entry.value() {
                Slot::Active(session) => Some(Arc::clone(session)),
                Slot::Opening => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.active().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Close every session. Later `start` calls fail with
    /// [`StartError::ShuttingDown`].
    ///
    /// Sessions close concurrently, each draining its queued lines within the
    /// sink's close grace period.
    pub async fn shutdown_all(&self) {
        self.shutting_down.store(true, Ordering::Release);

        let channels: Vec<ChannelId> = self.slots.iter().map(|e| e.key().clone()).collect();
        let sessions: Vec<SessionHandle> = channels
            .iter()
            .filter_map(|channel| self.slots.remove(channel))
            .filter_map(|(_, slot)| match slot {
                Slot::Active(session) => Some(session),
                Slot::Opening => None,
            })
            .collect();

        if sessions.is_empty() {
            debug!("no active recordings to close");
            return;
        }

        info!(count = sessions.len(), "closing all recordings");
        let released = futures::future::join_all(sessions.iter().map(|s| s.sink.close())).await;
        for (session, released) in sessions.iter().zip(released) {
            if released {
                debug!(
                    channel_id = %session.channel,
                    destination = %session.destination,
                    lines = session.lines_written(),
                    "recording closed at shutdown"
                );
            } else {
                warn!(
                    channel_id = %session.channel,
                    destination = %session.destination,
                    "recording file still held by a stuck write at shutdown"
                );
            }
        }
    }

    fn reserve(&self, channel: &ChannelId) -> Result<Reservation<'_>, StartError> {
        match self.slots.entry(channel.clone()) {
            Entry::Occupied(_) => {
                debug!(channel_id = %channel, "start refused, channel already recording");
                return Err(StartError::AlreadyRecording);
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Opening);
            },
        }
        let reservation = Reservation {
            slots: &self.slots,
            channel: channel.clone(),
            committed: false,
        };

        // shutdown_all may have raised its flag and taken its snapshot after
        // the check in `start` but before the insert above; such a slot would
        // never be cleared. Dropping the reservation removes it.
        if self.is_shutting_down() {
            return Err(StartError::ShuttingDown);
        }
        Ok(reservation)
    }
}

/// Claim on a channel while its file is being opened. Released on drop
/// unless committed, so a failed or cancelled start leaves the channel idle.
struct Reservation<'a> {
    slots: &'a DashMap<ChannelId, Slot>,
    channel: ChannelId,
    committed: bool,
}

impl Reservation<'_> {
    /// Turn the reservation into an active session. Hands the session back if
    /// the reservation was cleared in the meantime.
    fn commit(mut self, session: SessionHandle) -> Result<(), SessionHandle> {
        let Some(mut slot) = self.slots.get_mut(&self.channel) else {
            return Err(session);
        };
        if !matches!(*slot, Slot::Opening) {
            return Err(session);
        }
        *slot = Slot::Active(session);
        drop(slot);
        self.committed = true;
        Ok(())
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.slots
                .remove_if(&self.channel, |_, slot| matches!(slot, Slot::Opening));
        }
    }
}
