//! Channel recording core.
//!
//! A [`SessionRegistry`] owns at most one [`RecordingSession`] per channel.
//! Each session writes through a [`LogSink`] backed by its own writer thread,
//! and the [`EventRouter`] turns inbound message events into [`LogLine`]s for
//! whichever channels are currently recorded.

pub mod clock;
pub mod destination;
pub mod error;
pub mod line;
pub mod registry;
pub mod router;
pub mod sink;

pub use {
    clock::{Clock, ManualClock, SystemClock},
    destination::{DestinationName, InvalidDestination},
    error::{OpenError, StartError, StopError, WriteError},
    line::LogLine,
    registry::{RecordingSession, SessionHandle, SessionRegistry},
    router::{EventRouter, MessageEvent, MessageKind, RouteOutcome, WriteFailureReporter},
    sink::{LogSink, SinkOptions},
};
