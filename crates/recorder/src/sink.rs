//! Append-only record file with a single writer.
//!
//! Every sink owns a dedicated OS thread that holds the file handle and
//! drains a bounded queue of rendered lines. Appends resolve once the line
//! has been handed to the OS, and lines from one sink land in queue order.
//! A slow disk therefore only stalls the channel whose file it backs.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, LineWriter, Write},
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    tokio::sync::{mpsc, oneshot, watch},
    tracing::{debug, warn},
};

use crate::{
    destination::DestinationName,
    error::{OpenError, WriteError},
    line::LogLine,
};

/// Limits applied to sink I/O.
#[derive(Debug, Clone)]
pub struct SinkOptions {
    /// Lines that may wait for the writer before `append` blocks.
    pub queue_capacity: usize,
    pub open_timeout: Duration,
    pub write_timeout: Duration,
    /// How long `close` waits for queued lines before abandoning them.
    pub close_grace: Duration,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            open_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            close_grace: Duration::from_secs(3),
        }
    }
}

struct AppendRequest {
    line: String,
    ack: oneshot::Sender<Result<(), WriteError>>,
}

/// Open append handle for one record file.
pub struct LogSink {
    path: PathBuf,
    tx: Mutex<Option<mpsc::Sender<AppendRequest>>>,
    finished: watch::Receiver<bool>,
    abandon: Arc<AtomicBool>,
    lines_written: Arc<AtomicU64>,
    write_timeout: Duration,
    close_grace: Duration,
}

impl LogSink {
    /// Open `<dir>/<destination>.txt` for appending, creating the directory
    /// and file if needed. Existing content is kept.
    pub async fn open(
        dir: &Path,
        destination: &DestinationName,
        options: &SinkOptions,
    ) -> Result<Self, OpenError> {
        let path = dir.join(destination.file_name());

        let open_path = path.clone();
        let opened = tokio::time::timeout(
            options.open_timeout,
            tokio::task::spawn_blocking(move || open_append(&open_path)),
        )
        .await;
        let file = match opened {
            Ok(Ok(Ok(file))) => file,
            Ok(Ok(Err(source))) => return Err(OpenError::Io { path, source }),
            Ok(Err(join)) => {
                return Err(OpenError::Io {
                    path,
                    source: io::Error::other(join),
                });
            },
            Err(_) => return Err(OpenError::TimedOut { path }),
        };

        let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));
        let (finished_tx, finished) = watch::channel(false);
        let abandon = Arc::new(AtomicBool::new(false));
        let lines_written = Arc::new(AtomicU64::new(0));

        let writer = Writer {
            file: LineWriter::new(file),
            rx,
            abandon: Arc::clone(&abandon),
            lines_written: Arc::clone(&lines_written),
            path: path.clone(),
        };
        let spawned = std::thread::Builder::new()
            .name(format!("record-{destination}"))
            .spawn(move || {
                writer.run();
                let _ = finished_tx.send(true);
            });
        if let Err(source) = spawned {
            return Err(OpenError::Io { path, source });
        }

        debug!(path = %path.display(), "record opened");
        Ok(Self {
            path,
            tx: Mutex::new(Some(tx)),
            finished,
            abandon,
            lines_written,
            write_timeout: options.write_timeout,
            close_grace: options.close_grace,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines the writer has successfully appended so far.
    pub fn lines_written(&self) -> u64 {
        self.lines_written.load(Ordering::Relaxed)
    }

    /// `true` once the writer thread has finished and released the file.
    pub fn is_closed(&self) -> bool {
        *self.finished.borrow()
    }

    /// Append one rendered line.
    ///
    /// Resolves after the writer thread has written the line. Fails with
    /// [`WriteError::Closed`] once `close` has been called.
    pub async fn append(&self, line: &LogLine) -> Result<(), WriteError> {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(WriteError::Closed)?;

        let (ack, ack_rx) = oneshot::channel();
        let request = AppendRequest {
            line: line.to_string(),
            ack,
        };
        let delivery = async move {
            tx.send(request).await.map_err(|_| WriteError::Closed)?;
            ack_rx.await.map_err(|_| WriteError::Closed)?
        };

        tokio::time::timeout(self.write_timeout, delivery)
            .await
            .map_err(|_| WriteError::TimedOut)?
    }

    /// Flush queued lines and release the file. Safe to call repeatedly.
    ///
    /// Lines already queued are written first. If the writer has not drained
    /// within the close grace period it is told to drop what is left; a line
    /// it is in the middle of writing is always finished, and gets one more
    /// write timeout to do so.
    ///
    /// Returns `true` when the writer has released the file. On `false` the
    /// writer is still blocked inside that last write: the descriptor stays
    /// open until the write returns, and [`is_closed`](Self::is_closed)
    /// reports `false` until then. No new appends are accepted either way.
    pub async fn close(&self) -> bool {
        let sender = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let first_close = sender.is_some();
        drop(sender);

        if self.wait_finished(self.close_grace).await {
            if first_close {
                debug!(
                    path = %self.path.display(),
                    lines = self.lines_written(),
                    "record closed"
                );
            }
            return true;
        }

        self.abandon.store(true, Ordering::Release);
        warn!(
            path = %self.path.display(),
            "record did not drain in time, dropping queued lines"
        );
        if self.wait_finished(self.write_timeout).await {
            return true;
        }
        warn!(
            path = %self.path.display(),
            "record writer is stuck in a write, file stays open until it returns"
        );
        false
    }

    async fn wait_finished(&self, limit: Duration) -> bool {
        let mut finished = self.finished.clone();
        // A writer that exited without signalling has dropped the file too.
        tokio::time::timeout(limit, finished.wait_for(|done| *done))
            .await
            .is_ok()
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

struct Writer {
    file: LineWriter<File>,
    rx: mpsc::Receiver<AppendRequest>,
    abandon: Arc<AtomicBool>,
    lines_written: Arc<AtomicU64>,
    path: PathBuf,
}

impl Writer {
    /// Runs until every sender is gone and the queue is empty.
    fn run(mut self) {
        while let Some(AppendRequest { line, ack }) = self.rx.blocking_recv() {
            if self.abandon.load(Ordering::Acquire) {
                let _ = ack.send(Err(WriteError::Closed));
                continue;
            }
            let result = self.file.write_all(line.as_bytes());
            if result.is_ok() {
                self.lines_written.fetch_add(1, Ordering::Relaxed);
            }
            let _ = ack.send(result.map_err(WriteError::Io));
        }

        if let Err(e) = self.file.flush() {
            warn!(path = %self.path.display(), error = %e, "failed to flush record on close");
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, chrono::NaiveTime};

    fn line(body: &str) -> LogLine {
        LogLine::new(
            NaiveTime::from_hms_opt(10, 1, 0).unwrap(),
            false,
            "alice",
            body,
        )
    }

    fn dest(name: &str) -> DestinationName {
        DestinationName::parse(name).unwrap()
    }

    #[tokio::test]
    async fn open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let records = dir.path().join("records");

        let sink = LogSink::open(&records, &dest("log1"), &SinkOptions::default())
            .await
            .unwrap();

        assert_eq!(sink.path(), records.join("log1.txt"));
        assert!(sink.path().exists());
        sink.close().await;
    }

    #[tokio::test]
    async fn append_preserves_existing_content_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log1.txt");
        fs::write(&path, "earlier\n").unwrap();

        let sink = LogSink::open(dir.path(), &dest("log1"), &SinkOptions::default())
            .await
            .unwrap();
        sink.append(&line("A")).await.unwrap();
        sink.append(&line("B")).await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "earlier\n[10:01]  alice: A \n[10:01]  alice: B \n"
        );
        assert_eq!(sink.lines_written(), 2);
        sink.close().await;
    }

    #[tokio::test]
    async fn lines_are_visible_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::open(dir.path(), &dest("live"), &SinkOptions::default())
            .await
            .unwrap();

        sink.append(&line("now")).await.unwrap();

        let content = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content, "[10:01]  alice: now \n");
        sink.close().await;
    }

    #[tokio::test]
    async fn close_is_idempotent_and_rejects_later_appends() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::open(dir.path(), &dest("log1"), &SinkOptions::default())
            .await
            .unwrap();
        sink.append(&line("kept")).await.unwrap();

        sink.close().await;
        sink.close().await;

        assert!(sink.is_closed());
        assert!(matches!(
            sink.append(&line("late")).await,
            Err(WriteError::Closed)
        ));
        let content = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content, "[10:01]  alice: kept \n");
    }

    #[tokio::test]
    async fn open_fails_when_directory_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("records");
        fs::write(&blocker, "not a directory").unwrap();

        let err = LogSink::open(&blocker, &dest("log1"), &SinkOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, OpenError::Io { .. }), "{err}");
        assert!(err.to_string().contains("log1.txt"));
    }

    #[tokio::test]
    async fn many_concurrent_appends_all_land_as_whole_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(
            LogSink::open(
                dir.path(),
                &dest("busy"),
                &SinkOptions {
                    queue_capacity: 4,
                    ..Default::default()
                },
            )
            .await
            .unwrap(),
        );

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let sink = Arc::clone(&sink);
                tokio::spawn(async move { sink.append(&line(&format!("m{i}"))).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        sink.close().await;

        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 64);
        assert!(
            lines
                .iter()
                .all(|l| l.starts_with("[10:01]  alice: m") && l.ends_with(' '))
        );
        assert_eq!(sink.lines_written(), 64);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn write_failure_is_reported_without_closing() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("/dev/full", dir.path().join("full.txt")).unwrap();

        let sink = LogSink::open(dir.path(), &dest("full"), &SinkOptions::default())
            .await
            .unwrap();

        assert!(matches!(
            sink.append(&line("lost")).await,
            Err(WriteError::Io(_))
        ));
        assert!(!sink.is_closed());
        sink.close().await;
    }
}
