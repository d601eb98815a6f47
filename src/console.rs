//! Live log console for long-running backend operations.
//!
//! A [`LogConsole`] renders the append-only, ordered text output of exactly
//! one server-side operation at a time (bulk QR generation, mail dispatch,
//! retry). Opening a stream always discards the previous session -- its
//! transport is torn down first and the line buffer starts empty -- so the
//! console's contents are deterministic across repeated opens. Log streams
//! never reconnect: a transport error or server close means the operation
//! finished or failed, and the operator re-opens to retry.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::sse::SseDecoder;

/// Marker token that renders a line in the success style.
pub const SUCCESS_MARKER: &str = "✓";
/// Marker token that renders a line in the failure style.
pub const FAILURE_MARKER: &str = "✗";

/// Display emphasis of a log line.
///
/// Classification is advisory only -- it never affects control flow. The
/// backend emits freeform text, so the only signal is a substring marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Contains [`SUCCESS_MARKER`].
    Success,
    /// Contains [`FAILURE_MARKER`] (and no success marker).
    Failure,
    /// Everything else.
    Info,
}

impl LineKind {
    /// Classify a line by its marker tokens. The success marker wins if a
    /// line somehow carries both.
    pub fn classify(text: &str) -> Self {
        if text.contains(SUCCESS_MARKER) {
            Self::Success
        } else if text.contains(FAILURE_MARKER) {
            Self::Failure
        } else {
            Self::Info
        }
    }
}

/// One rendered log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub text: String,
    pub kind: LineKind,
}

impl LogLine {
    fn new(text: String) -> Self {
        let kind = LineKind::classify(&text);
        Self { text, kind }
    }
}

/// Snapshot of a console session for rendering.
#[derive(Debug, Clone)]
pub struct StreamSession {
    /// Identity of this session; changes on every `open`.
    pub id: Uuid,
    /// The stream URL this session was opened against.
    pub url: String,
    /// Whether the transport is still delivering lines.
    pub is_open: bool,
    /// The buffered lines, in arrival order.
    pub lines: Vec<LogLine>,
}

/// Shared, single-writer line buffer of one session.
///
/// The transport task is the only writer; everyone else snapshots. Each
/// session owns a fresh buffer, so a transport that is aborted late can at
/// worst append to a buffer nobody looks at anymore.
struct SessionBuffer {
    lines: Mutex<Vec<LogLine>>,
    open: AtomicBool,
    /// Notifies subscribers with the current line count on every append and
    /// once more when the session ends.
    appended: watch::Sender<usize>,
}

impl SessionBuffer {
    fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
            appended: watch::channel(0).0,
        }
    }

    fn push(&self, line: LogLine) {
        let count = {
            let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
            lines.push(line);
            lines.len()
        };
        let _ = self.appended.send(count);
    }

    fn snapshot(&self) -> Vec<LogLine> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Mark the session as ended and wake any subscribers so they observe
    /// the closed state.
    fn finish(&self) {
        self.open.store(false, Ordering::Release);
        self.appended.send_modify(|_| {});
    }
}

struct Session {
    id: Uuid,
    url: String,
    buffer: Arc<SessionBuffer>,
    task: Option<JoinHandle<()>>,
}

/// The live log stream client.
///
/// Holds at most one transport at a time. [`open`](LogConsole::open) always
/// closes the previous transport and clears the displayed lines before
/// starting the next session; [`close`](LogConsole::close) tears down the
/// transport but retains the lines until the next open, so a re-shown closed
/// console can still display what happened.
///
/// Dropping the console aborts any live transport, so mounting and
/// unmounting repeatedly cannot leak connections.
pub struct LogConsole {
    client: ApiClient,
    current: Option<Session>,
}

impl LogConsole {
    /// Create a console with no active session.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            current: None,
        }
    }

    /// Open a log stream at `url`, replacing any previous session.
    ///
    /// The previous transport (if any) is closed first and the line buffer
    /// starts empty. The transport runs in the background; connection
    /// failures end the session with zero lines rather than surfacing here,
    /// matching the fire-and-observe contract of a log console.
    ///
    /// # Returns
    ///
    /// The id of the new session.
    pub fn open(&mut self, url: &str) -> Uuid {
        self.drop_transport();

        let id = Uuid::new_v4();
        let buffer = Arc::new(SessionBuffer::new());
        tracing::info!(session = %id, %url, "log console: opening stream");
        let task = tokio::spawn(run_transport(
            self.client.clone(),
            url.to_string(),
            Arc::clone(&buffer),
        ));
        self.current = Some(Session {
            id,
            url: url.to_string(),
            buffer,
            task: Some(task),
        });
        id
    }

    /// Tear down the active transport, keeping the buffered lines.
    ///
    /// Safe to call when nothing is open.
    pub fn close(&mut self) {
        if let Some(session) = &mut self.current {
            if let Some(task) = session.task.take() {
                task.abort();
            }
            if session.buffer.open.load(Ordering::Acquire) {
                tracing::info!(session = %session.id, "log console: closed by operator");
            }
            session.buffer.finish();
        }
    }

    /// Whether the current session's transport is still delivering lines.
    pub fn is_open(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| s.buffer.open.load(Ordering::Acquire))
    }

    /// The buffered lines of the current session, in arrival order.
    pub fn lines(&self) -> Vec<LogLine> {
        self.current
            .as_ref()
            .map(|s| s.buffer.snapshot())
            .unwrap_or_default()
    }

    /// Snapshot the current session for rendering, if one exists.
    pub fn session(&self) -> Option<StreamSession> {
        self.current.as_ref().map(|s| StreamSession {
            id: s.id,
            url: s.url.clone(),
            is_open: s.buffer.open.load(Ordering::Acquire),
            lines: s.buffer.snapshot(),
        })
    }

    /// Subscribe to line-count changes of the current session.
    ///
    /// The receiver observes the running line count and is woken once more
    /// when the session ends; it is bound to this session and goes stale at
    /// the next [`open`](LogConsole::open).
    pub fn subscribe(&self) -> Option<watch::Receiver<usize>> {
        self.current.as_ref().map(|s| s.buffer.appended.subscribe())
    }

    fn drop_transport(&mut self) {
        if let Some(mut session) = self.current.take() {
            if let Some(task) = session.task.take() {
                task.abort();
            }
            session.buffer.finish();
        }
    }
}

impl Drop for LogConsole {
    fn drop(&mut self) {
        self.drop_transport();
    }
}

/// The transport task: one SSE connection feeding one session buffer.
///
/// Ends (without reconnecting) on connection failure, transport error, or
/// server close, and marks the session finished on every exit path.
async fn run_transport(client: ApiClient, url: String, buffer: Arc<SessionBuffer>) {
    match client.open_sse(&url).await {
        Ok(response) => drain_stream(response.bytes_stream(), &url, &buffer).await,
        Err(error) => {
            tracing::warn!(%url, error = %error, "log stream: failed to open");
        }
    }
    buffer.finish();
}

/// Feed wire chunks into the session buffer until the stream ends or errors.
///
/// Generic over the chunk stream so framing and error handling can be tested
/// against a mocked wire.
async fn drain_stream<B, E>(
    stream: impl tokio_stream::Stream<Item = Result<B, E>>,
    url: &str,
    buffer: &SessionBuffer,
) where
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    tokio::pin!(stream);
    let mut decoder = SseDecoder::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                // Arrival order is display order; every event is exactly
                // one line, duplicates included.
                for payload in decoder.feed(bytes.as_ref()) {
                    buffer.push(LogLine::new(payload));
                }
            }
            Err(error) => {
                tracing::warn!(%url, error = %error, "log stream: transport error, ending session");
                break;
            }
        }
    }
}
