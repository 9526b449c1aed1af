//! Supervision of one running engine process.
//!
//! Two reader threads turn stdout and stderr into [`ProgressEvent`]s on a
//! channel, and a supervisor thread owns the child until it exits or the
//! run is cancelled. The caller drains [`EngineRun::events`] and then calls
//! [`EngineRun::wait`], which settles exactly once.

use std::io::Read;
use std::process::{Child, ExitStatus};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use serde_json::{Value, json};

use crate::bridge::cancel::CancellationToken;
use crate::bridge::protocol::{ProgressEvent, StreamDecoder};
use crate::error::{BridgeError, BridgeResult};
use crate::util::command::Utf8ChunkDecoder;

/// How often the supervisor checks for exit and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const READ_BUFFER_SIZE: usize = 4096;

/// A running engine process.
pub struct EngineRun {
    events: Receiver<ProgressEvent>,
    supervisor: JoinHandle<BridgeResult<Value>>,
}

impl EngineRun {
    /// Takes ownership of a freshly spawned child and starts supervising it.
    pub(crate) fn start(mut child: Child, cancel: CancellationToken) -> Self {
        let (tx, events) = mpsc::channel();

        let stdout_reader = child.stdout.take().map(|out| {
            let tx = tx.clone();
            thread::spawn(move || read_stdout(out, tx))
        });
        let stderr_reader = child.stderr.take().map(|err| {
            let tx = tx.clone();
            thread::spawn(move || read_stderr(err, tx))
        });
        drop(tx);

        let supervisor =
            thread::spawn(move || supervise(child, stdout_reader, stderr_reader, cancel));

        Self { events, supervisor }
    }

    /// Blocking iterator over events in emission order.
    ///
    /// Ends once both output streams of the engine have closed.
    pub fn events(&self) -> mpsc::Iter<'_, ProgressEvent> {
        self.events.iter()
    }

    /// Waits for the engine to settle.
    ///
    /// Exit code 0 yields the captured result payload, or
    /// `{"success": true}` if the engine never sent one. Any other exit
    /// yields [`BridgeError::ExitedWithError`] even if a result was sent.
    pub fn wait(self) -> BridgeResult<Value> {
        let EngineRun { events, supervisor } = self;
        // Unread events are dropped along with the receiver.
        drop(events);
        match supervisor.join() {
            Ok(result) => result,
            Err(_) => {
                error!("Engine supervisor thread panicked");
                Err(BridgeError::Wait(std::io::Error::other(
                    "engine supervisor thread panicked",
                )))
            }
        }
    }
}

fn supervise(
    mut child: Child,
    stdout_reader: Option<JoinHandle<Option<Value>>>,
    stderr_reader: Option<JoinHandle<String>>,
    cancel: CancellationToken,
) -> BridgeResult<Value> {
    let status = loop {
        if cancel.is_cancelled() {
            warn!("Cancelling engine process (pid {})", child.id());
            if let Err(e) = child.kill() {
                debug!("Failed to kill engine process: {e}");
            }
            let _ = child.wait();
            // Readers finish on their own once the pipes close.
            return Err(BridgeError::Cancelled);
        }
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                error!("Error waiting for engine process: {e}");
                let _ = child.kill();
                return Err(BridgeError::Wait(e));
            }
        }
    };

    // Exit is only resolved after stdout has been fully consumed.
    let result = stdout_reader.and_then(|h| h.join().ok()).flatten();
    let stderr = stderr_reader
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    settle(status, result, stderr)
}

fn settle(status: ExitStatus, result: Option<Value>, stderr: String) -> BridgeResult<Value> {
    match status.code() {
        Some(0) => {
            info!("Engine process completed successfully");
            Ok(result.unwrap_or_else(|| {
                debug!("Engine exited without a result message");
                json!({ "success": true })
            }))
        }
        code => {
            let code = code.unwrap_or_else(|| signal_exit_code(&status));
            error!("Engine process exited with code {code}");
            Err(BridgeError::ExitedWithError { code, stderr })
        }
    }
}

#[cfg(unix)]
fn signal_exit_code(status: &ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map_or(-1, |signal| 128 + signal)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: &ExitStatus) -> i32 {
    -1
}

/// Decodes stdout into events; returns the last result payload seen.
fn read_stdout<R: Read>(mut reader: R, tx: Sender<ProgressEvent>) -> Option<Value> {
    let mut decoder = StreamDecoder::new();
    let mut result = None;
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("Stopped reading engine stdout: {e}");
                break;
            }
        };
        for event in decoder.feed(&buf[..n]) {
            match &event {
                ProgressEvent::Result(data) => result = Some(data.clone()),
                ProgressEvent::RawLine(line) => debug!("ENGINE: {line}"),
                _ => {}
            }
            // A dropped receiver just means nobody is watching.
            let _ = tx.send(event);
        }
    }
    decoder.finish();
    result
}

/// Forwards stderr chunks verbatim and returns the accumulated text.
fn read_stderr<R: Read>(mut reader: R, tx: Sender<ProgressEvent>) -> String {
    let mut collected = String::new();
    let mut decoder = Utf8ChunkDecoder::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut forward = |chunk: String, collected: &mut String| {
        if chunk.is_empty() {
            return;
        }
        debug!("ENGINE STDERR: {}", chunk.trim_end());
        collected.push_str(&chunk);
        let _ = tx.send(ProgressEvent::Error(chunk));
    };
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => forward(decoder.push(&buf[..n]), &mut collected),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("Stopped reading engine stderr: {e}");
                break;
            }
        }
    }
    forward(decoder.finish(), &mut collected);
    collected
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn test_settle_exit_code_is_authoritative() {
        let ok = settle(ExitStatus::from_raw(0), Some(json!({"clips": []})), String::new());
        assert_eq!(ok.unwrap(), json!({"clips": []}));

        let fallback = settle(ExitStatus::from_raw(0), None, String::new());
        assert_eq!(fallback.unwrap(), json!({"success": true}));

        // Raw wait status 2 << 8 is exit code 2.
        let failed = settle(
            ExitStatus::from_raw(2 << 8),
            Some(json!({"clips": []})),
            "disk full".to_string(),
        );
        match failed {
            Err(BridgeError::ExitedWithError { code, stderr }) => {
                assert_eq!(code, 2);
                assert_eq!(stderr, "disk full");
            }
            other => panic!("expected exit failure, got {other:?}"),
        }
    }

    #[test]
    fn test_signal_exit_maps_to_shell_convention() {
        // Raw wait status 9 is "killed by SIGKILL".
        let killed = settle(ExitStatus::from_raw(9), None, String::new());
        assert_eq!(killed.unwrap_err().exit_code(), Some(137));
    }

    #[test]
    fn test_read_stdout_keeps_last_result_and_forwards_events() {
        let (tx, rx) = mpsc::channel();
        let input: &[u8] = b"hello\n{\"type\":\"result\",\"data\":1}\n{\"type\":\"result\",\"data\":2}\npartial";
        let result = read_stdout(input, tx);

        assert_eq!(result, Some(json!(2)));
        let events: Vec<_> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                ProgressEvent::RawLine("hello".to_string()),
                ProgressEvent::Result(json!(1)),
                ProgressEvent::Result(json!(2)),
            ]
        );
    }
}
