//! Subprocess spawning with streamed and accumulated output.
//!
//! Unlike a plain `Command::output`, a nonzero exit is returned as a value so
//! callers can inspect stderr to choose a remediation path. Only a failure to
//! start the process is an error.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use log::{debug, error};

use crate::error::CommandError;
use crate::logging;

/// Callback receiving each chunk of output text as it arrives.
pub type OutputCallback = Box<dyn FnMut(&str) + Send>;

/// Options for [`spawn_with_error_handling`].
#[derive(Default)]
pub struct SpawnOptions {
    /// Run through the platform shell (`sh -c` / `cmd /C`).
    pub shell: bool,
    /// Working directory for the child.
    pub current_dir: Option<PathBuf>,
    /// Extra environment variables for the child.
    pub envs: HashMap<String, String>,
    pub on_stdout: Option<OutputCallback>,
    pub on_stderr: Option<OutputCallback>,
}

impl SpawnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn on_stdout(mut self, callback: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_stdout = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_stderr(mut self, callback: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_stderr = Some(Box::new(callback));
        self
    }
}

/// Completed subprocess, whatever its exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Builds the `Command` for `program args`, optionally wrapped in a shell.
pub(crate) fn build_command(program: &str, args: &[String], shell: bool) -> Command {
    if shell {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(line);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(line);
            cmd
        }
    } else {
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    }
}

/// Spawns `program` and waits for it, streaming output to the callbacks.
///
/// Returns `Ok` for any exit code. Returns `Err(CommandError::Start)` when
/// the executable cannot be started.
pub fn spawn_with_error_handling(
    program: &str,
    args: &[String],
    options: SpawnOptions,
) -> Result<CommandOutput, CommandError> {
    let SpawnOptions {
        shell,
        current_dir,
        envs,
        on_stdout,
        on_stderr,
    } = options;

    let mut cmd = build_command(program, args, shell);
    if let Some(dir) = &current_dir {
        cmd.current_dir(dir);
    }
    cmd.envs(&envs);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    logging::log_command(&cmd);

    let mut child = cmd.spawn().map_err(|e| {
        error!("Failed to spawn command {program}: {e}");
        CommandError::Start {
            program: program.to_string(),
            source: e,
        }
    })?;

    let stdout_handle = child
        .stdout
        .take()
        .map(|out| thread::spawn(move || collect_stream(out, on_stdout)));
    let stderr_handle = child
        .stderr
        .take()
        .map(|err| thread::spawn(move || collect_stream(err, on_stderr)));

    let status = child.wait().map_err(|e| CommandError::Wait {
        program: program.to_string(),
        source: e,
    })?;

    let stdout = stdout_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let stderr = stderr_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    debug!(
        "Command {program} finished with exit code {:?} ({} bytes stdout, {} bytes stderr)",
        status.code(),
        stdout.len(),
        stderr.len()
    );

    Ok(CommandOutput {
        exit_code: status.code(),
        stdout,
        stderr,
    })
}

/// Reads a pipe to completion, forwarding each chunk to `callback`.
fn collect_stream<R: Read>(mut reader: R, mut callback: Option<OutputCallback>) -> String {
    let mut collected = String::new();
    let mut decoder = Utf8ChunkDecoder::new();
    let mut buf = [0u8; 4096];
    let mut forward = |chunk: String, collected: &mut String| {
        if chunk.is_empty() {
            return;
        }
        if let Some(cb) = callback.as_mut() {
            cb(chunk.as_str());
        }
        collected.push_str(&chunk);
    };
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => forward(decoder.push(&buf[..n]), &mut collected),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("Stopped reading subprocess output: {e}");
                break;
            }
        }
    }
    forward(decoder.finish(), &mut collected);
    collected
}

/// Turns a byte stream read in arbitrary pieces into text.
///
/// A multi-byte character split across two reads is held back until its
/// remaining bytes arrive. Bytes that can never form valid UTF-8 become
/// U+FFFD, as with [`String::from_utf8_lossy`].
#[derive(Debug, Default)]
pub(crate) struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns all text that is now complete.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + len);
                        }
                        // Incomplete sequence at the end; wait for more bytes.
                        None => {
                            self.pending.drain(..valid_up_to);
                            break;
                        }
                    }
                }
            }
        }
        text
    }

    /// Flushes whatever is left at end of stream.
    pub(crate) fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_decoder_holds_split_character() {
        let cross = "❌".as_bytes();
        let mut decoder = Utf8ChunkDecoder::new();

        assert_eq!(decoder.push(&[b'a', cross[0]]), "a");
        assert_eq!(decoder.push(&cross[1..2]), "");
        assert_eq!(decoder.push(&[cross[2], b'!']), "❌!");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.push(b"ok \xff done"), "ok \u{FFFD} done");

        // A truncated character at end of stream is replaced on finish.
        assert_eq!(decoder.push(&"✓".as_bytes()[..2]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[test]
    fn test_split_character_survives_read_boundary() {
        let output = spawn_with_error_handling(
            "sh",
            &[
                "-c".to_string(),
                r"s=$(head -c 4095 /dev/zero | tr '\0' a); printf '%s\342\234\223 done\n' $s >&2"
                    .to_string(),
            ],
            SpawnOptions::new(),
        )
        .unwrap();

        assert!(output.stderr.ends_with("a✓ done\n"), "stderr tail: {:?}", &output.stderr[4090..]);
        assert_eq!(output.stderr.chars().filter(|c| *c == 'a').count(), 4095);
    }

    #[test]
    fn test_nonzero_exit_is_a_value() {
        let output = spawn_with_error_handling(
            "sh",
            &["-c".to_string(), "echo oops >&2; exit 3".to_string()],
            SpawnOptions::new(),
        )
        .unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[test]
    fn test_missing_executable_is_an_error() {
        let result = spawn_with_error_handling(
            "definitely-not-a-real-binary-xyz",
            &[],
            SpawnOptions::new(),
        );
        assert!(matches!(result, Err(CommandError::Start { .. })));
    }

    #[test]
    fn test_callbacks_receive_streamed_output() {
        let seen = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&seen);
        let output = spawn_with_error_handling(
            "echo hello",
            &[],
            SpawnOptions::new()
                .shell(true)
                .on_stdout(move |chunk| sink.lock().unwrap().push_str(chunk)),
        )
        .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(seen.lock().unwrap().trim(), "hello");
    }

    #[test]
    fn test_env_and_current_dir_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let output = spawn_with_error_handling(
            "sh",
            &["-c".to_string(), "echo $ARENA_TEST_VAR; pwd".to_string()],
            SpawnOptions::new()
                .current_dir(dir.path())
                .env("ARENA_TEST_VAR", "marker"),
        )
        .unwrap();

        let mut lines = output.stdout.lines();
        assert_eq!(lines.next(), Some("marker"));
        let cwd = std::path::PathBuf::from(lines.next().unwrap());
        assert_eq!(
            cwd.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}
