//! Process-isolated worker backend.
//!
//! One OS process per attempt: the assembled program is piped to the
//! interpreter's stdin, the wire report is read back between output
//! markers on stdout, and the process is force-killed from outside when
//! the wall-clock ceiling expires. Process-level isolation is the point:
//! only killing the process reliably reclaims memory from a runaway
//! snippet, so no cooperative in-worker check is ever relied on.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use uuid::Uuid;

use lancet_core::ExecLimits;

use crate::backend::{WorkerBackend, WorkerProgram, WorkerRun};
use crate::handle::WorkerHandle;
use crate::runner::truncate_message;
use crate::ExecutorError;

/// Marker preceding the wire report on the worker's stdout.
pub const RESULT_BEGIN_MARKER: &[u8] = b"LANCET_RESULT_BEGIN";
/// Marker following the wire report on the worker's stdout.
pub const RESULT_END_MARKER: &[u8] = b"LANCET_RESULT_END";

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Worker backend spawning one interpreter process per attempt.
#[derive(Debug, Clone)]
pub struct ProcessWorkerBackend {
    /// Path to the interpreter binary.
    interpreter: PathBuf,
    /// Arguments that make the interpreter read its program from stdin.
    args: Vec<String>,
}

impl ProcessWorkerBackend {
    /// Create a backend with the given interpreter invocation.
    ///
    /// The invocation must read its program from stdin (e.g. the `-`
    /// argument for CPython).
    #[must_use]
    pub fn new(interpreter: PathBuf, args: Vec<String>) -> Self {
        Self { interpreter, args }
    }

    /// Create a backend using `python3` from `PATH` in isolated mode
    /// (`-I`: environment variables and user site-packages ignored).
    #[must_use]
    pub fn python3() -> Self {
        Self::new(PathBuf::from("python3"), vec!["-I".to_owned(), "-".to_owned()])
    }

    fn spawn_worker(&self) -> Result<WorkerHandle, ExecutorError> {
        which_binary(&self.interpreter)?;
        let child = Command::new(&self.interpreter)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ExecutorError::SpawnFailed(format!("exec {}: {e}", self.interpreter.display()))
            })?;
        Ok(WorkerHandle::new(Uuid::new_v4(), child))
    }
}

#[async_trait]
impl WorkerBackend for ProcessWorkerBackend {
    async fn run(
        &self,
        program: &WorkerProgram,
        limits: &ExecLimits,
    ) -> Result<WorkerRun, ExecutorError> {
        let start = Instant::now();
        let mut handle = self.spawn_worker()?;

        tracing::debug!(worker_id = %handle.id, bytes = program.len(), "worker spawned");

        let mut stdin = handle
            .child
            .stdin
            .take()
            .ok_or_else(|| ExecutorError::SpawnFailed("stdin not piped".to_owned()))?;
        let mut stdout = handle
            .child
            .stdout
            .take()
            .ok_or_else(|| ExecutorError::SpawnFailed("stdout not piped".to_owned()))?;
        let mut stderr = handle
            .child
            .stderr
            .take()
            .ok_or_else(|| ExecutorError::SpawnFailed("stderr not piped".to_owned()))?;

        let program_bytes = program.source().as_bytes().to_vec();
        let io_future = async move {
            // A worker that exits before reading its stdin must not
            // abort supervision; exit classification covers it.
            let _ = stdin.write_all(&program_bytes).await;
            drop(stdin);
            let mut out = Vec::new();
            let mut err = Vec::new();
            let _ = tokio::join!(stdout.read_to_end(&mut out), stderr.read_to_end(&mut err));
            (out, err)
        };

        let Ok((out, err)) = tokio::time::timeout(limits.wall_clock_timeout, io_future).await
        else {
            let elapsed = start.elapsed();
            tracing::warn!(
                worker_id = %handle.id,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "wall clock ceiling hit, killing worker"
            );
            let _ = handle.kill().await;
            let _ = handle.child.wait().await;
            return Ok(WorkerRun::TimedOut { elapsed });
        };

        let status = handle.child.wait().await?;
        let elapsed = start.elapsed();

        tracing::debug!(
            worker_id = %handle.id,
            exit = status.code().unwrap_or(-1),
            stdout_bytes = out.len(),
            "worker exited"
        );

        let Some(payload) = extract_marked_report(&out) else {
            return Ok(WorkerRun::Crashed {
                exit_code: status.code(),
                detail: truncate_message(&String::from_utf8_lossy(&err)),
                elapsed,
            });
        };

        match serde_json::from_slice(trim_ascii(payload)) {
            Ok(report) => Ok(WorkerRun::Finished { report, elapsed }),
            Err(parse_err) => Ok(WorkerRun::Crashed {
                exit_code: status.code(),
                detail: truncate_message(&format!("report parse: {parse_err}")),
                elapsed,
            }),
        }
    }

    async fn health_check(&self) -> Result<(), ExecutorError> {
        let mut handle = self.spawn_worker()?;
        // An empty program must come back clean and quickly.
        drop(handle.child.stdin.take());
        let wait = tokio::time::timeout(HEALTH_CHECK_TIMEOUT, handle.child.wait());
        match wait.await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(ExecutorError::SpawnFailed(format!(
                "interpreter health check exited with {status}"
            ))),
            Ok(Err(e)) => Err(ExecutorError::Io(e)),
            Err(_) => {
                let _ = handle.kill().await;
                let _ = handle.child.wait().await;
                Err(ExecutorError::SpawnFailed(
                    "interpreter health check timed out".to_owned(),
                ))
            }
        }
    }
}

/// Extracts the bytes between the output markers, or `None` when either
/// marker is missing. Interpreter banners and any snippet bytes outside
/// the markers are ignored.
#[must_use]
pub fn extract_marked_report(raw: &[u8]) -> Option<&[u8]> {
    let start = find(raw, RESULT_BEGIN_MARKER)? + RESULT_BEGIN_MARKER.len();
    let len = find(&raw[start..], RESULT_END_MARKER)?;
    Some(&raw[start..start + len])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace());
    let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace());
    match (start, end) {
        (Some(s), Some(e)) => &bytes[s..=e],
        _ => &[],
    }
}

/// Verify a binary exists either at the given path or in `PATH`.
fn which_binary(path: &Path) -> Result<(), ExecutorError> {
    if path.is_absolute() {
        if path.exists() {
            return Ok(());
        }
        return Err(ExecutorError::InterpreterNotFound { path: path.to_owned() });
    }

    let found = std::env::var("PATH")
        .unwrap_or_default()
        .split(':')
        .map(|dir| Path::new(dir).join(path))
        .any(|p| p.exists());

    if found {
        Ok(())
    } else {
        Err(ExecutorError::InterpreterNotFound { path: path.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::WireReport;

    #[test]
    fn extract_finds_payload_between_markers() {
        let raw = b"banner noise\nLANCET_RESULT_BEGIN\n{\"status\":\"ok\"}\nLANCET_RESULT_END\n";
        let payload = extract_marked_report(raw);
        assert_eq!(payload.map(trim_ascii), Some(&b"{\"status\":\"ok\"}"[..]));
    }

    #[test]
    fn extract_returns_none_without_markers() {
        assert_eq!(extract_marked_report(b"no markers here"), None);
        assert_eq!(extract_marked_report(b""), None);
        assert_eq!(extract_marked_report(b"LANCET_RESULT_BEGIN only"), None);
    }

    #[test]
    fn extract_ignores_bytes_after_the_end_marker() {
        let raw = b"LANCET_RESULT_BEGIN\n42\nLANCET_RESULT_END\ntrailing";
        assert_eq!(extract_marked_report(raw).map(trim_ascii), Some(&b"42"[..]));
    }

    #[test]
    fn extracted_payload_parses_as_a_wire_report() {
        let raw =
            b"LANCET_RESULT_BEGIN\n{\"status\":\"blocked\",\"capability\":\"os\"}\nLANCET_RESULT_END\n";
        let payload = match extract_marked_report(raw) {
            Some(p) => p,
            None => panic!("markers must be found"),
        };
        let report: WireReport = match serde_json::from_slice(trim_ascii(payload)) {
            Ok(r) => r,
            Err(e) => panic!("payload must parse: {e}"),
        };
        assert_eq!(report, WireReport::Blocked { capability: "os".to_owned() });
    }

    #[test]
    fn which_binary_finds_sh_in_path() {
        assert!(which_binary(Path::new("sh")).is_ok(), "sh must be on PATH");
        assert!(which_binary(Path::new("lancet-no-such-binary")).is_err());
    }

    proptest::proptest! {
        #[test]
        fn proptest_extract_never_panics(raw in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..512usize)) {
            let _ = extract_marked_report(&raw);
        }
    }
}
