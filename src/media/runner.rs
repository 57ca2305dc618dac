use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Captured output of a finished external process.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// Exit code, `None` when the process was ended by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process did not finish within {}s", .timeout.as_secs())]
    TimeoutExceeded { timeout: Duration },

    #[error("failed while waiting for process output: {0}")]
    Wait(#[from] std::io::Error),
}

/// Runs external commands with a hard per-call deadline.
///
/// Exactly one child process is spawned per call and none survives it: when
/// the deadline passes the child is killed before the error is returned.
pub struct ProcessRunner;

impl ProcessRunner {
    /// Run `program` with `args`, capturing stdout/stderr, failing with
    /// [`ProcessError::TimeoutExceeded`] once `timeout` elapses.
    pub async fn run<I, S>(
        program: &str,
        args: I,
        timeout: Duration,
    ) -> Result<ProcessResult, ProcessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // The timed-out branch below drops the wait future together with
            // the child handle; this turns that drop into a SIGKILL.
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;
        let pid = child.id();

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(waited) => waited?,
            Err(_) => {
                tracing::warn!(
                    "Killing '{}' (pid {:?}) after {}s timeout",
                    program,
                    pid,
                    timeout.as_secs()
                );
                return Err(ProcessError::TimeoutExceeded { timeout });
            }
        };

        Ok(ProcessResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let result = ProcessRunner::run("sh", &sh("echo hello; echo oops >&2"), Duration::from_secs(10))
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout.trim(), "hello");
        assert_eq!(result.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reports_nonzero_exit() {
        let result = ProcessRunner::run("sh", &sh("exit 3"), Duration::from_secs(10))
            .await
            .unwrap();

        assert!(!result.success());
        assert_eq!(result.exit_code, Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_times_out_and_kills_the_child() {
        let started = Instant::now();
        let err = ProcessRunner::run("sh", &sh("sleep 30"), Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::TimeoutExceeded { .. }));
        // well under the 30s the child would have needed
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let err = ProcessRunner::run(
            "postscribe-test-no-such-binary",
            ["--version"],
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
