//! `gsh.tools.exec` (spec.md §4.6): runs a shell command through a PTY and
//! reports the result as *data*, never as a thrown error — failures (bad
//! working directory, non-zero exit, timeout) all come back as a value the
//! script can branch on.

mod pty;

pub use pty::{PtyCommandRequest, PtyCommandResult, PtyManager};

use crate::config::ExecWriter;
use crate::value::{ObjectValue, Value};
use portable_pty::PtySize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct ExecTool {
    manager: PtyManager,
    default_timeout: Duration,
}

impl ExecTool {
    pub fn new(workspace_root: PathBuf, output_cap_bytes: usize, default_timeout_secs: u64) -> Self {
        Self {
            manager: PtyManager::new(workspace_root, output_cap_bytes),
            default_timeout: Duration::from_secs(default_timeout_secs),
        }
    }

    /// `exec(command, [working_directory], [timeout])`. SPEC_FULL.md's
    /// resolution of the open question on `working_directory`: when given,
    /// it must be an absolute path — a relative path is a domain error
    /// surfaced as `{error}`, not resolved against some implicit cwd.
    /// `live_writer` is the optional sink named in spec.md §4.6 point 3 —
    /// when the host installed one via `SDKConfig::set_exec_writer`, PTY
    /// output is teed into it live, alongside the buffer this always
    /// returns.
    pub fn exec(
        &self,
        command: &str,
        working_directory: Option<&str>,
        timeout_secs: Option<u64>,
        live_writer: Option<Arc<dyn ExecWriter>>,
    ) -> Value {
        tracing::debug!(target: "gsh::exec", command, working_directory, "executing command");

        if let Some(dir) = working_directory {
            if !PathBuf::from(dir).is_absolute() {
                return error_value("working_directory must be an absolute path");
            }
        }

        if command.trim().is_empty() {
            return error_value("command must not be empty");
        }
        // spec.md §4.6 step 2: the command string is handed to `bash -c`
        // verbatim so shell syntax (pipes, `&&`, redirects, globs) works,
        // rather than split word-by-word and exec'd directly.
        let parts = vec!["bash".to_string(), "-c".to_string(), command.to_string()];

        let working_dir = match self.manager.resolve_working_dir(working_directory) {
            Ok(dir) => dir,
            Err(e) => return error_value(e.to_string()),
        };

        let request = PtyCommandRequest {
            command: parts,
            working_dir,
            timeout: timeout_secs.map(Duration::from_secs).unwrap_or(self.default_timeout),
            size: PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            },
        };

        match self.manager.run_command(request, ExecWriterSink(live_writer)) {
            Ok(result) => success_value(result),
            Err(e) => error_value(e.to_string()),
        }
    }
}

/// Adapts the host's `ExecWriter` (a chunk callback) onto `std::io::Write`
/// for `PtyManager::run_command`'s tee parameter; with no writer installed,
/// writes are silently discarded, same as `std::io::sink()`.
struct ExecWriterSink(Option<Arc<dyn ExecWriter>>);

impl std::io::Write for ExecWriterSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(writer) = &self.0 {
            writer.write_chunk(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn success_value(result: PtyCommandResult) -> Value {
    let mut obj = ObjectValue::new();
    obj.set_plain("output", Value::string(result.output));
    obj.set_plain("exitCode", Value::Number(result.exit_code as f64));
    if result.truncated {
        obj.set_plain("truncated", Value::Bool(true));
    }
    obj.set_plain("durationMs", Value::Number(result.duration.as_millis() as f64));
    Value::object(obj)
}

fn error_value(message: impl Into<String>) -> Value {
    let mut obj = ObjectValue::new();
    obj.set_plain("error", Value::string(message.into()));
    Value::object(obj)
}
