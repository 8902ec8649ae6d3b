//! `PtyManager` / `PtyCommandRequest`: runs one command to completion inside
//! a real pseudo-terminal, live-teeing its output to a writer while also
//! capturing it for the caller (spec.md §4.6).
//!
//! Grounded on `vtcode-core/src/tools/bash_tool.rs`'s PTY execution path and
//! its `tests/pty_tests.rs` (`PtyManager::new`, `resolve_working_dir`,
//! `PtyCommandRequest { command, working_dir, timeout, size }`,
//! `run_command(request) -> PtyCommandResult { output, exit_code, duration
//! }`). SPEC_FULL.md §4.6 deliberately drops the teacher's named-session
//! surface (`create_session`/`list_sessions`/`close_session`) from the
//! `gsh.tools.exec` tool — a single command is run to completion, not
//! attached to a long-lived interactive session.

use anyhow::{Context, Result};
use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub struct PtyCommandRequest {
    pub command: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
    pub size: PtySize,
}

pub struct PtyCommandResult {
    pub output: String,
    pub exit_code: i32,
    pub duration: Duration,
    pub truncated: bool,
}

#[derive(Clone)]
pub struct PtyManager {
    workspace_root: PathBuf,
    output_cap_bytes: usize,
}

impl PtyManager {
    pub fn new(workspace_root: PathBuf, output_cap_bytes: usize) -> Self {
        Self {
            workspace_root,
            output_cap_bytes,
        }
    }

    /// Resolves `dir` (default `.`) relative to the workspace root,
    /// rejecting a directory that doesn't exist (spec.md §4.6, mirroring
    /// `resolve_working_dir`'s "does not exist" rejection).
    pub fn resolve_working_dir(&self, dir: Option<&str>) -> Result<PathBuf> {
        let dir = dir.unwrap_or(".");
        let candidate = if Path::new(dir).is_absolute() {
            PathBuf::from(dir)
        } else {
            self.workspace_root.join(dir)
        };
        let cleaned = path_clean::clean(&candidate);
        if !cleaned.exists() {
            anyhow::bail!("working directory `{}` does not exist", cleaned.display());
        }
        Ok(cleaned)
    }

    /// Runs `request.command` to completion inside a PTY, tee-ing output to
    /// `tee` live as it arrives from the reader thread — not buffered and
    /// flushed once after the child exits — and also returning the captured
    /// (possibly truncated) text.
    pub fn run_command(
        &self,
        request: PtyCommandRequest,
        mut tee: impl std::io::Write + Send + 'static,
    ) -> Result<PtyCommandResult> {
        let started = Instant::now();
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(request.size)
            .context("failed to allocate a pseudo-terminal")?;

        let mut builder = CommandBuilder::new(&request.command[0]);
        builder.args(&request.command[1..]);
        builder.cwd(&request.working_dir);
        builder.env("PAGER", "cat");
        builder.env("GIT_PAGER", "cat");
        builder.env("GIT_TERMINAL_PROMPT", "0");

        let mut child = pair
            .slave
            .spawn_command(builder)
            .with_context(|| format!("failed to spawn `{}`", request.command.join(" ")))?;
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .context("failed to clone PTY reader")?;

        let captured = Arc::new(Mutex::new(Vec::<u8>::new()));
        let captured_writer = captured.clone();
        let cap = self.output_cap_bytes;
        let reader_thread = std::thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        tee.write_all(&buf[..n]).ok();
                        let mut guard = captured_writer.lock().expect("capture mutex poisoned");
                        if guard.len() < cap {
                            let remaining = cap - guard.len();
                            guard.extend_from_slice(&buf[..n.min(remaining)]);
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let exit_status = wait_with_timeout(&mut child, request.timeout)?;
        let _ = reader_thread.join();

        let captured = captured.lock().expect("capture mutex poisoned").clone();
        let truncated = captured.len() >= self.output_cap_bytes;
        let output = String::from_utf8_lossy(&captured).into_owned();

        Ok(PtyCommandResult {
            output,
            exit_code: exit_status,
            duration: started.elapsed(),
            truncated,
        })
    }
}

fn wait_with_timeout(
    child: &mut Box<dyn portable_pty::Child + Send + Sync>,
    timeout: Duration,
) -> Result<i32> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status.exit_code() as i32);
        }
        if Instant::now() >= deadline {
            child.kill().ok();
            anyhow::bail!("command timed out after {:?}", timeout);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}
