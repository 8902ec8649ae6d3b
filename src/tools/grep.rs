//! `gsh.tools.grep` (spec.md §4.9): auto-detects the best available search
//! backend — `rg` first, then `git grep`, then POSIX `grep` — the same
//! primary/fallback ordering the teacher encodes as a `FallbackChain` for
//! file search (`vtcode-core/src/tools/fallback_chains.rs::file_search`),
//! here resolved once via `which` instead of retried step-by-step at
//! runtime.

use crate::value::{ObjectValue, Value};
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Ripgrep,
    GitGrep,
    PosixGrep,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Ripgrep => "rg",
            Backend::GitGrep => "git grep",
            Backend::PosixGrep => "grep",
        }
    }
}

/// Directories excluded from a POSIX-`grep` recursive search, since it has
/// no native `.gitignore` awareness the way `rg`/`git grep` do.
const EXCLUDE_DIRS: &[&str] = &[".git", "node_modules", "target", "dist", "build", ".venv"];

/// `rg` first; `git grep` only when `git` is on `PATH` *and* `path` sits
/// inside a Git work tree (spec.md §4.7); POSIX `grep` otherwise.
pub fn detect_backend(overridden: Option<&str>, path: &str) -> Backend {
    if let Some(name) = overridden {
        return match name {
            "rg" => Backend::Ripgrep,
            "git" | "git-grep" => Backend::GitGrep,
            _ => Backend::PosixGrep,
        };
    }
    if which::which("rg").is_ok() {
        Backend::Ripgrep
    } else if which::which("git").is_ok() && is_inside_git_work_tree(path) {
        Backend::GitGrep
    } else {
        Backend::PosixGrep
    }
}

fn is_inside_git_work_tree(path: &str) -> bool {
    let dir = if Path::new(path).is_dir() { path } else { "." };
    Command::new("git")
        .arg("-C")
        .arg(dir)
        .arg("rev-parse")
        .arg("--is-inside-work-tree")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

pub fn grep(pattern: &str, path: &str, backend: Backend, output_cap_bytes: usize) -> Value {
    tracing::debug!(target: "gsh::exec", pattern, path, backend = backend.name(), "running grep");
    let mut cmd = match backend {
        Backend::Ripgrep => {
            let mut c = Command::new("rg");
            c.arg("--line-number")
                .arg("--color=never")
                .arg("--hidden")
                .arg(pattern)
                .arg(path);
            c
        }
        Backend::GitGrep => {
            let mut c = Command::new("git");
            c.arg("grep").arg("-n").arg("-E").arg(pattern).arg("--").arg(path);
            c
        }
        Backend::PosixGrep => {
            let mut c = Command::new("grep");
            c.arg("-rn").arg("-E");
            for dir in EXCLUDE_DIRS {
                c.arg(format!("--exclude-dir={dir}"));
            }
            c.arg(pattern).arg(path);
            c
        }
    };

    match cmd.output() {
        Ok(output) => {
            let exit_code = output.status.code().unwrap_or(-1);
            // Exit code 0 means matches, 1 means none, >1 an error — true
            // for `rg`, `git grep`, and POSIX `grep` alike (spec.md §4.7).
            let status = match exit_code {
                0 => "matches_found",
                1 => "no_matches",
                _ => "error",
            };
            let mut stdout = if exit_code > 1 { output.stderr } else { output.stdout };
            let truncated = stdout.len() > output_cap_bytes;
            stdout.truncate(output_cap_bytes);
            let text = String::from_utf8_lossy(&stdout).into_owned();

            let mut obj = ObjectValue::new();
            obj.set_plain("output", Value::string(text));
            obj.set_plain("exitCode", Value::Number(exit_code as f64));
            obj.set_plain("backend", Value::string(backend.name()));
            obj.set_plain("status", Value::string(status));
            if truncated {
                obj.set_plain("truncated", Value::Bool(true));
            }
            Value::object(obj)
        }
        Err(e) => {
            let mut obj = ObjectValue::new();
            obj.set_plain("error", Value::string(format!("failed to run {}: {e}", backend.name())));
            obj.set_plain("backend", Value::string(backend.name()));
            Value::object(obj)
        }
    }
}

pub fn path_is_dir(path: &str) -> bool {
    Path::new(path).is_dir()
}
