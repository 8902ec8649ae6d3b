//! Multi-spinner manager: one animator thread ticking all live spinners on
//! an ~80ms cadence, a ten-frame braille cycle (spec.md §4.10/§5: "spinner
//! animation thread" is one of the few genuinely concurrent pieces of the
//! runtime). Grounded on the teacher's `indicatif`-style progress reporting
//! idiom, re-expressed over raw `crossterm` writes since scripts need
//! ID-keyed start/stop rather than a single global progress bar.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// An 11-frame braille animation cycle (spec.md §4.10).
const FRAMES: [char; 11] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏', '⠛'];
const TICK_INTERVAL: Duration = Duration::from_millis(80);

struct SpinnerState {
    label: String,
    frame: usize,
}

struct Shared {
    spinners: Mutex<HashMap<u64, SpinnerState>>,
    running: AtomicBool,
}

/// Handle a script holds onto `gsh.ui.spinner(label)` (spec.md §4.10).
pub struct SpinnerManager {
    shared: Arc<Shared>,
    next_id: AtomicU64,
    animator: Mutex<Option<JoinHandle<()>>>,
    /// The most recently `start`ed spinner's ID, used when `setMessage`/
    /// `stop` are called without an explicit ID (spec.md §4.10: "updates
    /// the addressed or active spinner").
    active: Mutex<Option<u64>>,
}

impl Default for SpinnerManager {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                spinners: Mutex::new(HashMap::new()),
                running: AtomicBool::new(false),
            }),
            next_id: AtomicU64::new(0),
            animator: Mutex::new(None),
            active: Mutex::new(None),
        }
    }
}

impl SpinnerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// `start(message, id?)` (spec.md §4.10): inserts under `id` if given,
    /// else a freshly minted one; the inserted spinner becomes "active".
    pub fn start(&self, label: impl Into<String>, id: Option<u64>) -> u64 {
        let id = id.unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::SeqCst));
        self.shared.spinners.lock().insert(
            id,
            SpinnerState {
                label: label.into(),
                frame: 0,
            },
        );
        *self.active.lock() = Some(id);
        self.ensure_animator();
        id
    }

    /// `stop(id)` (spec.md §4.10). If the stopped spinner was active,
    /// clears the active pointer.
    pub fn stop(&self, id: u64) {
        self.shared.spinners.lock().remove(&id);
        let mut active = self.active.lock();
        if *active == Some(id) {
            *active = None;
        }
    }

    /// `setMessage(message, id?)` (spec.md §4.10): addresses `id` when
    /// given, else whichever spinner is currently active.
    pub fn set_message(&self, label: impl Into<String>, id: Option<u64>) {
        let target = id.or_else(|| *self.active.lock());
        if let Some(id) = target {
            if let Some(state) = self.shared.spinners.lock().get_mut(&id) {
                state.label = label.into();
            }
        }
    }

    fn ensure_animator(&self) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let shared = self.shared.clone();
        let handle = std::thread::spawn(move || loop {
            {
                let mut spinners = shared.spinners.lock();
                if spinners.is_empty() {
                    shared.running.store(false, Ordering::SeqCst);
                    return;
                }
                let mut out = std::io::stderr();
                for state in spinners.values_mut() {
                    state.frame = (state.frame + 1) % FRAMES.len();
                    let _ = write!(out, "\r{} {}", FRAMES[state.frame], state.label);
                }
                let _ = out.flush();
            }
            std::thread::sleep(TICK_INTERVAL);
        });
        *self.animator.lock() = Some(handle);
    }

    /// Stops every live spinner (called from `Interpreter::close`).
    pub fn stop_all(&self) {
        self.shared.spinners.lock().clear();
        *self.active.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_without_id_becomes_active_for_set_message() {
        let mgr = SpinnerManager::new();
        let id = mgr.start("loading", None);
        mgr.set_message("still loading", None);
        assert_eq!(mgr.shared.spinners.lock().get(&id).unwrap().label, "still loading");
    }

    #[test]
    fn set_message_with_explicit_id_addresses_that_spinner_only() {
        let mgr = SpinnerManager::new();
        let a = mgr.start("a", None);
        let b = mgr.start("b", None);
        mgr.set_message("a2", Some(a));
        assert_eq!(mgr.shared.spinners.lock().get(&a).unwrap().label, "a2");
        assert_eq!(mgr.shared.spinners.lock().get(&b).unwrap().label, "b");
    }

    #[test]
    fn stop_clears_the_active_pointer_when_it_was_active() {
        let mgr = SpinnerManager::new();
        let id = mgr.start("x", None);
        mgr.stop(id);
        // No active spinner remains, so setMessage without an id is a no-op.
        mgr.set_message("y", None);
        assert!(mgr.shared.spinners.lock().is_empty());
    }
}
