//! Terminal UI subsystem (spec.md §4.10): a multi-spinner manager, ANSI
//! cursor operations, and semantic styles, surfaced to scripts through
//! `gsh.ui` (see `bridge::ui`). Grounded on the teacher's root-crate
//! dependency choices for the concrete rendering libraries (`anstyle`,
//! `crossterm`) since the original `vtcode-tui`/`vtcode-theme` sources were
//! not retrievable in full.

pub mod cursor;
pub mod spinner;
pub mod styles;

pub use cursor::CursorOps;
pub use spinner::SpinnerManager;
pub use styles::Style;
