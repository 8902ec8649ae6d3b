//! Host-native tools exposed through `gsh.tools.*` (spec.md §4.9), beyond
//! the PTY `exec` tool which gets its own top-level `exec` module.

pub mod grep;
pub mod view_file;
