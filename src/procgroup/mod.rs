//! Cross-platform process-group primitive.
//!
//! Every spawned shell child -- foreground or background -- is attached to a
//! process group at spawn time so a single kill call takes down its whole
//! descendant tree rather than just the immediate child (a `sh -c` wrapper
//! whose payload forks further children is the common case this guards
//! against). The two target families are handled by platform submodules;
//! this module only re-exports the shared surface.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use self::unix::{attach, handle_for_pid, is_alive, kill, ProcessGroupHandle};
#[cfg(windows)]
pub use self::windows::{attach, handle_for_pid, is_alive, kill, ProcessGroupHandle};
