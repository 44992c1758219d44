//! Built-in tool execution core for an LLM agent runtime: a shell execution
//! engine (foreground and background), a Docker-based sandbox runner, and a
//! persistent task-graph store, plus the toolsets built on top of them.
//!
//! This crate is a library. It does not call `tracing_subscriber`'s
//! `init()` itself -- the host binary owns subscriber setup -- and it never
//! writes to stdout/stderr outside of the subprocesses it spawns.

pub mod error;
pub mod framing;
pub mod limiter;
pub mod procgroup;
pub mod sandbox;
pub mod shell;
pub mod tools;
