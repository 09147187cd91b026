// ABOUTME: Library root for relink - exposes the transition engine and its collaborators.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod detect;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod prompt;
pub mod release;
pub mod remote;
pub mod ssh;
pub mod targets;
pub mod transition;
