//! Integration tests for hyprsession
//!
//! These tests drive save and restore end to end against a simulated
//! compositor, plus the binary's command-line behaviour.

#[path = "../common/mod.rs"]
pub mod common;

pub mod cli;
pub mod fallback_flow;
pub mod hooks_flow;
pub mod launch_flow;
pub mod round_trip;
