//! Shared test utilities for hyprsession
//!
//! - Simulated desktops built on `MockCompositor`
//! - Session cores rooted in temporary data directories
//! - Hook script fixtures

pub mod desktop;
pub mod hooks;
