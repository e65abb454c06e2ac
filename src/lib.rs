//! wpprobe Library
//!
//! This module exposes the client, cache, display and CLI modules for use in
//! the binary and in integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod data;
pub mod display;
