//! Replay module - pacing, step iteration and the capture-aware orchestrator

pub mod config;
pub mod orchestrator;
pub mod pacing;
pub mod runner;
