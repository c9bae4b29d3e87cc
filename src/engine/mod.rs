// src/engine/mod.rs

//! Database-free quiz rules: which questions a session gets, how answers are
//! scored, and how the timer is described.

pub mod scoring;
pub mod selection;
pub mod timing;

pub use timing::TimingConfig;
