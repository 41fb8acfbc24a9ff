//! task-forest: a hierarchical task manager.
//!
//! Tasks form per-user forests. Titles carry inline `#tags`, each task has a
//! time estimate, and branch totals roll pending minutes up the tree. A
//! filter engine, a heritage-aware stats aggregator and an optional AI
//! suggestion provider sit on top of a SQLite store.

pub mod ai;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod filter;
pub mod format;
pub mod service;
pub mod stats;
pub mod suggestion;
pub mod tags;
pub mod tree;
pub mod types;
