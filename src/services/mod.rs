//! Core services for searching, scheduling, invoking the decompiler, and reporting

pub mod dispatch;
pub mod format;
pub mod output;
pub mod pool;
pub mod progress;
pub mod runner;
pub mod traverse;
