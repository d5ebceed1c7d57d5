//! Per-window detection state: gated median smoothing, history voting,
//! long-window accumulation and the final fusion.

pub mod filter;
pub mod fusion;
pub mod history;
pub mod ring;
pub mod window;
