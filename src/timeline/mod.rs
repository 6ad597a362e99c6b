//! Edit timeline: append-only capture and time-scaled replay

mod history;
pub mod replay;

pub use history::{History, HistoryEntry};
pub use replay::{ReplayScheduler, ReplayState, ReplayStep, ReplayTarget, ReplayTiming};

pub(crate) use history::deltas as history_deltas;
