//! Execution histories: the event model and the sources that fetch it

mod event;
mod source;

pub use event::{parse_history, EventKind, ExecutionEvent};
pub use source::{FileHistorySource, HistorySource, StaticHistorySource};
