//! sfn-verify - execution-history assertions for AWS Step Functions
//!
//! This library turns the time-ordered event history of a state machine
//! execution into structured facts: which states ran and in what order, how
//! long each took, whether payloads survived between states, and whether
//! performance thresholds held. Waits on eventually-consistent conditions go
//! through [`poller::wait_for_condition`].

pub mod analysis;
pub mod cli;
pub mod commands;
pub mod common;
pub mod history;
pub mod poller;
pub mod testing;
pub mod verifier;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use history::{EventKind, ExecutionEvent, HistorySource};
pub use poller::{wait_for_condition, WaitOptions};
pub use verifier::ExecutionVerifier;
