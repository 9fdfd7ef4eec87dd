//! Ordered execution of strategy steps.
//!
//! Each strategy surface owns one [`StepSequencer`]. A run walks the
//! strategy's plan one step at a time: the step is marked loading, one
//! lending request is sent, and the step becomes complete (with its
//! transaction hash) or error. The first failure ends the run and leaves
//! the remaining steps pending.

mod cancel;
mod engine;
mod run;

pub use cancel::CancelFlag;
pub use engine::{PreparedRun, RunOutcome, SequencerConfig, StepReceipt, StepSequencer};
pub use run::{RunPhase, StrategyRun};
