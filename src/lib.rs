// Out-of-Scanner Behavioral QC
// Batch analyzer for behavioral-task response logs:
// tail-cutoff trimming, stop-signal violations, exclusion evaluation

pub mod aggregate;
pub mod config;
pub mod discovery;
pub mod exclusions;
pub mod parser;
pub mod report;
pub mod tail_cutoff;
pub mod types;
pub mod violations;

pub use types::{QcOutcome, Response, StopCondition, TrialRecord};
