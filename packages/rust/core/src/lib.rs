//! Goal-directed enhancement engine for globdef.
//!
//! This crate provides:
//! - [`goal`]: goal taxonomy, matching, and result bookkeeping
//! - [`enhancer`]: the [`enhancer::Enhancer`] trait, its registry, and the
//!   built-in type-detection and remote-text enhancers
//! - [`sniff`]: content-type detection from raw bytes
//! - [`scheduler`]: the fair work-queue scheduler
//! - [`pipeline`]: the end-to-end `run` workflow

pub mod enhancer;
pub mod goal;
pub mod pipeline;
pub mod scheduler;
pub mod sniff;

pub use enhancer::{Enhancer, EnhancerRegistry, RemoteTextEnhancer, TypeDetectionEnhancer};
pub use goal::Taxonomy;
pub use pipeline::{PipelineConfig, PipelineReport};
pub use scheduler::{
    FailedBundle, RunId, RunReport, Scheduler, SchedulerConfig, SchedulerProgress,
    SilentProgress, StepOutcome, TerminalBundle, TerminalState,
};
