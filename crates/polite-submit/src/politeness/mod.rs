//! This module implements polite submission: before a job (or a chunk of an array job) is handed
//! to Slurm, the state of the cluster is probed and compared against a politeness policy. When
//! the cluster is congested, the submission is deferred using exponential backoff with jitter.
//!
//! The term `unit` represents a single `sbatch` invocation in this module, to distinguish it
//! from the Slurm jobs (or array tasks) that the invocation creates.
mod backoff;
mod config;
mod orchestrator;
mod policy;
mod probe;
mod snapshot;
mod submitter;
mod transport;
mod unit;

pub type PoliteResult<T> = anyhow::Result<T>;

pub use backoff::{
    BackoffController, BackoffState, BackoffStep, JITTER_MAX, JITTER_MIN, JitterSource,
    RandomJitter, base_delay,
};
pub use config::{
    ArrayConfig, BackoffConfig, ClusterConfig, PeakHours, PeakWindow, PolitenessConfig,
    LoggingConfig, Thresholds, load_config,
};
pub use orchestrator::{
    Collaborators, DeferRecord, ExecutionMode, OrchestrationResult, Politeness, SubmitMode,
    UnitReport, UnitStatus, run,
};
pub use policy::{DeferReason, Verdict, evaluate};
pub use probe::{SlurmProbe, StateProbe};
pub use snapshot::{StateSnapshot, Utilization};
pub use submitter::{SbatchSubmitter, SubmissionReceipt, Submitter};
pub use transport::Transport;
pub use unit::{SubmissionUnit, units_from_array, units_from_scripts};
