use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::common::format::human_duration;
use crate::common::utils::time::{serialize_duration_secs, serialize_opt_duration_secs};
use crate::politeness::backoff::{BackoffController, BackoffStep, JitterSource};
use crate::politeness::policy::{DeferReason, Verdict, evaluate};
use crate::politeness::{PolitenessConfig, StateProbe, SubmissionUnit, Submitter};

/// Whether the cluster state is consulted before submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Politeness {
    Polite,
    /// Submit everything immediately, without probing the cluster.
    Aggressive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmitMode {
    Submit,
    /// Probe and evaluate as usual, but only report what would be submitted.
    DryRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutionMode {
    pub politeness: Politeness,
    pub submit: SubmitMode,
}

/// External capabilities used while processing units.
pub struct Collaborators {
    pub probe: Box<dyn StateProbe>,
    pub submitter: Box<dyn Submitter>,
    pub jitter: Box<dyn JitterSource>,
    /// Wall clock used to decide peak hours.
    pub clock: Box<dyn Fn() -> DateTime<FixedOffset>>,
    /// Cancelling the token stops processing, the unit in flight is not submitted.
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum UnitStatus {
    Submitted { job_id: String },
    /// Dry run, the unit would have been submitted with `command`.
    WouldSubmit { command: String },
    BackoffExhausted { last_reason: DeferReason },
    /// The scheduler refused the unit.
    Rejected { error: String },
}

impl UnitStatus {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            UnitStatus::Submitted { .. } | UnitStatus::WouldSubmit { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeferRecord {
    pub reason: DeferReason,
    /// `None` if the defer exhausted the backoff.
    #[serde(serialize_with = "serialize_opt_duration_secs")]
    pub delay: Option<Duration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub index: usize,
    pub unit: SubmissionUnit,
    pub status: UnitStatus,
    pub defers: Vec<DeferRecord>,
    #[serde(serialize_with = "serialize_duration_secs")]
    pub waited: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationResult {
    pub units: Vec<UnitReport>,
    /// Processing was cancelled before all units were handled.
    pub interrupted: bool,
    /// Units that were never finished because of the cancellation.
    pub skipped: usize,
}

impl OrchestrationResult {
    pub fn submitted(&self) -> usize {
        self.count(|status| status.is_success())
    }

    pub fn failed_by_congestion(&self) -> usize {
        self.count(|status| matches!(status, UnitStatus::BackoffExhausted { .. }))
    }

    pub fn failed_by_rejection(&self) -> usize {
        self.count(|status| matches!(status, UnitStatus::Rejected { .. }))
    }

    pub fn total_defers(&self) -> usize {
        self.units.iter().map(|unit| unit.defers.len()).sum()
    }

    pub fn total_waited(&self) -> Duration {
        self.units.iter().map(|unit| unit.waited).sum()
    }

    pub fn is_success(&self) -> bool {
        !self.interrupted && self.units.iter().all(|unit| unit.status.is_success())
    }

    fn count<F: Fn(&UnitStatus) -> bool>(&self, predicate: F) -> usize {
        self.units
            .iter()
            .filter(|unit| predicate(&unit.status))
            .count()
    }
}

/// Submits the units one after another.
///
/// A unit is submitted only after the cluster state allows it. Deferred units wait using
/// exponential backoff and are given up when the backoff is exhausted. Failures of one unit
/// never stop the processing of the following units.
pub async fn run(
    units: Vec<SubmissionUnit>,
    config: &PolitenessConfig,
    mode: ExecutionMode,
    collaborators: &mut Collaborators,
) -> OrchestrationResult {
    let polite = mode.politeness == Politeness::Polite && config.politeness.enabled;
    if !polite {
        log::warn!("Politeness is disabled, units will be submitted without probing the cluster");
    }

    let total = units.len();
    let mut reports = Vec::with_capacity(total);
    let mut interrupted = false;

    for (index, unit) in units.into_iter().enumerate() {
        log::info!("Processing unit {}/{total}: {unit}", index + 1);
        // Every unit starts with its own backoff
        let mut backoff = BackoffController::new(&config.backoff);
        match process_unit(&unit, config, mode, polite, &mut backoff, collaborators).await {
            Some((status, defers)) => reports.push(UnitReport {
                index,
                unit,
                status,
                defers,
                waited: backoff.total_wait(),
            }),
            None => {
                log::warn!("Submission interrupted, {unit} was not submitted");
                interrupted = true;
                break;
            }
        }
    }

    let skipped = total - reports.len();
    OrchestrationResult {
        units: reports,
        interrupted,
        skipped,
    }
}

/// Returns `None` if the processing was cancelled.
async fn process_unit(
    unit: &SubmissionUnit,
    config: &PolitenessConfig,
    mode: ExecutionMode,
    polite: bool,
    backoff: &mut BackoffController,
    collaborators: &mut Collaborators,
) -> Option<(UnitStatus, Vec<DeferRecord>)> {
    let cancel = collaborators.cancel.clone();
    let mut defers = vec![];

    loop {
        if cancel.is_cancelled() {
            return None;
        }
        if !polite {
            break;
        }

        let verdict = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            verdict = probe_and_evaluate(config, collaborators) => verdict,
        };
        let reason = match verdict {
            Verdict::Submit => break,
            Verdict::Defer(reason) => reason,
        };

        match backoff.on_defer(collaborators.jitter.as_mut()) {
            BackoffStep::Wait { attempt, delay } => {
                log::info!(
                    "Deferring {unit} ({}), attempt {attempt}/{}, waiting {}",
                    reason.description(),
                    config.backoff.max_attempts,
                    human_duration(delay)
                );
                defers.push(DeferRecord {
                    reason,
                    delay: Some(delay),
                });
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return None,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            BackoffStep::Exhausted { attempts } => {
                log::error!(
                    "Giving up {unit} after {attempts} deferral(s), last reason: {}",
                    reason.description()
                );
                defers.push(DeferRecord {
                    reason,
                    delay: None,
                });
                return Some((
                    UnitStatus::BackoffExhausted {
                        last_reason: reason,
                    },
                    defers,
                ));
            }
        }
    }

    let status = match mode.submit {
        SubmitMode::DryRun => {
            let command = collaborators.submitter.describe(unit);
            log::info!("Dry run, would submit {unit}: {command}");
            UnitStatus::WouldSubmit { command }
        }
        SubmitMode::Submit => match collaborators.submitter.submit(unit).await {
            Ok(receipt) => {
                log::info!("Submitted {unit} as job {}", receipt.job_id);
                UnitStatus::Submitted {
                    job_id: receipt.job_id,
                }
            }
            Err(error) => {
                log::error!("Submission of {unit} failed: {error:?}");
                UnitStatus::Rejected {
                    error: format!("{error:#}"),
                }
            }
        },
    };
    Some((status, defers))
}

/// A probe that fails or does not finish in time is treated as congestion.
async fn probe_and_evaluate(
    config: &PolitenessConfig,
    collaborators: &mut Collaborators,
) -> Verdict {
    let timeout = config.cluster.probe_timeout;
    match tokio::time::timeout(timeout, collaborators.probe.sample()).await {
        Ok(Ok(snapshot)) => {
            let now = (collaborators.clock)();
            let verdict = evaluate(&snapshot, &now, config);
            log::debug!("Cluster state: {snapshot}, verdict: {verdict:?}");
            verdict
        }
        Ok(Err(error)) => {
            log::warn!("Cannot probe cluster state: {error:?}");
            Verdict::Defer(DeferReason::ProbeUnavailable)
        }
        Err(_) => {
            log::warn!(
                "Probing of cluster state timed out after {}",
                human_duration(timeout)
            );
            Verdict::Defer(DeferReason::ProbeUnavailable)
        }
    }
}
