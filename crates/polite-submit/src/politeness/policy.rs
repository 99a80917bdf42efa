use std::fmt::{Display, Formatter};

use chrono::{Datelike, Timelike};
use serde::Serialize;

use crate::politeness::{PolitenessConfig, StateSnapshot};

/// Reason why a unit was not submitted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeferReason {
    OwnRunningExceeded,
    OwnPendingExceeded,
    OthersQueueDeep,
    UtilizationHigh,
    /// Own running jobs are within the normal ceiling, but above the peak hour ceiling.
    PeakHourStricter,
    /// The cluster state could not be probed.
    ProbeUnavailable,
}

impl DeferReason {
    pub fn description(&self) -> &'static str {
        match self {
            DeferReason::OwnRunningExceeded => "too many own running jobs",
            DeferReason::OwnPendingExceeded => "too many own pending jobs",
            DeferReason::OthersQueueDeep => "queue of other users is too deep",
            DeferReason::UtilizationHigh => "cluster utilization is too high",
            DeferReason::PeakHourStricter => "too many own running jobs during peak hours",
            DeferReason::ProbeUnavailable => "cluster state is unavailable",
        }
    }
}

impl Display for DeferReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeferReason::OwnRunningExceeded => "OwnRunningExceeded",
            DeferReason::OwnPendingExceeded => "OwnPendingExceeded",
            DeferReason::OthersQueueDeep => "OthersQueueDeep",
            DeferReason::UtilizationHigh => "UtilizationHigh",
            DeferReason::PeakHourStricter => "PeakHourStricter",
            DeferReason::ProbeUnavailable => "ProbeUnavailable",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Submit,
    Defer(DeferReason),
}

/// Decides whether a unit can be submitted given the observed cluster state.
///
/// The checks are evaluated in a fixed order and the first violated one is reported:
/// 1. own running jobs (the peak hour ceiling replaces the normal one during peak hours)
/// 2. own pending jobs
/// 3. pending jobs of other users
/// 4. cluster utilization
///
/// Job counts defer when they strictly exceed their ceiling, utilization defers when it reaches
/// the threshold.
pub fn evaluate<T: Datelike + Timelike>(
    snapshot: &StateSnapshot,
    now: &T,
    config: &PolitenessConfig,
) -> Verdict {
    let thresholds = &config.politeness;
    let is_peak = config.peak_hours.contains(now);

    let running_ceiling = if is_peak {
        config.peak_hours.max_concurrent
    } else {
        thresholds.max_concurrent_jobs
    };
    if snapshot.own_running > running_ceiling {
        return Verdict::Defer(
            if is_peak && snapshot.own_running <= thresholds.max_concurrent_jobs {
                DeferReason::PeakHourStricter
            } else {
                DeferReason::OwnRunningExceeded
            },
        );
    }
    if snapshot.own_pending > thresholds.max_pending_jobs {
        return Verdict::Defer(DeferReason::OwnPendingExceeded);
    }
    if snapshot.others_pending > thresholds.queue_depth_threshold {
        return Verdict::Defer(DeferReason::OthersQueueDeep);
    }
    if snapshot.utilization.value() >= thresholds.utilization_threshold {
        return Verdict::Defer(DeferReason::UtilizationHigh);
    }
    Verdict::Submit
}
