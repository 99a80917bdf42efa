use std::fmt::{Display, Formatter};
use std::time::SystemTime;

use serde::Serialize;

/// Fraction of nodes that are currently allocated, always within `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Utilization(f64);

impl Utilization {
    pub fn new(value: f64) -> anyhow::Result<Self> {
        if !(0.0..=1.0).contains(&value) {
            anyhow::bail!("Utilization {value} is outside of the [0, 1] range");
        }
        Ok(Self(value))
    }

    /// Computes utilization from node counts.
    /// Returns `None` when there are no nodes, because the utilization is then unknown.
    pub fn from_nodes(allocated: u32, total: u32) -> Option<Self> {
        if total == 0 {
            return None;
        }
        Some(Self((allocated.min(total) as f64) / (total as f64)))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Observation of the cluster state at a single point in time.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub timestamp: SystemTime,
    /// Running jobs of the current user.
    pub own_running: u32,
    /// Pending jobs of the current user.
    pub own_pending: u32,
    /// Pending jobs of all other users.
    pub others_pending: u32,
    pub utilization: Utilization,
}

impl StateSnapshot {
    pub fn new(
        own_running: u32,
        own_pending: u32,
        others_pending: u32,
        utilization: Utilization,
    ) -> Self {
        Self {
            timestamp: SystemTime::now(),
            own_running,
            own_pending,
            others_pending,
            utilization,
        }
    }
}

impl Display for StateSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.0}% util, own: {}R/{}P, others: {}P",
            self.utilization.value() * 100.0,
            self.own_running,
            self.own_pending,
            self.others_pending
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::politeness::snapshot::{StateSnapshot, Utilization};

    #[test]
    fn utilization_from_nodes() {
        assert_eq!(Utilization::from_nodes(5, 10).unwrap().value(), 0.5);
        assert_eq!(Utilization::from_nodes(10, 10).unwrap().value(), 1.0);
        assert_eq!(Utilization::from_nodes(0, 4).unwrap().value(), 0.0);
    }

    #[test]
    fn utilization_unknown_without_nodes() {
        assert!(Utilization::from_nodes(0, 0).is_none());
    }

    #[test]
    fn utilization_out_of_range() {
        assert!(Utilization::new(-0.1).is_err());
        assert!(Utilization::new(1.01).is_err());
        assert!(Utilization::new(f64::NAN).is_err());
        assert!(Utilization::new(0.85).is_ok());
    }

    #[test]
    fn snapshot_display() {
        let snapshot = StateSnapshot::new(3, 1, 12, Utilization::new(0.9).unwrap());
        assert_eq!(snapshot.to_string(), "90% util, own: 3R/1P, others: 12P");
    }
}
