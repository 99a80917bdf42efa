use std::future::Future;
use std::pin::Pin;

use anyhow::Context;

use crate::common::manager::slurm::{
    parse_sinfo_nodes, parse_squeue_other_users, parse_squeue_states,
};
use crate::politeness::transport::Transport;
use crate::politeness::{PoliteResult, StateSnapshot, Utilization};

/// Source of cluster state snapshots.
///
/// A probe either returns a fully populated snapshot or fails as a whole.
pub trait StateProbe {
    fn sample(&mut self) -> Pin<Box<dyn Future<Output = PoliteResult<StateSnapshot>>>>;
}

/// Probes a Slurm cluster with `sinfo` and `squeue`.
pub struct SlurmProbe {
    transport: Transport,
    partition: Option<String>,
    username: String,
    sinfo: String,
    squeue: String,
}

impl SlurmProbe {
    pub fn new(transport: Transport, partition: Option<String>, username: String) -> Self {
        Self {
            transport,
            partition,
            username,
            sinfo: "sinfo".to_string(),
            squeue: "squeue".to_string(),
        }
    }

    /// Uses the given programs instead of `sinfo` and `squeue` found in `PATH`.
    pub fn with_programs(mut self, sinfo: String, squeue: String) -> Self {
        self.sinfo = sinfo;
        self.squeue = squeue;
        self
    }
}

impl StateProbe for SlurmProbe {
    fn sample(&mut self) -> Pin<Box<dyn Future<Output = PoliteResult<StateSnapshot>>>> {
        let transport = self.transport.clone();
        let partition = self.partition.clone();
        let username = self.username.clone();
        let sinfo = self.sinfo.clone();
        let squeue = self.squeue.clone();

        Box::pin(async move {
            let output = transport
                .run(sinfo_args(&sinfo, partition.as_deref()))
                .await
                .context("Cannot query partition nodes")?;
            let nodes = parse_sinfo_nodes(&output)?;
            log::debug!(
                "Nodes: {} total, {} allocated, {} idle",
                nodes.total,
                nodes.allocated,
                nodes.idle
            );
            let utilization =
                Utilization::from_nodes(nodes.allocated, nodes.total).ok_or_else(|| {
                    anyhow::anyhow!(
                        "sinfo reported no nodes{}, utilization is unknown",
                        partition
                            .as_ref()
                            .map(|p| format!(" in partition {p}"))
                            .unwrap_or_default()
                    )
                })?;

            let output = transport
                .run(squeue_own_args(&squeue, partition.as_deref(), &username))
                .await
                .context("Cannot query own jobs")?;
            let (own_running, own_pending) = parse_squeue_states(&output);

            let output = transport
                .run(squeue_pending_args(&squeue, partition.as_deref()))
                .await
                .context("Cannot query pending jobs")?;
            let others_pending = parse_squeue_other_users(&output, &username);

            Ok(StateSnapshot::new(
                own_running,
                own_pending,
                others_pending,
                utilization,
            ))
        })
    }
}

fn with_partition(mut arguments: Vec<String>, partition: Option<&str>) -> Vec<String> {
    if let Some(partition) = partition {
        arguments.push("-p".to_string());
        arguments.push(partition.to_string());
    }
    arguments
}

fn to_args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn sinfo_args(program: &str, partition: Option<&str>) -> Vec<String> {
    let mut arguments = with_partition(to_args(&[program, "-h"]), partition);
    arguments.extend(to_args(&["-o", "%D %t"]));
    arguments
}

fn squeue_own_args(program: &str, partition: Option<&str>, username: &str) -> Vec<String> {
    let mut arguments = with_partition(to_args(&[program, "-h"]), partition);
    arguments.extend(to_args(&["-u", username, "-o", "%t"]));
    arguments
}

fn squeue_pending_args(program: &str, partition: Option<&str>) -> Vec<String> {
    let mut arguments = with_partition(to_args(&[program, "-h"]), partition);
    arguments.extend(to_args(&["-t", "PENDING", "-o", "%u"]));
    arguments
}
