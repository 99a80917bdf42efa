//! Parsers for the textual output of Slurm commands (`sinfo`, `squeue`, `sbatch`).

/// Node counts of a partition (or the whole cluster) as reported by `sinfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeCounts {
    pub total: u32,
    pub allocated: u32,
    pub idle: u32,
}

/// Parses the output of `sinfo -h -o '%D %t'`.
///
/// Each line contains a node count and a node state, e.g. `4 alloc`. Mixed nodes are counted as
/// allocated. State flags appended by Slurm (`idle~`, `mix*`, ...) are ignored.
pub fn parse_sinfo_nodes(output: &str) -> anyhow::Result<NodeCounts> {
    let mut counts = NodeCounts::default();
    for line in output.lines() {
        let mut parts = line.split_whitespace();
        let (Some(count), Some(state)) = (parts.next(), parts.next()) else {
            continue;
        };
        let count: u32 = count
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid node count `{count}` in sinfo output: {e}"))?;
        let state = state
            .trim_end_matches(|c: char| !c.is_ascii_alphabetic())
            .to_lowercase();
        counts.total += count;
        match state.as_str() {
            "alloc" | "allocated" | "mix" | "mixed" => counts.allocated += count,
            "idle" => counts.idle += count,
            _ => {}
        }
    }
    Ok(counts)
}

/// Parses the output of `squeue -h -u <user> -o '%t'` into `(running, pending)` job counts.
pub fn parse_squeue_states(output: &str) -> (u32, u32) {
    let mut running = 0;
    let mut pending = 0;
    for line in output.lines() {
        match line.trim().to_uppercase().as_str() {
            "R" => running += 1,
            "PD" => pending += 1,
            _ => {}
        }
    }
    (running, pending)
}

/// Parses the output of `squeue -h -t PENDING -o '%u'` and counts jobs that do not belong to
/// `username`.
pub fn parse_squeue_other_users(output: &str, username: &str) -> u32 {
    output
        .lines()
        .map(|line| line.trim())
        .filter(|user| !user.is_empty() && *user != username)
        .count() as u32
}

/// Finds the job id in the output of `sbatch`, e.g. `Submitted batch job 12345`.
pub fn parse_sbatch_job_id(output: &str) -> anyhow::Result<String> {
    output
        .lines()
        .map(|l| l.trim())
        .find(|l| l.to_lowercase().starts_with("submitted batch job"))
        .and_then(|l| l.split(' ').nth(3))
        .map(|l| l.to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing job id in sbatch output\n{output}"))
}

#[cfg(test)]
mod test {
    use crate::common::manager::slurm::{
        NodeCounts, parse_sbatch_job_id, parse_sinfo_nodes, parse_squeue_other_users,
        parse_squeue_states,
    };

    #[test]
    fn test_parse_sinfo() {
        let output = "4 alloc\n2 idle\n1 mix\n";
        assert_eq!(
            parse_sinfo_nodes(output).unwrap(),
            NodeCounts {
                total: 7,
                allocated: 5,
                idle: 2
            }
        );
    }

    #[test]
    fn test_parse_sinfo_state_flags() {
        let output = "3 mix*\n1 idle~\n2 drain\n\n";
        assert_eq!(
            parse_sinfo_nodes(output).unwrap(),
            NodeCounts {
                total: 6,
                allocated: 3,
                idle: 1
            }
        );
    }

    #[test]
    fn test_parse_sinfo_empty() {
        assert_eq!(parse_sinfo_nodes("").unwrap(), NodeCounts::default());
    }

    #[test]
    fn test_parse_sinfo_invalid_count() {
        assert!(parse_sinfo_nodes("x alloc").is_err());
    }

    #[test]
    fn test_parse_squeue_states() {
        assert_eq!(parse_squeue_states("R\nR\nPD\nCG\n"), (2, 1));
        assert_eq!(parse_squeue_states(""), (0, 0));
    }

    #[test]
    fn test_parse_squeue_other_users() {
        let output = "alice\nbob\nme\n\nbob\n";
        assert_eq!(parse_squeue_other_users(output, "me"), 3);
        assert_eq!(parse_squeue_other_users("", "me"), 0);
    }

    #[test]
    fn test_parse_sbatch_job_id() {
        assert_eq!(
            parse_sbatch_job_id("Submitted batch job 4641914").unwrap(),
            "4641914"
        );
        assert_eq!(
            parse_sbatch_job_id("sbatch: warning: foo\nSubmitted batch job 12 on cluster x")
                .unwrap(),
            "12"
        );
        assert!(parse_sbatch_job_id("sbatch: error: invalid partition").is_err());
    }
}
