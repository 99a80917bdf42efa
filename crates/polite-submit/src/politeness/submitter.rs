use std::future::Future;
use std::pin::Pin;

use anyhow::Context;
use serde::Serialize;

use crate::common::manager::slurm::parse_sbatch_job_id;
use crate::politeness::transport::Transport;
use crate::politeness::{PoliteResult, SubmissionUnit};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub job_id: String,
}

/// Hands units over to the scheduler.
pub trait Submitter {
    fn submit(
        &mut self,
        unit: &SubmissionUnit,
    ) -> Pin<Box<dyn Future<Output = PoliteResult<SubmissionReceipt>>>>;

    /// Human readable form of the submission, used when no submission should happen.
    fn describe(&self, unit: &SubmissionUnit) -> String;
}

/// Submits units with `sbatch`.
pub struct SbatchSubmitter {
    transport: Transport,
    /// Additional arguments passed to `sbatch` before the script path.
    extra_args: Vec<String>,
}

impl SbatchSubmitter {
    pub fn new(transport: Transport, extra_args: Vec<String>) -> Self {
        Self {
            transport,
            extra_args,
        }
    }

    fn create_args(&self, unit: &SubmissionUnit) -> Vec<String> {
        let mut arguments = vec!["sbatch".to_string()];
        if let Some(slice) = &unit.array_slice {
            arguments.push(format!("--array={slice}"));
        }
        arguments.extend(self.extra_args.iter().cloned());
        arguments.push(unit.payload.to_string_lossy().to_string());
        arguments
    }
}

impl Submitter for SbatchSubmitter {
    fn submit(
        &mut self,
        unit: &SubmissionUnit,
    ) -> Pin<Box<dyn Future<Output = PoliteResult<SubmissionReceipt>>>> {
        let transport = self.transport.clone();
        let arguments = self.create_args(unit);

        Box::pin(async move {
            let output = transport
                .run(arguments)
                .await
                .context("sbatch submission failed")?;
            let job_id = parse_sbatch_job_id(&output)?;
            Ok(SubmissionReceipt { job_id })
        })
    }

    fn describe(&self, unit: &SubmissionUnit) -> String {
        self.transport.format_command(&self.create_args(unit))
    }
}

#[cfg(test)]
mod tests {
    use crate::common::arraydef::IntRange;
    use crate::politeness::submitter::{SbatchSubmitter, Submitter};
    use crate::politeness::transport::Transport;
    use crate::politeness::{SubmissionUnit, units_from_array};

    #[test]
    fn sbatch_args_script() {
        let submitter = SbatchSubmitter::new(Transport::Local, vec![]);
        assert_eq!(
            submitter.create_args(&SubmissionUnit::script("job.sh".into())),
            vec!["sbatch", "job.sh"]
        );
    }

    #[test]
    fn sbatch_args_array_chunk() {
        let submitter = SbatchSubmitter::new(
            Transport::Local,
            vec!["--partition=gpu".to_string(), "--time=1:00:00".to_string()],
        );
        let units = units_from_array("job.sh".into(), IntRange::from_bounds(0, 19), 10);
        assert_eq!(
            submitter.create_args(&units[1]),
            vec![
                "sbatch",
                "--array=10-19",
                "--partition=gpu",
                "--time=1:00:00",
                "job.sh"
            ]
        );
    }

    #[test]
    fn describe_remote_submission() {
        let submitter = SbatchSubmitter::new(
            Transport::Ssh {
                host: "login".to_string(),
            },
            vec![],
        );
        let unit = SubmissionUnit::array_chunk("job.sh".into(), IntRange::new(5, 1));
        assert_eq!(submitter.describe(&unit), "ssh login sbatch --array=5 job.sh");
    }
}
