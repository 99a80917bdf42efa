use crate::politeness::{ExecutionMode, OrchestrationResult, PolitenessConfig, SubmissionUnit};

#[derive(clap::ValueEnum, Clone)]
pub enum Outputs {
    CLI,
    JSON,
}

pub trait Output {
    fn print_submission_plan(
        &self,
        units: &[SubmissionUnit],
        config: &PolitenessConfig,
        mode: ExecutionMode,
    );
    fn print_submission_result(&self, result: &OrchestrationResult, mode: ExecutionMode);

    fn print_error(&self, error: anyhow::Error);
}
