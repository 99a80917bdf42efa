use cli_table::format::{Justify, Separator};
use cli_table::{Cell, CellStruct, Color, ColorChoice, Style, Table, TableStruct, print_stdout};
use colored::Colorize;

use crate::client::output::outputs::Output;
use crate::common::format::human_duration;
use crate::common::utils::str::pluralize;
use crate::politeness::{
    ExecutionMode, OrchestrationResult, Politeness, PolitenessConfig, SubmissionUnit, SubmitMode,
    UnitStatus,
};

pub struct CliOutput {
    color_policy: ColorChoice,
}

impl CliOutput {
    pub fn new(color_policy: ColorChoice) -> CliOutput {
        CliOutput { color_policy }
    }

    fn print_horizontal_table(&self, rows: Vec<Vec<CellStruct>>, header: Vec<CellStruct>) {
        let table = rows
            .table()
            .separator(
                Separator::builder()
                    .title(Some(Default::default()))
                    .column(Some(Default::default()))
                    .build(),
            )
            .title(header);
        self.print_table(table);
    }

    fn print_table(&self, table: TableStruct) {
        let table = table.color_choice(self.color_policy);
        if let Err(e) = print_stdout(table) {
            log::error!("Cannot print table to stdout: {:?}", e);
        }
    }
}

impl Output for CliOutput {
    fn print_submission_plan(
        &self,
        units: &[SubmissionUnit],
        config: &PolitenessConfig,
        mode: ExecutionMode,
    ) {
        println!(
            "{} {} {} ({})",
            "Submitting".bold(),
            units.len(),
            pluralize("unit", units.len()),
            format_mode(mode, config)
        );
    }

    fn print_submission_result(&self, result: &OrchestrationResult, _mode: ExecutionMode) {
        if !result.units.is_empty() {
            let header = vec![
                "#".cell().bold(true),
                "Script".cell().bold(true),
                "Array".cell().bold(true),
                "Status".cell().bold(true),
                "Defers".cell().bold(true),
                "Waited".cell().bold(true),
                "Detail".cell().bold(true),
            ];
            let rows = result
                .units
                .iter()
                .map(|report| {
                    vec![
                        (report.index + 1).cell().justify(Justify::Right),
                        report.unit.payload.display().to_string().cell(),
                        report
                            .unit
                            .array_slice
                            .map(|slice| slice.to_string())
                            .unwrap_or_else(|| "-".to_string())
                            .cell(),
                        unit_status_to_cell(&report.status),
                        report.defers.len().cell().justify(Justify::Right),
                        human_duration(report.waited).cell().justify(Justify::Right),
                        unit_status_detail(&report.status).cell(),
                    ]
                })
                .collect();
            self.print_horizontal_table(rows, header);
        }
        println!("{}", format_summary(result));
    }

    fn print_error(&self, error: anyhow::Error) {
        eprintln!("{:?}", error);
    }
}

fn format_mode(mode: ExecutionMode, config: &PolitenessConfig) -> String {
    let politeness = match mode.politeness {
        Politeness::Polite if config.politeness.enabled => "polite",
        _ => "aggressive",
    };
    match mode.submit {
        SubmitMode::Submit => politeness.to_string(),
        SubmitMode::DryRun => format!("{politeness}, dry run"),
    }
}

fn unit_status_to_cell(status: &UnitStatus) -> CellStruct {
    match status {
        UnitStatus::Submitted { .. } => "SUBMITTED".cell().foreground_color(Some(Color::Green)),
        UnitStatus::WouldSubmit { .. } => {
            "WOULD SUBMIT".cell().foreground_color(Some(Color::Cyan))
        }
        UnitStatus::BackoffExhausted { .. } => {
            "EXHAUSTED".cell().foreground_color(Some(Color::Yellow))
        }
        UnitStatus::Rejected { .. } => "REJECTED".cell().foreground_color(Some(Color::Red)),
    }
}

fn unit_status_detail(status: &UnitStatus) -> String {
    match status {
        UnitStatus::Submitted { job_id } => format!("job {job_id}"),
        UnitStatus::WouldSubmit { command } => command.clone(),
        UnitStatus::BackoffExhausted { last_reason } => {
            format!("{last_reason}: {}", last_reason.description())
        }
        UnitStatus::Rejected { error } => error.clone(),
    }
}

fn format_summary(result: &OrchestrationResult) -> String {
    let mut summary = format!(
        "Submitted: {}, failed (congestion): {}, failed (rejected): {}, deferrals: {}, waited: {}",
        result.submitted(),
        result.failed_by_congestion(),
        result.failed_by_rejection(),
        result.total_defers(),
        human_duration(result.total_waited())
    );
    if result.interrupted {
        summary.push_str(&format!(
            "\nInterrupted, {} {} not processed",
            result.skipped,
            pluralize("unit", result.skipped)
        ));
    }
    summary
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::client::output::cli::{format_mode, format_summary, unit_status_detail};
    use crate::common::arraydef::IntRange;
    use crate::politeness::{
        DeferReason, DeferRecord, ExecutionMode, OrchestrationResult, Politeness,
        PolitenessConfig, SubmitMode, SubmissionUnit, UnitReport, UnitStatus,
    };

    fn report(index: usize, status: UnitStatus, defers: usize, waited: u64) -> UnitReport {
        UnitReport {
            index,
            unit: SubmissionUnit::array_chunk("job.sh".into(), IntRange::from_bounds(0, 9)),
            status,
            defers: (0..defers)
                .map(|_| DeferRecord {
                    reason: DeferReason::UtilizationHigh,
                    delay: Some(Duration::from_secs(30)),
                })
                .collect(),
            waited: Duration::from_secs(waited),
        }
    }

    #[test]
    fn summary() {
        let result = OrchestrationResult {
            units: vec![
                report(
                    0,
                    UnitStatus::Submitted {
                        job_id: "12".to_string(),
                    },
                    2,
                    90,
                ),
                report(
                    1,
                    UnitStatus::BackoffExhausted {
                        last_reason: DeferReason::UtilizationHigh,
                    },
                    3,
                    60,
                ),
            ],
            interrupted: true,
            skipped: 1,
        };
        insta::assert_snapshot!(format_summary(&result), @r###"
        Submitted: 1, failed (congestion): 1, failed (rejected): 0, deferrals: 5, waited: 2.5m
        Interrupted, 1 unit not processed
        "###);
    }

    #[test]
    fn status_detail() {
        assert_eq!(
            unit_status_detail(&UnitStatus::BackoffExhausted {
                last_reason: DeferReason::OthersQueueDeep
            }),
            "OthersQueueDeep: queue of other users is too deep"
        );
        assert_eq!(
            unit_status_detail(&UnitStatus::Submitted {
                job_id: "42".to_string()
            }),
            "job 42"
        );
    }

    #[test]
    fn mode_description() {
        let mut config = PolitenessConfig::default();
        let mode = ExecutionMode {
            politeness: Politeness::Polite,
            submit: SubmitMode::DryRun,
        };
        assert_eq!(format_mode(mode, &config), "polite, dry run");
        config.politeness.enabled = false;
        assert_eq!(format_mode(mode, &config), "aggressive, dry run");
    }
}
