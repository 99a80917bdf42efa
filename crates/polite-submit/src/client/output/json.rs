use serde_json::{Value, json};

use crate::client::output::outputs::Output;
use crate::politeness::{ExecutionMode, OrchestrationResult, PolitenessConfig, SubmissionUnit};

#[derive(Default)]
pub struct JsonOutput;

impl JsonOutput {
    fn print(&self, data: Value) {
        println!("{}", serde_json::to_string_pretty(&data).unwrap_or_default());
    }
}

impl Output for JsonOutput {
    // The result is printed as a single document, the plan is only logged
    fn print_submission_plan(
        &self,
        units: &[SubmissionUnit],
        _config: &PolitenessConfig,
        mode: ExecutionMode,
    ) {
        log::debug!("Submitting {} unit(s), mode: {mode:?}", units.len());
    }

    fn print_submission_result(&self, result: &OrchestrationResult, mode: ExecutionMode) {
        self.print(format_result(result, mode));
    }

    fn print_error(&self, error: anyhow::Error) {
        self.print(json!({ "error": format!("{error:?}") }));
    }
}

fn format_result(result: &OrchestrationResult, mode: ExecutionMode) -> Value {
    json!({
        "mode": mode,
        "summary": {
            "submitted": result.submitted(),
            "failed_by_congestion": result.failed_by_congestion(),
            "failed_by_rejection": result.failed_by_rejection(),
            "deferrals": result.total_defers(),
            "waited": result.total_waited().as_secs_f64(),
            "interrupted": result.interrupted,
            "skipped": result.skipped,
        },
        "units": result.units,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::client::output::json::format_result;
    use crate::common::arraydef::IntRange;
    use crate::politeness::{
        DeferReason, DeferRecord, ExecutionMode, OrchestrationResult, Politeness, SubmitMode,
        SubmissionUnit, UnitReport, UnitStatus,
    };

    #[test]
    fn result_document() {
        let result = OrchestrationResult {
            units: vec![UnitReport {
                index: 0,
                unit: SubmissionUnit::array_chunk("job.sh".into(), IntRange::from_bounds(10, 19)),
                status: UnitStatus::Submitted {
                    job_id: "7".to_string(),
                },
                defers: vec![DeferRecord {
                    reason: DeferReason::OwnPendingExceeded,
                    delay: Some(Duration::from_millis(30500)),
                }],
                waited: Duration::from_millis(30500),
            }],
            interrupted: false,
            skipped: 0,
        };
        let mode = ExecutionMode {
            politeness: Politeness::Polite,
            submit: SubmitMode::Submit,
        };
        insta::assert_snapshot!(serde_json::to_string_pretty(&format_result(&result, mode)).unwrap(), @r###"
        {
          "mode": {
            "politeness": "Polite",
            "submit": "Submit"
          },
          "summary": {
            "deferrals": 1,
            "failed_by_congestion": 0,
            "failed_by_rejection": 0,
            "interrupted": false,
            "skipped": 0,
            "submitted": 1,
            "waited": 30.5
          },
          "units": [
            {
              "defers": [
                {
                  "delay": 30.5,
                  "reason": "OwnPendingExceeded"
                }
              ],
              "index": 0,
              "status": {
                "job_id": "7",
                "status": "submitted"
              },
              "unit": {
                "array_slice": {
                  "end": 19,
                  "start": 10
                },
                "payload": "job.sh"
              },
              "waited": 30.5
            }
          ]
        }
        "###);
    }
}
