use clap::Parser;

use crate::client::commands::submit::SubmitOpts;
use crate::client::output::outputs::Outputs;

#[derive(clap::ValueEnum, Clone)]
pub enum ColorPolicy {
    /// Use colors if the stdout is detected to be a terminal.
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

// Common CLI options
#[derive(Parser)]
pub struct CommonOpts {
    /// Sets console color policy
    #[arg(
        long,
        default_value_t = ColorPolicy::Auto,
        value_enum,
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub colors: ColorPolicy,

    /// Sets output formatting
    #[arg(
        long,
        env = "POLITE_SUBMIT_OUTPUT_MODE",
        default_value_t = Outputs::CLI,
        value_enum,
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub output_mode: Outputs,

    /// Enables more detailed log output
    #[arg(
        long,
        env = "POLITE_SUBMIT_DEBUG",
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub debug: bool,
}

// Root CLI options
#[derive(Parser)]
#[command(
    author,
    about,
    version(crate::POLITE_SUBMIT_VERSION),
    help_expected(true)
)]
pub struct RootOptions {
    #[clap(flatten)]
    pub common: CommonOpts,

    #[clap(flatten)]
    pub submit: SubmitOpts,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use crate::client::output::outputs::Outputs;
    use crate::common::cli::RootOptions;

    fn parse(args: &[&str]) -> RootOptions {
        RootOptions::try_parse_from(std::iter::once("polite-submit").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn verify_cli() {
        RootOptions::command().debug_assert();
    }

    #[test]
    fn parse_array_submission() {
        let opts = parse(&[
            "--array",
            "job.sh",
            "--range",
            "0-99",
            "--chunk",
            "20",
            "-n",
            "--output-mode",
            "json",
            "--",
            "--time=1:00:00",
        ]);
        let submit = opts.submit;
        assert_eq!(submit.array.unwrap().to_str(), Some("job.sh"));
        assert_eq!(submit.range.unwrap().to_string(), "0-99");
        assert_eq!(submit.chunk, Some(20));
        assert!(submit.dry_run);
        assert!(!submit.aggressive);
        assert_eq!(submit.sbatch_args, vec!["--time=1:00:00"]);
        assert!(matches!(opts.common.output_mode, Outputs::JSON));
    }

    #[test]
    fn parse_batch_submission() {
        let opts = parse(&["a.sh", "-b", "b.sh", "--batch", "c.sh", "-p", "gpu", "-H", "login"]);
        let submit = opts.submit;
        assert_eq!(submit.script.unwrap().to_str(), Some("a.sh"));
        assert_eq!(submit.batch.len(), 2);
        assert_eq!(submit.partition.as_deref(), Some("gpu"));
        assert_eq!(submit.host.as_deref(), Some("login"));
    }

    #[test]
    fn array_requires_range() {
        assert!(
            RootOptions::try_parse_from(["polite-submit", "--array", "job.sh"]).is_err()
        );
    }

    #[test]
    fn invalid_range() {
        assert!(
            RootOptions::try_parse_from(["polite-submit", "-a", "job.sh", "--range", "9-1"])
                .is_err()
        );
    }
}
