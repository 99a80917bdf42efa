use std::path::PathBuf;

use anyhow::bail;
use chrono::Local;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::client::globalsettings::GlobalSettings;
use crate::common::arraydef::IntRange;
use crate::politeness::{
    Collaborators, ExecutionMode, JitterSource, Politeness, PolitenessConfig, RandomJitter,
    SbatchSubmitter, SlurmProbe, SubmissionUnit, SubmitMode, Transport, run,
    units_from_array, units_from_scripts,
};

#[derive(Parser)]
pub struct SubmitOpts {
    /// Batch script that should be submitted
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub script: Option<PathBuf>,

    /// Additional batch script, can be used multiple times
    #[arg(long, short = 'b', value_name = "SCRIPT", value_hint = clap::ValueHint::FilePath)]
    pub batch: Vec<PathBuf>,

    /// Array job script that is submitted in chunks of array indices
    #[arg(
        long,
        short = 'a',
        value_name = "SCRIPT",
        requires = "range",
        value_hint = clap::ValueHint::FilePath
    )]
    pub array: Option<PathBuf>,

    /// Array index range, e.g. `0-99` or `5`
    #[arg(long, requires = "array")]
    pub range: Option<IntRange>,

    /// Number of array indices submitted by a single `sbatch` invocation
    #[arg(long)]
    pub chunk: Option<u32>,

    /// Submit immediately without checking the state of the cluster
    #[arg(long)]
    pub aggressive: bool,

    /// Probe the cluster and print what would be submitted, without submitting anything
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Path to the configuration file
    #[arg(long, short = 'c', value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Slurm partition that is probed
    #[arg(long, short = 'p')]
    pub partition: Option<String>,

    /// SSH host where Slurm commands are executed
    #[arg(long, short = 'H')]
    pub host: Option<String>,

    /// Seed of the backoff jitter
    #[arg(long, hide = true)]
    pub jitter_seed: Option<u64>,

    /// Additional arguments passed to `sbatch`
    #[arg(last = true)]
    pub sbatch_args: Vec<String>,
}

impl SubmitOpts {
    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode {
            politeness: if self.aggressive {
                Politeness::Aggressive
            } else {
                Politeness::Polite
            },
            submit: if self.dry_run {
                SubmitMode::DryRun
            } else {
                SubmitMode::Submit
            },
        }
    }

    /// Applies command line overrides on top of the loaded configuration.
    fn apply_overrides(&self, config: &mut PolitenessConfig) -> crate::Result<()> {
        if let Some(partition) = &self.partition {
            config.cluster.partition = Some(partition.clone());
        }
        if let Some(host) = &self.host {
            config.cluster.host = Some(host.clone());
        }
        if let Some(chunk) = self.chunk {
            config.array.chunk_size = chunk;
        }
        config.validate()
    }

    /// Scripts come first in the order in which they were given, followed by array chunks.
    fn create_units(&self, chunk_size: u32) -> anyhow::Result<Vec<SubmissionUnit>> {
        let scripts: Vec<PathBuf> = self
            .script
            .iter()
            .chain(self.batch.iter())
            .cloned()
            .collect();
        let mut units = units_from_scripts(scripts);

        match (&self.array, self.range) {
            (Some(script), Some(range)) => {
                units.extend(units_from_array(script.clone(), range, chunk_size))
            }
            (Some(_), None) => bail!("Array submission requires an index range (--range)"),
            (None, _) => {}
        }
        if units.is_empty() {
            bail!("No script to submit, pass a script, --batch or --array");
        }
        Ok(units)
    }
}

/// Submits the units described by `opts`, using the already loaded `config`.
pub async fn submit_politely(
    gsettings: &GlobalSettings,
    opts: SubmitOpts,
    mut config: PolitenessConfig,
) -> anyhow::Result<()> {
    opts.apply_overrides(&mut config)?;

    let mode = opts.execution_mode();
    let units = opts.create_units(config.array.chunk_size)?;
    let transport = Transport::new(config.cluster.host.clone());
    if transport == Transport::Local {
        for unit in &units {
            if !unit.payload.is_file() {
                bail!("Script {} does not exist", unit.payload.display());
            }
        }
    }
    log::debug!("Commands are executed on {transport}, configuration: {config:?}");

    let jitter: Box<dyn JitterSource> = match opts.jitter_seed {
        Some(seed) => Box::new(RandomJitter::seeded(seed)),
        None => Box::new(RandomJitter::from_entropy()),
    };
    let cancel = CancellationToken::new();
    let mut collaborators = Collaborators {
        probe: Box::new(SlurmProbe::new(
            transport.clone(),
            config.cluster.partition.clone(),
            config.cluster.effective_username(),
        )),
        submitter: Box::new(SbatchSubmitter::new(transport, opts.sbatch_args)),
        jitter,
        clock: Box::new(|| Local::now().fixed_offset()),
        cancel: cancel.clone(),
    };

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Received interrupt, stopping submission");
            cancel.cancel();
        }
    });

    gsettings
        .printer()
        .print_submission_plan(&units, &config, mode);
    let total = units.len();
    let result = run(units, &config, mode, &mut collaborators).await;
    interrupt.abort();

    gsettings.printer().print_submission_result(&result, mode);

    if result.interrupted {
        bail!("Submission was interrupted");
    }
    if !result.is_success() {
        bail!(
            "{} of {total} unit(s) could not be submitted",
            total - result.submitted()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::client::commands::submit::SubmitOpts;
    use crate::common::error::PsError;
    use crate::politeness::{Politeness, PolitenessConfig, SubmitMode};

    fn opts(args: &[&str]) -> SubmitOpts {
        SubmitOpts::try_parse_from(std::iter::once("submit").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn units_in_order() {
        let opts = opts(&["a.sh", "-b", "b.sh", "-a", "arr.sh", "--range", "0-24"]);
        let units: Vec<_> = opts
            .create_units(10)
            .unwrap()
            .into_iter()
            .map(|unit| unit.to_string())
            .collect();
        assert_eq!(
            units,
            vec![
                "a.sh",
                "b.sh",
                "arr.sh [0-9]",
                "arr.sh [10-19]",
                "arr.sh [20-24]"
            ]
        );
    }

    #[test]
    fn no_units() {
        assert!(opts(&[]).create_units(10).is_err());
    }

    #[test]
    fn execution_mode() {
        let mode = opts(&["a.sh", "--aggressive", "--dry-run"]).execution_mode();
        assert_eq!(mode.politeness, Politeness::Aggressive);
        assert_eq!(mode.submit, SubmitMode::DryRun);

        let mode = opts(&["a.sh"]).execution_mode();
        assert_eq!(mode.politeness, Politeness::Polite);
        assert_eq!(mode.submit, SubmitMode::Submit);
    }

    #[test]
    fn overrides() {
        let mut config = PolitenessConfig::default();
        opts(&["a.sh", "-p", "gpu", "-H", "login", "--chunk", "5"])
            .apply_overrides(&mut config)
            .unwrap();
        assert_eq!(config.cluster.partition.as_deref(), Some("gpu"));
        assert_eq!(config.cluster.host.as_deref(), Some("login"));
        assert_eq!(config.array.chunk_size, 5);
    }

    #[test]
    fn invalid_chunk_override() {
        let mut config = PolitenessConfig::default();
        assert!(matches!(
            opts(&["a.sh", "--chunk", "0"]).apply_overrides(&mut config),
            Err(PsError::ConfigError(_))
        ));
    }
}
