use std::io::IsTerminal;

use clap::{CommandFactory, FromArgMatches};
use cli_table::ColorChoice;

use polite_submit::client::commands::submit::{SubmitOpts, submit_politely};
use polite_submit::client::globalsettings::GlobalSettings;
use polite_submit::client::output::cli::CliOutput;
use polite_submit::client::output::json::JsonOutput;
use polite_submit::client::output::outputs::{Output, Outputs};
use polite_submit::common::cli::{ColorPolicy, CommonOpts, RootOptions};
use polite_submit::common::setup::setup_logging;
use polite_submit::politeness::load_config;

fn make_global_settings(opts: CommonOpts) -> GlobalSettings {
    let color_policy = match opts.colors {
        ColorPolicy::Always => ColorChoice::AlwaysAnsi,
        ColorPolicy::Auto => {
            if std::io::stdout().is_terminal() {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            }
        }
        ColorPolicy::Never => ColorChoice::Never,
    };

    // Create Printer
    let printer: Box<dyn Output> = match opts.output_mode {
        Outputs::CLI => {
            // Set colored public for CLI
            match color_policy {
                ColorChoice::Always | ColorChoice::AlwaysAnsi => {
                    colored::control::set_override(true)
                }
                ColorChoice::Never => colored::control::set_override(false),
                _ => {}
            }

            Box::new(CliOutput::new(color_policy))
        }
        Outputs::JSON => Box::<JsonOutput>::default(),
    };

    GlobalSettings::new(printer)
}

// The logging section of the configuration is applied before anything is logged
async fn run_submit(
    gsettings: &GlobalSettings,
    debug: bool,
    opts: SubmitOpts,
) -> anyhow::Result<()> {
    let config = load_config(opts.config.as_deref())?;
    setup_logging(
        debug,
        config.logging.level,
        config.logging.file.as_deref(),
    )?;
    submit_politely(gsettings, opts, config).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> polite_submit::Result<()> {
    let matches = RootOptions::command().get_matches();
    let top_opts = match RootOptions::from_arg_matches(&matches) {
        Ok(opts) => opts,
        Err(error) => error.exit(),
    };

    let debug = top_opts.common.debug;
    let gsettings = make_global_settings(top_opts.common);

    let result = run_submit(&gsettings, debug, top_opts.submit).await;

    if let Err(e) = result {
        gsettings.printer().print_error(e);
        std::process::exit(1);
    }

    Ok(())
}
