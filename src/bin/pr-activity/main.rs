use std::io::IsTerminal;

use anyhow::Context;
use pr_activity::{ColorMode, GitHub, github::setup_github_client, parse_args, run_activity_report};
use termcolor::{ColorChoice, StandardStream};

fn handle_clap_help_version(clap_err: &clap::Error) -> ! {
    use clap::error::ErrorKind;
    match clap_err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{clap_err}");
            std::process::exit(0);
        }
        _ => {
            eprint!("{clap_err}");
            std::process::exit(2);
        }
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn color_choice(mode: ColorMode) -> ColorChoice {
    match mode {
        ColorMode::Always => ColorChoice::Always,
        ColorMode::Never => ColorChoice::Never,
        ColorMode::Auto if std::io::stdout().is_terminal() => ColorChoice::Auto,
        ColorMode::Auto => ColorChoice::Never,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (spec, invocation) = match parse_args(std::env::args()) {
        Ok(result) => result,
        Err(err) => {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                handle_clap_help_version(clap_err);
            } else {
                return Err(err);
            }
        }
    };

    init_tracing(invocation.debug);

    let client = setup_github_client(&invocation.config_path)?;
    let forge = GitHub::new(client, invocation.repo_naming);

    let stdout = StandardStream::stdout(color_choice(invocation.color));
    let mut writer = stdout.lock();

    run_activity_report(&spec, &forge, &mut writer)
        .await
        .with_context(|| format!("Activity report for '{}' failed", spec.owner))?;

    Ok(())
}
