use std::path::PathBuf;

use anyhow::Result;
use chrono::{Days, Local, NaiveDate};
use clap::{Parser, ValueEnum};

use crate::{
    activity::normalize_subjects,
    graphql::team_slug,
    types::{RepoNaming, ReportOptions, RunSpec, SubjectSelection},
};

const DEFAULT_CONFIG_PATH: &str = "config/github.json";

/// When to style report output with terminal colors.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Parser, Debug)]
#[command(
    name = "pr-activity",
    version,
    about = "Report a user's or team's pull request activity (authored and commented on) across an owner's repositories",
    after_help = "Each search returns at most 100 pull requests and each team lookup at most 100 members; busier users or larger teams are undercounted."
)]
struct CliArgs {
    /// Owner (user or organization) of the repositories to search
    #[arg(short = 'o', long, value_name = "OWNER")]
    pub owner: String,

    /// Users to report on (can specify multiple or comma-separated)
    #[arg(
        short = 'u',
        long = "user",
        visible_alias = "users",
        value_name = "USER",
        value_delimiter = ',',
        conflicts_with = "team",
        required_unless_present = "team"
    )]
    pub users: Vec<String>,

    /// Team whose members to report on (spaces become hyphens)
    #[arg(short = 't', long, value_name = "TEAM")]
    pub team: Option<String>,

    /// Number of days back to search
    #[arg(short = 'd', long, default_value_t = 30, value_name = "DAYS")]
    pub days: u32,

    /// Only print the per-repository summaries, not each pull request
    #[arg(short = 's', long = "summary-only")]
    pub summary_only: bool,

    /// Users to compare against after the main report (summaries only)
    #[arg(short = 'c', long, value_name = "USER", value_delimiter = ',')]
    pub compare: Vec<String>,

    /// Group by 'owner/name' instead of the bare repository name
    #[arg(long = "full-repo-names")]
    pub full_repo_names: bool,

    /// JSON file with a "token" field; GITHUB_TOKEN, GH_TOKEN or TOKEN are used when it is absent
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// When to color the output
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, value_name = "WHEN")]
    pub color: ColorMode,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl CliArgs {
    pub fn validate(&self) -> Result<()> {
        if self.owner.trim().is_empty() {
            anyhow::bail!("--owner must not be empty");
        }

        if self.days == 0 {
            anyhow::bail!("--days must be at least 1");
        }

        if let Some(team) = &self.team {
            if team.trim().is_empty() {
                anyhow::bail!("--team must not be empty");
            }
        } else if normalize_subjects(&self.users).is_empty() {
            anyhow::bail!("--user requires at least one non-empty username");
        }

        Ok(())
    }
}

/// Settings that shape how the binary runs rather than what it reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config_path: PathBuf,
    pub repo_naming: RepoNaming,
    pub color: ColorMode,
    pub debug: bool,
}

fn create_run_spec(cli: &CliArgs, today: NaiveDate) -> Result<RunSpec> {
    let since = today
        .checked_sub_days(Days::new(u64::from(cli.days)))
        .ok_or_else(|| anyhow::anyhow!("--days {} reaches too far back", cli.days))?;

    let subjects = match &cli.team {
        Some(team) => SubjectSelection::Team(team_slug(team)),
        None => SubjectSelection::Users(normalize_subjects(&cli.users)),
    };

    Ok(RunSpec {
        owner: cli.owner.trim().to_string(),
        subjects,
        compare: normalize_subjects(&cli.compare),
        since,
        until: today,
        options: ReportOptions {
            output_pull_request_details: !cli.summary_only,
        },
    })
}

/// Parses command-line arguments against a fixed "today", for tests and
/// reproducible runs.
pub fn parse_args_at<I, T>(args: I, today: NaiveDate) -> Result<(RunSpec, Invocation)>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(args)?;
    cli.validate()?;

    let spec = create_run_spec(&cli, today)?;
    let invocation = Invocation {
        config_path: cli.config,
        repo_naming: if cli.full_repo_names {
            RepoNaming::NameWithOwner
        } else {
            RepoNaming::Name
        },
        color: cli.color,
        debug: cli.debug,
    };

    Ok((spec, invocation))
}

/// Parses command-line arguments into a run specification and the settings
/// for the binary itself. The search window ends today in local time.
pub fn parse_args<I, T>(args: I) -> Result<(RunSpec, Invocation)>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    parse_args_at(args, Local::now().date_naive())
}
