//! pr-activity: pull request activity reports for users and teams.
//!
//! Queries GitHub's GraphQL search for the pull requests a subject authored
//! and the ones they commented on within a trailing window, keeps the two
//! sets disjoint, groups them by repository and renders per-subject reports
//! plus cross-subject totals.

pub mod activity;
pub mod analysis;
pub mod cli;
pub mod error;
pub mod github;
pub mod graphql;
pub mod report;
pub mod types;

pub use activity::{
    MAX_CONCURRENT_SUBJECTS, RunOutcome, SubjectFailure, fetch_user_activity, run_activity_report,
};
pub use analysis::analyze;
pub use cli::{ColorMode, Invocation, parse_args, parse_args_at};
pub use error::{ActivityError, ForgeError};
pub use github::GitHub;
pub use types::{
    ActivityQuery, ActivityQueryResult, ActivitySection, BatchTotals, ErrorDetail, Forge,
    Participant, PrState, PullRequestRecord, RepoNaming, ReportOptions, RepositorySummary, Role,
    RunSpec, SubjectSelection, TotalsRow, UserActivityReport,
};
