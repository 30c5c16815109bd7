use std::io::Write;

use chrono::NaiveDate;
use futures::{StreamExt, stream};
use termcolor::WriteColor;
use tracing::{error, info, warn};

use crate::{
    analysis::analyze,
    error::{ActivityError, ForgeError},
    report::{render_banner, render_batch_totals, render_run_header, render_user_report},
    types::{
        ActivityQuery, BatchTotals, Forge, ReportOptions, Role, RunSpec, SubjectSelection,
        UserActivityReport,
    },
};

/// Upper bound on subjects whose queries are in flight at once.
pub const MAX_CONCURRENT_SUBJECTS: usize = 3;

/// A subject whose activity could not be fetched.
#[derive(Debug)]
pub struct SubjectFailure {
    pub subject: String,
    pub error: ForgeError,
}

/// What a run produced, besides the rendered output.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Batch subjects whose reports were rendered, in completion order.
    pub reported: Vec<String>,
    /// Compare-list subjects whose reports were rendered, in request order.
    pub compared: Vec<String>,
    pub failures: Vec<SubjectFailure>,
    pub totals: BatchTotals,
}

/// Trims subjects, drops empty entries and removes duplicates, keeping the
/// first occurrence.
pub fn normalize_subjects<I, S>(subjects: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for subject in subjects {
        let subject = subject.as_ref().trim();
        if subject.is_empty() || normalized.iter().any(|s| s == subject) {
            continue;
        }
        normalized.push(subject.to_string());
    }
    normalized
}

/// Resolves the run's subjects, looking up team members when a team is
/// targeted.
pub async fn resolve_subjects<F>(spec: &RunSpec, forge: &F) -> Result<Vec<String>, ActivityError>
where
    F: Forge + Sync,
{
    match &spec.subjects {
        SubjectSelection::Users(users) => Ok(normalize_subjects(users)),
        SubjectSelection::Team(team) => {
            let members = forge
                .fetch_team_members(&spec.owner, team)
                .await
                .map_err(|source| ActivityError::TeamResolution {
                    owner: spec.owner.clone(),
                    team: team.clone(),
                    source,
                })?;

            if members.is_empty() {
                warn!(owner = %spec.owner, team = %team, "Team has no members");
            }
            info!(owner = %spec.owner, team = %team, members = members.len(), "Resolved team");
            Ok(normalize_subjects(members))
        }
    }
}

/// Fetches a subject's author-role and commenter-role activity concurrently
/// and analyzes the pair.
pub async fn fetch_user_activity<F>(
    forge: &F,
    owner: &str,
    subject: &str,
    since: NaiveDate,
) -> Result<UserActivityReport, ForgeError>
where
    F: Forge + Sync,
{
    let query = |role| ActivityQuery {
        owner: owner.to_string(),
        subject: subject.to_string(),
        role,
        since,
    };
    let author_query = query(Role::Author);
    let commenter_query = query(Role::Commenter);

    let (author_result, commenter_result) = futures::try_join!(
        forge.fetch_activity(&author_query),
        forge.fetch_activity(&commenter_query)
    )?;

    Ok(analyze(author_result, commenter_result, subject))
}

fn log_application_errors(owner: &str, report: &UserActivityReport) {
    let halves = [
        (Role::Author, &report.authored),
        (Role::Commenter, &report.commented_on),
    ];
    for (role, section) in halves {
        for detail in section.errors() {
            warn!(
                owner,
                subject = %report.user,
                %role,
                error = %detail,
                "Query returned errors; omitting this part of the report"
            );
        }
    }
}

fn log_subject_failure(owner: &str, failure: &SubjectFailure) {
    error!(
        owner,
        subject = %failure.subject,
        operation = "fetch activity",
        unauthorized = failure.error.is_unauthorized(),
        "Error getting {}/{} activity: {}",
        owner,
        failure.subject,
        failure.error
    );
}

/// Runs a full report: resolve subjects, fetch and render each subject with
/// bounded concurrency, render batch totals, then the compare pass.
///
/// Each subject's report is written as soon as it completes. A subject whose
/// queries fail is logged and skipped; only team resolution and output
/// failures abort the run.
pub async fn run_activity_report<F, W>(
    spec: &RunSpec,
    forge: &F,
    writer: &mut W,
) -> Result<RunOutcome, ActivityError>
where
    F: Forge + Sync,
    W: WriteColor,
{
    let subjects = resolve_subjects(spec, forge).await?;
    let mut outcome = RunOutcome::default();

    render_run_header(spec.since, spec.until, writer)?;

    let mut reports = stream::iter(subjects.iter().cloned())
        .map(|subject| async move {
            let result = fetch_user_activity(forge, &spec.owner, &subject, spec.since).await;
            (subject, result)
        })
        .buffer_unordered(MAX_CONCURRENT_SUBJECTS);

    while let Some((subject, result)) = reports.next().await {
        match result {
            Ok(report) => {
                log_application_errors(&spec.owner, &report);
                render_user_report(&report, &spec.options, writer)?;
                writer.flush()?;
                outcome.totals.record(&report);
                outcome.reported.push(subject);
            }
            Err(error) => {
                let failure = SubjectFailure { subject, error };
                log_subject_failure(&spec.owner, &failure);
                outcome.failures.push(failure);
            }
        }
    }

    render_batch_totals(&outcome.totals, subjects.len(), writer)?;

    let compare = normalize_subjects(&spec.compare);
    if !compare.is_empty() {
        run_compare_pass(spec, &compare, forge, writer, &mut outcome).await?;
    }

    writer.flush()?;
    Ok(outcome)
}

/// Renders compare-list subjects one at a time, summaries only.
async fn run_compare_pass<F, W>(
    spec: &RunSpec,
    compare: &[String],
    forge: &F,
    writer: &mut W,
    outcome: &mut RunOutcome,
) -> Result<(), ActivityError>
where
    F: Forge + Sync,
    W: WriteColor,
{
    let options = ReportOptions {
        output_pull_request_details: false,
    };

    render_banner("Compared against", writer)?;

    for subject in compare {
        match fetch_user_activity(forge, &spec.owner, subject, spec.since).await {
            Ok(report) => {
                log_application_errors(&spec.owner, &report);
                render_user_report(&report, &options, writer)?;
                writer.flush()?;
                outcome.compared.push(subject.clone());
            }
            Err(error) => {
                let failure = SubjectFailure {
                    subject: subject.clone(),
                    error,
                };
                log_subject_failure(&spec.owner, &failure);
                outcome.failures.push(failure);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_subjects() {
        let subjects = normalize_subjects([" alice", "bob ", "", "alice", "  ", "carol"]);
        assert_eq!(subjects, vec!["alice", "bob", "carol"]);
    }
}
