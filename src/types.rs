use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Deserialize;
use termcolor::{Color, ColorSpec};

use crate::error::ForgeError;

/// Lifecycle state of a pull request as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrState {
    Open,
    Merged,
    Closed,
}

impl PrState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrState::Open => "OPEN",
            PrState::Merged => "MERGED",
            PrState::Closed => "CLOSED",
        }
    }

    /// Terminal styling applied to every line of a pull request's detail
    /// block.
    pub fn color_spec(&self) -> ColorSpec {
        let color = match self {
            PrState::Open => Color::Yellow,
            PrState::Merged => Color::Green,
            PrState::Closed => Color::Red,
        };
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(color));
        spec
    }
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search perspective for an activity query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Pull requests opened by the subject.
    Author,
    /// Pull requests the subject commented on or otherwise participated in.
    Commenter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Author => "author",
            Role::Commenter => "commenter",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a pull request's repository is identified in summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepoNaming {
    /// Bare repository name, e.g. `api`.
    #[default]
    Name,
    /// Owner-qualified name, e.g. `acme/api`.
    NameWithOwner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub display_name: String,
}

/// One pull request surfaced by an activity query.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequestRecord {
    pub title: String,
    pub url: String,
    pub state: PrState,
    pub author_login: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present only when `state` is `Merged`.
    pub merged_at: Option<DateTime<Utc>>,
    pub repository: String,
    pub participants: Vec<Participant>,
}

impl PullRequestRecord {
    pub fn is_authored_by(&self, login: &str) -> bool {
        self.author_login.eq_ignore_ascii_case(login)
    }

    /// Timestamp at which the pull request was closed without merging.
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            PrState::Closed => Some(self.updated_at),
            PrState::Open | PrState::Merged => None,
        }
    }
}

/// Application-level error returned alongside an HTTP 200 response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            Some(kind) => write!(f, "{} ({})", self.message, kind),
            None => f.write_str(&self.message),
        }
    }
}

/// Envelope returned by a single activity query.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityQueryResult {
    Errors(Vec<ErrorDetail>),
    Records(Vec<PullRequestRecord>),
}

/// Parameters of a single activity query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityQuery {
    pub owner: String,
    pub subject: String,
    pub role: Role,
    pub since: NaiveDate,
}

/// Activity counts keyed by repository, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositorySummary {
    counts: IndexMap<String, usize>,
}

impl RepositorySummary {
    pub fn from_records(records: &[PullRequestRecord]) -> Self {
        let mut counts = IndexMap::new();
        for record in records {
            *counts.entry(record.repository.clone()).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn get(&self, repository: &str) -> Option<usize> {
        self.counts.get(repository).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(repo, count)| (repo.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// One half (authored or commented-on) of a subject's report.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivitySection {
    Available {
        records: Vec<PullRequestRecord>,
        summary: RepositorySummary,
    },
    /// The query for this half returned application errors.
    Unavailable(Vec<ErrorDetail>),
}

impl ActivitySection {
    pub fn available(records: Vec<PullRequestRecord>) -> Self {
        let summary = RepositorySummary::from_records(&records);
        ActivitySection::Available { records, summary }
    }

    pub fn records(&self) -> &[PullRequestRecord] {
        match self {
            ActivitySection::Available { records, .. } => records,
            ActivitySection::Unavailable(_) => &[],
        }
    }

    pub fn summary(&self) -> Option<&RepositorySummary> {
        match self {
            ActivitySection::Available { summary, .. } => Some(summary),
            ActivitySection::Unavailable(_) => None,
        }
    }

    pub fn errors(&self) -> &[ErrorDetail] {
        match self {
            ActivitySection::Available { .. } => &[],
            ActivitySection::Unavailable(errors) => errors,
        }
    }

    /// Number of records, or `None` when the half is unavailable.
    pub fn count(&self) -> Option<usize> {
        match self {
            ActivitySection::Available { records, .. } => Some(records.len()),
            ActivitySection::Unavailable(_) => None,
        }
    }
}

/// Per-subject aggregate produced by the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct UserActivityReport {
    pub user: String,
    pub authored: ActivitySection,
    /// Already excludes pull requests authored by `user`.
    pub commented_on: ActivitySection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalsRow {
    pub authored: Option<usize>,
    pub commented: Option<usize>,
}

/// Cross-subject totals, one row per subject in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchTotals {
    rows: IndexMap<String, TotalsRow>,
}

impl BatchTotals {
    pub fn record(&mut self, report: &UserActivityReport) {
        self.rows.insert(
            report.user.clone(),
            TotalsRow {
                authored: report.authored.count(),
                commented: report.commented_on.count(),
            },
        );
    }

    pub fn get(&self, user: &str) -> Option<TotalsRow> {
        self.rows.get(user).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TotalsRow)> {
        self.rows.iter().map(|(user, row)| (user.as_str(), *row))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub output_pull_request_details: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            output_pull_request_details: true,
        }
    }
}

/// Who the run reports on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectSelection {
    Users(Vec<String>),
    /// Team slug, resolved to member logins before fetching.
    Team(String),
}

/// Fully resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub owner: String,
    pub subjects: SubjectSelection,
    pub compare: Vec<String>,
    pub since: NaiveDate,
    pub until: NaiveDate,
    pub options: ReportOptions,
}

/// Source of pull request activity and team membership.
#[async_trait]
pub trait Forge {
    async fn fetch_activity(
        &self,
        query: &ActivityQuery,
    ) -> Result<ActivityQueryResult, ForgeError>;

    async fn fetch_team_members(
        &self,
        owner: &str,
        team_slug: &str,
    ) -> Result<Vec<String>, ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(repo: &str) -> PullRequestRecord {
        let at = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        PullRequestRecord {
            title: "t".to_string(),
            url: format!("https://github.com/acme/{repo}/pull/1"),
            state: PrState::Open,
            author_login: "alice".to_string(),
            created_at: at,
            updated_at: at,
            merged_at: None,
            repository: repo.to_string(),
            participants: vec![],
        }
    }

    #[test]
    fn test_repository_summary_keeps_first_seen_order() {
        let records = vec![record("web"), record("api"), record("web")];
        let summary = RepositorySummary::from_records(&records);

        let rows: Vec<_> = summary.iter().collect();
        assert_eq!(rows, vec![("web", 2), ("api", 1)]);
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn test_repository_summary_is_pure() {
        let records = vec![record("web"), record("api"), record("web")];
        assert_eq!(
            RepositorySummary::from_records(&records),
            RepositorySummary::from_records(&records)
        );
    }

    #[test]
    fn test_author_match_ignores_ascii_case() {
        let pr = record("api");
        assert!(pr.is_authored_by("Alice"));
        assert!(!pr.is_authored_by("bob"));
    }

    #[test]
    fn test_state_colors_are_distinct() {
        let open = PrState::Open.color_spec();
        let merged = PrState::Merged.color_spec();
        let closed = PrState::Closed.color_spec();
        assert_ne!(open, merged);
        assert_ne!(merged, closed);
        assert_ne!(open, closed);
    }

    #[test]
    fn test_unavailable_section_has_no_count() {
        let section = ActivitySection::Unavailable(vec![ErrorDetail {
            message: "boom".to_string(),
            kind: None,
        }]);
        assert_eq!(section.count(), None);
        assert!(section.records().is_empty());
        assert!(section.summary().is_none());
    }
}
