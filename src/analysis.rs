use std::collections::HashSet;

use crate::types::{ActivityQueryResult, ActivitySection, PullRequestRecord, UserActivityReport};

/// Builds one subject's report from its author-role and commenter-role
/// envelopes.
///
/// A half whose envelope carries errors becomes
/// [`ActivitySection::Unavailable`]; the other half is still produced.
/// Commented-on pull requests authored by `subject` are dropped, as are any
/// that share a URL with an authored pull request or with an earlier
/// commented-on one, so the two halves never overlap.
pub fn analyze(
    author_result: ActivityQueryResult,
    commenter_result: ActivityQueryResult,
    subject: &str,
) -> UserActivityReport {
    let authored = match author_result {
        ActivityQueryResult::Errors(errors) => ActivitySection::Unavailable(errors),
        ActivityQueryResult::Records(records) => ActivitySection::available(records),
    };

    let commented_on = match commenter_result {
        ActivityQueryResult::Errors(errors) => ActivitySection::Unavailable(errors),
        ActivityQueryResult::Records(records) => ActivitySection::available(
            exclude_self_authored(records, subject, authored.records()),
        ),
    };

    UserActivityReport {
        user: subject.to_string(),
        authored,
        commented_on,
    }
}

/// Drops records authored by `subject` and any URL already reported.
pub fn exclude_self_authored(
    records: Vec<PullRequestRecord>,
    subject: &str,
    authored: &[PullRequestRecord],
) -> Vec<PullRequestRecord> {
    let mut seen: HashSet<String> = authored.iter().map(|pr| pr.url.clone()).collect();

    records
        .into_iter()
        .filter(|pr| !pr.is_authored_by(subject))
        .filter(|pr| seen.insert(pr.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::types::{ErrorDetail, PrState};

    fn pr(number: u32, repo: &str, author: &str) -> PullRequestRecord {
        let at = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        PullRequestRecord {
            title: format!("PR {number}"),
            url: format!("https://github.com/acme/{repo}/pull/{number}"),
            state: PrState::Open,
            author_login: author.to_string(),
            created_at: at,
            updated_at: at,
            merged_at: None,
            repository: repo.to_string(),
            participants: vec![],
        }
    }

    fn app_error() -> ActivityQueryResult {
        ActivityQueryResult::Errors(vec![ErrorDetail {
            message: "Something went wrong".to_string(),
            kind: None,
        }])
    }

    #[test]
    fn test_self_authored_excluded_from_commented_on() {
        let authored = vec![pr(1, "api", "alice"), pr(2, "web", "alice")];
        let commented = vec![
            pr(3, "web", "bob"),
            pr(4, "web", "alice"),
            pr(5, "docs", "carol"),
        ];

        let report = analyze(
            ActivityQueryResult::Records(authored),
            ActivityQueryResult::Records(commented),
            "alice",
        );

        assert_eq!(report.authored.records().len(), 2);
        assert_eq!(report.commented_on.records().len(), 2);
        assert!(
            report
                .commented_on
                .records()
                .iter()
                .all(|pr| pr.author_login != "alice")
        );

        let summary = report.commented_on.summary().unwrap();
        assert_eq!(summary.get("web"), Some(1));
        assert_eq!(summary.get("docs"), Some(1));
    }

    #[test]
    fn test_halves_are_disjoint_by_url() {
        // The same pull request shows up in both raw result sets, and the
        // commenter side lists it twice under a different-case login.
        let shared = pr(9, "api", "bob");
        let report = analyze(
            ActivityQueryResult::Records(vec![shared.clone()]),
            ActivityQueryResult::Records(vec![shared.clone(), pr(10, "api", "ALICE"), shared]),
            "alice",
        );

        let authored: HashSet<_> = report.authored.records().iter().map(|p| &p.url).collect();
        assert!(
            report
                .commented_on
                .records()
                .iter()
                .all(|p| !authored.contains(&p.url))
        );
        assert!(report.commented_on.records().is_empty());
    }

    #[test]
    fn test_duplicate_commenter_urls_counted_once() {
        let report = analyze(
            ActivityQueryResult::Records(vec![]),
            ActivityQueryResult::Records(vec![pr(3, "web", "bob"), pr(3, "web", "bob")]),
            "alice",
        );
        assert_eq!(report.commented_on.count(), Some(1));
    }

    #[test]
    fn test_empty_results_are_zero_activity() {
        let report = analyze(
            ActivityQueryResult::Records(vec![]),
            ActivityQueryResult::Records(vec![]),
            "alice",
        );

        assert_eq!(report.authored.count(), Some(0));
        assert_eq!(report.commented_on.count(), Some(0));
        assert!(report.authored.summary().unwrap().is_empty());
    }

    #[test]
    fn test_author_errors_keep_commenter_half() {
        let report = analyze(
            app_error(),
            ActivityQueryResult::Records(vec![pr(3, "web", "bob")]),
            "alice",
        );

        assert_eq!(report.authored.count(), None);
        assert_eq!(report.authored.errors().len(), 1);
        assert_eq!(report.commented_on.count(), Some(1));
    }

    #[test]
    fn test_commenter_errors_keep_author_half() {
        let report = analyze(
            ActivityQueryResult::Records(vec![pr(1, "api", "alice")]),
            app_error(),
            "alice",
        );

        assert_eq!(report.authored.count(), Some(1));
        assert_eq!(report.commented_on.count(), None);
    }
}
