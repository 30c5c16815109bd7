use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use pr_activity::{
    ColorMode, Invocation, RepoNaming, RunSpec, SubjectSelection, parse_args_at,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
}

/// Parses arguments the way the binary does, with a fixed "today".
fn parse(raw_args: Vec<&str>) -> Result<(RunSpec, Invocation)> {
    let mut args = vec!["pr-activity"];
    args.extend(raw_args);
    parse_args_at(args, today())
}

#[test]
fn test_single_user_defaults() {
    let (spec, invocation) = parse(vec!["--owner", "acme", "--user", "alice"]).unwrap();

    assert_eq!(spec.owner, "acme");
    assert_eq!(
        spec.subjects,
        SubjectSelection::Users(vec!["alice".to_string()])
    );
    assert_eq!(spec.since, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    assert_eq!(spec.until, today());
    assert!(spec.options.output_pull_request_details);
    assert!(spec.compare.is_empty());

    assert_eq!(invocation.config_path, PathBuf::from("config/github.json"));
    assert_eq!(invocation.repo_naming, RepoNaming::Name);
    assert_eq!(invocation.color, ColorMode::Auto);
    assert!(!invocation.debug);
}

#[test]
fn test_comma_separated_users_are_normalized() {
    let (spec, _) = parse(vec!["-o", "acme", "-u", "alice, bob,,alice", "-u", "carol"]).unwrap();

    assert_eq!(
        spec.subjects,
        SubjectSelection::Users(vec![
            "alice".to_string(),
            "bob".to_string(),
            "carol".to_string()
        ])
    );
}

#[test]
fn test_users_alias() {
    let (spec, _) = parse(vec!["-o", "acme", "--users", "alice,bob"]).unwrap();
    assert_eq!(
        spec.subjects,
        SubjectSelection::Users(vec!["alice".to_string(), "bob".to_string()])
    );
}

#[test]
fn test_team_name_is_slugified() {
    let (spec, _) = parse(vec!["-o", "acme", "--team", "Platform Core"]).unwrap();
    assert_eq!(
        spec.subjects,
        SubjectSelection::Team("Platform-Core".to_string())
    );
}

#[test]
fn test_days_window() {
    let (spec, _) = parse(vec!["-o", "acme", "-u", "alice", "--days", "7"]).unwrap();
    assert_eq!(spec.since, NaiveDate::from_ymd_opt(2024, 3, 24).unwrap());
}

#[test]
fn test_summary_only_and_compare() {
    let (spec, invocation) = parse(vec![
        "-o",
        "acme",
        "-u",
        "alice",
        "--summary-only",
        "--compare",
        "bob,carol",
        "--full-repo-names",
        "--color",
        "never",
        "--config",
        "/tmp/creds.json",
    ])
    .unwrap();

    assert!(!spec.options.output_pull_request_details);
    assert_eq!(spec.compare, vec!["bob".to_string(), "carol".to_string()]);
    assert_eq!(invocation.repo_naming, RepoNaming::NameWithOwner);
    assert_eq!(invocation.color, ColorMode::Never);
    assert_eq!(invocation.config_path, PathBuf::from("/tmp/creds.json"));
}

#[test]
fn test_owner_is_required() {
    let err = parse(vec!["-u", "alice"]).unwrap_err();
    assert!(err.downcast_ref::<clap::Error>().is_some());
}

#[test]
fn test_user_or_team_is_required() {
    let err = parse(vec!["-o", "acme"]).unwrap_err();
    assert!(err.downcast_ref::<clap::Error>().is_some());
}

#[test]
fn test_user_conflicts_with_team() {
    let err = parse(vec!["-o", "acme", "-u", "alice", "-t", "core"]).unwrap_err();
    assert!(err.downcast_ref::<clap::Error>().is_some());
}

#[test]
fn test_blank_users_rejected() {
    let err = parse(vec!["-o", "acme", "-u", " , "]).unwrap_err();
    assert!(err.to_string().contains("--user"));
}

#[test]
fn test_zero_days_rejected() {
    let err = parse(vec!["-o", "acme", "-u", "alice", "-d", "0"]).unwrap_err();
    assert!(err.to_string().contains("--days"));
}
