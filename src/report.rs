//! Terminal rendering of activity reports.
//!
//! Everything here writes to a [`WriteColor`] so callers choose between a
//! colored terminal and plain captured text.

use std::io::{self, Write};

use chrono::{DateTime, Local, NaiveDate, Utc};
use chrono_humanize::HumanTime;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::types::{
    ActivitySection, BatchTotals, PrState, PullRequestRecord, ReportOptions, RepositorySummary,
    UserActivityReport,
};

const COLUMN_SEPARATOR: &str = "  ";
const REPOSITORY_HEADERS: &[&str] = &["REPOSITORY", "COUNT"];
const TOTALS_HEADERS: &[&str] = &["USER", "AUTHORED", "COMMENTED"];
const UNAVAILABLE_CELL: &str = "-";

/// Wording for one half of a subject's report.
struct SectionLabels {
    heading: &'static str,
    summary: &'static str,
    empty: &'static str,
    show_author: bool,
}

const AUTHORED_LABELS: SectionLabels = SectionLabels {
    heading: "Authored pull requests",
    summary: "Authored PR",
    empty: "No authored PRs",
    show_author: false,
};

const COMMENTED_LABELS: SectionLabels = SectionLabels {
    heading: "Pull requests commented on",
    summary: "Non-authored PR comment",
    empty: "No PRs commented on",
    show_author: true,
};

fn bold() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_bold(true);
    spec
}

fn bold_fg(color: Color) -> ColorSpec {
    let mut spec = bold();
    spec.set_fg(Some(color));
    spec
}

fn banner() -> ColorSpec {
    let mut spec = bold();
    spec.set_bg(Some(Color::Green));
    spec
}

fn write_styled_line<W: WriteColor>(
    writer: &mut W,
    spec: &ColorSpec,
    text: &str,
) -> io::Result<()> {
    writer.set_color(spec)?;
    write!(writer, "{text}")?;
    writer.reset()?;
    writeln!(writer)
}

pub fn format_relative_time(time: DateTime<Utc>) -> String {
    HumanTime::from(time).to_string()
}

pub fn format_absolute_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%b %-d, %Y %-I:%M %p")
        .to_string()
}

/// Writes the run banner, e.g. `2024/02/01 - 2024/03/02 Report`.
pub fn render_run_header<W: WriteColor>(
    since: NaiveDate,
    until: NaiveDate,
    writer: &mut W,
) -> io::Result<()> {
    let title = format!(
        "{} - {} Report",
        since.format("%Y/%m/%d"),
        until.format("%Y/%m/%d")
    );
    writeln!(writer)?;
    write_styled_line(writer, &banner(), &title)?;
    write_styled_line(writer, &banner(), &"=".repeat(title.len()))?;
    writeln!(writer)
}

/// Writes the detail block for one pull request, every line styled by state.
pub fn render_pull_request_details<W: WriteColor>(
    pr: &PullRequestRecord,
    show_author: bool,
    writer: &mut W,
) -> io::Result<()> {
    let spec = pr.state.color_spec();
    let mut lines = vec![pr.title.trim().to_string()];

    if show_author {
        lines.push(format!("Author: {}", pr.author_login));
    }

    let participants: Vec<&str> = pr
        .participants
        .iter()
        .map(|p| p.display_name.as_str())
        .collect();
    lines.push(format!("Participants: {}", participants.join(", ")));

    let opened = match pr.state {
        PrState::Open => format_relative_time(pr.created_at),
        PrState::Merged | PrState::Closed => format_absolute_time(pr.created_at),
    };
    lines.push(format!("Opened {opened}"));

    match pr.state {
        PrState::Merged => {
            if let Some(merged_at) = pr.merged_at {
                lines.push(format!("Merged {}", format_absolute_time(merged_at)));
            }
        }
        PrState::Closed => {
            if let Some(closed_at) = pr.closed_at() {
                lines.push(format!("Closed {}", format_absolute_time(closed_at)));
            }
        }
        PrState::Open => {}
    }

    lines.push(pr.url.clone());

    for line in &lines {
        write_styled_line(writer, &spec, line)?;
    }
    writeln!(writer)
}

fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();

    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    widths
}

fn render_table_row<W: Write>(cells: &[&str], widths: &[usize], writer: &mut W) -> io::Result<()> {
    let last = cells.len().saturating_sub(1);
    for (i, cell) in cells.iter().enumerate() {
        if i == last {
            write!(writer, "{cell}")?;
        } else {
            write!(writer, "{:<width$}{COLUMN_SEPARATOR}", cell, width = widths[i])?;
        }
    }
    writeln!(writer)
}

fn render_table<W: Write>(
    headers: &[&str],
    rows: &[Vec<String>],
    writer: &mut W,
) -> io::Result<()> {
    let widths = calculate_column_widths(headers, rows);

    render_table_row(headers, &widths, writer)?;
    let separators: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let separators: Vec<&str> = separators.iter().map(String::as_str).collect();
    render_table_row(&separators, &widths, writer)?;

    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        render_table_row(&cells, &widths, writer)?;
    }
    Ok(())
}

/// Writes a repository/count table, one row per distinct repository.
pub fn render_repository_table<W: Write>(
    summary: &RepositorySummary,
    writer: &mut W,
) -> io::Result<()> {
    let rows: Vec<Vec<String>> = summary
        .iter()
        .map(|(repo, count)| vec![repo.to_string(), count.to_string()])
        .collect();
    render_table(REPOSITORY_HEADERS, &rows, writer)
}

fn render_section<W: WriteColor>(
    section: &ActivitySection,
    labels: &SectionLabels,
    options: &ReportOptions,
    writer: &mut W,
) -> io::Result<()> {
    // Unavailable halves are reported on the error channel by the caller.
    let ActivitySection::Available { records, summary } = section else {
        return Ok(());
    };

    if records.is_empty() {
        write_styled_line(writer, &bold_fg(Color::Red), labels.empty)?;
        return writeln!(writer);
    }

    if options.output_pull_request_details {
        write_styled_line(writer, &bold(), labels.heading)?;
        writeln!(writer)?;
        for pr in records {
            render_pull_request_details(pr, labels.show_author, writer)?;
        }
    }

    write_styled_line(
        writer,
        &bold_fg(Color::Magenta),
        &format!("{} summary ({} total)", labels.summary, records.len()),
    )?;
    writeln!(writer)?;
    render_repository_table(summary, writer)?;
    writeln!(writer)
}

/// Writes one subject's section: heading, authored half, commented-on half.
pub fn render_user_report<W: WriteColor>(
    report: &UserActivityReport,
    options: &ReportOptions,
    writer: &mut W,
) -> io::Result<()> {
    writeln!(writer)?;
    write_styled_line(writer, &bold_fg(Color::Cyan), &report.user)?;
    writeln!(writer)?;

    render_section(&report.authored, &AUTHORED_LABELS, options, writer)?;
    render_section(&report.commented_on, &COMMENTED_LABELS, options, writer)
}

/// Writes the cross-subject totals table for a batch of `batch_size`
/// subjects. Batches of one subject print nothing; subjects that failed have
/// no row.
pub fn render_batch_totals<W: WriteColor>(
    totals: &BatchTotals,
    batch_size: usize,
    writer: &mut W,
) -> io::Result<()> {
    if batch_size <= 1 {
        return Ok(());
    }

    let cell = |count: Option<usize>| {
        count.map_or_else(|| UNAVAILABLE_CELL.to_string(), |c| c.to_string())
    };
    let rows: Vec<Vec<String>> = totals
        .iter()
        .map(|(user, row)| vec![user.to_string(), cell(row.authored), cell(row.commented)])
        .collect();

    render_banner("PR totals", writer)?;
    render_table(TOTALS_HEADERS, &rows, writer)
}

/// Writes a highlighted heading surrounded by blank lines.
pub fn render_banner<W: WriteColor>(text: &str, writer: &mut W) -> io::Result<()> {
    writeln!(writer)?;
    write_styled_line(writer, &banner(), text)?;
    writeln!(writer)
}
